//! Image generation and retrieval endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiJson, ApiState};
use crate::images::{GeneratedImage, ImageLink};

/// Build image router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/generate_image", post(generate_image))
        .route("/image_urls", get(image_urls))
        .route("/image_url/{uuid}", get(image_url))
        .with_state(state)
}

/// Image generation request
#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
}

/// Generate and temporarily host an image
async fn generate_image(
    State(state): State<Arc<ApiState>>,
    ApiJson(request): ApiJson<ImageRequest>,
) -> Result<Json<GeneratedImage>, ApiError> {
    Ok(Json(state.images.generate_image(&request.prompt).await?))
}

/// Image listing response
#[derive(Debug, Serialize)]
pub struct ImageListResponse {
    pub images: Vec<ImageLink>,
}

/// List links to every stored image
async fn image_urls(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ImageListResponse>, ApiError> {
    let images = state.images.list_image_urls().await?;
    Ok(Json(ImageListResponse { images }))
}

/// Single image link response
#[derive(Debug, Serialize)]
pub struct ImageUrlResponse {
    pub url: String,
}

/// Link to one stored image
async fn image_url(
    State(state): State<Arc<ApiState>>,
    Path(uuid): Path<String>,
) -> Result<Json<ImageUrlResponse>, ApiError> {
    let url = state.images.image_url(&uuid).await?;
    Ok(Json(ImageUrlResponse { url }))
}
