//! Post forwarding endpoint

use std::sync::Arc;

use axum::{Json, Router, extract::State, http::HeaderMap, routing::post};
use serde::Serialize;

use super::{ApiError, ApiJson, ApiState};
use crate::social::Post;

/// Build posting router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/post_tweet", post(post_tweet))
        .with_state(state)
}

/// Extract the caller's key for the social service
fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("api-key")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Posting response
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub status: &'static str,
}

/// Forward a post to the social service
async fn post_tweet(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    ApiJson(post): ApiJson<Post>,
) -> Result<Json<PostResponse>, ApiError> {
    let api_key = extract_api_key(&headers)
        .ok_or(ApiError::MissingHeader("api-key"))?;
    let status = state.posting.post_tweet(&post, api_key).await?;
    Ok(Json(PostResponse { status }))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_extract_api_key() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_api_key(&headers), None);

        headers.insert("api-key", HeaderValue::from_static(""));
        assert_eq!(extract_api_key(&headers), None);

        headers.insert("api-key", HeaderValue::from_static("test-key-123"));
        assert_eq!(extract_api_key(&headers), Some("test-key-123"));
    }
}
