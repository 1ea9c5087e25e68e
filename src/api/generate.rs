//! Post generation and conversation endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Serialize;

use super::{ApiError, ApiJson, ApiState};
use crate::generation::GenerateRequest;
use crate::history::Message;

/// Build generation router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/generate", post(generate))
        .route("/history", get(history))
        .route("/clear_memory", post(clear_memory))
        .with_state(state)
}

/// Generation response
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub result: String,
}

/// Generate a post from a prompt
async fn generate(
    State(state): State<Arc<ApiState>>,
    ApiJson(request): ApiJson<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let result = state.generator.generate_text(&request).await?;
    Ok(Json(GenerateResponse { result }))
}

/// One conversation entry as shown to clients
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub image_url: Option<String>,
    pub timestamp: Option<f64>,
}

impl From<&Message> for HistoryEntry {
    fn from(message: &Message) -> Self {
        Self {
            kind: message.display_type().to_string(),
            content: message.content.clone(),
            image_url: message.image_url.clone(),
            timestamp: message.timestamp,
        }
    }
}

/// History response
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntry>,
}

/// Return the shared conversation, oldest first
async fn history(State(state): State<Arc<ApiState>>) -> Json<HistoryResponse> {
    let history = state.memory.load().await;
    Json(HistoryResponse {
        history: history.messages().iter().map(HistoryEntry::from).collect(),
    })
}

/// Clear-memory response
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub message: &'static str,
}

/// Reset the shared conversation
async fn clear_memory(State(state): State<Arc<ApiState>>) -> Json<ClearResponse> {
    state.memory.clear().await;
    Json(ClearResponse {
        message: "Memory cleared",
    })
}
