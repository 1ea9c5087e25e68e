//! Health check endpoints

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use super::ApiState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Readiness response listing which upstream services are configured
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: ReadinessChecks,
}

/// Individual readiness checks
#[derive(Serialize)]
pub struct ReadinessChecks {
    pub llm: CheckResult,
    pub image: CheckResult,
    pub posting: CheckResult,
}

/// Result of a single check
#[derive(Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    fn configured(configured: bool) -> Self {
        if configured {
            Self {
                status: "ok",
                message: None,
            }
        } else {
            Self {
                status: "unavailable",
                message: Some("not configured".to_string()),
            }
        }
    }
}

/// Liveness probe - is the service running?
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness probe - which features can serve requests?
///
/// Always 200; unconfigured services only fail their own endpoints.
async fn ready(State(state): State<Arc<ApiState>>) -> Json<ReadinessResponse> {
    let checks = ReadinessChecks {
        llm: CheckResult::configured(state.generator.is_configured()),
        image: CheckResult::configured(state.images.is_configured()),
        posting: CheckResult::configured(state.posting.is_configured()),
    };
    let all_ok = [&checks.llm, &checks.image, &checks.posting]
        .iter()
        .all(|c| c.status == "ok");

    Json(ReadinessResponse {
        status: if all_ok { "ok" } else { "degraded" },
        checks,
    })
}

/// Build health router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .with_state(state)
}
