use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the SD generation service answered its health check.
    pub sd_healthy: bool,
    /// Model status reported by the SD service (`loaded`,
    /// `lazy_waiting`, ...), when reachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_status: Option<String>,
    /// GPU the SD service reports, when reachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_name: Option<String>,
}

/// GET /health -- returns service health plus a passthrough of the SD
/// service's own health report.
///
/// An unreachable SD service degrades the status but does not fail the
/// endpoint: jobs can still be queued while the GPU box is down.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let sd_health = match &state.sd {
        Some(sd) => sd.health().await.ok(),
        None => None,
    };

    let sd_healthy = sd_health.as_ref().is_some_and(|h| h.is_ready());
    let status = if sd_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        sd_healthy,
        model_status: sd_health.as_ref().map(|h| h.model_status.clone()),
        gpu_name: sd_health.and_then(|h| h.gpu_name),
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
