pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /jobs                   list, create
/// /jobs/active            active jobs only
/// /jobs/{id}              get, delete
/// /jobs/{id}/pause        pause (POST)
/// /jobs/{id}/resume       resume (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/jobs", jobs::router())
}
