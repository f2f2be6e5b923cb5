//! Route definitions for the `/jobs` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /                -> list_jobs
/// POST   /                -> create_job
/// GET    /active          -> list_active_jobs
/// GET    /{id}            -> get_job
/// DELETE /{id}            -> delete_job
/// POST   /{id}/pause      -> pause_job
/// POST   /{id}/resume     -> resume_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(jobs::list_jobs).post(jobs::create_job))
        .route("/active", get(jobs::list_active_jobs))
        .route("/{id}", get(jobs::get_job).delete(jobs::delete_job))
        .route("/{id}/pause", post(jobs::pause_job))
        .route("/{id}/resume", post(jobs::resume_job))
}
