//! Handlers for the `/jobs` resource.
//!
//! Creating a job starts its worker loop immediately; pause leaves the
//! loop to exit on its own, resume restarts it. Deletion stops the loop
//! and purges every stored record.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use posterlab_core::error::CoreError;
use posterlab_core::queue_item::ItemInput;
use posterlab_core::types::JobId;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// Body of `POST /api/v1/jobs`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    /// Media-server library the batch targets.
    pub library_key: String,
    /// Items to generate posters for; must be non-empty.
    pub items: Vec<ItemInput>,
    /// Generation model identifier, passed through to the SD service.
    pub model: String,
    /// Artwork style used in prompt construction.
    pub style: String,
}

/// Reject requests the queue layer would otherwise accept with
/// nonsensical values.
fn validate_create(input: &CreateJobRequest) -> Result<(), CoreError> {
    if input.library_key.trim().is_empty() {
        return Err(CoreError::Validation("libraryKey must not be empty".into()));
    }
    if input.model.trim().is_empty() {
        return Err(CoreError::Validation("model must not be empty".into()));
    }
    if input.style.trim().is_empty() {
        return Err(CoreError::Validation("style must not be empty".into()));
    }
    if let Some(item) = input.items.iter().find(|i| i.rating_key.trim().is_empty()) {
        return Err(CoreError::Validation(format!(
            "Item '{}' is missing a ratingKey",
            item.title.as_deref().unwrap_or("<untitled>")
        )));
    }
    Ok(())
}

/// POST /api/v1/jobs
///
/// Create a poster generation job and start its worker loop. Returns
/// 201 with the created job. An empty batch is rejected with 400.
pub async fn create_job(
    State(state): State<AppState>,
    Json(input): Json<CreateJobRequest>,
) -> AppResult<impl IntoResponse> {
    validate_create(&input)?;

    let job = state
        .manager
        .create_job(&input.library_key, input.items, &input.model, &input.style)
        .await?;

    state.workers.start(job.id).await;

    tracing::info!(
        job_id = %job.id,
        library_key = %job.library_key,
        total_items = job.total_items,
        "Job created and worker started",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

// ---------------------------------------------------------------------------
// List / get
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs
///
/// List all jobs, newest first.
pub async fn list_jobs(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let jobs = state.manager.get_all_jobs().await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/active
///
/// List jobs that are pending or running, newest first.
pub async fn list_active_jobs(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let jobs = state.manager.get_active_jobs().await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/{id}
///
/// Get a single job by ID.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = state.manager.require_job(&job_id).await?;
    Ok(Json(DataResponse { data: job }))
}

// ---------------------------------------------------------------------------
// Pause / resume
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/{id}/pause
///
/// Pause a pending or running job. The worker loop observes the status
/// on its next iteration and exits; the in-flight item finishes first.
/// Returns 409 if the job is paused or terminal.
pub async fn pause_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = state.manager.pause_job(&job_id).await?;
    Ok(Json(DataResponse { data: job }))
}

/// POST /api/v1/jobs/{id}/resume
///
/// Resume a paused job and restart its worker loop. Returns 409 if the
/// job is not paused.
pub async fn resume_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = state.manager.resume_job(&job_id).await?;
    state.workers.start(job.id).await;
    Ok(Json(DataResponse { data: job }))
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// DELETE /api/v1/jobs/{id}
///
/// Stop the job's worker loop (cancelling any in-flight generation) and
/// purge every stored record. Returns 204. Deleting a job that does not
/// exist returns 404.
pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    // Existence check first so a bogus id is a 404, not a silent 204.
    state.manager.require_job(&job_id).await?;
    state.workers.delete_job(&job_id).await?;

    tracing::info!(job_id = %job_id, "Job deleted");

    Ok(StatusCode::NO_CONTENT)
}
