//! Durable job queue and worker lifecycle for poster generation.
//!
//! The pieces, bottom-up:
//!
//! - [`manager::QueueManager`] — creates jobs, enqueues items, pops/
//!   fails/completes them, and answers the aggregate queries everything
//!   else is built on. All state lives in the durable store.
//! - [`worker::WorkerRegistry`] — one cooperative processing loop per
//!   job, tracked in an explicit registry of cancellation tokens and
//!   task handles. Handles crash recovery and job resumption at boot.
//! - [`lifecycle::ModelLifecycle`] — decides when the shared generation
//!   model can be released after a loop exits.
//! - [`sink::PosterSink`] — where finished poster bytes go.

pub mod lifecycle;
pub mod manager;
pub mod sink;
pub mod worker;

use posterlab_core::error::CoreError;
use posterlab_store::StoreError;

/// Errors from the queue layer.
///
/// Store errors on write paths propagate loudly; the read paths that
/// feed the model-unload decision degrade to safe defaults instead (see
/// [`manager::QueueManager::check_all_queues_empty`]).
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The durable store was unavailable or a command failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored record failed to serialize or deserialize.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A domain-level error (not found, invalid transition, validation).
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Convenience alias used throughout the crate.
pub type QueueResult<T> = Result<T, QueueError>;
