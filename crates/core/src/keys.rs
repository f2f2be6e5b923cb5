//! Durable-store key namespace.
//!
//! All keys live under a process-wide prefix so a shared store instance
//! can host other applications. The queue list uses push-left/pop-right
//! discipline, giving strict FIFO per job.

use crate::types::JobId;

/// Process-wide namespace prefix.
pub const NAMESPACE: &str = "posterlab";

/// Key of a job record.
pub fn job_key(job_id: &JobId) -> String {
    format!("{NAMESPACE}:job:{job_id}")
}

/// Key of a job's FIFO list of pending item ids.
pub fn queue_key(job_id: &JobId) -> String {
    format!("{NAMESPACE}:queue:{job_id}")
}

/// Key of a job's single "currently processing" marker.
pub fn processing_key(job_id: &JobId) -> String {
    format!("{NAMESPACE}:processing:{job_id}")
}

/// Key of one queue item record, namespaced by its owning job.
pub fn item_key(job_id: &JobId, item_id: &uuid::Uuid) -> String {
    format!("{NAMESPACE}:queue-item:{job_id}:{item_id}")
}

/// Pattern matching every job record key.
pub fn all_jobs_pattern() -> String {
    format!("{NAMESPACE}:job:*")
}

/// Pattern matching every queue list key (used by the global-emptiness
/// check that gates model unload).
pub fn all_queues_pattern() -> String {
    format!("{NAMESPACE}:queue:*")
}

/// Pattern matching every item record of one job (used by purge).
pub fn job_items_pattern(job_id: &JobId) -> String {
    format!("{NAMESPACE}:queue-item:{job_id}:*")
}
