//! Job records and status lifecycle for poster generation batches.
//!
//! A [`Job`] is the persisted state of one batch: counters, progress,
//! the in-flight item, and a per-item error log. It is mutated only by
//! the worker loop and by explicit pause/resume requests, and is read
//! back as a value snapshot on every loop iteration — no in-process
//! caching.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{JobId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, no worker loop has picked it up yet.
    Pending,
    /// A worker loop is actively processing items.
    Running,
    /// Paused by the operator; the loop exits on its next iteration.
    Paused,
    /// Every item reached a terminal outcome and at least one succeeded.
    Completed,
    /// Every item exhausted its retries.
    Failed,
}

impl JobStatus {
    /// Stable string form used in logs and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Whether this status is terminal (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether a job in this status still counts as active for the
    /// shared-resource lifecycle gate.
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }

    /// Whether a job in this status may transition to `Paused`.
    ///
    /// Pausing is only meaningful before the batch finishes: allowed
    /// from `Pending` and `Running`, never from a terminal state or
    /// from `Paused` itself.
    pub fn can_pause(&self) -> bool {
        self.is_active()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Per-item error log
// ---------------------------------------------------------------------------

/// One permanently failed item, attached to the owning job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobError {
    /// Media-server rating key of the failed item.
    pub rating_key: String,
    /// Human title, when the submission carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The final error message after retries were exhausted.
    pub error: String,
}

// ---------------------------------------------------------------------------
// Job record
// ---------------------------------------------------------------------------

/// Persisted state of one poster generation batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    /// Media-server library this batch targets.
    pub library_key: String,
    pub status: JobStatus,
    pub total_items: u32,
    pub completed_items: u32,
    pub failed_items: u32,
    /// Derived: `round(100 * (completed + failed) / total)`.
    pub progress: u32,
    /// Human label of the item currently being generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_item: Option<String>,
    /// 1-based position of the in-flight item within the batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_item_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_item_rating_key: Option<String>,
    /// Queue depth snapshot, refreshed as items complete.
    pub remaining_items: u32,
    /// Generation model identifier (passed through to the SD service).
    pub model: String,
    /// Artwork style identifier used in prompt construction.
    pub style: String,
    pub created_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<Timestamp>,
    /// Ordered log of permanently failed items.
    #[serde(default)]
    pub errors: Vec<JobError>,
}

impl Job {
    /// Create a new pending job for a batch of `total_items` items.
    pub fn new(library_key: String, total_items: u32, model: String, style: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            library_key,
            status: JobStatus::Pending,
            total_items,
            completed_items: 0,
            failed_items: 0,
            progress: 0,
            current_item: None,
            current_item_index: None,
            current_item_rating_key: None,
            remaining_items: total_items,
            model,
            style,
            created_at: chrono::Utc::now(),
            started_at: None,
            completed_at: None,
            paused_at: None,
            errors: Vec::new(),
        }
    }

    /// Number of items that reached a terminal outcome.
    pub fn settled_items(&self) -> u32 {
        self.completed_items + self.failed_items
    }

    /// Recompute the derived `progress` field from the counters.
    pub fn recompute_progress(&mut self) {
        self.progress = progress_percent(self.settled_items(), self.total_items);
    }

    /// Whether every item in the batch has reached a terminal outcome.
    pub fn is_settled(&self) -> bool {
        self.settled_items() >= self.total_items
    }

    /// Clear the `current_item*` fields between items.
    pub fn clear_current_item(&mut self) {
        self.current_item = None;
        self.current_item_index = None;
        self.current_item_rating_key = None;
    }

    /// Transition to `Running`, stamping `started_at` on the first start
    /// only. Resumed jobs keep their original start time.
    pub fn mark_running(&mut self) {
        self.status = JobStatus::Running;
        if self.started_at.is_none() {
            self.started_at = Some(chrono::Utc::now());
        }
    }

    /// Transition to `Paused`.
    ///
    /// Fails with `Conflict` unless the current status allows pausing
    /// (see [`JobStatus::can_pause`]).
    pub fn mark_paused(&mut self) -> Result<(), CoreError> {
        if !self.status.can_pause() {
            return Err(CoreError::Conflict(format!(
                "Cannot pause a {} job",
                self.status
            )));
        }
        self.status = JobStatus::Paused;
        self.paused_at = Some(chrono::Utc::now());
        Ok(())
    }

    /// Transition back to `Pending` after a pause. The worker performs
    /// the `Pending -> Running` step when its loop restarts.
    pub fn mark_resumed(&mut self) -> Result<(), CoreError> {
        if self.status != JobStatus::Paused {
            return Err(CoreError::Conflict(format!(
                "Cannot resume a {} job",
                self.status
            )));
        }
        self.status = JobStatus::Pending;
        self.paused_at = None;
        Ok(())
    }

    /// Finalize the job once the queue has drained.
    ///
    /// Sets the terminal status per [`final_status`], stamps
    /// `completed_at`, zeroes the queue snapshot, and clears the
    /// in-flight item fields. Callers must only invoke this when
    /// [`is_settled`](Self::is_settled) holds.
    pub fn finalize(&mut self) {
        self.status = final_status(self.failed_items, self.total_items);
        self.completed_at = Some(chrono::Utc::now());
        self.remaining_items = 0;
        self.recompute_progress();
        self.clear_current_item();
    }
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// Percentage of settled items, rounded to the nearest integer.
///
/// A zero-item batch reports 100 so that finalization is well-defined.
pub fn progress_percent(settled: u32, total: u32) -> u32 {
    if total == 0 {
        return 100;
    }
    ((settled.min(total) as f64 / total as f64) * 100.0).round() as u32
}

/// Decide the terminal status for a drained batch.
///
/// `Failed` only when *every* item exhausted its retries; any mix of
/// successes and failures is `Completed` — partial success is success,
/// with the failures visible in `Job::errors`.
pub fn final_status(failed: u32, total: u32) -> JobStatus {
    if total > 0 && failed == total {
        JobStatus::Failed
    } else {
        JobStatus::Completed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
