//! Queue manager: job and item records over the durable store.
//!
//! Every operation is a read-modify-write of value snapshots; there is
//! no in-process caching. Items are namespaced per job, so jobs are
//! fully independent at the storage level. Per-job ordering is strict
//! FIFO (push-left/pop-right), except that a retried item re-enters at
//! the tail and loses its original position.

use std::sync::Arc;

use posterlab_core::error::CoreError;
use posterlab_core::job::{Job, JobError};
use posterlab_core::keys;
use posterlab_core::queue_item::{ItemInput, QueueItem};
use posterlab_core::types::JobId;
use posterlab_store::Store;

use crate::{QueueError, QueueResult};

/// Outcome of [`QueueManager::fail_item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// The item was re-enqueued at the tail; `retries` is its new count.
    Requeued { retries: u32 },
    /// Retries are exhausted; the failure was recorded on the job.
    PermanentlyFailed,
}

/// Creates jobs, moves items through the queue, and answers the
/// aggregate queries the worker and lifecycle coordinator depend on.
pub struct QueueManager {
    store: Arc<dyn Store>,
}

impl QueueManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    // -----------------------------------------------------------------
    // Job creation
    // -----------------------------------------------------------------

    /// Create a job plus one queue item per submitted media item.
    ///
    /// Writes the job record, then each item record, then pushes each
    /// item id onto the job's FIFO list. Store failures propagate — a
    /// batch that cannot be durably recorded must fail loudly.
    pub async fn create_job(
        &self,
        library_key: &str,
        items: Vec<ItemInput>,
        model: &str,
        style: &str,
    ) -> QueueResult<Job> {
        if items.is_empty() {
            return Err(CoreError::Validation(
                "A generation batch must contain at least one item".to_string(),
            )
            .into());
        }

        let job = Job::new(
            library_key.to_string(),
            items.len() as u32,
            model.to_string(),
            style.to_string(),
        );
        self.save_job(&job).await?;

        let queue_key = keys::queue_key(&job.id);
        for input in items {
            let item = QueueItem::from_input(library_key, input);
            self.store
                .set(
                    &keys::item_key(&job.id, &item.id),
                    &serde_json::to_string(&item)?,
                )
                .await?;
            self.store.lpush(&queue_key, &item.id.to_string()).await?;
        }

        tracing::info!(
            job_id = %job.id,
            library_key = %job.library_key,
            total_items = job.total_items,
            model = %job.model,
            style = %job.style,
            "Job created",
        );

        Ok(job)
    }

    // -----------------------------------------------------------------
    // Job record access
    // -----------------------------------------------------------------

    /// Load a job's current snapshot, or `None` if it was deleted.
    pub async fn get_job(&self, job_id: &JobId) -> QueueResult<Option<Job>> {
        match self.store.get(&keys::job_key(job_id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Load a job, erroring if it does not exist.
    pub async fn require_job(&self, job_id: &JobId) -> QueueResult<Job> {
        self.get_job(job_id).await?.ok_or_else(|| {
            CoreError::NotFound {
                entity: "Job",
                id: *job_id,
            }
            .into()
        })
    }

    /// Persist a job snapshot.
    pub async fn save_job(&self, job: &Job) -> QueueResult<()> {
        self.store
            .set(&keys::job_key(&job.id), &serde_json::to_string(job)?)
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Item movement
    // -----------------------------------------------------------------

    /// Atomically dequeue the next item and record it as the job's
    /// "currently processing" marker.
    ///
    /// Returns `None` when the queue is drained — including when another
    /// consumer won the pop race. An id whose record has vanished is
    /// skipped, not treated as an error.
    pub async fn pop_next(&self, job_id: &JobId) -> QueueResult<Option<QueueItem>> {
        let queue_key = keys::queue_key(job_id);
        loop {
            let Some(item_id) = self.store.rpop(&queue_key).await? else {
                return Ok(None);
            };

            let Ok(item_id) = item_id.parse::<uuid::Uuid>() else {
                tracing::warn!(job_id = %job_id, raw = %item_id, "Discarding malformed queue entry");
                continue;
            };

            match self.store.get(&keys::item_key(job_id, &item_id)).await? {
                Some(raw) => {
                    let item: QueueItem = serde_json::from_str(&raw)?;
                    self.store
                        .set(&keys::processing_key(job_id), &raw)
                        .await?;
                    return Ok(Some(item));
                }
                None => {
                    tracing::warn!(
                        job_id = %job_id,
                        item_id = %item_id,
                        "Queued item id has no record; skipping",
                    );
                }
            }
        }
    }

    /// Read and clear the job's processing marker, if present.
    ///
    /// Used at worker startup: a surviving marker means a previous
    /// process died mid-item.
    pub async fn take_processing(&self, job_id: &JobId) -> QueueResult<Option<QueueItem>> {
        let key = keys::processing_key(job_id);
        match self.store.get(&key).await? {
            Some(raw) => {
                let item: QueueItem = serde_json::from_str(&raw)?;
                self.store.delete(&key).await?;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    /// Whether a processing marker currently exists for the job.
    pub async fn has_processing(&self, job_id: &JobId) -> QueueResult<bool> {
        Ok(self
            .store
            .get(&keys::processing_key(job_id))
            .await?
            .is_some())
    }

    /// Record one successfully generated item.
    ///
    /// Clears the processing marker, destroys the item record, bumps the
    /// completed counter, and refreshes progress and the queue-depth
    /// snapshot. Returns the updated job.
    pub async fn complete_item(&self, job_id: &JobId, item: &QueueItem) -> QueueResult<Job> {
        self.store.delete(&keys::processing_key(job_id)).await?;
        self.store.delete(&keys::item_key(job_id, &item.id)).await?;

        let mut job = self.require_job(job_id).await?;
        job.completed_items += 1;
        job.recompute_progress();
        job.clear_current_item();
        job.remaining_items = self.get_remaining_count(job_id).await? as u32;
        self.save_job(&job).await?;

        tracing::debug!(
            job_id = %job_id,
            item_id = %item.id,
            completed = job.completed_items,
            total = job.total_items,
            "Item completed",
        );

        Ok(job)
    }

    /// Record one failed generation attempt.
    ///
    /// Below the retry cap the item is re-persisted and re-enqueued at
    /// the tail — deliberately behind every other pending item, so a
    /// persistently failing item cannot hot-loop. At the cap the item is
    /// destroyed, the failure counter bumps, and an entry lands in
    /// `Job::errors`. The processing marker is cleared in both cases.
    pub async fn fail_item(
        &self,
        job_id: &JobId,
        mut item: QueueItem,
        error: &str,
    ) -> QueueResult<FailOutcome> {
        self.store.delete(&keys::processing_key(job_id)).await?;

        item.retries += 1;
        item.last_error = Some(error.to_string());

        if !item.retries_exhausted() {
            self.store
                .set(
                    &keys::item_key(job_id, &item.id),
                    &serde_json::to_string(&item)?,
                )
                .await?;
            self.store
                .lpush(&keys::queue_key(job_id), &item.id.to_string())
                .await?;

            tracing::warn!(
                job_id = %job_id,
                item_id = %item.id,
                retries = item.retries,
                error = %error,
                "Item failed; re-enqueued at tail",
            );
            return Ok(FailOutcome::Requeued {
                retries: item.retries,
            });
        }

        self.store.delete(&keys::item_key(job_id, &item.id)).await?;

        let mut job = self.require_job(job_id).await?;
        job.failed_items += 1;
        job.errors.push(JobError {
            rating_key: item.rating_key.clone(),
            title: item.title.clone(),
            error: error.to_string(),
        });
        job.recompute_progress();
        job.clear_current_item();
        job.remaining_items = self.get_remaining_count(job_id).await? as u32;
        self.save_job(&job).await?;

        tracing::error!(
            job_id = %job_id,
            item_id = %item.id,
            rating_key = %item.rating_key,
            error = %error,
            "Item permanently failed after exhausting retries",
        );

        Ok(FailOutcome::PermanentlyFailed)
    }

    // -----------------------------------------------------------------
    // Queue-depth queries
    // -----------------------------------------------------------------

    /// Current depth of one job's pending queue.
    pub async fn get_remaining_count(&self, job_id: &JobId) -> QueueResult<i64> {
        Ok(self.store.llen(&keys::queue_key(job_id)).await?)
    }

    /// Whether one job still has pending items.
    pub async fn has_items(&self, job_id: &JobId) -> QueueResult<bool> {
        Ok(self.get_remaining_count(job_id).await? > 0)
    }

    /// Whether every job's queue across the whole system is empty.
    ///
    /// Used exclusively to gate the model-unload decision. On store
    /// error this reports `true` — fail-open, releasing the expensive
    /// GPU resource rather than pinning it behind an unreachable store.
    /// The rest of the lifecycle gate is conservative the other way;
    /// the asymmetry is an operational tradeoff, not an accident.
    pub async fn check_all_queues_empty(&self) -> bool {
        let queue_keys = match self.store.keys(&keys::all_queues_pattern()).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot enumerate queues; assuming empty");
                return true;
            }
        };
        if queue_keys.is_empty() {
            return true;
        }

        match self.store.llen_many(&queue_keys).await {
            Ok(lengths) => lengths.iter().all(|&len| len == 0),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot read queue depths; assuming empty");
                true
            }
        }
    }

    // -----------------------------------------------------------------
    // Job listing
    // -----------------------------------------------------------------

    /// All jobs, newest first.
    pub async fn get_all_jobs(&self) -> QueueResult<Vec<Job>> {
        let job_keys = self.store.keys(&keys::all_jobs_pattern()).await?;
        let mut jobs = Vec::with_capacity(job_keys.len());

        for key in job_keys {
            let Some(raw) = self.store.get(&key).await? else {
                continue; // deleted between KEYS and GET
            };
            match serde_json::from_str::<Job>(&raw) {
                Ok(job) => jobs.push(job),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Skipping unreadable job record");
                }
            }
        }

        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    /// Jobs with status `pending` or `running`, newest first.
    pub async fn get_active_jobs(&self) -> QueueResult<Vec<Job>> {
        Ok(self
            .get_all_jobs()
            .await?
            .into_iter()
            .filter(|j| j.status.is_active())
            .collect())
    }

    // -----------------------------------------------------------------
    // Pause / resume
    // -----------------------------------------------------------------

    /// Pause a job: pure status transition plus timestamp bookkeeping.
    ///
    /// Does not stop a running loop itself — the worker observes the
    /// status on its next iteration and exits.
    pub async fn pause_job(&self, job_id: &JobId) -> QueueResult<Job> {
        let mut job = self.require_job(job_id).await?;
        job.mark_paused()?;
        self.save_job(&job).await?;
        tracing::info!(job_id = %job_id, "Job paused");
        Ok(job)
    }

    /// Resume a paused job back to `pending`. The caller restarts the
    /// worker loop, which performs the `pending -> running` transition.
    pub async fn resume_job(&self, job_id: &JobId) -> QueueResult<Job> {
        let mut job = self.require_job(job_id).await?;
        job.mark_resumed()?;
        self.save_job(&job).await?;
        tracing::info!(job_id = %job_id, "Job resumed");
        Ok(job)
    }

    // -----------------------------------------------------------------
    // Deletion
    // -----------------------------------------------------------------

    /// Delete every record belonging to a job: pending list, processing
    /// marker, item records, and finally the job itself.
    pub async fn purge_job(&self, job_id: &JobId) -> QueueResult<()> {
        self.store.delete(&keys::queue_key(job_id)).await?;
        self.store.delete(&keys::processing_key(job_id)).await?;

        for key in self.store.keys(&keys::job_items_pattern(job_id)).await? {
            self.store.delete(&key).await?;
        }

        self.store.delete(&keys::job_key(job_id)).await?;
        tracing::info!(job_id = %job_id, "Job purged");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
