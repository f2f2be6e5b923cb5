//! Per-job worker loops and the registry that tracks them.
//!
//! Each job gets at most one cooperative loop: pop an item, generate
//! its poster, deliver it, record the outcome, repeat until the queue
//! drains or the job is paused or deleted. The registry maps job ids to
//! cancellation tokens and task handles so starts are idempotent and
//! stops are targeted.
//!
//! Generation requests are serialized through a single in-process lock:
//! the SD service owns one GPU and interleaved requests only make both
//! slower.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use posterlab_core::job::JobStatus;
use posterlab_core::prompt::{
    build_prompt, GUIDANCE_SCALE, INFERENCE_STEPS, NEGATIVE_PROMPT, POSTER_HEIGHT, POSTER_WIDTH,
};
use posterlab_core::queue_item::QueueItem;
use posterlab_core::types::JobId;
use posterlab_sdapi::{random_seed, GenerateRequest, PosterGenerator};

use crate::lifecycle::ModelLifecycle;
use crate::manager::{FailOutcome, QueueManager};
use crate::sink::PosterSink;
use crate::QueueResult;

/// Pacing knobs for the worker loop.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Pause between items, giving the GPU a breather and pause/delete
    /// requests a chance to land between generations.
    pub throttle: Duration,
    /// Back-off after an unexpected error (store unreachable, record
    /// corrupt) before the loop tries again.
    pub cooldown: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            throttle: Duration::from_secs(2),
            cooldown: Duration::from_secs(10),
        }
    }
}

struct WorkerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the worker loops. One registry per process.
pub struct WorkerRegistry {
    manager: Arc<QueueManager>,
    generator: Arc<dyn PosterGenerator>,
    sink: Arc<dyn PosterSink>,
    lifecycle: Arc<ModelLifecycle>,
    config: WorkerConfig,
    /// Serializes generation calls across all loops.
    gen_lock: tokio::sync::Mutex<()>,
    active: tokio::sync::Mutex<HashMap<JobId, WorkerHandle>>,
}

/// What one loop iteration decided.
enum Step {
    /// An item reached an outcome; keep looping.
    Processed,
    /// The queue drained and the job was finalized.
    Drained,
    /// The job was paused, deleted, or cancelled; stop without touching it.
    Stopped,
}

/// Outcome of one generation attempt, success side.
enum Attempt {
    Delivered,
    Cancelled,
}

impl WorkerRegistry {
    pub fn new(
        manager: Arc<QueueManager>,
        generator: Arc<dyn PosterGenerator>,
        sink: Arc<dyn PosterSink>,
        lifecycle: Arc<ModelLifecycle>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            manager,
            generator,
            sink,
            lifecycle,
            config,
            gen_lock: tokio::sync::Mutex::new(()),
            active: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    // -----------------------------------------------------------------
    // Registry operations
    // -----------------------------------------------------------------

    /// Start the worker loop for a job. Idempotent: returns `false`
    /// without side effects when a live loop already exists.
    pub async fn start(self: &Arc<Self>, job_id: JobId) -> bool {
        let mut active = self.active.lock().await;
        if let Some(existing) = active.get(&job_id) {
            if !existing.task.is_finished() {
                tracing::debug!(job_id = %job_id, "Worker already running; start is a no-op");
                return false;
            }
            active.remove(&job_id);
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn({
            let registry = Arc::clone(self);
            let cancel = cancel.clone();
            async move { registry.run(job_id, cancel).await }
        });
        active.insert(job_id, WorkerHandle { cancel, task });

        tracing::info!(job_id = %job_id, "Worker started");
        true
    }

    /// Cancel a job's loop, if one is live. The loop exits at its next
    /// cancellation point; an in-flight generation is aborted.
    pub async fn stop(&self, job_id: &JobId) -> bool {
        let Some(handle) = self.active.lock().await.remove(job_id) else {
            return false;
        };
        handle.cancel.cancel();
        tracing::info!(job_id = %job_id, "Worker stop requested");
        true
    }

    /// Whether a live loop exists for the job.
    pub async fn is_active(&self, job_id: &JobId) -> bool {
        self.active
            .lock()
            .await
            .get(job_id)
            .is_some_and(|h| !h.task.is_finished())
    }

    /// Restart work after a process restart.
    ///
    /// Every non-terminal, non-paused job either gets its loop back
    /// (items pending, or a processing marker left by the dead process)
    /// or, if nothing remains to do, is finalized in place. Failures on
    /// one job never block the others.
    pub async fn resume_incomplete_jobs(self: &Arc<Self>) -> QueueResult<usize> {
        let mut resumed = 0;
        for job in self.manager.get_active_jobs().await? {
            let pending = self.manager.has_items(&job.id).await?;
            let interrupted = self.manager.has_processing(&job.id).await?;

            if pending || interrupted {
                tracing::info!(
                    job_id = %job.id,
                    status = %job.status,
                    interrupted,
                    "Resuming incomplete job after restart",
                );
                if self.start(job.id).await {
                    resumed += 1;
                }
            } else {
                // Drained but never finalized: the process died in the
                // gap between the last item and finalization.
                let mut job = job;
                job.finalize();
                self.manager.save_job(&job).await?;
                tracing::info!(job_id = %job.id, status = %job.status, "Finalized stale job at startup");
            }
        }
        Ok(resumed)
    }

    /// Stop a job's loop and purge every record it owns.
    pub async fn delete_job(&self, job_id: &JobId) -> QueueResult<()> {
        let stopped = self.stop(job_id).await;
        if stopped {
            // Best-effort: free the GPU from a generation nobody wants.
            if let Err(e) = self.generator.cancel().await {
                tracing::warn!(job_id = %job_id, error = %e, "Cancel request to SD service failed");
            }
        }
        self.manager.purge_job(job_id).await
    }

    // -----------------------------------------------------------------
    // The loop
    // -----------------------------------------------------------------

    async fn run(self: Arc<Self>, job_id: JobId, cancel: CancellationToken) {
        self.recover_interrupted(&job_id).await;

        match self.manager.get_job(&job_id).await {
            Ok(Some(mut job)) if job.status.is_active() => {
                job.mark_running();
                if let Err(e) = self.manager.save_job(&job).await {
                    tracing::error!(job_id = %job_id, error = %e, "Cannot mark job running");
                }
            }
            Ok(Some(job)) => {
                tracing::info!(job_id = %job_id, status = %job.status, "Job not startable; worker exiting");
                self.finish(&job_id).await;
                return;
            }
            Ok(None) => {
                tracing::warn!(job_id = %job_id, "Job vanished before worker started");
                self.finish(&job_id).await;
                return;
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Cannot load job at worker start");
                self.finish(&job_id).await;
                return;
            }
        }

        // Warm the model early; per-item errors surface through generate.
        if let Err(e) = self.generator.ensure_ready().await {
            tracing::warn!(job_id = %job_id, error = %e, "SD service not ready yet");
        }

        loop {
            if cancel.is_cancelled() {
                tracing::info!(job_id = %job_id, "Worker cancelled");
                break;
            }

            match self.step(&job_id, &cancel).await {
                Ok(Step::Processed) => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.config.throttle) => {}
                    }
                }
                Ok(Step::Drained) | Ok(Step::Stopped) => break,
                Err(e) => {
                    tracing::error!(job_id = %job_id, error = %e, "Worker iteration failed; backing off");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.config.cooldown) => {}
                    }
                }
            }
        }

        self.finish(&job_id).await;
    }

    /// One iteration: load the job, pop an item, attempt it, record the
    /// outcome.
    async fn step(&self, job_id: &JobId, cancel: &CancellationToken) -> QueueResult<Step> {
        let Some(mut job) = self.manager.get_job(job_id).await? else {
            tracing::info!(job_id = %job_id, "Job deleted; worker exiting");
            return Ok(Step::Stopped);
        };
        if job.status == JobStatus::Paused {
            tracing::info!(job_id = %job_id, "Job paused; worker exiting");
            return Ok(Step::Stopped);
        }

        let Some(item) = self.manager.pop_next(job_id).await? else {
            job.finalize();
            self.manager.save_job(&job).await?;
            tracing::info!(
                job_id = %job_id,
                status = %job.status,
                completed = job.completed_items,
                failed = job.failed_items,
                "Job finished",
            );
            return Ok(Step::Drained);
        };

        job.current_item = Some(item.display_label());
        job.current_item_index = Some(job.settled_items() + 1);
        job.current_item_rating_key = Some(item.rating_key.clone());
        job.remaining_items = self.manager.get_remaining_count(job_id).await? as u32;
        self.manager.save_job(&job).await?;

        tracing::info!(
            job_id = %job_id,
            item = %item.display_label(),
            attempt = item.retries + 1,
            "Generating poster",
        );

        match self.attempt_item(&job.style, &item, cancel).await {
            Ok(Attempt::Cancelled) => Ok(Step::Stopped),
            Ok(Attempt::Delivered) => {
                self.manager.complete_item(job_id, &item).await?;
                Ok(Step::Processed)
            }
            Err(message) => {
                match self.manager.fail_item(job_id, item, &message).await? {
                    FailOutcome::Requeued { retries } => {
                        tracing::debug!(job_id = %job_id, retries, "Item will be retried");
                    }
                    FailOutcome::PermanentlyFailed => {}
                }
                Ok(Step::Processed)
            }
        }
    }

    /// Generate one poster and deliver it to the sink. Any failure —
    /// request, unrecognizable image data, delivery — counts as one
    /// failed attempt for the item.
    async fn attempt_item(
        &self,
        style: &str,
        item: &QueueItem,
        cancel: &CancellationToken,
    ) -> Result<Attempt, String> {
        let request = GenerateRequest {
            prompt: build_prompt(item, style),
            negative_prompt: NEGATIVE_PROMPT.to_string(),
            width: POSTER_WIDTH,
            height: POSTER_HEIGHT,
            num_inference_steps: INFERENCE_STEPS,
            guidance_scale: GUIDANCE_SCALE,
            seed: Some(random_seed()),
        };

        let guard = self.gen_lock.lock().await;
        let poster = tokio::select! {
            _ = cancel.cancelled() => {
                if let Err(e) = self.generator.cancel().await {
                    tracing::warn!(error = %e, "Cancel request to SD service failed");
                }
                return Ok(Attempt::Cancelled);
            }
            result = self.generator.generate(&request) => {
                result.map_err(|e| e.to_string())?
            }
        };
        drop(guard);

        // The service returns whatever bytes it wrote; reject anything
        // that is not a recognizable image before handing it on.
        if image::guess_format(&poster.bytes).is_err() {
            return Err(format!(
                "Service returned unrecognizable image data for {}",
                poster.filename
            ));
        }

        self.sink
            .put(item, &poster.bytes)
            .await
            .map_err(|e| e.to_string())?;

        Ok(Attempt::Delivered)
    }

    /// Requeue the item a dead process left in the processing marker.
    /// Counted as one failed attempt so a crash-inducing item cannot
    /// wedge the job forever.
    async fn recover_interrupted(&self, job_id: &JobId) {
        match self.manager.take_processing(job_id).await {
            Ok(Some(item)) => {
                tracing::warn!(
                    job_id = %job_id,
                    item = %item.display_label(),
                    "Recovering item interrupted by restart",
                );
                if let Err(e) = self
                    .manager
                    .fail_item(job_id, item, "Interrupted by process restart")
                    .await
                {
                    tracing::error!(job_id = %job_id, error = %e, "Failed to requeue interrupted item");
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Cannot check for interrupted item");
            }
        }
    }

    /// Deregister and run the model-release check. Called exactly once
    /// as each loop exits.
    async fn finish(&self, job_id: &JobId) {
        self.active.lock().await.remove(job_id);
        self.lifecycle.maybe_release().await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use posterlab_core::job::Job;
    use posterlab_core::queue_item::{ItemInput, MediaKind, MAX_RETRIES};
    use posterlab_sdapi::{GeneratedPoster, SdApiError};
    use posterlab_store::MemoryStore;

    use crate::sink::SinkError;

    /// Minimal bytes that `image::guess_format` identifies as PNG.
    fn png_bytes() -> Vec<u8> {
        vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0]
    }

    /// Generator scripted by prompt content: prompts containing any of
    /// `fail_substrings` always fail.
    struct FakeGenerator {
        delay: Duration,
        fail_substrings: Vec<String>,
        calls: AtomicUsize,
        unloads: AtomicUsize,
    }

    impl FakeGenerator {
        fn new(delay: Duration, fail_substrings: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                delay,
                fail_substrings: fail_substrings.iter().map(|s| s.to_string()).collect(),
                calls: AtomicUsize::new(0),
                unloads: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl PosterGenerator for FakeGenerator {
        async fn ensure_ready(&self) -> Result<(), SdApiError> {
            Ok(())
        }

        async fn generate(&self, request: &GenerateRequest) -> Result<GeneratedPoster, SdApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self
                .fail_substrings
                .iter()
                .any(|s| request.prompt.contains(s))
            {
                return Err(SdApiError::Api {
                    status: 500,
                    body: "scripted failure".into(),
                });
            }
            Ok(GeneratedPoster {
                filename: "out.png".into(),
                generation_time: 0.1,
                bytes: png_bytes(),
            })
        }

        async fn cancel(&self) -> Result<(), SdApiError> {
            Ok(())
        }

        async fn unload(&self) -> Result<(), SdApiError> {
            self.unloads.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Records the rating keys it receives.
    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl PosterSink for RecordingSink {
        async fn put(&self, item: &QueueItem, _bytes: &[u8]) -> Result<(), SinkError> {
            self.delivered
                .lock()
                .unwrap()
                .push(item.rating_key.clone());
            Ok(())
        }
    }

    fn fast_config() -> WorkerConfig {
        WorkerConfig {
            throttle: Duration::from_millis(1),
            cooldown: Duration::from_millis(5),
        }
    }

    fn build(
        generator: Arc<FakeGenerator>,
        sink: Arc<RecordingSink>,
    ) -> (Arc<WorkerRegistry>, Arc<QueueManager>) {
        let manager = Arc::new(QueueManager::new(Arc::new(MemoryStore::new())));
        let lifecycle = Arc::new(ModelLifecycle::new(manager.clone(), generator.clone()));
        let registry = Arc::new(WorkerRegistry::new(
            manager.clone(),
            generator,
            sink,
            lifecycle,
            fast_config(),
        ));
        (registry, manager)
    }

    fn inputs(titles: &[&str]) -> Vec<ItemInput> {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| ItemInput {
                rating_key: format!("rk-{i}"),
                title: Some(t.to_string()),
                year: Some(2000),
                media_kind: MediaKind::Movie,
            })
            .collect()
    }

    async fn wait_terminal(manager: &QueueManager, job_id: &JobId) -> Job {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(job) = manager.get_job(job_id).await.unwrap() {
                    if job.status.is_terminal() {
                        return job;
                    }
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("job did not settle in time")
    }

    async fn wait_idle(registry: &WorkerRegistry, job_id: &JobId) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while registry.is_active(job_id).await {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("worker did not stop in time")
    }

    #[tokio::test]
    async fn processes_batch_to_completion() {
        let generator = FakeGenerator::new(Duration::ZERO, &[]);
        let sink = Arc::new(RecordingSink::default());
        let (registry, manager) = build(generator.clone(), sink.clone());

        let job = manager
            .create_job("lib", inputs(&["Alien", "Heat", "Ran"]), "m", "noir")
            .await
            .unwrap();
        assert!(registry.start(job.id).await);

        let done = wait_terminal(&manager, &job.id).await;
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.completed_items, 3);
        assert_eq!(done.failed_items, 0);
        assert_eq!(done.progress, 100);
        assert!(done.completed_at.is_some());

        // FIFO delivery order.
        let delivered = sink.delivered.lock().unwrap().clone();
        assert_eq!(delivered, vec!["rk-0", "rk-1", "rk-2"]);
    }

    #[tokio::test]
    async fn always_failing_item_exhausts_retries() {
        let generator = FakeGenerator::new(Duration::ZERO, &["Alien"]);
        let sink = Arc::new(RecordingSink::default());
        let (registry, manager) = build(generator.clone(), sink);

        let job = manager
            .create_job("lib", inputs(&["Alien"]), "m", "noir")
            .await
            .unwrap();
        registry.start(job.id).await;

        let done = wait_terminal(&manager, &job.id).await;
        assert_eq!(done.status, JobStatus::Failed);
        assert_eq!(done.failed_items, 1);
        assert_eq!(done.errors.len(), 1);
        assert_eq!(done.errors[0].rating_key, "rk-0");
        // One initial attempt plus the retries.
        assert_eq!(
            generator.calls.load(Ordering::SeqCst),
            MAX_RETRIES as usize
        );
    }

    #[tokio::test]
    async fn partial_failure_is_still_completed() {
        let generator = FakeGenerator::new(Duration::ZERO, &["Heat"]);
        let sink = Arc::new(RecordingSink::default());
        let (registry, manager) = build(generator, sink.clone());

        let job = manager
            .create_job("lib", inputs(&["Alien", "Heat", "Ran"]), "m", "noir")
            .await
            .unwrap();
        registry.start(job.id).await;

        let done = wait_terminal(&manager, &job.id).await;
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.completed_items, 2);
        assert_eq!(done.failed_items, 1);
        assert_eq!(done.errors.len(), 1);
        assert_eq!(done.errors[0].rating_key, "rk-1");
        assert_eq!(sink.delivered.lock().unwrap().as_slice(), ["rk-0", "rk-2"]);
    }

    #[tokio::test]
    async fn start_is_idempotent_while_loop_lives() {
        let generator = FakeGenerator::new(Duration::from_millis(200), &[]);
        let sink = Arc::new(RecordingSink::default());
        let (registry, manager) = build(generator, sink);

        let job = manager
            .create_job("lib", inputs(&["Heat"]), "m", "noir")
            .await
            .unwrap();
        assert!(registry.start(job.id).await);
        assert!(!registry.start(job.id).await);

        let done = wait_terminal(&manager, &job.id).await;
        // The duplicate start spawned nothing: exactly one completion.
        assert_eq!(done.completed_items, 1);
    }

    #[tokio::test]
    async fn interrupted_item_is_recovered_and_reprocessed() {
        let generator = FakeGenerator::new(Duration::ZERO, &[]);
        let sink = Arc::new(RecordingSink::default());
        let (registry, manager) = build(generator, sink);

        let job = manager
            .create_job("lib", inputs(&["Heat"]), "m", "noir")
            .await
            .unwrap();
        // Simulate a process that died mid-item: marker set, queue empty.
        manager.pop_next(&job.id).await.unwrap().unwrap();
        assert!(manager.has_processing(&job.id).await.unwrap());

        registry.start(job.id).await;
        let done = wait_terminal(&manager, &job.id).await;

        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.completed_items, 1);
        assert!(done.errors.is_empty());
    }

    #[tokio::test]
    async fn pause_stops_loop_and_resume_finishes_job() {
        let generator = FakeGenerator::new(Duration::from_millis(150), &[]);
        let sink = Arc::new(RecordingSink::default());
        let (registry, manager) = build(generator, sink);

        let job = manager
            .create_job("lib", inputs(&["Alien", "Heat"]), "m", "noir")
            .await
            .unwrap();
        registry.start(job.id).await;

        // Land the pause while the first item is generating.
        tokio::time::sleep(Duration::from_millis(30)).await;
        manager.pause_job(&job.id).await.unwrap();
        wait_idle(&registry, &job.id).await;

        let paused = manager.require_job(&job.id).await.unwrap();
        assert_eq!(paused.status, JobStatus::Paused);
        assert_eq!(paused.completed_items, 1);
        assert_eq!(
            manager.get_remaining_count(&job.id).await.unwrap(),
            1,
            "second item stays queued across the pause"
        );

        manager.resume_job(&job.id).await.unwrap();
        registry.start(job.id).await;

        let done = wait_terminal(&manager, &job.id).await;
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.completed_items, 2);
    }

    #[tokio::test]
    async fn model_released_only_when_no_job_needs_it() {
        let generator = FakeGenerator::new(Duration::ZERO, &[]);
        let sink = Arc::new(RecordingSink::default());
        let (registry, manager) = build(generator.clone(), sink);

        let first = manager
            .create_job("lib", inputs(&["Alien"]), "m", "noir")
            .await
            .unwrap();
        let second = manager
            .create_job("lib", inputs(&["Heat"]), "m", "noir")
            .await
            .unwrap();

        registry.start(first.id).await;
        wait_terminal(&manager, &first.id).await;
        wait_idle(&registry, &first.id).await;
        // The second job still has queued work: no unload yet.
        assert_eq!(generator.unloads.load(Ordering::SeqCst), 0);

        registry.start(second.id).await;
        wait_terminal(&manager, &second.id).await;
        wait_idle(&registry, &second.id).await;
        assert_eq!(generator.unloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resume_incomplete_jobs_restarts_or_finalizes() {
        let generator = FakeGenerator::new(Duration::ZERO, &[]);
        let sink = Arc::new(RecordingSink::default());
        let (registry, manager) = build(generator, sink);

        // Job with queued work: should get its loop back.
        let pending = manager
            .create_job("lib", inputs(&["Alien"]), "m", "noir")
            .await
            .unwrap();

        // Job that drained but was never finalized (death in the gap
        // between the last item and finalization).
        let stale = manager
            .create_job("lib", inputs(&["Heat"]), "m", "noir")
            .await
            .unwrap();
        let item = manager.pop_next(&stale.id).await.unwrap().unwrap();
        manager.complete_item(&stale.id, &item).await.unwrap();

        let resumed = registry.resume_incomplete_jobs().await.unwrap();
        assert_eq!(resumed, 1);

        let stale_now = manager.require_job(&stale.id).await.unwrap();
        assert_eq!(stale_now.status, JobStatus::Completed);

        let done = wait_terminal(&manager, &pending.id).await;
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.completed_items, 1);
    }

    #[tokio::test]
    async fn delete_job_stops_loop_and_purges_records() {
        let generator = FakeGenerator::new(Duration::from_millis(200), &[]);
        let sink = Arc::new(RecordingSink::default());
        let (registry, manager) = build(generator, sink);

        let job = manager
            .create_job("lib", inputs(&["Alien", "Heat", "Ran"]), "m", "noir")
            .await
            .unwrap();
        registry.start(job.id).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        registry.delete_job(&job.id).await.unwrap();
        wait_idle(&registry, &job.id).await;

        assert!(manager.get_job(&job.id).await.unwrap().is_none());
        assert_eq!(manager.get_remaining_count(&job.id).await.unwrap(), 0);
        assert!(!manager.has_processing(&job.id).await.unwrap());
    }
}
