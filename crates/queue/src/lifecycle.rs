//! Decides when the shared generation model can be released.
//!
//! The model is expensive to hold in GPU memory but also expensive to
//! reload, so release only happens once the whole system has gone
//! quiet: every queue drained and no job still active. Each worker loop
//! calls [`ModelLifecycle::maybe_release`] as it exits; the last one out
//! turns off the lights.

use std::sync::Arc;

use posterlab_sdapi::PosterGenerator;

use crate::manager::QueueManager;

pub struct ModelLifecycle {
    manager: Arc<QueueManager>,
    generator: Arc<dyn PosterGenerator>,
}

impl ModelLifecycle {
    pub fn new(manager: Arc<QueueManager>, generator: Arc<dyn PosterGenerator>) -> Self {
        Self { manager, generator }
    }

    /// Release the model if nothing in the system still needs it.
    ///
    /// Returns whether an unload was requested. The two gates pull in
    /// opposite directions on error: an unreadable queue listing counts
    /// as empty (the store being down means no worker can make progress
    /// anyway), while an unreadable job listing blocks the release,
    /// since an active job we merely failed to see would face a cold
    /// reload mid-run.
    pub async fn maybe_release(&self) -> bool {
        if !self.manager.check_all_queues_empty().await {
            tracing::debug!("Queues not empty; keeping model loaded");
            return false;
        }

        match self.manager.get_active_jobs().await {
            Ok(active) if active.is_empty() => {}
            Ok(active) => {
                tracing::debug!(active_jobs = active.len(), "Active jobs remain; keeping model loaded");
                return false;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot list active jobs; keeping model loaded");
                return false;
            }
        }

        tracing::info!("All queues drained and no active jobs; releasing model");
        if let Err(e) = self.generator.unload().await {
            // Best-effort: the service may already have unloaded, or be
            // unreachable. Either way there is nothing left to do here.
            tracing::warn!(error = %e, "Model unload request failed");
        }
        true
    }
}
