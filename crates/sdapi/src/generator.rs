//! The [`PosterGenerator`] seam between the worker loop and the SD
//! service.
//!
//! The worker only needs four capabilities: warm the model, produce
//! image bytes for a request, and fire the best-effort cancel/unload
//! signals. Tests substitute a scripted implementation.

use crate::api::{GenerateRequest, SdApiClient, SdApiError};

/// One generated poster: the service-side filename plus the fetched
/// image bytes.
#[derive(Debug, Clone)]
pub struct GeneratedPoster {
    pub filename: String,
    /// Generation wall-clock seconds reported by the service.
    pub generation_time: f64,
    pub bytes: Vec<u8>,
}

/// Generation capabilities consumed by the worker loop.
#[async_trait::async_trait]
pub trait PosterGenerator: Send + Sync {
    /// Signal the service that generation is about to start so it can
    /// begin loading the model. Callers treat failures as non-fatal;
    /// readiness problems surface per-item through [`generate`](Self::generate).
    async fn ensure_ready(&self) -> Result<(), SdApiError>;

    /// Generate one poster and return its bytes.
    async fn generate(&self, request: &GenerateRequest) -> Result<GeneratedPoster, SdApiError>;

    /// Best-effort: abort the in-flight generation.
    async fn cancel(&self) -> Result<(), SdApiError>;

    /// Best-effort: release the loaded model from GPU memory.
    async fn unload(&self) -> Result<(), SdApiError>;
}

#[async_trait::async_trait]
impl PosterGenerator for SdApiClient {
    async fn ensure_ready(&self) -> Result<(), SdApiError> {
        let health = self.health().await?;
        tracing::info!(
            status = %health.status,
            model_status = %health.model_status,
            gpu = health.gpu_name.as_deref().unwrap_or("unknown"),
            "SD service health",
        );
        Ok(())
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GeneratedPoster, SdApiError> {
        let response = SdApiClient::generate(self, request).await?;
        let bytes = self.fetch_image(&response.filename).await?;

        tracing::debug!(
            filename = %response.filename,
            generation_secs = response.generation_time,
            size_bytes = bytes.len(),
            "Poster generated",
        );

        Ok(GeneratedPoster {
            filename: response.filename,
            generation_time: response.generation_time,
            bytes,
        })
    }

    async fn cancel(&self) -> Result<(), SdApiError> {
        SdApiClient::cancel(self).await
    }

    async fn unload(&self) -> Result<(), SdApiError> {
        SdApiClient::unload(self).await
    }
}

/// Pick a random seed for one generation request.
///
/// Each item gets a fresh seed so a retried item does not deterministically
/// reproduce the same failure mode.
pub fn random_seed() -> u32 {
    rand::random::<u32>()
}
