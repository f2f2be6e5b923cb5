//! REST API client for the SD generation service HTTP endpoints.
//!
//! Wraps the service's HTTP API (health, generate, image retrieval,
//! unload, cancel) using [`reqwest`].

use serde::{Deserialize, Serialize};

/// HTTP client for a single SD generation service.
pub struct SdApiClient {
    client: reqwest::Client,
    base_url: String,
}

/// Body of a `POST /generate` request.
///
/// Field names match the service's wire contract exactly.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub num_inference_steps: u32,
    pub guidance_scale: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
}

/// Response returned by `POST /generate` on success.
#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    /// Server-side filename of the generated image; fetch it via
    /// `GET /image/{filename}`.
    pub filename: String,
    /// Wall-clock generation time in seconds, as reported by the service.
    pub generation_time: f64,
}

/// Response returned by `GET /health`.
///
/// The service loads its model lazily, so `model_status` reports
/// `"lazy_waiting"` until the first generation call lands.
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_status: String,
    #[serde(default)]
    pub gpu_name: Option<String>,
}

impl HealthResponse {
    /// Whether the service reports itself ready to accept requests.
    pub fn is_ready(&self) -> bool {
        self.status == "ready"
    }
}

/// Errors from the SD service REST layer.
#[derive(Debug, thiserror::Error)]
pub enum SdApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("SD service error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl SdApiClient {
    /// Create a new client for the SD service.
    ///
    /// * `base_url` - Base HTTP URL, e.g. `http://host:9090`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling with other outbound calls).
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Base HTTP URL of the service.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check service and model status via `GET /health`.
    pub async fn health(&self) -> Result<HealthResponse, SdApiError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Submit one generation request via `POST /generate`.
    ///
    /// The first call after an unload is slow: the service loads the
    /// model into GPU memory on demand.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, SdApiError> {
        let response = self
            .client
            .post(format!("{}/generate", self.base_url))
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch a generated image's raw bytes via `GET /image/{filename}`.
    pub async fn fetch_image(&self, filename: &str) -> Result<Vec<u8>, SdApiError> {
        let response = self
            .client
            .get(format!("{}/image/{}", self.base_url, filename))
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Ask the service to release the loaded model via `POST /unload`.
    ///
    /// Best-effort: the service acknowledges but may decline.
    pub async fn unload(&self) -> Result<(), SdApiError> {
        let response = self
            .client
            .post(format!("{}/unload", self.base_url))
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Ask the service to abort the in-flight generation via
    /// `POST /cancel`.
    ///
    /// Best-effort: the generation may complete before the signal lands.
    pub async fn cancel(&self) -> Result<(), SdApiError> {
        let response = self
            .client
            .post(format!("{}/cancel", self.base_url))
            .send()
            .await?;

        Self::check_status(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`SdApiError::Api`] with the
    /// status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, SdApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SdApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, SdApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), SdApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
