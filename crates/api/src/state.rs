use std::sync::Arc;

use posterlab_queue::manager::QueueManager;
use posterlab_queue::worker::WorkerRegistry;
use posterlab_sdapi::SdApiClient;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Queue manager over the durable store.
    pub manager: Arc<QueueManager>,
    /// Worker loop registry.
    pub workers: Arc<WorkerRegistry>,
    /// Direct SD service client for the health passthrough. `None` in
    /// tests that run without a generation service.
    pub sd: Option<Arc<SdApiClient>>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
