use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use posterlab_api::config::ServerConfig;
use posterlab_api::router::build_app_router;
use posterlab_api::state::AppState;
use posterlab_core::queue_item::QueueItem;
use posterlab_core::types::JobId;
use posterlab_queue::lifecycle::ModelLifecycle;
use posterlab_queue::manager::QueueManager;
use posterlab_queue::sink::{PosterSink, SinkError};
use posterlab_queue::worker::{WorkerConfig, WorkerRegistry};
use posterlab_sdapi::{GenerateRequest, GeneratedPoster, PosterGenerator, SdApiError};
use posterlab_store::MemoryStore;

/// Build a test `ServerConfig` with safe defaults. No Redis or SD
/// service is contacted: the store is in-memory and the generator is
/// scripted.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        redis_url: "redis://unused".to_string(),
        sd_api_url: "http://unused".to_string(),
        poster_dir: "./unused".to_string(),
        generation_throttle_ms: 1,
        error_cooldown_ms: 5,
    }
}

/// Generator scripted by prompt content: prompts containing any of the
/// given substrings always fail. Everything else succeeds instantly
/// with a tiny PNG.
pub struct ScriptedGenerator {
    fail_substrings: Vec<String>,
}

impl ScriptedGenerator {
    pub fn new(fail_substrings: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            fail_substrings: fail_substrings.iter().map(|s| s.to_string()).collect(),
        })
    }
}

#[async_trait::async_trait]
impl PosterGenerator for ScriptedGenerator {
    async fn ensure_ready(&self) -> Result<(), SdApiError> {
        Ok(())
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GeneratedPoster, SdApiError> {
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
            bytes: vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0],
        })
    }

    async fn cancel(&self) -> Result<(), SdApiError> {
        Ok(())
    }

    async fn unload(&self) -> Result<(), SdApiError> {
        Ok(())
    }
}

/// Records the rating keys delivered to it.
#[derive(Default)]
pub struct RecordingSink {
    pub delivered: Mutex<Vec<String>>,
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

/// Everything a test needs: the app plus handles into the backing state.
pub struct TestApp {
    pub app: Router,
    pub manager: Arc<QueueManager>,
    pub sink: Arc<RecordingSink>,
}

/// Build the full application router over an in-memory store, wired the
/// same way `main.rs` wires production (same middleware stack, same
/// worker registry).
pub fn build_test_app(generator: Arc<ScriptedGenerator>) -> TestApp {
    let config = test_config();

    let manager = Arc::new(QueueManager::new(Arc::new(MemoryStore::new())));
    let sink = Arc::new(RecordingSink::default());
    let lifecycle = Arc::new(ModelLifecycle::new(manager.clone(), generator.clone()));
    let workers = Arc::new(WorkerRegistry::new(
        manager.clone(),
        generator,
        sink.clone(),
        lifecycle,
        WorkerConfig {
            throttle: Duration::from_millis(1),
            cooldown: Duration::from_millis(5),
        },
    ));

    let state = AppState {
        manager: manager.clone(),
        workers,
        sd: None,
        config: Arc::new(config.clone()),
    };

    TestApp {
        app: build_app_router(state, &config),
        manager,
        sink,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Poll the backing store until the job reaches a terminal status.
pub async fn wait_terminal(manager: &QueueManager, job_id: &JobId) -> posterlab_core::job::Job {
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
