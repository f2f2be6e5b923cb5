use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use posterlab_api::config::ServerConfig;
use posterlab_api::router::build_app_router;
use posterlab_api::state::AppState;
use posterlab_queue::lifecycle::ModelLifecycle;
use posterlab_queue::manager::QueueManager;
use posterlab_queue::sink::FsPosterSink;
use posterlab_queue::worker::WorkerRegistry;
use posterlab_sdapi::SdApiClient;
use posterlab_store::RedisStore;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "posterlab=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Durable store ---
    let store = RedisStore::connect(&config.redis_url)
        .await
        .expect("Failed to connect to Redis");
    tracing::info!(url = %config.redis_url, "Connected to Redis");

    // --- Queue manager ---
    let manager = Arc::new(QueueManager::new(Arc::new(store)));

    // --- SD service client ---
    let sd = Arc::new(SdApiClient::new(config.sd_api_url.clone()));
    tracing::info!(url = %config.sd_api_url, "SD service client created");

    // --- Poster sink ---
    let sink = Arc::new(FsPosterSink::new(config.poster_dir.clone()));

    // --- Worker registry ---
    let lifecycle = Arc::new(ModelLifecycle::new(manager.clone(), sd.clone()));
    let workers = Arc::new(WorkerRegistry::new(
        manager.clone(),
        sd.clone(),
        sink,
        lifecycle,
        config.worker_config(),
    ));

    // --- Resume jobs interrupted by the previous shutdown ---
    match workers.resume_incomplete_jobs().await {
        Ok(resumed) => tracing::info!(resumed, "Incomplete job recovery finished"),
        Err(e) => tracing::error!(error = %e, "Incomplete job recovery failed"),
    }

    // --- App state ---
    let state = AppState {
        manager,
        workers,
        sd: Some(sd),
        config: Arc::new(config.clone()),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // Worker loops are left to die with the process; the processing
    // marker and queue records make any in-flight item recoverable at
    // the next boot.
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
