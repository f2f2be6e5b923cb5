use std::time::Duration;

use posterlab_queue::worker::WorkerConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Redis connection URL.
    pub redis_url: String,
    /// Base URL of the SD generation service.
    pub sd_api_url: String,
    /// Root directory posters are written to.
    pub poster_dir: String,
    /// Pause between generated items, in milliseconds.
    pub generation_throttle_ms: u64,
    /// Back-off after an unexpected worker error, in milliseconds.
    pub error_cooldown_ms: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                   |
    /// |--------------------------|---------------------------|
    /// | `HOST`                   | `0.0.0.0`                 |
    /// | `PORT`                   | `3000`                    |
    /// | `CORS_ORIGINS`           | `http://localhost:5173`   |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                      |
    /// | `REDIS_URL`              | `redis://127.0.0.1:6379`  |
    /// | `SD_API_URL`             | `http://127.0.0.1:9090`   |
    /// | `POSTER_DIR`             | `./posters`               |
    /// | `GENERATION_THROTTLE_MS` | `2000`                    |
    /// | `ERROR_COOLDOWN_MS`      | `10000`                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());

        let sd_api_url =
            std::env::var("SD_API_URL").unwrap_or_else(|_| "http://127.0.0.1:9090".into());

        let poster_dir = std::env::var("POSTER_DIR").unwrap_or_else(|_| "./posters".into());

        let generation_throttle_ms: u64 = std::env::var("GENERATION_THROTTLE_MS")
            .unwrap_or_else(|_| "2000".into())
            .parse()
            .expect("GENERATION_THROTTLE_MS must be a valid u64");

        let error_cooldown_ms: u64 = std::env::var("ERROR_COOLDOWN_MS")
            .unwrap_or_else(|_| "10000".into())
            .parse()
            .expect("ERROR_COOLDOWN_MS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            redis_url,
            sd_api_url,
            poster_dir,
            generation_throttle_ms,
            error_cooldown_ms,
        }
    }

    /// Worker pacing derived from the throttle/cooldown settings.
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            throttle: Duration::from_millis(self.generation_throttle_ms),
            cooldown: Duration::from_millis(self.error_cooldown_ms),
        }
    }
}
