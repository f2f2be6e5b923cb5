//! Redis-backed implementation of the [`Store`] trait.
//!
//! Uses a multiplexed [`ConnectionManager`], which transparently
//! reconnects on connection loss. The manager is cheap to clone; each
//! command clones it rather than holding a lock across awaits.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::{Store, StoreError};

/// Durable store backed by a single Redis instance.
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis at `url` (e.g. `redis://127.0.0.1:6379`).
    ///
    /// Fails fast if the initial connection cannot be established;
    /// later disconnects are handled by the manager's reconnect logic.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)
            .map_err(|e| StoreError::Connection(format!("invalid Redis URL {url}: {e}")))?;

        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| StoreError::Connection(format!("cannot reach Redis at {url}: {e}")))?;

        tracing::info!(url = %url, "Connected to Redis");
        Ok(Self { manager })
    }
}

#[async_trait::async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut con = self.manager.clone();
        Ok(con.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut con = self.manager.clone();
        con.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut con = self.manager.clone();
        con.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut con = self.manager.clone();
        con.lpush::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn rpop(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut con = self.manager.clone();
        Ok(con.rpop(key, None).await?)
    }

    async fn llen(&self, key: &str) -> Result<i64, StoreError> {
        let mut con = self.manager.clone();
        Ok(con.llen(key).await?)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut con = self.manager.clone();
        Ok(con.keys(pattern).await?)
    }

    async fn llen_many(&self, keys: &[String]) -> Result<Vec<i64>, StoreError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut con = self.manager.clone();
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.llen(key);
        }
        Ok(pipe.query_async(&mut con).await?)
    }
}
