//! Durable key-value store seam.
//!
//! The queue and worker crates talk to storage exclusively through the
//! [`Store`] trait: single-key get/set/delete, atomic list push/pop,
//! pattern key enumeration, and pipelined length queries. Production
//! runs against Redis ([`RedisStore`]); tests and single-node
//! development can use [`MemoryStore`].

pub mod memory;
pub mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Errors from the durable store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying Redis command failed (network, protocol, etc.).
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Failed to establish the initial connection.
    #[error("Store connection failed: {0}")]
    Connection(String),
}

/// Narrow durable-store contract consumed by the queue manager.
///
/// All operations are atomic at the single-key or single-list level;
/// callers never assume multi-key transactions. List discipline is
/// push-left/pop-right, i.e. [`lpush`](Store::lpush) enqueues and
/// [`rpop`](Store::rpop) dequeues in FIFO order.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Fetch the value at `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set `key` to `value`, overwriting any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Push `value` onto the left end of the list at `key`.
    async fn lpush(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Atomically pop one value from the right end of the list at
    /// `key`, or `None` if the list is empty or absent.
    async fn rpop(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Length of the list at `key`; 0 for an absent key.
    async fn llen(&self, key: &str) -> Result<i64, StoreError>;

    /// All keys matching a glob-style pattern (e.g. `posterlab:queue:*`).
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    /// Pipelined list lengths for many keys in one round trip.
    ///
    /// Result order matches `keys` order.
    async fn llen_many(&self, keys: &[String]) -> Result<Vec<i64>, StoreError>;
}
