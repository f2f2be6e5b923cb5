//! In-memory implementation of the [`Store`] trait.
//!
//! Backs the test suites and single-node development runs. Every
//! operation takes the one inner mutex, which gives the same
//! per-operation atomicity the Redis implementation provides.

use std::collections::{HashMap, VecDeque};

use tokio::sync::Mutex;

use crate::{Store, StoreError};

#[derive(Default)]
struct Inner {
    values: HashMap<String, String>,
    lists: HashMap<String, VecDeque<String>>,
}

/// Volatile store with Redis-compatible semantics.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Match `key` against a glob pattern supporting `*` wildcards, the
/// only glob feature the key namespace uses.
fn glob_match(pattern: &str, key: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or("");
    if !key.starts_with(first) {
        return false;
    }
    let mut pos = first.len();
    let mut trailing_wildcard = pattern.ends_with('*');
    for part in parts {
        if part.is_empty() {
            trailing_wildcard = true;
            continue;
        }
        match key[pos..].find(part) {
            Some(idx) => pos += idx + part.len(),
            None => return false,
        }
        trailing_wildcard = false;
    }
    trailing_wildcard || pos == key.len()
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.lock().await.values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .values
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.values.remove(key);
        inner.lists.remove(key);
        Ok(())
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .lists
            .entry(key.to_string())
            .or_default()
            .push_front(value.to_string());
        Ok(())
    }

    async fn rpop(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut inner = self.inner.lock().await;
        let popped = inner.lists.get_mut(key).and_then(|l| l.pop_back());
        // Redis removes empty lists; mirror that so `keys` agrees.
        if inner.lists.get(key).is_some_and(|l| l.is_empty()) {
            inner.lists.remove(key);
        }
        Ok(popped)
    }

    async fn llen(&self, key: &str) -> Result<i64, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .lists
            .get(key)
            .map_or(0, |l| l.len() as i64))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock().await;
        let mut out: Vec<String> = inner
            .values
            .keys()
            .chain(inner.lists.keys())
            .filter(|k| glob_match(pattern, k))
            .cloned()
            .collect();
        out.sort();
        out.dedup();
        Ok(out)
    }

    async fn llen_many(&self, keys: &[String]) -> Result<Vec<i64>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(keys
            .iter()
            .map(|k| inner.lists.get(k).map_or(0, |l| l.len() as i64))
            .collect())
    }
}
