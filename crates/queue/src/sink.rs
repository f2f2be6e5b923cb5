//! Destination for finished poster bytes.
//!
//! The worker loop hands every generated image to a [`PosterSink`]; the
//! default implementation writes them to a library-scoped directory on
//! the local filesystem. Tests substitute a recording sink.

use std::path::{Path, PathBuf};

use posterlab_core::queue_item::QueueItem;

/// A delivery failure counts against the item like a generation failure.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to store poster: {0}")]
    Io(#[from] std::io::Error),
}

/// Receives generated poster bytes for one queue item.
#[async_trait::async_trait]
pub trait PosterSink: Send + Sync {
    /// Persist the poster for `item`. Idempotent: delivering the same
    /// item twice overwrites the earlier poster.
    async fn put(&self, item: &QueueItem, bytes: &[u8]) -> Result<(), SinkError>;
}

/// Writes posters to `<root>/<library_key>/<rating_key>.png`.
///
/// Keyed by rating key rather than the service-side filename so a
/// retried or regenerated item replaces its earlier poster instead of
/// accumulating siblings.
pub struct FsPosterSink {
    root: PathBuf,
}

impl FsPosterSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path a given item's poster will be written to.
    pub fn poster_path(&self, item: &QueueItem) -> PathBuf {
        self.root
            .join(&item.library_key)
            .join(format!("{}.png", item.rating_key))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait::async_trait]
impl PosterSink for FsPosterSink {
    async fn put(&self, item: &QueueItem, bytes: &[u8]) -> Result<(), SinkError> {
        let path = self.poster_path(item);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(
            rating_key = %item.rating_key,
            path = %path.display(),
            size_bytes = bytes.len(),
            "Poster stored",
        );
        Ok(())
    }
}
