//! Queue item records — one unit of work (one poster to generate).

use serde::{Deserialize, Serialize};

use crate::types::JobId;

/// Item-level retry cap. An item that fails this many times is recorded
/// permanently in `Job::errors` and never retried again.
pub const MAX_RETRIES: u32 = 3;

// ---------------------------------------------------------------------------
// Media kind
// ---------------------------------------------------------------------------

/// Whether a media item is a film or an episodic series. Drives the
/// prompt wording ("film poster" vs "TV series poster").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Show,
}

impl Default for MediaKind {
    fn default() -> Self {
        MediaKind::Movie
    }
}

// ---------------------------------------------------------------------------
// Batch submission input
// ---------------------------------------------------------------------------

/// One media item as submitted in a batch request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInput {
    /// Media-server rating key identifying the target item.
    pub rating_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, rename = "type")]
    pub media_kind: MediaKind,
}

// ---------------------------------------------------------------------------
// Queue item record
// ---------------------------------------------------------------------------

/// Persisted state of one unit of work, scoped to its owning job.
///
/// Created at job submission, destroyed when the item is permanently
/// completed or permanently failed; re-enqueued (not destroyed) on a
/// recoverable failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: uuid::Uuid,
    /// Library key of the owning job.
    pub library_key: String,
    pub rating_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, rename = "type")]
    pub media_kind: MediaKind,
    /// Failure count so far; starts at 0.
    pub retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl QueueItem {
    /// Build the queue item for one submitted media item.
    pub fn from_input(library_key: &str, input: ItemInput) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            library_key: library_key.to_string(),
            rating_key: input.rating_key,
            title: input.title,
            year: input.year,
            media_kind: input.media_kind,
            retries: 0,
            last_error: None,
        }
    }

    /// Human label for progress display: title plus year when known,
    /// falling back to the rating key.
    pub fn display_label(&self) -> String {
        match (&self.title, self.year) {
            (Some(t), Some(y)) => format!("{t} ({y})"),
            (Some(t), None) => t.clone(),
            (None, _) => self.rating_key.clone(),
        }
    }

    /// Whether another retry is allowed after the current failure count.
    pub fn retries_exhausted(&self) -> bool {
        self.retries >= MAX_RETRIES
    }

    /// The `JobId` this item belongs to is carried in its store key, not
    /// in the record itself; items are namespaced per job.
    pub fn scoped_id(&self, job_id: &JobId) -> String {
        format!("{job_id}:{}", self.id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
