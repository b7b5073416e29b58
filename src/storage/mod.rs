//! Snapshot persistence.
//!
//! One file per watch task holds the last persisted snapshot:
//!
//! ```text
//! storage/
//! ├── cases.json
//! └── musicals.json
//! ```

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Record, Snapshot};

// Re-export for convenience
pub use local::LocalStorage;

/// On-disk form of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile<R> {
    /// ISO 8601 timestamp of the write
    pub updated_at: DateTime<Utc>,
    /// Record count
    pub count: usize,
    pub records: Snapshot<R>,
}

impl<R> SnapshotFile<R> {
    pub fn new(records: Snapshot<R>) -> Self {
        Self {
            updated_at: Utc::now(),
            count: records.len(),
            records,
        }
    }
}

/// Trait for snapshot storage backends.
#[async_trait]
pub trait SnapshotStore<R: Record>: Send + Sync {
    /// Load the last persisted snapshot; `None` when the task never persisted one.
    async fn load(&self, task_id: &str) -> Result<Option<Snapshot<R>>>;

    /// Replace the persisted snapshot.
    async fn save(&self, task_id: &str, snapshot: &Snapshot<R>) -> Result<()>;
}
