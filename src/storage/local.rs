//! Local filesystem storage implementation.
//!
//! Snapshots are written to `{root}/{task_id}.json` through a temporary file
//! and a rename, so a crash mid-write leaves the previous snapshot intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{Record, Snapshot};
use crate::storage::{SnapshotFile, SnapshotStore};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    fn snapshot_key(task_id: &str) -> Result<String> {
        if task_id.is_empty() || task_id.contains(['/', '\\']) || task_id.starts_with('.') {
            return Err(AppError::invalid_input(format!(
                "task id '{task_id}' cannot be used as a file name"
            )));
        }
        Ok(format!("{task_id}.json"))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<R> SnapshotStore<R> for LocalStorage
where
    R: Record + Serialize + DeserializeOwned,
{
    async fn load(&self, task_id: &str) -> Result<Option<Snapshot<R>>> {
        let key = Self::snapshot_key(task_id)?;
        match self.read_json::<SnapshotFile<R>>(&key).await? {
            Some(file) => {
                log::debug!("Loaded {} records from {}", file.records.len(), key);
                Ok(Some(file.records))
            }
            None => {
                log::info!("No snapshot stored for task {task_id}");
                Ok(None)
            }
        }
    }

    async fn save(&self, task_id: &str, snapshot: &Snapshot<R>) -> Result<()> {
        let key = Self::snapshot_key(task_id)?;
        let file = SnapshotFile::new(snapshot.clone());
        self.write_json(&key, &file).await?;
        log::info!("Snapshot: {} records written to {}", file.count, key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Performance, Product};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.write_bytes("test.txt", b"hello").await.unwrap();
        let data = storage.read_bytes("test.txt").await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
        assert!(!tmp.path().join("test.tmp").exists());
    }

    #[tokio::test]
    async fn test_load_missing_snapshot() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let loaded: Option<Snapshot<Product>> = storage.load("cases").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_and_load_snapshot() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("nested"));

        let mut product = Product::new("P1", "Case", 900);
        product.lowest_price = Some(900);
        let snapshot: Snapshot<Product> = vec![product, Product::new("P2", "Film", 300)].into();

        storage.save("cases", &snapshot).await.unwrap();
        let loaded: Snapshot<Product> = storage.load("cases").await.unwrap().unwrap();

        assert_eq!(loaded, snapshot);

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(tmp.path().join("nested/cases.json")).unwrap())
                .unwrap();
        assert_eq!(raw["count"], 2);
        assert!(raw["updated_at"].is_string());
    }

    #[tokio::test]
    async fn test_save_replaces_previous() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let first: Snapshot<Performance> = vec![Performance::new("Cats", "Hall A")].into();
        let second: Snapshot<Performance> = vec![Performance::new("Rent", "Hall B")].into();
        storage.save("musicals", &first).await.unwrap();
        storage.save("musicals", &second).await.unwrap();

        let loaded: Snapshot<Performance> = storage.load("musicals").await.unwrap().unwrap();
        assert_eq!(loaded, second);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("cases.json"), b"{not json").unwrap();
        let storage = LocalStorage::new(tmp.path());

        let result: Result<Option<Snapshot<Product>>> = storage.load("cases").await;
        assert!(matches!(result, Err(AppError::Json(_))));
    }

    #[tokio::test]
    async fn test_rejects_path_like_task_ids() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let snapshot: Snapshot<Product> = Snapshot::new();

        assert!(storage.save("../escape", &snapshot).await.is_err());
        assert!(storage.save("", &snapshot).await.is_err());
    }
}
