//! Session snapshot persisted as a single JSON file.

use crate::paths::SkknPaths;
use crate::storage::AtomicJsonFile;
use async_trait::async_trait;
use skkn_core::error::Result;
use skkn_core::storage::SnapshotStore;
use std::path::PathBuf;

/// Stores the snapshot at `skkn_session_data.json` in the config directory.
pub struct FileSnapshotStore {
    file: AtomicJsonFile<serde_json::Value>,
}

impl FileSnapshotStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicJsonFile::new(path),
        }
    }

    pub fn default_location() -> Result<Self> {
        Ok(Self::new(SkknPaths::session_file()?))
    }

    pub fn path(&self) -> &std::path::Path {
        self.file.path()
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.file.load_raw()?)
    }

    async fn save(&self, json: &str) -> Result<()> {
        self.file.save_raw(json)?;
        tracing::debug!("[Session] Snapshot written to {}", self.file.path().display());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        Ok(self.file.remove()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_load_clear() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSnapshotStore::new(temp_dir.path().join("skkn_session_data.json"));

        assert!(store.load().await.unwrap().is_none());
        store.save(r#"{"state":{"step":3}}"#).await.unwrap();
        assert_eq!(
            store.load().await.unwrap().as_deref(),
            Some(r#"{"state":{"step":3}}"#)
        );

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }
}
