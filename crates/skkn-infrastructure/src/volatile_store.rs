//! Size-bounded text store in the temp directory.

use crate::paths::SkknPaths;
use async_trait::async_trait;
use skkn_core::config::DEFAULT_VOLATILE_LIMIT_BYTES;
use skkn_core::error::{Result, SkknError};
use skkn_core::storage::VolatileStore;
use std::path::PathBuf;

/// One file per key under a temp directory.
///
/// Values above `limit_bytes` are refused with a persistence error, the way
/// browser session storage refuses oversized items.
pub struct TempDirVolatileStore {
    dir: PathBuf,
    limit_bytes: usize,
}

impl TempDirVolatileStore {
    pub fn new(dir: PathBuf, limit_bytes: usize) -> Self {
        Self { dir, limit_bytes }
    }

    pub fn default_location(limit_bytes: usize) -> Self {
        Self::new(SkknPaths::volatile_dir(), limit_bytes)
    }

    fn key_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.txt"))
    }
}

impl Default for TempDirVolatileStore {
    fn default() -> Self {
        Self::default_location(DEFAULT_VOLATILE_LIMIT_BYTES)
    }
}

#[async_trait]
impl VolatileStore for TempDirVolatileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.key_path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if value.len() > self.limit_bytes {
            return Err(SkknError::persistence(format!(
                "value for '{}' is {} bytes, above the {} byte limit",
                key,
                value.len(),
                self.limit_bytes
            )));
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.key_path(key), value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.key_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skkn_core::storage::SESSION_REF_DOCS_KEY;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_round_trip_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = TempDirVolatileStore::new(temp_dir.path().to_path_buf(), 1024);

        assert!(store.get(SESSION_REF_DOCS_KEY).await.unwrap().is_none());
        store.set(SESSION_REF_DOCS_KEY, "tài liệu").await.unwrap();
        assert_eq!(
            store.get(SESSION_REF_DOCS_KEY).await.unwrap().as_deref(),
            Some("tài liệu")
        );
        store.remove(SESSION_REF_DOCS_KEY).await.unwrap();
        store.remove(SESSION_REF_DOCS_KEY).await.unwrap();
        assert!(store.get(SESSION_REF_DOCS_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_value_is_refused() {
        let temp_dir = TempDir::new().unwrap();
        let store = TempDirVolatileStore::new(temp_dir.path().to_path_buf(), 8);

        let err = store.set("big", "0123456789").await.unwrap_err();
        assert!(err.is_persistence());
        assert!(store.get("big").await.unwrap().is_none());
    }
}
