//! Active API key and model, remembered between runs.

use crate::paths::SkknPaths;
use crate::storage::AtomicJsonFile;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skkn_core::error::Result;
use skkn_core::storage::{CredentialStore, StoredCredentials};
use std::path::PathBuf;

/// On-disk layout of `app_state.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct AppStateDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gemini_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    selected_model: Option<String>,
}

pub struct AppStateStore {
    file: AtomicJsonFile<AppStateDto>,
}

impl AppStateStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicJsonFile::new(path),
        }
    }

    pub fn default_location() -> Result<Self> {
        Ok(Self::new(SkknPaths::app_state_file()?))
    }
}

#[async_trait]
impl CredentialStore for AppStateStore {
    async fn load(&self) -> Result<StoredCredentials> {
        let dto = self.file.load()?.unwrap_or_default();
        Ok(StoredCredentials {
            api_key: dto.gemini_api_key.filter(|key| !key.is_empty()),
            model: dto.selected_model.filter(|model| !model.is_empty()),
        })
    }

    async fn save_api_key(&self, api_key: &str) -> Result<()> {
        let api_key = api_key.to_string();
        self.file
            .update(AppStateDto::default(), |dto| dto.gemini_api_key = Some(api_key))?;
        Ok(())
    }

    async fn save_model(&self, model: &str) -> Result<()> {
        let model = model.to_string();
        self.file
            .update(AppStateDto::default(), |dto| dto.selected_model = Some(model))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_key_and_model_are_saved_independently() {
        let temp_dir = TempDir::new().unwrap();
        let store = AppStateStore::new(temp_dir.path().join("app_state.json"));

        assert_eq!(store.load().await.unwrap(), StoredCredentials::default());

        store.save_api_key("AIza-first").await.unwrap();
        store.save_model("gemini-2.5-pro").await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.api_key.as_deref(), Some("AIza-first"));
        assert_eq!(loaded.model.as_deref(), Some("gemini-2.5-pro"));

        let raw = std::fs::read_to_string(temp_dir.path().join("app_state.json")).unwrap();
        assert!(raw.contains("\"gemini_api_key\""));
        assert!(raw.contains("\"selected_model\""));
    }
}
