//! Configuration service.
//!
//! Loads `config.toml` and resolves the API key list, with the environment
//! taking precedence over the file.

use crate::paths::SkknPaths;
use skkn_core::config::AppConfig;
use skkn_core::error::{Result, SkknError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Comma-separated API keys. Overrides `api_keys` in `config.toml`.
pub const API_KEYS_ENV: &str = "SKKN_GEMINI_API_KEYS";

/// Splits a comma-separated key list, trimming and dropping empty entries.
pub fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

/// Loads and caches the application configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    config: Arc<RwLock<Option<AppConfig>>>,
}

impl ConfigService {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn default_location() -> Result<Self> {
        Ok(Self::new(SkknPaths::config_file()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the configuration, reading the file on first access.
    ///
    /// A missing file yields defaults. A malformed one is a config error.
    pub fn get_config(&self) -> Result<AppConfig> {
        {
            let read_lock = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let loaded = Self::load_from(&self.path)?;
        {
            let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
            *write_lock = Some(loaded.clone());
        }
        Ok(loaded)
    }

    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = None;
    }

    /// API keys from the environment, or from the file when the variable is unset.
    pub fn api_keys(&self) -> Result<Vec<String>> {
        if let Ok(raw) = std::env::var(API_KEYS_ENV) {
            let keys = parse_key_list(&raw);
            if !keys.is_empty() {
                return Ok(keys);
            }
        }
        let config = self.get_config()?;
        Ok(config
            .api_keys
            .iter()
            .map(|key| key.trim())
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn load_from(path: &Path) -> Result<AppConfig> {
        if !path.exists() {
            tracing::debug!("[Config] {} not found, using defaults", path.display());
            return Ok(AppConfig::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            SkknError::config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skkn_core::config::ReviewPolicy;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path().join("config.toml"));
        assert_eq!(service.get_config().unwrap(), AppConfig::default());
    }

    #[test]
    fn test_reads_sections_and_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
api_keys = [" key-a ", "", "key-b"]

[generation]
model = "gemini-2.5-pro"
review_policy = "human_gated"

[session]
autosave_debounce_ms = 500
"#,
        )
        .unwrap();

        let service = ConfigService::new(path);
        let config = service.get_config().unwrap();
        assert_eq!(config.generation.model, "gemini-2.5-pro");
        assert_eq!(config.generation.review_policy, ReviewPolicy::HumanGated);
        assert_eq!(config.session.autosave_debounce_ms, 500);
        assert_eq!(config.api_keys.len(), 3);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[generation\nmodel = 1").unwrap();

        let err = ConfigService::new(path).get_config().unwrap_err();
        assert!(matches!(err, SkknError::Config(_)));
    }

    #[test]
    fn test_parse_key_list() {
        assert_eq!(parse_key_list(" a, ,b,,c "), vec!["a", "b", "c"]);
        assert!(parse_key_list("").is_empty());
    }
}
