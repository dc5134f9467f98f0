//! Path resolution for skkn configuration and session files.
//!
//! Everything lives under one config directory. `SKKN_CONFIG_DIR` overrides
//! the platform default, which keeps tests and portable installs isolated.

use skkn_core::error::SkknError;
use skkn_core::storage::SESSION_SAVE_KEY;
use std::path::PathBuf;

/// Environment variable that replaces the platform config directory.
pub const CONFIG_DIR_ENV: &str = "SKKN_CONFIG_DIR";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for SkknError {
    fn from(e: PathError) -> Self {
        SkknError::config(e.to_string())
    }
}

/// Unified path management for skkn.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/skkn/                 # Config directory
/// ├── config.toml                 # Application configuration
/// ├── app_state.json              # Active API key and model
/// └── skkn_session_data.json      # Session snapshot
///
/// $TMPDIR/skkn/                   # Volatile store (reference documents)
/// ```
pub struct SkknPaths;

impl SkknPaths {
    pub fn config_dir() -> Result<PathBuf, PathError> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|dir| !dir.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        dirs::config_dir()
            .map(|dir| dir.join("skkn"))
            .ok_or(PathError::HomeDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn app_state_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("app_state.json"))
    }

    pub fn session_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join(format!("{SESSION_SAVE_KEY}.json")))
    }

    /// Directory for the volatile store. Cleared by the OS, not by us.
    pub fn volatile_dir() -> PathBuf {
        std::env::temp_dir().join("skkn")
    }
}
