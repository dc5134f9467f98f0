//! Storage ports for session snapshots, large volatile text, and saved
//! credentials.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Key under which the session snapshot is stored.
pub const SESSION_SAVE_KEY: &str = "skkn_session_data";
/// Key under which reference documents are kept in the volatile store.
pub const SESSION_REF_DOCS_KEY: &str = "skkn_ref_docs";

/// Durable storage for the single session snapshot.
///
/// The store deals in raw JSON so a corrupt snapshot can be detected and
/// discarded by the caller.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self) -> Result<Option<String>>;
    async fn save(&self, json: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// Size-bounded key-value storage for text too large for the snapshot.
#[async_trait]
pub trait VolatileStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Remembers the active API key and model between runs.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<StoredCredentials>;
    async fn save_api_key(&self, api_key: &str) -> Result<()>;
    async fn save_model(&self, model: &str) -> Result<()>;
}
