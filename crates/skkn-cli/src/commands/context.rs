//! Wires the infrastructure adapters into an engine and session controller.

use anyhow::Result;
use skkn_application::{EngineServices, SessionController, WorkflowEngine};
use skkn_core::config::AppConfig;
use skkn_core::storage::CredentialStore;
use skkn_infrastructure::{
    AppStateStore, ConfigService, FileSnapshotStore, MarkdownExporter, RotatingKeyPool,
    TempDirVolatileStore,
};
use skkn_interaction::GeminiStreamClient;
use skkn_interaction::supported_models;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration and keys resolved from `config.toml` and the environment.
pub struct Settings {
    pub config: AppConfig,
    pub api_keys: Vec<String>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let service = ConfigService::default_location()?;
        let config = service.get_config()?;
        let api_keys = service.api_keys()?;
        tracing::debug!(
            "[Config] {} loaded, {} API key(s)",
            service.path().display(),
            api_keys.len()
        );
        Ok(Self { config, api_keys })
    }

    fn output_dir(&self) -> Result<PathBuf> {
        match self.config.export.output_dir.as_deref() {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => Ok(std::env::current_dir()?),
        }
    }
}

/// Builds the controller for one run.
///
/// The model is taken from `model_override`, then the model remembered from
/// the last run, then `config.toml`.
pub async fn build_controller(
    settings: &Settings,
    model_override: Option<&str>,
) -> Result<SessionController> {
    let app_state = Arc::new(AppStateStore::default_location()?);
    let stored = app_state.load().await?;

    let key_pool = Arc::new(RotatingKeyPool::new(settings.api_keys.clone()));
    if let Some(key) = stored.api_key.as_deref() {
        key_pool.prefer(key);
    }

    let mut generation = settings.config.generation.clone();
    generation.model = model_override
        .map(str::to_string)
        .or(stored.model)
        .unwrap_or(generation.model);
    if !supported_models::is_supported(&generation.model) {
        tracing::warn!(
            "[Config] Model {} is not in the supported list, requests may fail",
            generation.model
        );
    }

    let engine = Arc::new(WorkflowEngine::new(
        EngineServices {
            llm: Arc::new(GeminiStreamClient::new()),
            key_pool,
            credentials: app_state,
            exporter: Arc::new(MarkdownExporter::new(settings.output_dir()?)),
        },
        generation,
    ));

    Ok(SessionController::new(
        engine,
        Arc::new(FileSnapshotStore::default_location()?),
        Arc::new(volatile_store(settings)),
        &settings.config.session,
    ))
}

pub fn snapshot_store() -> Result<FileSnapshotStore> {
    Ok(FileSnapshotStore::default_location()?)
}

pub fn volatile_store(settings: &Settings) -> TempDirVolatileStore {
    TempDirVolatileStore::default_location(settings.config.session.volatile_limit_bytes)
}
