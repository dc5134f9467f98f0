//! Session persistence: debounced autosave, explicit save and clear, and
//! restore-on-load.

use crate::state::ChangeNotice;
use crate::workflow_engine::WorkflowEngine;
use skkn_core::config::SessionConfig;
use skkn_core::error::{Result, SkknError};
use skkn_core::session::SessionData;
use skkn_core::step::INPUT_STEP;
use skkn_core::storage::{SESSION_REF_DOCS_KEY, SnapshotStore, VolatileStore};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

fn saveable(notice: ChangeNotice) -> bool {
    notice.step > INPUT_STEP && !notice.is_streaming
}

/// The parts of the controller the autosave task needs.
#[derive(Clone)]
struct Persistence {
    engine: Arc<WorkflowEngine>,
    snapshots: Arc<dyn SnapshotStore>,
    volatile: Arc<dyn VolatileStore>,
}

impl Persistence {
    async fn save(&self) -> Result<()> {
        let data = self.engine.snapshot();
        self.snapshots.save(&data.to_json()?).await?;

        let reference_documents = self.engine.reference_documents();
        if !reference_documents.is_empty() {
            if let Err(err) = self
                .volatile
                .set(SESSION_REF_DOCS_KEY, &reference_documents)
                .await
            {
                tracing::warn!("[Session] Reference documents not saved: {}", err);
            }
        }
        tracing::debug!("[Session] Saved at step {} ({})", data.step(), data.saved_at);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.snapshots.clear().await?;
        self.volatile.remove(SESSION_REF_DOCS_KEY).await?;
        tracing::info!("[Session] Saved session cleared");
        Ok(())
    }

    /// Waits for a saveable change, then saves once `debounce` passes
    /// without another one.
    async fn autosave_loop(self, mut changes: watch::Receiver<ChangeNotice>, debounce: Duration) {
        loop {
            if changes.changed().await.is_err() {
                return;
            }
            let notice = *changes.borrow_and_update();
            if !saveable(notice) {
                continue;
            }

            loop {
                tokio::select! {
                    changed = changes.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        let notice = *changes.borrow_and_update();
                        if !saveable(notice) {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(debounce) => {
                        if let Err(err) = self.save().await {
                            tracing::warn!("[Session] Auto-save failed: {}", err);
                        }
                        break;
                    }
                }
            }
        }
    }
}

/// Owns the session snapshot.
///
/// Auto-save failures are logged and otherwise ignored: the in-memory state
/// stays authoritative until the next successful save.
pub struct SessionController {
    persistence: Persistence,
    debounce: Duration,
    autosave: Mutex<Option<JoinHandle<()>>>,
}

impl SessionController {
    pub fn new(
        engine: Arc<WorkflowEngine>,
        snapshots: Arc<dyn SnapshotStore>,
        volatile: Arc<dyn VolatileStore>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            persistence: Persistence {
                engine,
                snapshots,
                volatile,
            },
            debounce: config.autosave_debounce(),
            autosave: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &Arc<WorkflowEngine> {
        &self.persistence.engine
    }

    /// Starts watching the engine. Calling it again has no effect.
    pub fn start_autosave(&self) {
        let mut autosave = self.autosave.lock().unwrap_or_else(|e| e.into_inner());
        if autosave.is_some() {
            return;
        }
        let changes = self.persistence.engine.subscribe();
        let persistence = self.persistence.clone();
        let debounce = self.debounce;
        *autosave = Some(tokio::spawn(persistence.autosave_loop(changes, debounce)));
        tracing::debug!("[Session] Auto-save every {:?} of inactivity", debounce);
    }

    pub fn stop_autosave(&self) {
        let handle = self.autosave.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    /// Writes a snapshot immediately.
    pub async fn save_now(&self) -> Result<()> {
        if !self.persistence.engine.state().has_started() {
            return Err(SkknError::invalid_state("Chưa có phiên làm việc để lưu"));
        }
        self.persistence.save().await
    }

    /// Deletes the snapshot and the stored reference documents.
    pub async fn clear(&self) -> Result<()> {
        self.persistence.clear().await
    }

    /// A saved session past the input form, if one is stored.
    ///
    /// A snapshot that cannot be read or parsed is deleted.
    pub async fn pending_restore(&self) -> Option<SessionData> {
        let raw = match self.persistence.snapshots.load().await {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::warn!("[Session] Failed to read saved session: {}", err);
                self.discard_quietly().await;
                return None;
            }
        };
        match SessionData::from_json(&raw) {
            Ok(data) if data.step() > INPUT_STEP => Some(data),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!("[Session] Discarding corrupt saved session: {}", err);
                self.discard_quietly().await;
                None
            }
        }
    }

    /// Restores `data` into the engine with the stored reference documents.
    pub async fn apply_restore(&self, data: SessionData) -> Result<()> {
        let reference_documents = match self.persistence.volatile.get(SESSION_REF_DOCS_KEY).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!("[Session] Reference documents unavailable: {}", err);
                None
            }
        };
        self.persistence.engine.restore_from(data, reference_documents)
    }

    /// Drops the pending session and starts fresh.
    pub async fn discard(&self) -> Result<()> {
        self.clear().await
    }

    async fn discard_quietly(&self) {
        if let Err(err) = self.persistence.clear().await {
            tracing::warn!("[Session] Failed to delete saved session: {}", err);
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop_autosave();
    }
}
