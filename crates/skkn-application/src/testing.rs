//! In-memory collaborators for application tests.

use async_trait::async_trait;
use skkn_core::error::{ErrorClass, LlmError, Result, SkknError};
use skkn_core::export::{DocumentExporter, ExportRequest};
use skkn_core::key_pool::{KeyPool, RotationResult};
use skkn_core::llm::{ChatMessage, ChunkSink, LlmClient};
use skkn_core::storage::{CredentialStore, SnapshotStore, StoredCredentials, VolatileStore};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

pub enum Reply {
    Text(Vec<String>),
    Fail(LlmError),
    /// Streams one chunk, then waits until cancelled.
    WaitForCancel,
}

/// Scripted LLM. Unscripted calls reply with a numbered placeholder text.
#[derive(Default)]
pub struct MockLlm {
    script: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
    inits: Mutex<Vec<(String, String)>>,
    history: Mutex<Vec<ChatMessage>>,
}

impl MockLlm {
    pub fn push_reply(&self, text: &str) {
        self.script.lock().unwrap().push_back(Reply::Text(vec![text.to_string()]));
    }

    pub fn push_chunks(&self, chunks: &[&str]) {
        let chunks = chunks.iter().map(|c| c.to_string()).collect();
        self.script.lock().unwrap().push_back(Reply::Text(chunks));
    }

    pub fn push_failure(&self, err: LlmError) {
        self.script.lock().unwrap().push_back(Reply::Fail(err));
    }

    pub fn push_wait_for_cancel(&self) {
        self.script.lock().unwrap().push_back(Reply::WaitForCancel);
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn inits(&self) -> Vec<(String, String)> {
        self.inits.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    fn initialize(&self, api_key: &str, model: &str) {
        self.inits
            .lock()
            .unwrap()
            .push((api_key.to_string(), model.to_string()));
        self.history.lock().unwrap().clear();
    }

    async fn send_stream(
        &self,
        prompt: &str,
        on_chunk: ChunkSink<'_>,
        cancel: &CancellationToken,
    ) -> std::result::Result<(), LlmError> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };
        let reply = self.script.lock().unwrap().pop_front();
        match reply.unwrap_or_else(|| Reply::Text(vec![format!("Nội dung lần gọi {call}")])) {
            Reply::Text(chunks) => {
                for chunk in &chunks {
                    on_chunk(chunk);
                }
                let mut history = self.history.lock().unwrap();
                history.push(ChatMessage::user(prompt));
                history.push(ChatMessage::model(chunks.concat()));
                Ok(())
            }
            Reply::Fail(err) => Err(err),
            Reply::WaitForCancel => {
                on_chunk("một phần");
                cancel.cancelled().await;
                Err(LlmError::cancelled())
            }
        }
    }

    fn history(&self) -> Vec<ChatMessage> {
        self.history.lock().unwrap().clone()
    }

    fn set_history(&self, history: Vec<ChatMessage>) {
        *self.history.lock().unwrap() = history;
    }
}

#[derive(Default)]
struct PoolState {
    keys: Vec<String>,
    failed: Vec<String>,
    active: usize,
    marked: Vec<String>,
    resets: usize,
}

impl PoolState {
    fn next_usable(&self, from: usize) -> Option<usize> {
        let len = self.keys.len();
        (1..len)
            .map(|offset| (from + offset) % len)
            .find(|index| !self.failed.contains(&self.keys[*index]))
    }
}

/// Key pool that records every mark and reset.
pub struct MockKeyPool {
    state: Mutex<PoolState>,
}

impl MockKeyPool {
    pub fn new(keys: &[&str]) -> Self {
        Self {
            state: Mutex::new(PoolState {
                keys: keys.iter().map(|k| k.to_string()).collect(),
                ..Default::default()
            }),
        }
    }

    pub fn marked(&self) -> Vec<String> {
        self.state.lock().unwrap().marked.clone()
    }

    pub fn resets(&self) -> usize {
        self.state.lock().unwrap().resets
    }
}

impl KeyPool for MockKeyPool {
    fn active_key(&self) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.keys.get(state.active).cloned()
    }

    fn mark_key_error(&self, key: &str, _reason: ErrorClass) -> RotationResult {
        let mut state = self.state.lock().unwrap();
        state.marked.push(key.to_string());
        state.failed.push(key.to_string());
        let from = state.keys.iter().position(|k| k == key).unwrap_or(state.active);
        match state.next_usable(from) {
            Some(next) => {
                state.active = next;
                RotationResult::rotated(state.keys[next].clone(), format!("key #{}", next + 1))
            }
            None => RotationResult::exhausted("exhausted"),
        }
    }

    fn rotate_to_next_key(&self, _reason: &str) -> RotationResult {
        let mut state = self.state.lock().unwrap();
        let active = state.active;
        match state.next_usable(active) {
            Some(next) => {
                state.active = next;
                RotationResult::rotated(state.keys[next].clone(), format!("key #{}", next + 1))
            }
            None => RotationResult::exhausted("exhausted"),
        }
    }

    fn reset_all_keys(&self) {
        let mut state = self.state.lock().unwrap();
        state.failed.clear();
        state.resets += 1;
    }
}

#[derive(Default)]
pub struct MemoryCredentials {
    stored: Mutex<StoredCredentials>,
}

impl MemoryCredentials {
    pub fn stored(&self) -> StoredCredentials {
        self.stored.lock().unwrap().clone()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentials {
    async fn load(&self) -> Result<StoredCredentials> {
        Ok(self.stored())
    }

    async fn save_api_key(&self, api_key: &str) -> Result<()> {
        self.stored.lock().unwrap().api_key = Some(api_key.to_string());
        Ok(())
    }

    async fn save_model(&self, model: &str) -> Result<()> {
        self.stored.lock().unwrap().model = Some(model.to_string());
        Ok(())
    }
}

/// Snapshot store with switches that make loads or saves fail.
#[derive(Default)]
pub struct MemorySnapshotStore {
    value: Mutex<Option<String>>,
    saves: Mutex<usize>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
}

impl MemorySnapshotStore {
    pub fn with_raw(raw: &str) -> Self {
        Self {
            value: Mutex::new(Some(raw.to_string())),
            ..Default::default()
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.value.lock().unwrap().clone()
    }

    /// Successful saves only.
    pub fn saves(&self) -> usize {
        *self.saves.lock().unwrap()
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<Option<String>> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(SkknError::persistence("snapshot unreadable"));
        }
        Ok(self.raw())
    }

    async fn save(&self, json: &str) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(SkknError::persistence("disk full"));
        }
        *self.value.lock().unwrap() = Some(json.to_string());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.value.lock().unwrap() = None;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryVolatileStore {
    values: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl VolatileStore for MemoryVolatileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingExporter {
    requests: Mutex<Vec<ExportRequest>>,
}

impl RecordingExporter {
    pub fn requests(&self) -> Vec<ExportRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentExporter for RecordingExporter {
    async fn export(&self, request: ExportRequest) -> Result<String> {
        let filename = request.filename.clone();
        self.requests.lock().unwrap().push(request);
        Ok(filename)
    }
}
