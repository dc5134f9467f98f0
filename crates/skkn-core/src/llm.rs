//! Streaming LLM client port.

use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One turn of chat history, `{role, text}` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// Callback invoked once per streamed chunk, in arrival order.
pub type ChunkSink<'a> = &'a mut (dyn FnMut(&str) + Send);

/// A chat-style text generation client that streams its replies.
///
/// Implementations keep the conversation history themselves: a completed
/// exchange is appended to it, and [`LlmClient::initialize`] resets it.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Configures the key and model and starts a fresh conversation.
    fn initialize(&self, api_key: &str, model: &str);

    /// Sends `prompt` and streams the reply into `on_chunk`.
    ///
    /// Resolves after the final chunk. Returns [`LlmError::cancelled`]
    /// once `cancel` fires.
    async fn send_stream(
        &self,
        prompt: &str,
        on_chunk: ChunkSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), LlmError>;

    fn history(&self) -> Vec<ChatMessage>;

    fn set_history(&self, history: Vec<ChatMessage>);
}
