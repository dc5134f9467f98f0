//! GeminiStreamClient - streaming chat over the Gemini REST API.
//!
//! Uses `streamGenerateContent` with server-sent events. The conversation
//! history is kept client-side and resent with every request.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};
use skkn_core::error::LlmError;
use skkn_core::llm::{ChatMessage, ChatRole, ChunkSink, LlmClient};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Clone)]
struct ClientConfig {
    api_key: String,
    model: String,
}

/// [`LlmClient`] implementation backed by the Gemini HTTP API.
pub struct GeminiStreamClient {
    client: Client,
    base_url: String,
    config: Mutex<Option<ClientConfig>>,
    history: Mutex<Vec<ChatMessage>>,
}

impl Default for GeminiStreamClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GeminiStreamClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: BASE_URL.to_string(),
            config: Mutex::new(None),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Points the client at another endpoint (a proxy or a local stub).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> Option<String> {
        lock(&self.config).as_ref().map(|config| config.model.clone())
    }

    fn request_body(&self, prompt: &str) -> StreamRequest {
        let mut contents: Vec<Content> = lock(&self.history)
            .iter()
            .map(|message| Content::text(message.role, &message.text))
            .collect();
        contents.push(Content::text(ChatRole::User, prompt));
        StreamRequest { contents }
    }

    async fn stream_into(
        &self,
        config: &ClientConfig,
        body: &StreamRequest,
        on_chunk: ChunkSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<String, LlmError> {
        let url = format!(
            "{}/{model}:streamGenerateContent?alt=sse&key={api_key}",
            self.base_url,
            model = config.model,
            api_key = config.api_key
        );

        let send = self.client.post(url).json(body).send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(LlmError::cancelled()),
            response = send => response.map_err(|err| {
                LlmError::new(format!("Gemini API request failed: {err}"))
            })?,
        };

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::default();
        let mut reply = String::new();
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return Err(LlmError::cancelled()),
                next = stream.next() => next,
            };
            let Some(bytes) = next else {
                break;
            };
            let bytes = bytes
                .map_err(|err| LlmError::new(format!("Gemini API request failed: {err}")))?;
            for text in decoder.push(&bytes)? {
                on_chunk(&text);
                reply.push_str(&text);
            }
        }
        for text in decoder.finish()? {
            on_chunk(&text);
            reply.push_str(&text);
        }
        Ok(reply)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl LlmClient for GeminiStreamClient {
    fn initialize(&self, api_key: &str, model: &str) {
        *lock(&self.config) = Some(ClientConfig {
            api_key: api_key.to_string(),
            model: model.to_string(),
        });
        lock(&self.history).clear();
        tracing::debug!("[Gemini] Initialized chat with model {}", model);
    }

    async fn send_stream(
        &self,
        prompt: &str,
        on_chunk: ChunkSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), LlmError> {
        let config = lock(&self.config)
            .clone()
            .ok_or_else(|| LlmError::new("Gemini chat is not initialized"))?;
        let body = self.request_body(prompt);

        let reply = self.stream_into(&config, &body, on_chunk, cancel).await?;
        tracing::debug!("[Gemini] Stream finished ({} chars)", reply.chars().count());

        let mut history = lock(&self.history);
        history.push(ChatMessage::user(prompt));
        history.push(ChatMessage::model(reply));
        Ok(())
    }

    fn history(&self) -> Vec<ChatMessage> {
        lock(&self.history).clone()
    }

    fn set_history(&self, history: Vec<ChatMessage>) {
        *lock(&self.history) = history;
    }
}

/// Incremental parser for the `data:` lines of an SSE stream.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feeds raw bytes and returns the text of every complete event.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, LlmError> {
        self.buffer.extend_from_slice(bytes);
        let mut texts = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(text) = parse_line(&line)? {
                texts.push(text);
            }
        }
        Ok(texts)
    }

    /// Flushes a trailing line without a newline.
    pub fn finish(&mut self) -> Result<Vec<String>, LlmError> {
        let line = std::mem::take(&mut self.buffer);
        Ok(parse_line(&line)?.into_iter().collect())
    }
}

fn parse_line(line: &[u8]) -> Result<Option<String>, LlmError> {
    let line = String::from_utf8_lossy(line);
    let Some(data) = line.trim().strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }

    let event: StreamEvent = match serde_json::from_str(data) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!("[Gemini] Skipping unparsable stream event: {}", err);
            return Ok(None);
        }
    };
    if let Some(error) = event.error {
        let status = error.code.and_then(|code| u16::try_from(code).ok());
        let message = error_message(error.status, error.message, data);
        return Err(match status {
            Some(code) => LlmError::http(code, message),
            None => LlmError::new(message),
        });
    }

    let text: String = event
        .candidates
        .unwrap_or_default()
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .filter_map(|part| part.text)
        .collect();
    Ok(Some(text).filter(|text| !text.is_empty()))
}

#[derive(Serialize)]
struct StreamRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

impl Content {
    fn text(role: ChatRole, text: &str) -> Self {
        let role = match role {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        };
        Self {
            role: role.to_string(),
            parts: vec![Part::Text {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
}

#[derive(Deserialize)]
struct StreamEvent {
    candidates: Option<Vec<Candidate>>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<i32>,
    message: Option<String>,
    status: Option<String>,
}

fn error_message(status: Option<String>, message: Option<String>, raw: &str) -> String {
    let status_text = status.unwrap_or_default();
    let msg = message.unwrap_or_else(|| raw.to_string());
    if status_text.is_empty() {
        msg
    } else {
        format!("{status_text}: {msg}")
    }
}

fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> LlmError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| error_message(wrapper.error.status, wrapper.error.message, &body))
        .unwrap_or_else(|_| body.clone());

    let error = LlmError::http(status.as_u16(), message);
    match retry_after {
        Some(delay) => error.with_retry_after(delay),
        None => error,
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
