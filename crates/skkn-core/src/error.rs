//! Error types for the SKKN workflow.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Classification of a failed generation request.
///
/// Only `QuotaExceeded` and `RateLimit` are eligible for the automatic
/// key-rotation retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorClass {
    QuotaExceeded,
    RateLimit,
    Other,
}

impl ErrorClass {
    /// Classifies an LLM failure by status code and message text.
    pub fn classify(err: &LlmError) -> Self {
        let lower = err.message.to_lowercase();
        if lower.contains("quota")
            || lower.contains("resource_exhausted")
            || lower.contains("exceeded your current")
        {
            return Self::QuotaExceeded;
        }
        if err.status_code == Some(429)
            || lower.contains("rate limit")
            || lower.contains("rate_limit")
            || lower.contains("too many requests")
        {
            return Self::RateLimit;
        }
        Self::Other
    }

    /// Returns true when a key rotation may resolve the failure.
    pub fn is_rotatable(&self) -> bool {
        matches!(self, Self::QuotaExceeded | Self::RateLimit)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuotaExceeded => "QUOTA_EXCEEDED",
            Self::RateLimit => "RATE_LIMIT",
            Self::Other => "OTHER",
        }
    }
}

/// Failure reported by an [`LlmClient`](crate::llm::LlmClient).
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct LlmError {
    pub status_code: Option<u16>,
    pub message: String,
    pub retry_after: Option<Duration>,
    pub cancelled: bool,
}

impl LlmError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status_code: None,
            message: message.into(),
            retry_after: None,
            cancelled: false,
        }
    }

    pub fn http(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code: Some(status_code),
            ..Self::new(message)
        }
    }

    pub fn cancelled() -> Self {
        Self {
            cancelled: true,
            ..Self::new("Generation cancelled")
        }
    }

    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    pub fn class(&self) -> ErrorClass {
        ErrorClass::classify(self)
    }
}

/// A shared error type for the SKKN workflow.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum SkknError {
    /// LLM request failed
    #[error("Generation failed ({}): {message}", class.as_str())]
    Generation { class: ErrorClass, message: String },

    /// Durable or volatile storage failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Custom template JSON could not be parsed
    #[error("Template parse error: {0}")]
    TemplateParse(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Operation not allowed in the current workflow state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A generation request is already streaming
    #[error("A generation request is already in progress")]
    Busy,

    /// The in-flight stream was cancelled
    #[error("Generation cancelled")]
    Cancelled,

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SkknError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    pub fn template_parse(message: impl Into<String>) -> Self {
        Self::TemplateParse(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_generation(&self) -> bool {
        matches!(self, Self::Generation { .. })
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Io { .. })
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the generation classification, if this is a generation failure.
    pub fn generation_class(&self) -> Option<ErrorClass> {
        match self {
            Self::Generation { class, .. } => Some(*class),
            _ => None,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<LlmError> for SkknError {
    fn from(err: LlmError) -> Self {
        if err.cancelled {
            return Self::Cancelled;
        }
        Self::Generation {
            class: err.class(),
            message: err.message,
        }
    }
}

impl From<std::io::Error> for SkknError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for SkknError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for SkknError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for SkknError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<minijinja::Error> for SkknError {
    fn from(err: minijinja::Error) -> Self {
        Self::Internal(format!("Prompt template error: {err}"))
    }
}

/// A type alias for `Result<T, SkknError>`.
pub type Result<T> = std::result::Result<T, SkknError>;
