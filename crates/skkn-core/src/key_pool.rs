//! API key pool port.

use crate::error::ErrorClass;
use serde::{Deserialize, Serialize};

/// Outcome of marking or rotating a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_key: Option<String>,
    pub message: String,
}

impl RotationResult {
    pub fn rotated(new_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            new_key: Some(new_key.into()),
            message: message.into(),
        }
    }

    pub fn exhausted(message: impl Into<String>) -> Self {
        Self {
            success: false,
            new_key: None,
            message: message.into(),
        }
    }

    /// The replacement key, if the rotation succeeded.
    pub fn replacement(&self) -> Option<&str> {
        if self.success {
            self.new_key.as_deref()
        } else {
            None
        }
    }
}

/// A set of candidate keys with per-key error state.
///
/// Each operation is atomic: marking a key and picking its replacement
/// happen under one critical section.
pub trait KeyPool: Send + Sync {
    fn active_key(&self) -> Option<String>;

    /// Records a failure for `key` and moves to the next usable key.
    fn mark_key_error(&self, key: &str, reason: ErrorClass) -> RotationResult;

    /// Moves past the active key to the next usable one.
    fn rotate_to_next_key(&self, reason: &str) -> RotationResult;

    /// Clears every key's error state.
    fn reset_all_keys(&self);
}
