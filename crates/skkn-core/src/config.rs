use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_VOLATILE_LIMIT_BYTES: usize = 5 * 1024 * 1024;

/// How a finished solution waits for approval.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewPolicy {
    /// Approve on arrival and continue after a short pause.
    #[default]
    AutoApprove,
    /// Stop at the review step until the solution is approved.
    HumanGated,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    pub review_policy: ReviewPolicy,
    /// Send transient status texts to the model instead of only recording them.
    pub acknowledge_transient_steps: bool,
    pub retry_delay_ms: u64,
    pub manual_retry_delay_ms: u64,
    pub review_continue_delay_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            review_policy: ReviewPolicy::default(),
            acknowledge_transient_steps: false,
            retry_delay_ms: 500,
            manual_retry_delay_ms: 300,
            review_continue_delay_ms: 100,
        }
    }
}

impl GenerationConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn manual_retry_delay(&self) -> Duration {
        Duration::from_millis(self.manual_retry_delay_ms)
    }

    pub fn review_continue_delay(&self) -> Duration {
        Duration::from_millis(self.review_continue_delay_ms)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    pub autosave_debounce_ms: u64,
    pub volatile_limit_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autosave_debounce_ms: 2000,
            volatile_limit_bytes: DEFAULT_VOLATILE_LIMIT_BYTES,
        }
    }
}

impl SessionConfig {
    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
}

/// Contents of `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_keys: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [generation]
            review_policy = "human_gated"
            "#,
        )
        .unwrap();
        assert_eq!(config.generation.review_policy, ReviewPolicy::HumanGated);
        assert_eq!(config.generation.model, DEFAULT_MODEL);
        assert_eq!(config.generation.retry_delay(), Duration::from_millis(500));
        assert_eq!(config.session.autosave_debounce_ms, 2000);
        assert!(config.api_keys.is_empty());
    }
}
