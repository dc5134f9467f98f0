//! Key rotation decisions after a failed generation request.

use skkn_core::error::SkknError;
use skkn_core::key_pool::KeyPool;
use skkn_core::storage::CredentialStore;
use std::sync::Arc;

/// What the engine should do with a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Adopt `new_key` and run the same operation once more.
    Retry { new_key: String, message: String },
    /// Show the error with the manual remediation actions.
    Surface,
}

/// Wraps the key pool with the rotation rules.
///
/// - Only quota and rate-limit failures are rotated automatically.
/// - A manual retry rotates, and when no spare key is left it resets the
///   whole pool and takes whatever key becomes active.
pub struct RetryCoordinator {
    key_pool: Arc<dyn KeyPool>,
    credentials: Arc<dyn CredentialStore>,
}

impl RetryCoordinator {
    pub fn new(key_pool: Arc<dyn KeyPool>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            key_pool,
            credentials,
        }
    }

    pub fn active_key(&self) -> Option<String> {
        self.key_pool.active_key()
    }

    /// Marks `failed_key` and asks the pool for a replacement.
    pub fn on_failure(&self, err: &SkknError, failed_key: Option<&str>) -> RetryDecision {
        let Some(class) = err.generation_class().filter(|class| class.is_rotatable()) else {
            return RetryDecision::Surface;
        };
        let Some(failed_key) = failed_key else {
            return RetryDecision::Surface;
        };

        let result = self.key_pool.mark_key_error(failed_key, class);
        match result.replacement() {
            Some(new_key) => {
                tracing::info!("[Retry] {} - {}", class.as_str(), result.message);
                RetryDecision::Retry {
                    new_key: new_key.to_string(),
                    message: result.message.clone(),
                }
            }
            None => {
                tracing::warn!("[Retry] No replacement key: {}", result.message);
                RetryDecision::Surface
            }
        }
    }

    /// Key to use for a user-requested retry.
    pub fn manual_rotation(&self) -> Option<String> {
        let result = self.key_pool.rotate_to_next_key("manual_retry");
        if let Some(new_key) = result.replacement() {
            tracing::info!("[Retry] Manual retry: {}", result.message);
            return Some(new_key.to_string());
        }
        tracing::info!("[Retry] Manual retry: resetting all keys ({})", result.message);
        self.key_pool.reset_all_keys();
        self.key_pool.active_key()
    }

    /// Remembers the key for the next run. Failures are only logged.
    pub async fn persist_key(&self, key: &str) {
        if let Err(err) = self.credentials.save_api_key(key).await {
            tracing::warn!("[Retry] Failed to persist active key: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryCredentials, MockKeyPool};
    use skkn_core::error::LlmError;

    fn coordinator(pool: &Arc<MockKeyPool>) -> RetryCoordinator {
        RetryCoordinator::new(pool.clone(), Arc::new(MemoryCredentials::default()))
    }

    #[test]
    fn test_quota_failure_rotates_once_per_mark() {
        let pool = Arc::new(MockKeyPool::new(&["a", "b"]));
        let coordinator = coordinator(&pool);
        let err: SkknError = LlmError::http(429, "RESOURCE_EXHAUSTED: quota").into();

        let decision = coordinator.on_failure(&err, Some("a"));
        assert!(matches!(decision, RetryDecision::Retry { ref new_key, .. } if new_key == "b"));
        assert_eq!(coordinator.on_failure(&err, Some("b")), RetryDecision::Surface);
        assert_eq!(pool.marked(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_other_failures_are_surfaced_without_marking() {
        let pool = Arc::new(MockKeyPool::new(&["a", "b"]));
        let coordinator = coordinator(&pool);
        let err: SkknError = LlmError::http(500, "backend error").into();

        assert_eq!(coordinator.on_failure(&err, Some("a")), RetryDecision::Surface);
        assert!(pool.marked().is_empty());
    }

    #[test]
    fn test_manual_rotation_resets_when_exhausted() {
        let pool = Arc::new(MockKeyPool::new(&["a"]));
        let coordinator = coordinator(&pool);

        assert_eq!(coordinator.manual_rotation().as_deref(), Some("a"));
        assert_eq!(pool.resets(), 1);
    }
}
