//! In-memory rotating pool of Gemini API keys.

use chrono::{DateTime, Duration, Utc};
use skkn_core::error::ErrorClass;
use skkn_core::key_pool::{KeyPool, RotationResult};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Active,
    QuotaExceeded,
    RateLimited,
    Failed,
}

impl From<ErrorClass> for KeyStatus {
    fn from(class: ErrorClass) -> Self {
        match class {
            ErrorClass::QuotaExceeded => KeyStatus::QuotaExceeded,
            ErrorClass::RateLimit => KeyStatus::RateLimited,
            ErrorClass::Other => KeyStatus::Failed,
        }
    }
}

#[derive(Debug, Clone)]
struct KeyEntry {
    key: String,
    status: KeyStatus,
    error_at: Option<DateTime<Utc>>,
}

impl KeyEntry {
    fn usable(&self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        match self.status {
            KeyStatus::Active => true,
            KeyStatus::RateLimited => self.error_at.is_none_or(|at| now - at >= cooldown),
            KeyStatus::QuotaExceeded | KeyStatus::Failed => false,
        }
    }
}

#[derive(Debug)]
struct PoolState {
    keys: Vec<KeyEntry>,
    active: usize,
}

/// Ordered key list with per-key error state.
///
/// Rate-limited keys become usable again after a cooldown. Quota and other
/// failures stick until [`KeyPool::reset_all_keys`].
#[derive(Debug)]
pub struct RotatingKeyPool {
    state: Mutex<PoolState>,
    rate_limit_cooldown: Duration,
}

impl RotatingKeyPool {
    pub fn new(keys: impl IntoIterator<Item = String>) -> Self {
        let mut entries: Vec<KeyEntry> = Vec::new();
        for key in keys {
            let key = key.trim().to_string();
            if key.is_empty() || entries.iter().any(|entry| entry.key == key) {
                continue;
            }
            entries.push(KeyEntry {
                key,
                status: KeyStatus::Active,
                error_at: None,
            });
        }
        Self {
            state: Mutex::new(PoolState {
                keys: entries,
                active: 0,
            }),
            rate_limit_cooldown: Duration::seconds(60),
        }
    }

    pub fn with_rate_limit_cooldown(mut self, cooldown: Duration) -> Self {
        self.rate_limit_cooldown = cooldown;
        self
    }

    /// Makes `key` the active key, adding it in front when unknown.
    pub fn prefer(&self, key: &str) {
        let key = key.trim();
        if key.is_empty() {
            return;
        }
        let mut state = self.lock();
        match state.keys.iter().position(|entry| entry.key == key) {
            Some(index) => state.active = index,
            None => {
                state.keys.insert(
                    0,
                    KeyEntry {
                        key: key.to_string(),
                        status: KeyStatus::Active,
                        error_at: None,
                    },
                );
                state.active = 0;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn status_of(&self, key: &str) -> Option<KeyStatus> {
        self.lock()
            .keys
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.status)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Index of the next usable key after `from`, wrapping, excluding `from`.
    fn next_usable(&self, state: &PoolState, from: usize) -> Option<usize> {
        let now = Utc::now();
        let len = state.keys.len();
        (1..len)
            .map(|offset| (from + offset) % len)
            .find(|index| state.keys[*index].usable(now, self.rate_limit_cooldown))
    }
}

impl KeyPool for RotatingKeyPool {
    fn active_key(&self) -> Option<String> {
        let state = self.lock();
        state.keys.get(state.active).map(|entry| entry.key.clone())
    }

    fn mark_key_error(&self, key: &str, reason: ErrorClass) -> RotationResult {
        let mut state = self.lock();
        let Some(index) = state.keys.iter().position(|entry| entry.key == key) else {
            return RotationResult::exhausted("Key không thuộc danh sách đã cấu hình");
        };
        state.keys[index].status = reason.into();
        state.keys[index].error_at = Some(Utc::now());
        tracing::warn!(
            "[KeyPool] Key #{} marked {}",
            index + 1,
            reason.as_str()
        );

        match self.next_usable(&state, index) {
            Some(next) => {
                state.active = next;
                let new_key = state.keys[next].key.clone();
                tracing::info!("[KeyPool] Rotated to key #{}", next + 1);
                RotationResult::rotated(new_key, format!("Đã chuyển sang API key #{}", next + 1))
            }
            None => RotationResult::exhausted("Tất cả API key đều đã hết hạn mức hoặc bị giới hạn"),
        }
    }

    fn rotate_to_next_key(&self, reason: &str) -> RotationResult {
        let mut state = self.lock();
        let active = state.active;
        match self.next_usable(&state, active) {
            Some(next) => {
                state.active = next;
                let new_key = state.keys[next].key.clone();
                tracing::info!("[KeyPool] Rotated to key #{} ({})", next + 1, reason);
                RotationResult::rotated(new_key, format!("Đã chuyển sang API key #{}", next + 1))
            }
            None => RotationResult::exhausted("Không còn API key dự phòng khả dụng"),
        }
    }

    fn reset_all_keys(&self) {
        let mut state = self.lock();
        for entry in state.keys.iter_mut() {
            entry.status = KeyStatus::Active;
            entry.error_at = None;
        }
        tracing::info!("[KeyPool] Reset {} keys", state.keys.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(keys: &[&str]) -> RotatingKeyPool {
        RotatingKeyPool::new(keys.iter().map(|k| k.to_string()))
    }

    #[test]
    fn test_new_trims_and_dedups() {
        let pool = pool(&[" a ", "", "b", "a"]);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.active_key().as_deref(), Some("a"));
    }

    #[test]
    fn test_mark_error_rotates_until_exhausted() {
        let pool = pool(&["a", "b"]);

        let result = pool.mark_key_error("a", ErrorClass::QuotaExceeded);
        assert_eq!(result.replacement(), Some("b"));
        assert_eq!(pool.status_of("a"), Some(KeyStatus::QuotaExceeded));
        assert_eq!(pool.active_key().as_deref(), Some("b"));

        let result = pool.mark_key_error("b", ErrorClass::QuotaExceeded);
        assert!(!result.success);
        assert!(result.replacement().is_none());
    }

    #[test]
    fn test_rate_limited_key_recovers_after_cooldown() {
        let pool = pool(&["a", "b"]).with_rate_limit_cooldown(Duration::zero());
        pool.mark_key_error("a", ErrorClass::RateLimit);
        let result = pool.mark_key_error("b", ErrorClass::QuotaExceeded);
        assert_eq!(result.replacement(), Some("a"));
    }

    #[test]
    fn test_rotate_and_reset() {
        let pool = pool(&["a", "b", "c"]);
        pool.mark_key_error("b", ErrorClass::QuotaExceeded);
        assert_eq!(pool.active_key().as_deref(), Some("c"));

        assert_eq!(pool.rotate_to_next_key("manual_retry").replacement(), Some("a"));
        pool.mark_key_error("c", ErrorClass::Other);
        assert!(!pool.rotate_to_next_key("manual_retry").success);

        pool.reset_all_keys();
        assert_eq!(pool.status_of("b"), Some(KeyStatus::Active));
        assert_eq!(pool.rotate_to_next_key("manual_retry").replacement(), Some("b"));
    }

    #[test]
    fn test_single_key_cannot_rotate() {
        let pool = pool(&["only"]);
        assert!(!pool.rotate_to_next_key("manual_retry").success);
        assert_eq!(pool.active_key().as_deref(), Some("only"));
    }

    #[test]
    fn test_prefer_adds_unknown_key_in_front() {
        let pool = pool(&["a"]);
        pool.prefer("stored");
        assert_eq!(pool.active_key().as_deref(), Some("stored"));
        assert_eq!(pool.len(), 2);
        pool.prefer("a");
        assert_eq!(pool.active_key().as_deref(), Some("a"));
    }
}
