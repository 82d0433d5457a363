//! Ephemeral TTL key-value store for verification artifacts.

mod memory;
mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Errors surfaced by a [`CodeStore`] backend.
///
/// Callers special-case [`CacheError::NotFound`] from generic backend
/// failures; an absent and an expired key are indistinguishable.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("key not found")]
    NotFound,

    #[error("cache backend failed: {0}")]
    Backend(String),
}

/// TTL-backed key-value store used to hold short-lived verification codes
/// and password-reset tokens.
#[async_trait]
pub trait CodeStore: Send + Sync {
    /// Store `value` under `key`, expiring `ttl` from now. Overwrites any
    /// existing value under that key.
    async fn set(
        &self,
        ttl: Duration,
        key: &str,
        value: &str,
    ) -> CacheResult<()>;

    /// Get the live value under `key`.
    async fn get(&self, key: &str) -> CacheResult<String>;

    /// Remove `key`. Idempotent, missing keys are not an error.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// List live keys containing every fragment, in order.
    async fn get_keys(&self, fragments: &[&str]) -> CacheResult<Vec<String>>;

    /// Concatenate the values of every matching key into a
    /// JSON-array-shaped string.
    async fn get_including_key(&self, fragments: &[&str])
    -> CacheResult<String>;
}

/// Whether every fragment appears in `key`, in order.
pub(crate) fn matches_fragments(key: &str, fragments: &[&str]) -> bool {
    let mut rest = key;
    for fragment in fragments {
        match rest.find(fragment) {
            Some(at) => rest = &rest[at + fragment.len()..],
            None => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_fragments_in_order() {
        assert!(matches_fragments("reset:user-42:code", &[]));
        assert!(matches_fragments("reset:user-42:code", &["user-42"]));
        assert!(matches_fragments("reset:user-42:code", &["reset", "code"]));
        assert!(!matches_fragments("reset:user-42:code", &["code", "reset"]));
        assert!(!matches_fragments("reset:user-42:code", &["missing"]));
    }
}
