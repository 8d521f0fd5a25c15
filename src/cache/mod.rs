/// Revocation cache abstraction
///
/// A key/value store with per-key TTL. Revoked token identifiers are
/// written here and looked up on every validation; entries disappear on
/// their own once the TTL elapses.

use std::time::Duration;

use async_trait::async_trait;

mod memory;
mod redis;

pub use self::memory::InMemoryRevocationCache;
pub use self::redis::RedisRevocationCache;

/// Key prefix for revocation entries
pub const REVOKED_KEY_PREFIX: &str = "revoked:";

/// Sentinel value stored under a revocation key
pub const REVOKED_MARKER: &str = "1";

/// Revocation key for a token identifier
pub fn revoked_key(jti: &str) -> String {
    format!("{}{}", REVOKED_KEY_PREFIX, jti)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out")]
    Timeout,
}

#[async_trait]
pub trait RevocationCache: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Single atomic put; overwrites any previous value and TTL
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Liveness probe used by the health check
    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
