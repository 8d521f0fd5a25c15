/// Token Revocation
///
/// Revoking a token writes `revoked:<jti>` to the revocation cache with a TTL
/// that outlives the token itself. Expired tokens can still be revoked and
/// revoking twice is harmless. The signature is always checked first so an
/// unsigned token cannot plant arbitrary revocation keys.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::claims::Claims;
use crate::auth::jwt::JwtCodec;
use crate::cache::{revoked_key, RevocationCache, REVOKED_MARKER};
use crate::clock::Clock;
use crate::error::AppError;

/// Revocation entries never live shorter than this
pub const MIN_REVOCATION_TTL: Duration = Duration::from_secs(60 * 60);

pub struct TokenRevoker {
    codec: Arc<JwtCodec>,
    clock: Arc<dyn Clock>,
    cache: Arc<dyn RevocationCache>,
}

impl TokenRevoker {
    pub fn new(
        codec: Arc<JwtCodec>,
        clock: Arc<dyn Clock>,
        cache: Arc<dyn RevocationCache>,
    ) -> Self {
        Self {
            codec,
            clock,
            cache,
        }
    }

    /// Revoke a signed token
    ///
    /// # Errors
    /// - `MalformedToken` / `BadSignature` from decoding
    /// - `MalformedToken` if `jti` or a numeric `exp` is missing
    /// - `Internal` if the revocation cache write fails
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        let raw = self.codec.decode(token)?;

        let jti = raw
            .jti
            .as_deref()
            .ok_or_else(|| AppError::malformed("missing jti claim"))?;
        let exp = raw
            .exp_timestamp()
            .ok_or_else(|| AppError::malformed("missing or non-numeric exp claim"))?;

        self.write(jti, exp).await
    }

    /// Revoke a token whose claims were already validated
    pub async fn revoke_claims(&self, claims: &Claims) -> Result<(), AppError> {
        self.write(&claims.jti, claims.exp).await
    }

    /// Time-to-live of a revocation entry for a token expiring at `exp`
    pub fn ttl_for(&self, exp: i64) -> Duration {
        let remaining = exp.saturating_sub(self.clock.now().timestamp());
        let remaining = Duration::from_secs(u64::try_from(remaining).unwrap_or(0));
        remaining.max(MIN_REVOCATION_TTL)
    }

    async fn write(&self, jti: &str, exp: i64) -> Result<(), AppError> {
        let ttl = self.ttl_for(exp);

        self.cache
            .set(&revoked_key(jti), REVOKED_MARKER, ttl)
            .await?;

        tracing::info!(jti = %jti, ttl_secs = ttl.as_secs(), "Token revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryRevocationCache;
    use crate::clock::ManualClock;
    use crate::error::ErrorKind;

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    fn setup() -> (
        TokenRevoker,
        Arc<JwtCodec>,
        Arc<ManualClock>,
        Arc<InMemoryRevocationCache>,
    ) {
        let codec = Arc::new(JwtCodec::new(SECRET).unwrap());
        let clock = Arc::new(ManualClock::starting_now());
        let cache = Arc::new(InMemoryRevocationCache::new(clock.clone()));
        let revoker = TokenRevoker::new(codec.clone(), clock.clone(), cache.clone());
        (revoker, codec, clock, cache)
    }

    fn token(codec: &JwtCodec, jti: &str, iat: i64, exp: i64) -> String {
        codec
            .encode(&Claims::access("user-1", "alice", vec![], jti, iat, exp))
            .unwrap()
    }

    #[tokio::test]
    async fn test_revoke_writes_marker_with_remaining_lifetime() {
        let (revoker, codec, clock, cache) = setup();
        let now = clock.now().timestamp();

        revoker
            .revoke(&token(&codec, "user-1-1", now, now + 3 * 3600))
            .await
            .expect("revoke should succeed");

        assert_eq!(cache.value_of("revoked:user-1-1").as_deref(), Some("1"));
        assert_eq!(
            cache.ttl_of("revoked:user-1-1"),
            Some(Duration::from_secs(3 * 3600))
        );
    }

    #[tokio::test]
    async fn test_short_lived_token_gets_ttl_floor() {
        let (revoker, codec, clock, cache) = setup();
        let now = clock.now().timestamp();

        revoker
            .revoke(&token(&codec, "user-1-2", now, now + 30))
            .await
            .unwrap();

        assert_eq!(cache.ttl_of("revoked:user-1-2"), Some(MIN_REVOCATION_TTL));
    }

    #[tokio::test]
    async fn test_expired_token_is_revocable() {
        let (revoker, codec, clock, cache) = setup();
        let now = clock.now().timestamp();

        revoker
            .revoke(&token(&codec, "user-1-3", now - 7200, now - 3600))
            .await
            .expect("expired tokens must still be revocable");

        assert_eq!(cache.ttl_of("revoked:user-1-3"), Some(MIN_REVOCATION_TTL));
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let (revoker, codec, clock, cache) = setup();
        let now = clock.now().timestamp();
        let t = token(&codec, "user-1-4", now, now + 3600);

        revoker.revoke(&t).await.unwrap();
        revoker.revoke(&t).await.unwrap();

        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_forged_token_does_not_reach_cache() {
        let (revoker, _, clock, cache) = setup();
        let other = JwtCodec::new("another-secret-key-at-least-32-characters").unwrap();
        let now = clock.now().timestamp();

        let err = revoker
            .revoke(&token(&other, "victim-jti", now, now + 3600))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BadSignature);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_revoke_claims() {
        let (revoker, _, clock, cache) = setup();
        let now = clock.now().timestamp();
        let claims = Claims::refresh("user-1", "user-1-5", now, now + 7200);

        revoker.revoke_claims(&claims).await.unwrap();

        assert_eq!(
            cache.ttl_of("revoked:user-1-5-refresh"),
            Some(Duration::from_secs(7200))
        );
    }
}
