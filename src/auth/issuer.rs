/// Token Issuer
///
/// Builds access/refresh claim sets and signs them. The refresh token
/// always lives twice as long as the access token it is paired with.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::auth::claims::{Claims, TokenPair};
use crate::auth::jwt::JwtCodec;
use crate::clock::Clock;
use crate::error::AppError;

pub struct TokenIssuer {
    codec: Arc<JwtCodec>,
    clock: Arc<dyn Clock>,
    access_ttl: Duration,
    // Last nanosecond stamp handed out; stamps only ever increase.
    last_stamp: AtomicI64,
}

impl TokenIssuer {
    pub fn new(codec: Arc<JwtCodec>, clock: Arc<dyn Clock>, access_ttl: Duration) -> Self {
        Self {
            codec,
            clock,
            access_ttl,
            last_stamp: AtomicI64::new(0),
        }
    }

    fn refresh_ttl(&self) -> Duration {
        self.access_ttl * 2
    }

    /// Unique token identifier `"<subject>-<nanos>"`
    ///
    /// The stamp is the issuance time in nanoseconds, bumped past the last
    /// stamp this issuer produced, so identifiers stay distinct even when
    /// the clock is coarse or frozen.
    pub fn issue_jti(&self, subject: &str) -> String {
        self.jti_at(subject, self.clock.now())
    }

    fn jti_at(&self, subject: &str, now: DateTime<Utc>) -> String {
        format!("{}-{}", subject, self.next_stamp(now))
    }

    fn next_stamp(&self, now: DateTime<Utc>) -> i64 {
        let now = now.timestamp_nanos_opt().unwrap_or(i64::MAX);
        let bump = |last: i64| now.max(last.saturating_add(1));
        // fetch_update hands back the previous value; recompute what was stored
        match self
            .last_stamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(bump(last)))
        {
            Ok(previous) | Err(previous) => bump(previous),
        }
    }

    /// Issue a signed access/refresh pair
    ///
    /// # Errors
    /// `Internal` if signing fails, which only happens with an unusable key
    pub fn issue_token_pair(
        &self,
        subject: &str,
        name: &str,
        roles: &[String],
    ) -> Result<TokenPair, AppError> {
        let now = self.clock.now();
        let expires_at = now + self.access_ttl;
        let jti = self.jti_at(subject, now);

        let access = Claims::access(
            subject,
            name,
            roles.to_vec(),
            jti.as_str(),
            now.timestamp(),
            expires_at.timestamp(),
        );
        let refresh = Claims::refresh(
            subject,
            &jti,
            now.timestamp(),
            (now + self.refresh_ttl()).timestamp(),
        );

        let access_token = self.codec.encode(&access)?;
        let refresh_token = self.codec.encode(&refresh)?;

        tracing::debug!(user_id = %subject, jti = %jti, "Issued token pair");

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_at,
        })
    }
}
