/// Token Validator
///
/// Order of checks: signature (codec) gates everything, then expiry, then
/// required claims, then the revocation cache. Expired tokens never cost a
/// cache round trip.

use std::sync::Arc;

use crate::auth::claims::{Claims, TokenKind};
use crate::auth::jwt::{JwtCodec, UnvalidatedClaims};
use crate::cache::{revoked_key, RevocationCache};
use crate::clock::Clock;
use crate::error::{AppError, TokenError};

pub struct TokenValidator {
    codec: Arc<JwtCodec>,
    clock: Arc<dyn Clock>,
    cache: Arc<dyn RevocationCache>,
}

impl TokenValidator {
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

    /// Validate a token and return its claims
    ///
    /// # Errors
    /// - `MalformedToken` / `BadSignature` from decoding
    /// - `Expired` if `exp` is missing, non-numeric or in the past
    /// - `MalformedToken` if `jti` or `sub` is missing
    /// - `Revoked` if the jti is on the revocation list
    /// - `Internal` if the revocation cache cannot be reached
    pub async fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let raw = self.codec.decode(token)?;

        let exp = raw.exp_timestamp().ok_or(TokenError::Expired)?;
        if self.clock.now().timestamp() > exp {
            return Err(TokenError::Expired.into());
        }

        let claims = into_claims(raw, exp)?;

        if self.cache.exists(&revoked_key(&claims.jti)).await? {
            tracing::info!(jti = %claims.jti, user_id = %claims.sub, "Rejected revoked token");
            return Err(TokenError::Revoked.into());
        }

        Ok(claims)
    }
}

fn into_claims(raw: UnvalidatedClaims, exp: i64) -> Result<Claims, AppError> {
    let jti = raw.jti.ok_or_else(|| AppError::malformed("missing jti claim"))?;
    let sub = raw.sub.ok_or_else(|| AppError::malformed("missing sub claim"))?;

    let kind = match (raw.name, raw.roles) {
        (Some(name), roles) => TokenKind::Access {
            name,
            roles: roles.unwrap_or_default(),
        },
        (None, None) => TokenKind::Refresh,
        (None, Some(_)) => return Err(AppError::malformed("roles without name claim")),
    };

    Ok(Claims {
        sub,
        jti,
        iat: raw.iat.unwrap_or_default(),
        exp,
        kind,
    })
}
