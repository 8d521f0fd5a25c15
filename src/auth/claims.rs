/// Token claim sets
///
/// Access and refresh tokens share one claim type; the variant decides
/// which optional fields go on the wire. Access tokens carry `name` and
/// `roles`, refresh tokens omit both and use `<access-jti>-refresh` as
/// their identifier.

use chrono::{DateTime, Utc};

/// Suffix appended to the access token's jti to form the refresh jti
pub const REFRESH_JTI_SUFFIX: &str = "-refresh";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Roles are copied at issuance and never re-read during validation
    Access { name: String, roles: Vec<String> },
    Refresh,
}

/// Validated claims of a signed token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Unique token identifier, also the revocation key
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub kind: TokenKind,
}

impl Claims {
    pub fn access(
        sub: impl Into<String>,
        name: impl Into<String>,
        roles: Vec<String>,
        jti: impl Into<String>,
        iat: i64,
        exp: i64,
    ) -> Self {
        Self {
            sub: sub.into(),
            jti: jti.into(),
            iat,
            exp,
            kind: TokenKind::Access {
                name: name.into(),
                roles,
            },
        }
    }

    /// Refresh claims paired with an access token identifier
    pub fn refresh(sub: impl Into<String>, access_jti: &str, iat: i64, exp: i64) -> Self {
        Self {
            sub: sub.into(),
            jti: format!("{}{}", access_jti, REFRESH_JTI_SUFFIX),
            iat,
            exp,
            kind: TokenKind::Refresh,
        }
    }

    pub fn is_access(&self) -> bool {
        matches!(self.kind, TokenKind::Access { .. })
    }

    pub fn is_refresh(&self) -> bool {
        matches!(self.kind, TokenKind::Refresh)
    }

    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Access { name, .. } => Some(name),
            TokenKind::Refresh => None,
        }
    }

    pub fn roles(&self) -> &[String] {
        match &self.kind {
            TokenKind::Access { roles, .. } => roles,
            TokenKind::Refresh => &[],
        }
    }
}

/// Freshly issued access/refresh pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry of the access token
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_claims_creation() {
        let claims = Claims::access(
            "user-1",
            "alice",
            vec!["user".to_string()],
            "user-1-100",
            100,
            200,
        );

        assert!(claims.is_access());
        assert_eq!(claims.name(), Some("alice"));
        assert_eq!(claims.roles(), &["user".to_string()]);
        assert_eq!((claims.iat, claims.exp), (100, 200));
    }

    #[test]
    fn test_refresh_claims_derive_jti() {
        let claims = Claims::refresh("user-1", "user-1-100", 100, 300);

        assert!(claims.is_refresh());
        assert_eq!(claims.jti, "user-1-100-refresh");
        assert_eq!(claims.name(), None);
        assert!(claims.roles().is_empty());
    }
}
