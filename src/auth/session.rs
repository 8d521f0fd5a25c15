/// Session Orchestrator
///
/// Composes issuer, validator, revoker, credential verifier and credential
/// store into the four caller-facing operations: login, logout, refresh
/// and validate. Everything it needs is injected at construction; the only
/// state it owns is the issuer's JTI stamp.

use std::sync::Arc;

use serde::Serialize;

use crate::auth::claims::{Claims, TokenPair};
use crate::auth::issuer::TokenIssuer;
use crate::auth::jwt::JwtCodec;
use crate::auth::password::CredentialVerifier;
use crate::auth::revocation::TokenRevoker;
use crate::auth::validator::TokenValidator;
use crate::cache::RevocationCache;
use crate::clock::Clock;
use crate::configuration::JwtSettings;
use crate::error::AppError;
use crate::metrics::{outcome, AuthMetrics};
use crate::store::{CredentialStore, StoreError, User};
use crate::validators::{is_valid_password, is_valid_token, is_valid_username};

/// bcrypt hash of a throwaway password, checked when the user is unknown
/// so that both login failures cost one bcrypt round
const DUMMY_PASSWORD_HASH: &str = "$2b$12$D5pt5CeslOhE7krVDgbbsu8LhsEYZVFJmkj6nVEtVU0NWYvRs34Oe";

/// Outcome of validating an access token on behalf of another service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    fn valid(claims: &Claims, email: Option<String>) -> Self {
        Self {
            valid: true,
            user_id: Some(claims.sub.clone()),
            username: claims.name().map(str::to_string),
            email,
            roles: claims.roles().to_vec(),
            error: None,
        }
    }

    fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            user_id: None,
            username: None,
            email: None,
            roles: Vec::new(),
            error: Some(error.into()),
        }
    }
}

pub struct SessionService {
    issuer: TokenIssuer,
    validator: TokenValidator,
    revoker: TokenRevoker,
    verifier: Arc<dyn CredentialVerifier>,
    store: Arc<dyn CredentialStore>,
    cache: Arc<dyn RevocationCache>,
    metrics: Arc<AuthMetrics>,
}

impl SessionService {
    /// # Errors
    /// `ConfigurationFatal` if the JWT settings cannot produce valid tokens
    pub fn new(
        settings: &JwtSettings,
        clock: Arc<dyn Clock>,
        cache: Arc<dyn RevocationCache>,
        store: Arc<dyn CredentialStore>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Result<Self, AppError> {
        settings.validate()?;
        let codec = Arc::new(JwtCodec::new(&settings.secret)?);
        let metrics = AuthMetrics::new()
            .map_err(|e| AppError::Internal(format!("metrics registry: {}", e)))?;

        Ok(Self {
            issuer: TokenIssuer::new(codec.clone(), clock.clone(), settings.access_token_ttl()),
            validator: TokenValidator::new(codec.clone(), clock.clone(), cache.clone()),
            revoker: TokenRevoker::new(codec, clock, cache.clone()),
            verifier,
            store,
            cache,
            metrics: Arc::new(metrics),
        })
    }

    /// Counters for this service's operations
    pub fn metrics(&self) -> &Arc<AuthMetrics> {
        &self.metrics
    }

    /// Authenticate a user and issue a fresh token pair
    ///
    /// # Arguments
    /// * `username` - Username or email
    /// * `password` - Plaintext password
    ///
    /// # Errors
    /// - `InvalidArgument` for empty or oversized input
    /// - `NotFound` if no user matches
    /// - `Unauthenticated` if the password does not match
    /// - `Internal` on store or hashing failure
    pub async fn login(&self, username: &str, password: &str) -> Result<(TokenPair, User), AppError> {
        let result = self.authenticate(username, password).await;
        self.metrics.record_login(outcome(&result));
        result
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(TokenPair, User), AppError> {
        is_valid_username(username)?;
        is_valid_password(password)?;

        let user = match self.store.find_user(username).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                self.check_password(password, DUMMY_PASSWORD_HASH).await?;
                tracing::warn!(username = %username, "Login failed: unknown user");
                return Err(AppError::NotFound);
            }
            Err(e) => return Err(e.into()),
        };

        if !self.check_password(password, &user.password_hash).await? {
            tracing::warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(AppError::Unauthenticated);
        }

        let pair = self
            .issuer
            .issue_token_pair(&user.id, &user.username, &user.roles)?;

        tracing::info!(user_id = %user.id, username = %user.username, "User logged in");
        Ok((pair, user))
    }

    // bcrypt blocks for tens of milliseconds; run it on the blocking pool
    async fn check_password(&self, password: &str, password_hash: &str) -> Result<bool, AppError> {
        let verifier = self.verifier.clone();
        let password = password.to_string();
        let password_hash = password_hash.to_string();

        tokio::task::spawn_blocking(move || verifier.verify(&password, &password_hash))
            .await
            .map_err(|e| AppError::Internal(format!("password check aborted: {}", e)))?
    }

    /// Revoke an access token
    ///
    /// Succeeds for expired tokens and for tokens already revoked.
    pub async fn logout(&self, access_token: &str) -> Result<(), AppError> {
        let result = match is_valid_token("accessToken", access_token) {
            Ok(token) => self.revoker.revoke(&token).await,
            Err(e) => Err(e.into()),
        };
        self.metrics.record_revocation(outcome(&result));
        result
    }

    /// Exchange a refresh token for a new pair
    ///
    /// The old refresh token is revoked on a best-effort basis: a failed
    /// revocation is logged and the new pair is still returned.
    ///
    /// # Errors
    /// - any validation error of the refresh token
    /// - `MalformedToken` if an access token is presented
    /// - `NotFound` if the subject no longer exists
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let result = self.rotate(refresh_token).await;
        self.metrics.record_refresh(outcome(&result));
        result
    }

    async fn rotate(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let token = is_valid_token("refreshToken", refresh_token)?;
        let claims = self.validator.validate(&token).await?;
        if !claims.is_refresh() {
            return Err(AppError::malformed("expected a refresh token"));
        }

        let user = self.store.find_user_by_id(&claims.sub).await?;

        if let Err(e) = self.revoker.revoke_claims(&claims).await {
            tracing::warn!(
                jti = %claims.jti,
                user_id = %claims.sub,
                error = %e,
                "Failed to revoke rotated refresh token"
            );
        }

        let pair = self
            .issuer
            .issue_token_pair(&user.id, &user.username, &user.roles)?;

        tracing::info!(user_id = %user.id, "Token pair refreshed");
        Ok(pair)
    }

    /// Validate an access token and return its claims
    ///
    /// # Errors
    /// Any validation error; `MalformedToken` if a refresh token is presented
    pub async fn validate_access(&self, access_token: &str) -> Result<Claims, AppError> {
        let result = self.check_access(access_token).await;
        self.metrics.record_validation(outcome(&result));
        result
    }

    async fn check_access(&self, access_token: &str) -> Result<Claims, AppError> {
        let token = is_valid_token("accessToken", access_token)?;
        let claims = self.validator.validate(&token).await?;
        if !claims.is_access() {
            return Err(AppError::malformed("invalid token payload"));
        }
        Ok(claims)
    }

    /// Validate an access token and describe the outcome
    ///
    /// A cryptographically valid token stays valid when the credential
    /// store is unreachable; the result then carries claims-only data.
    pub async fn validate_token(&self, access_token: &str) -> ValidationResult {
        let claims = match self.validate_access(access_token).await {
            Ok(claims) => claims,
            Err(e) => return ValidationResult::invalid(e.to_string()),
        };

        match self.store.find_user_by_id(&claims.sub).await {
            Ok(user) => ValidationResult::valid(&claims, Some(user.email)),
            Err(StoreError::NotFound) => ValidationResult::invalid("user not found"),
            Err(StoreError::Backend(e)) => {
                tracing::warn!(
                    user_id = %claims.sub,
                    error = %e,
                    "User lookup failed, answering from claims only"
                );
                ValidationResult::valid(&claims, None)
            }
        }
    }

    /// Probe the revocation cache and the credential store
    pub async fn ping_dependencies(&self) -> Result<(), AppError> {
        self.cache.ping().await?;
        self.store.ping().await?;
        Ok(())
    }
}
