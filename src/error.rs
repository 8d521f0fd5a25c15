/// Error Handling Module
///
/// One error taxonomy for the whole token lifecycle:
/// 1. Token failures (malformed, bad signature, expired, revoked)
/// 2. Credential failures (unknown user, wrong password)
/// 3. Input validation, fatal configuration and internal failures
/// 4. HTTP response mapping with structured error logging

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

use crate::cache::CacheError;
use crate::store::StoreError;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Reasons a presented token is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token has been revoked")]
    Revoked,
}

/// Validation errors for request input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    EmptyField(&'static str),
    #[error("{0} is too long (maximum {1} characters)")]
    TooLong(&'static str, usize),
    #[error("{0} contains suspicious content")]
    SuspiciousContent(&'static str),
}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("user not found")]
    NotFound,
    #[error("invalid username or password")]
    Unauthenticated,
    #[error("configuration error: {0}")]
    ConfigurationFatal(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Flat error kind so callers can branch on the cause without matching
/// nested enums
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    MalformedToken,
    BadSignature,
    Expired,
    Revoked,
    NotFound,
    Unauthenticated,
    ConfigurationFatal,
    Internal,
}

impl ErrorKind {
    /// Lowercase label used for metric outcomes
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::MalformedToken => "malformed_token",
            ErrorKind::BadSignature => "bad_signature",
            ErrorKind::Expired => "expired",
            ErrorKind::Revoked => "revoked",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::ConfigurationFatal => "configuration_fatal",
            ErrorKind::Internal => "internal",
        }
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::InvalidArgument,
            AppError::Token(TokenError::Malformed(_)) => ErrorKind::MalformedToken,
            AppError::Token(TokenError::BadSignature) => ErrorKind::BadSignature,
            AppError::Token(TokenError::Expired) => ErrorKind::Expired,
            AppError::Token(TokenError::Revoked) => ErrorKind::Revoked,
            AppError::NotFound => ErrorKind::NotFound,
            AppError::Unauthenticated => ErrorKind::Unauthenticated,
            AppError::ConfigurationFatal(_) => ErrorKind::ConfigurationFatal,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        AppError::Token(TokenError::Malformed(msg.into()))
    }

    /// Stable machine-readable code used in HTTP error bodies
    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidArgument => "VALIDATION_ERROR",
            ErrorKind::MalformedToken => "TOKEN_MALFORMED",
            ErrorKind::BadSignature => "TOKEN_INVALID",
            ErrorKind::Expired => "TOKEN_EXPIRED",
            ErrorKind::Revoked => "TOKEN_REVOKED",
            // Same code for both so login responses don't reveal which
            // usernames exist.
            ErrorKind::NotFound | ErrorKind::Unauthenticated => "INVALID_CREDENTIALS",
            ErrorKind::ConfigurationFatal => "CONFIG_ERROR",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        AppError::Internal(format!("revocation cache: {}", err))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound,
            StoreError::Backend(msg) => AppError::Internal(format!("credential store: {}", msg)),
        }
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let status = ResponseError::status_code(self);
        let message = match self {
            AppError::Validation(e) => e.to_string(),
            AppError::Token(e) => e.to_string(),
            AppError::NotFound | AppError::Unauthenticated => {
                "Invalid username or password".to_string()
            }
            AppError::ConfigurationFatal(_) => "Server configuration error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        };

        let error_response = ErrorResponse::new(
            request_id.to_string(),
            message,
            self.code().to_string(),
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Token(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Token rejected");
            }
            AppError::NotFound | AppError::Unauthenticated => {
                tracing::warn!(
                    request_id = request_id,
                    error = %self,
                    "Invalid credentials attempt"
                );
            }
            AppError::ConfigurationFatal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Configuration error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Token(_) | AppError::NotFound | AppError::Unauthenticated => {
                StatusCode::UNAUTHORIZED
            }
            AppError::ConfigurationFatal(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Error context for enhanced logging and debugging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn log_error(&self, error: &AppError) {
        let context = serde_json::json!({
            "request_id": self.request_id,
            "operation": self.operation,
            "timestamp": self.timestamp.to_rfc3339(),
        });

        match error.kind() {
            ErrorKind::Internal | ErrorKind::ConfigurationFatal => {
                tracing::error!(error = %error, context = ?context, "Request failed");
            }
            _ => {
                tracing::warn!(error = %error, context = ?context, "Request rejected");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_labels_are_distinct() {
        let labels: std::collections::HashSet<_> = [
            ErrorKind::InvalidArgument,
            ErrorKind::MalformedToken,
            ErrorKind::BadSignature,
            ErrorKind::Expired,
            ErrorKind::Revoked,
            ErrorKind::NotFound,
            ErrorKind::Unauthenticated,
            ErrorKind::ConfigurationFatal,
            ErrorKind::Internal,
        ]
        .iter()
        .map(ErrorKind::as_str)
        .collect();
        assert_eq!(labels.len(), 9);
    }

    #[test]
    fn test_revoked_message_mentions_revoked() {
        let err = AppError::from(TokenError::Revoked);
        assert!(err.to_string().contains("revoked"));
        assert_eq!(err.kind(), ErrorKind::Revoked);
    }

    #[test]
    fn test_token_errors_map_to_unauthorized() {
        for err in [
            TokenError::Malformed("x".to_string()),
            TokenError::BadSignature,
            TokenError::Expired,
            TokenError::Revoked,
        ] {
            let app_err = AppError::from(err);
            assert_eq!(ResponseError::status_code(&app_err), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_credential_errors_are_indistinguishable_over_http() {
        let (status_a, body_a) = ErrorHandler::error_response(&AppError::NotFound, "req-1");
        let (status_b, body_b) = ErrorHandler::error_response(&AppError::Unauthenticated, "req-2");

        assert_eq!(status_a, StatusCode::UNAUTHORIZED);
        assert_eq!(status_a, status_b);
        assert_eq!(body_a.message, body_b.message);
        assert_eq!(body_a.code, body_b.code);
    }

    #[test]
    fn test_store_error_conversion() {
        assert_eq!(AppError::from(StoreError::NotFound).kind(), ErrorKind::NotFound);
        assert_eq!(
            AppError::from(StoreError::Backend("down".to_string())).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_cache_error_is_internal() {
        let err = AppError::from(CacheError::Timeout);
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(
            ResponseError::status_code(&err),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_error_is_bad_request() {
        let err = AppError::from(ValidationError::EmptyField("username"));
        assert_eq!(err.to_string(), "username is required");
        assert_eq!(ResponseError::status_code(&err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_context_creation() {
        let ctx = ErrorContext::new("user_login");
        assert_eq!(ctx.operation, "user_login");
        assert_ne!(ctx.request_id, ErrorContext::new("user_login").request_id);
    }
}
