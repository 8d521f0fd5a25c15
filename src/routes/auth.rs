/// Authentication Routes
///
/// Thin HTTP adapters over `SessionService`: login, logout, refresh,
/// token validation for other services, and the current user's claims.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{Claims, SessionService, TokenPair};
use crate::error::{AppError, ErrorContext, ValidationError};
use crate::middleware::bearer_token;
use crate::store::User;

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Token refresh request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token validation request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub access_token: String,
}

/// Issued token pair; `expires_at` is the access token expiry in Unix seconds
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_at: pair.expires_at.timestamp(),
        }
    }
}

/// Public view of a user record
#[derive(Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            roles: user.roles,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenResponse,
    pub user: UserResponse,
}

#[derive(Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

/// Claims of the authenticated caller
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user_id: String,
    pub username: String,
    pub roles: Vec<String>,
    pub expires_at: i64,
}

/// POST /api/v1/auth/login
///
/// # Errors
/// - 400: Empty or oversized username/password
/// - 401: Unknown user or wrong password (same message for both)
/// - 500: Credential store failure
pub async fn login(
    form: web::Json<LoginRequest>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let (pair, user) = sessions
        .login(&form.username, &form.password)
        .await
        .map_err(|e| {
            context.log_error(&e);
            e
        })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "Login succeeded"
    );

    Ok(HttpResponse::Ok().json(LoginResponse {
        tokens: pair.into(),
        user: user.into(),
    }))
}

/// POST /api/v1/auth/logout
///
/// Revokes the bearer access token. Logging out twice, or with an
/// expired token, still succeeds.
pub async fn logout(
    req: HttpRequest,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_logout");

    let token = bearer_token(req.headers())
        .ok_or(ValidationError::EmptyField("Authorization bearer token"))?;

    sessions.logout(&token).await.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    tracing::info!(request_id = %context.request_id, "Logout succeeded");

    Ok(HttpResponse::Ok().json(LogoutResponse {
        success: true,
        message: "Logged out successfully".to_string(),
    }))
}

/// POST /api/v1/auth/refresh
///
/// Exchanges a refresh token for a new pair; the presented refresh token
/// is revoked on a best-effort basis.
///
/// # Errors
/// - 401: Invalid, expired or revoked refresh token, or an access token
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let pair = sessions.refresh(&form.refresh_token).await.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    Ok(HttpResponse::Ok().json(TokenResponse::from(pair)))
}

/// POST /api/v1/auth/validate
///
/// Always answers 200; the body says whether the token is valid.
pub async fn validate(
    form: web::Json<ValidateRequest>,
    sessions: web::Data<SessionService>,
) -> HttpResponse {
    let result = sessions.validate_token(&form.access_token).await;
    HttpResponse::Ok().json(result)
}

/// GET /api/v1/me
///
/// Requires `Authorization: Bearer <access_token>`; claims are injected by
/// `JwtMiddleware`.
pub async fn me(claims: web::ReqData<Claims>) -> HttpResponse {
    let claims = claims.into_inner();

    HttpResponse::Ok().json(MeResponse {
        username: claims.name().unwrap_or_default().to_string(),
        roles: claims.roles().to_vec(),
        expires_at: claims.exp,
        user_id: claims.sub,
    })
}
