mod auth;
mod health_check;
mod metrics;

pub use auth::{
    login, logout, me, refresh, validate, LoginRequest, LoginResponse, LogoutResponse, MeResponse,
    RefreshRequest, TokenResponse, UserResponse, ValidateRequest,
};
pub use health_check::health_check;
pub use metrics::metrics;
