/// Middleware module
///
/// Bearer-token authentication for protected routes and request metrics.

mod jwt_middleware;
mod metrics;

pub use jwt_middleware::{bearer_token, JwtMiddleware};
pub use metrics::MetricsMiddleware;
