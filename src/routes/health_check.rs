use actix_web::{web, HttpResponse};

use crate::auth::SessionService;

/// Liveness of the service and its revocation cache and credential store
pub async fn health_check(sessions: web::Data<SessionService>) -> HttpResponse {
    match sessions.ping_dependencies().await {
        Ok(()) => {
            tracing::debug!("Health check passed");
            HttpResponse::Ok().body("OK")
        }
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            HttpResponse::ServiceUnavailable().finish()
        }
    }
}
