use actix_web::{web, HttpResponse};

use crate::metrics::AuthMetrics;

/// Serialise the service's metrics in Prometheus text format
pub async fn metrics(metrics: web::Data<AuthMetrics>) -> HttpResponse {
    match metrics.encode() {
        Ok((content_type, body)) => HttpResponse::Ok().content_type(content_type).body(body),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            HttpResponse::InternalServerError().body(e.to_string())
        }
    }
}
