/// Prometheus metrics
///
/// Every `AuthMetrics` owns its own registry, so two services in one
/// process (integration tests spawn several) never share counters.
/// Outcome labels are `success` or the lowercase error kind.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::error::AppError;

const OUTCOME: &[&str] = &["outcome"];
const HTTP_LABELS: &[&str] = &["method", "path", "status"];
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

pub struct AuthMetrics {
    registry: Registry,
    logins: IntCounterVec,
    refreshes: IntCounterVec,
    revocations: IntCounterVec,
    validations: IntCounterVec,
    http_requests: IntCounterVec,
    http_duration: HistogramVec,
}

/// Metric outcome label for an operation result
pub fn outcome<T>(result: &Result<T, AppError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) => e.kind().as_str(),
    }
}

fn counter(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> Result<IntCounterVec, prometheus::Error> {
    let counter = IntCounterVec::new(Opts::new(name, help), labels)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl AuthMetrics {
    /// # Errors
    /// Only if two metrics are registered under the same name
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let logins = counter(&registry, "auth_login_total", "Login attempts by outcome", OUTCOME)?;
        let refreshes = counter(
            &registry,
            "auth_refresh_total",
            "Refresh token exchanges by outcome",
            OUTCOME,
        )?;
        let revocations = counter(
            &registry,
            "auth_revocations_total",
            "Token revocations (logout) by outcome",
            OUTCOME,
        )?;
        let validations = counter(
            &registry,
            "auth_validations_total",
            "Access token validations by outcome",
            OUTCOME,
        )?;
        let http_requests = counter(
            &registry,
            "http_requests_total",
            "Total HTTP requests",
            HTTP_LABELS,
        )?;

        let http_duration = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request latency")
                .buckets(LATENCY_BUCKETS.to_vec()),
            HTTP_LABELS,
        )?;
        registry.register(Box::new(http_duration.clone()))?;

        Ok(Self {
            registry,
            logins,
            refreshes,
            revocations,
            validations,
            http_requests,
            http_duration,
        })
    }

    pub fn record_login(&self, outcome: &str) {
        self.logins.with_label_values(&[outcome]).inc();
    }

    pub fn record_refresh(&self, outcome: &str) {
        self.refreshes.with_label_values(&[outcome]).inc();
    }

    pub fn record_revocation(&self, outcome: &str) {
        self.revocations.with_label_values(&[outcome]).inc();
    }

    pub fn record_validation(&self, outcome: &str) {
        self.validations.with_label_values(&[outcome]).inc();
    }

    pub fn observe_request(&self, method: &str, path: &str, status: u16, seconds: f64) {
        let status = status.to_string();
        let labels = [method, path, status.as_str()];
        self.http_requests.with_label_values(&labels).inc();
        self.http_duration.with_label_values(&labels).observe(seconds);
    }

    /// Current values in the Prometheus text exposition format
    pub fn encode(&self) -> Result<(String, Vec<u8>), prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok((encoder.format_type().to_string(), buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TokenError;

    fn rendered(metrics: &AuthMetrics) -> String {
        let (_, body) = metrics.encode().unwrap();
        String::from_utf8(body).unwrap()
    }

    #[test]
    fn test_outcome_labels() {
        let ok: Result<(), AppError> = Ok(());
        let revoked: Result<(), AppError> = Err(TokenError::Revoked.into());

        assert_eq!(outcome(&ok), "success");
        assert_eq!(outcome(&revoked), "revoked");
        assert_eq!(outcome::<()>(&Err(AppError::Unauthenticated)), "unauthenticated");
    }

    #[test]
    fn test_counters_are_rendered() {
        let metrics = AuthMetrics::new().unwrap();

        metrics.record_login("success");
        metrics.record_login("success");
        metrics.record_login("unauthenticated");
        metrics.observe_request("POST", "/api/v1/auth/login", 200, 0.02);

        let text = rendered(&metrics);
        assert!(text.contains(r#"auth_login_total{outcome="success"} 2"#));
        assert!(text.contains(r#"auth_login_total{outcome="unauthenticated"} 1"#));
        assert!(text.contains(
            r#"http_requests_total{method="POST",path="/api/v1/auth/login",status="200"} 1"#
        ));
        assert!(text.contains("http_request_duration_seconds_bucket"));
    }

    #[test]
    fn test_registries_are_independent() {
        let first = AuthMetrics::new().unwrap();
        let second = AuthMetrics::new().unwrap();

        first.record_refresh("success");

        assert!(rendered(&first).contains(r#"auth_refresh_total{outcome="success"} 1"#));
        assert!(!rendered(&second).contains("auth_refresh_total{"));
    }
}
