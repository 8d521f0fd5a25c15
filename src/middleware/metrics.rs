/// Prometheus Metrics Middleware
///
/// Counts requests and records latency per method, route pattern and
/// status. Unrouted requests share the `unmatched` path label.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::AuthMetrics;

const UNMATCHED_PATH: &str = "unmatched";

pub struct MetricsMiddleware {
    metrics: Arc<AuthMetrics>,
}

impl MetricsMiddleware {
    pub fn new(metrics: Arc<AuthMetrics>) -> Self {
        Self { metrics }
    }
}

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MetricsMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(MetricsMiddlewareService {
            service: Rc::new(service),
            metrics: self.metrics.clone(),
        }))
    }
}

pub struct MetricsMiddlewareService<S> {
    service: Rc<S>,
    metrics: Arc<AuthMetrics>,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let metrics = self.metrics.clone();
        let start = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();

        Box::pin(async move {
            let res = service.call(req).await;
            let seconds = start.elapsed().as_secs_f64();

            match &res {
                Ok(res) => {
                    let pattern = res
                        .request()
                        .match_pattern()
                        .unwrap_or_else(|| UNMATCHED_PATH.to_string());
                    metrics.observe_request(&method, &pattern, res.status().as_u16(), seconds);
                }
                // Errors only escape from middleware on routed resources
                Err(e) => {
                    let status = e.as_response_error().status_code().as_u16();
                    metrics.observe_request(&method, &path, status, seconds);
                }
            }

            res
        })
    }
}
