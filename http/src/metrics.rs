//! Per-route HTTP request metrics.

use axum::{
    extract::{
        Request,
        State,
    },
    middleware::Next,
    response::Response,
};
use pagerduty_exporter_collector::{
    MetricsRegistry,
    RegistryError,
};
use prometheus::{
    Gauge,
    GaugeVec,
    HistogramVec,
};
use tokio::time::Instant;

pub const HTTP_REQUESTS_INFLIGHT: &str = "http_requests_inflight";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

#[derive(Clone)]
pub struct HttpMetrics {
    inflight: GaugeVec,
    duration: HistogramVec,
}

impl HttpMetrics {
    pub fn register(registry: &MetricsRegistry) -> Result<Self, RegistryError> {
        Ok(Self {
            inflight: registry.gauge_vec(
                HTTP_REQUESTS_INFLIGHT,
                "Number of requests currently being served",
                &["handler"],
            )?,
            duration: registry.histogram_vec(
                HTTP_REQUEST_DURATION_SECONDS,
                "Time spent serving requests, in seconds",
                &["handler", "code", "method"],
            )?,
        })
    }

    pub fn route(&self, handler: &'static str) -> TrackedRoute {
        TrackedRoute {
            metrics: self.clone(),
            handler,
        }
    }
}

/// State of the [`track_http`] middleware for one named route.
#[derive(Clone)]
pub struct TrackedRoute {
    metrics: HttpMetrics,
    handler: &'static str,
}

/// Holds one slot of the in-flight gauge until dropped, including when the
/// request future itself is dropped mid-flight.
struct InflightGuard(Gauge);

impl InflightGuard {
    fn enter(gauge: Gauge) -> Self {
        gauge.inc();
        Self(gauge)
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.0.dec();
    }
}

pub async fn track_http(State(route): State<TrackedRoute>, request: Request, next: Next) -> Response {
    let method = request.method().as_str().to_string();
    let started = Instant::now();

    let inflight = InflightGuard::enter(route.metrics.inflight.with_label_values(&[route.handler]));
    let response = next.run(request).await;
    drop(inflight);

    route
        .metrics
        .duration
        .with_label_values(&[route.handler, response.status().as_str(), method.as_str()])
        .observe(started.elapsed().as_secs_f64());

    response
}
