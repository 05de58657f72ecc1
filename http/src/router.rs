use crate::{
    metrics::{
        track_http,
        HttpMetrics,
    },
    webhook::{
        incident_webhook,
        WebhookState,
    },
};
use axum::{
    extract::State,
    http::{
        header::CONTENT_TYPE,
        StatusCode,
    },
    middleware,
    response::{
        IntoResponse,
        Response,
    },
    routing::{
        get,
        post,
    },
    Router,
};
use pagerduty_exporter_collector::MetricsRegistry;

pub const INCIDENT_WEBHOOK_HANDLER: &str = "incident_webhook";

/// `GET /metrics` in the Prometheus text exposition format.
pub fn create_metrics_router(registry: MetricsRegistry) -> Router {
    Router::new().route("/metrics", get(metrics)).with_state(registry)
}

/// The incident webhook at `path` plus `GET /healthz`.
pub fn create_webhook_router(path: &str, state: WebhookState, http_metrics: &HttpMetrics) -> Router {
    let tracked = middleware::from_fn_with_state(http_metrics.route(INCIDENT_WEBHOOK_HANDLER), track_http);

    Router::new()
        .route(path, post(incident_webhook).layer(tracked))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn metrics(State(registry): State<MetricsRegistry>) -> Response {
    match registry.encode_text() {
        Ok(body) => ([(CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!(error = %e, "encoding metrics failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn healthz() -> &'static str {
    "OK"
}
