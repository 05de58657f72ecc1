use crate::{
    error::WebhookError,
    signature::{
        SignatureVerifier,
        SIGNATURE_HEADER,
    },
};
use axum::{
    body::Bytes,
    extract::State,
    http::{
        HeaderMap,
        StatusCode,
    },
};
use pagerduty_client::WebhookEnvelope;
use pagerduty_exporter_collector::{
    FanOut,
    IncidentMetricsListener,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct WebhookState {
    verifier: Option<SignatureVerifier>,
    listener: Arc<IncidentMetricsListener>,
}

impl WebhookState {
    pub fn new(verifier: Option<SignatureVerifier>, listener: Arc<IncidentMetricsListener>) -> Self {
        Self { verifier, listener }
    }
}

/// `POST <incident webhook path>`.
///
/// Signature gate, then decode, then fan-out. Event types outside the
/// incident lifecycle are acknowledged without recording anything.
pub async fn incident_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookError> {
    if let Some(verifier) = &state.verifier {
        let signatures = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if !verifier.verify(&body, signatures) {
            return Err(WebhookError::InvalidSignature);
        }
    }

    let envelope: WebhookEnvelope = serde_json::from_slice(&body)?;
    let event = envelope.event;

    match state.listener.handle_event(&event)? {
        FanOut::Ignored => debug!(event_id = %event.id, event_type = %event.event_type, "webhook event ignored"),
        FanOut::Recorded { assignees, teams } => debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            assignees,
            teams,
            "webhook event recorded"
        ),
    }

    Ok(StatusCode::OK)
}
