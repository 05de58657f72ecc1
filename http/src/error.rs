use axum::{
    http::StatusCode,
    response::{
        IntoResponse,
        Response,
    },
};
use pagerduty_exporter_collector::ListenerError;

#[derive(thiserror::Error, Debug)]
pub enum WebhookError {
    #[error("webhook signature does not match")]
    InvalidSignature,
    #[error("decoding the webhook envelope failed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("processing the incident event failed: {0}")]
    Listener(#[from] ListenerError),
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature => StatusCode::FORBIDDEN,
            WebhookError::Decode(_) => StatusCode::BAD_REQUEST,
            WebhookError::Listener(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, %status, "incident webhook failed");
        } else {
            warn!(error = %self, %status, "incident webhook rejected");
        }

        (status, axum::Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
