//! # HTTP surface of the exporter
//!
//! - **`router`**: the `/metrics` router and the incident webhook router
//! - **`webhook`**: the webhook handler (signature, decode, fan-out)
//! - **`signature`**: `X-PagerDuty-Signature` verification
//! - **`metrics`**: request metrics middleware
//! - **`server`**: serving with bounded graceful shutdown

#[macro_use]
extern crate tracing;

pub mod error;
pub mod metrics;
pub mod router;
pub mod server;
pub mod signature;
pub mod webhook;

pub use error::WebhookError;
pub use metrics::HttpMetrics;
pub use router::{
    create_metrics_router,
    create_webhook_router,
};
pub use server::serve;
pub use signature::SignatureVerifier;
pub use webhook::WebhookState;
