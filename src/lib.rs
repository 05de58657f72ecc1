//! # PagerDuty Prometheus exporter
//!
//! Polls the PagerDuty API and listens for incident webhooks, and exposes
//! what it learns as Prometheus metrics.
//!
//! ## Architecture
//!
//! - **`pagerduty-client`**: typed PagerDuty API and webhook payloads
//! - **`pagerduty-exporter-collector`**: metrics registry, collectors and the
//!   periodic scheduler
//! - **`pagerduty-exporter-http`**: `/metrics` and incident webhook servers
//! - **`pagerduty-exporter-config`**: layered configuration
//! - **`App`** (this crate): wires everything together and owns shutdown
//!
//! ## Usage
//!
//! ```bash
//! PAGERDUTY_AUTH_TOKEN=... pagerduty-prometheus-exporter \
//!     --analytics-report-periods=7days,90days \
//!     --incident-webhook-signature-secret=...
//! ```

#[macro_use]
extern crate tracing;

mod app;
mod logging;

pub use app::App;
pub use logging::{
    init_errors,
    init_logging,
};
pub use pagerduty_exporter_config::{
    Args,
    Config,
};
