//! # PagerDuty API client
//!
//! Typed access to the parts of the PagerDuty REST API the exporter reads
//! from, plus the payload types of the v3 webhooks PagerDuty pushes to it.
//!
//! - **`analytics`**: service analytics report query and the closed set of
//!   report metric names
//! - **`users`**: offset-paginated user listing
//! - **`webhook`**: v3 webhook envelope, event and incident payloads
//! - **`client`**: the reqwest-backed [`PagerdutyClient`]
//!
//! Collectors only depend on the [`PagerdutyApi`] trait so they can be driven
//! by a fake in tests.

#[macro_use]
extern crate tracing;

pub mod analytics;
pub mod client;
pub mod error;
mod serde_ext;
pub mod users;
pub mod webhook;

pub use analytics::{
    MissingMetric,
    Report,
    ReportItem,
    ReportMetricName,
    ReportTime,
    ServiceMetricReportFilters,
    ServiceMetricReportParams,
    UnknownReportMetric,
};
pub use client::{
    AuthMode,
    PagerdutyClient,
    DEFAULT_API_URL,
};
pub use error::{
    ApiErrorObject,
    ClientError,
};
pub use reqwest::StatusCode;
use std::{
    future::Future,
    pin::Pin,
};
pub use users::{
    ListUsersOptions,
    ListUsersResponse,
    User,
};
pub use webhook::{
    ApiObject,
    Incident,
    WebhookClient,
    WebhookEnvelope,
    WebhookEvent,
    WebhookEventType,
};

pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ClientError>> + Send + 'a>>;

/// The read operations the collectors need from PagerDuty.
pub trait PagerdutyApi: Send + Sync {
    /// Query the per-service incident analytics report.
    fn query_metric_report(&self, params: ServiceMetricReportParams) -> ApiFuture<'_, Report>;

    /// Fetch one page of users.
    fn list_users(&self, options: ListUsersOptions) -> ApiFuture<'_, ListUsersResponse>;
}
