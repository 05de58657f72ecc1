//! # PagerDuty exporter collection
//!
//! Everything that turns PagerDuty state into Prometheus series:
//!
//! - **`registry`**: the shared [`MetricsRegistry`] every component writes to
//! - **`collectors`**: polled collectors, their instrumentation and the
//!   periodic scheduler driving them
//! - **`webhook`**: fan-out of pushed incident events into correlated series
//! - **`names`**: metric names and label sets

#[macro_use]
extern crate tracing;

pub mod collectors;
pub mod names;
pub mod registry;
pub mod webhook;

pub use collectors::*;
pub use registry::{
    MetricsRegistry,
    RegistryError,
};
pub use webhook::{
    is_valid_dt_format,
    FanOut,
    IncidentMetricsListener,
    ListenerError,
    DEFAULT_DT_FORMAT,
};
