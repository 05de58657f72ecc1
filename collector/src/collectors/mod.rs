//! # Collectors
//!
//! - **`Collector` trait**: one unit of periodic metric refresh
//! - **`InstrumentedCollector`**: decorator that records latency, attempts and
//!   failures and keeps failures away from the scheduler
//! - **`PeriodicScheduler`**: runs collectors on a fixed period until cancelled
//! - **`ServiceAnalyticsCollector`**: service analytics report over a sliding window
//! - **`UsersCollector`**: presence gauge per PagerDuty user

pub mod collector;
pub mod instrumented;
pub mod scheduler;
pub mod service_analytics;
pub mod users;

pub use collector::{
    CollectFuture,
    Collector,
};
pub use instrumented::{
    CollectOutcome,
    CollectProcessMetrics,
    InstrumentedCollector,
};
pub use scheduler::PeriodicScheduler;
pub use service_analytics::{
    report_window,
    ServiceAnalyticMetrics,
    ServiceAnalyticsCollector,
};
pub use users::UsersCollector;
