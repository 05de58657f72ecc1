use crate::{
    collectors::collector::{
        CollectFuture,
        Collector,
    },
    names,
    registry::{
        MetricsRegistry,
        RegistryError,
    },
};
use prometheus::{
    Counter,
    CounterVec,
    Histogram,
    HistogramVec,
};

/// The three metrics-on-metrics vectors shared by every instrumented collector.
#[derive(Clone)]
pub struct CollectProcessMetrics {
    latency: HistogramVec,
    collections: CounterVec,
    errors: CounterVec,
}

impl CollectProcessMetrics {
    pub fn register(registry: &MetricsRegistry) -> Result<Self, RegistryError> {
        let labels = [names::COLLECTOR_NAME_LABEL];
        Ok(Self {
            latency: registry.histogram_vec(
                names::COLLECTOR_LATENCY,
                "Time spent in a single collection run, in seconds",
                &labels,
            )?,
            collections: registry.counter_vec(
                names::COLLECTOR_COLLECTIONS_COUNT,
                "Number of collection runs started",
                &labels,
            )?,
            errors: registry.counter_vec(
                names::COLLECTOR_ERRORS_COUNT,
                "Number of collection runs that failed",
                &labels,
            )?,
        })
    }
}

/// Result of one instrumented run. Observed, never handed to the scheduler.
#[derive(Debug)]
pub enum CollectOutcome {
    Ok,
    Failed(eyre::Report),
}

impl CollectOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, CollectOutcome::Ok)
    }
}

/// Wraps a collector so its failures are logged and counted instead of
/// propagated.
pub struct InstrumentedCollector<C> {
    name: String,
    inner: C,
    latency: Histogram,
    collections: Counter,
    errors: Counter,
}

impl<C: Collector> InstrumentedCollector<C> {
    pub fn new(metrics: &CollectProcessMetrics, name: impl Into<String>, inner: C) -> Self {
        let name = name.into();
        let label = [name.as_str()];
        Self {
            latency: metrics.latency.with_label_values(&label),
            collections: metrics.collections.with_label_values(&label),
            errors: metrics.errors.with_label_values(&label),
            name,
            inner,
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Run the wrapped collector once, recording latency, attempts and failures.
    pub async fn run_once(&self) -> CollectOutcome {
        debug!(collector = %self.name, "collection start");
        self.collections.inc();
        // Observed on drop, so cancelled runs are timed as well.
        let _timer = self.latency.start_timer();

        match self.inner.collect().await {
            Ok(()) => {
                debug!(collector = %self.name, "collection finished");
                CollectOutcome::Ok
            }
            Err(e) => {
                self.errors.inc();
                error!(collector = %self.name, error = ?e, "collection failed");
                CollectOutcome::Failed(e)
            }
        }
    }
}

impl<C: Collector> Collector for InstrumentedCollector<C> {
    fn collect(&self) -> CollectFuture<'_> {
        Box::pin(async move {
            self.run_once().await;
            Ok(())
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
