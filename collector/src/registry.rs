//! Process-wide metrics registry.
//!
//! Wraps a [`prometheus::Registry`] with get-or-create registration: asking
//! for the same metric family twice hands back the already registered vector
//! instead of failing, so independent components can declare the series they
//! write to without coordinating.

use prometheus::{
    core::Collector as PromCollector,
    CounterVec,
    GaugeVec,
    HistogramOpts,
    HistogramVec,
    Opts,
    Registry,
    TextEncoder,
};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
    },
};

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("metric {name} is already registered as a {existing}, not a {requested}")]
    KindMismatch {
        name: String,
        existing: &'static str,
        requested: &'static str,
    },
    #[error("metric {name} is already registered with labels {existing:?}, not {requested:?}")]
    LabelMismatch {
        name: String,
        existing: Vec<String>,
        requested: Vec<String>,
    },
    #[error(transparent)]
    Prometheus(#[from] prometheus::Error),
}

#[derive(Clone)]
enum Family {
    Gauge(GaugeVec),
    Counter(CounterVec),
    Histogram(HistogramVec),
}

impl Family {
    fn kind(&self) -> &'static str {
        match self {
            Family::Gauge(_) => "gauge",
            Family::Counter(_) => "counter",
            Family::Histogram(_) => "histogram",
        }
    }

    fn boxed(&self) -> Box<dyn PromCollector> {
        match self {
            Family::Gauge(v) => Box::new(v.clone()),
            Family::Counter(v) => Box::new(v.clone()),
            Family::Histogram(v) => Box::new(v.clone()),
        }
    }
}

struct Registered {
    labels: Vec<String>,
    family: Family,
}

struct Inner {
    registry: Registry,
    prefix: String,
    families: Mutex<HashMap<String, Registered>>,
}

/// Shared handle to the metrics registry. Cheap to clone.
#[derive(Clone)]
pub struct MetricsRegistry {
    inner: Arc<Inner>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new("")
    }
}

impl MetricsRegistry {
    /// `prefix` is prepended verbatim to every metric name.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Registry::new(),
                prefix: prefix.into(),
                families: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn gauge_vec(&self, name: &str, help: &str, labels: &[&str]) -> Result<GaugeVec, RegistryError> {
        match self.get_or_register(name, "gauge", labels, |full_name| {
            Ok(Family::Gauge(GaugeVec::new(Opts::new(full_name, help), labels)?))
        })? {
            Family::Gauge(v) => Ok(v),
            other => Err(self.kind_mismatch(name, other.kind(), "gauge")),
        }
    }

    pub fn counter_vec(&self, name: &str, help: &str, labels: &[&str]) -> Result<CounterVec, RegistryError> {
        match self.get_or_register(name, "counter", labels, |full_name| {
            Ok(Family::Counter(CounterVec::new(Opts::new(full_name, help), labels)?))
        })? {
            Family::Counter(v) => Ok(v),
            other => Err(self.kind_mismatch(name, other.kind(), "counter")),
        }
    }

    /// Histogram with the default Prometheus buckets.
    pub fn histogram_vec(&self, name: &str, help: &str, labels: &[&str]) -> Result<HistogramVec, RegistryError> {
        match self.get_or_register(name, "histogram", labels, |full_name| {
            Ok(Family::Histogram(HistogramVec::new(
                HistogramOpts::new(full_name, help),
                labels,
            )?))
        })? {
            Family::Histogram(v) => Ok(v),
            other => Err(self.kind_mismatch(name, other.kind(), "histogram")),
        }
    }

    /// Export `process_*` metrics (CPU, memory, file descriptors) for this
    /// process. Only available on Linux; elsewhere this does nothing.
    pub fn register_process_collector(&self) -> Result<(), RegistryError> {
        #[cfg(target_os = "linux")]
        {
            let collector = prometheus::process_collector::ProcessCollector::for_self();
            self.inner.registry.register(Box::new(collector))?;
            debug!("registered process collector");
        }
        Ok(())
    }

    /// Render every registered family in the Prometheus text exposition format.
    pub fn encode_text(&self) -> Result<String, RegistryError> {
        let families = self.inner.registry.gather();
        Ok(TextEncoder::new().encode_to_string(&families)?)
    }

    fn full_name(&self, name: &str) -> String {
        format!("{}{}", self.inner.prefix, name)
    }

    fn kind_mismatch(&self, name: &str, existing: &'static str, requested: &'static str) -> RegistryError {
        RegistryError::KindMismatch {
            name: self.full_name(name),
            existing,
            requested,
        }
    }

    fn get_or_register<F>(
        &self,
        name: &str,
        requested: &'static str,
        labels: &[&str],
        create: F,
    ) -> Result<Family, RegistryError>
    where
        F: FnOnce(String) -> Result<Family, RegistryError>,
    {
        let full_name = self.full_name(name);
        let mut families = match self.inner.families.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(existing) = families.get(&full_name) {
            if existing.family.kind() != requested {
                return Err(RegistryError::KindMismatch {
                    name: full_name,
                    existing: existing.family.kind(),
                    requested,
                });
            }
            if existing.labels.iter().map(String::as_str).ne(labels.iter().copied()) {
                return Err(RegistryError::LabelMismatch {
                    name: full_name,
                    existing: existing.labels.clone(),
                    requested: labels.iter().map(|l| l.to_string()).collect(),
                });
            }
            return Ok(existing.family.clone());
        }

        let family = create(full_name.clone())?;
        self.inner.registry.register(family.boxed())?;
        debug!(metric = %full_name, kind = family.kind(), "registered metric family");

        families.insert(
            full_name,
            Registered {
                labels: labels.iter().map(|l| l.to_string()).collect(),
                family: family.clone(),
            },
        );
        Ok(family)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn registering_twice_returns_the_same_family() {
        let registry = MetricsRegistry::default();

        let first = registry.gauge_vec("pagerduty_user", "users", &["id", "name"]).unwrap();
        let second = registry.gauge_vec("pagerduty_user", "users", &["id", "name"]).unwrap();

        first.with_label_values(&["PUSER01", "Ada"]).set(1.0);
        assert_eq!(second.with_label_values(&["PUSER01", "Ada"]).get(), 1.0);

        let families = registry.registry().gather();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].get_metric().len(), 1);
        assert!(registry.encode_text().unwrap().contains(r#"pagerduty_user{id="PUSER01",name="Ada"} 1"#));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn process_metrics_are_exported_unprefixed() {
        let registry = MetricsRegistry::new("acme_");
        registry.register_process_collector().unwrap();

        let text = registry.encode_text().unwrap();
        assert!(text.contains("\nprocess_cpu_seconds_total "), "{text}");
        assert!(text.contains("\nprocess_resident_memory_bytes "), "{text}");
    }

    #[test]
    fn conflicting_registrations_are_rejected() {
        let registry = MetricsRegistry::default();
        registry.counter_vec("collections", "help", &["collector_name"]).unwrap();

        assert!(matches!(
            registry.gauge_vec("collections", "help", &["collector_name"]),
            Err(RegistryError::KindMismatch { .. })
        ));
        assert!(matches!(
            registry.counter_vec("collections", "help", &["other"]),
            Err(RegistryError::LabelMismatch { .. })
        ));
    }

    #[test]
    fn prefix_is_prepended_verbatim() {
        let registry = MetricsRegistry::new("acme_");
        registry
            .counter_vec("pagerduty_metrics_collector_collections_count", "help", &["collector_name"])
            .unwrap()
            .with_label_values(&["users"])
            .inc();

        let text = registry.encode_text().unwrap();
        assert!(text.contains("acme_pagerduty_metrics_collector_collections_count{collector_name=\"users\"} 1"));
    }
}
