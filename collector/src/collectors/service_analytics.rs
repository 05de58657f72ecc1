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
use chrono::{
    DateTime,
    Utc,
};
use eyre::{
    eyre,
    Result,
    WrapErr,
};
use pagerduty_client::{
    PagerdutyApi,
    Report,
    ReportMetricName,
    ServiceMetricReportParams,
};
use prometheus::GaugeVec;
use std::{
    sync::Arc,
    time::Duration,
};

/// One gauge vector per exported analytics metric, in configured order.
#[derive(Clone)]
pub struct ServiceAnalyticMetrics {
    gauges: Vec<(ReportMetricName, GaugeVec)>,
}

impl ServiceAnalyticMetrics {
    pub fn register(registry: &MetricsRegistry, metrics: &[ReportMetricName]) -> Result<Self, RegistryError> {
        let gauges = metrics
            .iter()
            .map(|&metric| {
                let gauge = registry.gauge_vec(
                    &names::service_metric_name(metric),
                    &format!("PagerDuty service analytics {metric}"),
                    &names::SERVICE_LABELS,
                )?;
                Ok((metric, gauge))
            })
            .collect::<Result<_, RegistryError>>()?;

        Ok(Self { gauges })
    }
}

/// The `[end - period, end)` window, or `None` when its start is not a
/// representable date.
pub fn report_window(end: DateTime<Utc>, period: Duration) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let period = chrono::Duration::from_std(period).ok()?;
    Some((end.checked_sub_signed(period)?, end))
}

/// Exports the service analytics report over a sliding `[now - period, now)` window.
pub struct ServiceAnalyticsCollector {
    client: Arc<dyn PagerdutyApi>,
    metrics: ServiceAnalyticMetrics,
    period: Duration,
    period_label: String,
}

impl ServiceAnalyticsCollector {
    pub fn new(client: Arc<dyn PagerdutyApi>, metrics: ServiceAnalyticMetrics, period: Duration) -> Self {
        Self {
            client,
            metrics,
            period,
            period_label: names::report_interval_label(period),
        }
    }

    pub fn period_label(&self) -> &str {
        &self.period_label
    }

    async fn collect_report(&self) -> Result<()> {
        let (start, end) = report_window(Utc::now(), self.period)
            .ok_or_else(|| eyre!("report period {} reaches past the earliest supported date", self.period_label))?;

        let report = self
            .client
            .query_metric_report(ServiceMetricReportParams::utc_window(start, end))
            .await
            .wrap_err_with(|| format!("querying service analytics for the last {}", self.period_label))?;

        let skipped = self.record(&report);
        debug!(
            rows = report.data.len(),
            skipped,
            report_interval = %self.period_label,
            "service analytics recorded"
        );
        Ok(())
    }

    /// Sets one gauge per (row, metric). A metric missing from a row is logged
    /// and skipped. Returns the number of skipped observations.
    fn record(&self, report: &Report) -> usize {
        let mut skipped = 0;

        for row in &report.data {
            let labels = [
                row.service_id.as_str(),
                row.service_name.as_str(),
                self.period_label.as_str(),
            ];

            for (metric, gauge) in &self.metrics.gauges {
                match row.metric_by_name(*metric) {
                    Ok(value) => gauge.with_label_values(&labels).set(value),
                    Err(e) => {
                        skipped += 1;
                        error!(
                            error = %e,
                            metric = %metric,
                            service_id = %row.service_id,
                            "Get metric by name error, skipping..."
                        );
                    }
                }
            }
        }

        skipped
    }
}

impl Collector for ServiceAnalyticsCollector {
    fn collect(&self) -> CollectFuture<'_> {
        Box::pin(self.collect_report())
    }

    fn name(&self) -> &str {
        "service_analytics"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagerduty_client::{
        ApiErrorObject,
        ApiFuture,
        ClientError,
        ListUsersOptions,
        ListUsersResponse,
        ReportItem,
        StatusCode,
    };
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    struct FakeAnalytics {
        report: Option<Report>,
        requests: Mutex<Vec<ServiceMetricReportParams>>,
    }

    impl PagerdutyApi for FakeAnalytics {
        fn query_metric_report(&self, params: ServiceMetricReportParams) -> ApiFuture<'_, Report> {
            self.requests.lock().unwrap().push(params);
            let result = self.report.clone().ok_or(ClientError::Api {
                status: StatusCode::SERVICE_UNAVAILABLE,
                error: ApiErrorObject::default(),
            });
            Box::pin(async move { result })
        }

        fn list_users(&self, _options: ListUsersOptions) -> ApiFuture<'_, ListUsersResponse> {
            unreachable!("analytics collector never lists users")
        }
    }

    fn row(i: usize) -> ReportItem {
        ReportItem {
            service_id: format!("PSVC{i:03}"),
            service_name: format!("service-{i}"),
            total_incident_count: Some(i as f64),
            up_time_pct: Some(99.5),
            ..Default::default()
        }
    }

    fn collector(registry: &MetricsRegistry, report: Option<Report>) -> (Arc<FakeAnalytics>, ServiceAnalyticsCollector) {
        collector_over(registry, report, Duration::from_secs(90 * 86_400))
    }

    fn collector_over(
        registry: &MetricsRegistry,
        report: Option<Report>,
        period: Duration,
    ) -> (Arc<FakeAnalytics>, ServiceAnalyticsCollector) {
        let fake = Arc::new(FakeAnalytics {
            report,
            requests: Mutex::new(Vec::new()),
        });
        let metrics = ServiceAnalyticMetrics::register(
            registry,
            &[ReportMetricName::TotalIncidentCount, ReportMetricName::UpTimePct],
        )
        .unwrap();
        let collector = ServiceAnalyticsCollector::new(fake.clone(), metrics, period);
        (fake, collector)
    }

    #[test]
    fn missing_field_skips_only_that_observation() {
        let registry = MetricsRegistry::default();
        let mut data: Vec<_> = (0..200).map(row).collect();
        data[17].up_time_pct = None;
        let report = Report { data };
        let (_, collector) = collector(&registry, None);

        assert_eq!(collector.record(&report), 1);

        let families = registry.registry().gather();
        let observed: usize = families.iter().map(|f| f.get_metric().len()).sum();
        assert_eq!(observed, 399);

        let up_time = registry
            .gauge_vec("pagerduty_service_up_time_pct", "", &names::SERVICE_LABELS)
            .unwrap();
        assert_eq!(up_time.with_label_values(&["PSVC018", "service-18", "90days"]).get(), 99.5);
    }

    #[tokio::test]
    async fn queries_the_configured_window_and_labels_by_period() {
        let registry = MetricsRegistry::default();
        let (fake, collector) = collector(&registry, Some(Report { data: vec![row(7)] }));

        collector.collect().await.unwrap();

        let requests = fake.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let filters = &requests[0].filters;
        assert_eq!(*filters.created_at_end - *filters.created_at_start, chrono::Duration::days(90));
        assert_eq!(requests[0].time_zone, "Etc/UTC");

        let text = registry.encode_text().unwrap();
        assert!(text.contains(
            r#"pagerduty_service_total_incident_count{report_interval="90days",service_id="PSVC007",service_name="service-7"} 7"#
        ));
    }

    #[tokio::test]
    async fn fetch_failure_is_returned_with_context() {
        let registry = MetricsRegistry::default();
        let (_, collector) = collector(&registry, None);

        let err = collector.collect().await.unwrap_err();
        assert!(err.to_string().contains("querying service analytics for the last 90days"));
    }

    #[tokio::test]
    async fn unrepresentable_window_is_an_error_before_any_request() {
        let registry = MetricsRegistry::default();
        let period = Duration::from_secs(280_000 * 365 * 86_400);
        let (fake, collector) = collector_over(&registry, Some(Report { data: vec![row(1)] }), period);

        let err = collector.collect().await.unwrap_err();

        assert!(err.to_string().contains("reaches past the earliest supported date"), "{err}");
        assert!(fake.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn report_window_spans_the_period() {
        let end = Utc::now();
        let (start, window_end) = report_window(end, Duration::from_secs(7 * 86_400)).unwrap();

        assert_eq!(window_end, end);
        assert_eq!(end - start, chrono::Duration::days(7));
        assert_eq!(report_window(end, Duration::MAX), None);
    }
}
