use color_eyre::Result;
use eyre::{
    eyre,
    WrapErr,
};
use pagerduty_client::{
    PagerdutyApi,
    PagerdutyClient,
};
use pagerduty_exporter_collector::{
    CollectProcessMetrics,
    IncidentMetricsListener,
    InstrumentedCollector,
    MetricsRegistry,
    PeriodicScheduler,
    ServiceAnalyticMetrics,
    ServiceAnalyticsCollector,
    UsersCollector,
};
use pagerduty_exporter_config::Config;
use pagerduty_exporter_http::{
    create_metrics_router,
    create_webhook_router,
    serve,
    HttpMetrics,
    SignatureVerifier,
    WebhookState,
};
use std::{
    net::SocketAddr,
    sync::Arc,
};
use tokio::{
    net::TcpListener,
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;

pub struct App {
    config: Config,
    registry: MetricsRegistry,
    client: Arc<dyn PagerdutyApi>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let client = PagerdutyClient::new(config.pagerduty_auth_token.expose())?
            .with_api_url(config.api_url()?)
            .with_auth_mode(config.pagerduty_auth_mode);

        Ok(Self::with_client(config, Arc::new(client)))
    }

    pub fn with_client(config: Config, client: Arc<dyn PagerdutyApi>) -> Self {
        Self {
            registry: MetricsRegistry::new(config.metrics_prefix.clone()),
            config,
            client,
        }
    }

    pub fn registry(&self) -> &MetricsRegistry {
        &self.registry
    }

    /// Run until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<()> {
        let cancel = CancellationToken::new();
        tokio::spawn(cancel_on_signal(cancel.clone()));
        self.run_until(cancel).await
    }

    /// Run until `cancel` fires or a task fails. A failing task cancels the rest.
    pub async fn run_until(self, cancel: CancellationToken) -> Result<()> {
        self.registry.register_process_collector()?;
        let schedulers = self.schedulers()?;
        let grace = self.config.shutdown_timeout;
        let mut tasks = JoinSet::new();

        let metrics_listener = bind(self.config.metrics_srv_port).await?;
        tasks.spawn(serve(
            "metrics",
            metrics_listener,
            create_metrics_router(self.registry.clone()),
            cancel.clone(),
            grace,
        ));

        if self.config.webhook_enabled() {
            let listener = IncidentMetricsListener::register(&self.registry, self.config.dt_format.clone())?;
            let http_metrics = HttpMetrics::register(&self.registry)?;
            let verifier = self.config.webhook_secret().and_then(SignatureVerifier::new);
            if verifier.is_none() {
                warn!("no webhook signature secret configured, accepting unsigned webhooks");
            }

            let router = create_webhook_router(
                &self.config.incident_webhook_path,
                WebhookState::new(verifier, Arc::new(listener)),
                &http_metrics,
            );
            let webhook_listener = bind(self.config.webhook_srv_port).await?;
            tasks.spawn(serve("webhook", webhook_listener, router, cancel.clone(), grace));
        } else {
            info!("webhook server disabled");
        }

        for scheduler in schedulers {
            tasks.spawn(scheduler.run(cancel.clone()));
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) => Err(eyre!(e).wrap_err("exporter task panicked")),
            };

            if let Err(e) = result {
                if first_error.is_none() {
                    error!(error = ?e, "exporter task failed, shutting down");
                    cancel.cancel();
                    first_error = Some(e);
                } else {
                    error!(error = ?e, "exporter task failed during shutdown");
                }
            }
        }

        info!("exporter stopped");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// One scheduler per analytics report period plus one for users.
    fn schedulers(&self) -> Result<Vec<PeriodicScheduler>> {
        let process_metrics = CollectProcessMetrics::register(&self.registry)?;
        let metric_names = self.config.service_metric_names()?;
        let analytics_metrics = ServiceAnalyticMetrics::register(&self.registry, &metric_names)?;

        let mut schedulers = Vec::with_capacity(self.config.analytics_report_periods.len() + 1);
        for &period in &self.config.analytics_report_periods {
            let collector = ServiceAnalyticsCollector::new(self.client.clone(), analytics_metrics.clone(), period);
            let name = format!("service_analytics_{}", collector.period_label());
            info!(
                collector = %name,
                interval = %humantime::format_duration(self.config.analytics_scrape_interval),
                "scheduling service analytics"
            );
            schedulers.push(PeriodicScheduler::new(
                self.config.analytics_scrape_interval,
                vec![Arc::new(InstrumentedCollector::new(&process_metrics, name, collector))],
            ));
        }

        let users = UsersCollector::new(self.client.clone(), &self.registry)?.with_prune_stale(self.config.users_prune_stale);
        info!(
            interval = %humantime::format_duration(self.config.users_scrape_interval),
            prune_stale = self.config.users_prune_stale,
            "scheduling users"
        );
        schedulers.push(PeriodicScheduler::new(
            self.config.users_scrape_interval,
            vec![Arc::new(InstrumentedCollector::new(&process_metrics, "users", users))],
        ));

        Ok(schedulers)
    }
}

async fn bind(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("binding {addr}"))
}

async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "listening for ctrl-c failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "listening for SIGTERM failed");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("interrupt received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
        _ = cancel.cancelled() => return,
    }
    cancel.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagerduty_client::{
        ApiFuture,
        ListUsersOptions,
        ListUsersResponse,
        Report,
        ReportItem,
        ServiceMetricReportParams,
        User,
    };
    use pagerduty_exporter_config::Args;
    use std::time::Duration;

    struct FakePagerduty;

    impl PagerdutyApi for FakePagerduty {
        fn query_metric_report(&self, _params: ServiceMetricReportParams) -> ApiFuture<'_, Report> {
            Box::pin(async {
                Ok(Report {
                    data: vec![ReportItem {
                        service_id: "PSVC01".to_string(),
                        service_name: "api".to_string(),
                        total_incident_count: Some(3.0),
                        ..Default::default()
                    }],
                })
            })
        }

        fn list_users(&self, options: ListUsersOptions) -> ApiFuture<'_, ListUsersResponse> {
            Box::pin(async move {
                Ok(ListUsersResponse {
                    users: vec![User {
                        id: "PUSER01".to_string(),
                        name: "Ada".to_string(),
                        ..Default::default()
                    }],
                    limit: options.limit,
                    offset: options.offset,
                    more: false,
                    total: None,
                })
            })
        }
    }

    fn config() -> Config {
        let config = Config::new(Args {
            metrics_srv_port: Some(0),
            webhook_srv_port: Some(0),
            pagerduty_auth_token: Some("token".to_string()),
            analytics_report_periods: vec![Duration::from_secs(7 * 86_400), Duration::from_secs(90 * 86_400)],
            shutdown_timeout: Some(Duration::from_secs(1)),
            ..Default::default()
        })
        .unwrap();
        config.validate().unwrap();
        config
    }

    #[tokio::test]
    async fn cold_start_collects_every_scheduler_and_stops_on_cancel() {
        let app = App::with_client(config(), Arc::new(FakePagerduty));
        let registry = app.registry().clone();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(app.run_until(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(300)).await;
        cancel.cancel();
        handle.await.unwrap().unwrap();

        let text = registry.encode_text().unwrap();
        for collector in ["service_analytics_7days", "service_analytics_90days", "users"] {
            assert!(
                text.contains(&format!(
                    "pagerduty_metrics_collector_collections_count{{collector_name=\"{collector}\"}} 1"
                )),
                "{text}"
            );
        }
        assert!(text.contains(r#"report_interval="7days""#));
        assert!(text.contains(r#"report_interval="90days""#));
        assert!(text.contains(r#"id="PUSER01""#));
        #[cfg(target_os = "linux")]
        assert!(text.contains("process_start_time_seconds"));
    }

    #[tokio::test]
    async fn unknown_metric_name_builds_no_schedulers() {
        let mut config = config();
        config.analytics_service_metric_names = vec!["mean_time_to_coffee".to_string()];

        let app = App::with_client(config, Arc::new(FakePagerduty));
        let registry = app.registry().clone();
        let err = app.run_until(CancellationToken::new()).await.unwrap_err();

        assert!(err.to_string().contains("metric mean_time_to_coffee not found"), "{err}");
        assert!(!registry.encode_text().unwrap().contains("pagerduty_service_"));
    }
}
