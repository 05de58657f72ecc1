use clap::Parser;
use pagerduty_client::AuthMode;
use std::{
    path::PathBuf,
    time::Duration,
};

/// PagerDuty Prometheus exporter
///
/// Every option can also be set in the YAML config file under its snake_case
/// name. Command line and environment take precedence over the file.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version = version(), about, long_about = None)]
pub struct Args {
    /// YAML config file. Defaults to `config.yaml` in the config directory.
    #[clap(long, env = "PAGERDUTY_EXPORTER_CONFIG_FILE", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Port of the `/metrics` endpoint.
    #[clap(long, env = "METRICS_SRV_PORT", value_name = "PORT")]
    pub metrics_srv_port: Option<u16>,

    /// Port of the webhook server. 0 disables it.
    #[clap(long, env = "WEBHOOK_SRV_PORT", value_name = "PORT")]
    pub webhook_srv_port: Option<u16>,

    /// Path PagerDuty posts incident webhooks to.
    #[clap(long, env = "INCIDENT_WEBHOOK_PATH", value_name = "PATH")]
    pub incident_webhook_path: Option<String>,

    /// Secret of the webhook subscription. Unsigned requests are accepted when unset.
    #[clap(long, env = "INCIDENT_WEBHOOK_SIGNATURE_SECRET", value_name = "SECRET", hide_env_values = true)]
    pub incident_webhook_signature_secret: Option<String>,

    /// Prepended verbatim to every metric name.
    #[clap(long, env = "METRICS_PREFIX", value_name = "PREFIX")]
    pub metrics_prefix: Option<String>,

    /// How often the service analytics report is queried.
    #[clap(long, env = "ANALYTICS_SCRAPE_INTERVAL", value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub analytics_scrape_interval: Option<Duration>,

    /// Comma separated report window lengths, one scheduler each.
    #[clap(
        long,
        env = "ANALYTICS_REPORT_PERIODS",
        value_name = "DURATIONS",
        value_delimiter = ',',
        value_parser = humantime::parse_duration
    )]
    pub analytics_report_periods: Vec<Duration>,

    /// Comma separated analytics metrics to export.
    #[clap(long, env = "ANALYTICS_SERVICE_METRIC_NAMES", value_name = "NAMES", value_delimiter = ',')]
    pub analytics_service_metric_names: Vec<String>,

    /// How often users are listed.
    #[clap(long, env = "USERS_SCRAPE_INTERVAL", value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub users_scrape_interval: Option<Duration>,

    /// Drop series of users that are no longer listed.
    #[clap(long, env = "USERS_PRUNE_STALE", num_args = 0..=1, default_missing_value = "true")]
    pub users_prune_stale: Option<bool>,

    /// chrono strftime format of the `dt` label on incident series.
    #[clap(long, env = "DT_FORMAT", value_name = "FORMAT")]
    pub dt_format: Option<String>,

    /// PagerDuty API token.
    #[clap(long, env = "PAGERDUTY_AUTH_TOKEN", value_name = "TOKEN", hide_env_values = true)]
    pub pagerduty_auth_token: Option<String>,

    /// `token` for API keys, `oauth` for OAuth access tokens.
    #[clap(long, env = "PAGERDUTY_AUTH_MODE", value_name = "MODE")]
    pub pagerduty_auth_mode: Option<AuthMode>,

    /// Base URL of the PagerDuty REST API.
    #[clap(long, env = "PAGERDUTY_API_URL", value_name = "URL")]
    pub pagerduty_api_url: Option<String>,

    /// How long servers get to drain on shutdown.
    #[clap(long, env = "SHUTDOWN_TIMEOUT", value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub shutdown_timeout: Option<Duration>,

    /// Enables debug logging in a human readable format.
    #[clap(long = "debug", env = "DEBUG", action, value_parser = clap::builder::BoolishValueParser::new())]
    pub debug: bool,
}

mod config_ext {
    use super::*;
    use crate::duration;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(port) = self.metrics_srv_port {
                cache.insert("metrics_srv_port".to_string(), u64::from(port).into());
            }
            if let Some(port) = self.webhook_srv_port {
                cache.insert("webhook_srv_port".to_string(), u64::from(port).into());
            }
            if let Some(path) = &self.incident_webhook_path {
                cache.insert("incident_webhook_path".to_string(), path.clone().into());
            }
            if let Some(secret) = &self.incident_webhook_signature_secret {
                cache.insert("incident_webhook_signature_secret".to_string(), secret.clone().into());
            }
            if let Some(prefix) = &self.metrics_prefix {
                cache.insert("metrics_prefix".to_string(), prefix.clone().into());
            }
            if let Some(interval) = self.analytics_scrape_interval {
                cache.insert("analytics_scrape_interval".to_string(), duration::format(interval).into());
            }
            if !self.analytics_report_periods.is_empty() {
                cache.insert(
                    "analytics_report_periods".to_string(),
                    self.analytics_report_periods
                        .iter()
                        .map(|period| duration::format(*period))
                        .collect::<Vec<_>>()
                        .into(),
                );
            }
            if !self.analytics_service_metric_names.is_empty() {
                cache.insert(
                    "analytics_service_metric_names".to_string(),
                    self.analytics_service_metric_names.clone().into(),
                );
            }
            if let Some(interval) = self.users_scrape_interval {
                cache.insert("users_scrape_interval".to_string(), duration::format(interval).into());
            }
            if let Some(prune) = self.users_prune_stale {
                cache.insert("users_prune_stale".to_string(), prune.into());
            }
            if let Some(format) = &self.dt_format {
                cache.insert("dt_format".to_string(), format.clone().into());
            }
            if let Some(token) = &self.pagerduty_auth_token {
                cache.insert("pagerduty_auth_token".to_string(), token.clone().into());
            }
            if let Some(mode) = self.pagerduty_auth_mode {
                cache.insert("pagerduty_auth_mode".to_string(), mode.to_string().into());
            }
            if let Some(url) = &self.pagerduty_api_url {
                cache.insert("pagerduty_api_url".to_string(), url.clone().into());
            }
            if let Some(timeout) = self.shutdown_timeout {
                cache.insert("shutdown_timeout".to_string(), duration::format(timeout).into());
            }
            if self.debug {
                cache.insert("debug".to_string(), true.into());
            }
            Ok(cache)
        }
    }
}

pub fn version() -> String {
    let author = clap::crate_authors!();
    let config_dir_path = crate::get_config_dir().display().to_string();

    format!(
        "\
Authors: {author}

Config directory: {config_dir_path}"
    )
}
