//! # Exporter configuration
//!
//! Layered from lowest to highest precedence:
//!
//! 1. built-in defaults (`default-config.yaml`)
//! 2. the YAML config file (`--config`, or `config.yaml` in the config directory)
//! 3. environment variables and command line flags, both parsed by [`Args`]
//!
//! [`Config::validate`] must pass before anything is started.

#[macro_use]
extern crate tracing;

mod app_config;
mod args;
mod duration;
mod secret;

pub use app_config::get_config_dir;
pub use args::Args;
use pagerduty_client::{
    AuthMode,
    ReportMetricName,
    UnknownReportMetric,
};
use pagerduty_exporter_collector::{
    is_valid_dt_format,
    report_window,
};
pub use secret::Secret;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");
const CONFIG_FILE: &str = "config.yaml";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("loading configuration failed: {0}")]
    Load(#[from] config::ConfigError),
    #[error(transparent)]
    UnknownMetric(#[from] UnknownReportMetric),
    #[error("at least one analytics report period is required")]
    NoReportPeriods,
    #[error("at least one analytics service metric name is required")]
    NoMetricNames,
    #[error("analytics report period {0} reaches past the earliest supported date")]
    PeriodOutOfRange(String),
    #[error("{name} must be longer than zero")]
    ZeroDuration { name: &'static str },
    #[error("dt_format {0:?} is not a valid strftime format")]
    InvalidDtFormat(String),
    #[error("pagerduty_auth_token is required")]
    MissingAuthToken,
    #[error("pagerduty_api_url {url:?} is invalid: {source}")]
    InvalidApiUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("incident_webhook_path {0:?} must start with '/'")]
    InvalidWebhookPath(String),
    #[error("metrics and webhook servers cannot share port {0}")]
    PortConflict(u16),
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub metrics_srv_port: u16,
    pub webhook_srv_port: u16,
    pub incident_webhook_path: String,
    #[serde(default)]
    pub incident_webhook_signature_secret: Secret,
    #[serde(default)]
    pub metrics_prefix: String,
    #[serde(deserialize_with = "duration::deserialize")]
    pub analytics_scrape_interval: Duration,
    #[serde(deserialize_with = "duration::deserialize_list")]
    pub analytics_report_periods: Vec<Duration>,
    pub analytics_service_metric_names: Vec<String>,
    #[serde(deserialize_with = "duration::deserialize")]
    pub users_scrape_interval: Duration,
    #[serde(default)]
    pub users_prune_stale: bool,
    pub dt_format: String,
    #[serde(default)]
    pub pagerduty_auth_token: Secret,
    #[serde(default)]
    pub pagerduty_auth_mode: AuthMode,
    pub pagerduty_api_url: String,
    #[serde(deserialize_with = "duration::deserialize")]
    pub shutdown_timeout: Duration,
    #[serde(default)]
    pub debug: bool,
}

impl Config {
    pub fn new(args: Args) -> Result<Self, ConfigError> {
        let config_dir = get_config_dir();
        let mut builder =
            config::Config::builder().add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml));

        let file = match &args.config {
            Some(path) => config::File::from(path.as_path())
                .format(config::FileFormat::Yaml)
                .required(true),
            None => config::File::from(config_dir.join(CONFIG_FILE))
                .format(config::FileFormat::Yaml)
                .required(false),
        };
        builder = builder.add_source(file).add_source(args);

        let cfg: Self = builder.build()?.try_deserialize()?;
        debug!(config = ?cfg, "configuration loaded");

        Ok(cfg)
    }

    /// Reject anything that would otherwise only fail once collection is running.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service_metric_names()?;

        if self.analytics_report_periods.is_empty() {
            return Err(ConfigError::NoReportPeriods);
        }
        if self.analytics_report_periods.iter().any(Duration::is_zero) {
            return Err(ConfigError::ZeroDuration {
                name: "analytics_report_periods",
            });
        }
        let now = chrono::Utc::now();
        if let Some(&period) = self
            .analytics_report_periods
            .iter()
            .find(|&&period| report_window(now, period).is_none())
        {
            return Err(ConfigError::PeriodOutOfRange(
                humantime::format_duration(period).to_string(),
            ));
        }
        for (name, value) in [
            ("analytics_scrape_interval", self.analytics_scrape_interval),
            ("users_scrape_interval", self.users_scrape_interval),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration { name });
            }
        }

        if !is_valid_dt_format(&self.dt_format) {
            return Err(ConfigError::InvalidDtFormat(self.dt_format.clone()));
        }
        if self.pagerduty_auth_token.is_empty() {
            return Err(ConfigError::MissingAuthToken);
        }
        self.api_url()?;

        if self.webhook_enabled() {
            if !self.incident_webhook_path.starts_with('/') {
                return Err(ConfigError::InvalidWebhookPath(self.incident_webhook_path.clone()));
            }
            if self.webhook_srv_port == self.metrics_srv_port {
                return Err(ConfigError::PortConflict(self.metrics_srv_port));
            }
        }

        Ok(())
    }

    pub fn service_metric_names(&self) -> Result<Vec<ReportMetricName>, ConfigError> {
        if self.analytics_service_metric_names.is_empty() {
            return Err(ConfigError::NoMetricNames);
        }
        Ok(ReportMetricName::resolve_all(&self.analytics_service_metric_names)?)
    }

    pub fn api_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.pagerduty_api_url).map_err(|source| ConfigError::InvalidApiUrl {
            url: self.pagerduty_api_url.clone(),
            source,
        })
    }

    pub fn webhook_enabled(&self) -> bool {
        self.webhook_srv_port != 0
    }

    /// `None` when no secret is configured, which disables signature checks.
    pub fn webhook_secret(&self) -> Option<&str> {
        Some(self.incident_webhook_signature_secret.expose()).filter(|secret| !secret.is_empty())
    }
}
