use chrono::{
    DateTime,
    Utc,
};
use derive_more::Deref;
use serde::{
    Deserialize,
    Serialize,
    Serializer,
};
use strum::{
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
};

pub const UTC_TIME_ZONE: &str = "Etc/UTC";

/// The analytics metrics PagerDuty reports per service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReportMetricName {
    MeanAssignmentCount,
    MeanEngagedSeconds,
    MeanEngagedUserCount,
    MeanSecondsToEngage,
    MeanSecondsToFirstAck,
    MeanSecondsToResolve,
    MeanSecondsToMobilize,
    TotalBusinessHourInterruptions,
    TotalEngagedSeconds,
    TotalEscalationCount,
    TotalIncidentCount,
    TotalOffHourInterruptions,
    TotalSleepHourInterruptions,
    TotalSnoozedSeconds,
    UpTimePct,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("metric {0} not found")]
pub struct UnknownReportMetric(pub String);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("metric {metric} missing from report row of service {service_id}")]
pub struct MissingMetric {
    pub metric: ReportMetricName,
    pub service_id: String,
}

impl ReportMetricName {
    /// Metrics exported when none are configured explicitly.
    pub const DEFAULTS: [ReportMetricName; 5] = [
        ReportMetricName::TotalEscalationCount,
        ReportMetricName::TotalIncidentCount,
        ReportMetricName::MeanSecondsToResolve,
        ReportMetricName::MeanSecondsToFirstAck,
        ReportMetricName::UpTimePct,
    ];

    /// Resolve a configured metric name, rejecting anything outside the closed set.
    pub fn resolve(name: &str) -> Result<Self, UnknownReportMetric> {
        name.parse().map_err(|_| UnknownReportMetric(name.to_string()))
    }

    /// Resolve a list of configured names. Fails on the first unknown one.
    pub fn resolve_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<Self>, UnknownReportMetric> {
        names.iter().map(|name| Self::resolve(name.as_ref())).collect()
    }
}

/// Timestamp in the truncated-millisecond form the analytics API expects,
/// e.g. `2024-03-01T10:15:00.25`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deref)]
pub struct ReportTime(pub DateTime<Utc>);

impl ReportTime {
    pub fn format(&self) -> String {
        let formatted = self.0.format("%Y-%m-%dT%H:%M:%S%.3f").to_string();
        formatted.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

impl Serialize for ReportTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.format())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceMetricReportFilters {
    pub created_at_start: ReportTime,
    pub created_at_end: ReportTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceMetricReportParams {
    pub time_zone: String,
    pub filters: ServiceMetricReportFilters,
}

impl ServiceMetricReportParams {
    /// Report over the half-open window `[start, end)` in UTC.
    pub fn utc_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            time_zone: UTC_TIME_ZONE.to_string(),
            filters: ServiceMetricReportFilters {
                created_at_start: ReportTime(start),
                created_at_end: ReportTime(end),
            },
        }
    }
}

/// One row of the service analytics report.
///
/// Metric fields are optional: a row the API returns without a field must be
/// distinguishable from a zero value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReportItem {
    #[serde(default, deserialize_with = "crate::serde_ext::null_as_default")]
    pub service_id: String,
    #[serde(default, deserialize_with = "crate::serde_ext::null_as_default")]
    pub service_name: String,
    #[serde(default, deserialize_with = "crate::serde_ext::null_as_default")]
    pub range_start: String,
    pub mean_assignment_count: Option<f64>,
    pub mean_engaged_seconds: Option<f64>,
    pub mean_engaged_user_count: Option<f64>,
    pub mean_seconds_to_engage: Option<f64>,
    pub mean_seconds_to_first_ack: Option<f64>,
    pub mean_seconds_to_mobilize: Option<f64>,
    pub mean_seconds_to_resolve: Option<f64>,
    pub total_business_hour_interruptions: Option<f64>,
    pub total_engaged_seconds: Option<f64>,
    pub total_escalation_count: Option<f64>,
    pub total_incident_count: Option<f64>,
    pub total_off_hour_interruptions: Option<f64>,
    pub total_sleep_hour_interruptions: Option<f64>,
    pub total_snoozed_seconds: Option<f64>,
    pub up_time_pct: Option<f64>,
}

impl ReportItem {
    pub fn metric_by_name(&self, metric: ReportMetricName) -> Result<f64, MissingMetric> {
        let value = match metric {
            ReportMetricName::MeanAssignmentCount => self.mean_assignment_count,
            ReportMetricName::MeanEngagedSeconds => self.mean_engaged_seconds,
            ReportMetricName::MeanEngagedUserCount => self.mean_engaged_user_count,
            ReportMetricName::MeanSecondsToEngage => self.mean_seconds_to_engage,
            ReportMetricName::MeanSecondsToFirstAck => self.mean_seconds_to_first_ack,
            ReportMetricName::MeanSecondsToResolve => self.mean_seconds_to_resolve,
            ReportMetricName::MeanSecondsToMobilize => self.mean_seconds_to_mobilize,
            ReportMetricName::TotalBusinessHourInterruptions => self.total_business_hour_interruptions,
            ReportMetricName::TotalEngagedSeconds => self.total_engaged_seconds,
            ReportMetricName::TotalEscalationCount => self.total_escalation_count,
            ReportMetricName::TotalIncidentCount => self.total_incident_count,
            ReportMetricName::TotalOffHourInterruptions => self.total_off_hour_interruptions,
            ReportMetricName::TotalSleepHourInterruptions => self.total_sleep_hour_interruptions,
            ReportMetricName::TotalSnoozedSeconds => self.total_snoozed_seconds,
            ReportMetricName::UpTimePct => self.up_time_pct,
        };

        value.ok_or_else(|| MissingMetric {
            metric,
            service_id: self.service_id.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Report {
    #[serde(default, deserialize_with = "crate::serde_ext::null_as_default")]
    pub data: Vec<ReportItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator as _;

    #[test]
    fn metric_names_round_trip_through_their_wire_names() {
        for metric in ReportMetricName::iter() {
            assert_eq!(ReportMetricName::resolve(metric.as_ref()), Ok(metric));
        }
        assert_eq!(ReportMetricName::TotalIncidentCount.to_string(), "total_incident_count");
        assert_eq!(ReportMetricName::UpTimePct.to_string(), "up_time_pct");
    }

    #[test]
    fn unknown_metric_name_is_rejected() {
        let err = ReportMetricName::resolve_all(&["total_incident_count", "mean_time_to_coffee"]).unwrap_err();
        assert_eq!(err, UnknownReportMetric("mean_time_to_coffee".to_string()));
        assert_eq!(err.to_string(), "metric mean_time_to_coffee not found");
    }

    #[test]
    fn report_time_trims_trailing_fraction_zeros() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap();
        assert_eq!(ReportTime(t).format(), "2024-03-01T10:15:00");

        let t = t + chrono::Duration::milliseconds(250);
        assert_eq!(ReportTime(t).format(), "2024-03-01T10:15:00.25");

        let t = t + chrono::Duration::microseconds(1_999);
        assert_eq!(ReportTime(t).format(), "2024-03-01T10:15:00.251");
    }

    #[test]
    fn report_params_serialize_to_the_expected_body() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let body = serde_json::to_value(ServiceMetricReportParams::utc_window(start, end)).unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "time_zone": "Etc/UTC",
                "filters": {
                    "created_at_start": "2024-01-01T00:00:00",
                    "created_at_end": "2024-01-02T00:00:00",
                }
            })
        );
    }

    #[test]
    fn missing_field_is_an_explicit_lookup_failure() {
        let item: ReportItem = serde_json::from_str(
            r#"{"service_id":"PSVC1","service_name":"api","total_incident_count":4,"up_time_pct":null}"#,
        )
        .unwrap();

        assert_eq!(item.metric_by_name(ReportMetricName::TotalIncidentCount), Ok(4.0));
        assert_eq!(
            item.metric_by_name(ReportMetricName::UpTimePct),
            Err(MissingMetric {
                metric: ReportMetricName::UpTimePct,
                service_id: "PSVC1".to_string(),
            })
        );
    }
}
