//! Metric names and label helpers shared by the collectors.

use pagerduty_client::ReportMetricName;
use std::time::Duration;

pub const COLLECTOR_LATENCY: &str = "pagerduty_metrics_collector_latency";
pub const COLLECTOR_COLLECTIONS_COUNT: &str = "pagerduty_metrics_collector_collections_count";
pub const COLLECTOR_ERRORS_COUNT: &str = "pagerduty_metrics_collector_errors_count";
pub const COLLECTOR_NAME_LABEL: &str = "collector_name";

pub const USER: &str = "pagerduty_user";
pub const USER_LABELS: [&str; 7] = ["id", "name", "mail", "avatar", "color", "job_title", "role"];

pub const SERVICE_PREFIX: &str = "pagerduty_service_";
pub const SERVICE_LABELS: [&str; 3] = ["service_id", "service_name", "report_interval"];

pub const INCIDENT_EVENT: &str = "pagerduty_incident_event";
pub const INCIDENT_EVENT_LABELS: [&str; 11] = [
    "incident_id",
    "type",
    "status",
    "event_type",
    "title",
    "service_id",
    "service_summary",
    "escalation_policy_id",
    "urgency",
    "priority_id",
    "dt",
];

pub const INCIDENT_EVENT_ASSIGNEES: &str = "pagerduty_incident_event_assignees";
pub const INCIDENT_EVENT_ASSIGNEES_LABELS: [&str; 5] =
    ["incident_id", "event_type", "assignee_id", "assignee_summary", "dt"];

pub const INCIDENT_EVENT_TEAMS: &str = "pagerduty_incident_event_teams";
pub const INCIDENT_EVENT_TEAMS_LABELS: [&str; 5] = ["incident_id", "event_type", "team_id", "team_summary", "dt"];

/// Replace the characters Prometheus rejects in metric names.
pub fn sanitize_metric_name(name: &str) -> String {
    name.replace([':', '.'], "_")
}

/// `total_incident_count` becomes `pagerduty_service_total_incident_count`.
pub fn service_metric_name(metric: ReportMetricName) -> String {
    sanitize_metric_name(&format!("{SERVICE_PREFIX}{}", metric.as_ref()))
}

const SECS_PER_DAY: u64 = 86_400;

/// Value of the `report_interval` label. Whole days render as `90days`,
/// anything else as `36h0m0s` style hours, minutes and seconds.
pub fn report_interval_label(period: Duration) -> String {
    let secs = period.as_secs();
    let nanos = period.subsec_nanos();
    if secs > 0 && nanos == 0 && secs % SECS_PER_DAY == 0 {
        return format!("{}days", secs / SECS_PER_DAY);
    }

    let (hours, minutes) = (secs / 3_600, secs % 3_600 / 60);
    let seconds = (secs % 60) as f64 + f64::from(nanos) / 1e9;
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
