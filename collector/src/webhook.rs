//! Incident webhook fan-out.
//!
//! Projects one incident lifecycle event into three correlated presence
//! series that share `(incident_id, event_type, dt)`:
//!
//! - `pagerduty_incident_event`: one series for the incident itself
//! - `pagerduty_incident_event_assignees`: one series per assignee
//! - `pagerduty_incident_event_teams`: one series per team

use crate::{
    names,
    registry::{
        MetricsRegistry,
        RegistryError,
    },
};
use chrono::format::{
    Item,
    StrftimeItems,
};
use pagerduty_client::WebhookEvent;
use prometheus::GaugeVec;
use std::fmt::Write as _;

pub const DEFAULT_DT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

#[derive(thiserror::Error, Debug)]
pub enum ListenerError {
    #[error("event {event_id} data is not an incident: {source}")]
    IncidentData {
        event_id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("formatting occurred_at with {format:?} failed")]
    DateFormat { format: String },
}

/// What a single event turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOut {
    /// Not an incident lifecycle event. Accepted, nothing recorded.
    Ignored,
    Recorded { assignees: usize, teams: usize },
}

/// Whether `format` is a usable chrono strftime string.
pub fn is_valid_dt_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

pub struct IncidentMetricsListener {
    dt_format: String,
    incidents: GaugeVec,
    assignees: GaugeVec,
    teams: GaugeVec,
}

impl IncidentMetricsListener {
    pub fn register(registry: &MetricsRegistry, dt_format: impl Into<String>) -> Result<Self, RegistryError> {
        Ok(Self {
            dt_format: dt_format.into(),
            incidents: registry.gauge_vec(
                names::INCIDENT_EVENT,
                "PagerDuty incident lifecycle event",
                &names::INCIDENT_EVENT_LABELS,
            )?,
            assignees: registry.gauge_vec(
                names::INCIDENT_EVENT_ASSIGNEES,
                "Assignee of a PagerDuty incident at a lifecycle event",
                &names::INCIDENT_EVENT_ASSIGNEES_LABELS,
            )?,
            teams: registry.gauge_vec(
                names::INCIDENT_EVENT_TEAMS,
                "Team of a PagerDuty incident at a lifecycle event",
                &names::INCIDENT_EVENT_TEAMS_LABELS,
            )?,
        })
    }

    fn format_dt(&self, event: &WebhookEvent) -> Result<String, ListenerError> {
        let mut dt = String::new();
        write!(dt, "{}", event.occurred_at.format(&self.dt_format)).map_err(|_| ListenerError::DateFormat {
            format: self.dt_format.clone(),
        })?;
        Ok(dt)
    }

    pub fn handle_event(&self, event: &WebhookEvent) -> Result<FanOut, ListenerError> {
        if !event.event_type.is_incident_lifecycle() {
            debug!(event_id = %event.id, event_type = %event.event_type, "ignoring webhook event");
            return Ok(FanOut::Ignored);
        }

        let incident = event.incident().map_err(|source| ListenerError::IncidentData {
            event_id: event.id.clone(),
            source,
        })?;
        let dt = self.format_dt(event)?;
        let event_type = event.event_type.as_str();

        self.incidents
            .with_label_values(&[
                incident.id.as_str(),
                incident.kind.as_str(),
                incident.status.as_str(),
                event_type,
                incident.title.as_str(),
                incident.service.id.as_str(),
                incident.service.summary.as_str(),
                incident.escalation_policy.id.as_str(),
                incident.urgency.as_str(),
                incident.priority.id.as_str(),
                dt.as_str(),
            ])
            .set(1.0);

        for assignee in &incident.assignees {
            self.assignees
                .with_label_values(&[
                    incident.id.as_str(),
                    event_type,
                    assignee.id.as_str(),
                    assignee.summary.as_str(),
                    dt.as_str(),
                ])
                .set(1.0);
        }

        for team in &incident.teams {
            self.teams
                .with_label_values(&[
                    incident.id.as_str(),
                    event_type,
                    team.id.as_str(),
                    team.summary.as_str(),
                    dt.as_str(),
                ])
                .set(1.0);
        }

        info!(
            incident_id = %incident.id,
            event_type,
            assignees = incident.assignees.len(),
            teams = incident.teams.len(),
            "incident event recorded"
        );

        Ok(FanOut::Recorded {
            assignees: incident.assignees.len(),
            teams: incident.teams.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagerduty_client::WebhookEnvelope;
    use pretty_assertions::assert_eq;

    fn event(event_type: &str, data: serde_json::Value) -> WebhookEvent {
        let envelope: WebhookEnvelope = serde_json::from_value(serde_json::json!({
            "event": {
                "id": "01EVT",
                "event_type": event_type,
                "resource_type": "incident",
                "occurred_at": "2024-05-01T12:30:45.123Z",
                "data": data,
            }
        }))
        .unwrap();
        envelope.event
    }

    fn resolved_incident() -> serde_json::Value {
        serde_json::json!({
            "id": "PINC001",
            "type": "incident",
            "title": "Disk full",
            "status": "resolved",
            "urgency": "high",
            "service": {"id": "PSVC01", "summary": "api"},
            "escalation_policy": {"id": "PEP01"},
            "priority": {"id": "PPRI01"},
            "assignees": [{"id": "PUSER01", "summary": "Ada"}, {"id": "PUSER02", "summary": "Grace"}],
            "teams": [{"id": "PTEAM01", "summary": "SRE"}]
        })
    }

    fn lines(registry: &MetricsRegistry, metric: &str) -> Vec<String> {
        let prefix = format!("{metric}{{");
        registry
            .encode_text()
            .unwrap()
            .lines()
            .filter(|line| line.starts_with(&prefix))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn resolved_event_fans_out_to_correlated_series() {
        let registry = MetricsRegistry::default();
        let listener = IncidentMetricsListener::register(&registry, DEFAULT_DT_FORMAT).unwrap();

        let outcome = listener
            .handle_event(&event("incident.resolved", resolved_incident()))
            .unwrap();
        assert_eq!(outcome, FanOut::Recorded { assignees: 2, teams: 1 });

        let incidents = lines(&registry, names::INCIDENT_EVENT);
        let assignees = lines(&registry, names::INCIDENT_EVENT_ASSIGNEES);
        let teams = lines(&registry, names::INCIDENT_EVENT_TEAMS);
        assert_eq!(incidents.len(), 1);
        assert_eq!(assignees.len(), 2);
        assert_eq!(teams.len(), 1);

        for line in incidents.iter().chain(&assignees).chain(&teams) {
            assert!(line.contains(r#"incident_id="PINC001""#), "{line}");
            assert!(line.contains(r#"event_type="incident.resolved""#), "{line}");
            assert!(line.contains(r#"dt="2024-05-01T12:30:45+00:00""#), "{line}");
        }
        assert!(incidents[0].contains(r#"priority_id="PPRI01""#));
        assert!(assignees.iter().any(|l| l.contains(r#"assignee_summary="Grace""#)));
        assert!(teams[0].contains(r#"team_summary="SRE""#));
    }

    #[test]
    fn non_lifecycle_events_are_ignored() {
        let registry = MetricsRegistry::default();
        let listener = IncidentMetricsListener::register(&registry, DEFAULT_DT_FORMAT).unwrap();

        let outcome = listener
            .handle_event(&event("incident.annotated", serde_json::json!({"content": "note"})))
            .unwrap();

        assert_eq!(outcome, FanOut::Ignored);
        assert!(lines(&registry, names::INCIDENT_EVENT).is_empty());
    }

    #[test]
    fn malformed_incident_data_is_an_error() {
        let registry = MetricsRegistry::default();
        let listener = IncidentMetricsListener::register(&registry, DEFAULT_DT_FORMAT).unwrap();

        let err = listener
            .handle_event(&event("incident.triggered", serde_json::json!("not an incident")))
            .unwrap_err();

        assert!(matches!(err, ListenerError::IncidentData { .. }));
        assert!(lines(&registry, names::INCIDENT_EVENT).is_empty());
    }

    #[test]
    fn custom_dt_format_is_applied() {
        let registry = MetricsRegistry::default();
        let listener = IncidentMetricsListener::register(&registry, "%Y-%m-%d").unwrap();

        listener
            .handle_event(&event("incident.triggered", resolved_incident()))
            .unwrap();

        assert!(lines(&registry, names::INCIDENT_EVENT)[0].contains(r#"dt="2024-05-01""#));
    }

    #[test]
    fn dt_format_validation() {
        assert!(is_valid_dt_format(DEFAULT_DT_FORMAT));
        assert!(is_valid_dt_format("%s"));
        assert!(!is_valid_dt_format("%Y-%Q"));
    }
}
