//! PagerDuty v3 webhook payloads.
//!
//! `event.data` changes shape with `event.resource_type`, so it is kept as raw
//! JSON and only decoded into a concrete type once the caller knows which
//! family the event belongs to.

use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    convert::Infallible,
    fmt,
    str::FromStr,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WebhookEventType {
    IncidentAcknowledged,
    IncidentAnnotated,
    IncidentDelegated,
    IncidentEscalated,
    IncidentPriorityUpdated,
    IncidentReassigned,
    IncidentReopened,
    IncidentResolved,
    IncidentResponderAdded,
    IncidentResponderReplied,
    IncidentTriggered,
    IncidentUnacknowledged,
    /// Anything PagerDuty sends that we have no name for.
    Other(String),
}

impl WebhookEventType {
    pub fn as_str(&self) -> &str {
        match self {
            WebhookEventType::IncidentAcknowledged => "incident.acknowledged",
            WebhookEventType::IncidentAnnotated => "incident.annotated",
            WebhookEventType::IncidentDelegated => "incident.delegated",
            WebhookEventType::IncidentEscalated => "incident.escalated",
            WebhookEventType::IncidentPriorityUpdated => "incident.priority_updated",
            WebhookEventType::IncidentReassigned => "incident.reassigned",
            WebhookEventType::IncidentReopened => "incident.reopened",
            WebhookEventType::IncidentResolved => "incident.resolved",
            WebhookEventType::IncidentResponderAdded => "incident.responder.added",
            WebhookEventType::IncidentResponderReplied => "incident.responder.replied",
            WebhookEventType::IncidentTriggered => "incident.triggered",
            WebhookEventType::IncidentUnacknowledged => "incident.unacknowledged",
            WebhookEventType::Other(other) => other,
        }
    }

    /// Lifecycle transitions whose `data` is a full incident.
    pub fn is_incident_lifecycle(&self) -> bool {
        matches!(
            self,
            WebhookEventType::IncidentTriggered
                | WebhookEventType::IncidentAcknowledged
                | WebhookEventType::IncidentUnacknowledged
                | WebhookEventType::IncidentReassigned
                | WebhookEventType::IncidentPriorityUpdated
                | WebhookEventType::IncidentDelegated
                | WebhookEventType::IncidentEscalated
                | WebhookEventType::IncidentReopened
                | WebhookEventType::IncidentResolved
        )
    }
}

impl FromStr for WebhookEventType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "incident.acknowledged" => WebhookEventType::IncidentAcknowledged,
            "incident.annotated" => WebhookEventType::IncidentAnnotated,
            "incident.delegated" => WebhookEventType::IncidentDelegated,
            "incident.escalated" => WebhookEventType::IncidentEscalated,
            "incident.priority_updated" => WebhookEventType::IncidentPriorityUpdated,
            "incident.reassigned" => WebhookEventType::IncidentReassigned,
            "incident.reopened" => WebhookEventType::IncidentReopened,
            "incident.resolved" => WebhookEventType::IncidentResolved,
            "incident.responder.added" => WebhookEventType::IncidentResponderAdded,
            "incident.responder.replied" => WebhookEventType::IncidentResponderReplied,
            "incident.triggered" => WebhookEventType::IncidentTriggered,
            "incident.unacknowledged" => WebhookEventType::IncidentUnacknowledged,
            other => WebhookEventType::Other(other.to_string()),
        })
    }
}

impl Default for WebhookEventType {
    fn default() -> Self {
        WebhookEventType::Other(String::new())
    }
}

impl From<String> for WebhookEventType {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(event_type) => event_type,
            Err(never) => match never {},
        }
    }
}

impl From<WebhookEventType> for String {
    fn from(value: WebhookEventType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference object (`{id, type, summary, self, html_url}`) used all over the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiObject {
    #[serde(deserialize_with = "crate::serde_ext::null_as_default")]
    pub id: String,
    #[serde(rename = "type", deserialize_with = "crate::serde_ext::null_as_default")]
    pub kind: String,
    #[serde(deserialize_with = "crate::serde_ext::null_as_default")]
    pub summary: String,
    #[serde(rename = "self", deserialize_with = "crate::serde_ext::null_as_default")]
    pub self_url: String,
    #[serde(deserialize_with = "crate::serde_ext::null_as_default")]
    pub html_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WebhookClient {
    #[serde(deserialize_with = "crate::serde_ext::null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebhookEnvelope {
    pub event: WebhookEvent,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebhookEvent {
    #[serde(default, deserialize_with = "crate::serde_ext::null_as_default")]
    pub id: String,
    #[serde(default)]
    pub event_type: WebhookEventType,
    #[serde(default, deserialize_with = "crate::serde_ext::null_as_default")]
    pub resource_type: String,
    #[serde(default)]
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub agent: Option<ApiObject>,
    #[serde(default)]
    pub client: Option<WebhookClient>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl WebhookEvent {
    /// Decode `data` as an incident. Only meaningful for incident lifecycle events.
    pub fn incident(&self) -> Result<Incident, serde_json::Error> {
        Incident::deserialize(&self.data)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Incident {
    #[serde(deserialize_with = "crate::serde_ext::null_as_default")]
    pub id: String,
    #[serde(rename = "type", deserialize_with = "crate::serde_ext::null_as_default")]
    pub kind: String,
    #[serde(deserialize_with = "crate::serde_ext::null_as_default")]
    pub number: u64,
    #[serde(deserialize_with = "crate::serde_ext::null_as_default")]
    pub title: String,
    #[serde(rename = "self", deserialize_with = "crate::serde_ext::null_as_default")]
    pub self_url: String,
    #[serde(deserialize_with = "crate::serde_ext::null_as_default")]
    pub html_url: String,
    #[serde(deserialize_with = "crate::serde_ext::null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "crate::serde_ext::null_as_default")]
    pub urgency: String,
    #[serde(deserialize_with = "crate::serde_ext::null_as_default")]
    pub service: ApiObject,
    #[serde(deserialize_with = "crate::serde_ext::null_as_default")]
    pub escalation_policy: ApiObject,
    #[serde(deserialize_with = "crate::serde_ext::null_as_default")]
    pub priority: ApiObject,
    #[serde(deserialize_with = "crate::serde_ext::null_as_default")]
    pub assignees: Vec<ApiObject>,
    #[serde(deserialize_with = "crate::serde_ext::null_as_default")]
    pub teams: Vec<ApiObject>,
}
