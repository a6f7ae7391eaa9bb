use enact_types::ResourceRef;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Success,
    Failure,
    Noop,
}

/// One observed change (or failed attempt) on a resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Event {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    pub message: String,
    pub status: EventStatus,
}

impl Event {
    pub fn success(property: &str, message: impl Into<String>) -> Self {
        Self {
            property: Some(property.to_string()),
            message: message.into(),
            status: EventStatus::Success,
        }
    }

    pub fn failure(property: &str, message: impl Into<String>) -> Self {
        Self {
            property: Some(property.to_string()),
            message: message.into(),
            status: EventStatus::Failure,
        }
    }

    pub fn noop(message: impl Into<String>) -> Self {
        Self {
            property: None,
            message: message.into(),
            status: EventStatus::Noop,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == EventStatus::Failure
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceStatus {
    pub reference: ResourceRef,
    pub changed: bool,
    pub failed: bool,
    pub skipped: bool,
    pub events: Vec<Event>,
}

impl ResourceStatus {
    pub fn from_events(reference: ResourceRef, events: Vec<Event>) -> Self {
        Self {
            reference,
            changed: events.iter().any(|e| e.status == EventStatus::Success),
            failed: events.iter().any(Event::is_failure),
            skipped: false,
            events,
        }
    }

    pub fn skipped(reference: ResourceRef, reason: impl Into<String>) -> Self {
        Self {
            reference,
            changed: false,
            failed: false,
            skipped: true,
            events: vec![Event::noop(reason)],
        }
    }

    pub fn failure_messages(&self) -> impl Iterator<Item = &str> {
        self.events
            .iter()
            .filter(|e| e.is_failure())
            .map(|e| e.message.as_str())
    }
}

/// Outcome of one transaction: a status per evaluated resource, in evaluation order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TransactionReport {
    pub host: String,
    pub resource_statuses: Vec<ResourceStatus>,
}

impl TransactionReport {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            resource_statuses: Vec::new(),
        }
    }

    pub fn status(&self, reference: &ResourceRef) -> Option<&ResourceStatus> {
        self.resource_statuses
            .iter()
            .find(|s| &s.reference == reference)
    }

    pub fn failed(&self) -> bool {
        self.resource_statuses.iter().any(|s| s.failed)
    }

    /// Every failure event message, across all statuses, in evaluation order.
    pub fn failure_messages(&self) -> Vec<&str> {
        self.resource_statuses
            .iter()
            .flat_map(ResourceStatus::failure_messages)
            .collect()
    }
}
