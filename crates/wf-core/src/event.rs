//! Time-bounded occurrences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::temporal::Interval;
use crate::types::{EventId, EventStatus, EventTypeId};

/// Open, string-keyed property bag stored as JSON.
pub type Properties = serde_json::Map<String, Value>;

/// A time-bounded occurrence of a registered event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type_id: EventTypeId,
    /// Enclosing event, if this one is nested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EventId>,
    pub start_time: DateTime<Utc>,
    /// `None` means the event is open-ended (still ongoing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub status: EventStatus,
    #[serde(default)]
    pub properties: Properties,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub const fn interval(&self) -> Interval {
        Interval::new(self.start_time, self.end_time)
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    pub fn property_bool(&self, key: &str) -> Option<bool> {
        self.properties.get(key).and_then(Value::as_bool)
    }
}
