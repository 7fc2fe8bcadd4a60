//! Typed links between entities and events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::Properties;
use crate::temporal::{Interval, storage_precision};
use crate::types::{EntityId, EventId, ParticipationId, ValidationError, validate_type_name};

/// Participation type for the person holding an employment.
pub const EMPLOYEE: &str = "employee";
/// Participation type for the person working a shift, punch or sub-period.
pub const WORKER: &str = "worker";

/// A relationship between one entity and one event.
///
/// `(participant_id, event_id, participation_type)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participation {
    pub id: ParticipationId,
    pub participant_id: EntityId,
    pub event_id: EventId,
    pub participation_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub properties: Properties,
    pub created_at: DateTime<Utc>,
}

/// Attributes for a new participation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipationAttrs {
    pub participation_type: String,
    pub role: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub properties: Properties,
}

impl ParticipationAttrs {
    pub fn new(participation_type: impl Into<String>) -> Self {
        Self {
            participation_type: participation_type.into(),
            role: None,
            start_time: None,
            end_time: None,
            properties: Properties::new(),
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: Option<String>) -> Self {
        self.role = role.filter(|r| !r.trim().is_empty());
        self
    }

    #[must_use]
    pub const fn bounded(
        mut self,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    /// Checks the type format and, when both bounds are given, their ordering
    /// at storage precision.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_type_name("participation_type", &self.participation_type)?;
        let bounds = (
            self.start_time.map(storage_precision),
            self.end_time.map(storage_precision),
        );
        if let (Some(start), Some(end)) = bounds {
            if end <= start {
                return Err(ValidationError::EndNotAfterStart {
                    start: start.to_rfc3339(),
                    end: end.to_rfc3339(),
                });
            }
        }
        Ok(())
    }

    /// The sub-interval this participation covers, resolved against its event.
    ///
    /// A missing start inherits the event start; a missing end inherits the event end.
    pub fn sub_interval(&self, event: Interval) -> Interval {
        Interval::new(
            self.start_time.map_or(event.start, storage_precision),
            self.end_time.map(storage_precision).or(event.end),
        )
    }
}
