//! Core type definitions with validation.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Type names for entities, event types and participations: lowercase words joined by `_`.
static TYPE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_]+$").expect("type name pattern is valid"));

/// Validation errors for core types and event attributes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A required attribute was not supplied.
    #[error("{field} is required")]
    MissingField { field: String },

    /// A type name did not match `^[a-z_]+$`.
    #[error("invalid {field}: {value:?} (expected lowercase letters and underscores)")]
    InvalidTypeName { field: &'static str, value: String },

    /// Unknown event status value.
    #[error("invalid status: {value}")]
    InvalidStatus { value: String },

    /// `end_time` was not strictly after `start_time`.
    #[error("end_time ({end}) must be after start_time ({start})")]
    EndNotAfterStart { start: String, end: String },

    /// A field had the wrong shape or value.
    #[error("invalid {field}: {message}")]
    InvalidField { field: String, message: String },

    /// A domain rule rejected the request.
    #[error("{0}")]
    Rule(String),
}

impl ValidationError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Checks a type name (`entity_type`, `participation_type`, event type name).
pub fn validate_type_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if TYPE_NAME_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidTypeName {
            field,
            value: value.to_string(),
        })
    }
}

/// Lifecycle status of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    #[default]
    Active,
    Completed,
    Cancelled,
    Ended,
}

impl EventStatus {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EventStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "ended" => Ok(Self::Ended),
            _ => Err(ValidationError::InvalidStatus {
                value: s.to_string(),
            }),
        }
    }
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// Identifier of a participant record (person, organization, location, resource).
    EntityId, "entity ID"
);

define_string_id!(
    /// Identifier of an event.
    EventId, "event ID"
);

define_string_id!(
    /// Identifier of an event type catalog row.
    EventTypeId, "event type ID"
);

define_string_id!(
    /// Identifier of a participation (entity ↔ event link).
    ParticipationId, "participation ID"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_reject_empty_and_blank() {
        assert!(EventId::new("").is_err());
        assert!(EntityId::new("   ").is_err());
        assert!(ParticipationId::new("p-1").is_ok());
    }

    #[test]
    fn event_id_serde_roundtrip() {
        let id = EventId::new("evt-123").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"evt-123\"");
        let parsed: EventId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn entity_id_serde_rejects_empty() {
        let result: Result<EntityId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn type_names_are_lowercase_words() {
        assert!(validate_type_name("entity_type", "person").is_ok());
        assert!(validate_type_name("entity_type", "cost_center").is_ok());
        assert!(validate_type_name("entity_type", "Person").is_err());
        assert!(validate_type_name("entity_type", "team-1").is_err());
        assert!(validate_type_name("entity_type", "").is_err());
    }

    #[test]
    fn status_parses_every_variant() {
        for status in [
            EventStatus::Draft,
            EventStatus::Active,
            EventStatus::Completed,
            EventStatus::Cancelled,
            EventStatus::Ended,
        ] {
            assert_eq!(status.as_str().parse::<EventStatus>().unwrap(), status);
        }
        let err = "paused".parse::<EventStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid status: paused");
    }

    #[test]
    fn status_defaults_to_active() {
        assert_eq!(EventStatus::default(), EventStatus::Active);
        let json = serde_json::to_string(&EventStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }
}
