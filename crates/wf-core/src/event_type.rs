//! Event type catalog: the names the orchestrator relies on and their metadata.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

use crate::types::EventTypeId;

/// Event types seeded at bootstrap and referenced by domain operations.
///
/// Other names may be registered at runtime; they are handled by the generic validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Employment,
    Shift,
    WorkPeriod,
    Break,
    Task,
    Schedule,
    ClockEvent,
    ClockPeriod,
    PayrollPiece,
}

impl EventKind {
    pub const ALL: [Self; 9] = [
        Self::Employment,
        Self::Shift,
        Self::WorkPeriod,
        Self::Break,
        Self::Task,
        Self::Schedule,
        Self::ClockEvent,
        Self::ClockPeriod,
        Self::PayrollPiece,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Employment => "employment",
            Self::Shift => "shift",
            Self::WorkPeriod => "work_period",
            Self::Break => "break",
            Self::Task => "task",
            Self::Schedule => "schedule",
            Self::ClockEvent => "clock_event",
            Self::ClockPeriod => "clock_period",
            Self::PayrollPiece => "payroll_piece",
        }
    }

    /// Catalog row seeded for this kind.
    pub fn definition(self) -> EventTypeDef {
        let (category, can_nest, can_have_children, requires_participation) = match self {
            Self::Employment => ("employment", false, true, true),
            Self::Shift => ("scheduling", true, true, true),
            Self::WorkPeriod | Self::Break | Self::Task => ("scheduling", true, false, true),
            Self::Schedule => ("scheduling", false, true, false),
            Self::ClockEvent => ("time_clock", false, false, true),
            Self::ClockPeriod => ("time_clock", false, true, true),
            Self::PayrollPiece => ("payroll", true, false, false),
        };
        EventTypeDef {
            name: self.as_str().to_string(),
            category: category.to_string(),
            can_nest,
            can_have_children,
            requires_participation,
            schema: json!({}),
            rules: json!({}),
            is_active: true,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEventType(s.to_string()))
    }
}

impl Serialize for EventKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for names that are not one of the built-in kinds.
#[derive(Debug, Clone)]
pub struct UnknownEventType(String);

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event type: {}", self.0)
    }
}

impl std::error::Error for UnknownEventType {}

/// Metadata describing a category of event, as registered in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTypeDef {
    pub name: String,
    pub category: String,
    /// May appear as a child of another event.
    pub can_nest: bool,
    pub can_have_children: bool,
    /// Creating operations must attach at least one participation.
    pub requires_participation: bool,
    #[serde(default)]
    pub schema: Value,
    #[serde(default)]
    pub rules: Value,
    pub is_active: bool,
}

/// A catalog row together with its storage identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventType {
    pub id: EventTypeId,
    #[serde(flatten)]
    pub def: EventTypeDef,
}

impl EventType {
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// The built-in kind, if this row is one of the seeded types.
    pub fn kind(&self) -> Option<EventKind> {
        self.def.name.parse().ok()
    }
}

/// The catalog populated by the bootstrap process.
pub fn seed_catalog() -> Vec<EventTypeDef> {
    EventKind::ALL.into_iter().map(EventKind::definition).collect()
}
