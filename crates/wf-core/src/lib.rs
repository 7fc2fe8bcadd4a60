//! Core domain logic for the workforce temporal engine.
//!
//! This crate contains the storage-independent parts of the model:
//! - Records: entities, events and the participations linking them
//! - The event type catalog and the type-routed validation dispatcher
//! - Temporal checks: interval overlap and containment
//! - Derived time: worked, break and net hours over event trees

pub mod dispatch;
pub mod entity;
pub mod event;
pub mod event_type;
pub mod hours;
pub mod participation;
pub mod temporal;
pub mod types;
pub mod validators;

pub use dispatch::{EventAttrs, EventValidator, GenericValidator, ValidatedEvent, ValidatorRegistry};
pub use entity::{Entity, EntityPatch};
pub use event::{Event, Properties};
pub use event_type::{EventKind, EventType, EventTypeDef, UnknownEventType, seed_catalog};
pub use hours::{EventTree, ShiftHours};
pub use participation::{Participation, ParticipationAttrs};
pub use temporal::{ContainmentError, Interval, OverlapError};
pub use types::{
    EntityId, EventId, EventStatus, EventTypeId, ParticipationId, ValidationError,
};
