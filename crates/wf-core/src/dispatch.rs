//! Type-routed validation for event mutations.
//!
//! ```text
//! ValidatorRegistry
//!     ├── validators: HashMap<String, Box<dyn EventValidator>>
//!     └── fallback:   Box<dyn EventValidator>   (required, used for unregistered names)
//! ```
//!
//! Every validator runs the generic checks first (start time, ordering,
//! status), then copies its allow-listed keys into the event's property map
//! and applies its own rules. Adding an event type means registering one
//! validator; the registry and the stores stay untouched.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::event::{Event, Properties};
use crate::temporal::storage_precision;
use crate::types::{EventStatus, ValidationError};
use crate::validators;

/// Incoming attributes for creating or updating an event.
///
/// Anything other than the time bounds and status goes into `fields`; each
/// validator decides which of those keys end up in the stored properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, flatten)]
    pub fields: Properties,
}

impl EventAttrs {
    pub fn starting(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time: Some(start_time),
            ..Self::default()
        }
    }

    pub fn spanning(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            start_time: Some(start_time),
            end_time: Some(end_time),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn ending(mut self, end_time: Option<DateTime<Utc>>) -> Self {
        self.end_time = end_time;
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Current state of a stored event, expressed as attributes.
    pub fn from_event(event: &Event) -> Self {
        Self {
            start_time: Some(event.start_time),
            end_time: event.end_time,
            status: Some(event.status.as_str().to_string()),
            fields: event.properties.clone(),
        }
    }

    /// Overlays an update onto existing attributes.
    ///
    /// Set bounds and status replace the current ones; fields are merged and a
    /// JSON `null` removes the key. An end time cannot be cleared this way.
    #[must_use]
    pub fn overlay(mut self, patch: Self) -> Self {
        if patch.start_time.is_some() {
            self.start_time = patch.start_time;
        }
        if patch.end_time.is_some() {
            self.end_time = patch.end_time;
        }
        if patch.status.is_some() {
            self.status = patch.status;
        }
        for (key, value) in patch.fields {
            if value.is_null() {
                self.fields.remove(&key);
            } else {
                self.fields.insert(key, value);
            }
        }
        self
    }
}

/// Attributes that passed validation, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEvent {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: EventStatus,
    pub properties: Properties,
}

/// Generic checks shared by every event type.
///
/// `start_time` is required, `end_time` must be strictly later, and `status`
/// must be one of the known values (defaulting to `active`). Times are
/// truncated to storage precision before they are compared.
pub fn validate_generic(
    attrs: &EventAttrs,
) -> Result<(DateTime<Utc>, Option<DateTime<Utc>>, EventStatus), ValidationError> {
    let start_time = attrs
        .start_time
        .map(storage_precision)
        .ok_or_else(|| ValidationError::missing("start_time"))?;
    let end_time = attrs.end_time.map(storage_precision);
    if let Some(end_time) = end_time {
        if end_time <= start_time {
            return Err(ValidationError::EndNotAfterStart {
                start: start_time.to_rfc3339(),
                end: end_time.to_rfc3339(),
            });
        }
    }
    let status = match attrs.status.as_deref() {
        Some(status) => status.parse()?,
        None => EventStatus::default(),
    };
    Ok((start_time, end_time, status))
}

/// Type-specific validation for one event type.
pub trait EventValidator: Send + Sync + fmt::Debug {
    /// The catalog name this validator handles.
    fn type_name(&self) -> &'static str;

    /// Keys copied from the incoming fields into the stored properties.
    ///
    /// `None` keeps every key.
    fn allowed_keys(&self) -> Option<&'static [&'static str]>;

    /// Applies required-field, format and default rules to the extracted properties.
    fn apply_rules(&self, properties: &mut Properties) -> Result<(), ValidationError>;

    /// Runs generic validation, extracts allowed keys, then applies type rules.
    fn validate(&self, attrs: &EventAttrs) -> Result<ValidatedEvent, ValidationError> {
        let (start_time, end_time, status) = validate_generic(attrs)?;
        let mut properties = extract_properties(self.type_name(), self.allowed_keys(), attrs);
        self.apply_rules(&mut properties)?;
        Ok(ValidatedEvent {
            start_time,
            end_time,
            status,
            properties,
        })
    }
}

fn extract_properties(
    type_name: &str,
    allowed: Option<&[&str]>,
    attrs: &EventAttrs,
) -> Properties {
    let Some(allowed) = allowed else {
        return attrs.fields.clone();
    };
    let mut properties = Properties::new();
    for (key, value) in &attrs.fields {
        if allowed.contains(&key.as_str()) {
            if !value.is_null() {
                properties.insert(key.clone(), value.clone());
            }
        } else {
            debug!(event_type = type_name, key = %key, "dropping field outside allow-list");
        }
    }
    properties
}

/// Fallback for event types without a dedicated validator.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericValidator;

impl EventValidator for GenericValidator {
    fn type_name(&self) -> &'static str {
        "generic"
    }

    fn allowed_keys(&self) -> Option<&'static [&'static str]> {
        None
    }

    fn apply_rules(&self, _properties: &mut Properties) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Errors raised while building a registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("a validator is already registered for event type {0}")]
    AlreadyRegistered(&'static str),
}

/// Maps event type names to validators.
#[derive(Debug)]
pub struct ValidatorRegistry {
    validators: HashMap<String, Box<dyn EventValidator>>,
    fallback: Box<dyn EventValidator>,
}

impl ValidatorRegistry {
    /// Creates an empty registry. The fallback handles every unregistered name.
    pub fn new(fallback: Box<dyn EventValidator>) -> Self {
        Self {
            validators: HashMap::new(),
            fallback,
        }
    }

    /// Registry with validators for every built-in event kind.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new(Box::new(GenericValidator));
        for validator in validators::builtin() {
            // Built-in names are distinct, so registration cannot collide.
            let name = validator.type_name();
            registry.validators.insert(name.to_string(), validator);
        }
        registry
    }

    /// Registers a validator for a new event type.
    pub fn register(&mut self, validator: Box<dyn EventValidator>) -> Result<(), DispatchError> {
        let name = validator.type_name();
        if self.validators.contains_key(name) {
            return Err(DispatchError::AlreadyRegistered(name));
        }
        debug!(event_type = name, "registered validator");
        self.validators.insert(name.to_string(), validator);
        Ok(())
    }

    pub fn has_validator(&self, type_name: &str) -> bool {
        self.validators.contains_key(type_name)
    }

    /// The validator for `type_name`, or the fallback.
    pub fn validator_for(&self, type_name: &str) -> &dyn EventValidator {
        if let Some(validator) = self.validators.get(type_name) {
            validator.as_ref()
        } else {
            debug!(event_type = type_name, "no dedicated validator, using fallback");
            self.fallback.as_ref()
        }
    }

    /// Validates attributes for an event of the given type.
    pub fn dispatch(
        &self,
        type_name: &str,
        attrs: &EventAttrs,
    ) -> Result<ValidatedEvent, ValidationError> {
        self.validator_for(type_name).validate(attrs)
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
