//! Validators for the built-in event types.

use serde_json::Value;

use crate::dispatch::EventValidator;
use crate::event::Properties;
use crate::event_type::EventKind;
use crate::types::ValidationError;

/// Rate type assumed for payroll pieces that do not name one.
pub const DEFAULT_RATE_TYPE: &str = "regular";

pub(crate) fn builtin() -> Vec<Box<dyn EventValidator>> {
    vec![
        Box::new(EmploymentValidator),
        Box::new(ShiftValidator),
        Box::new(WorkPeriodValidator),
        Box::new(BreakValidator),
        Box::new(TaskValidator),
        Box::new(ScheduleValidator),
        Box::new(ClockEventValidator),
        Box::new(ClockPeriodValidator),
        Box::new(PayrollPieceValidator),
    ]
}

fn require_text(properties: &Properties, key: &str) -> Result<(), ValidationError> {
    match properties.get(key) {
        None => Err(ValidationError::missing(key)),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(()),
        Some(Value::String(_)) => Err(ValidationError::invalid(key, "cannot be blank")),
        Some(_) => Err(ValidationError::invalid(key, "must be a string")),
    }
}

fn optional_text(properties: &Properties, key: &str) -> Result<(), ValidationError> {
    if properties.contains_key(key) {
        require_text(properties, key)
    } else {
        Ok(())
    }
}

fn bool_or_default(
    properties: &mut Properties,
    key: &str,
    default: bool,
) -> Result<(), ValidationError> {
    match properties.get(key) {
        None => {
            properties.insert(key.to_string(), Value::Bool(default));
            Ok(())
        }
        Some(Value::Bool(_)) => Ok(()),
        Some(_) => Err(ValidationError::invalid(key, "must be true or false")),
    }
}

/// Employment contracts: role, contract type, salary.
#[derive(Debug, Clone, Copy)]
pub struct EmploymentValidator;

impl EventValidator for EmploymentValidator {
    fn type_name(&self) -> &'static str {
        EventKind::Employment.as_str()
    }

    fn allowed_keys(&self) -> Option<&'static [&'static str]> {
        Some(&["role", "contract_type", "salary", "notes"])
    }

    fn apply_rules(&self, properties: &mut Properties) -> Result<(), ValidationError> {
        optional_text(properties, "contract_type")?;
        if let Some(salary) = properties.get("salary") {
            match salary.as_f64() {
                Some(amount) if amount >= 0.0 => {}
                Some(_) => return Err(ValidationError::invalid("salary", "cannot be negative")),
                None => return Err(ValidationError::invalid("salary", "must be a number")),
            }
        }
        Ok(())
    }
}

/// Planned shifts. A shift always names its location.
#[derive(Debug, Clone, Copy)]
pub struct ShiftValidator;

impl EventValidator for ShiftValidator {
    fn type_name(&self) -> &'static str {
        EventKind::Shift.as_str()
    }

    fn allowed_keys(&self) -> Option<&'static [&'static str]> {
        Some(&["location", "department", "notes"])
    }

    fn apply_rules(&self, properties: &mut Properties) -> Result<(), ValidationError> {
        require_text(properties, "location")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WorkPeriodValidator;

impl EventValidator for WorkPeriodValidator {
    fn type_name(&self) -> &'static str {
        EventKind::WorkPeriod.as_str()
    }

    fn allowed_keys(&self) -> Option<&'static [&'static str]> {
        Some(&["activity", "notes"])
    }

    fn apply_rules(&self, _properties: &mut Properties) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Breaks are unpaid unless stated otherwise.
#[derive(Debug, Clone, Copy)]
pub struct BreakValidator;

impl EventValidator for BreakValidator {
    fn type_name(&self) -> &'static str {
        EventKind::Break.as_str()
    }

    fn allowed_keys(&self) -> Option<&'static [&'static str]> {
        Some(&["is_paid", "break_type", "notes"])
    }

    fn apply_rules(&self, properties: &mut Properties) -> Result<(), ValidationError> {
        bool_or_default(properties, "is_paid", false)?;
        optional_text(properties, "break_type")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TaskValidator;

impl EventValidator for TaskValidator {
    fn type_name(&self) -> &'static str {
        EventKind::Task.as_str()
    }

    fn allowed_keys(&self) -> Option<&'static [&'static str]> {
        Some(&["title", "description", "notes"])
    }

    fn apply_rules(&self, properties: &mut Properties) -> Result<(), ValidationError> {
        require_text(properties, "title")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScheduleValidator;

impl EventValidator for ScheduleValidator {
    fn type_name(&self) -> &'static str {
        EventKind::Schedule.as_str()
    }

    fn allowed_keys(&self) -> Option<&'static [&'static str]> {
        Some(&["name", "published", "notes"])
    }

    fn apply_rules(&self, properties: &mut Properties) -> Result<(), ValidationError> {
        optional_text(properties, "name")?;
        bool_or_default(properties, "published", false)
    }
}

/// Clock punches carry their direction.
#[derive(Debug, Clone, Copy)]
pub struct ClockEventValidator;

impl EventValidator for ClockEventValidator {
    fn type_name(&self) -> &'static str {
        EventKind::ClockEvent.as_str()
    }

    fn allowed_keys(&self) -> Option<&'static [&'static str]> {
        Some(&["direction", "source", "location", "notes"])
    }

    fn apply_rules(&self, properties: &mut Properties) -> Result<(), ValidationError> {
        require_text(properties, "direction")?;
        match properties.get("direction").and_then(Value::as_str) {
            Some("in" | "out") => Ok(()),
            _ => Err(ValidationError::invalid("direction", "must be \"in\" or \"out\"")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClockPeriodValidator;

impl EventValidator for ClockPeriodValidator {
    fn type_name(&self) -> &'static str {
        EventKind::ClockPeriod.as_str()
    }

    fn allowed_keys(&self) -> Option<&'static [&'static str]> {
        Some(&["clock_in_id", "clock_out_id", "shift_id", "notes"])
    }

    fn apply_rules(&self, properties: &mut Properties) -> Result<(), ValidationError> {
        require_text(properties, "clock_in_id")?;
        require_text(properties, "clock_out_id")?;
        optional_text(properties, "shift_id")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PayrollPieceValidator;

impl EventValidator for PayrollPieceValidator {
    fn type_name(&self) -> &'static str {
        EventKind::PayrollPiece.as_str()
    }

    fn allowed_keys(&self) -> Option<&'static [&'static str]> {
        Some(&["cost_center", "job_code", "rate_type", "notes"])
    }

    fn apply_rules(&self, properties: &mut Properties) -> Result<(), ValidationError> {
        optional_text(properties, "cost_center")?;
        optional_text(properties, "job_code")?;
        if properties.contains_key("rate_type") {
            require_text(properties, "rate_type")
        } else {
            properties.insert(
                "rate_type".to_string(),
                Value::String(DEFAULT_RATE_TYPE.to_string()),
            );
            Ok(())
        }
    }
}
