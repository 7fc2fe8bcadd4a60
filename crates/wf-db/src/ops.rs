//! Domain operations: the only write path into the stores.
//!
//! Each public method runs in one immediate transaction (see
//! [`Database::transact`](crate::Database)). Preconditions are checked, the
//! event type is resolved, attributes go through the validator registry, and
//! the event plus its participations are written. Returning an error at any
//! point leaves nothing behind.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, warn};
use wf_core::participation::{EMPLOYEE, WORKER};
use wf_core::dispatch::validate_generic;
use wf_core::temporal::{check_contained, find_overlap};
use wf_core::{
    Entity, EntityId, EntityPatch, Event, EventAttrs, EventId, EventKind, EventStatus, EventType,
    Interval, OverlapError, Participation, ParticipationAttrs, ParticipationId, Properties,
    ValidatedEvent, ValidationError, ValidatorRegistry,
};

use crate::hooks::{ChangeKind, ChangeNotice};
use crate::{Database, DbError, registry, store};

/// Shifts longer than this are split around a break.
const AUTO_SPLIT_AFTER_HOURS: i64 = 4;
const AUTO_BREAK_MINUTES: i64 = 30;

/// Keys in a clock period that point at its punches.
const PUNCH_KEYS: [&str; 2] = ["clock_in_id", "clock_out_id"];

/// An event written by an operation, with the links created alongside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedEvent {
    pub event: Event,
    pub event_type: String,
    pub participations: Vec<Participation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShiftCreated {
    pub shift: CreatedEvent,
    /// Generated work periods and breaks, in time order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub periods: Vec<CreatedEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClockPeriodCreated {
    pub period: CreatedEvent,
    /// Shift the clock-in fell inside, if any.
    pub matched_shift: Option<EventId>,
}

/// Optional details for a clock punch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClockOptions {
    /// Punch time; defaults to now.
    pub at: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// One slot of an automatically generated shift layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PeriodSlot {
    pub kind: EventKind,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Work periods and break for a shift `[start, end)`.
///
/// Longer than four hours: work, an unpaid 30 minute break, work. A break
/// that would run past the shift end is clipped, and the second work period
/// is omitted when nothing remains. Otherwise one work period covers the shift.
pub(crate) fn auto_periods(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<PeriodSlot> {
    let split = start + Duration::hours(AUTO_SPLIT_AFTER_HOURS);
    if end <= split {
        return vec![PeriodSlot {
            kind: EventKind::WorkPeriod,
            start,
            end,
        }];
    }
    let resume = (split + Duration::minutes(AUTO_BREAK_MINUTES)).min(end);
    let mut slots = vec![
        PeriodSlot {
            kind: EventKind::WorkPeriod,
            start,
            end: split,
        },
        PeriodSlot {
            kind: EventKind::Break,
            start: split,
            end: resume,
        },
    ];
    if resume < end {
        slots.push(PeriodSlot {
            kind: EventKind::WorkPeriod,
            start: resume,
            end,
        });
    }
    slots
}

/// Attributes that passed dispatch, paired with their catalog row.
struct Prepared {
    event_type: EventType,
    validated: ValidatedEvent,
}

impl Prepared {
    const fn interval(&self) -> Interval {
        Interval::new(self.validated.start_time, self.validated.end_time)
    }
}

/// Per-transaction context handed to operations.
pub(crate) struct Tx<'a> {
    conn: &'a Connection,
    validators: &'a ValidatorRegistry,
    changes: Vec<ChangeNotice>,
}

impl<'a> Tx<'a> {
    pub(crate) const fn new(conn: &'a Connection, validators: &'a ValidatorRegistry) -> Self {
        Self {
            conn,
            validators,
            changes: Vec::new(),
        }
    }

    pub(crate) const fn conn(&self) -> &'a Connection {
        self.conn
    }

    pub(crate) fn into_changes(self) -> Vec<ChangeNotice> {
        self.changes
    }

    fn record(&mut self, kind: ChangeKind, event_id: &EventId, event_type: &str) {
        self.changes.push(ChangeNotice {
            kind,
            event_id: event_id.clone(),
            event_type: event_type.to_string(),
        });
    }

    fn load_any(&self, id: &EventId) -> Result<(Event, EventType), DbError> {
        let event = store::get_event(self.conn, id)?;
        let event_type = registry::event_type_by_id(self.conn, &event.event_type_id)?;
        Ok((event, event_type))
    }

    /// Loads an event that must be of the given kind.
    fn load(&self, id: &EventId, kind: EventKind) -> Result<(Event, EventType), DbError> {
        let event =
            store::find_event(self.conn, id)?.ok_or_else(|| DbError::not_found(kind.as_str(), id))?;
        let event_type = registry::event_type_by_id(self.conn, &event.event_type_id)?;
        if event_type.kind() != Some(kind) {
            return Err(ValidationError::invalid(
                kind.as_str(),
                format!("event {id} is a {}, not a {kind}", event_type.name()),
            )
            .into());
        }
        Ok((event, event_type))
    }

    /// Resolves the type, dispatches validation and checks nesting under `parent`.
    fn prepare(
        &self,
        type_name: &str,
        parent: Option<(&Event, &EventType)>,
        attrs: &EventAttrs,
    ) -> Result<Prepared, DbError> {
        let event_type = registry::resolve(self.conn, type_name)?;
        let validated = self.validators.dispatch(type_name, attrs)?;
        let prepared = Prepared {
            event_type,
            validated,
        };
        if let Some((parent, parent_type)) = parent {
            if !parent_type.def.can_have_children {
                return Err(ValidationError::Rule(format!(
                    "{} events cannot have children",
                    parent_type.name()
                ))
                .into());
            }
            if !prepared.event_type.def.can_nest {
                return Err(
                    ValidationError::Rule(format!("{type_name} events cannot be nested")).into(),
                );
            }
            check_contained(
                type_name,
                &prepared.interval(),
                parent_type.name(),
                &parent.interval(),
            )?;
        }
        Ok(prepared)
    }

    /// Writes a prepared event and its participations.
    fn insert(
        &mut self,
        prepared: Prepared,
        parent_id: Option<&EventId>,
        participants: &[(&EntityId, ParticipationAttrs)],
    ) -> Result<CreatedEvent, DbError> {
        let Prepared {
            event_type,
            validated,
        } = prepared;
        if event_type.def.requires_participation && participants.is_empty() {
            return Err(ValidationError::Rule(format!(
                "{} events require at least one participant",
                event_type.name()
            ))
            .into());
        }
        let event = store::insert_event(self.conn, &event_type.id, parent_id, &validated)?;
        let mut participations = Vec::with_capacity(participants.len());
        for (participant, attrs) in participants {
            participations.push(self.link(participant, &event, event_type.name(), attrs)?);
        }
        self.record(ChangeKind::Created, &event.id, event_type.name());
        Ok(CreatedEvent {
            event,
            event_type: event_type.def.name,
            participations,
        })
    }

    /// Links an entity to an event after checking its sub-bounds fit the event.
    fn link(
        &self,
        participant: &EntityId,
        event: &Event,
        event_type: &str,
        attrs: &ParticipationAttrs,
    ) -> Result<Participation, DbError> {
        if attrs.start_time.is_some() || attrs.end_time.is_some() {
            attrs.validate()?;
            check_contained(
                "participation",
                &attrs.sub_interval(event.interval()),
                event_type,
                &event.interval(),
            )?;
        }
        store::insert_participation(self.conn, participant, &event.id, attrs)
    }

    /// Rejects `candidate` if it overlaps another `subject` event of the participant.
    fn check_no_overlap(
        &self,
        subject: EventKind,
        participant: &EntityId,
        participation_type: &str,
        candidate: &Interval,
        exclude: Option<&EventId>,
        counts: impl Fn(EventStatus) -> bool,
    ) -> Result<(), DbError> {
        let event_type = registry::resolve(self.conn, subject.as_str())?;
        let existing = store::events_with_participant(
            self.conn,
            participant,
            participation_type,
            &event_type.id,
        )?;
        let others = existing
            .iter()
            .filter(|event| Some(&event.id) != exclude && counts(event.status))
            .map(|event| (event.id.as_str(), event.interval()));
        if let Some((conflicting_id, conflicting)) = find_overlap(candidate, others) {
            return Err(OverlapError {
                subject: subject.as_str().to_string(),
                candidate: *candidate,
                conflicting_id: conflicting_id.to_string(),
                conflicting,
            }
            .into());
        }
        Ok(())
    }

    fn check_employment_overlap(
        &self,
        employee: &EntityId,
        candidate: &Interval,
        exclude: Option<&EventId>,
    ) -> Result<(), DbError> {
        self.check_no_overlap(
            EventKind::Employment,
            employee,
            EMPLOYEE,
            candidate,
            exclude,
            |status| status == EventStatus::Active,
        )
    }

    fn check_shift_overlap(
        &self,
        worker: &EntityId,
        candidate: &Interval,
        exclude: Option<&EventId>,
    ) -> Result<(), DbError> {
        self.check_no_overlap(
            EventKind::Shift,
            worker,
            WORKER,
            candidate,
            exclude,
            |status| status != EventStatus::Cancelled,
        )
    }

    /// Creates a child of `parent` that inherits the parent's workers.
    fn create_child(
        &mut self,
        kind: EventKind,
        parent: &Event,
        parent_type: &EventType,
        attrs: &EventAttrs,
    ) -> Result<CreatedEvent, DbError> {
        let workers = store::participants_of(self.conn, &parent.id, WORKER)?;
        let prepared = self.prepare(kind.as_str(), Some((parent, parent_type)), attrs)?;
        let participants: Vec<_> = workers
            .iter()
            .map(|worker| (worker, ParticipationAttrs::new(WORKER)))
            .collect();
        self.insert(prepared, Some(&parent.id), &participants)
    }

    fn clock(
        &mut self,
        worker: &EntityId,
        direction: &str,
        opts: &ClockOptions,
    ) -> Result<CreatedEvent, DbError> {
        let at = opts.at.unwrap_or_else(Utc::now).trunc_subsecs(3);
        let mut attrs =
            EventAttrs::spanning(at, at + Duration::seconds(1)).field("direction", direction);
        for (key, value) in [
            ("source", &opts.source),
            ("location", &opts.location),
            ("notes", &opts.notes),
        ] {
            if let Some(value) = value {
                attrs = attrs.field(key, value.as_str());
            }
        }
        let prepared = self.prepare(EventKind::ClockEvent.as_str(), None, &attrs)?;
        self.insert(prepared, None, &[(worker, ParticipationAttrs::new(WORKER))])
    }

    /// Loads a punch and checks its direction and owner.
    fn load_punch(
        &self,
        worker: &EntityId,
        id: &EventId,
        direction: &str,
    ) -> Result<Event, DbError> {
        let (punch, _) = self.load(id, EventKind::ClockEvent)?;
        if punch.property_str("direction") != Some(direction) {
            return Err(ValidationError::invalid(
                format!("clock_{direction}_id"),
                format!("event {id} is not a clock-{direction} punch"),
            )
            .into());
        }
        if store::find_participation(self.conn, worker, id, WORKER)?.is_none() {
            return Err(ValidationError::Rule(format!(
                "punch {id} does not belong to worker {worker}"
            ))
            .into());
        }
        Ok(punch)
    }

    /// The clock period that references `punch`, if any.
    fn period_using(&self, punch: &EventId) -> Result<Option<Event>, DbError> {
        let period_type = registry::resolve(self.conn, EventKind::ClockPeriod.as_str())?;
        let users =
            store::events_referencing(self.conn, &period_type.id, &PUNCH_KEYS, punch.as_str())?;
        Ok(users.into_iter().next())
    }

    /// Rejects a punch that another clock period already consumed.
    fn check_punch_unused(&self, punch: &EventId) -> Result<(), DbError> {
        if let Some(period) = self.period_using(punch)? {
            return Err(ValidationError::Rule(format!(
                "punch {punch} already belongs to clock period {}",
                period.id
            ))
            .into());
        }
        Ok(())
    }

    /// A clock period keeps the punches, shift and span it was created with.
    fn check_period_links_unchanged(
        period: &Event,
        validated: &ValidatedEvent,
    ) -> Result<(), DbError> {
        for key in PUNCH_KEYS.into_iter().chain(["shift_id"]) {
            if period.properties.get(key) != validated.properties.get(key) {
                return Err(ValidationError::invalid(
                    key,
                    format!("cannot be changed on clock period {}", period.id),
                )
                .into());
            }
        }
        if period.start_time != validated.start_time || period.end_time != validated.end_time {
            return Err(ValidationError::Rule(format!(
                "clock period {} must keep the span between its punches",
                period.id
            ))
            .into());
        }
        Ok(())
    }

    /// A punch used by a clock period keeps its direction and time.
    fn check_punch_change(&self, punch: &Event, validated: &ValidatedEvent) -> Result<(), DbError> {
        let direction = validated.properties.get("direction").and_then(|d| d.as_str());
        let changed = punch.property_str("direction") != direction
            || punch.start_time != validated.start_time
            || punch.end_time != validated.end_time;
        if !changed {
            return Ok(());
        }
        if let Some(period) = self.period_using(&punch.id)? {
            return Err(ValidationError::Rule(format!(
                "punch {} is used by clock period {}; its time and direction are fixed",
                punch.id, period.id
            ))
            .into());
        }
        Ok(())
    }

    /// Earliest non-cancelled shift of the worker that contains `at`.
    fn match_shift(&self, worker: &EntityId, at: DateTime<Utc>) -> Result<Option<EventId>, DbError> {
        let shift_type = registry::resolve(self.conn, EventKind::Shift.as_str())?;
        let shifts = store::events_with_participant(self.conn, worker, WORKER, &shift_type.id)?;
        let mut matches = shifts.into_iter().filter(|shift| {
            shift.status != EventStatus::Cancelled
                && shift.start_time <= at
                && shift.end_time.is_none_or(|end| at < end)
        });
        let Some(first) = matches.next() else {
            debug!(worker = %worker, at = %at, "no shift contains the clock-in");
            return Ok(None);
        };
        let others = matches.count();
        if others > 0 {
            warn!(
                worker = %worker,
                chosen = %first.id,
                others,
                "clock-in falls inside several shifts, using the earliest"
            );
        }
        Ok(Some(first.id))
    }
}

impl Database {
    // ========== Entities ==========

    pub fn create_entity(
        &mut self,
        entity_type: &str,
        properties: Properties,
    ) -> Result<Entity, DbError> {
        self.transact("create_entity", |tx| {
            store::insert_entity(tx.conn(), entity_type, &properties)
        })
    }

    pub fn update_entity(&mut self, id: &EntityId, patch: &EntityPatch) -> Result<Entity, DbError> {
        self.transact("update_entity", |tx| store::update_entity(tx.conn(), id, patch))
    }

    /// Deletes an entity and every participation it holds.
    pub fn delete_entity(&mut self, id: &EntityId) -> Result<(), DbError> {
        self.transact("delete_entity", |tx| store::delete_entity(tx.conn(), id))
    }

    // ========== Participations ==========

    /// Links an entity to an existing event.
    pub fn add_participation(
        &mut self,
        participant: &EntityId,
        event_id: &EventId,
        attrs: &ParticipationAttrs,
    ) -> Result<Participation, DbError> {
        self.transact("add_participation", |tx| {
            let (event, event_type) = tx.load_any(event_id)?;
            let participation = tx.link(participant, &event, event_type.name(), attrs)?;
            tx.record(ChangeKind::Updated, &event.id, event_type.name());
            Ok(participation)
        })
    }

    /// Removes a participation.
    ///
    /// The last participation of an event whose type requires one cannot be removed.
    pub fn remove_participation(&mut self, id: &ParticipationId) -> Result<Participation, DbError> {
        self.transact("remove_participation", |tx| {
            let removed = store::delete_participation(tx.conn(), id)?;
            let (event, event_type) = tx.load_any(&removed.event_id)?;
            if event_type.def.requires_participation
                && store::participations_for_event(tx.conn(), &event.id)?.is_empty()
            {
                return Err(ValidationError::Rule(format!(
                    "{} events require at least one participant",
                    event_type.name()
                ))
                .into());
            }
            tx.record(ChangeKind::Updated, &event.id, event_type.name());
            Ok(removed)
        })
    }

    // ========== Employment and shifts ==========

    /// Creates an employment for `worker`.
    ///
    /// Fails with an overlap error if the worker already has an active
    /// employment covering any of the requested span.
    pub fn create_employment(
        &mut self,
        worker: &EntityId,
        attrs: &EventAttrs,
    ) -> Result<CreatedEvent, DbError> {
        self.transact("create_employment", |tx| {
            let prepared = tx.prepare(EventKind::Employment.as_str(), None, attrs)?;
            if prepared.validated.status != EventStatus::Cancelled {
                tx.check_employment_overlap(worker, &prepared.interval(), None)?;
            }
            let role = prepared
                .validated
                .properties
                .get("role")
                .and_then(|role| role.as_str())
                .map(str::to_string);
            let link = ParticipationAttrs::new(EMPLOYEE).with_role(role);
            tx.insert(prepared, None, &[(worker, link)])
        })
    }

    /// Creates a shift under an employment, optionally with generated work periods.
    pub fn create_shift(
        &mut self,
        employment_id: &EventId,
        worker: &EntityId,
        attrs: &EventAttrs,
        auto_generate_periods: bool,
    ) -> Result<ShiftCreated, DbError> {
        self.transact("create_shift", |tx| {
            let (employment, employment_type) = tx.load(employment_id, EventKind::Employment)?;
            if store::find_participation(tx.conn(), worker, &employment.id, EMPLOYEE)?.is_none() {
                return Err(ValidationError::Rule(format!(
                    "worker {worker} is not the employee of employment {employment_id}"
                ))
                .into());
            }
            validate_generic(attrs)?;
            if attrs.end_time.is_none() {
                return Err(ValidationError::missing("end_time").into());
            }
            let prepared = tx.prepare(
                EventKind::Shift.as_str(),
                Some((&employment, &employment_type)),
                attrs,
            )?;
            if prepared.validated.status != EventStatus::Cancelled {
                tx.check_shift_overlap(worker, &prepared.interval(), None)?;
            }
            let shift = tx.insert(
                prepared,
                Some(&employment.id),
                &[(worker, ParticipationAttrs::new(WORKER))],
            )?;

            let mut periods = Vec::new();
            if auto_generate_periods {
                if let Some(end) = shift.event.end_time {
                    let shift_type = registry::event_type_by_id(tx.conn(), &shift.event.event_type_id)?;
                    for slot in auto_periods(shift.event.start_time, end) {
                        let mut period = EventAttrs::spanning(slot.start, slot.end);
                        if slot.kind == EventKind::Break {
                            period = period.field("is_paid", false);
                        }
                        periods.push(tx.create_child(slot.kind, &shift.event, &shift_type, &period)?);
                    }
                }
            }
            Ok(ShiftCreated { shift, periods })
        })
    }

    pub fn add_break(&mut self, shift_id: &EventId, attrs: &EventAttrs) -> Result<CreatedEvent, DbError> {
        self.add_shift_child("add_break", EventKind::Break, shift_id, attrs)
    }

    pub fn add_work_period(
        &mut self,
        shift_id: &EventId,
        attrs: &EventAttrs,
    ) -> Result<CreatedEvent, DbError> {
        self.add_shift_child("add_work_period", EventKind::WorkPeriod, shift_id, attrs)
    }

    pub fn add_task(&mut self, shift_id: &EventId, attrs: &EventAttrs) -> Result<CreatedEvent, DbError> {
        self.add_shift_child("add_task", EventKind::Task, shift_id, attrs)
    }

    fn add_shift_child(
        &mut self,
        operation: &'static str,
        kind: EventKind,
        shift_id: &EventId,
        attrs: &EventAttrs,
    ) -> Result<CreatedEvent, DbError> {
        self.transact(operation, |tx| {
            let (shift, shift_type) = tx.load(shift_id, EventKind::Shift)?;
            tx.create_child(kind, &shift, &shift_type, attrs)
        })
    }

    // ========== Time clock and payroll ==========

    /// Records a clock-in punch lasting one second.
    pub fn clock_in(&mut self, worker: &EntityId, opts: &ClockOptions) -> Result<CreatedEvent, DbError> {
        self.transact("clock_in", |tx| tx.clock(worker, "in", opts))
    }

    /// Records a clock-out punch lasting one second.
    pub fn clock_out(&mut self, worker: &EntityId, opts: &ClockOptions) -> Result<CreatedEvent, DbError> {
        self.transact("clock_out", |tx| tx.clock(worker, "out", opts))
    }

    /// Pairs a clock-in and clock-out punch of the same worker into a clock period.
    ///
    /// The period spans from the clock-in to the clock-out time. If the
    /// clock-in falls inside one of the worker's shifts, the shift id is
    /// recorded; finding none is not an error.
    pub fn create_clock_period(
        &mut self,
        worker: &EntityId,
        clock_in_id: &EventId,
        clock_out_id: &EventId,
    ) -> Result<ClockPeriodCreated, DbError> {
        self.transact("create_clock_period", |tx| {
            let punch_in = tx.load_punch(worker, clock_in_id, "in")?;
            let punch_out = tx.load_punch(worker, clock_out_id, "out")?;
            if punch_in.start_time >= punch_out.start_time {
                return Err(ValidationError::Rule(format!(
                    "clock-in {clock_in_id} must be before clock-out {clock_out_id}"
                ))
                .into());
            }
            tx.check_punch_unused(clock_in_id)?;
            tx.check_punch_unused(clock_out_id)?;

            let matched_shift = tx.match_shift(worker, punch_in.start_time)?;
            let mut attrs = EventAttrs::spanning(punch_in.start_time, punch_out.start_time)
                .field("clock_in_id", clock_in_id.as_str())
                .field("clock_out_id", clock_out_id.as_str());
            if let Some(shift_id) = &matched_shift {
                attrs = attrs.field("shift_id", shift_id.as_str());
            }
            let prepared = tx.prepare(EventKind::ClockPeriod.as_str(), None, &attrs)?;
            let period = tx.insert(prepared, None, &[(worker, ParticipationAttrs::new(WORKER))])?;
            Ok(ClockPeriodCreated {
                period,
                matched_shift,
            })
        })
    }

    /// Adds a payroll piece inside a clock period.
    pub fn create_payroll_piece(
        &mut self,
        clock_period_id: &EventId,
        attrs: &EventAttrs,
    ) -> Result<CreatedEvent, DbError> {
        self.transact("create_payroll_piece", |tx| {
            let (period, period_type) = tx.load(clock_period_id, EventKind::ClockPeriod)?;
            let prepared = tx.prepare(
                EventKind::PayrollPiece.as_str(),
                Some((&period, &period_type)),
                attrs,
            )?;
            tx.insert(prepared, Some(&period.id), &[])
        })
    }

    // ========== Updates and cleanup ==========

    /// Applies `patch` to an event and re-checks every rule that applied at creation.
    ///
    /// The event must still fit its parent, its direct children must still fit
    /// it, and employments and shifts must not overlap their holder's others.
    /// A clock period cannot be re-pointed or resized, and a punch in use keeps
    /// its time and direction.
    pub fn update_event(&mut self, id: &EventId, patch: &EventAttrs) -> Result<Event, DbError> {
        self.transact("update_event", |tx| {
            let (event, event_type) = tx.load_any(id)?;
            let type_name = event_type.name();
            let merged = EventAttrs::from_event(&event).overlay(patch.clone());
            let validated = tx.validators.dispatch(type_name, &merged)?;
            let candidate = Interval::new(validated.start_time, validated.end_time);

            match event_type.kind() {
                Some(EventKind::ClockPeriod) => {
                    Tx::check_period_links_unchanged(&event, &validated)?;
                }
                Some(EventKind::ClockEvent) => tx.check_punch_change(&event, &validated)?,
                _ => {}
            }

            if let Some(parent_id) = &event.parent_id {
                let (parent, parent_type) = tx.load_any(parent_id)?;
                check_contained(type_name, &candidate, parent_type.name(), &parent.interval())?;
            }
            for (child, child_type) in store::children_with_types(tx.conn(), id)? {
                check_contained(&child_type, &child.interval(), type_name, &candidate)?;
            }

            if validated.status != EventStatus::Cancelled {
                match event_type.kind() {
                    Some(EventKind::Employment) => {
                        for employee in store::participants_of(tx.conn(), id, EMPLOYEE)? {
                            tx.check_employment_overlap(&employee, &candidate, Some(id))?;
                        }
                    }
                    Some(EventKind::Shift) => {
                        for worker in store::participants_of(tx.conn(), id, WORKER)? {
                            tx.check_shift_overlap(&worker, &candidate, Some(id))?;
                        }
                    }
                    _ => {}
                }
            }

            let updated = store::update_event(tx.conn(), id, &validated)?;
            tx.record(ChangeKind::Updated, id, type_name);
            Ok(updated)
        })
    }

    /// Deletes an event. Its children are kept without a parent; its
    /// participations are removed.
    pub fn delete_event(&mut self, id: &EventId) -> Result<(), DbError> {
        self.transact("delete_event", |tx| {
            let (event, event_type) = tx.load_any(id)?;
            store::delete_event(tx.conn(), &event.id)?;
            tx.record(ChangeKind::Deleted, &event.id, event_type.name());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, person, seeded};
    use crate::{ErrorKind, EventFilter};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};
    use wf_core::temporal::ContainmentReason;

    fn employment(db: &mut Database, worker: &EntityId, start: &str, end: Option<&str>) -> EventId {
        let attrs = EventAttrs::starting(at(start))
            .ending(end.map(at))
            .field("role", "Picker");
        db.create_employment(worker, &attrs)
            .expect("create employment")
            .event
            .id
    }

    fn shift_attrs(start: &str, end: &str) -> EventAttrs {
        EventAttrs::spanning(at(start), at(end)).field("location", "Warehouse 3")
    }

    fn count_events(db: &Database) -> i64 {
        db.conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn employment_links_employee_with_role() {
        let mut db = seeded();
        let ada = person(&mut db, "Ada");
        let created = db
            .create_employment(
                &ada,
                &EventAttrs::starting(at("2025-01-01T00:00:00Z")).field("role", "Picker"),
            )
            .unwrap();
        assert_eq!(created.event_type, "employment");
        assert_eq!(created.participations.len(), 1);
        let link = &created.participations[0];
        assert_eq!(link.participation_type, EMPLOYEE);
        assert_eq!(link.role.as_deref(), Some("Picker"));
        assert_eq!(link.participant_id, ada);
    }

    #[test]
    fn no_double_active_employment() {
        let mut db = seeded();
        let ada = person(&mut db, "Ada");
        employment(&mut db, &ada, "2025-01-01T00:00:00Z", None);

        let err = db
            .create_employment(&ada, &EventAttrs::starting(at("2025-06-01T00:00:00Z")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overlap);
        assert_eq!(count_events(&db), 1);

        // Another worker is unaffected.
        let bob = person(&mut db, "Bob");
        employment(&mut db, &bob, "2025-06-01T00:00:00Z", None);
    }

    #[test]
    fn bounded_employment_blocks_only_its_own_year() {
        let mut db = seeded();
        let ada = person(&mut db, "Ada");
        employment(
            &mut db,
            &ada,
            "2025-01-01T00:00:00Z",
            Some("2025-12-31T23:59:59Z"),
        );

        let err = db
            .create_employment(&ada, &EventAttrs::starting(at("2025-06-01T00:00:00Z")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overlap);

        let next = db
            .create_employment(&ada, &EventAttrs::starting(at("2026-01-01T00:00:00Z")))
            .unwrap();
        assert_eq!(next.event.start_time, at("2026-01-01T00:00:00Z"));
        assert_eq!(count_events(&db), 2);
    }

    #[test]
    fn sub_millisecond_times_are_validated_as_stored() {
        let mut db = seeded();
        let ada = person(&mut db, "Ada");

        let err = db
            .create_employment(
                &ada,
                &EventAttrs::spanning(
                    at("2025-02-01T00:00:00.000100Z"),
                    at("2025-02-01T00:00:00.000900Z"),
                ),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(count_events(&db), 0);

        let created = db
            .create_employment(&ada, &EventAttrs::starting(at("2025-02-01T00:00:00.123456Z")))
            .unwrap();
        assert_eq!(created.event.start_time, at("2025-02-01T00:00:00.123Z"));
        let stored = db.get_event(&created.event.id).unwrap();
        assert_eq!(stored.start_time, created.event.start_time);
    }

    #[test]
    fn ended_employment_does_not_block_a_new_one() {
        let mut db = seeded();
        let ada = person(&mut db, "Ada");
        let first = employment(&mut db, &ada, "2025-01-01T00:00:00Z", None);
        db.update_event(
            &first,
            &EventAttrs::default()
                .ending(Some(at("2025-03-01T00:00:00Z")))
                .with_status("ended"),
        )
        .unwrap();
        employment(&mut db, &ada, "2025-02-01T00:00:00Z", None);
    }

    #[test]
    fn shift_must_fit_employment() {
        let mut db = seeded();
        let ada = person(&mut db, "Ada");
        let job = employment(
            &mut db,
            &ada,
            "2025-01-01T00:00:00Z",
            Some("2025-01-02T00:00:00Z"),
        );
        let err = db
            .create_shift(
                &job,
                &ada,
                &shift_attrs("2025-01-02T06:00:00Z", "2025-01-02T14:00:00Z"),
                false,
            )
            .unwrap_err();
        match err {
            DbError::Containment(err) => {
                assert_eq!(err.reason, ContainmentReason::StartsAfterEnd);
                assert_eq!(err.to_string(), "shift starts after employment ends");
            }
            other => panic!("expected containment error, got {other:?}"),
        }
        assert_eq!(count_events(&db), 1);
    }

    #[test]
    fn auto_split_creates_three_children() {
        let mut db = seeded();
        let ada = person(&mut db, "Ada");
        let job = employment(&mut db, &ada, "2025-01-01T00:00:00Z", None);
        let created = db
            .create_shift(
                &job,
                &ada,
                &shift_attrs("2025-06-02T09:00:00Z", "2025-06-02T17:00:00Z"),
                true,
            )
            .unwrap();

        let kinds: Vec<_> = created.periods.iter().map(|p| p.event_type.as_str()).collect();
        assert_eq!(kinds, ["work_period", "break", "work_period"]);
        assert_eq!(created.periods[1].event.property_bool("is_paid"), Some(false));
        assert!(created.periods.iter().all(|p| {
            p.event.parent_id.as_ref() == Some(&created.shift.event.id)
                && p.participations.len() == 1
                && p.participations[0].participant_id == ada
        }));

        let hours = db.shift_hours(&created.shift.event.id).unwrap();
        assert!((hours.worked - 7.5).abs() < 1e-9);
        assert!((hours.breaks - 0.5).abs() < 1e-9);
        assert!((hours.net - 7.5).abs() < 1e-9);
    }

    #[test]
    fn short_shift_gets_one_work_period() {
        let mut db = seeded();
        let ada = person(&mut db, "Ada");
        let job = employment(&mut db, &ada, "2025-01-01T00:00:00Z", None);
        let created = db
            .create_shift(
                &job,
                &ada,
                &shift_attrs("2025-06-02T09:00:00Z", "2025-06-02T12:00:00Z"),
                true,
            )
            .unwrap();
        assert_eq!(created.periods.len(), 1);
        let hours = db.shift_hours(&created.shift.event.id).unwrap();
        assert!((hours.worked - 3.0).abs() < 1e-9);
        assert!(hours.breaks.abs() < 1e-9);
    }

    #[test]
    fn auto_periods_clip_the_break_on_barely_long_shifts() {
        let slots = auto_periods(at("2025-06-02T09:00:00Z"), at("2025-06-02T13:15:00Z"));
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].kind, EventKind::Break);
        assert_eq!(slots[1].end, at("2025-06-02T13:15:00Z"));

        let exact = auto_periods(at("2025-06-02T09:00:00Z"), at("2025-06-02T13:00:00Z"));
        assert_eq!(exact.len(), 1);
    }

    #[test]
    fn overlapping_shifts_are_rejected_unless_cancelled() {
        let mut db = seeded();
        let ada = person(&mut db, "Ada");
        let job = employment(&mut db, &ada, "2025-01-01T00:00:00Z", None);
        let first = db
            .create_shift(
                &job,
                &ada,
                &shift_attrs("2025-06-02T09:00:00Z", "2025-06-02T17:00:00Z"),
                false,
            )
            .unwrap();
        let overlapping = shift_attrs("2025-06-02T16:00:00Z", "2025-06-02T20:00:00Z");
        let err = db.create_shift(&job, &ada, &overlapping, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overlap);

        // Back-to-back is fine.
        db.create_shift(
            &job,
            &ada,
            &shift_attrs("2025-06-02T17:00:00Z", "2025-06-02T18:00:00Z"),
            false,
        )
        .unwrap();

        db.update_event(
            &first.shift.event.id,
            &EventAttrs::default().with_status("cancelled"),
        )
        .unwrap();
        db.create_shift(
            &job,
            &ada,
            &shift_attrs("2025-06-02T10:00:00Z", "2025-06-02T16:00:00Z"),
            false,
        )
        .unwrap();
    }

    #[test]
    fn shift_worker_must_hold_the_employment() {
        let mut db = seeded();
        let ada = person(&mut db, "Ada");
        let bob = person(&mut db, "Bob");
        let job = employment(&mut db, &ada, "2025-01-01T00:00:00Z", None);
        let err = db
            .create_shift(
                &job,
                &bob,
                &shift_attrs("2025-06-02T09:00:00Z", "2025-06-02T17:00:00Z"),
                false,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn shift_requires_end_time_and_employment_kind() {
        let mut db = seeded();
        let ada = person(&mut db, "Ada");
        let job = employment(&mut db, &ada, "2025-01-01T00:00:00Z", None);
        let open = EventAttrs::starting(at("2025-06-02T09:00:00Z")).field("location", "Depot");
        let err = db.create_shift(&job, &ada, &open, false).unwrap_err();
        assert!(matches!(
            err,
            DbError::Validation(ValidationError::MissingField { ref field }) if field == "end_time"
        ));

        let timeless = EventAttrs::default().field("location", "Depot");
        let err = db.create_shift(&job, &ada, &timeless, false).unwrap_err();
        assert!(matches!(
            err,
            DbError::Validation(ValidationError::MissingField { ref field }) if field == "start_time"
        ));

        let shift = db
            .create_shift(
                &job,
                &ada,
                &shift_attrs("2025-06-02T09:00:00Z", "2025-06-02T17:00:00Z"),
                false,
            )
            .unwrap();
        let err = db
            .create_shift(
                &shift.shift.event.id,
                &ada,
                &shift_attrs("2025-06-03T09:00:00Z", "2025-06-03T17:00:00Z"),
                false,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let missing = EventId::new("missing").unwrap();
        let err = db
            .create_shift(
                &missing,
                &ada,
                &shift_attrs("2025-06-03T09:00:00Z", "2025-06-03T17:00:00Z"),
                false,
            )
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { kind: "employment", .. }));
    }

    #[test]
    fn failed_operation_leaves_no_orphans() {
        let mut db = seeded();
        let ghost = EntityId::new("ghost").unwrap();
        let err = db
            .create_employment(&ghost, &EventAttrs::starting(at("2025-01-01T00:00:00Z")))
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { kind: "entity", .. }));
        assert_eq!(count_events(&db), 0);
        assert!(db.list_events(&EventFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn shift_children_inherit_the_worker() {
        let mut db = seeded();
        let ada = person(&mut db, "Ada");
        let job = employment(&mut db, &ada, "2025-01-01T00:00:00Z", None);
        let shift = db
            .create_shift(
                &job,
                &ada,
                &shift_attrs("2025-06-02T09:00:00Z", "2025-06-02T17:00:00Z"),
                false,
            )
            .unwrap()
            .shift
            .event
            .id;

        let task = db
            .add_task(
                &shift,
                &EventAttrs::spanning(at("2025-06-02T10:00:00Z"), at("2025-06-02T11:00:00Z"))
                    .field("title", "Restock aisle 4"),
            )
            .unwrap();
        assert_eq!(task.participations[0].participant_id, ada);
        assert_eq!(task.participations[0].participation_type, WORKER);

        let brk = db
            .add_break(
                &shift,
                &EventAttrs::spanning(at("2025-06-02T12:00:00Z"), at("2025-06-02T12:30:00Z")),
            )
            .unwrap();
        assert_eq!(brk.event.property_bool("is_paid"), Some(false));

        let err = db
            .add_work_period(
                &shift,
                &EventAttrs::spanning(at("2025-06-02T16:00:00Z"), at("2025-06-02T18:00:00Z")),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Containment);

        let err = db
            .add_task(
                &shift,
                &EventAttrs::spanning(at("2025-06-02T10:00:00Z"), at("2025-06-02T11:00:00Z")),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn clock_period_pairs_punches_and_matches_shift() {
        let mut db = seeded();
        let ada = person(&mut db, "Ada");
        let job = employment(&mut db, &ada, "2025-01-01T00:00:00Z", None);
        let shift = db
            .create_shift(
                &job,
                &ada,
                &shift_attrs("2025-06-02T09:00:00Z", "2025-06-02T17:00:00Z"),
                false,
            )
            .unwrap()
            .shift
            .event
            .id;

        let punch_in = db
            .clock_in(
                &ada,
                &ClockOptions {
                    at: Some(at("2025-06-02T08:58:00Z")),
                    source: Some("kiosk".into()),
                    ..ClockOptions::default()
                },
            )
            .unwrap();
        assert_eq!(punch_in.event.property_str("direction"), Some("in"));
        assert_eq!(punch_in.event.property_str("source"), Some("kiosk"));
        assert_eq!(
            punch_in.event.end_time,
            Some(at("2025-06-02T08:58:01Z"))
        );

        // Clock-in before the shift starts: no match.
        let punch_out = db
            .clock_out(
                &ada,
                &ClockOptions {
                    at: Some(at("2025-06-02T17:02:00Z")),
                    ..ClockOptions::default()
                },
            )
            .unwrap();
        let created = db
            .create_clock_period(&ada, &punch_in.event.id, &punch_out.event.id)
            .unwrap();
        assert_eq!(created.matched_shift, None);
        assert!(created.period.event.property_str("shift_id").is_none());
        assert_eq!(created.period.event.start_time, at("2025-06-02T08:58:00Z"));
        assert_eq!(created.period.event.end_time, Some(at("2025-06-02T17:02:00Z")));

        // Punches cannot be reused.
        let err = db
            .create_clock_period(&ada, &punch_in.event.id, &punch_out.event.id)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let late_in = db
            .clock_in(
                &ada,
                &ClockOptions {
                    at: Some(at("2025-06-02T09:05:00Z")),
                    ..ClockOptions::default()
                },
            )
            .unwrap();
        let late_out = db
            .clock_out(
                &ada,
                &ClockOptions {
                    at: Some(at("2025-06-02T16:55:00Z")),
                    ..ClockOptions::default()
                },
            )
            .unwrap();
        let created = db
            .create_clock_period(&ada, &late_in.event.id, &late_out.event.id)
            .unwrap();
        assert_eq!(created.matched_shift.as_ref(), Some(&shift));
        assert_eq!(
            created.period.event.property_str("shift_id"),
            Some(shift.as_str())
        );
    }

    #[test]
    fn clock_period_rejects_bad_punches() {
        let mut db = seeded();
        let ada = person(&mut db, "Ada");
        let bob = person(&mut db, "Bob");
        let opts = |time: &str| ClockOptions {
            at: Some(at(time)),
            ..ClockOptions::default()
        };
        let ada_in = db.clock_in(&ada, &opts("2025-06-02T09:00:00Z")).unwrap().event.id;
        let ada_out = db.clock_out(&ada, &opts("2025-06-02T17:00:00Z")).unwrap().event.id;
        let early_out = db.clock_out(&ada, &opts("2025-06-02T08:00:00Z")).unwrap().event.id;

        // Swapped directions.
        let err = db.create_clock_period(&ada, &ada_out, &ada_in).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        // Out before in.
        let err = db.create_clock_period(&ada, &ada_in, &early_out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        // Someone else's punches.
        let err = db.create_clock_period(&bob, &ada_in, &ada_out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(count_events(&db), 3);
    }

    #[test]
    fn clock_period_links_are_fixed_on_update() {
        let mut db = seeded();
        let ada = person(&mut db, "Ada");
        let bob = person(&mut db, "Bob");
        let opts = |time: &str| ClockOptions {
            at: Some(at(time)),
            ..ClockOptions::default()
        };
        let ada_in = db.clock_in(&ada, &opts("2025-06-02T09:00:00Z")).unwrap().event.id;
        let ada_out = db.clock_out(&ada, &opts("2025-06-02T17:00:00Z")).unwrap().event.id;
        let bob_in = db.clock_in(&bob, &opts("2025-06-02T09:05:00Z")).unwrap().event.id;
        let period = db
            .create_clock_period(&ada, &ada_in, &ada_out)
            .unwrap()
            .period
            .event
            .id;

        let patches = [
            EventAttrs::default().field("clock_in_id", bob_in.as_str()),
            EventAttrs::default().field("clock_out_id", "no-such-punch"),
            EventAttrs::default().field("shift_id", "some-shift"),
            EventAttrs::default().ending(Some(at("2025-06-02T23:00:00Z"))),
        ];
        for patch in &patches {
            let err = db.update_event(&period, patch).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "patch {patch:?}");
        }
        let stored = db.get_event(&period).unwrap();
        assert_eq!(stored.property_str("clock_in_id"), Some(ada_in.as_str()));
        assert_eq!(stored.end_time, Some(at("2025-06-02T17:00:00Z")));

        let noted = db
            .update_event(&period, &EventAttrs::default().field("notes", "forgot badge"))
            .unwrap();
        assert_eq!(noted.property_str("notes"), Some("forgot badge"));

        // A punch in use keeps its direction and time; an unused one may change.
        let flip = EventAttrs::default().field("direction", "out");
        let err = db.update_event(&ada_in, &flip).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let moved = EventAttrs::spanning(at("2025-06-02T08:00:00Z"), at("2025-06-02T08:00:01Z"));
        let err = db.update_event(&ada_out, &moved).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let flipped = db.update_event(&bob_in, &flip).unwrap();
        assert_eq!(flipped.property_str("direction"), Some("out"));
    }

    #[test]
    fn clock_in_prefers_the_earliest_matching_shift() {
        let mut db = seeded();
        let ada = person(&mut db, "Ada");
        let job = employment(&mut db, &ada, "2025-01-01T00:00:00Z", None);
        let early = db
            .create_shift(
                &job,
                &ada,
                &shift_attrs("2025-06-02T08:00:00Z", "2025-06-02T12:00:00Z"),
                false,
            )
            .unwrap()
            .shift
            .event
            .id;
        // Cancelled shifts skip the overlap check; reactivate one behind its back.
        let late = db
            .create_shift(
                &job,
                &ada,
                &shift_attrs("2025-06-02T10:00:00Z", "2025-06-02T14:00:00Z")
                    .with_status("cancelled"),
                false,
            )
            .unwrap()
            .shift
            .event
            .id;
        db.conn
            .execute(
                "UPDATE events SET status = 'active' WHERE id = ?",
                [late.as_str()],
            )
            .unwrap();

        let opts = |time: &str| ClockOptions {
            at: Some(at(time)),
            ..ClockOptions::default()
        };
        let punch_in = db.clock_in(&ada, &opts("2025-06-02T10:30:00Z")).unwrap().event.id;
        let punch_out = db.clock_out(&ada, &opts("2025-06-02T11:30:00Z")).unwrap().event.id;
        let created = db.create_clock_period(&ada, &punch_in, &punch_out).unwrap();
        assert_eq!(created.matched_shift, Some(early));
    }

    #[test]
    fn payroll_pieces_nest_in_clock_periods() {
        let mut db = seeded();
        let ada = person(&mut db, "Ada");
        let opts = |time: &str| ClockOptions {
            at: Some(at(time)),
            ..ClockOptions::default()
        };
        let punch_in = db.clock_in(&ada, &opts("2025-06-02T09:00:00Z")).unwrap().event.id;
        let punch_out = db.clock_out(&ada, &opts("2025-06-02T18:00:00Z")).unwrap().event.id;
        let period = db
            .create_clock_period(&ada, &punch_in, &punch_out)
            .unwrap()
            .period
            .event
            .id;

        let piece = db
            .create_payroll_piece(
                &period,
                &EventAttrs::spanning(at("2025-06-02T09:00:00Z"), at("2025-06-02T17:00:00Z"))
                    .field("cost_center", "CC-100"),
            )
            .unwrap();
        assert!(piece.participations.is_empty());
        assert_eq!(piece.event.property_str("rate_type"), Some("regular"));
        db.create_payroll_piece(
            &period,
            &EventAttrs::spanning(at("2025-06-02T17:00:00Z"), at("2025-06-02T18:00:00Z"))
                .field("rate_type", "overtime"),
        )
        .unwrap();

        let err = db
            .create_payroll_piece(
                &period,
                &EventAttrs::spanning(at("2025-06-02T17:00:00Z"), at("2025-06-02T19:00:00Z")),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Containment);

        let totals = db.hours_by_rate_type(&period).unwrap();
        assert_eq!(totals.len(), 2);
        assert!((totals["regular"] - 8.0).abs() < 1e-9);
        assert!((totals["overtime"] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn update_keeps_children_inside() {
        let mut db = seeded();
        let ada = person(&mut db, "Ada");
        let job = employment(&mut db, &ada, "2025-01-01T00:00:00Z", None);
        let created = db
            .create_shift(
                &job,
                &ada,
                &shift_attrs("2025-06-02T09:00:00Z", "2025-06-02T17:00:00Z"),
                true,
            )
            .unwrap();
        let shift = created.shift.event.id;

        let err = db
            .update_event(
                &shift,
                &EventAttrs::default().ending(Some(at("2025-06-02T15:00:00Z"))),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Containment);

        let updated = db
            .update_event(
                &shift,
                &EventAttrs::default()
                    .ending(Some(at("2025-06-02T18:00:00Z")))
                    .field("notes", "stayed late"),
            )
            .unwrap();
        assert_eq!(updated.end_time, Some(at("2025-06-02T18:00:00Z")));
        assert_eq!(updated.property_str("location"), Some("Warehouse 3"));
        assert_eq!(updated.property_str("notes"), Some("stayed late"));

        let err = db
            .update_event(&shift, &EventAttrs::default().field("location", Value::Null))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn update_rechecks_employment_overlap() {
        let mut db = seeded();
        let ada = person(&mut db, "Ada");
        let first = employment(
            &mut db,
            &ada,
            "2025-01-01T00:00:00Z",
            Some("2025-03-01T00:00:00Z"),
        );
        employment(&mut db, &ada, "2025-03-01T00:00:00Z", None);

        let err = db
            .update_event(
                &first,
                &EventAttrs::default().ending(Some(at("2025-04-01T00:00:00Z"))),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overlap);

        // Shrinking the employment itself does not collide with itself.
        db.update_event(
            &first,
            &EventAttrs::default().ending(Some(at("2025-02-01T00:00:00Z"))),
        )
        .unwrap();
    }

    #[test]
    fn participations_can_be_added_and_removed() {
        let mut db = seeded();
        let ada = person(&mut db, "Ada");
        let lead = person(&mut db, "Lead");
        let job = employment(&mut db, &ada, "2025-01-01T00:00:00Z", None);
        let shift = db
            .create_shift(
                &job,
                &ada,
                &shift_attrs("2025-06-02T09:00:00Z", "2025-06-02T17:00:00Z"),
                false,
            )
            .unwrap()
            .shift;

        let supervisor = db
            .add_participation(
                &lead,
                &shift.event.id,
                &ParticipationAttrs::new("supervisor")
                    .bounded(Some(at("2025-06-02T12:00:00Z")), None),
            )
            .unwrap();
        assert_eq!(supervisor.start_time, Some(at("2025-06-02T12:00:00Z")));

        let err = db
            .add_participation(
                &lead,
                &shift.event.id,
                &ParticipationAttrs::new("trainer").bounded(
                    Some(at("2025-06-02T16:00:00Z")),
                    Some(at("2025-06-02T18:00:00Z")),
                ),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Containment);

        let err = db
            .add_participation(&lead, &shift.event.id, &ParticipationAttrs::new("supervisor"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        db.remove_participation(&supervisor.id).unwrap();
        let err = db
            .remove_participation(&shift.participations[0].id)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(db.participations_for_event(&shift.event.id).unwrap().len(), 1);
    }

    #[test]
    fn hooks_fire_only_after_commit() {
        let mut db = seeded();
        let seen: Arc<Mutex<Vec<ChangeNotice>>> = Arc::default();
        let sink = Arc::clone(&seen);
        db.add_commit_hook(Box::new(move |changes: &[ChangeNotice]| {
            sink.lock().unwrap().extend_from_slice(changes);
        }));

        let ada = person(&mut db, "Ada");
        assert!(seen.lock().unwrap().is_empty(), "entities emit no notices");

        let job = employment(&mut db, &ada, "2025-01-01T00:00:00Z", None);
        db.create_shift(
            &job,
            &ada,
            &shift_attrs("2025-06-02T09:00:00Z", "2025-06-02T17:00:00Z"),
            true,
        )
        .unwrap();
        {
            let seen = seen.lock().unwrap();
            let types: Vec<_> = seen.iter().map(|n| n.event_type.as_str()).collect();
            assert_eq!(
                types,
                ["employment", "shift", "work_period", "break", "work_period"]
            );
            assert!(seen.iter().all(|n| n.kind == ChangeKind::Created));
        }

        // Rejected operation: nothing new.
        assert!(
            db.create_employment(&ada, &EventAttrs::starting(at("2025-02-01T00:00:00Z")))
                .is_err()
        );
        assert_eq!(seen.lock().unwrap().len(), 5);

        db.delete_event(&job).unwrap();
        let last = seen.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.kind, ChangeKind::Deleted);
        assert_eq!(last.event_id, job);
    }

    #[test]
    fn entity_lifecycle_through_operations() {
        let mut db = seeded();
        let ada = person(&mut db, "Ada");
        let patch = EntityPatch {
            entity_type: None,
            properties: json!({"name": null, "badge": "A-17"})
                .as_object()
                .cloned()
                .unwrap(),
        };
        let updated = db.update_entity(&ada, &patch).unwrap();
        assert!(!updated.properties.contains_key("name"));
        assert_eq!(updated.properties["badge"], "A-17");

        employment(&mut db, &ada, "2025-01-01T00:00:00Z", None);
        db.delete_entity(&ada).unwrap();
        assert!(db.participations_for_entity(&ada).unwrap().is_empty());
        assert_eq!(db.get_entity(&ada).unwrap_err().kind(), ErrorKind::NotFound);
    }
}
