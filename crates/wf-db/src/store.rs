//! Generic row stores for entities, events and participations.
//!
//! These functions know nothing about shifts or employment: they check only
//! required fields, time ordering, type-name format and foreign-key existence.
//! The module is crate-private; everything outside the crate writes through
//! the domain operations in [`crate::ops`].

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::Value;
use uuid::Uuid;
use wf_core::types::validate_type_name;
use wf_core::{
    Entity, EntityId, EntityPatch, Event, EventId, EventStatus, EventTypeId, Participation,
    ParticipationAttrs, ParticipationId, Properties, ValidatedEvent, ValidationError,
};

use crate::{DbError, format_timestamp, parse_optional_timestamp, parse_timestamp};

pub(crate) const ENTITY_COLUMNS: &str = "id, entity_type, properties, created_at, updated_at";

pub(crate) const EVENT_COLUMNS: &str = "e.id, e.event_type_id, e.parent_id, e.start_time, e.end_time, e.status, e.properties, e.created_at, e.updated_at";

pub(crate) const PARTICIPATION_COLUMNS: &str = "id, participant_id, event_id, participation_type, role, start_time, end_time, properties, created_at";

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn json_text(properties: &Properties) -> String {
    Value::Object(properties.clone()).to_string()
}

pub(crate) fn parse_properties(text: &str, record_id: &str) -> Result<Properties, DbError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(DbError::InvalidRow {
            record_id: record_id.to_string(),
            message: "properties is not a JSON object".to_string(),
        }),
        Err(err) => Err(DbError::InvalidRow {
            record_id: record_id.to_string(),
            message: err.to_string(),
        }),
    }
}

pub(crate) fn stored_id<T>(
    make: impl FnOnce(String) -> Result<T, ValidationError>,
    value: String,
    record_id: &str,
) -> Result<T, DbError> {
    make(value).map_err(|err| DbError::InvalidRow {
        record_id: record_id.to_string(),
        message: err.to_string(),
    })
}

// ========== Entities ==========

#[derive(Debug)]
struct EntityRow {
    id: String,
    entity_type: String,
    properties: String,
    created_at: String,
    updated_at: String,
}

impl EntityRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            entity_type: row.get(1)?,
            properties: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    fn into_entity(self) -> Result<Entity, DbError> {
        Ok(Entity {
            properties: parse_properties(&self.properties, &self.id)?,
            created_at: parse_timestamp(&self.created_at, &self.id)?,
            updated_at: parse_timestamp(&self.updated_at, &self.id)?,
            entity_type: self.entity_type,
            id: stored_id(EntityId::new, self.id.clone(), &self.id)?,
        })
    }
}

pub(crate) fn insert_entity(
    conn: &Connection,
    entity_type: &str,
    properties: &Properties,
) -> Result<Entity, DbError> {
    validate_type_name("entity_type", entity_type)?;
    let id = new_id();
    let now = format_timestamp(Utc::now());
    conn.execute(
        "INSERT INTO entities (id, entity_type, properties, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        params![id, entity_type, json_text(properties), now, now],
    )?;
    get_entity(conn, &EntityId::new(id)?)
}

pub(crate) fn find_entity(conn: &Connection, id: &EntityId) -> Result<Option<Entity>, DbError> {
    let row = conn
        .query_row(
            &format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE id = ?"),
            [id.as_str()],
            EntityRow::read,
        )
        .optional()?;
    row.map(EntityRow::into_entity).transpose()
}

pub(crate) fn get_entity(conn: &Connection, id: &EntityId) -> Result<Entity, DbError> {
    find_entity(conn, id)?.ok_or_else(|| DbError::not_found("entity", id))
}

pub(crate) fn entity_exists(conn: &Connection, id: &EntityId) -> Result<bool, DbError> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM entities WHERE id = ?", [id.as_str()], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn update_entity(
    conn: &Connection,
    id: &EntityId,
    patch: &EntityPatch,
) -> Result<Entity, DbError> {
    let mut entity = get_entity(conn, id)?;
    if let Some(entity_type) = &patch.entity_type {
        validate_type_name("entity_type", entity_type)?;
        entity.entity_type.clone_from(entity_type);
    }
    patch.merge_into(&mut entity.properties);
    conn.execute(
        "UPDATE entities SET entity_type = ?, properties = ?, updated_at = ? WHERE id = ?",
        params![
            entity.entity_type,
            json_text(&entity.properties),
            format_timestamp(Utc::now()),
            id.as_str(),
        ],
    )?;
    get_entity(conn, id)
}

/// Hard delete; participations cascade.
pub(crate) fn delete_entity(conn: &Connection, id: &EntityId) -> Result<(), DbError> {
    let deleted = conn.execute("DELETE FROM entities WHERE id = ?", [id.as_str()])?;
    if deleted == 0 {
        return Err(DbError::not_found("entity", id));
    }
    Ok(())
}

pub(crate) fn list_entities(
    conn: &Connection,
    entity_type: Option<&str>,
) -> Result<Vec<Entity>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "
        SELECT {ENTITY_COLUMNS}
        FROM entities
        WHERE ?1 IS NULL OR entity_type = ?1
        ORDER BY created_at ASC, id ASC
        "
    ))?;
    let rows = stmt.query_map([entity_type], EntityRow::read)?;
    let mut entities = Vec::new();
    for row in rows {
        entities.push(row?.into_entity()?);
    }
    Ok(entities)
}

// ========== Events ==========

/// Raw event columns, in [`EVENT_COLUMNS`] order.
#[derive(Debug)]
pub(crate) struct EventRow {
    id: String,
    event_type_id: String,
    parent_id: Option<String>,
    start_time: String,
    end_time: Option<String>,
    status: String,
    properties: String,
    created_at: String,
    updated_at: String,
}

impl EventRow {
    pub(crate) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            event_type_id: row.get(1)?,
            parent_id: row.get(2)?,
            start_time: row.get(3)?,
            end_time: row.get(4)?,
            status: row.get(5)?,
            properties: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    pub(crate) fn into_event(self) -> Result<Event, DbError> {
        let record_id = self.id.as_str();
        let status = self.status.parse::<EventStatus>().map_err(|err| DbError::InvalidRow {
            record_id: record_id.to_string(),
            message: err.to_string(),
        })?;
        Ok(Event {
            id: stored_id(EventId::new, self.id.clone(), record_id)?,
            event_type_id: stored_id(EventTypeId::new, self.event_type_id, record_id)?,
            parent_id: self
                .parent_id
                .map(|parent| stored_id(EventId::new, parent, record_id))
                .transpose()?,
            start_time: parse_timestamp(&self.start_time, record_id)?,
            end_time: parse_optional_timestamp(self.end_time.as_deref(), record_id)?,
            status,
            properties: parse_properties(&self.properties, record_id)?,
            created_at: parse_timestamp(&self.created_at, record_id)?,
            updated_at: parse_timestamp(&self.updated_at, record_id)?,
        })
    }
}

fn check_time_order(validated: &ValidatedEvent) -> Result<(), ValidationError> {
    match validated.end_time {
        Some(end) if end <= validated.start_time => Err(ValidationError::EndNotAfterStart {
            start: validated.start_time.to_rfc3339(),
            end: end.to_rfc3339(),
        }),
        _ => Ok(()),
    }
}

pub(crate) fn insert_event(
    conn: &Connection,
    event_type_id: &EventTypeId,
    parent_id: Option<&EventId>,
    validated: &ValidatedEvent,
) -> Result<Event, DbError> {
    check_time_order(validated)?;
    let type_exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM event_types WHERE id = ?",
            [event_type_id.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    if type_exists.is_none() {
        return Err(DbError::not_found("event type", event_type_id));
    }
    if let Some(parent_id) = parent_id {
        if find_event(conn, parent_id)?.is_none() {
            return Err(DbError::not_found("event", parent_id));
        }
    }

    let id = new_id();
    let now = format_timestamp(Utc::now());
    conn.execute(
        "
        INSERT INTO events
        (id, event_type_id, parent_id, start_time, end_time, status, properties, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ",
        params![
            id,
            event_type_id.as_str(),
            parent_id.map(EventId::as_str),
            format_timestamp(validated.start_time),
            validated.end_time.map(format_timestamp),
            validated.status.as_str(),
            json_text(&validated.properties),
            now,
            now,
        ],
    )?;
    get_event(conn, &EventId::new(id)?)
}

pub(crate) fn find_event(conn: &Connection, id: &EventId) -> Result<Option<Event>, DbError> {
    let row = conn
        .query_row(
            &format!("SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = ?"),
            [id.as_str()],
            EventRow::read,
        )
        .optional()?;
    row.map(EventRow::into_event).transpose()
}

pub(crate) fn get_event(conn: &Connection, id: &EventId) -> Result<Event, DbError> {
    find_event(conn, id)?.ok_or_else(|| DbError::not_found("event", id))
}

pub(crate) fn update_event(
    conn: &Connection,
    id: &EventId,
    validated: &ValidatedEvent,
) -> Result<Event, DbError> {
    check_time_order(validated)?;
    let updated = conn.execute(
        "
        UPDATE events
        SET start_time = ?, end_time = ?, status = ?, properties = ?, updated_at = ?
        WHERE id = ?
        ",
        params![
            format_timestamp(validated.start_time),
            validated.end_time.map(format_timestamp),
            validated.status.as_str(),
            json_text(&validated.properties),
            format_timestamp(Utc::now()),
            id.as_str(),
        ],
    )?;
    if updated == 0 {
        return Err(DbError::not_found("event", id));
    }
    get_event(conn, id)
}

/// Deletes an event; children are orphaned and participations cascade.
pub(crate) fn delete_event(conn: &Connection, id: &EventId) -> Result<(), DbError> {
    let deleted = conn.execute("DELETE FROM events WHERE id = ?", [id.as_str()])?;
    if deleted == 0 {
        return Err(DbError::not_found("event", id));
    }
    Ok(())
}

fn collect_events(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Event>, DbError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, EventRow::read)?;
    let mut events = Vec::new();
    for row in rows {
        events.push(row?.into_event()?);
    }
    Ok(events)
}

/// Direct children with their type names, ordered by start time.
pub(crate) fn children_with_types(
    conn: &Connection,
    parent_id: &EventId,
) -> Result<Vec<(Event, String)>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "
        SELECT {EVENT_COLUMNS}, t.name
        FROM events e
        JOIN event_types t ON t.id = e.event_type_id
        WHERE e.parent_id = ?
        ORDER BY e.start_time ASC, e.id ASC
        "
    ))?;
    let rows = stmt.query_map([parent_id.as_str()], |row| {
        Ok((EventRow::read(row)?, row.get::<_, String>(9)?))
    })?;
    let mut children = Vec::new();
    for row in rows {
        let (event, type_name) = row?;
        children.push((event.into_event()?, type_name));
    }
    Ok(children)
}

/// Events of one type that an entity participates in with the given participation type.
pub(crate) fn events_with_participant(
    conn: &Connection,
    participant_id: &EntityId,
    participation_type: &str,
    event_type_id: &EventTypeId,
) -> Result<Vec<Event>, DbError> {
    collect_events(
        conn,
        &format!(
            "
            SELECT {EVENT_COLUMNS}
            FROM events e
            JOIN participations p ON p.event_id = e.id
            WHERE p.participant_id = ? AND p.participation_type = ? AND e.event_type_id = ?
            ORDER BY e.start_time ASC, e.id ASC
            "
        ),
        params![
            participant_id.as_str(),
            participation_type,
            event_type_id.as_str()
        ],
    )
}

/// Events of one type whose properties reference `value` under any of `keys`.
pub(crate) fn events_referencing(
    conn: &Connection,
    event_type_id: &EventTypeId,
    keys: &[&str],
    value: &str,
) -> Result<Vec<Event>, DbError> {
    let mut found = Vec::new();
    for key in keys {
        let path = format!("$.{key}");
        let events = collect_events(
            conn,
            &format!(
                "
                SELECT {EVENT_COLUMNS}
                FROM events e
                WHERE e.event_type_id = ? AND json_extract(e.properties, ?) = ?
                ORDER BY e.start_time ASC, e.id ASC
                "
            ),
            params![event_type_id.as_str(), path, value],
        )?;
        for event in events {
            if !found.iter().any(|existing: &Event| existing.id == event.id) {
                found.push(event);
            }
        }
    }
    Ok(found)
}

// ========== Participations ==========

#[derive(Debug)]
struct ParticipationRow {
    id: String,
    participant_id: String,
    event_id: String,
    participation_type: String,
    role: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    properties: String,
    created_at: String,
}

impl ParticipationRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            participant_id: row.get(1)?,
            event_id: row.get(2)?,
            participation_type: row.get(3)?,
            role: row.get(4)?,
            start_time: row.get(5)?,
            end_time: row.get(6)?,
            properties: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    fn into_participation(self) -> Result<Participation, DbError> {
        let record_id = self.id.as_str();
        Ok(Participation {
            id: stored_id(ParticipationId::new, self.id.clone(), record_id)?,
            participant_id: stored_id(EntityId::new, self.participant_id, record_id)?,
            event_id: stored_id(EventId::new, self.event_id, record_id)?,
            participation_type: self.participation_type,
            role: self.role,
            start_time: parse_optional_timestamp(self.start_time.as_deref(), record_id)?,
            end_time: parse_optional_timestamp(self.end_time.as_deref(), record_id)?,
            properties: parse_properties(&self.properties, record_id)?,
            created_at: parse_timestamp(&self.created_at, record_id)?,
        })
    }
}

/// Inserts a participation after checking both ends exist.
///
/// A duplicate `(participant, event, type)` is rejected by the unique index.
pub(crate) fn insert_participation(
    conn: &Connection,
    participant_id: &EntityId,
    event_id: &EventId,
    attrs: &ParticipationAttrs,
) -> Result<Participation, DbError> {
    attrs.validate()?;
    if !entity_exists(conn, participant_id)? {
        return Err(DbError::not_found("entity", participant_id));
    }
    if find_event(conn, event_id)?.is_none() {
        return Err(DbError::not_found("event", event_id));
    }
    let id = new_id();
    conn.execute(
        &format!("INSERT INTO participations ({PARTICIPATION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"),
        params![
            id,
            participant_id.as_str(),
            event_id.as_str(),
            attrs.participation_type,
            attrs.role,
            attrs.start_time.map(format_timestamp),
            attrs.end_time.map(format_timestamp),
            json_text(&attrs.properties),
            format_timestamp(Utc::now()),
        ],
    )?;
    get_participation(conn, &ParticipationId::new(id)?)
}

pub(crate) fn get_participation(
    conn: &Connection,
    id: &ParticipationId,
) -> Result<Participation, DbError> {
    conn.query_row(
        &format!("SELECT {PARTICIPATION_COLUMNS} FROM participations WHERE id = ?"),
        [id.as_str()],
        ParticipationRow::read,
    )
    .optional()?
    .ok_or_else(|| DbError::not_found("participation", id))?
    .into_participation()
}

/// Deletes a participation and returns the removed row.
pub(crate) fn delete_participation(
    conn: &Connection,
    id: &ParticipationId,
) -> Result<Participation, DbError> {
    let participation = get_participation(conn, id)?;
    conn.execute("DELETE FROM participations WHERE id = ?", [id.as_str()])?;
    Ok(participation)
}

fn collect_participations(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Participation>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PARTICIPATION_COLUMNS} FROM participations WHERE {filter} ORDER BY created_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params, ParticipationRow::read)?;
    let mut participations = Vec::new();
    for row in rows {
        participations.push(row?.into_participation()?);
    }
    Ok(participations)
}

pub(crate) fn participations_for_event(
    conn: &Connection,
    event_id: &EventId,
) -> Result<Vec<Participation>, DbError> {
    collect_participations(conn, "event_id = ?", [event_id.as_str()])
}

pub(crate) fn participations_for_entity(
    conn: &Connection,
    participant_id: &EntityId,
) -> Result<Vec<Participation>, DbError> {
    collect_participations(conn, "participant_id = ?", [participant_id.as_str()])
}

pub(crate) fn find_participation(
    conn: &Connection,
    participant_id: &EntityId,
    event_id: &EventId,
    participation_type: &str,
) -> Result<Option<Participation>, DbError> {
    let mut found = collect_participations(
        conn,
        "participant_id = ? AND event_id = ? AND participation_type = ?",
        params![participant_id.as_str(), event_id.as_str(), participation_type],
    )?;
    Ok(found.pop())
}

/// Entities linked to an event with the given participation type, oldest link first.
pub(crate) fn participants_of(
    conn: &Connection,
    event_id: &EventId,
    participation_type: &str,
) -> Result<Vec<EntityId>, DbError> {
    Ok(collect_participations(
        conn,
        "event_id = ? AND participation_type = ?",
        params![event_id.as_str(), participation_type],
    )?
    .into_iter()
    .map(|p| p.participant_id)
    .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, seeded};
    use crate::registry;
    use serde_json::json;
    use wf_core::participation::WORKER;

    fn props(value: Value) -> Properties {
        value.as_object().cloned().unwrap()
    }

    fn validated(start: &str, end: Option<&str>) -> ValidatedEvent {
        ValidatedEvent {
            start_time: at(start),
            end_time: end.map(at),
            status: EventStatus::Active,
            properties: Properties::new(),
        }
    }

    #[test]
    fn entity_crud_roundtrip() {
        let db = seeded();
        let entity = insert_entity(&db.conn, "person", &props(json!({"name": "Ada"}))).unwrap();
        assert_eq!(entity.entity_type, "person");

        let patch = EntityPatch {
            entity_type: Some("contractor".into()),
            properties: props(json!({"email": "ada@example.com"})),
        };
        let updated = update_entity(&db.conn, &entity.id, &patch).unwrap();
        assert_eq!(updated.entity_type, "contractor");
        assert_eq!(updated.properties.get("name"), Some(&json!("Ada")));
        assert_eq!(updated.properties.get("email"), Some(&json!("ada@example.com")));

        insert_entity(&db.conn, "location", &Properties::new()).unwrap();
        assert_eq!(list_entities(&db.conn, Some("contractor")).unwrap().len(), 1);
        assert_eq!(list_entities(&db.conn, None).unwrap().len(), 2);

        delete_entity(&db.conn, &entity.id).unwrap();
        assert!(matches!(
            get_entity(&db.conn, &entity.id),
            Err(DbError::NotFound { kind: "entity", .. })
        ));
        assert!(matches!(
            delete_entity(&db.conn, &entity.id),
            Err(DbError::NotFound { .. })
        ));
    }

    #[test]
    fn entity_type_format_is_checked() {
        let db = seeded();
        let err = insert_entity(&db.conn, "Person", &Properties::new()).unwrap_err();
        assert!(matches!(
            err,
            DbError::Validation(ValidationError::InvalidTypeName { .. })
        ));
    }

    #[test]
    fn insert_event_checks_foreign_keys() {
        let db = seeded();
        let missing_type = EventTypeId::new("no-such-type").unwrap();
        let err = insert_event(&db.conn, &missing_type, None, &validated("2025-01-01T09:00:00Z", None))
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { kind: "event type", .. }));

        let shift = registry::resolve(&db.conn, "shift").unwrap();
        let missing_parent = EventId::new("no-such-event").unwrap();
        let err = insert_event(
            &db.conn,
            &shift.id,
            Some(&missing_parent),
            &validated("2025-01-01T09:00:00Z", None),
        )
        .unwrap_err();
        assert!(matches!(err, DbError::NotFound { kind: "event", .. }));

        let err = insert_event(
            &db.conn,
            &shift.id,
            None,
            &validated("2025-01-01T09:00:00Z", Some("2025-01-01T08:00:00Z")),
        )
        .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[test]
    fn deleting_parent_orphans_children_and_cascades_participations() {
        let db = seeded();
        let shift = registry::resolve(&db.conn, "shift").unwrap();
        let brk = registry::resolve(&db.conn, "break").unwrap();
        let parent = insert_event(
            &db.conn,
            &shift.id,
            None,
            &validated("2025-01-01T09:00:00Z", Some("2025-01-01T17:00:00Z")),
        )
        .unwrap();
        let child = insert_event(
            &db.conn,
            &brk.id,
            Some(&parent.id),
            &validated("2025-01-01T12:00:00Z", Some("2025-01-01T12:30:00Z")),
        )
        .unwrap();
        let worker = insert_entity(&db.conn, "person", &Properties::new()).unwrap();
        insert_participation(&db.conn, &worker.id, &parent.id, &ParticipationAttrs::new(WORKER))
            .unwrap();

        delete_event(&db.conn, &parent.id).unwrap();

        let child = get_event(&db.conn, &child.id).unwrap();
        assert_eq!(child.parent_id, None);
        assert!(participations_for_entity(&db.conn, &worker.id).unwrap().is_empty());
    }

    #[test]
    fn duplicate_participation_is_a_conflict() {
        let db = seeded();
        let shift = registry::resolve(&db.conn, "shift").unwrap();
        let event = insert_event(
            &db.conn,
            &shift.id,
            None,
            &validated("2025-01-01T09:00:00Z", Some("2025-01-01T17:00:00Z")),
        )
        .unwrap();
        let worker = insert_entity(&db.conn, "person", &Properties::new()).unwrap();
        let attrs = ParticipationAttrs::new(WORKER);

        insert_participation(&db.conn, &worker.id, &event.id, &attrs).unwrap();
        let err = insert_participation(&db.conn, &worker.id, &event.id, &attrs).unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        // A different relationship type to the same event is allowed.
        insert_participation(
            &db.conn,
            &worker.id,
            &event.id,
            &ParticipationAttrs::new("supervisor"),
        )
        .unwrap();
        assert_eq!(participations_for_event(&db.conn, &event.id).unwrap().len(), 2);
        assert_eq!(participants_of(&db.conn, &event.id, WORKER).unwrap(), vec![worker.id]);
    }

    #[test]
    fn participation_requires_existing_entity() {
        let db = seeded();
        let shift = registry::resolve(&db.conn, "shift").unwrap();
        let event = insert_event(
            &db.conn,
            &shift.id,
            None,
            &validated("2025-01-01T09:00:00Z", None),
        )
        .unwrap();
        let ghost = EntityId::new("ghost").unwrap();
        let err = insert_participation(&db.conn, &ghost, &event.id, &ParticipationAttrs::new(WORKER))
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { kind: "entity", .. }));
    }

    #[test]
    fn events_referencing_uses_json_paths() {
        let db = seeded();
        let period = registry::resolve(&db.conn, "clock_period").unwrap();
        let mut attrs = validated("2025-01-01T09:00:00Z", Some("2025-01-01T17:00:00Z"));
        attrs.properties = props(json!({"clock_in_id": "in-1", "clock_out_id": "out-1"}));
        let event = insert_event(&db.conn, &period.id, None, &attrs).unwrap();

        let hits =
            events_referencing(&db.conn, &period.id, &["clock_in_id", "clock_out_id"], "out-1")
                .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, event.id);
        assert!(
            events_referencing(&db.conn, &period.id, &["clock_in_id"], "out-1")
                .unwrap()
                .is_empty()
        );
    }
}
