//! Event type catalog persistence.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::Value;
use tracing::info;
use wf_core::types::validate_type_name;
use wf_core::{EventType, EventTypeDef, EventTypeId, seed_catalog};

use crate::store::{new_id, stored_id};
use crate::{Database, DbError, format_timestamp};

const EVENT_TYPE_COLUMNS: &str =
    "id, name, category, can_nest, can_have_children, requires_participation, schema, rules, is_active";

#[derive(Debug)]
struct EventTypeRow {
    id: String,
    name: String,
    category: String,
    can_nest: bool,
    can_have_children: bool,
    requires_participation: bool,
    schema: String,
    rules: String,
    is_active: bool,
}

impl EventTypeRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            can_nest: row.get(3)?,
            can_have_children: row.get(4)?,
            requires_participation: row.get(5)?,
            schema: row.get(6)?,
            rules: row.get(7)?,
            is_active: row.get(8)?,
        })
    }

    fn into_event_type(self) -> Result<EventType, DbError> {
        let decode = |text: &str| {
            serde_json::from_str::<Value>(text).map_err(|err| DbError::InvalidRow {
                record_id: self.id.clone(),
                message: err.to_string(),
            })
        };
        let schema = decode(&self.schema)?;
        let rules = decode(&self.rules)?;
        Ok(EventType {
            id: stored_id(EventTypeId::new, self.id.clone(), &self.id)?,
            def: EventTypeDef {
                name: self.name,
                category: self.category,
                can_nest: self.can_nest,
                can_have_children: self.can_have_children,
                requires_participation: self.requires_participation,
                schema,
                rules,
                is_active: self.is_active,
            },
        })
    }
}

/// Looks up an active catalog row by name.
pub(crate) fn resolve(conn: &Connection, name: &str) -> Result<EventType, DbError> {
    conn.query_row(
        &format!("SELECT {EVENT_TYPE_COLUMNS} FROM event_types WHERE name = ? AND is_active = 1"),
        [name],
        EventTypeRow::read,
    )
    .optional()?
    .ok_or_else(|| DbError::not_found("event type", name))?
    .into_event_type()
}

pub(crate) fn event_type_by_id(conn: &Connection, id: &EventTypeId) -> Result<EventType, DbError> {
    conn.query_row(
        &format!("SELECT {EVENT_TYPE_COLUMNS} FROM event_types WHERE id = ?"),
        [id.as_str()],
        EventTypeRow::read,
    )
    .optional()?
    .ok_or_else(|| DbError::not_found("event type", id))?
    .into_event_type()
}

/// Inserts a catalog row; a duplicate name is rejected by the unique constraint.
fn insert_event_type(conn: &Connection, def: &EventTypeDef) -> Result<EventType, DbError> {
    validate_type_name("event type name", &def.name)?;
    validate_type_name("category", &def.category)?;
    let id = new_id();
    conn.execute(
        "
        INSERT INTO event_types
        (id, name, category, can_nest, can_have_children, requires_participation, schema, rules, is_active, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ",
        params![
            id,
            def.name,
            def.category,
            def.can_nest,
            def.can_have_children,
            def.requires_participation,
            json_or_empty(&def.schema),
            json_or_empty(&def.rules),
            def.is_active,
            format_timestamp(Utc::now()),
        ],
    )?;
    event_type_by_id(conn, &EventTypeId::new(id)?)
}

fn json_or_empty(value: &Value) -> String {
    if value.is_null() {
        "{}".to_string()
    } else {
        value.to_string()
    }
}

impl Database {
    /// Populates the catalog with the built-in event types.
    ///
    /// Existing names are left untouched, so this is safe to run on every start.
    /// Returns how many rows were added.
    pub fn seed_catalog(&mut self) -> Result<usize, DbError> {
        let added = self.transact("seed_catalog", |tx| {
            let mut added = 0;
            for def in seed_catalog() {
                let exists: Option<i64> = tx
                    .conn()
                    .query_row(
                        "SELECT 1 FROM event_types WHERE name = ?",
                        [def.name.as_str()],
                        |row| row.get(0),
                    )
                    .optional()?;
                if exists.is_none() {
                    insert_event_type(tx.conn(), &def)?;
                    added += 1;
                }
            }
            Ok(added)
        })?;
        if added > 0 {
            info!(added, "seeded event type catalog");
        }
        Ok(added)
    }

    /// Adds a new event type to the catalog.
    ///
    /// Without a matching validator registered, events of this type go through
    /// generic validation only.
    pub fn register_event_type(&mut self, def: &EventTypeDef) -> Result<EventType, DbError> {
        self.transact("register_event_type", |tx| insert_event_type(tx.conn(), def))
    }

    /// Resolves an active event type by name.
    pub fn resolve_event_type(&self, name: &str) -> Result<EventType, DbError> {
        resolve(&self.conn, name)
    }

    /// Every catalog row, active or not, ordered by name.
    pub fn list_event_types(&self) -> Result<Vec<EventType>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EVENT_TYPE_COLUMNS} FROM event_types ORDER BY name ASC"
        ))?;
        let rows = stmt.query_map([], EventTypeRow::read)?;
        let mut types = Vec::new();
        for row in rows {
            types.push(row?.into_event_type()?);
        }
        Ok(types)
    }

    /// Activates or retires an event type. Retired types no longer resolve.
    pub fn set_event_type_active(&mut self, name: &str, active: bool) -> Result<(), DbError> {
        self.transact("set_event_type_active", |tx| {
            let updated = tx.conn().execute(
                "UPDATE event_types SET is_active = ? WHERE name = ?",
                params![active, name],
            )?;
            if updated == 0 {
                return Err(DbError::not_found("event type", name));
            }
            Ok(())
        })
    }
}
