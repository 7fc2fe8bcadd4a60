//! Read-side queries and derived hours.
//!
//! Reads run outside transactions; aggregation never writes.

use std::collections::{BTreeMap, HashMap};

use rusqlite::params_from_iter;
use serde::Serialize;
use wf_core::hours::{self, EventTree, ShiftHours};
use wf_core::{
    Entity, EntityId, Event, EventId, EventKind, EventStatus, Participation, ParticipationId,
    ValidationError,
};

use crate::store::{self, EVENT_COLUMNS, EventRow};
use crate::{Database, DbError, registry};

/// Filters for [`Database::list_events`]. Set fields combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Event type name.
    pub event_type: Option<String>,
    pub status: Option<EventStatus>,
    pub parent_id: Option<EventId>,
}

/// Related records to load with [`Database::event_view`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventIncludes {
    pub children: bool,
    pub parent: bool,
    pub participations: bool,
}

impl EventIncludes {
    pub const ALL: Self = Self {
        children: true,
        parent: true,
        participations: true,
    };
}

/// An event with whichever related records were requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventView {
    pub event: Event,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Event>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Event>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub participations: Vec<Participation>,
}

/// Number of stored events of one catalog type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    pub name: String,
    pub count: i64,
}

impl Database {
    pub fn get_entity(&self, id: &EntityId) -> Result<Entity, DbError> {
        store::get_entity(&self.conn, id)
    }

    /// Entities in creation order, optionally restricted to one type.
    pub fn list_entities(&self, entity_type: Option<&str>) -> Result<Vec<Entity>, DbError> {
        store::list_entities(&self.conn, entity_type)
    }

    pub fn get_event(&self, id: &EventId) -> Result<Event, DbError> {
        store::get_event(&self.conn, id)
    }

    /// Loads an event together with the requested related records.
    pub fn event_view(&self, id: &EventId, includes: EventIncludes) -> Result<EventView, DbError> {
        let event = store::get_event(&self.conn, id)?;
        let event_type = registry::event_type_by_id(&self.conn, &event.event_type_id)?;
        let parent = match (&event.parent_id, includes.parent) {
            (Some(parent_id), true) => store::find_event(&self.conn, parent_id)?,
            _ => None,
        };
        let children = if includes.children {
            store::children_with_types(&self.conn, id)?
                .into_iter()
                .map(|(child, _)| child)
                .collect()
        } else {
            Vec::new()
        };
        let participations = if includes.participations {
            store::participations_for_event(&self.conn, id)?
        } else {
            Vec::new()
        };
        Ok(EventView {
            event,
            event_type: event_type.def.name,
            parent,
            children,
            participations,
        })
    }

    /// Events matching `filter`, ordered by start time.
    pub fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>, DbError> {
        let mut conditions = Vec::new();
        let mut values: Vec<String> = Vec::new();
        if let Some(event_type) = &filter.event_type {
            conditions.push("t.name = ?");
            values.push(event_type.clone());
        }
        if let Some(status) = filter.status {
            conditions.push("e.status = ?");
            values.push(status.as_str().to_string());
        }
        if let Some(parent_id) = &filter.parent_id {
            conditions.push("e.parent_id = ?");
            values.push(parent_id.to_string());
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let query = format!(
            "
            SELECT {EVENT_COLUMNS}
            FROM events e
            JOIN event_types t ON t.id = e.event_type_id
            {where_clause}
            ORDER BY e.start_time ASC, e.id ASC
            "
        );
        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), EventRow::read)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?.into_event()?);
        }
        Ok(events)
    }

    pub fn get_participation(&self, id: &ParticipationId) -> Result<Participation, DbError> {
        store::get_participation(&self.conn, id)
    }

    pub fn participations_for_event(&self, id: &EventId) -> Result<Vec<Participation>, DbError> {
        store::participations_for_event(&self.conn, id)
    }

    pub fn participations_for_entity(&self, id: &EntityId) -> Result<Vec<Participation>, DbError> {
        store::participations_for_entity(&self.conn, id)
    }

    /// Materialises the subtree rooted at `id`.
    ///
    /// Descendants deeper than the configured `max_tree_depth` are not loaded.
    pub fn event_tree(&self, id: &EventId) -> Result<EventTree, DbError> {
        let max_depth = i64::try_from(self.options.max_tree_depth).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(&format!(
            "
            WITH RECURSIVE tree(id, depth) AS (
                SELECT id, 0 FROM events WHERE id = ?1
                UNION ALL
                SELECT child.id, tree.depth + 1
                FROM events child
                JOIN tree ON child.parent_id = tree.id
                WHERE tree.depth < ?2
            )
            SELECT {EVENT_COLUMNS}, t.name
            FROM tree
            JOIN events e ON e.id = tree.id
            JOIN event_types t ON t.id = e.event_type_id
            ORDER BY tree.depth ASC, e.start_time ASC, e.id ASC
            "
        ))?;
        let rows = stmt.query_map(rusqlite::params![id.as_str(), max_depth], |row| {
            Ok((EventRow::read(row)?, row.get::<_, String>(9)?))
        })?;

        let mut root = None;
        let mut by_parent: HashMap<EventId, Vec<(Event, String)>> = HashMap::new();
        for row in rows {
            let (event, type_name) = row?;
            let event = event.into_event()?;
            if root.is_none() && &event.id == id {
                root = Some((event, type_name));
            } else if let Some(parent_id) = event.parent_id.clone() {
                by_parent
                    .entry(parent_id)
                    .or_default()
                    .push((event, type_name));
            }
        }
        let (event, type_name) = root.ok_or_else(|| DbError::not_found("event", id))?;
        Ok(assemble(event, type_name, &mut by_parent))
    }

    /// Worked, break and net hours for a shift.
    pub fn shift_hours(&self, shift_id: &EventId) -> Result<ShiftHours, DbError> {
        let tree = self.kind_tree(shift_id, EventKind::Shift)?;
        Ok(hours::shift_hours(&tree))
    }

    /// Payroll piece hours of a clock period, grouped by rate type.
    pub fn hours_by_rate_type(
        &self,
        clock_period_id: &EventId,
    ) -> Result<BTreeMap<String, f64>, DbError> {
        let tree = self.kind_tree(clock_period_id, EventKind::ClockPeriod)?;
        Ok(hours::hours_by_rate_type(&tree))
    }

    /// Stored event counts for every catalog type, including empty ones.
    pub fn event_counts_by_type(&self) -> Result<Vec<TypeCount>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT t.name, COUNT(e.id)
            FROM event_types t
            LEFT JOIN events e ON e.event_type_id = t.id
            GROUP BY t.name
            ORDER BY t.name ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(TypeCount {
                name: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    fn kind_tree(&self, id: &EventId, kind: EventKind) -> Result<EventTree, DbError> {
        let tree = self.event_tree(id)?;
        if !tree.is_kind(kind) {
            return Err(ValidationError::invalid(
                kind.as_str(),
                format!("event {id} is a {}, not a {kind}", tree.type_name),
            )
            .into());
        }
        Ok(tree)
    }
}

fn assemble(
    event: Event,
    type_name: String,
    by_parent: &mut HashMap<EventId, Vec<(Event, String)>>,
) -> EventTree {
    let children = by_parent
        .remove(&event.id)
        .unwrap_or_default()
        .into_iter()
        .map(|(child, child_type)| assemble(child, child_type, by_parent))
        .collect();
    EventTree {
        event,
        type_name,
        children,
    }
}
