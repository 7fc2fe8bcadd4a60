//! Entity commands: create, list and show participants.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use wf_core::{Entity, EntityId, Participation};
use wf_db::Database;

use super::util::{parse_props, write_json};

/// Creates an entity; `name` is stored as the `name` property.
pub fn create<W: Write>(
    writer: &mut W,
    db: &mut Database,
    entity_type: &str,
    name: Option<&str>,
    props: &[String],
) -> Result<()> {
    let mut properties = parse_props(props)?;
    if let Some(name) = name {
        properties.insert("name".to_string(), Value::from(name));
    }
    let entity = db
        .create_entity(entity_type, properties)
        .context("failed to create entity")?;
    write_json(writer, &entity)
}

pub fn list<W: Write>(writer: &mut W, db: &Database, entity_type: Option<&str>) -> Result<()> {
    let entities = db.list_entities(entity_type)?;
    write_json(writer, &entities)
}

#[derive(Debug, Serialize)]
struct EntityDetail {
    #[serde(flatten)]
    entity: Entity,
    participations: Vec<Participation>,
}

pub fn show<W: Write>(writer: &mut W, db: &Database, id: &str) -> Result<()> {
    let id = EntityId::new(id)?;
    let entity = db.get_entity(&id)?;
    let participations = db.participations_for_entity(&id)?;
    write_json(
        writer,
        &EntityDetail {
            entity,
            participations,
        },
    )
}
