//! Event inspection.

use std::io::Write;

use anyhow::Result;
use wf_core::EventId;
use wf_db::{Database, EventIncludes};

use super::util::write_json;

/// Prints an event with its neighbours, or its whole subtree with `tree`.
pub fn show<W: Write>(writer: &mut W, db: &Database, id: &str, tree: bool) -> Result<()> {
    let id = EventId::new(id)?;
    if tree {
        write_json(writer, &db.event_tree(&id)?)
    } else {
        write_json(writer, &db.event_view(&id, EventIncludes::ALL)?)
    }
}
