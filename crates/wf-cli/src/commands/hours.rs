//! Derived hours.

use std::io::Write;

use anyhow::Result;
use wf_core::EventId;
use wf_db::Database;

use super::util::write_json;

pub fn shift<W: Write>(writer: &mut W, db: &Database, id: &str, json: bool) -> Result<()> {
    let id = EventId::new(id)?;
    let hours = db.shift_hours(&id)?;
    if json {
        return write_json(writer, &hours);
    }

    writeln!(writer, "Shift {id}")?;
    writeln!(writer, "Worked:        {:>6.2} h", hours.worked)?;
    writeln!(writer, "Breaks:        {:>6.2} h", hours.breaks)?;
    writeln!(writer, "Unpaid breaks: {:>6.2} h", hours.unpaid_breaks)?;
    writeln!(writer, "Net:           {:>6.2} h", hours.net)?;
    Ok(())
}

pub fn rates<W: Write>(writer: &mut W, db: &Database, id: &str) -> Result<()> {
    let id = EventId::new(id)?;
    write_json(writer, &db.hours_by_rate_type(&id)?)
}
