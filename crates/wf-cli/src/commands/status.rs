//! Status command for showing what the database holds.

use std::io::Write;

use anyhow::Result;
use wf_db::Database;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config) -> Result<()> {
    let entities = db.list_entities(None)?;
    let counts = db.event_counts_by_type()?;

    writeln!(writer, "Workforce status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Entities: {}", entities.len())?;

    let total: i64 = counts.iter().map(|count| count.count).sum();
    if total == 0 {
        writeln!(writer, "No events recorded.")?;
        return Ok(());
    }

    writeln!(writer, "Events:")?;
    for count in counts.iter().filter(|count| count.count > 0) {
        writeln!(writer, "- {}: {}", count.name, count.count)?;
    }

    Ok(())
}
