//! Init command: creates the database and reports the event type catalog.

use std::io::Write;

use anyhow::Result;
use wf_db::Database;

use crate::Config;

/// Runs the init command. Opening the database already seeded the catalog.
pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config) -> Result<()> {
    let types = db.list_event_types()?;

    writeln!(writer, "Database:    {}", config.database_path.display())?;
    writeln!(writer, "Event types: {}", types.len())?;
    for event_type in types {
        let flags = [
            (event_type.def.can_nest, "nests"),
            (event_type.def.can_have_children, "parent"),
            (event_type.def.requires_participation, "participants"),
        ]
        .into_iter()
        .filter_map(|(set, label)| set.then_some(label))
        .collect::<Vec<_>>()
        .join(", ");
        writeln!(
            writer,
            "- {:<14} {:<11} {flags}",
            event_type.def.name, event_type.def.category
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    #[test]
    fn init_lists_seeded_catalog() {
        let mut db = Database::open_in_memory().unwrap();
        db.seed_catalog().unwrap();
        let config = Config {
            database_path: "/data/wf.db".into(),
            ..Config::default()
        };

        let mut output = Vec::new();
        run(&mut output, &db, &config).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Database:    /data/wf.db
        Event types: 9
        - break          scheduling  nests, participants
        - clock_event    time_clock  participants
        - clock_period   time_clock  parent, participants
        - employment     employment  parent, participants
        - payroll_piece  payroll     nests
        - schedule       scheduling  parent
        - shift          scheduling  nests, parent, participants
        - task           scheduling  nests, participants
        - work_period    scheduling  nests, participants
        ");
    }
}
