//! Clock commands: punches and clock periods.

use std::io::Write;

use anyhow::{Context, Result};
use tracing::info;
use wf_core::{EntityId, EventId};
use wf_db::{ClockOptions, Database};

use super::util::write_json;
use crate::cli::PunchArgs;

/// Which way a punch goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

fn clock_options(args: &PunchArgs) -> ClockOptions {
    ClockOptions {
        at: args.at,
        source: args.source.clone(),
        location: args.location.clone(),
        notes: args.notes.clone(),
    }
}

pub fn punch<W: Write>(
    writer: &mut W,
    db: &mut Database,
    direction: Direction,
    args: &PunchArgs,
) -> Result<()> {
    let worker = EntityId::new(args.worker.as_str())?;
    let opts = clock_options(args);
    let created = match direction {
        Direction::In => db.clock_in(&worker, &opts),
        Direction::Out => db.clock_out(&worker, &opts),
    }
    .with_context(|| format!("failed to record punch for {worker}"))?;
    write_json(writer, &created)
}

pub fn period<W: Write>(
    writer: &mut W,
    db: &mut Database,
    worker: &str,
    clock_in: &str,
    clock_out: &str,
) -> Result<()> {
    let worker = EntityId::new(worker)?;
    let clock_in = EventId::new(clock_in)?;
    let clock_out = EventId::new(clock_out)?;
    let created = db
        .create_clock_period(&worker, &clock_in, &clock_out)
        .context("failed to create clock period")?;
    if created.matched_shift.is_none() {
        info!(worker = %worker, "clock period does not fall inside a shift");
    }
    write_json(writer, &created)
}
