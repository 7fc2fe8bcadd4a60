//! Payroll commands.

use std::io::Write;

use anyhow::{Context, Result};
use serde_json::Value;
use wf_core::{EventAttrs, EventId};
use wf_db::Database;

use super::util::{with_fields, write_json};
use crate::cli::SpanArgs;

/// Options for `wf payroll add`.
#[derive(Debug, Clone, Copy)]
pub struct AddPiece<'a> {
    pub clock_period: &'a str,
    pub span: &'a SpanArgs,
    pub rate_type: Option<&'a str>,
    pub cost_center: Option<&'a str>,
    pub job_code: Option<&'a str>,
}

pub fn add<W: Write>(writer: &mut W, db: &mut Database, opts: AddPiece<'_>) -> Result<()> {
    let clock_period = EventId::new(opts.clock_period)?;
    let attrs = with_fields(
        EventAttrs::spanning(opts.span.start, opts.span.end),
        Default::default(),
        &[
            ("rate_type", opts.rate_type.map(Value::from)),
            ("cost_center", opts.cost_center.map(Value::from)),
            ("job_code", opts.job_code.map(Value::from)),
        ],
    );
    let created = db
        .create_payroll_piece(&clock_period, &attrs)
        .with_context(|| format!("failed to add payroll piece to {clock_period}"))?;
    write_json(writer, &created)
}
