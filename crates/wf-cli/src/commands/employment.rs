//! Employment commands.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use wf_core::{EntityId, EventAttrs};
use wf_db::Database;

use super::util::{parse_props, with_fields, write_json};

/// Options for `wf employment create`.
#[derive(Debug, Clone, Default)]
pub struct CreateEmployment<'a> {
    pub worker: &'a str,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub role: Option<&'a str>,
    pub contract_type: Option<&'a str>,
    pub props: &'a [String],
}

pub fn create<W: Write>(writer: &mut W, db: &mut Database, opts: &CreateEmployment<'_>) -> Result<()> {
    let worker = EntityId::new(opts.worker)?;
    let attrs = EventAttrs {
        start_time: opts.start,
        end_time: opts.end,
        ..EventAttrs::default()
    };
    let attrs = with_fields(
        attrs,
        parse_props(opts.props)?,
        &[
            ("role", opts.role.map(Value::from)),
            ("contract_type", opts.contract_type.map(Value::from)),
        ],
    );
    let created = db
        .create_employment(&worker, &attrs)
        .with_context(|| format!("failed to create employment for {worker}"))?;
    write_json(writer, &created)
}
