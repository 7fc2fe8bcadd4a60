//! Shift commands: create shifts and add breaks, work periods and tasks.

use std::io::Write;

use anyhow::{Context, Result};
use serde_json::Value;
use wf_core::{EntityId, EventAttrs, EventId};
use wf_db::Database;

use super::util::{parse_props, with_fields, write_json};
use crate::cli::SpanArgs;

fn span_attrs(span: &SpanArgs) -> EventAttrs {
    EventAttrs::spanning(span.start, span.end)
}

#[expect(
    clippy::too_many_arguments,
    reason = "mirrors the flags of `wf shift create`"
)]
pub fn create<W: Write>(
    writer: &mut W,
    db: &mut Database,
    employment: &str,
    worker: &str,
    span: &SpanArgs,
    location: &str,
    auto_periods: bool,
    props: &[String],
) -> Result<()> {
    let employment = EventId::new(employment)?;
    let worker = EntityId::new(worker)?;
    let attrs = with_fields(
        span_attrs(span),
        parse_props(props)?,
        &[("location", Some(Value::from(location)))],
    );
    let created = db
        .create_shift(&employment, &worker, &attrs, auto_periods)
        .with_context(|| format!("failed to create shift under {employment}"))?;
    write_json(writer, &created)
}

pub fn add_break<W: Write>(
    writer: &mut W,
    db: &mut Database,
    shift: &str,
    span: &SpanArgs,
    paid: bool,
    props: &[String],
) -> Result<()> {
    let shift = EventId::new(shift)?;
    let mut fields = parse_props(props)?;
    // A bare `--paid` wins; otherwise keep whatever `--prop is_paid=` said.
    if paid {
        fields.insert("is_paid".to_string(), Value::Bool(true));
    }
    let attrs = with_fields(span_attrs(span), fields, &[]);
    let created = db
        .add_break(&shift, &attrs)
        .with_context(|| format!("failed to add break to {shift}"))?;
    write_json(writer, &created)
}

pub fn add_work_period<W: Write>(
    writer: &mut W,
    db: &mut Database,
    shift: &str,
    span: &SpanArgs,
    activity: Option<&str>,
    props: &[String],
) -> Result<()> {
    let shift = EventId::new(shift)?;
    let attrs = with_fields(
        span_attrs(span),
        parse_props(props)?,
        &[("activity", activity.map(Value::from))],
    );
    let created = db
        .add_work_period(&shift, &attrs)
        .with_context(|| format!("failed to add work period to {shift}"))?;
    write_json(writer, &created)
}

pub fn add_task<W: Write>(
    writer: &mut W,
    db: &mut Database,
    shift: &str,
    span: &SpanArgs,
    title: &str,
    props: &[String],
) -> Result<()> {
    let shift = EventId::new(shift)?;
    let attrs = with_fields(
        span_attrs(span),
        parse_props(props)?,
        &[("title", Some(Value::from(title)))],
    );
    let created = db
        .add_task(&shift, &attrs)
        .with_context(|| format!("failed to add task to {shift}"))?;
    write_json(writer, &created)
}
