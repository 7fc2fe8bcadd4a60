//! Derived time measures over an event and its direct children.
//!
//! All functions are read-only aggregations. Durations are summed in
//! milliseconds and converted to hours once, so totals built from whole
//! minutes stay exact.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::event::Event;
use crate::event_type::EventKind;
use crate::temporal::{Interval, merge_intervals, overlap_duration};
use crate::validators::DEFAULT_RATE_TYPE;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// An event with its type name and materialised descendants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventTree {
    pub event: Event,
    pub type_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<EventTree>,
}

impl EventTree {
    pub fn is_kind(&self, kind: EventKind) -> bool {
        self.type_name == kind.as_str()
    }

    /// Direct children of the given kind.
    pub fn children_of(&self, kind: EventKind) -> impl Iterator<Item = &Self> {
        self.children.iter().filter(move |child| child.is_kind(kind))
    }

    /// Number of nodes in the tree, including the root.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }
}

/// `end - start`, or `None` for an open-ended event.
pub fn duration(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Option<Duration> {
    end.map(|end| end - start)
}

#[expect(
    clippy::cast_precision_loss,
    reason = "millisecond totals stay far below 2^52"
)]
fn to_hours(ms: i64) -> f64 {
    ms as f64 / MS_PER_HOUR
}

fn sum_ms<'a>(events: impl Iterator<Item = &'a EventTree>) -> i64 {
    events
        .filter_map(|node| node.event.interval().duration())
        .map(|d| d.num_milliseconds())
        .sum()
}

fn is_unpaid_break(node: &EventTree) -> bool {
    node.event.property_bool("is_paid") == Some(false)
}

/// Sum of direct `work_period` children.
pub fn worked_hours(shift: &EventTree) -> f64 {
    to_hours(sum_ms(shift.children_of(EventKind::WorkPeriod)))
}

/// Sum of direct `break` children.
pub fn break_hours(shift: &EventTree) -> f64 {
    to_hours(sum_ms(shift.children_of(EventKind::Break)))
}

/// Sum of direct `break` children with `is_paid == false`.
pub fn unpaid_break_hours(shift: &EventTree) -> f64 {
    to_hours(sum_ms(
        shift.children_of(EventKind::Break).filter(|b| is_unpaid_break(b)),
    ))
}

/// Worked hours minus unpaid breaks taken inside a work period.
///
/// Breaks that sit between work periods are already absent from worked time
/// and are not deducted again. Overlapping work periods are merged first so a
/// break is deducted at most once.
pub fn net_hours(shift: &EventTree) -> f64 {
    let worked_ms = sum_ms(shift.children_of(EventKind::WorkPeriod));
    let work: Vec<Interval> = merge_intervals(
        shift
            .children_of(EventKind::WorkPeriod)
            .map(|w| w.event.interval())
            .collect(),
    );
    let deducted_ms: i64 = shift
        .children_of(EventKind::Break)
        .filter(|b| is_unpaid_break(b))
        .map(|b| {
            let brk = b.event.interval();
            work.iter()
                .filter_map(|w| overlap_duration(w, &brk))
                .map(|d| d.num_milliseconds())
                .sum::<i64>()
        })
        .sum();
    to_hours(worked_ms - deducted_ms)
}

/// Hours totals for one shift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShiftHours {
    pub worked: f64,
    pub breaks: f64,
    pub unpaid_breaks: f64,
    pub net: f64,
}

pub fn shift_hours(shift: &EventTree) -> ShiftHours {
    ShiftHours {
        worked: worked_hours(shift),
        breaks: break_hours(shift),
        unpaid_breaks: unpaid_break_hours(shift),
        net: net_hours(shift),
    }
}

/// Payroll piece hours grouped by `rate_type`; unset counts as `regular`.
pub fn hours_by_rate_type(clock_period: &EventTree) -> BTreeMap<String, f64> {
    let mut totals_ms: BTreeMap<String, i64> = BTreeMap::new();
    for piece in clock_period.children_of(EventKind::PayrollPiece) {
        let Some(duration) = piece.event.interval().duration() else {
            continue;
        };
        let rate = piece
            .event
            .property_str("rate_type")
            .unwrap_or(DEFAULT_RATE_TYPE);
        *totals_ms.entry(rate.to_string()).or_default() += duration.num_milliseconds();
    }
    totals_ms
        .into_iter()
        .map(|(rate, ms)| (rate, to_hours(ms)))
        .collect()
}
