//! Interval overlap and containment checks.
//!
//! Everything here is pure: callers load candidate and existing rows, then
//! ask these functions whether the pair conflicts. A `None` end always means
//! the interval is unbounded going forward.

use std::fmt;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::Serialize;
use thiserror::Error;

/// A half-open time interval `[start, end)`; `end = None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl Interval {
    pub const fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }

    pub fn contains(&self, child: &Self) -> bool {
        is_contained(child.start, child.end, self.start, self.end)
    }

    pub fn duration(&self) -> Option<Duration> {
        self.end.map(|end| end - self.start)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "[{}, {})", self.start.to_rfc3339(), end.to_rfc3339()),
            None => write!(f, "[{}, open)", self.start.to_rfc3339()),
        }
    }
}

/// Truncates to the millisecond precision timestamps are stored with.
pub fn storage_precision(time: DateTime<Utc>) -> DateTime<Utc> {
    time.trunc_subsecs(3)
}

/// Two intervals overlap unless one ends at or before the other starts.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: Option<DateTime<Utc>>,
    b_start: DateTime<Utc>,
    b_end: Option<DateTime<Utc>>,
) -> bool {
    let a_ends_first = a_end.is_some_and(|a_end| a_end <= b_start);
    let b_ends_first = b_end.is_some_and(|b_end| b_end <= a_start);
    !(a_ends_first || b_ends_first)
}

/// The child must start at or after the parent; a bounded parent also bounds the child's end.
pub fn is_contained(
    child_start: DateTime<Utc>,
    child_end: Option<DateTime<Utc>>,
    parent_start: DateTime<Utc>,
    parent_end: Option<DateTime<Utc>>,
) -> bool {
    containment_violation(child_start, child_end, parent_start, parent_end).is_none()
}

/// Length of the intersection of two intervals; zero when they do not overlap.
///
/// Unbounded ends are clipped by the other interval; two unbounded intervals yield `None`.
pub fn overlap_duration(a: &Interval, b: &Interval) -> Option<Duration> {
    let start = a.start.max(b.start);
    let end = match (a.end, b.end) {
        (Some(a_end), Some(b_end)) => a_end.min(b_end),
        (Some(end), None) | (None, Some(end)) => end,
        (None, None) => return None,
    };
    Some(if end > start {
        end - start
    } else {
        Duration::zero()
    })
}

/// Merges overlapping or touching intervals into a sorted, disjoint list.
pub fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort_by_key(|interval| interval.start);
    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for next in intervals {
        if let Some(last) = merged.last_mut() {
            if last.end.is_none_or(|end| next.start <= end) {
                last.end = match (last.end, next.end) {
                    (Some(a), Some(b)) => Some(a.max(b)),
                    _ => None,
                };
                continue;
            }
        }
        merged.push(next);
    }
    merged
}

/// Why a child interval falls outside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainmentReason {
    StartsBefore,
    StartsAfterEnd,
    EndsAfter,
    OpenEnded,
}

fn containment_violation(
    child_start: DateTime<Utc>,
    child_end: Option<DateTime<Utc>>,
    parent_start: DateTime<Utc>,
    parent_end: Option<DateTime<Utc>>,
) -> Option<ContainmentReason> {
    if child_start < parent_start {
        return Some(ContainmentReason::StartsBefore);
    }
    let parent_end = parent_end?;
    if child_start >= parent_end {
        return Some(ContainmentReason::StartsAfterEnd);
    }
    match child_end {
        None => Some(ContainmentReason::OpenEnded),
        Some(child_end) if child_end > parent_end => Some(ContainmentReason::EndsAfter),
        Some(_) => None,
    }
}

/// A child interval lies outside its parent's bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainmentError {
    pub child: String,
    pub parent: String,
    pub reason: ContainmentReason,
}

impl fmt::Display for ContainmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            child,
            parent,
            reason,
        } = self;
        match reason {
            ContainmentReason::StartsBefore => write!(f, "{child} starts before {parent}"),
            ContainmentReason::StartsAfterEnd => write!(f, "{child} starts after {parent} ends"),
            ContainmentReason::EndsAfter => write!(f, "{child} ends after {parent}"),
            ContainmentReason::OpenEnded => {
                write!(f, "{child} has no end time but {parent} does")
            }
        }
    }
}

impl std::error::Error for ContainmentError {}

/// Like [`is_contained`], but names the offending pair on failure.
pub fn check_contained(
    child_label: &str,
    child: &Interval,
    parent_label: &str,
    parent: &Interval,
) -> Result<(), ContainmentError> {
    match containment_violation(child.start, child.end, parent.start, parent.end) {
        None => Ok(()),
        Some(reason) => Err(ContainmentError {
            child: child_label.to_string(),
            parent: parent_label.to_string(),
            reason,
        }),
    }
}

/// A candidate interval collides with an existing event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{subject} {candidate} overlaps existing {subject} {conflicting_id} {conflicting}")]
pub struct OverlapError {
    pub subject: String,
    pub candidate: Interval,
    pub conflicting_id: String,
    pub conflicting: Interval,
}

/// Returns the first existing interval that overlaps `candidate`.
pub fn find_overlap<'a, I>(candidate: &Interval, existing: I) -> Option<(&'a str, Interval)>
where
    I: IntoIterator<Item = (&'a str, Interval)>,
{
    existing
        .into_iter()
        .find(|(_, interval)| candidate.overlaps(interval))
}
