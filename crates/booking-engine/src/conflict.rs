//! Overlap detection between a candidate slot and busy intervals.
//!
//! Intervals are half-open: a slot that ends exactly when a busy interval
//! starts (or starts exactly when one ends) is NOT a conflict.

use chrono::DateTime;
use chrono_tz::Tz;

use crate::busy::BusyInterval;

/// A busy interval overlapping a candidate range.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub busy: BusyInterval,
    pub overlap_minutes: i64,
}

/// Two ranges overlap iff `max(a.start, b.start) < min(a.end, b.end)`.
pub fn overlaps(
    a_start: DateTime<Tz>,
    a_end: DateTime<Tz>,
    b_start: DateTime<Tz>,
    b_end: DateTime<Tz>,
) -> bool {
    a_start.max(b_start) < a_end.min(b_end)
}

/// Whether `[start, end)` is free of every interval in `busy`.
pub fn is_free(start: DateTime<Tz>, end: DateTime<Tz>, busy: &[BusyInterval]) -> bool {
    !busy.iter().any(|b| overlaps(start, end, b.start, b.end))
}

/// All busy intervals overlapping `[start, end)`, with the overlap length.
pub fn find_conflicts(
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    busy: &[BusyInterval],
) -> Vec<Conflict> {
    busy.iter()
        .filter(|b| overlaps(start, end, b.start, b.end))
        .map(|b| Conflict {
            busy: *b,
            overlap_minutes: (end.min(b.end) - start.max(b.start)).num_minutes(),
        })
        .collect()
}
