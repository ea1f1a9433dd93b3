//! Bookable slot generation from a busy-interval snapshot.
//!
//! Walks the calendar days of a window in order, skips non-working days, and
//! cuts each working day into fixed-size, back-to-back slots starting at the
//! opening hour. A slot is offered only if no busy interval overlaps it; see
//! [`conflict::overlaps`](crate::conflict::overlaps) for the overlap rule.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, TimeZone, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

use crate::busy::BusyInterval;
use crate::conflict;

/// Display format of a slot in prompts and buttons.
pub const SLOT_LABEL_FORMAT: &str = "%d.%m %H:%M";

/// Longest booking horizon, in days. Longer horizons are clamped.
pub const MAX_HORIZON_DAYS: u32 = 366;

/// A fixed-duration bookable interval. Never stored; recomputed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Slot {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl Slot {
    /// Stable identifier used by the conversation transport for selection.
    pub fn id(&self) -> String {
        self.start.to_rfc3339()
    }

    /// Short human label, e.g. `02.03 09:30`.
    pub fn label(&self) -> String {
        self.start.format(SLOT_LABEL_FORMAT).to_string()
    }
}

/// The time range slots are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl SlotWindow {
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self { start, end }
    }

    /// From local midnight of the day after `today` through `horizon_days`
    /// days later, with `horizon_days` capped at [`MAX_HORIZON_DAYS`].
    pub fn starting_tomorrow(today: NaiveDate, horizon_days: u32, tz: Tz) -> Self {
        let tomorrow = today.succ_opt().unwrap_or(today);
        let horizon = Days::new(u64::from(horizon_days.min(MAX_HORIZON_DAYS)));
        let last = tomorrow.checked_add_days(horizon).unwrap_or(NaiveDate::MAX);
        Self {
            start: local_midnight(tomorrow, tz),
            end: local_midnight(last, tz),
        }
    }
}

/// Working calendar and slot sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulePolicy {
    pub timezone: Tz,
    pub working_days: Vec<Weekday>,
    pub work_start: NaiveTime,
    pub work_end: NaiveTime,
    pub slot_minutes: u32,
    /// Presentation cap on how many slots are returned.
    pub max_slots: usize,
    pub horizon_days: u32,
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Europe::Warsaw,
            working_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            work_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            work_end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
            slot_minutes: 30,
            max_slots: 10,
            horizon_days: 14,
        }
    }
}

impl SchedulePolicy {
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.working_days.contains(&date.weekday())
    }

    pub fn slot_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.slot_minutes))
    }

    /// The default booking window relative to `now`.
    pub fn window_from(&self, now: DateTime<Tz>) -> SlotWindow {
        SlotWindow::starting_tomorrow(now.date_naive(), self.horizon_days, self.timezone)
    }
}

/// Generate the first `policy.max_slots` free slots inside `window`, in
/// chronological order.
///
/// Deterministic: the same busy snapshot always yields the same list.
pub fn generate_slots(
    busy: &[BusyInterval],
    window: &SlotWindow,
    policy: &SchedulePolicy,
) -> Vec<Slot> {
    let mut slots = Vec::new();
    if policy.max_slots == 0 || policy.slot_minutes == 0 || window.start >= window.end {
        return slots;
    }

    let tz = policy.timezone;
    let duration = policy.slot_duration();
    let first_day = window.start.with_timezone(&tz).date_naive();
    let last_day = window.end.with_timezone(&tz).date_naive();

    for day in first_day.iter_days().take_while(|d| *d <= last_day) {
        if !policy.is_working_day(day) {
            continue;
        }

        let mut cursor = day.and_time(policy.work_start);
        let close = day.and_time(policy.work_end);

        while cursor + duration <= close {
            let naive_start = cursor;
            cursor += duration;

            // Wall-clock times swallowed by a DST gap produce no slot.
            let Some(start) = tz.from_local_datetime(&naive_start).earliest() else {
                continue;
            };
            let end = start + duration;

            if start < window.start || end > window.end {
                continue;
            }
            if !conflict::is_free(start, end, busy) {
                continue;
            }

            slots.push(Slot { start, end });
            if slots.len() >= policy.max_slots {
                tracing::debug!(count = slots.len(), "slot cap reached");
                return slots;
            }
        }
    }

    tracing::debug!(count = slots.len(), busy = busy.len(), "slots generated");
    slots
}

fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        // Zones whose DST switch happens at midnight have no 00:00 that day.
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
}
