//! Busy intervals fetched from the shared calendar resource.
//!
//! Every value handed to the rest of the engine is normalized to one fixed
//! timezone: naive timestamps are read as wall-clock time in that zone, zoned
//! timestamps are converted into it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::{BookingError, Result};
use crate::services::{CalendarService, RawBusyInterval};

/// A range during which the calendar resource is occupied. `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BusyInterval {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl BusyInterval {
    /// Returns `None` unless `start < end`.
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }
}

/// Read-only view of one calendar resource's busy time.
#[derive(Clone)]
pub struct BusySource {
    calendar: Arc<dyn CalendarService>,
    resource_id: String,
    tz: Tz,
    timeout: Duration,
}

impl BusySource {
    pub fn new(
        calendar: Arc<dyn CalendarService>,
        resource_id: impl Into<String>,
        tz: Tz,
        timeout: Duration,
    ) -> Self {
        Self {
            calendar,
            resource_id: resource_id.into(),
            tz,
            timeout,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn calendar(&self) -> &Arc<dyn CalendarService> {
        &self.calendar
    }

    /// Fetch a fresh snapshot of busy intervals for `[window_start, window_end)`.
    ///
    /// # Errors
    /// `BookingError::UpstreamUnavailable` when the remote query fails or does
    /// not answer within the configured timeout.
    pub async fn fetch(
        &self,
        window_start: DateTime<Tz>,
        window_end: DateTime<Tz>,
    ) -> Result<Vec<BusyInterval>> {
        let query = self.calendar.query_busy(
            &self.resource_id,
            window_start.with_timezone(&Utc),
            window_end.with_timezone(&Utc),
        );

        let raw = match tokio::time::timeout(self.timeout, query).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::warn!(resource = %self.resource_id, "free/busy query failed: {}", e);
                return Err(BookingError::UpstreamUnavailable(e.to_string()));
            }
            Err(_) => {
                tracing::warn!(
                    resource = %self.resource_id,
                    "free/busy query timed out after {:?}",
                    self.timeout
                );
                return Err(BookingError::UpstreamUnavailable(format!(
                    "free/busy query timed out after {:?}",
                    self.timeout
                )));
            }
        };

        let intervals = normalize_intervals(&raw, self.tz);
        tracing::debug!(
            resource = %self.resource_id,
            received = raw.len(),
            kept = intervals.len(),
            "busy intervals fetched"
        );
        Ok(intervals)
    }
}

/// Convert remote busy ranges into zoned intervals, dropping the ones that
/// cannot be parsed or are empty.
pub fn normalize_intervals(raw: &[RawBusyInterval], tz: Tz) -> Vec<BusyInterval> {
    raw.iter()
        .filter_map(|r| {
            let start = parse_timestamp(&r.start, tz);
            let end = parse_timestamp(&r.end, tz);
            match (start, end) {
                (Some(start), Some(end)) => {
                    let interval = BusyInterval::new(start, end);
                    if interval.is_none() {
                        tracing::warn!(start = %r.start, end = %r.end, "skipping empty busy interval");
                    }
                    interval
                }
                _ => {
                    tracing::warn!(start = %r.start, end = %r.end, "skipping unparseable busy interval");
                    None
                }
            }
        })
        .collect()
}

/// Parse a remote timestamp into `tz`.
///
/// RFC 3339 values carry their own offset and are converted. Naive values
/// are localized; an ambiguous local time (DST fold) resolves to the earlier
/// instant, a nonexistent one (DST gap) yields `None`.
pub fn parse_timestamp(value: &str, tz: Tz) -> Option<DateTime<Tz>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&tz));
    }

    const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Warsaw;

    #[test]
    fn naive_timestamp_is_local_wall_clock() {
        let dt = parse_timestamp("2026-03-02T09:00:00", Warsaw).unwrap();
        assert_eq!(dt, Warsaw.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap());
    }

    #[test]
    fn zoned_timestamp_is_converted() {
        // 08:00Z in winter is 09:00 in Warsaw (UTC+1).
        let dt = parse_timestamp("2026-03-02T08:00:00Z", Warsaw).unwrap();
        assert_eq!(dt, Warsaw.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap());
    }

    #[test]
    fn nonexistent_local_time_is_rejected() {
        // Clocks jump from 02:00 to 03:00 on 2026-03-29 in Warsaw.
        assert!(parse_timestamp("2026-03-29T02:30:00", Warsaw).is_none());
    }

    #[test]
    fn garbage_and_empty_intervals_are_dropped() {
        let raw = vec![
            RawBusyInterval::new("not a date", "2026-03-02T10:00:00"),
            RawBusyInterval::new("2026-03-02T10:00:00", "2026-03-02T10:00:00"),
            RawBusyInterval::new("2026-03-02T11:00:00", "2026-03-02T11:30:00"),
        ];
        let intervals = normalize_intervals(&raw, Warsaw);
        assert_eq!(intervals.len(), 1);
        assert_eq!(
            intervals[0].start,
            Warsaw.with_ymd_and_hms(2026, 3, 2, 11, 0, 0).unwrap()
        );
    }
}
