//! Tests for fetching and normalizing busy intervals.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use booking_engine::busy::BusySource;
use booking_engine::error::CollaboratorError;
use booking_engine::memory::InMemoryCalendar;
use booking_engine::services::{CalendarEvent, CalendarService, RawBusyInterval};
use booking_engine::BookingError;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::{Europe::Warsaw, Tz};
use tokio::sync::Mutex;

fn at(day: u32, hour: u32, min: u32) -> DateTime<Tz> {
    Warsaw.with_ymd_and_hms(2026, 3, day, hour, min, 0).unwrap()
}

/// Calendar that answers after a delay and remembers the windows it was asked for.
#[derive(Default)]
struct SlowCalendar {
    delay: Duration,
    windows: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
}

#[async_trait]
impl CalendarService for SlowCalendar {
    async fn query_busy(
        &self,
        _resource_id: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<RawBusyInterval>, CollaboratorError> {
        self.windows.lock().await.push((window_start, window_end));
        tokio::time::sleep(self.delay).await;
        Ok(vec![RawBusyInterval::new(
            "2026-03-02T09:00:00",
            "2026-03-02T10:00:00",
        )])
    }

    async fn insert_event(
        &self,
        _resource_id: &str,
        _event: &CalendarEvent,
    ) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::new("read-only"))
    }
}

#[tokio::test]
async fn mixed_formats_are_normalized_into_the_shop_timezone() {
    let calendar = Arc::new(InMemoryCalendar::with_busy(vec![
        RawBusyInterval::new("2026-03-02T09:00:00", "2026-03-02T09:30:00"),
        RawBusyInterval::new("2026-03-02T10:00:00Z", "2026-03-02T11:00:00Z"),
        RawBusyInterval::new("2026-03-02 14:00", "2026-03-02 15:00"),
    ]));
    let source = BusySource::new(calendar, "garage", Warsaw, Duration::from_secs(1));

    let busy = source.fetch(at(2, 0, 0), at(3, 0, 0)).await.unwrap();

    assert_eq!(busy.len(), 3);
    assert_eq!(busy[0].start, at(2, 9, 0));
    assert_eq!(busy[1].start, at(2, 11, 0), "10:00Z is 11:00 in Warsaw");
    assert_eq!(busy[1].end, at(2, 12, 0));
    assert_eq!(busy[2].end, at(2, 15, 0));
    assert!(busy.iter().all(|b| b.start.timezone() == Warsaw));
}

#[tokio::test]
async fn unusable_entries_are_dropped_not_fatal() {
    let calendar = Arc::new(InMemoryCalendar::with_busy(vec![
        RawBusyInterval::new("soon", "later"),
        RawBusyInterval::new("2026-03-02T12:00:00", "2026-03-02T12:00:00"),
        RawBusyInterval::new("2026-03-02T13:00:00", "2026-03-02T12:00:00"),
        RawBusyInterval::new("2026-03-02T16:00:00", "2026-03-02T17:00:00"),
    ]));
    let source = BusySource::new(calendar, "garage", Warsaw, Duration::from_secs(1));

    let busy = source.fetch(at(2, 0, 0), at(3, 0, 0)).await.unwrap();

    assert_eq!(busy.len(), 1);
    assert_eq!(busy[0].start, at(2, 16, 0));
}

#[tokio::test]
async fn query_failure_is_upstream_unavailable() {
    let calendar = Arc::new(InMemoryCalendar::new());
    calendar.fail_queries(true);
    let source = BusySource::new(calendar.clone(), "garage", Warsaw, Duration::from_secs(1));

    let err = source.fetch(at(2, 0, 0), at(3, 0, 0)).await.unwrap_err();

    assert!(matches!(err, BookingError::UpstreamUnavailable(_)));
    assert_eq!(calendar.query_count(), 1, "no hidden retries");
}

#[tokio::test]
async fn slow_calendar_times_out() {
    let calendar = Arc::new(SlowCalendar {
        delay: Duration::from_secs(30),
        ..SlowCalendar::default()
    });
    let source = BusySource::new(calendar, "garage", Warsaw, Duration::from_millis(20));

    let err = source.fetch(at(2, 0, 0), at(3, 0, 0)).await.unwrap_err();

    match err {
        BookingError::UpstreamUnavailable(reason) => assert!(reason.contains("timed out")),
        other => panic!("expected UpstreamUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn window_is_sent_in_utc() {
    let calendar = Arc::new(SlowCalendar::default());
    let source = BusySource::new(calendar.clone(), "garage", Warsaw, Duration::from_secs(1));

    let busy = source.fetch(at(2, 0, 0), at(16, 0, 0)).await.unwrap();

    assert_eq!(busy.len(), 1);
    let windows = calendar.windows.lock().await;
    assert_eq!(
        windows.as_slice(),
        &[(
            Utc.with_ymd_and_hms(2026, 3, 1, 23, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 15, 23, 0, 0).unwrap(),
        )]
    );
}
