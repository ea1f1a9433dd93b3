//! Collaborator traits the engine consumes: calendar, ledger, notifications
//! and a clock.
//!
//! Transports live outside this crate. Implementations report failures as
//! [`CollaboratorError`]; the engine maps them onto stable
//! [`BookingError`](crate::error::BookingError) kinds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;

/// A busy range exactly as the remote calendar reports it.
///
/// Values are either RFC 3339 timestamps or naive local timestamps
/// (`YYYY-MM-DDTHH:MM[:SS]`); [`BusySource`](crate::busy::BusySource)
/// normalizes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBusyInterval {
    pub start: String,
    pub end: String,
}

impl RawBusyInterval {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// An event to be written to the calendar resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub summary: String,
    pub description: String,
    /// RFC 3339 start, already in `timezone`.
    pub start: String,
    /// RFC 3339 end, already in `timezone`.
    pub end: String,
    /// IANA timezone name.
    pub timezone: String,
}

/// Remote free/busy calendar holding a single bookable resource.
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Busy ranges intersecting `[window_start, window_end)`.
    async fn query_busy(
        &self,
        resource_id: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<RawBusyInterval>, CollaboratorError>;

    /// Insert an event and return its remote identifier.
    async fn insert_event(
        &self,
        resource_id: &str,
        event: &CalendarEvent,
    ) -> Result<String, CollaboratorError>;
}

/// Append-only log of committed bookings.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Number of rows currently stored, header included.
    async fn row_count(&self) -> Result<usize, CollaboratorError>;

    /// Append one row of ordered fields.
    async fn append_row(&self, row: Vec<String>) -> Result<(), CollaboratorError>;
}

/// Outbound message sink for operator notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, channel: &str, text: &str) -> Result<(), CollaboratorError>;
}

/// Source of "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
