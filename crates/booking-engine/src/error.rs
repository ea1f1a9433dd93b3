//! Error types for booking-engine operations.

use chrono::DateTime;
use chrono_tz::Tz;
use thiserror::Error;

/// Failure of a booking attempt, as seen by the negotiator's caller.
///
/// Transport errors from collaborators never cross this boundary raw; they
/// are folded into one of these stable kinds.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookingError {
    /// The calendar could not be queried. This is "no information", never
    /// "no conflicts".
    #[error("Calendar unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Revalidation found a busy interval overlapping the chosen slot.
    #[error("Slot starting {start} is no longer free")]
    SlotConflict { start: DateTime<Tz> },

    /// The calendar event write failed. Nothing was recorded.
    #[error("Calendar write failed: {0}")]
    CommitFailed(String),

    /// The calendar event exists but the ledger row could not be appended.
    #[error("Booking {event_id} committed to calendar but ledger append failed: {reason}")]
    LedgerWriteFailed { event_id: String, reason: String },

    /// The negotiation already reached a terminal state.
    #[error("Negotiation already finished")]
    AttemptFinished,
}

/// Malformed user input. Recovered inside the dialogue by re-prompting.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("expected make and model separated by a space")]
    VehicleFormat,

    #[error("make must contain letters only")]
    VehicleMake,

    #[error("model must contain letters and digits only")]
    VehicleModel,

    #[error("year must be 4 digits, not earlier than 1990")]
    Year,

    #[error("VIN must be exactly 17 characters without I, O or Q")]
    Vin,

    #[error("phone must be 9 to 15 digits with an optional leading +")]
    Phone,

    #[error("description must not be empty")]
    Issue,

    #[error("selection does not match any offered slot")]
    UnknownSlot,
}

/// Invalid configuration values.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid time of day for {key}: {value}")]
    InvalidTime { key: &'static str, value: String },

    #[error("Invalid weekday: {0}")]
    InvalidWeekday(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Error reported by an external collaborator (calendar, ledger, notifier,
/// content source).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;
