//! # booking-engine
//!
//! Appointment-slot negotiation for a garage booking assistant.
//!
//! The engine offers bookable slots computed from a remote free/busy calendar,
//! re-checks the chosen slot against the calendar right before committing, and
//! records each booking once even when the ledger write fails after the
//! calendar write succeeded.
//!
//! ## Modules
//!
//! - [`busy`]: fetch and timezone-normalize busy intervals from the calendar
//! - [`slots`]: fixed-size slots within working days and hours
//! - [`conflict`]: half-open overlap rule shared by generation and revalidation
//! - [`negotiator`]: revalidate-then-commit state machine for one attempt
//! - [`dialogue`]: step-by-step collection of a booking request
//! - [`validate`]: vehicle, year, VIN, phone and issue validators
//! - [`messages`]: localized prompts keyed by message id and locale
//! - [`content`]: reloadable cache of promo and contact texts
//! - [`config`]: configuration from defaults, JSON and environment
//! - [`services`]: collaborator traits (calendar, ledger, notifier, clock)
//! - [`memory`]: in-memory collaborators
//! - [`error`]: error types

pub mod busy;
pub mod config;
pub mod conflict;
pub mod content;
pub mod dialogue;
pub mod error;
pub mod memory;
pub mod messages;
pub mod negotiator;
pub mod request;
pub mod services;
pub mod slots;
pub mod validate;

pub use busy::{BusyInterval, BusySource};
pub use config::BookingConfig;
pub use content::{ContentCache, ContentSource};
pub use dialogue::{BookingFlow, Conversation, DialogueState, Reply, SlotOption};
pub use error::{BookingError, CollaboratorError, ConfigError, ValidationError};
pub use messages::{Locale, MessageBundle, MessageId};
pub use negotiator::{Negotiation, NegotiationState, Negotiator, NegotiatorSettings};
pub use request::{Booking, BookingRequest, BookingRequestBuilder, Vehicle, Vin};
pub use services::{
    CalendarEvent, CalendarService, Clock, FixedClock, Ledger, Notifier, RawBusyInterval,
    SystemClock,
};
pub use slots::{generate_slots, SchedulePolicy, Slot, SlotWindow};
