//! Booking request collected by the dialogue, and the ledger row it becomes.

use std::fmt;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Format of timestamps written to the ledger.
pub const LEDGER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Column titles of the ledger, in [`Booking::to_row`] order.
pub const LEDGER_HEADER: [&str; 9] = [
    "#", "Created", "Vehicle", "Year", "VIN", "Phone", "Issue", "Visit", "Status",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vehicle {
    pub make: String,
    pub model: String,
}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.make, self.model)
    }
}

/// A validated, uppercase 17-character vehicle identification number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vin(pub(crate) String);

impl Vin {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Vin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything needed to book a visit. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingRequest {
    pub vehicle: Vehicle,
    pub year: u16,
    pub vin: Vin,
    pub phone: String,
    pub issue: String,
}

/// Field-by-field accumulator driven by the dialogue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingRequestBuilder {
    vehicle: Option<Vehicle>,
    year: Option<u16>,
    vin: Option<Vin>,
    phone: Option<String>,
    issue: Option<String>,
}

impl BookingRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vehicle(&mut self, vehicle: Vehicle) -> &mut Self {
        self.vehicle = Some(vehicle);
        self
    }

    pub fn year(&mut self, year: u16) -> &mut Self {
        self.year = Some(year);
        self
    }

    pub fn vin(&mut self, vin: Vin) -> &mut Self {
        self.vin = Some(vin);
        self
    }

    pub fn phone(&mut self, phone: String) -> &mut Self {
        self.phone = Some(phone);
        self
    }

    pub fn issue(&mut self, issue: String) -> &mut Self {
        self.issue = Some(issue);
        self
    }

    /// `None` until every field has been supplied.
    pub fn build(&self) -> Option<BookingRequest> {
        Some(BookingRequest {
            vehicle: self.vehicle.clone()?,
            year: self.year?,
            vin: self.vin.clone()?,
            phone: self.phone.clone()?,
            issue: self.issue.clone()?,
        })
    }
}

/// A committed booking as recorded in the append-only ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Booking {
    pub sequence: usize,
    pub created_at: DateTime<Tz>,
    pub request: BookingRequest,
    pub slot_start: DateTime<Tz>,
    pub status: String,
    /// Calendar event identifier returned by the calendar service.
    #[serde(skip)]
    pub event_id: String,
}

impl Booking {
    /// Ledger fields in storage order: sequence, created, vehicle, year, VIN,
    /// phone, issue, slot start, status.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.sequence.to_string(),
            self.created_at.format(LEDGER_TIME_FORMAT).to_string(),
            self.request.vehicle.to_string(),
            self.request.year.to_string(),
            self.request.vin.to_string(),
            self.request.phone.clone(),
            self.request.issue.clone(),
            self.slot_start.format(LEDGER_TIME_FORMAT).to_string(),
            self.status.clone(),
        ]
    }

    pub fn created_at_utc(&self) -> DateTime<Utc> {
        self.created_at.with_timezone(&Utc)
    }
}
