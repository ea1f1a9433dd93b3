//! Revalidate-then-commit negotiation for one booking attempt.
//!
//! The slot a user picks was generated against an earlier busy snapshot and
//! may be stale. Before anything is written the negotiator re-queries the
//! calendar for exactly the slot's range; only a successful, conflict-free
//! answer lets the attempt reach the calendar write.
//!
//! Commit order is fixed:
//!
//! 1. calendar event (authoritative; failure aborts with nothing recorded)
//! 2. ledger row (failure leaves a real but unrecorded booking, reported as
//!    [`BookingError::LedgerWriteFailed`] and never retried here)
//! 3. operator notification (best effort, failure is only logged)
//!
//! There is no lock or conditional write between revalidation and insert;
//! two concurrent attempts on the same slot can both pass revalidation.

use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use serde::Serialize;

use crate::busy::BusySource;
use crate::conflict;
use crate::error::{BookingError, Result};
use crate::request::{Booking, BookingRequest, LEDGER_TIME_FORMAT};
use crate::services::{CalendarEvent, Clock, Ledger, Notifier};
use crate::slots::{Slot, SLOT_LABEL_FORMAT};

/// Lifecycle of a single booking attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NegotiationState {
    /// A slot has been chosen from a possibly stale list.
    Proposed,
    /// Busy intervals for the slot are being re-queried.
    Revalidating,
    /// The slot was taken or the calendar write failed. Terminal.
    Rejected,
    /// Writing calendar event, ledger row and notification.
    Committing,
    /// The calendar event exists. Terminal.
    Committed,
}

impl NegotiationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Committed)
    }
}

/// One attempt to book `slot` for `request`, with its state history.
#[derive(Debug, Clone)]
pub struct Negotiation {
    request: BookingRequest,
    slot: Slot,
    history: Vec<NegotiationState>,
}

impl Negotiation {
    pub fn new(request: BookingRequest, slot: Slot) -> Self {
        Self {
            request,
            slot,
            history: vec![NegotiationState::Proposed],
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.history
            .last()
            .copied()
            .unwrap_or(NegotiationState::Proposed)
    }

    /// Every state entered so far, oldest first.
    pub fn history(&self) -> &[NegotiationState] {
        &self.history
    }

    pub fn request(&self) -> &BookingRequest {
        &self.request
    }

    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    fn enter(&mut self, state: NegotiationState) {
        tracing::debug!(slot = %self.slot.id(), from = ?self.state(), to = ?state, "negotiation transition");
        self.history.push(state);
    }
}

/// Settings the negotiator needs beyond its collaborators.
#[derive(Debug, Clone)]
pub struct NegotiatorSettings {
    /// Channel for operator notifications; `None` disables them.
    pub operator_channel: Option<String>,
    /// Status label written into new ledger rows.
    pub status_label: String,
    /// Upper bound on the calendar write and the notification.
    pub timeout: Duration,
}

impl Default for NegotiatorSettings {
    fn default() -> Self {
        Self {
            operator_channel: None,
            status_label: "Nowe".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Drives [`Negotiation`]s against the shared calendar, the ledger and the
/// operator channel.
#[derive(Clone)]
pub struct Negotiator {
    busy: BusySource,
    ledger: Arc<dyn Ledger>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    settings: NegotiatorSettings,
}

impl Negotiator {
    pub fn new(
        busy: BusySource,
        ledger: Arc<dyn Ledger>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: NegotiatorSettings,
    ) -> Self {
        Self {
            busy,
            ledger,
            notifier,
            clock,
            settings,
        }
    }

    /// Run one attempt to completion.
    ///
    /// On `Ok` the booking is committed and recorded. On
    /// `Err(LedgerWriteFailed)` it is committed but not recorded; the attempt
    /// still ends in [`NegotiationState::Committed`]. On `UpstreamUnavailable`
    /// the attempt goes back to `Proposed` and may be run again.
    ///
    /// # Errors
    /// See [`BookingError`].
    pub async fn negotiate(&self, attempt: &mut Negotiation) -> Result<Booking> {
        if attempt.state().is_terminal() {
            return Err(BookingError::AttemptFinished);
        }

        attempt.enter(NegotiationState::Revalidating);
        let slot = attempt.slot;
        let busy = match self.busy.fetch(slot.start, slot.end).await {
            Ok(busy) => busy,
            Err(e) => {
                // No answer is not a "free" answer: back off without writing.
                attempt.enter(NegotiationState::Proposed);
                return Err(e);
            }
        };

        let conflicts = conflict::find_conflicts(slot.start, slot.end, &busy);
        if !conflicts.is_empty() {
            tracing::info!(
                slot = %slot.id(),
                conflicts = conflicts.len(),
                "slot taken since it was offered"
            );
            attempt.enter(NegotiationState::Rejected);
            return Err(BookingError::SlotConflict { start: slot.start });
        }

        attempt.enter(NegotiationState::Committing);
        let event = calendar_event(&attempt.request, &slot, self.busy.timezone());
        let insert = self
            .busy
            .calendar()
            .insert_event(self.busy.resource_id(), &event);
        let event_id = match tokio::time::timeout(self.settings.timeout, insert).await {
            Ok(Ok(id)) => id,
            Ok(Err(e)) => {
                tracing::error!(slot = %slot.id(), "calendar insert failed: {}", e);
                attempt.enter(NegotiationState::Rejected);
                return Err(BookingError::CommitFailed(e.to_string()));
            }
            Err(_) => {
                // Outcome unknown; the event may still land remotely.
                tracing::error!(slot = %slot.id(), "calendar insert timed out, event may exist remotely");
                attempt.enter(NegotiationState::Rejected);
                return Err(BookingError::CommitFailed(format!(
                    "calendar insert timed out after {:?}",
                    self.settings.timeout
                )));
            }
        };
        attempt.enter(NegotiationState::Committed);
        tracing::info!(slot = %slot.id(), event_id = %event_id, "calendar event created");

        let tz = self.busy.timezone();
        let mut booking = Booking {
            sequence: 0,
            created_at: self.clock.now().with_timezone(&tz),
            request: attempt.request.clone(),
            slot_start: slot.start,
            status: self.settings.status_label.clone(),
            event_id: event_id.clone(),
        };

        let recorded = self.record(&mut booking).await;
        self.notify_operator(&booking).await;

        match recorded {
            Ok(()) => Ok(booking),
            Err(reason) => {
                tracing::error!(
                    event_id = %event_id,
                    row = ?booking.to_row(),
                    "booking is in the calendar but missing from the ledger: {}",
                    reason
                );
                Err(BookingError::LedgerWriteFailed { event_id, reason })
            }
        }
    }

    async fn record(&self, booking: &mut Booking) -> std::result::Result<(), String> {
        booking.sequence = self.ledger.row_count().await.map_err(|e| e.to_string())?;
        self.ledger
            .append_row(booking.to_row())
            .await
            .map_err(|e| e.to_string())
    }

    async fn notify_operator(&self, booking: &Booking) {
        let Some(channel) = self.settings.operator_channel.as_deref() else {
            return;
        };
        let text = operator_message(booking);
        let sent = tokio::time::timeout(self.settings.timeout, self.notifier.notify(channel, &text));
        match sent.await {
            Ok(Ok(())) => tracing::debug!(channel, "operator notified"),
            Ok(Err(e)) => tracing::warn!(channel, "operator notification failed: {}", e),
            Err(_) => tracing::warn!(channel, "operator notification timed out"),
        }
    }
}

fn calendar_event(request: &BookingRequest, slot: &Slot, tz: Tz) -> CalendarEvent {
    CalendarEvent {
        summary: format!("Appointment request from {}", request.phone),
        description: format!(
            "{} {}, VIN: {}\nIssue: {}",
            request.vehicle, request.year, request.vin, request.issue
        ),
        start: slot.start.to_rfc3339(),
        end: slot.end.to_rfc3339(),
        timezone: tz.name().to_string(),
    }
}

fn operator_message(booking: &Booking) -> String {
    let r = &booking.request;
    format!(
        "New appointment:\nVehicle: {}\nYear: {}\nVIN: {}\nPhone: {}\nIssue: {}\nVisit: {}\nCreated: {}",
        r.vehicle,
        r.year,
        r.vin,
        r.phone,
        r.issue,
        booking.slot_start.format(SLOT_LABEL_FORMAT),
        booking.created_at.format(LEDGER_TIME_FORMAT),
    )
}
