//! Guided conversation that collects a [`BookingRequest`] and books a slot.
//!
//! One field per state, in a fixed order. A validation failure re-prompts
//! without advancing. Reset keywords discard everything collected so far.

use std::sync::Arc;

use serde::Serialize;

use crate::busy::BusySource;
use crate::error::{BookingError, ValidationError};
use crate::messages::{Locale, MessageBundle, MessageId};
use crate::negotiator::{Negotiation, Negotiator};
use crate::request::{Booking, BookingRequestBuilder};
use crate::services::Clock;
use crate::slots::{self, SchedulePolicy, Slot};
use crate::validate;

/// Inputs that restart the conversation, compared case-insensitively.
pub const RESET_KEYWORDS: &[&str] = &[
    "reset",
    "/reset",
    "сброс",
    "новая проблема",
    "нова проблема",
    "od nowa",
];

pub fn is_reset(input: &str) -> bool {
    let input = input.trim().to_lowercase();
    RESET_KEYWORDS.contains(&input.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DialogueState {
    CollectingVehicle,
    CollectingYear,
    CollectingVin,
    CollectingPhone,
    CollectingIssue,
    SelectingSlot,
    Done,
}

/// A selectable option rendered by the transport (e.g. an inline button).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotOption {
    pub id: String,
    pub label: String,
}

impl From<&Slot> for SlotOption {
    fn from(slot: &Slot) -> Self {
        Self {
            id: slot.id(),
            label: slot.label(),
        }
    }
}

/// What the transport shows the user after one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub text: String,
    pub options: Vec<SlotOption>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            options: Vec::new(),
        }
    }

    fn prefixed(mut self, prefix: &str) -> Self {
        self.text = format!("{prefix}\n{}", self.text);
        self
    }
}

/// Per-user conversation state. Owned by the session; dropping it abandons
/// the request.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub locale: Locale,
    state: DialogueState,
    builder: BookingRequestBuilder,
    offered: Vec<Slot>,
    booking: Option<Booking>,
}

impl Conversation {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            state: DialogueState::CollectingVehicle,
            builder: BookingRequestBuilder::new(),
            offered: Vec::new(),
            booking: None,
        }
    }

    pub fn state(&self) -> DialogueState {
        self.state
    }

    /// Slots currently on offer, in the order shown.
    pub fn offered(&self) -> &[Slot] {
        &self.offered
    }

    /// The committed booking, once `Done`.
    pub fn booking(&self) -> Option<&Booking> {
        self.booking.as_ref()
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.locale);
    }

    fn advance(&mut self, next: DialogueState) {
        tracing::debug!(from = ?self.state, to = ?next, "dialogue transition");
        self.state = next;
    }
}

/// Drives [`Conversation`]s: validation, slot offers and booking.
#[derive(Clone)]
pub struct BookingFlow {
    busy: BusySource,
    negotiator: Negotiator,
    policy: SchedulePolicy,
    clock: Arc<dyn Clock>,
    messages: MessageBundle,
}

impl BookingFlow {
    pub fn new(
        busy: BusySource,
        negotiator: Negotiator,
        policy: SchedulePolicy,
        clock: Arc<dyn Clock>,
        messages: MessageBundle,
    ) -> Self {
        Self {
            busy,
            negotiator,
            policy,
            clock,
            messages,
        }
    }

    /// First prompt of a fresh conversation.
    pub fn start(&self, conversation: &Conversation) -> Reply {
        Reply::text(self.msg(MessageId::AskVehicle, conversation.locale))
    }

    /// Handle one user input and produce the reply.
    pub async fn handle(&self, conv: &mut Conversation, input: &str) -> Reply {
        if is_reset(input) {
            conv.reset();
            return Reply::text(self.msg(MessageId::AskVehicle, conv.locale))
                .prefixed(self.msg(MessageId::ResetDone, conv.locale));
        }

        let locale = conv.locale;
        match conv.state {
            DialogueState::CollectingVehicle => match validate::parse_vehicle(input) {
                Ok(vehicle) => {
                    conv.builder.vehicle(vehicle);
                    conv.advance(DialogueState::CollectingYear);
                    Reply::text(self.msg(MessageId::AskYear, locale))
                }
                Err(e) => self.invalid(e, locale),
            },
            DialogueState::CollectingYear => match validate::parse_year(input) {
                Ok(year) => {
                    conv.builder.year(year);
                    conv.advance(DialogueState::CollectingVin);
                    Reply::text(self.msg(MessageId::AskVin, locale))
                }
                Err(e) => self.invalid(e, locale),
            },
            DialogueState::CollectingVin => match validate::parse_vin(input) {
                Ok(vin) => {
                    conv.builder.vin(vin);
                    conv.advance(DialogueState::CollectingPhone);
                    Reply::text(self.msg(MessageId::AskPhone, locale))
                }
                Err(e) => self.invalid(e, locale),
            },
            DialogueState::CollectingPhone => match validate::parse_phone(input) {
                Ok(phone) => {
                    conv.builder.phone(phone);
                    conv.advance(DialogueState::CollectingIssue);
                    Reply::text(self.msg(MessageId::AskIssue, locale))
                }
                Err(e) => self.invalid(e, locale),
            },
            DialogueState::CollectingIssue => match validate::parse_issue(input) {
                Ok(issue) => {
                    conv.builder.issue(issue);
                    conv.advance(DialogueState::SelectingSlot);
                    self.offer_slots(conv).await
                }
                Err(e) => self.invalid(e, locale),
            },
            DialogueState::SelectingSlot => {
                // Nothing on offer yet (calendar was down or full): try again.
                if conv.offered.is_empty() {
                    return self.offer_slots(conv).await;
                }
                let choice = input.trim();
                let selected = conv
                    .offered
                    .iter()
                    .find(|s| s.id() == choice || s.label() == choice)
                    .copied();
                match selected {
                    Some(slot) => self.book(conv, slot).await,
                    // Same list again, so the buttons stay in sync with the selection.
                    None => self.with_offer(conv, self.msg(MessageId::UnknownSlot, locale)),
                }
            }
            DialogueState::Done => Reply::text(self.msg(MessageId::AlreadyBooked, locale)),
        }
    }

    async fn offer_slots(&self, conv: &mut Conversation) -> Reply {
        let locale = conv.locale;
        let now = self.clock.now().with_timezone(&self.policy.timezone);
        let window = self.policy.window_from(now);

        let busy = match self.busy.fetch(window.start, window.end).await {
            Ok(busy) => busy,
            Err(e) => {
                tracing::warn!("cannot offer slots: {}", e);
                conv.offered.clear();
                return Reply::text(self.msg(MessageId::TryLater, locale));
            }
        };

        conv.offered = slots::generate_slots(&busy, &window, &self.policy);
        if conv.offered.is_empty() {
            return Reply::text(self.msg(MessageId::NoSlots, locale));
        }
        self.with_offer(conv, self.msg(MessageId::ChooseSlot, locale))
    }

    async fn book(&self, conv: &mut Conversation, slot: Slot) -> Reply {
        let locale = conv.locale;
        let Some(request) = conv.builder.build() else {
            // Unreachable through `handle`; start over rather than book garbage.
            conv.reset();
            return Reply::text(self.msg(MessageId::AskVehicle, locale));
        };

        let mut attempt = Negotiation::new(request, slot);
        match self.negotiator.negotiate(&mut attempt).await {
            Ok(booking) => self.confirm(conv, slot.label(), Some(booking)),
            // The visit is in the calendar; the ledger gap is for the operator.
            Err(BookingError::LedgerWriteFailed { .. }) => self.confirm(conv, slot.label(), None),
            Err(BookingError::SlotConflict { .. }) => self
                .offer_slots(conv)
                .await
                .prefixed(self.msg(MessageId::SlotTaken, locale)),
            Err(BookingError::UpstreamUnavailable(_)) => {
                self.with_offer(conv, self.msg(MessageId::TryLater, locale))
            }
            Err(e) => {
                tracing::warn!(slot = %slot.id(), "booking attempt failed: {}", e);
                self.with_offer(conv, self.msg(MessageId::BookingFailed, locale))
            }
        }
    }

    fn confirm(&self, conv: &mut Conversation, label: String, booking: Option<Booking>) -> Reply {
        conv.offered.clear();
        conv.booking = booking;
        conv.advance(DialogueState::Done);
        Reply::text(
            self.messages
                .render(MessageId::Confirmed, conv.locale, &[("slot", label.as_str())]),
        )
    }

    fn with_offer(&self, conv: &Conversation, text: &str) -> Reply {
        Reply {
            text: text.to_string(),
            options: conv.offered.iter().map(SlotOption::from).collect(),
        }
    }

    fn invalid(&self, error: ValidationError, locale: Locale) -> Reply {
        let id = match error {
            ValidationError::VehicleFormat => MessageId::InvalidVehicleFormat,
            ValidationError::VehicleMake => MessageId::InvalidVehicleMake,
            ValidationError::VehicleModel => MessageId::InvalidVehicleModel,
            ValidationError::Year => MessageId::InvalidYear,
            ValidationError::Vin => MessageId::InvalidVin,
            ValidationError::Phone => MessageId::InvalidPhone,
            ValidationError::Issue => MessageId::InvalidIssue,
            ValidationError::UnknownSlot => MessageId::UnknownSlot,
        };
        Reply::text(self.msg(id, locale))
    }

    fn msg(&self, id: MessageId, locale: Locale) -> &str {
        self.messages.text(id, locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_keywords_in_several_languages() {
        assert!(is_reset("Reset"));
        assert!(is_reset(" /reset "));
        assert!(is_reset("СБРОС"));
        assert!(is_reset("новая проблема"));
        assert!(is_reset("Od nowa"));
        assert!(!is_reset("Audi A4"));
    }
}
