//! In-process collaborators for tests, demos and the CLI.
//!
//! [`InMemoryCalendar`] reports its inserted events as busy time, so a
//! second booking of the same slot is caught by revalidation like it would
//! be against a real calendar.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::content::ContentSource;
use crate::error::CollaboratorError;
use crate::messages::Locale;
use crate::request::LEDGER_HEADER;
use crate::services::{CalendarEvent, CalendarService, Ledger, Notifier, RawBusyInterval};

/// Calendar held in memory, with switchable failures.
#[derive(Default)]
pub struct InMemoryCalendar {
    busy: Mutex<Vec<RawBusyInterval>>,
    events: Mutex<Vec<(String, CalendarEvent)>>,
    queries: AtomicUsize,
    fail_queries: AtomicBool,
    fail_inserts: AtomicBool,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_busy(busy: Vec<RawBusyInterval>) -> Self {
        Self {
            busy: Mutex::new(busy),
            ..Self::default()
        }
    }

    /// Mark a range busy, as another actor booking it would.
    pub async fn add_busy(&self, interval: RawBusyInterval) {
        self.busy.lock().await.push(interval);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Events inserted so far, with their ids.
    pub async fn events(&self) -> Vec<(String, CalendarEvent)> {
        self.events.lock().await.clone()
    }

    /// Number of free/busy queries received.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CalendarService for InMemoryCalendar {
    async fn query_busy(
        &self,
        _resource_id: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<RawBusyInterval>, CollaboratorError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(CollaboratorError::new("calendar unreachable"));
        }

        let mut busy = self.busy.lock().await.clone();
        busy.extend(
            self.events
                .lock()
                .await
                .iter()
                .map(|(_, e)| RawBusyInterval::new(e.start.clone(), e.end.clone())),
        );

        // Mimic the remote filter for zoned values; naive values are passed
        // through and left to the caller, as a real free/busy API would.
        Ok(busy
            .into_iter()
            .filter(|b| match (parse_utc(&b.start), parse_utc(&b.end)) {
                (Some(s), Some(e)) => s < window_end && e > window_start,
                _ => true,
            })
            .collect())
    }

    async fn insert_event(
        &self,
        _resource_id: &str,
        event: &CalendarEvent,
    ) -> Result<String, CollaboratorError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(CollaboratorError::new("calendar rejected the event"));
        }
        let mut events = self.events.lock().await;
        let id = format!("evt-{}", events.len() + 1);
        events.push((id.clone(), event.clone()));
        Ok(id)
    }
}

fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Ledger held in memory. Starts with a header row, like a spreadsheet.
pub struct InMemoryLedger {
    rows: Mutex<Vec<Vec<String>>>,
    fail_appends: AtomicBool,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        let header: Vec<String> = LEDGER_HEADER.into_iter().map(String::from).collect();
        Self {
            rows: Mutex::new(vec![header]),
            fail_appends: AtomicBool::new(false),
        }
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Data rows, header excluded.
    pub async fn records(&self) -> Vec<Vec<String>> {
        self.rows.lock().await.iter().skip(1).cloned().collect()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn row_count(&self) -> Result<usize, CollaboratorError> {
        Ok(self.rows.lock().await.len())
    }

    async fn append_row(&self, row: Vec<String>) -> Result<(), CollaboratorError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(CollaboratorError::new("sheet quota exceeded"));
        }
        self.rows.lock().await.push(row);
        Ok(())
    }
}

/// Notifier that remembers what it was asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, channel: &str, text: &str) -> Result<(), CollaboratorError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::new("chat API returned 502"));
        }
        self.sent
            .lock()
            .await
            .push((channel.to_string(), text.to_string()));
        Ok(())
    }
}

/// Content source backed by maps that can be edited between reloads.
#[derive(Default)]
pub struct StaticContentSource {
    promos: Mutex<HashMap<Locale, String>>,
    contacts: Mutex<HashMap<String, String>>,
    loads: AtomicUsize,
    fail: AtomicBool,
}

impl StaticContentSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn set_promo(&self, locale: Locale, text: impl Into<String>) {
        self.promos.lock().await.insert(locale, text.into());
    }

    pub async fn set_contact(&self, key: impl Into<String>, value: impl Into<String>) {
        self.contacts.lock().await.insert(key.into(), value.into());
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// How many times promos were loaded.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for StaticContentSource {
    async fn load_promos(&self) -> Result<HashMap<Locale, String>, CollaboratorError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::new("sheet unavailable"));
        }
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.promos.lock().await.clone())
    }

    async fn load_contacts(&self) -> Result<HashMap<String, String>, CollaboratorError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::new("sheet unavailable"));
        }
        Ok(self.contacts.lock().await.clone())
    }
}
