//! Admin-reloadable cache of promo texts and contact details.
//!
//! Content lives in an external spreadsheet. The cache loads it on the first
//! read and keeps serving that snapshot until [`ContentCache::reload`] is
//! called; a failed reload keeps the previous snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CollaboratorError;
use crate::messages::Locale;

/// Fallback greeting when no promo is configured for any locale.
pub const DEFAULT_PROMO: &str = "Добро пожаловать!";

/// Spreadsheet-like store of shop content.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn load_promos(&self) -> Result<HashMap<Locale, String>, CollaboratorError>;
    async fn load_contacts(&self) -> Result<HashMap<String, String>, CollaboratorError>;
}

#[derive(Debug, Clone, Default)]
struct Snapshot {
    promos: HashMap<Locale, String>,
    contacts: HashMap<String, String>,
}

/// Read-through cache over a [`ContentSource`].
#[derive(Clone)]
pub struct ContentCache {
    source: Arc<dyn ContentSource>,
    snapshot: Arc<RwLock<Option<Snapshot>>>,
}

impl ContentCache {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self {
            source,
            snapshot: Arc::new(RwLock::new(None)),
        }
    }

    /// Re-read promos and contacts from the source.
    ///
    /// # Errors
    /// Returns the source error; the cached snapshot is left untouched.
    pub async fn reload(&self) -> Result<(), CollaboratorError> {
        let snapshot = self.load().await?;
        *self.snapshot.write().await = Some(snapshot);
        Ok(())
    }

    /// Promo for `locale`, else the Russian one, else [`DEFAULT_PROMO`].
    pub async fn promo(&self, locale: Locale) -> String {
        let snapshot = self.current().await;
        snapshot
            .promos
            .get(&locale)
            .or_else(|| snapshot.promos.get(&Locale::Ru))
            .cloned()
            .unwrap_or_else(|| DEFAULT_PROMO.to_string())
    }

    /// Contact value such as `PHONE` or `ADDRESS`.
    pub async fn contact(&self, key: &str) -> Option<String> {
        self.current().await.contacts.get(key).cloned()
    }

    async fn current(&self) -> Snapshot {
        if let Some(snapshot) = self.snapshot.read().await.as_ref() {
            return snapshot.clone();
        }

        // Concurrent first reads queue on the write lock; only one loads.
        let mut slot = self.snapshot.write().await;
        if let Some(snapshot) = slot.as_ref() {
            return snapshot.clone();
        }
        match self.load().await {
            Ok(snapshot) => {
                *slot = Some(snapshot.clone());
                snapshot
            }
            Err(e) => {
                tracing::warn!("initial content load failed: {}", e);
                Snapshot::default()
            }
        }
    }

    async fn load(&self) -> Result<Snapshot, CollaboratorError> {
        let promos = self.source.load_promos().await?;
        let contacts = self.source.load_contacts().await?;
        tracing::info!(promos = promos.len(), contacts = contacts.len(), "content loaded");
        Ok(Snapshot { promos, contacts })
    }
}
