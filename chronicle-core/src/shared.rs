//! Async handle to a single ledger.
//!
//! Ledger writes are read-modify-write over whole collections, so two
//! concurrent writers would lose each other's events. `SharedLedger` puts the
//! ledger behind one async mutex: every clone of the handle goes through the
//! same writer, and compaction takes the same lock as creation.

use crate::compact::CompactionReport;
use crate::config::LedgerConfig;
use crate::directory::{CharacterDirectory, MemoryDirectory};
use crate::error::LedgerError;
use crate::event::{Event, EventDraft, EventPatch};
use crate::graph::{MemoryGraph, RelationshipGraph};
use crate::ids::{EntityId, EventId};
use crate::ledger::{EventLedger, EventMap};
use crate::query::QueryService;
use crate::store::{KeyValueStore, MemoryStore};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Cloneable, lock-guarded ledger handle.
pub struct SharedLedger<S = MemoryStore, G = MemoryGraph, D = MemoryDirectory> {
    inner: Arc<Mutex<EventLedger<S, G, D>>>,
}

impl<S, G, D> Clone for SharedLedger<S, G, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl SharedLedger {
    /// A shared ledger over in-memory collaborators.
    pub fn in_memory(config: LedgerConfig) -> Self {
        Self::new(EventLedger::in_memory(config))
    }
}

impl<S, G, D> SharedLedger<S, G, D>
where
    S: KeyValueStore,
    G: RelationshipGraph,
    D: CharacterDirectory,
{
    /// Wrap a ledger.
    pub fn new(ledger: EventLedger<S, G, D>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Hold the writer lock directly, for multi-step work.
    pub async fn lock(&self) -> MutexGuard<'_, EventLedger<S, G, D>> {
        self.inner.lock().await
    }

    pub async fn create_event(&self, draft: EventDraft) -> Result<Event, LedgerError> {
        self.inner.lock().await.create_event(draft)
    }

    pub async fn create_event_from_ai_action(
        &self,
        action: &Value,
        current_char: &EntityId,
    ) -> Result<Event, LedgerError> {
        self.inner
            .lock()
            .await
            .create_event_from_ai_action(action, current_char)
    }

    pub async fn update_event(
        &self,
        id: &EventId,
        patch: EventPatch,
    ) -> Result<Event, LedgerError> {
        self.inner.lock().await.update_event(id, patch)
    }

    pub async fn toggle_event_complete(&self, id: &EventId) -> Result<Event, LedgerError> {
        self.inner.lock().await.toggle_event_complete(id)
    }

    pub async fn delete_event(&self, id: &EventId) -> Result<Event, LedgerError> {
        self.inner.lock().await.delete_event(id)
    }

    pub async fn compress_old_events(
        &self,
        max_age_days: u32,
        max_count: usize,
    ) -> Result<CompactionReport, LedgerError> {
        self.inner
            .lock()
            .await
            .compress_old_events(max_age_days, max_count)
    }

    /// Compact with the configured retention policy.
    pub async fn compact(&self) -> Result<CompactionReport, LedgerError> {
        self.inner.lock().await.compact()
    }

    pub async fn get_all_events(&self) -> Result<EventMap, LedgerError> {
        self.inner.lock().await.get_all_events()
    }

    /// Snapshot the events into a query view. The view does not see later writes.
    pub async fn query(&self) -> Result<QueryService, LedgerError> {
        self.inner.lock().await.query()
    }

    /// Recover the ledger if this is the last handle.
    pub fn try_unwrap(self) -> Result<EventLedger<S, G, D>, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}
