//! The event ledger: sole writer of event records.
//!
//! Every mutation reads the whole collection from the store, changes it in
//! memory and writes it back. All methods that mutate take `&mut self`, so a
//! ledger used from one place is its own single writer; see
//! [`SharedLedger`](crate::shared::SharedLedger) for async callers.

use crate::compact::{self, CompactionReport};
use crate::config::{LedgerConfig, RetentionPolicy};
use crate::directory::{CharacterDirectory, MemoryDirectory};
use crate::error::LedgerError;
use crate::event::{Event, EventDraft, EventPatch};
use crate::graph::{GraphData, MemoryGraph, RelationshipGraph};
use crate::ids::{EntityId, EventId};
use crate::processor::{ChangeProcessor, ProcessOutcome};
use crate::query::QueryService;
use crate::rumor::RumorStore;
use crate::store::{self, KeyValueStore, MemoryStore};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// All events, keyed by ID.
pub type EventMap = BTreeMap<EventId, Event>;

/// Event store plus the collaborators its writes feed.
pub struct EventLedger<S = MemoryStore, G = MemoryGraph, D = MemoryDirectory> {
    store: S,
    graph: G,
    directory: D,
    config: LedgerConfig,
    processor: ChangeProcessor,
}

impl EventLedger {
    /// A ledger backed entirely by in-memory collaborators.
    pub fn in_memory(config: LedgerConfig) -> Self {
        Self::new(MemoryStore::new(), MemoryGraph::new(), MemoryDirectory::new(), config)
    }
}

impl<S, G, D> EventLedger<S, G, D>
where
    S: KeyValueStore,
    G: RelationshipGraph,
    D: CharacterDirectory,
{
    /// Create a ledger over a store, a relationship graph and a character directory.
    pub fn new(store: S, graph: G, directory: D, config: LedgerConfig) -> Self {
        let processor = ChangeProcessor::new(config.self_id.clone());
        Self {
            store,
            graph,
            directory,
            config,
            processor,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// The self-identity sentinel.
    pub fn self_id(&self) -> &EntityId {
        &self.config.self_id
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The objective relationship graph.
    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Mutable access to the relationship graph (node registration, manual edits).
    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }

    /// The character directory.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Mutable access to the character directory.
    pub fn directory_mut(&mut self) -> &mut D {
        &mut self.directory
    }

    /// Take the collaborators back out.
    pub fn into_parts(self) -> (S, G, D) {
        (self.store, self.graph, self.directory)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Every event, keyed by ID.
    pub fn get_all_events(&self) -> Result<EventMap, LedgerError> {
        Ok(store::load_or_default(&self.store, &self.config.events_key)?)
    }

    /// Get one event.
    pub fn get_event(&self, id: &EventId) -> Result<Option<Event>, LedgerError> {
        Ok(self.get_all_events()?.remove(id))
    }

    /// Check if an event exists.
    pub fn contains(&self, id: &EventId) -> Result<bool, LedgerError> {
        Ok(self.get_all_events()?.contains_key(id))
    }

    /// Every rumor, for every observer.
    pub fn rumors(&self) -> Result<RumorStore, LedgerError> {
        Ok(store::load_or_default(&self.store, &self.config.rumors_key)?)
    }

    /// The relationship graph as `observer` believes it to be.
    pub fn subjective_graph(&self, observer: &EntityId) -> Result<GraphData, LedgerError> {
        let rumors = self.rumors()?;
        Ok(self.graph.get_subjective_graph(observer, &rumors))
    }

    /// Read-side view over the current events.
    pub fn query(&self) -> Result<QueryService, LedgerError> {
        let events = self.get_all_events()?.into_values().collect();
        Ok(QueryService::new(events, &self.config))
    }

    fn set_all_events(&mut self, events: &EventMap) -> Result<(), LedgerError> {
        store::save(&mut self.store, &self.config.events_key, events)?;
        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Record a new event and apply its declared effects.
    ///
    /// When this returns, the event is persisted and the graph, rumor store
    /// and directory already reflect it.
    pub fn create_event(&mut self, draft: EventDraft) -> Result<Event, LedgerError> {
        self.create_event_at(draft, Utc::now())
    }

    pub(crate) fn create_event_at(
        &mut self,
        draft: EventDraft,
        now: DateTime<Utc>,
    ) -> Result<Event, LedgerError> {
        let event = draft.into_event(now);
        if event.participants.is_empty() {
            tracing::warn!(event = %event.id, "recording event with no participants");
        }

        let mut events = self.get_all_events()?;
        events.insert(event.id.clone(), event.clone());
        self.set_all_events(&events)?;

        let outcome = self.apply_effects(&event)?;
        tracing::info!(
            event = %event.id,
            kind = event.event_type.name(),
            edges = outcome.edges_written,
            rumors = outcome.rumors_written,
            skipped = outcome.skipped,
            "event recorded"
        );
        Ok(event)
    }

    fn apply_effects(&mut self, event: &Event) -> Result<ProcessOutcome, LedgerError> {
        let mut rumors = self.rumors()?;
        let before = rumors.clone();
        let processed = self
            .processor
            .process_relationship_changes(event, &mut self.graph, &mut rumors);
        // Rumors routed before a failed graph save are kept, like the edges saved before it.
        if rumors != before {
            store::save(&mut self.store, &self.config.rumors_key, &rumors)?;
        }
        let outcome = processed?;
        self.processor.process_status_snapshots(event, &mut self.directory)?;
        Ok(outcome)
    }

    /// Merge a patch over an existing event. The event's ID is kept even if
    /// the patch names another.
    pub fn update_event(&mut self, id: &EventId, patch: EventPatch) -> Result<Event, LedgerError> {
        self.modify(id, |event| event.apply_patch(patch))
    }

    /// Flip an event's `completed` flag.
    pub fn toggle_event_complete(&mut self, id: &EventId) -> Result<Event, LedgerError> {
        self.modify(id, |event| event.completed = !event.completed)
    }

    fn modify(
        &mut self,
        id: &EventId,
        change: impl FnOnce(&mut Event),
    ) -> Result<Event, LedgerError> {
        let mut events = self.get_all_events()?;
        let event = events
            .get_mut(id)
            .ok_or_else(|| LedgerError::NotFound(id.clone()))?;
        if event.compressed {
            return Err(LedgerError::Compacted(id.clone()));
        }

        change(event);
        event.id = id.clone();
        let updated = event.clone();

        self.set_all_events(&events)?;
        tracing::debug!(event = %id, "event updated");
        Ok(updated)
    }

    /// Remove an event, returning what was stored.
    pub fn delete_event(&mut self, id: &EventId) -> Result<Event, LedgerError> {
        let mut events = self.get_all_events()?;
        let removed = events
            .remove(id)
            .ok_or_else(|| LedgerError::NotFound(id.clone()))?;
        self.set_all_events(&events)?;
        tracing::info!(event = %id, "event deleted");
        Ok(removed)
    }

    // =========================================================================
    // Retention
    // =========================================================================

    /// Reduce events beyond the age or count limit to stubs.
    pub fn compress_old_events(
        &mut self,
        max_age_days: u32,
        max_count: usize,
    ) -> Result<CompactionReport, LedgerError> {
        let policy = RetentionPolicy {
            max_age_days,
            max_count,
        };
        self.compress_old_events_at(policy, Utc::now())
    }

    /// Compact with the configured retention policy.
    pub fn compact(&mut self) -> Result<CompactionReport, LedgerError> {
        self.compress_old_events_at(self.config.retention, Utc::now())
    }

    /// Compact as of a given instant.
    pub fn compress_old_events_at(
        &mut self,
        policy: RetentionPolicy,
        now: DateTime<Utc>,
    ) -> Result<CompactionReport, LedgerError> {
        let mut events = self.get_all_events()?;
        let report = compact::compress_events(&mut events, policy, now);
        self.set_all_events(&events)?;
        tracing::info!(
            examined = report.examined,
            compressed = report.compressed,
            already_compressed = report.already_compressed,
            "compaction finished"
        );
        Ok(report)
    }
}
