//! Testing utilities for the ledger.
//!
//! This module provides collaborators for integration testing:
//! - `RecordingGraph` for checking exactly which objective edges were written,
//!   optionally failing once a number of saves have gone through
//! - `FailingStore` for exercising persistence failures
//! - `sample_directory` with a small cast of characters

use crate::directory::{Character, MemoryDirectory};
use crate::error::StoreError;
use crate::graph::{GraphData, MemoryGraph, Node, RelationshipEdge, RelationshipGraph};
use crate::ids::{CanonicalPair, EntityId};
use crate::store::KeyValueStore;
use serde_json::Value;

/// A graph that remembers every save.
///
/// Reads are served by an inner `MemoryGraph`, so it behaves like the real
/// thing while tests assert on `saves()`.
#[derive(Debug, Default)]
pub struct RecordingGraph {
    inner: MemoryGraph,
    saves: Vec<CanonicalPair>,
    save_budget: Option<usize>,
}

impl RecordingGraph {
    /// Create an empty recording graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph that accepts `saves` edges and rejects every save after.
    pub fn failing_after(saves: usize) -> Self {
        Self {
            save_budget: Some(saves),
            ..Self::default()
        }
    }

    /// Pairs successfully passed to `save_relationship`, in call order.
    pub fn saves(&self) -> &[CanonicalPair] {
        &self.saves
    }

    /// Check if any edge for the pair was ever saved.
    pub fn was_saved(&self, a: &EntityId, b: &EntityId) -> bool {
        let (pair, _) = CanonicalPair::orient(a, b);
        self.saves.contains(&pair)
    }

    /// The wrapped graph.
    pub fn inner(&self) -> &MemoryGraph {
        &self.inner
    }

    /// Mutable access to the wrapped graph; changes made here are not recorded.
    pub fn inner_mut(&mut self) -> &mut MemoryGraph {
        &mut self.inner
    }
}

impl RelationshipGraph for RecordingGraph {
    fn get_relationship(&self, a: &EntityId, b: &EntityId) -> Option<RelationshipEdge> {
        self.inner.get_relationship(a, b)
    }

    fn save_relationship(&mut self, edge: RelationshipEdge) -> Result<(), StoreError> {
        if let Some(budget) = &mut self.save_budget {
            if *budget == 0 {
                return Err(StoreError::Backend {
                    key: edge.pair().to_string(),
                    reason: "graph save rejected".to_string(),
                });
            }
            *budget -= 1;
        }
        self.saves.push(edge.pair().clone());
        self.inner.save_relationship(edge)
    }

    fn get_node(&self, id: &EntityId) -> Option<Node> {
        self.inner.get_node(id)
    }

    fn get_all_nodes(&self) -> Vec<Node> {
        self.inner.get_all_nodes()
    }

    fn get_graph_data(&self) -> GraphData {
        self.inner.get_graph_data()
    }
}

/// A store whose every operation fails.
#[derive(Debug, Clone)]
pub struct FailingStore {
    reason: String,
}

impl FailingStore {
    /// Create a store that reports a generic failure.
    pub fn new() -> Self {
        Self::with_reason("storage unavailable")
    }

    /// Create a store that fails with a specific reason.
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn fail(&self, key: &str) -> StoreError {
        StoreError::Backend {
            key: key.to_string(),
            reason: self.reason.clone(),
        }
    }
}

impl Default for FailingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for FailingStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Err(self.fail(key))
    }

    fn set(&mut self, key: &str, _value: Value) -> Result<(), StoreError> {
        Err(self.fail(key))
    }
}

/// A directory holding alice, bob and carol.
///
/// Alice and bob start out as friends in their relation settings.
pub fn sample_directory() -> MemoryDirectory {
    let mut directory = MemoryDirectory::new();
    directory.insert(Character::new("alice", "Alice").with_relation("bob", "friend", "warm"));
    directory.insert(Character::new("bob", "Bob").with_relation("alice", "friend", "fond"));
    directory.insert(Character::new("carol", "Carol"));
    directory
}
