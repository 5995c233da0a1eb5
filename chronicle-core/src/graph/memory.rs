//! In-process relationship graph.

use super::{GraphData, Node, RelationshipEdge, RelationshipGraph};
use crate::error::StoreError;
use crate::ids::{CanonicalPair, EntityId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Relationship graph kept entirely in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryGraph {
    nodes: BTreeMap<EntityId, Node>,
    edges: Vec<RelationshipEdge>,
}

impl MemoryGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or rename a node.
    pub fn upsert_node(&mut self, id: impl Into<EntityId>, name: impl Into<String>) {
        let id = id.into();
        let name = name.into();
        self.nodes
            .entry(id.clone())
            .and_modify(|n| n.name = name.clone())
            .or_insert(Node {
                id,
                name,
                avatar: None,
            });
    }

    /// Get the total number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

impl RelationshipGraph for MemoryGraph {
    fn get_relationship(&self, a: &EntityId, b: &EntityId) -> Option<RelationshipEdge> {
        let pair = CanonicalPair::new(a.clone(), b.clone());
        self.edges.iter().find(|e| e.pair() == &pair).cloned()
    }

    fn save_relationship(&mut self, edge: RelationshipEdge) -> Result<(), StoreError> {
        match self.edges.iter_mut().find(|e| e.pair() == edge.pair()) {
            Some(existing) => *existing = edge,
            None => self.edges.push(edge),
        }
        Ok(())
    }

    fn get_node(&self, id: &EntityId) -> Option<Node> {
        self.nodes.get(id).cloned()
    }

    fn get_all_nodes(&self) -> Vec<Node> {
        self.nodes.values().cloned().collect()
    }

    fn get_graph_data(&self) -> GraphData {
        GraphData {
            nodes: self.get_all_nodes(),
            edges: self.edges.clone(),
        }
    }
}
