//! Relationship graph contract.
//!
//! The graph holds one objective edge per canonical pair. Subjective views
//! are assembled at read time by laying one observer's rumors over the
//! objective edges; the two are never merged in storage.

mod edge;
mod memory;

pub use edge::{
    ChangeLogEntry, DirectedView, RelationshipEdge, Visibility, CHANGE_LOG_CAPACITY,
    DEFAULT_ATTITUDE, DEFAULT_ROLE,
};
pub use memory::MemoryGraph;

use crate::directory::CharacterDirectory;
use crate::error::StoreError;
use crate::ids::{CanonicalPair, EntityId, Orientation};
use crate::rumor::{RumorEntry, RumorStore};
use serde::{Deserialize, Serialize};

/// A graph node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Nodes and edges, as handed to renderers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<Node>,
    pub edges: Vec<RelationshipEdge>,
}

/// Storage of objective relationship edges.
pub trait RelationshipGraph {
    /// Get the edge for an unordered pair.
    fn get_relationship(&self, a: &EntityId, b: &EntityId) -> Option<RelationshipEdge>;

    /// Insert or replace the edge for its pair.
    fn save_relationship(&mut self, edge: RelationshipEdge) -> Result<(), StoreError>;

    /// Get a node by ID.
    fn get_node(&self, id: &EntityId) -> Option<Node>;

    /// All nodes.
    fn get_all_nodes(&self) -> Vec<Node>;

    /// All nodes and objective edges.
    fn get_graph_data(&self) -> GraphData;

    /// The graph as `observer` believes it to be.
    ///
    /// For each direction of each edge, the observer's rumor wins where one
    /// is recorded and the objective label is used otherwise. Pairs the
    /// observer holds a rumor about but that have no objective edge appear
    /// as default edges carrying only the rumored labels.
    fn get_subjective_graph(&self, observer: &EntityId, rumors: &RumorStore) -> GraphData {
        let GraphData { nodes, mut edges } = self.get_graph_data();

        for edge in &mut edges {
            if let Some(rumor) = rumors.get(observer, edge.pair()) {
                overlay_rumor(edge, rumor);
            }
        }

        for rumor in rumors.entries_of(observer) {
            if edges.iter().any(|e| e.pair() == &rumor.pair) {
                continue;
            }
            let mut edge = RelationshipEdge::new(rumor.pair.clone());
            overlay_rumor(&mut edge, rumor);
            edge.visible_to.extend([observer]);
            edge.backstory = rumor.reason.clone();
            edges.push(edge);
        }

        GraphData { nodes, edges }
    }

    /// Edges an entity is allowed to see.
    fn get_visible_relationships(&self, id: &EntityId) -> Vec<RelationshipEdge> {
        self.get_graph_data()
            .edges
            .into_iter()
            .filter(|e| e.visible_to.contains(id))
            .collect()
    }

    /// Reset an edge's labels to what each character's profile configures.
    ///
    /// Returns `None` when neither entity is a known character. The change
    /// log and visibility of an existing edge are kept.
    fn sync_from_settings(
        &mut self,
        a: &EntityId,
        b: &EntityId,
        directory: &dyn CharacterDirectory,
    ) -> Result<Option<RelationshipEdge>, StoreError> {
        let char_a = directory.get_character(a);
        let char_b = directory.get_character(b);
        if char_a.is_none() && char_b.is_none() {
            return Ok(None);
        }

        let pair = CanonicalPair::new(a.clone(), b.clone());
        let mut edge = match self.get_relationship(a, b) {
            Some(existing) => existing,
            None => {
                let mut edge = RelationshipEdge::new(pair.clone());
                edge.visible_to.extend([a, b]);
                edge
            }
        };

        for (from, to, character) in [(a, b, &char_a), (b, a, &char_b)] {
            let Some(orientation) = pair.orientation_of(from) else {
                continue;
            };
            let setting = character
                .as_ref()
                .and_then(|c| c.relation_settings.get(to));
            match setting {
                Some(setting) => {
                    edge.set_view(orientation, setting.role.clone());
                    edge.set_attitude(orientation, setting.attitude.clone());
                }
                None => {
                    edge.set_view(orientation, DEFAULT_ROLE);
                    edge.set_attitude(orientation, DEFAULT_ATTITUDE);
                }
            }
        }
        edge.backstory = "synced from character settings".to_string();

        self.save_relationship(edge.clone())?;
        Ok(Some(edge))
    }
}

fn overlay_rumor(edge: &mut RelationshipEdge, rumor: &RumorEntry) {
    if let Some(view) = &rumor.content_a_to_b {
        edge.set_view(Orientation::Forward, view.as_str());
    }
    if let Some(view) = &rumor.content_b_to_a {
        edge.set_view(Orientation::Reversed, view.as_str());
    }
}
