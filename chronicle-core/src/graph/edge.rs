//! Objective relationship edges.

use crate::ids::{CanonicalPair, EntityId, EventId, Orientation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// Maximum change-log entries kept per edge; the oldest are evicted first.
pub const CHANGE_LOG_CAPACITY: usize = 50;

/// Role label for a freshly created edge.
pub const DEFAULT_ROLE: &str = "acquainted";

/// Attitude description for a freshly created edge.
pub const DEFAULT_ATTITUDE: &str = "neutral";

/// One recorded attitude shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub timestamp: DateTime<Utc>,
    pub event_id: EventId,
    pub change: f64,
    pub reason: String,
}

/// Who may see an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Everyone.
    All,
    /// Only the listed entities.
    Entities(BTreeSet<EntityId>),
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Entities(BTreeSet::new())
    }
}

impl Visibility {
    /// Check if an entity may see the edge.
    pub fn contains(&self, id: &EntityId) -> bool {
        match self {
            Visibility::All => true,
            Visibility::Entities(ids) => ids.contains(id),
        }
    }

    /// Grant visibility to more entities. `All` stays `All`.
    pub fn extend<'a>(&mut self, ids: impl IntoIterator<Item = &'a EntityId>) {
        if let Visibility::Entities(set) = self {
            set.extend(ids.into_iter().cloned());
        }
    }
}

/// The relationship between two entities as seen from one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectedView {
    /// The other entity.
    pub other: EntityId,
    /// The viewer's role label for the other.
    pub my_view: String,
    /// The other's role label for the viewer.
    pub their_view: String,
    /// The viewer's attitude toward the other.
    pub my_attitude: String,
    /// The other's attitude toward the viewer.
    pub their_attitude: String,
}

/// The single shared-truth record for a canonical pair.
///
/// Directional fields are named from node A's side: `a_view_of_b` is the
/// role A assigns to B.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pair: CanonicalPair,
    pub a_view_of_b: String,
    pub b_view_of_a: String,
    pub a_toward_b: String,
    pub b_toward_a: String,
    #[serde(default)]
    change_log: VecDeque<ChangeLogEntry>,
    #[serde(default)]
    pub visible_to: Visibility,
    #[serde(default)]
    pub backstory: String,
}

impl RelationshipEdge {
    /// Create an edge with default labels, visible to nobody.
    pub fn new(pair: CanonicalPair) -> Self {
        Self {
            pair,
            a_view_of_b: DEFAULT_ROLE.to_string(),
            b_view_of_a: DEFAULT_ROLE.to_string(),
            a_toward_b: DEFAULT_ATTITUDE.to_string(),
            b_toward_a: DEFAULT_ATTITUDE.to_string(),
            change_log: VecDeque::new(),
            visible_to: Visibility::default(),
            backstory: String::new(),
        }
    }

    /// Create the edge an event brings into existence.
    pub fn established_by(pair: CanonicalPair, event_id: &EventId) -> Self {
        let mut edge = Self::new(pair);
        edge.visible_to.extend([edge.pair.a(), edge.pair.b()]);
        edge.backstory = format!("established via event {event_id}");
        edge
    }

    /// The canonical pair this edge belongs to.
    pub fn pair(&self) -> &CanonicalPair {
        &self.pair
    }

    /// Write a role label in the given direction.
    pub fn set_view(&mut self, orientation: Orientation, view: impl Into<String>) {
        match orientation {
            Orientation::Forward => self.a_view_of_b = view.into(),
            Orientation::Reversed => self.b_view_of_a = view.into(),
        }
    }

    /// Write an attitude description in the given direction.
    pub fn set_attitude(&mut self, orientation: Orientation, attitude: impl Into<String>) {
        match orientation {
            Orientation::Forward => self.a_toward_b = attitude.into(),
            Orientation::Reversed => self.b_toward_a = attitude.into(),
        }
    }

    /// Append an attitude shift, evicting the oldest beyond capacity.
    pub fn push_change(&mut self, entry: ChangeLogEntry) {
        self.change_log.push_back(entry);
        while self.change_log.len() > CHANGE_LOG_CAPACITY {
            self.change_log.pop_front();
        }
    }

    /// Attitude shifts, oldest first.
    pub fn change_log(&self) -> &VecDeque<ChangeLogEntry> {
        &self.change_log
    }

    /// Role label `from` assigns to the other node.
    pub fn view_of(&self, from: &EntityId) -> Option<&str> {
        match self.pair.orientation_of(from)? {
            Orientation::Forward => Some(&self.a_view_of_b),
            Orientation::Reversed => Some(&self.b_view_of_a),
        }
    }

    /// Re-express the edge from one participant's side.
    pub fn view_from(&self, viewer: &EntityId) -> Option<DirectedView> {
        let other = self.pair.other(viewer)?.clone();
        let view = match self.pair.orientation_of(viewer)? {
            Orientation::Forward => DirectedView {
                other,
                my_view: self.a_view_of_b.clone(),
                their_view: self.b_view_of_a.clone(),
                my_attitude: self.a_toward_b.clone(),
                their_attitude: self.b_toward_a.clone(),
            },
            Orientation::Reversed => DirectedView {
                other,
                my_view: self.b_view_of_a.clone(),
                their_view: self.a_view_of_b.clone(),
                my_attitude: self.b_toward_a.clone(),
                their_attitude: self.a_toward_b.clone(),
            },
        };
        Some(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: u32) -> ChangeLogEntry {
        ChangeLogEntry {
            timestamp: Utc::now(),
            event_id: EventId::new(format!("evt_{n}")),
            change: f64::from(n),
            reason: format!("change {n}"),
        }
    }

    #[test]
    fn test_change_log_is_bounded() {
        let mut edge = RelationshipEdge::new(CanonicalPair::new("a".into(), "b".into()));
        for n in 1..=51 {
            edge.push_change(entry(n));
        }
        assert_eq!(edge.change_log().len(), CHANGE_LOG_CAPACITY);
        // The first change was evicted; 2..=51 remain in order.
        assert_eq!(edge.change_log().front().unwrap().change, 2.0);
        assert_eq!(edge.change_log().back().unwrap().change, 51.0);
    }

    #[test]
    fn test_view_from_each_side() {
        let pair = CanonicalPair::new("alice".into(), "bob".into());
        let mut edge = RelationshipEdge::new(pair);
        edge.set_view(Orientation::Forward, "mentor");
        edge.set_view(Orientation::Reversed, "student");

        let alice = edge.view_from(&"alice".into()).unwrap();
        assert_eq!(alice.other, "bob");
        assert_eq!(alice.my_view, "mentor");
        assert_eq!(alice.their_view, "student");

        let bob = edge.view_from(&"bob".into()).unwrap();
        assert_eq!(bob.my_view, "student");
        assert_eq!(edge.view_of(&"bob".into()), Some("student"));
        assert!(edge.view_from(&"carol".into()).is_none());
    }

    #[test]
    fn test_established_edge_is_visible_to_both() {
        let pair = CanonicalPair::new("alice".into(), "bob".into());
        let edge = RelationshipEdge::established_by(pair, &EventId::new("evt_1"));
        assert!(edge.visible_to.contains(&"alice".into()));
        assert!(edge.visible_to.contains(&"bob".into()));
        assert!(!edge.visible_to.contains(&"carol".into()));
        assert_eq!(edge.backstory, "established via event evt_1");
        assert_eq!(edge.a_view_of_b, DEFAULT_ROLE);
    }

    #[test]
    fn test_visibility_all_absorbs_extend() {
        let mut vis = Visibility::All;
        vis.extend([&EntityId::from("x")]);
        assert_eq!(vis, Visibility::All);
        assert!(vis.contains(&"anyone".into()));
    }
}
