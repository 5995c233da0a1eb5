//! Identifier types and pair canonicalization.
//!
//! Entity IDs are ordered byte-wise on their string form. That order is the
//! single total order used to pick one storage slot per unordered pair: the
//! smaller ID is always node A, the larger always node B.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier for an entity (the user or a character).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is blank (treated as missing).
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for EntityId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for EntityId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Ledger-local unique identifier for an event.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Generate a fresh ID: a time-ordered UUIDv7 (millisecond prefix plus
    /// random tail) behind an `evt_` tag.
    pub fn generate() -> Self {
        Self(format!("evt_{}", Uuid::now_v7().simple()))
    }

    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// How a directed `(from, to)` tuple lines up with its canonical pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// `from` is node A: the tuple reads A→B.
    Forward,
    /// `from` is node B: the tuple reads B→A.
    Reversed,
}

/// An unordered entity pair stored as `(a, b)` with `a <= b`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CanonicalPair {
    a: EntityId,
    b: EntityId,
}

impl CanonicalPair {
    /// Build the canonical pair for two entities, in either order.
    pub fn new(x: EntityId, y: EntityId) -> Self {
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    /// Canonicalize a directed tuple, reporting which way it ran.
    pub fn orient(from: &EntityId, to: &EntityId) -> (Self, Orientation) {
        let orientation = if from <= to {
            Orientation::Forward
        } else {
            Orientation::Reversed
        };
        (Self::new(from.clone(), to.clone()), orientation)
    }

    /// The smaller entity.
    pub fn a(&self) -> &EntityId {
        &self.a
    }

    /// The larger entity.
    pub fn b(&self) -> &EntityId {
        &self.b
    }

    /// Check if this pair involves a specific entity.
    pub fn involves(&self, id: &EntityId) -> bool {
        &self.a == id || &self.b == id
    }

    /// Get the other entity in the pair.
    pub fn other(&self, id: &EntityId) -> Option<&EntityId> {
        if &self.a == id {
            Some(&self.b)
        } else if &self.b == id {
            Some(&self.a)
        } else {
            None
        }
    }

    /// Direction of `viewer`'s own outgoing fields, if `viewer` is in the pair.
    pub fn orientation_of(&self, viewer: &EntityId) -> Option<Orientation> {
        if &self.a == viewer {
            Some(Orientation::Forward)
        } else if &self.b == viewer {
            Some(Orientation::Reversed)
        } else {
            None
        }
    }
}

impl fmt::Display for CanonicalPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}", self.a, self.b)
    }
}
