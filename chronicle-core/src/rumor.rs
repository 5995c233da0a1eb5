//! Per-observer beliefs about relationships the observer is not part of.
//!
//! A rumor is only ever read as truth by its own observer. Entries are kept
//! in the same canonical orientation as their pair key, whichever entity
//! triggered the update.

use crate::ids::{CanonicalPair, EntityId, Orientation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observer's belief about one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RumorEntry {
    pub observer: EntityId,
    pub pair: CanonicalPair,
    /// What the observer believes A thinks of B.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_a_to_b: Option<String>,
    /// What the observer believes B thinks of A.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_b_to_a: Option<String>,
    pub reason: String,
    pub updated_at: DateTime<Utc>,
}

impl RumorEntry {
    fn new(observer: EntityId, pair: CanonicalPair, at: DateTime<Utc>) -> Self {
        Self {
            observer,
            pair,
            content_a_to_b: None,
            content_b_to_a: None,
            reason: String::new(),
            updated_at: at,
        }
    }

    /// The believed role label `from` assigns to the other node.
    pub fn content_from(&self, from: &EntityId) -> Option<&str> {
        match self.pair.orientation_of(from)? {
            Orientation::Forward => self.content_a_to_b.as_deref(),
            Orientation::Reversed => self.content_b_to_a.as_deref(),
        }
    }
}

/// All rumors, for every observer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RumorStore {
    entries: Vec<RumorEntry>,
}

impl RumorStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an observer's belief about a pair.
    pub fn get(&self, observer: &EntityId, pair: &CanonicalPair) -> Option<&RumorEntry> {
        self.entries
            .iter()
            .find(|r| &r.observer == observer && &r.pair == pair)
    }

    /// All beliefs held by one observer.
    pub fn entries_of<'a>(
        &'a self,
        observer: &'a EntityId,
    ) -> impl Iterator<Item = &'a RumorEntry> {
        self.entries.iter().filter(move |r| &r.observer == observer)
    }

    /// Record what `observer` now believes `from` thinks of `to`.
    ///
    /// The direction not being updated keeps whatever was recorded before.
    pub fn record(
        &mut self,
        observer: &EntityId,
        from: &EntityId,
        to: &EntityId,
        view: Option<&str>,
        reason: &str,
        at: DateTime<Utc>,
    ) -> &RumorEntry {
        let (pair, orientation) = CanonicalPair::orient(from, to);
        let index = match self
            .entries
            .iter()
            .position(|r| &r.observer == observer && r.pair == pair)
        {
            Some(index) => index,
            None => {
                self.entries
                    .push(RumorEntry::new(observer.clone(), pair, at));
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[index];
        if let Some(view) = view {
            match orientation {
                Orientation::Forward => entry.content_a_to_b = Some(view.to_string()),
                Orientation::Reversed => entry.content_b_to_a = Some(view.to_string()),
            }
        }
        entry.reason = reason.to_string();
        entry.updated_at = at;
        entry
    }

    /// Get the total number of rumors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no rumors.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
