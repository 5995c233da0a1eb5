//! Routing of an event's declared effects.
//!
//! A relationship change reaches the objective graph only when the event's
//! originator, or the self-identity, is one of the change's two endpoints.
//! Any other author is a bystander: the change becomes that author's rumor
//! about the pair and the objective edge is left alone. No change is ever
//! written to both stores.
//!
//! Malformed input never raises here. A tuple missing an endpoint is
//! skipped and the rest of the event is still processed.

use crate::directory::{CharacterDirectory, CharacterPatch};
use crate::error::StoreError;
use crate::event::Event;
use crate::graph::{ChangeLogEntry, RelationshipEdge, RelationshipGraph};
use crate::ids::{CanonicalPair, EntityId};
use crate::rumor::RumorStore;

/// What processing one event did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Objective edges saved.
    pub edges_written: usize,
    /// Rumor entries created or updated.
    pub rumors_written: usize,
    /// Tuples ignored as malformed or unattributable.
    pub skipped: usize,
}

/// Applies relationship changes and status snapshots.
#[derive(Debug, Clone)]
pub struct ChangeProcessor {
    self_id: EntityId,
}

impl ChangeProcessor {
    /// Create a processor for a given self-identity.
    pub fn new(self_id: EntityId) -> Self {
        Self { self_id }
    }

    /// Whether a change between `from` and `to` may touch the objective edge.
    pub fn is_direct_participant(
        &self,
        originator: Option<&EntityId>,
        from: &EntityId,
        to: &EntityId,
    ) -> bool {
        from == &self.self_id
            || to == &self.self_id
            || originator.is_some_and(|o| o == from || o == to)
    }

    /// Route every relationship change on `event` to the graph or the rumor store.
    pub fn process_relationship_changes<G>(
        &self,
        event: &Event,
        graph: &mut G,
        rumors: &mut RumorStore,
    ) -> Result<ProcessOutcome, StoreError>
    where
        G: RelationshipGraph + ?Sized,
    {
        let originator = event.originator();
        let mut outcome = ProcessOutcome::default();

        for change in &event.relationship_changes {
            let Some((from, to)) = change.endpoints() else {
                tracing::warn!(event = %event.id, "skipping relationship change without both endpoints");
                outcome.skipped += 1;
                continue;
            };
            if from == to {
                tracing::warn!(event = %event.id, entity = %from, "skipping self-directed relationship change");
                outcome.skipped += 1;
                continue;
            }

            if self.is_direct_participant(originator, from, to) {
                let (pair, orientation) = CanonicalPair::orient(from, to);
                let mut edge = graph
                    .get_relationship(from, to)
                    .unwrap_or_else(|| RelationshipEdge::established_by(pair, &event.id));

                if let Some(view) = &change.view_change {
                    edge.set_view(orientation, view.clone());
                }
                if let Some(delta) = change.attitude_change {
                    edge.push_change(ChangeLogEntry {
                        timestamp: event.timestamp,
                        event_id: event.id.clone(),
                        change: delta,
                        reason: event.summary.clone(),
                    });
                }
                edge.visible_to.extend([from, to]);

                graph.save_relationship(edge)?;
                outcome.edges_written += 1;
                tracing::debug!(event = %event.id, %from, %to, "applied objective relationship change");
            } else {
                let Some(observer) = originator else {
                    tracing::warn!(
                        event = %event.id, %from, %to,
                        "skipping bystander change with no originator to hold the rumor"
                    );
                    outcome.skipped += 1;
                    continue;
                };
                rumors.record(
                    observer,
                    from,
                    to,
                    change.view_change.as_deref(),
                    &event.summary,
                    event.timestamp,
                );
                outcome.rumors_written += 1;
                tracing::debug!(event = %event.id, %observer, %from, %to, "recorded rumor");
            }
        }

        Ok(outcome)
    }

    /// Overlay each snapshot onto the entity's current status.
    ///
    /// The self-identity and entities unknown to the directory are skipped.
    /// Returns the number of characters updated.
    pub fn process_status_snapshots<D>(
        &self,
        event: &Event,
        directory: &mut D,
    ) -> Result<usize, StoreError>
    where
        D: CharacterDirectory + ?Sized,
    {
        let mut updated = 0;
        for (id, snapshot) in &event.status_snapshots {
            if id == &self.self_id || snapshot.is_empty() {
                continue;
            }
            let Some(character) = directory.get_character(id) else {
                tracing::debug!(event = %event.id, entity = %id, "status snapshot for unknown character");
                continue;
            };
            let mut status = character.status;
            status.overlay(snapshot);
            directory.update_character(
                id,
                CharacterPatch {
                    status: Some(status),
                    ..CharacterPatch::default()
                },
            )?;
            updated += 1;
        }
        Ok(updated)
    }
}
