//! Snapshot persistence for the in-memory ledger.
//!
//! A snapshot holds everything an in-memory ledger needs to resume: the raw
//! store (events and rumors under their keys), the objective graph and the
//! character directory.

use crate::config::LedgerConfig;
use crate::directory::MemoryDirectory;
use crate::error::LedgerError;
use crate::graph::MemoryGraph;
use crate::ids::EntityId;
use crate::ledger::EventLedger;
use crate::store::MemoryStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Current snapshot file version.
const SNAPSHOT_VERSION: u32 = 1;

/// A saved ledger with all state needed to resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedChronicle {
    /// Snapshot format version for compatibility checking.
    pub version: u32,

    /// When the snapshot was taken.
    pub saved_at: DateTime<Utc>,

    /// Raw key-value contents: the event and rumor collections.
    pub store: MemoryStore,

    /// Objective relationship edges and nodes.
    pub graph: MemoryGraph,

    /// Characters and their current status.
    pub characters: MemoryDirectory,

    /// Summary readable without loading the full state.
    pub metadata: SnapshotMetadata,
}

/// Metadata about a snapshot file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Self-identity the ledger was running with.
    pub self_id: EntityId,

    /// Number of events, stubs included.
    pub event_count: usize,

    /// Number of compacted stubs.
    pub compressed_count: usize,

    /// Number of rumor entries across all observers.
    pub rumor_count: usize,

    /// Number of objective edges.
    pub edge_count: usize,

    /// When the snapshot was taken (duplicated for peek access).
    pub saved_at: DateTime<Utc>,
}

impl SavedChronicle {
    /// Capture the current state of an in-memory ledger.
    pub fn capture(ledger: &EventLedger) -> Result<Self, PersistError> {
        let events = ledger.get_all_events()?;
        let rumors = ledger.rumors()?;
        let saved_at = Utc::now();

        let metadata = SnapshotMetadata {
            self_id: ledger.self_id().clone(),
            event_count: events.len(),
            compressed_count: events.values().filter(|e| e.compressed).count(),
            rumor_count: rumors.len(),
            edge_count: ledger.graph().edge_count(),
            saved_at,
        };

        Ok(Self {
            version: SNAPSHOT_VERSION,
            saved_at,
            store: ledger.store().clone(),
            graph: ledger.graph().clone(),
            characters: ledger.directory().clone(),
            metadata,
        })
    }

    /// Rebuild a ledger from this snapshot.
    ///
    /// `config` should name the same store keys the snapshot was taken with,
    /// otherwise the events are present in the store but not visible.
    pub fn into_ledger(self, config: LedgerConfig) -> EventLedger {
        if self.metadata.self_id != config.self_id {
            tracing::warn!(
                saved = %self.metadata.self_id,
                configured = %config.self_id,
                "snapshot was taken with a different self identity"
            );
        }
        EventLedger::new(self.store, self.graph, self.characters, config)
    }

    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Load from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path).await?;
        let saved: Self = serde_json::from_str(&content)?;

        if saved.version != SNAPSHOT_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SNAPSHOT_VERSION,
                found: saved.version,
            });
        }

        Ok(saved)
    }

    /// Read a snapshot's metadata without loading the full state.
    pub async fn peek_metadata(path: impl AsRef<Path>) -> Result<SnapshotMetadata, PersistError> {
        let content = fs::read_to_string(path).await?;

        #[derive(Deserialize)]
        struct Partial {
            version: u32,
            metadata: SnapshotMetadata,
        }

        let partial: Partial = serde_json::from_str(&content)?;

        if partial.version != SNAPSHOT_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SNAPSHOT_VERSION,
                found: partial.version,
            });
        }

        Ok(partial.metadata)
    }
}
