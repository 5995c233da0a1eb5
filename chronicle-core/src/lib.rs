//! Shared event ledger for simulated social worlds.
//!
//! This crate provides:
//! - An append-mostly ledger of interactions between characters and the user
//! - An objective relationship graph written only by direct participants
//! - Per-observer rumors for changes reported by bystanders
//! - Retention compaction and prompt-ready context digests
//! - Snapshot persistence
//!
//! # Quick Start
//!
//! ```ignore
//! use chronicle_core::{EventDraft, EventLedger, LedgerConfig, RelationshipChange};
//!
//! let mut ledger = EventLedger::in_memory(LedgerConfig::new());
//!
//! ledger.create_event(
//!     EventDraft::new("Alice overheard Bob and Carol arguing")
//!         .with_participants(["bob", "carol"])
//!         .with_change(RelationshipChange::new("bob", "carol").with_view("rivals"))
//!         .with_originator("alice"),
//! )?;
//!
//! // Alice now believes Bob and Carol are rivals; the objective graph is untouched.
//! let alices_world = ledger.subjective_graph(&"alice".into())?;
//! let digest = ledger.query()?.build_event_context(&"alice".into());
//! ```

pub mod compact;
pub mod config;
pub mod directory;
pub mod error;
pub mod event;
pub mod graph;
pub mod ids;
pub mod ingest;
pub mod ledger;
pub mod persist;
pub mod processor;
pub mod query;
pub mod rumor;
pub mod shared;
pub mod store;
pub mod testing;

// Primary public API
pub use compact::CompactionReport;
pub use config::{LedgerConfig, RetentionPolicy};
pub use directory::{Character, CharacterDirectory, CharacterPatch, MemoryDirectory};
pub use error::{LedgerError, StoreError};
pub use event::{
    Event, EventDraft, EventMetadata, EventPatch, EventType, RelationshipChange, ScheduleInfo,
    StatusSnapshot,
};
pub use graph::{GraphData, MemoryGraph, Node, RelationshipEdge, RelationshipGraph};
pub use ids::{CanonicalPair, EntityId, EventId};
pub use ingest::normalize_ai_action;
pub use ledger::{EventLedger, EventMap};
pub use persist::{PersistError, SavedChronicle, SnapshotMetadata};
pub use processor::{ChangeProcessor, ProcessOutcome};
pub use query::{EventFilter, QueryService};
pub use rumor::{RumorEntry, RumorStore};
pub use shared::SharedLedger;
pub use store::{KeyValueStore, MemoryStore};
