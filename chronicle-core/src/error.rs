//! Error types for the ledger and its persistence layer.

use crate::ids::EventId;
use thiserror::Error;

/// Failures of the underlying key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend failed on key '{key}': {reason}")]
    Backend { key: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Event not found: {0}")]
    NotFound(EventId),

    #[error("Event {0} has been compacted and can no longer be modified")]
    Compacted(EventId),

    #[error("Persistence failure: {0}")]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Check if this is a lookup miss rather than a storage failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound(_))
    }
}
