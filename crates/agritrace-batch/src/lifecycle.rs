//! # Batch Lifecycle
//!
//! Runtime-checked batch states and the persisted batch record.
//!
//! ## States
//!
//! - `ACTIVE` — accepting readings. At most one batch is ACTIVE at any
//!   instant, enforced by the engine's serialized transitions and checked
//!   again by the store.
//! - `FINALIZED` — terminal. Root and anchor reference are committed.
//! - `COMPLETED` — terminal. Closed without a commitment (superseded by a
//!   new batch before finalize).
//!
//! ## Allowed Transitions
//!
//! ```text
//! ACTIVE ──finalize()──▶ FINALIZED
//!    │
//!    └────complete()───▶ COMPLETED
//! ```
//!
//! The finalize write is atomic: root, anchor reference, end timestamp,
//! and status move together, and never move again.

use serde::{Deserialize, Serialize};

use agritrace_core::{BatchId, BatchMetadata, MerkleRoot, Timestamp};

use crate::anchor::AnchorRef;

/// Lifecycle status of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    /// Accepting readings.
    Active,
    /// Committed: root computed and anchored (terminal).
    Finalized,
    /// Closed without a commitment (terminal).
    Completed,
}

impl BatchStatus {
    /// Canonical state name (e.g., "ACTIVE").
    pub fn name(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Finalized => "FINALIZED",
            Self::Completed => "COMPLETED",
        }
    }

    /// Whether this state admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized | Self::Completed)
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The persisted record of one production batch.
///
/// `merkle_root` and `anchor_ref` are `None` until finalize and are written
/// exactly once, together. They are never mutated afterward — verification
/// depends on that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Unique batch identifier.
    pub id: BatchId,
    /// Descriptive metadata (crop, location).
    pub metadata: BatchMetadata,
    /// Current lifecycle status.
    pub status: BatchStatus,
    /// When the batch was opened (UTC).
    pub started_at: Timestamp,
    /// When the batch was closed, if it has been.
    pub ended_at: Option<Timestamp>,
    /// The committed root, once finalized.
    pub merkle_root: Option<MerkleRoot>,
    /// The anchor confirmation reference, once finalized.
    pub anchor_ref: Option<AnchorRef>,
}

impl Batch {
    /// Open a new ACTIVE batch.
    pub fn open(metadata: BatchMetadata) -> Self {
        Self {
            id: BatchId::new(),
            metadata,
            status: BatchStatus::Active,
            started_at: Timestamp::now(),
            ended_at: None,
            merkle_root: None,
            anchor_ref: None,
        }
    }

    /// Whether this batch is still accepting readings.
    pub fn is_active(&self) -> bool {
        self.status == BatchStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_batch_is_active_and_uncommitted() {
        let b = Batch::open(BatchMetadata::default());
        assert!(b.is_active());
        assert!(b.ended_at.is_none());
        assert!(b.merkle_root.is_none());
        assert!(b.anchor_ref.is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!BatchStatus::Active.is_terminal());
        assert!(BatchStatus::Finalized.is_terminal());
        assert!(BatchStatus::Completed.is_terminal());
    }

    #[test]
    fn test_status_serde_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&BatchStatus::Finalized).unwrap(),
            "\"FINALIZED\""
        );
        let parsed: BatchStatus = serde_json::from_str("\"ACTIVE\"").unwrap();
        assert_eq!(parsed, BatchStatus::Active);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(BatchStatus::Completed.to_string(), "COMPLETED");
    }
}
