//! # Batch Error Taxonomy
//!
//! Structured errors for the batch lifecycle, coordinator, and verifier.
//! Precondition violations (`NoActiveBatch`, `NotActive`, `NotFound`,
//! `NotFinalized`, `ActiveBatchOpen`, `EmptyBatch`) never mutate state.
//! `StaleBuffer` is retryable — the buffer has already been re-scoped when
//! it surfaces. Anchor failures leave the batch ACTIVE so finalize can be
//! re-attempted with the same (possibly larger) reading set.

use thiserror::Error;

use agritrace_core::{BatchId, EncodingError};
use agritrace_merkle::MerkleError;

use crate::anchor::AnchorError;
use crate::lifecycle::BatchStatus;

/// Errors raised by the batch state machine, coordinator, and verifier.
#[derive(Error, Debug)]
pub enum BatchError {
    /// A reading arrived but no batch has been created (or the last one
    /// was closed).
    #[error("no active batch — create a batch before submitting readings")]
    NoActiveBatch,

    /// The named batch exists but is not ACTIVE.
    #[error("batch {id} is {status}, not ACTIVE")]
    NotActive {
        /// The batch the caller named.
        id: BatchId,
        /// Its actual status.
        status: BatchStatus,
    },

    /// No batch with this id exists.
    #[error("batch {0} not found")]
    NotFound(BatchId),

    /// Creation was rejected because a batch is still ACTIVE and the
    /// configured policy requires it to be closed first.
    #[error("batch {0} is still ACTIVE — finalize or complete it before creating a new one")]
    ActiveBatchOpen(BatchId),

    /// The accumulation buffer was scoped to a batch that is no longer the
    /// active one. The buffer has been reset; the caller may retry.
    #[error("stale buffer: scoped to {buffered} but {active} is active (buffer reset, retry)")]
    StaleBuffer {
        /// The batch the buffer was scoped to.
        buffered: BatchId,
        /// The currently active batch.
        active: BatchId,
    },

    /// Finalize was attempted on a batch with zero persisted readings.
    #[error("batch {0} has no readings — nothing to commit")]
    EmptyBatch(BatchId),

    /// A finalize for this batch is in flight. The batch's reading set is
    /// frozen until the attempt settles: no second finalize, no new
    /// readings, no batch creation over it.
    #[error("finalize in progress for batch {0} — the batch is frozen until it settles")]
    FinalizeInProgress(BatchId),

    /// Verification was requested for a batch that has no anchored root.
    #[error("batch {id} is {status} with no committed root — nothing to verify against")]
    NotFinalized {
        /// The batch the caller named.
        id: BatchId,
        /// Its actual status.
        status: BatchStatus,
    },

    /// A stored record violated an invariant the store is supposed to hold
    /// (e.g., two ACTIVE batches). Indicates a bug, not a caller error.
    #[error("store integrity violation: {0}")]
    Integrity(String),

    /// A reading could not be canonically serialized or a digest could not
    /// be decoded.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Root construction failed.
    #[error(transparent)]
    Merkle(#[from] MerkleError),

    /// The anchor service rejected or failed the submission.
    #[error(transparent)]
    Anchor(#[from] AnchorError),
}
