//! # Commitment Verification
//!
//! Re-derives a finalized batch's root from the stored readings and
//! compares it against the committed root, byte for byte. A mismatch
//! means at least one reading (or the stored order) changed after the
//! commitment was made.
//!
//! ## Integrity Invariant
//!
//! The verdict is computed purely from store contents: the same
//! canonicalization, the same leaf hash, the same tree construction as
//! finalize. Verification itself never mutates anything, so it can be
//! re-run at any time and, against an untampered store, always returns
//! the same answer.
//!
//! Roots are compared as decoded bytes, so hex casing differences in
//! serialized form can never cause a false mismatch.

use serde::{Deserialize, Serialize};

use agritrace_core::{BatchId, MerkleRoot};
use agritrace_merkle::{merkle_root, reading_digest};

use crate::anchor::AnchorRef;
use crate::error::BatchError;
use crate::store::BatchStore;

/// Outcome of re-deriving a finalized batch's commitment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// The batch that was checked.
    pub batch_id: BatchId,
    /// Whether the recomputed root matches the committed one.
    pub verified: bool,
    /// The root committed at finalize time.
    pub stored_root: MerkleRoot,
    /// The root re-derived from the stored readings just now.
    pub recomputed_root: MerkleRoot,
    /// The anchor confirmation the committed root was recorded under.
    pub anchor_ref: AnchorRef,
    /// How many readings the recomputation covered.
    pub reading_count: usize,
}

/// Re-derive `batch_id`'s root from the store and compare it to the
/// committed root.
///
/// Fails with [`BatchError::NotFound`] for an unknown batch and
/// [`BatchError::NotFinalized`] for a batch without a committed root
/// (ACTIVE or COMPLETED). A mismatch is NOT an error: the report comes
/// back with `verified == false` so the caller can inspect both roots.
pub async fn verify_batch<S: BatchStore>(
    store: &S,
    batch_id: &BatchId,
) -> Result<VerificationReport, BatchError> {
    let batch = store
        .get_batch(batch_id)
        .await?
        .ok_or(BatchError::NotFound(*batch_id))?;

    let (stored_root, anchor_ref) = match (batch.merkle_root, batch.anchor_ref) {
        (Some(root), Some(anchor_ref)) => (root, anchor_ref),
        _ => {
            return Err(BatchError::NotFinalized {
                id: *batch_id,
                status: batch.status,
            })
        }
    };

    let readings = store.list_readings(batch_id).await?;
    if readings.is_empty() {
        // A committed root always covers at least one reading.
        return Err(BatchError::Integrity(format!(
            "finalized batch {batch_id} has a committed root but no stored readings"
        )));
    }

    let leaves = readings
        .iter()
        .map(reading_digest)
        .collect::<Result<Vec<_>, _>>()?;
    let recomputed_root = merkle_root(&leaves)?;

    let verified = recomputed_root == stored_root;
    if verified {
        tracing::info!(batch = %batch_id, root = %stored_root, "verification passed");
    } else {
        tracing::warn!(
            batch = %batch_id,
            stored = %stored_root,
            recomputed = %recomputed_root,
            "verification FAILED — stored readings no longer match the committed root"
        );
    }

    Ok(VerificationReport {
        batch_id: *batch_id,
        verified,
        stored_root,
        recomputed_root,
        anchor_ref,
        reading_count: readings.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::BatchStatus;
    use crate::store::MemoryStore;
    use agritrace_core::{BatchMetadata, Timestamp};

    fn payload(n: u32) -> serde_json::Value {
        serde_json::json!({"temperature": n, "humidity": 70, "soilMoisture": 41})
    }

    async fn finalized_store(readings: u32) -> (MemoryStore, BatchId) {
        let store = MemoryStore::new();
        let batch = store.create_batch(BatchMetadata::default()).await.unwrap();
        for i in 0..readings {
            store
                .insert_reading(&batch.id, payload(i), Timestamp::now())
                .await
                .unwrap();
        }
        let stored = store.list_readings(&batch.id).await.unwrap();
        let leaves: Vec<_> = stored
            .iter()
            .map(|r| reading_digest(r).unwrap())
            .collect();
        let root = merkle_root(&leaves).unwrap();
        store
            .finalize_batch(&batch.id, root, AnchorRef("tx:test".into()), Timestamp::now())
            .await
            .unwrap();
        (store, batch.id)
    }

    #[tokio::test]
    async fn test_untampered_batch_verifies() {
        let (store, id) = finalized_store(5).await;
        let report = verify_batch(&store, &id).await.unwrap();
        assert!(report.verified);
        assert_eq!(report.stored_root, report.recomputed_root);
        assert_eq!(report.reading_count, 5);
        assert_eq!(report.anchor_ref.as_str(), "tx:test");
    }

    #[tokio::test]
    async fn test_verification_is_repeatable() {
        let (store, id) = finalized_store(3).await;
        let first = verify_batch(&store, &id).await.unwrap();
        let second = verify_batch(&store, &id).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_tampered_reading_fails_verification() {
        let (store, id) = finalized_store(5).await;
        store.tamper_reading(&id, 2, payload(999)).await.unwrap();
        let report = verify_batch(&store, &id).await.unwrap();
        assert!(!report.verified);
        assert_ne!(report.stored_root, report.recomputed_root);
    }

    #[tokio::test]
    async fn test_single_reading_batch_verifies() {
        let (store, id) = finalized_store(1).await;
        let report = verify_batch(&store, &id).await.unwrap();
        assert!(report.verified);
        assert_eq!(report.reading_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_batch() {
        let store = MemoryStore::new();
        let err = verify_batch(&store, &BatchId::new()).await;
        assert!(matches!(err, Err(BatchError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_active_batch_not_verifiable() {
        let store = MemoryStore::new();
        let batch = store.create_batch(BatchMetadata::default()).await.unwrap();
        let err = verify_batch(&store, &batch.id).await;
        assert!(matches!(
            err,
            Err(BatchError::NotFinalized {
                status: BatchStatus::Active,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_completed_batch_not_verifiable() {
        let store = MemoryStore::new();
        let batch = store.create_batch(BatchMetadata::default()).await.unwrap();
        store.complete_batch(&batch.id).await.unwrap();
        let err = verify_batch(&store, &batch.id).await;
        assert!(matches!(
            err,
            Err(BatchError::NotFinalized {
                status: BatchStatus::Completed,
                ..
            })
        ));
    }
}
