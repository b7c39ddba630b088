//! # Ledger Repository Contract
//!
//! The persistent readings/batches store, reduced to the narrow contract
//! the engine needs. Production deployments put a relational database
//! behind this trait; [`MemoryStore`] is the in-process implementation
//! used by tests and embedders.
//!
//! ## Contract Invariants
//!
//! - At most one batch is ACTIVE at any instant.
//! - `list_readings` returns the batch's readings in ascending
//!   `(recorded_at, sequence)` order — the exact sequence roots are
//!   computed over.
//! - `finalize_batch` writes root, anchor reference, end timestamp, and
//!   FINALIZED status in one atomic update, and only from ACTIVE.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::Mutex;

use agritrace_core::{BatchId, BatchMetadata, MerkleRoot, Reading, ReadingId, Timestamp};

use crate::anchor::AnchorRef;
use crate::error::BatchError;
use crate::lifecycle::{Batch, BatchStatus};

/// Narrow persistence contract for batches and their readings.
pub trait BatchStore: Send + Sync {
    /// Create a new ACTIVE batch.
    ///
    /// Fails with `Integrity` if another batch is still ACTIVE — callers
    /// must close it first.
    fn create_batch(
        &self,
        metadata: BatchMetadata,
    ) -> impl std::future::Future<Output = Result<Batch, BatchError>> + Send;

    /// Fetch a batch by id.
    fn get_batch(
        &self,
        id: &BatchId,
    ) -> impl std::future::Future<Output = Result<Option<Batch>, BatchError>> + Send;

    /// The currently ACTIVE batch, if any.
    fn active_batch(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<Batch>, BatchError>> + Send;

    /// All batches, newest first.
    fn list_batches(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Batch>, BatchError>> + Send;

    /// Persist one reading under an ACTIVE batch, assigning its sequence
    /// number.
    fn insert_reading(
        &self,
        batch_id: &BatchId,
        payload: Value,
        recorded_at: Timestamp,
    ) -> impl std::future::Future<Output = Result<Reading, BatchError>> + Send;

    /// The batch's full reading sequence, ascending by
    /// `(recorded_at, sequence)`.
    fn list_readings(
        &self,
        batch_id: &BatchId,
    ) -> impl std::future::Future<Output = Result<Vec<Reading>, BatchError>> + Send;

    /// Close an ACTIVE batch without a commitment (ACTIVE → COMPLETED).
    fn complete_batch(
        &self,
        batch_id: &BatchId,
    ) -> impl std::future::Future<Output = Result<(), BatchError>> + Send;

    /// Commit an ACTIVE batch (ACTIVE → FINALIZED): root, anchor
    /// reference, end timestamp, and status in one atomic write.
    fn finalize_batch(
        &self,
        batch_id: &BatchId,
        root: MerkleRoot,
        anchor_ref: AnchorRef,
        ended_at: Timestamp,
    ) -> impl std::future::Future<Output = Result<(), BatchError>> + Send;
}

#[derive(Debug, Default)]
struct StoreInner {
    batches: HashMap<BatchId, Batch>,
    /// Creation order, for newest-first listing.
    order: Vec<BatchId>,
    readings: HashMap<BatchId, Vec<Reading>>,
}

/// In-process store backed by a single mutex.
///
/// One lock guards all tables, which makes every operation — in particular
/// the finalize write — trivially atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite one persisted reading's payload in place.
    ///
    /// This deliberately bypasses every integrity guard — it exists so
    /// tests can simulate post-hoc tampering with historical data and
    /// assert that verification catches it.
    pub async fn tamper_reading(
        &self,
        batch_id: &BatchId,
        index: usize,
        payload: Value,
    ) -> Result<(), BatchError> {
        let mut inner = self.inner.lock().await;
        let readings = inner
            .readings
            .get_mut(batch_id)
            .ok_or(BatchError::NotFound(*batch_id))?;
        let reading = readings
            .get_mut(index)
            .ok_or_else(|| BatchError::Integrity(format!("no reading at index {index}")))?;
        reading.payload = payload;
        Ok(())
    }
}

impl BatchStore for MemoryStore {
    async fn create_batch(&self, metadata: BatchMetadata) -> Result<Batch, BatchError> {
        let mut inner = self.inner.lock().await;
        if let Some(active) = inner.batches.values().find(|b| b.is_active()) {
            return Err(BatchError::Integrity(format!(
                "batch {} is still ACTIVE",
                active.id
            )));
        }
        let batch = Batch::open(metadata);
        inner.order.push(batch.id);
        inner.batches.insert(batch.id, batch.clone());
        inner.readings.insert(batch.id, Vec::new());
        Ok(batch)
    }

    async fn get_batch(&self, id: &BatchId) -> Result<Option<Batch>, BatchError> {
        let inner = self.inner.lock().await;
        Ok(inner.batches.get(id).cloned())
    }

    async fn active_batch(&self) -> Result<Option<Batch>, BatchError> {
        let inner = self.inner.lock().await;
        let mut active = inner.batches.values().filter(|b| b.is_active());
        let first = active.next().cloned();
        if active.next().is_some() {
            return Err(BatchError::Integrity(
                "more than one ACTIVE batch in store".to_string(),
            ));
        }
        Ok(first)
    }

    async fn list_batches(&self) -> Result<Vec<Batch>, BatchError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.batches.get(id).cloned())
            .collect())
    }

    async fn insert_reading(
        &self,
        batch_id: &BatchId,
        payload: Value,
        recorded_at: Timestamp,
    ) -> Result<Reading, BatchError> {
        let mut inner = self.inner.lock().await;
        let batch = inner
            .batches
            .get(batch_id)
            .ok_or(BatchError::NotFound(*batch_id))?;
        if !batch.is_active() {
            return Err(BatchError::NotActive {
                id: *batch_id,
                status: batch.status,
            });
        }
        let sequence = inner.readings.get(batch_id).map_or(0, |r| r.len()) as u64;
        let reading = Reading::new(ReadingId::new(), *batch_id, recorded_at, sequence, payload)?;
        inner
            .readings
            .entry(*batch_id)
            .or_default()
            .push(reading.clone());
        Ok(reading)
    }

    async fn list_readings(&self, batch_id: &BatchId) -> Result<Vec<Reading>, BatchError> {
        let inner = self.inner.lock().await;
        let mut readings = inner
            .readings
            .get(batch_id)
            .ok_or(BatchError::NotFound(*batch_id))?
            .clone();
        readings.sort_by_key(|r| (r.recorded_at, r.sequence));
        Ok(readings)
    }

    async fn complete_batch(&self, batch_id: &BatchId) -> Result<(), BatchError> {
        let mut inner = self.inner.lock().await;
        let batch = inner
            .batches
            .get_mut(batch_id)
            .ok_or(BatchError::NotFound(*batch_id))?;
        if !batch.is_active() {
            return Err(BatchError::NotActive {
                id: *batch_id,
                status: batch.status,
            });
        }
        batch.status = BatchStatus::Completed;
        batch.ended_at = Some(Timestamp::now());
        Ok(())
    }

    async fn finalize_batch(
        &self,
        batch_id: &BatchId,
        root: MerkleRoot,
        anchor_ref: AnchorRef,
        ended_at: Timestamp,
    ) -> Result<(), BatchError> {
        let mut inner = self.inner.lock().await;
        let batch = inner
            .batches
            .get_mut(batch_id)
            .ok_or(BatchError::NotFound(*batch_id))?;
        if !batch.is_active() {
            return Err(BatchError::NotActive {
                id: *batch_id,
                status: batch.status,
            });
        }
        batch.status = BatchStatus::Finalized;
        batch.merkle_root = Some(root);
        batch.anchor_ref = Some(anchor_ref);
        batch.ended_at = Some(ended_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(n: u32) -> Value {
        serde_json::json!({"temperature": n, "humidity": 70})
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let store = MemoryStore::new();
        let batch = store
            .create_batch(BatchMetadata::new("Wheat", "North Field"))
            .await
            .unwrap();
        let fetched = store.get_batch(&batch.id).await.unwrap().unwrap();
        assert_eq!(fetched, batch);
        assert_eq!(
            store.active_batch().await.unwrap().unwrap().id,
            batch.id
        );
    }

    #[tokio::test]
    async fn test_second_active_rejected() {
        let store = MemoryStore::new();
        store.create_batch(BatchMetadata::default()).await.unwrap();
        let err = store.create_batch(BatchMetadata::default()).await;
        assert!(matches!(err, Err(BatchError::Integrity(_))));
    }

    #[tokio::test]
    async fn test_sequences_ascend() {
        let store = MemoryStore::new();
        let batch = store.create_batch(BatchMetadata::default()).await.unwrap();
        let ts = Timestamp::parse("2026-03-01T08:00:00Z").unwrap();
        for i in 0..3 {
            let r = store.insert_reading(&batch.id, payload(i), ts).await.unwrap();
            assert_eq!(r.sequence, u64::from(i));
        }
        let readings = store.list_readings(&batch.id).await.unwrap();
        assert_eq!(readings.len(), 3);
        // Same recorded_at second — sequence keeps insertion order.
        assert!(readings.windows(2).all(|w| w[0].sequence < w[1].sequence));
    }

    #[tokio::test]
    async fn test_insert_into_closed_batch_rejected() {
        let store = MemoryStore::new();
        let batch = store.create_batch(BatchMetadata::default()).await.unwrap();
        store.complete_batch(&batch.id).await.unwrap();
        let err = store
            .insert_reading(&batch.id, payload(1), Timestamp::now())
            .await;
        assert!(matches!(err, Err(BatchError::NotActive { .. })));
    }

    #[tokio::test]
    async fn test_finalize_atomic_fields() {
        let store = MemoryStore::new();
        let batch = store.create_batch(BatchMetadata::default()).await.unwrap();
        let root = MerkleRoot::from_bytes([7u8; 32]);
        let ended = Timestamp::now();
        store
            .finalize_batch(&batch.id, root, AnchorRef("tx:abc".into()), ended)
            .await
            .unwrap();
        let b = store.get_batch(&batch.id).await.unwrap().unwrap();
        assert_eq!(b.status, BatchStatus::Finalized);
        assert_eq!(b.merkle_root, Some(root));
        assert_eq!(b.anchor_ref, Some(AnchorRef("tx:abc".into())));
        assert_eq!(b.ended_at, Some(ended));
    }

    #[tokio::test]
    async fn test_finalize_twice_rejected() {
        let store = MemoryStore::new();
        let batch = store.create_batch(BatchMetadata::default()).await.unwrap();
        let root = MerkleRoot::from_bytes([7u8; 32]);
        store
            .finalize_batch(&batch.id, root, AnchorRef("tx:1".into()), Timestamp::now())
            .await
            .unwrap();
        let err = store
            .finalize_batch(&batch.id, root, AnchorRef("tx:2".into()), Timestamp::now())
            .await;
        assert!(matches!(err, Err(BatchError::NotActive { .. })));
    }

    #[tokio::test]
    async fn test_list_batches_newest_first() {
        let store = MemoryStore::new();
        let b1 = store.create_batch(BatchMetadata::default()).await.unwrap();
        store.complete_batch(&b1.id).await.unwrap();
        let b2 = store.create_batch(BatchMetadata::default()).await.unwrap();
        let all = store.list_batches().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, b2.id);
        assert_eq!(all[1].id, b1.id);
    }

    #[tokio::test]
    async fn test_unknown_batch_errors() {
        let store = MemoryStore::new();
        let ghost = BatchId::new();
        assert!(store.get_batch(&ghost).await.unwrap().is_none());
        assert!(matches!(
            store.list_readings(&ghost).await,
            Err(BatchError::NotFound(_))
        ));
        assert!(matches!(
            store.complete_batch(&ghost).await,
            Err(BatchError::NotFound(_))
        ));
    }
}
