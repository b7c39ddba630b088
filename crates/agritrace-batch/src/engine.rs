//! # Batch Engine — State Machine and Commitment Coordinator
//!
//! Owns the single shared mutable resource of the system: the "current
//! active batch" pointer and its accumulation buffer. Every `create`,
//! `accept_reading`, and finalize *decision* serializes on one mutex, so
//! at most one transition executes at a time regardless of how many
//! devices report concurrently.
//!
//! The anchor submission itself is slow (seconds) and is awaited OUTSIDE
//! the critical section. An in-flight marker guarantees a batch can never
//! have two concurrent finalize attempts: the decision and the buffer
//! reset are serialized, the network wait is not. While the marker is set,
//! `accept_reading` and `create_batch` are rejected too — the committed
//! root must cover the persisted reading sequence exactly as it stood at
//! the finalize decision, so the batch is frozen until the attempt
//! settles.
//!
//! ## Buffer Discipline
//!
//! The buffer is a trigger hint, nothing more. It decides WHEN an
//! automatic finalize fires; it never decides WHAT gets committed. The
//! authoritative finalize path always re-reads the full persisted reading
//! sequence from the store, so a buffer that desynchronized across a
//! process restart can delay a commit but can never corrupt one.
//!
//! ## Failure Discipline
//!
//! Nothing is written before the anchor confirmation arrives. If anchoring
//! fails — transient retries exhausted or a permanent rejection — the
//! batch remains ACTIVE and finalize can be re-attempted over the same,
//! possibly larger, reading set.

use std::time::Duration;

use tokio::sync::Mutex;

use agritrace_core::{BatchId, BatchMetadata, MerkleRoot, Reading, ReadingId, Timestamp};
use agritrace_merkle::{merkle_root, reading_digest};

use crate::anchor::{AnchorClient, AnchorError, AnchorRef};
use crate::error::BatchError;
use crate::lifecycle::{Batch, BatchStatus};
use crate::store::BatchStore;

/// What to do when `create_batch` finds a batch still ACTIVE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatePolicy {
    /// Close the previous batch as COMPLETED (no commitment) and proceed.
    CompletePrevious,
    /// Reject creation until the operator finalizes or completes the
    /// previous batch explicitly.
    RequireClosed,
}

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Buffered readings that trigger an automatic finalize.
    pub auto_finalize_threshold: usize,
    /// Behavior when creating a batch while one is ACTIVE.
    pub create_policy: CreatePolicy,
    /// Total anchor attempts per finalize (1 = no retries).
    pub anchor_attempts: u32,
    /// Pause between anchor retries.
    pub anchor_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_finalize_threshold: 5,
            create_policy: CreatePolicy::CompletePrevious,
            anchor_attempts: 3,
            anchor_backoff: Duration::from_millis(500),
        }
    }
}

/// Mutable engine state guarded by the transition mutex.
#[derive(Debug, Default)]
struct EngineState {
    /// The current active batch pointer.
    active: Option<BatchId>,
    /// Which batch the buffer is scoped to.
    buffer_batch: Option<BatchId>,
    /// Readings accumulated since the buffer was last reset.
    buffer: Vec<ReadingId>,
    /// Batch with a finalize currently in flight, if any.
    finalizing: Option<BatchId>,
}

/// Result of a successful finalize.
#[derive(Debug, Clone)]
pub struct FinalizeOutcome {
    /// The batch that was committed.
    pub batch_id: BatchId,
    /// The committed root.
    pub root: MerkleRoot,
    /// The anchor confirmation reference.
    pub anchor_ref: AnchorRef,
    /// How many readings the root covers.
    pub reading_count: usize,
}

/// What happened to the buffer after a reading was accepted.
///
/// The reading itself is durably persisted in every variant — an
/// auto-finalize failure does not un-accept the reading that triggered it.
#[derive(Debug)]
pub enum AcceptOutcome {
    /// Below threshold; the reading was buffered.
    Buffered {
        /// Buffered readings after this one.
        buffered: usize,
    },
    /// The threshold fired and the batch committed.
    AutoFinalized(FinalizeOutcome),
    /// The threshold fired but the commit failed; the batch stays ACTIVE
    /// for a manual retry.
    AutoFinalizeFailed {
        /// Why the automatic commit failed.
        error: BatchError,
    },
}

/// One row of the finalized-batch listing.
#[derive(Debug, Clone)]
pub struct FinalizedBatch {
    /// The batch id.
    pub batch_id: BatchId,
    /// The committed root.
    pub root: MerkleRoot,
    /// The anchor confirmation reference.
    pub anchor_ref: AnchorRef,
}

/// The batch commitment engine.
///
/// Generic over its two external collaborators: the persistent store and
/// the anchor client.
#[derive(Debug)]
pub struct BatchEngine<S, A> {
    store: S,
    anchor: A,
    config: EngineConfig,
    state: Mutex<EngineState>,
}

impl<S: BatchStore, A: AnchorClient> BatchEngine<S, A> {
    /// Build an engine with default configuration.
    pub fn new(store: S, anchor: A) -> Self {
        Self::with_config(store, anchor, EngineConfig::default())
    }

    /// Build an engine with explicit configuration.
    pub fn with_config(store: S, anchor: A, config: EngineConfig) -> Self {
        Self {
            store,
            anchor,
            config,
            state: Mutex::new(EngineState::default()),
        }
    }

    /// Access the underlying store (read paths, verification).
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Open a new ACTIVE batch.
    ///
    /// If a batch is still ACTIVE the configured [`CreatePolicy`] decides:
    /// close it as COMPLETED and proceed, or reject with
    /// [`BatchError::ActiveBatchOpen`].
    pub async fn create_batch(&self, metadata: BatchMetadata) -> Result<Batch, BatchError> {
        let mut state = self.state.lock().await;

        // A batch whose root is being anchored must not be force-completed
        // out from under the submission.
        if let Some(in_flight) = state.finalizing {
            return Err(BatchError::FinalizeInProgress(in_flight));
        }

        if let Some(previous) = self.store.active_batch().await? {
            match self.config.create_policy {
                CreatePolicy::CompletePrevious => {
                    self.store.complete_batch(&previous.id).await?;
                    tracing::info!(
                        batch = %previous.id,
                        "closed previous active batch as COMPLETED"
                    );
                }
                CreatePolicy::RequireClosed => {
                    return Err(BatchError::ActiveBatchOpen(previous.id));
                }
            }
        }

        let batch = self.store.create_batch(metadata).await?;
        state.active = Some(batch.id);
        state.buffer_batch = Some(batch.id);
        state.buffer.clear();
        tracing::info!(batch = %batch.id, crop = %batch.metadata.crop, "batch created");
        Ok(batch)
    }

    /// Accept one sensor reading for the current ACTIVE batch.
    ///
    /// Persists the reading, buffers it, and — when the buffer reaches the
    /// configured threshold — triggers an automatic finalize over the full
    /// persisted sequence. Returns the persisted reading plus what the
    /// buffer did.
    pub async fn accept_reading(
        &self,
        batch_id: &BatchId,
        payload: serde_json::Value,
    ) -> Result<(Reading, AcceptOutcome), BatchError> {
        let should_finalize;
        let reading;
        let buffered;
        {
            let mut state = self.state.lock().await;

            // A fresh engine over an existing store adopts the store's
            // active batch.
            if state.active.is_none() {
                if let Some(batch) = self.store.active_batch().await? {
                    state.active = Some(batch.id);
                    state.buffer_batch = Some(batch.id);
                    state.buffer.clear();
                }
            }

            let active = state.active.ok_or(BatchError::NoActiveBatch)?;
            if *batch_id != active {
                return match self.store.get_batch(batch_id).await? {
                    Some(batch) => Err(BatchError::NotActive {
                        id: *batch_id,
                        status: batch.status,
                    }),
                    None => Err(BatchError::NotFound(*batch_id)),
                };
            }

            // The reading set is frozen while a root over it is being
            // anchored; a reading slipped in here would be persisted under
            // the batch but excluded from the committed root.
            if let Some(in_flight) = state.finalizing {
                return Err(BatchError::FinalizeInProgress(in_flight));
            }

            // The buffer must be scoped to the active batch. If it is not,
            // reset it and surface the inconsistency as retryable.
            if let Some(scoped) = state.buffer_batch {
                if scoped != active {
                    state.buffer.clear();
                    state.buffer_batch = Some(active);
                    return Err(BatchError::StaleBuffer {
                        buffered: scoped,
                        active,
                    });
                }
            } else {
                state.buffer_batch = Some(active);
            }

            reading = self
                .store
                .insert_reading(&active, payload, Timestamp::now())
                .await?;
            state.buffer.push(reading.id);
            tracing::debug!(
                batch = %active,
                reading = %reading.id,
                buffered = state.buffer.len(),
                "reading accepted"
            );

            buffered = state.buffer.len();
            should_finalize = buffered >= self.config.auto_finalize_threshold;
            if should_finalize {
                state.finalizing = Some(active);
            }
        }

        if !should_finalize {
            return Ok((reading, AcceptOutcome::Buffered { buffered }));
        }

        tracing::info!(batch = %batch_id, "buffer threshold reached, auto-finalizing");
        let outcome = match self.run_finalize(*batch_id).await {
            Ok(done) => AcceptOutcome::AutoFinalized(done),
            Err(error) => {
                tracing::warn!(batch = %batch_id, %error, "auto-finalize failed, batch stays ACTIVE");
                AcceptOutcome::AutoFinalizeFailed { error }
            }
        };
        Ok((reading, outcome))
    }

    /// Commit an ACTIVE batch: compute its root over the full persisted
    /// reading sequence, anchor it, and atomically mark the batch
    /// FINALIZED.
    ///
    /// All-or-nothing: on any failure before the anchor confirmation the
    /// batch remains ACTIVE and nothing is written.
    pub async fn finalize(&self, batch_id: &BatchId) -> Result<FinalizeOutcome, BatchError> {
        {
            let mut state = self.state.lock().await;
            let batch = self
                .store
                .get_batch(batch_id)
                .await?
                .ok_or(BatchError::NotFound(*batch_id))?;
            if batch.status != BatchStatus::Active {
                return Err(BatchError::NotActive {
                    id: *batch_id,
                    status: batch.status,
                });
            }
            if let Some(in_flight) = state.finalizing {
                return Err(BatchError::FinalizeInProgress(in_flight));
            }
            state.finalizing = Some(*batch_id);
        }

        self.run_finalize(*batch_id).await
    }

    /// Read-only lifecycle status of a batch.
    pub async fn status(&self, batch_id: &BatchId) -> Result<BatchStatus, BatchError> {
        let batch = self
            .store
            .get_batch(batch_id)
            .await?
            .ok_or(BatchError::NotFound(*batch_id))?;
        Ok(batch.status)
    }

    /// The currently ACTIVE batch id, if any.
    pub async fn current_batch(&self) -> Result<Option<BatchId>, BatchError> {
        Ok(self.store.active_batch().await?.map(|b| b.id))
    }

    /// All committed batches with their roots and anchor references,
    /// newest first.
    pub async fn finalized(&self) -> Result<Vec<FinalizedBatch>, BatchError> {
        let batches = self.store.list_batches().await?;
        Ok(batches
            .into_iter()
            .filter_map(|b| match (b.merkle_root, b.anchor_ref) {
                (Some(root), Some(anchor_ref)) => Some(FinalizedBatch {
                    batch_id: b.id,
                    root,
                    anchor_ref,
                }),
                _ => None,
            })
            .collect())
    }

    /// Re-derive a finalized batch's root and compare it to the committed
    /// one. See [`crate::verify::verify_batch`].
    pub async fn verify(
        &self,
        batch_id: &BatchId,
    ) -> Result<crate::verify::VerificationReport, BatchError> {
        crate::verify::verify_batch(&self.store, batch_id).await
    }

    /// Run a finalize whose in-flight marker is already set, releasing the
    /// marker (and on success the active pointer and buffer) afterward.
    async fn run_finalize(&self, batch_id: BatchId) -> Result<FinalizeOutcome, BatchError> {
        let outcome = self.commit(batch_id).await;

        let mut state = self.state.lock().await;
        state.finalizing = None;
        if outcome.is_ok() && state.active == Some(batch_id) {
            state.active = None;
            state.buffer_batch = None;
            state.buffer.clear();
        }
        outcome
    }

    /// The commitment pipeline: read, hash, build, anchor, persist.
    /// Runs outside the transition mutex.
    async fn commit(&self, batch_id: BatchId) -> Result<FinalizeOutcome, BatchError> {
        // Authoritative input is the persisted sequence, never the buffer.
        let readings = self.store.list_readings(&batch_id).await?;
        if readings.is_empty() {
            return Err(BatchError::EmptyBatch(batch_id));
        }

        let leaves = readings
            .iter()
            .map(reading_digest)
            .collect::<Result<Vec<_>, _>>()?;
        let root = merkle_root(&leaves)?;

        let anchor_ref = self.anchor_with_retry(&batch_id, &root).await?;

        let ended_at = Timestamp::now();
        self.store
            .finalize_batch(&batch_id, root, anchor_ref.clone(), ended_at)
            .await?;

        tracing::info!(
            batch = %batch_id,
            root = %root,
            anchor = %anchor_ref,
            readings = readings.len(),
            "batch finalized"
        );
        Ok(FinalizeOutcome {
            batch_id,
            root,
            anchor_ref,
            reading_count: readings.len(),
        })
    }

    /// Submit to the anchor service, retrying transient failures with a
    /// fixed backoff. Permanent failures abort immediately.
    async fn anchor_with_retry(
        &self,
        batch_id: &BatchId,
        root: &MerkleRoot,
    ) -> Result<AnchorRef, BatchError> {
        let mut attempt = 1u32;
        loop {
            match self.anchor.anchor(batch_id, root).await {
                Ok(anchor_ref) => return Ok(anchor_ref),
                Err(err @ AnchorError::Permanent(_)) => {
                    tracing::error!(batch = %batch_id, %err, "anchor rejected submission");
                    return Err(err.into());
                }
                Err(err @ AnchorError::Transient(_)) => {
                    if attempt >= self.config.anchor_attempts {
                        tracing::error!(
                            batch = %batch_id,
                            %err,
                            attempts = attempt,
                            "anchor retries exhausted"
                        );
                        return Err(err.into());
                    }
                    tracing::warn!(batch = %batch_id, %err, attempt, "anchor failed, retrying");
                    tokio::time::sleep(self.config.anchor_backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}
