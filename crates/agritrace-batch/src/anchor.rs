//! # Anchor Client Contract
//!
//! The external immutable ledger is reached through the [`AnchorClient`]
//! seam: submit a root under a batch id, get back an opaque confirmation
//! reference. The engine never sees transaction assembly, gas, or wire
//! formats — only success, a transient failure worth retrying, or a
//! permanent rejection.
//!
//! Double submission of the same `(batch id, root)` pair is expected to be
//! idempotent at the ledger layer, so a timeout is a retry signal, never a
//! cancellation trigger.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use agritrace_core::{BatchId, MerkleRoot};

/// Opaque confirmation reference returned by the anchor service
/// (e.g., a ledger transaction hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnchorRef(pub String);

impl AnchorRef {
    /// Access the reference string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AnchorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failure submitting a root to the anchor service.
#[derive(Error, Debug, Clone)]
pub enum AnchorError {
    /// Network trouble or timeout — safe to retry with the same inputs.
    #[error("transient anchor failure: {0}")]
    Transient(String),

    /// The ledger rejected the submission — fatal for this attempt,
    /// operator intervention required.
    #[error("permanent anchor failure: {0}")]
    Permanent(String),
}

impl AnchorError {
    /// Whether the coordinator should retry this failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Durably records a root under a batch id on an external ledger.
///
/// Submission may be slow (seconds). The engine awaits it outside its
/// critical section, so implementations need no special latency care.
pub trait AnchorClient: Send + Sync {
    /// Anchor `root` under `batch_id`, returning the confirmation
    /// reference.
    fn anchor(
        &self,
        batch_id: &BatchId,
        root: &MerkleRoot,
    ) -> impl std::future::Future<Output = Result<AnchorRef, AnchorError>> + Send;
}

/// In-process anchor double for tests and embedders without a ledger.
///
/// Returns a deterministic reference derived from the batch id and root.
/// Failures can be scripted up front; each call consumes one scripted
/// failure before the double starts succeeding.
#[derive(Debug, Default)]
pub struct StaticAnchor {
    scripted_failures: Mutex<VecDeque<AnchorError>>,
    anchored: Mutex<Vec<(BatchId, MerkleRoot)>>,
}

impl StaticAnchor {
    /// An anchor double that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue failures to be returned, in order, before any success.
    pub fn with_failures(failures: impl IntoIterator<Item = AnchorError>) -> Self {
        Self {
            scripted_failures: Mutex::new(failures.into_iter().collect()),
            anchored: Mutex::new(Vec::new()),
        }
    }

    /// Every `(batch, root)` pair successfully anchored, in call order.
    pub fn anchored(&self) -> Vec<(BatchId, MerkleRoot)> {
        self.anchored.lock().expect("anchor log lock").clone()
    }
}

impl AnchorClient for StaticAnchor {
    async fn anchor(
        &self,
        batch_id: &BatchId,
        root: &MerkleRoot,
    ) -> Result<AnchorRef, AnchorError> {
        let next_failure = self
            .scripted_failures
            .lock()
            .expect("failure script lock")
            .pop_front();
        if let Some(err) = next_failure {
            return Err(err);
        }
        self.anchored
            .lock()
            .expect("anchor log lock")
            .push((*batch_id, *root));
        Ok(AnchorRef(format!(
            "tx:{}:{}",
            batch_id.as_uuid().simple(),
            &root.to_hex()[..16]
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(fill: u8) -> MerkleRoot {
        MerkleRoot::from_bytes([fill; 32])
    }

    #[tokio::test]
    async fn test_static_anchor_deterministic() {
        let anchor = StaticAnchor::new();
        let id = BatchId::new();
        let a = anchor.anchor(&id, &root(0x11)).await.unwrap();
        let b = anchor.anchor(&id, &root(0x11)).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(anchor.anchored().len(), 2);
    }

    #[tokio::test]
    async fn test_scripted_failures_consumed_in_order() {
        let anchor = StaticAnchor::with_failures([
            AnchorError::Transient("timeout".into()),
            AnchorError::Transient("reset".into()),
        ]);
        let id = BatchId::new();
        assert!(anchor.anchor(&id, &root(0x22)).await.is_err());
        assert!(anchor.anchor(&id, &root(0x22)).await.is_err());
        assert!(anchor.anchor(&id, &root(0x22)).await.is_ok());
        assert_eq!(anchor.anchored().len(), 1);
    }

    #[test]
    fn test_transient_predicate() {
        assert!(AnchorError::Transient("t".into()).is_transient());
        assert!(!AnchorError::Permanent("p".into()).is_transient());
    }
}
