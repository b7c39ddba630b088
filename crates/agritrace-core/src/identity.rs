//! # Domain Identity Newtypes
//!
//! Newtype wrappers for the identifiers in the commitment engine. These
//! prevent accidental identifier confusion — you cannot pass a `ReadingId`
//! where a `BatchId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a production batch (one bounded harvest run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(pub Uuid);

/// Unique identifier for a single persisted sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReadingId(pub Uuid);

impl BatchId {
    /// Generate a new random batch identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadingId {
    /// Generate a new random reading identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReadingId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "batch:{}", self.0)
    }
}

impl std::fmt::Display for ReadingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "reading:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_ids_unique() {
        assert_ne!(BatchId::new(), BatchId::new());
    }

    #[test]
    fn test_display_namespaced() {
        let b = BatchId::new();
        assert!(b.to_string().starts_with("batch:"));
        let r = ReadingId::new();
        assert!(r.to_string().starts_with("reading:"));
    }

    #[test]
    fn test_serde_round_trip() {
        let b = BatchId::new();
        let json = serde_json::to_string(&b).unwrap();
        let back: BatchId = serde_json::from_str(&json).unwrap();
        assert_eq!(b, back);
    }
}
