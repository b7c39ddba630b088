//! # Canonical Reading Hashing
//!
//! Turns one sensor reading into a stable 256-bit digest, independent of
//! field insertion order or incidental formatting.
//!
//! ## Integrity Invariant
//!
//! The digest is computed over `CanonicalBytes` only. The signature of
//! [`leaf_digest()`] makes it impossible to hash a payload that skipped
//! canonicalization, so two semantically identical readings can never
//! produce different leaves.

use serde_json::Value;
use sha2::{Digest, Sha256};

use agritrace_core::reading::ensure_object;
use agritrace_core::{CanonicalBytes, EncodingError, LeafDigest, Reading};

/// Hash one reading payload into its leaf digest.
///
/// The payload must be a JSON object (named sensor fields). The result is
/// `SHA256(JCS(payload))` — a pure function of the payload's logical
/// content.
///
/// # Errors
///
/// Returns an `EncodingError` if the payload is not an object or cannot be
/// canonically serialized. Neither happens for well-formed readings; both
/// indicate a data-integrity bug upstream.
pub fn leaf_digest(payload: &Value) -> Result<LeafDigest, EncodingError> {
    ensure_object(payload)?;
    let canonical = CanonicalBytes::new(payload)?;
    let hash = Sha256::digest(canonical.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    Ok(LeafDigest::from_bytes(bytes))
}

/// Hash a persisted reading. Only the payload contributes to the digest;
/// identifiers and timestamps are storage bookkeeping, not sensor content.
pub fn reading_digest(reading: &Reading) -> Result<LeafDigest, EncodingError> {
    leaf_digest(&reading.payload)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::Value;

    fn flat_payload() -> impl Strategy<Value = Vec<(String, f64)>> {
        prop::collection::btree_map("[a-z]{1,10}", -1.0e6f64..1.0e6, 1..10)
            .prop_map(|m| m.into_iter().collect())
    }

    proptest! {
        /// Permuting field insertion order never changes the leaf digest.
        #[test]
        fn permutation_invariant(fields in flat_payload()) {
            let forward: serde_json::Map<String, Value> = fields
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::json!(v)))
                .collect();
            let reversed: serde_json::Map<String, Value> = fields
                .iter()
                .rev()
                .map(|(k, v)| (k.clone(), serde_json::json!(v)))
                .collect();
            let a = leaf_digest(&Value::Object(forward)).unwrap();
            let b = leaf_digest(&Value::Object(reversed)).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
