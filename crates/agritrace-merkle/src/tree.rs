//! # Merkle Root Construction
//!
//! Folds an ordered sequence of leaf digests into a single root digest.
//!
//! ## Pairing Rule
//!
//! - One leaf: the root IS that leaf — no hashing layer is added for a
//!   single-element batch.
//! - Otherwise, leaves pair left-to-right by index. An odd trailing leaf is
//!   paired with itself, so every node above the leaf level is the hash of
//!   exactly two concatenated digests: `SHA256(left ‖ right)` over the raw
//!   32-byte digests, never over a re-encoded form.
//! - Levels fold iteratively until one digest remains. Iteration, not
//!   recursion: a season-long batch must not be limited by stack depth.
//!
//! The result is order-sensitive: changing leaf order, count, or content at
//! any position changes the root.

use sha2::{Digest, Sha256};
use thiserror::Error;

use agritrace_core::{LeafDigest, MerkleRoot};

/// Error building a Merkle root.
#[derive(Error, Debug)]
pub enum MerkleError {
    /// A root over zero leaves is undefined; a batch must never finalize
    /// with no readings.
    #[error("cannot build a merkle root over zero leaves")]
    EmptyLeaves,
}

/// Hash two raw digests into their parent: `SHA256(left ‖ right)`.
fn parent_hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    let hash = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    out
}

/// Compute the Merkle root of a non-empty ordered leaf sequence.
///
/// # Errors
///
/// Returns [`MerkleError::EmptyLeaves`] for an empty input.
pub fn merkle_root(leaves: &[LeafDigest]) -> Result<MerkleRoot, MerkleError> {
    if leaves.is_empty() {
        return Err(MerkleError::EmptyLeaves);
    }
    if leaves.len() == 1 {
        return Ok(MerkleRoot::from_bytes(*leaves[0].as_bytes()));
    }

    let mut level: Vec<[u8; 32]> = leaves.iter().map(|l| *l.as_bytes()).collect();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            // Odd trailing leaf pairs with itself.
            let right = pair.get(1).unwrap_or(&pair[0]);
            next.push(parent_hash(&pair[0], right));
        }
        level = next;
    }
    Ok(MerkleRoot::from_bytes(level[0]))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_leaves(max: usize) -> impl Strategy<Value = Vec<LeafDigest>> {
        prop::collection::vec(any::<[u8; 32]>(), 1..max)
            .prop_map(|v| v.into_iter().map(LeafDigest::from_bytes).collect())
    }

    proptest! {
        /// Repeated builds over the same sequence agree.
        #[test]
        fn root_deterministic(leaves in arb_leaves(64)) {
            prop_assert_eq!(
                merkle_root(&leaves).unwrap(),
                merkle_root(&leaves).unwrap()
            );
        }

        /// Mutating any single leaf changes the root.
        #[test]
        fn any_mutation_changes_root(
            leaves in arb_leaves(32),
            index in any::<prop::sample::Index>()
        ) {
            let original = merkle_root(&leaves).unwrap();
            let i = index.index(leaves.len());
            let mut mutated = leaves.clone();
            let mut bytes = *mutated[i].as_bytes();
            bytes[0] ^= 0x01;
            mutated[i] = LeafDigest::from_bytes(bytes);
            prop_assert_ne!(original, merkle_root(&mutated).unwrap());
        }
    }
}
