//! # agritrace-merkle — Reading Hashing and Root Construction
//!
//! Two pure building blocks of the commitment engine:
//!
//! - [`leaf::leaf_digest()`] — canonicalize one reading payload (RFC 8785)
//!   and SHA-256 it into a [`agritrace_core::LeafDigest`].
//! - [`tree::merkle_root()`] — fold an ordered, non-empty sequence of leaf
//!   digests into a [`agritrace_core::MerkleRoot`] by iterative pairwise
//!   hashing over raw digest bytes.
//!
//! Both are deterministic and side-effect free. Everything stateful —
//! batches, buffers, anchoring — lives in `agritrace-batch`.

pub mod leaf;
pub mod tree;

pub use leaf::{leaf_digest, reading_digest};
pub use tree::{merkle_root, MerkleError};
