//! # agritrace-core — Foundational Types for the Commitment Engine
//!
//! This crate is the bedrock of the AgriTrace engine. It defines the
//! type-system primitives the rest of the workspace builds on. Every other
//! crate depends on `agritrace-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `BatchId`, `ReadingId`,
//!    `LeafDigest`, `MerkleRoot` — no bare strings or byte arrays for
//!    identifiers or digests.
//!
//! 2. **`CanonicalBytes` newtype.** ALL leaf digest computation flows
//!    through `CanonicalBytes::new()` (RFC 8785). No raw
//!    `serde_json::to_vec()` for digests, ever — that is how two
//!    serializations of the same reading end up with two hashes.
//!
//! 3. **UTC-only timestamps.** The `Timestamp` type enforces UTC with Z
//!    suffix and seconds precision, so reading order is unambiguous.
//!
//! 4. **Boundary hex is explicit.** Digests are raw `[u8; 32]` internally
//!    and `0x`-prefixed lowercase hex at the boundary; parsing normalizes
//!    case so comparisons are case-insensitive by construction.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `agritrace-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod reading;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{LeafDigest, MerkleRoot};
pub use error::EncodingError;
pub use identity::{BatchId, ReadingId};
pub use reading::{BatchMetadata, Npk, Reading, SensorValues};
pub use temporal::Timestamp;
