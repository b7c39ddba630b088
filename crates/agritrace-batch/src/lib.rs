//! # agritrace-batch — Batch Lifecycle, Commitment, and Verification
//!
//! The coordination layer of the engine: groups sensor readings into
//! production batches, commits each batch's Merkle root to an external
//! anchor, and re-derives roots on demand to prove the stored readings
//! have not changed since commitment.
//!
//! ## Modules
//!
//! - [`lifecycle`] — batch states (`ACTIVE` / `FINALIZED` / `COMPLETED`)
//!   and the persisted batch record
//! - [`store`] — the [`BatchStore`] persistence seam and the in-memory
//!   reference implementation
//! - [`anchor`] — the [`AnchorClient`] ledger seam and a scriptable
//!   in-process double
//! - [`engine`] — the serialized state machine: create, accept,
//!   auto-finalize at a threshold, manual finalize
//! - [`verify`] — recompute-and-compare tamper detection
//! - [`error`] — the [`BatchError`] taxonomy
//!
//! ## Crate Policy
//!
//! No `unsafe`. No `unwrap`/`expect` outside tests and lock poisoning on
//! test doubles; fallible paths return [`BatchError`].

pub mod anchor;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod store;
pub mod verify;

pub use anchor::{AnchorClient, AnchorError, AnchorRef, StaticAnchor};
pub use engine::{
    AcceptOutcome, BatchEngine, CreatePolicy, EngineConfig, FinalizeOutcome, FinalizedBatch,
};
pub use error::BatchError;
pub use lifecycle::{Batch, BatchStatus};
pub use store::{BatchStore, MemoryStore};
pub use verify::{verify_batch, VerificationReport};
