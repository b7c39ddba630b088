//! # Canonical Serialization — JCS Byte Production
//!
//! Defines `CanonicalBytes`, the sole construction path for bytes used in
//! leaf digest computation.
//!
//! ## Integrity Invariant
//!
//! The `CanonicalBytes` newtype has a private inner field. The only way to
//! construct it is through `CanonicalBytes::new()`, which serializes with
//! RFC 8785 (JSON Canonicalization Scheme): keys sorted lexicographically at
//! every nesting level, compact separators, UTF-8, deterministic number
//! rendering. Any function that hashes reading content must accept
//! `&CanonicalBytes`, so no code path can hash non-canonical bytes.
//!
//! Two readings with the same logical content — regardless of field
//! insertion order or incidental formatting — produce the same bytes, and
//! therefore the same leaf digest.
//!
//! Fractional sensor values (pH 6.5, rainfall 3.2) are legal: JCS mandates
//! ES6 shortest-round-trip number serialization, which is deterministic.
//! Non-finite floats cannot appear because `serde_json::Number` excludes
//! NaN and infinities.

use serde::Serialize;

use crate::error::EncodingError;

/// Bytes produced exclusively by RFC 8785 canonicalization.
///
/// # Invariants
///
/// - The only constructor is `CanonicalBytes::new()`.
/// - Object keys are sorted lexicographically at every nesting level.
/// - Output is compact (no whitespace) UTF-8.
///
/// The inner `Vec<u8>` is private, so downstream code cannot smuggle in
/// bytes from another serialization path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `EncodingError::Serialization` if the value cannot be
    /// represented as JSON. This never happens for well-formed readings and
    /// indicates a programming or data-integrity bug, not a retryable
    /// condition.
    pub fn new(obj: &impl Serialize) -> Result<Self, EncodingError> {
        let s = serde_jcs::to_string(obj)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
