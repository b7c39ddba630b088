//! # Error Types — Encoding and Digest Parsing
//!
//! Errors raised by the foundational types. All errors use `thiserror`
//! for derive-based `Display` and `Error` implementations.
//!
//! Encoding failures are data-integrity bugs, not retryable conditions:
//! a well-formed reading always canonicalizes. Batch lifecycle errors
//! live in `agritrace-batch`, next to the state machine that raises them.

use thiserror::Error;

/// Error canonicalizing or decoding digest material.
#[derive(Error, Debug)]
pub enum EncodingError {
    /// A reading payload must be a JSON object (named sensor fields).
    #[error("reading payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// JCS serialization failed.
    #[error("canonical serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A digest string had the wrong length.
    #[error("digest hex must be 64 chars (optionally 0x-prefixed), got {0} chars")]
    BadHexLength(usize),

    /// A digest string contained a non-hex character.
    #[error("invalid hex digit at byte {0}")]
    BadHexDigit(usize),

    /// A timestamp string was malformed or not UTC.
    #[error("invalid timestamp: {0}")]
    BadTimestamp(String),
}
