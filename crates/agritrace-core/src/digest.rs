//! # Digest Newtypes — Leaf Digests and Merkle Roots
//!
//! 256-bit digest newtypes with a strict boundary encoding. Internally a
//! digest is a raw `[u8; 32]`; whenever it crosses the system boundary
//! (anchor client, HTTP layer, serialized records) it is rendered as
//! lowercase hex with the fixed `0x` prefix.
//!
//! `LeafDigest` summarizes exactly one reading; `MerkleRoot` summarizes an
//! ordered sequence of leaf digests. They are distinct types so a leaf can
//! never be stored where a root is expected, except through the explicit
//! single-leaf identity conversion in `agritrace-merkle`.
//!
//! Parsing accepts an optional `0x`/`0X` prefix and mixed-case hex and
//! normalizes to the raw bytes, so boundary comparison is case-insensitive
//! by construction.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EncodingError;

/// Decode exactly 64 hex chars (optionally `0x`-prefixed, any case) into
/// 32 raw bytes.
fn parse_hex_32(s: &str) -> Result<[u8; 32], EncodingError> {
    let s = s.trim();
    let s = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    if s.len() != 64 {
        return Err(EncodingError::BadHexLength(s.len()));
    }
    let mut out = [0u8; 32];
    for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
        let hi = hex_val(chunk[0]).ok_or(EncodingError::BadHexDigit(i * 2))?;
        let lo = hex_val(chunk[1]).ok_or(EncodingError::BadHexDigit(i * 2 + 1))?;
        out[i] = (hi << 4) | lo;
    }
    Ok(out)
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn to_hex_64(bytes: &[u8; 32]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

macro_rules! digest_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name([u8; 32]);

        impl $name {
            /// Wrap raw digest bytes.
            pub fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Access the raw 32-byte digest.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Render as unprefixed lowercase hex (64 chars).
            pub fn to_hex(&self) -> String {
                to_hex_64(&self.0)
            }

            /// Render in the boundary form: `0x` + 64 lowercase hex chars.
            pub fn to_prefixed_hex(&self) -> String {
                format!("0x{}", self.to_hex())
            }

            /// Parse from hex, accepting an optional `0x`/`0X` prefix and
            /// mixed case. Comparison after parsing is over raw bytes, so
            /// hex case never affects equality.
            pub fn parse_hex(s: &str) -> Result<Self, EncodingError> {
                parse_hex_32(s).map(Self)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.to_prefixed_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_prefixed_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::parse_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

digest_newtype! {
    /// SHA-256 digest of one canonicalized sensor reading.
    LeafDigest
}

digest_newtype! {
    /// SHA-256 commitment to an ordered sequence of leaf digests.
    MerkleRoot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bytes() -> [u8; 32] {
        let mut b = [0u8; 32];
        for (i, v) in b.iter_mut().enumerate() {
            *v = i as u8;
        }
        b
    }

    #[test]
    fn test_hex_round_trip() {
        let d = LeafDigest::from_bytes(sample_bytes());
        let parsed = LeafDigest::parse_hex(&d.to_hex()).unwrap();
        assert_eq!(d, parsed);
    }

    #[test]
    fn test_prefixed_form() {
        let d = MerkleRoot::from_bytes([0xab; 32]);
        let hex = d.to_prefixed_hex();
        assert!(hex.starts_with("0x"));
        assert_eq!(hex.len(), 66);
        assert_eq!(MerkleRoot::parse_hex(&hex).unwrap(), d);
    }

    #[test]
    fn test_parse_case_insensitive() {
        let lower = format!("0x{}", "ab".repeat(32));
        let upper = lower.to_uppercase();
        let a = MerkleRoot::parse_hex(&lower).unwrap();
        let b = MerkleRoot::parse_hex(&upper).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_0x_prefix_optional() {
        let bare = "cd".repeat(32);
        let prefixed = format!("0x{bare}");
        assert_eq!(
            LeafDigest::parse_hex(&bare).unwrap(),
            LeafDigest::parse_hex(&prefixed).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_bad_length() {
        assert!(matches!(
            LeafDigest::parse_hex("abcd"),
            Err(EncodingError::BadHexLength(4))
        ));
        assert!(LeafDigest::parse_hex(&"ab".repeat(33)).is_err());
        assert!(LeafDigest::parse_hex("").is_err());
    }

    #[test]
    fn test_parse_rejects_non_hex() {
        let bad = format!("zz{}", "ab".repeat(31));
        assert!(matches!(
            LeafDigest::parse_hex(&bad),
            Err(EncodingError::BadHexDigit(0))
        ));
    }

    #[test]
    fn test_display_is_prefixed() {
        let d = LeafDigest::from_bytes([0u8; 32]);
        assert_eq!(format!("{d}"), format!("0x{}", "00".repeat(32)));
    }

    #[test]
    fn test_serde_as_prefixed_string() {
        let d = MerkleRoot::from_bytes(sample_bytes());
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.starts_with("\"0x"));
        let back: MerkleRoot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn test_serde_accepts_uppercase() {
        let json = format!("\"0x{}\"", "AB".repeat(32));
        let d: MerkleRoot = serde_json::from_str(&json).unwrap();
        assert_eq!(d.to_hex(), "ab".repeat(32));
    }
}
