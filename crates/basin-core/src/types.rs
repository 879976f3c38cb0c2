//! Core type definitions for Basin

use serde::{Deserialize, Serialize};
use std::fmt;

/// Token identifier (e.g. a hex-encoded contract address).
///
/// Ordering is plain lexicographic ordering of the identifier string; wells
/// require their tokens in strictly ascending order under it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub String);

impl TokenId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Well ID (32-byte content hash of the well configuration, hex-encoded)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WellId(pub String);

impl WellId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_digest(digest: &[u8; 32]) -> Self {
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 hex characters, for log lines
    pub fn short(&self) -> &str {
        let end = self.0.len().min(8);
        &self.0[..end]
    }
}

impl fmt::Display for WellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Host-provided time for a state-changing operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockContext {
    /// Seconds since the host's epoch
    pub timestamp: u64,
    pub block_number: u64,
}

impl BlockContext {
    pub fn new(timestamp: u64, block_number: u64) -> Self {
        Self {
            timestamp,
            block_number,
        }
    }

    /// Context `seconds` later, one block further. Saturates at `u64::MAX`.
    pub fn advance(&self, seconds: u64) -> Self {
        Self {
            timestamp: self.timestamp.saturating_add(seconds),
            block_number: self.block_number.saturating_add(1),
        }
    }
}

/// Serde helper for byte blobs carried as hex strings
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_ordering_is_lexicographic() {
        let usdc = TokenId::new("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
        let bean = TokenId::new("0xbea0000029ad1c77d3d5d23ba2d8893db9d1efab");
        assert!(usdc < bean);
    }

    #[test]
    fn test_well_id_from_digest() {
        let id = WellId::from_digest(&[0xab; 32]);
        assert_eq!(id.as_str().len(), 64);
        assert_eq!(id.short(), "abababab");
    }

    #[test]
    fn test_block_context_advance() {
        let ctx = BlockContext::new(1_000, 10).advance(12);
        assert_eq!(ctx, BlockContext::new(1_012, 11));

        let end = BlockContext::new(u64::MAX - 1, u64::MAX).advance(12);
        assert_eq!(end, BlockContext::new(u64::MAX, u64::MAX));
    }

    #[derive(Serialize, Deserialize)]
    struct Blob {
        #[serde(with = "hex_bytes")]
        data: Vec<u8>,
    }

    #[test]
    fn test_hex_bytes_accepts_prefixed_input() {
        let parsed: Blob = serde_json::from_str(r#"{"data":"0x0a0b"}"#).unwrap();
        assert_eq!(parsed.data, vec![0x0a, 0x0b]);
        let json = serde_json::to_string(&parsed).unwrap();
        assert_eq!(json, r#"{"data":"0a0b"}"#);
    }
}
