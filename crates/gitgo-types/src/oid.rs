use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Width of an object identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OidFormat {
    /// 20 bytes, 40 hex characters (SHA-1 sized).
    Hex40,
    /// 32 bytes, 64 hex characters (SHA-256 / BLAKE3 sized).
    Hex64,
}

impl OidFormat {
    /// Number of raw bytes in this format.
    pub const fn byte_len(self) -> usize {
        match self {
            Self::Hex40 => 20,
            Self::Hex64 => 32,
        }
    }

    /// Number of hex characters in this format.
    pub const fn hex_len(self) -> usize {
        self.byte_len() * 2
    }

    fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            40 => Some(Self::Hex40),
            64 => Some(Self::Hex64),
            _ => None,
        }
    }
}

/// Content-addressed identifier for a stored object.
///
/// An `Oid` is opaque: it is compared, hashed and printed, never interpreted.
/// Its textual form is always lowercase hex of exactly 40 or 64 characters.
/// Short identifiers are zero-padded internally so the type stays `Copy`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid {
    format: OidFormat,
    bytes: [u8; 32],
}

impl Oid {
    /// Create a 64-hex `Oid` from a pre-computed 32-byte hash.
    pub const fn from_hash(hash: [u8; 32]) -> Self {
        Self {
            format: OidFormat::Hex64,
            bytes: hash,
        }
    }

    /// Create a 40-hex `Oid` from a 20-byte hash.
    pub fn from_short_hash(hash: [u8; 20]) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..20].copy_from_slice(&hash);
        Self {
            format: OidFormat::Hex40,
            bytes,
        }
    }

    /// The null object ID (all zeros). Represents "no object".
    pub const fn null() -> Self {
        Self::from_hash([0u8; 32])
    }

    /// Returns `true` if every byte of this identifier is zero.
    pub fn is_null(&self) -> bool {
        self.as_bytes().iter().all(|b| *b == 0)
    }

    /// The width of this identifier.
    pub fn format(&self) -> OidFormat {
        self.format
    }

    /// The raw hash bytes (20 or 32 of them).
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.format.byte_len()]
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.bytes[..4])
    }

    /// Parse from a lowercase hex string of 40 or 64 characters.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let format =
            OidFormat::from_hex_len(s.len()).ok_or(TypeError::InvalidOidLength(s.len()))?;
        if !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(TypeError::InvalidHex(s.to_string()));
        }
        let decoded = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        let mut bytes = [0u8; 32];
        bytes[..decoded.len()].copy_from_slice(&decoded);
        Ok(Self { format, bytes })
    }

    /// Returns `true` if `s` is a well-formed identifier.
    pub fn is_valid_hex(s: &str) -> bool {
        Self::from_hex(s).is_ok()
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self.short_hex())
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Oid {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 32]> for Oid {
    fn from(bytes: [u8; 32]) -> Self {
        Self::from_hash(bytes)
    }
}

impl From<[u8; 20]> for Oid {
    fn from(bytes: [u8; 20]) -> Self {
        Self::from_short_hash(bytes)
    }
}

impl Serialize for Oid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Oid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
