//! Content address of a persisted record, using BLAKE3

use serde::{Deserialize, Serialize};
use std::fmt;

/// Size in bytes of a [`Reference`]
pub const REFERENCE_SIZE: usize = 32;

/// A 32-byte BLAKE3 content address
///
/// Node records and content blobs are both stored under the reference of
/// their bytes, so identical subtrees share one stored record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reference([u8; REFERENCE_SIZE]);

impl Reference {
    /// The zero reference (used as a sentinel/null value)
    pub const ZERO: Reference = Reference([0u8; REFERENCE_SIZE]);

    /// Create a reference from raw bytes
    pub fn from_bytes(bytes: [u8; REFERENCE_SIZE]) -> Self {
        Reference(bytes)
    }

    /// Create a reference from a slice, which must be exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; REFERENCE_SIZE] = bytes.try_into().ok()?;
        Some(Reference(arr))
    }

    /// Address arbitrary data
    pub fn digest(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Reference(*hash.as_bytes())
    }

    /// Address multiple pieces of data as one
    pub fn digest_many(parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        Reference(*hasher.finalize().as_bytes())
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; REFERENCE_SIZE] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        Reference::from_slice(&bytes).ok_or(hex::FromHexError::InvalidStringLength)
    }

    /// Get a short prefix for display (first 7 chars, like git)
    pub fn short(&self) -> String {
        self.to_hex()[..7].to_string()
    }

    /// Check if this is the zero reference
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; REFERENCE_SIZE]
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reference({})", self.short())
    }
}

impl Default for Reference {
    fn default() -> Self {
        Reference::ZERO
    }
}

impl AsRef<[u8]> for Reference {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
