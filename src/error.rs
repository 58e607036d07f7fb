//! Error types for pathtrie

use thiserror::Error;

/// Result type alias for pathtrie operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pathtrie operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("empty path")]
    EmptyPath,

    #[error("invalid file: {0}")]
    InvalidFile(String),

    #[error("metadata too large: {size} bytes, limit {limit}")]
    MetadataTooLarge { size: usize, limit: usize },

    #[error("forbidden action: {0}")]
    ForbiddenAction(String),

    #[error("node entry size > 256: {0}")]
    EntryTooLarge(usize),

    #[error("invalid entry size: {found}, expected: {expected}")]
    SizeMismatch { expected: usize, found: usize },

    #[error("operation cancelled")]
    Cancelled,

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Invalid store file: {0}")]
    InvalidStore(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

impl Error {
    /// Not-found error for a trie path, showing it both as text and hex
    pub(crate) fn path_not_found(path: &[u8]) -> Self {
        Error::NotFound(format!(
            "entry on '{}' ('{}')",
            String::from_utf8_lossy(path),
            hex::encode(path)
        ))
    }

    /// Whether this error reports a missing path or object
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
