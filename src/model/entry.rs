//! Caller-facing description of a trie entry

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-path metadata (string keys to string values)
pub type Metadata = BTreeMap<String, String>;

/// One path to insert, with its entry and optional metadata
///
/// Used to describe a batch of insertions without exposing the trie's
/// internal node type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub path: Vec<u8>,
    pub entry: Vec<u8>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl NodeEntry {
    pub fn new(path: impl Into<Vec<u8>>, entry: impl Into<Vec<u8>>) -> Self {
        NodeEntry {
            path: path.into(),
            entry: entry.into(),
            metadata: Metadata::new(),
        }
    }

    /// Attach a metadata key/value pair
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
