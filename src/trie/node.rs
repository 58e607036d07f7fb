//! Trie node types

use super::codec;
use super::path;
use crate::model::{Metadata, Reference};
use crate::store::Loader;
use crate::{Context, Error, Result};
use std::collections::BTreeMap;

/// Longest label a single fork may carry; longer paths are split over
/// intermediate nodes so encoded records stay bounded
pub const MAX_PREFIX_LEN: usize = 30;

/// Largest entry a node may hold
pub const MAX_ENTRY_SIZE: usize = 256;

/// Largest JSON encoding of a node's metadata
pub const MAX_METADATA_SIZE: usize = u16::MAX as usize;

pub const OBFUSCATION_KEY_SIZE: usize = 32;

/// Key the record encoder XORs entries with
pub type ObfuscationKey = [u8; OBFUSCATION_KEY_SIZE];

/// Key used when none has been set
pub const ZERO_OBFUSCATION_KEY: ObfuscationKey = [0u8; OBFUSCATION_KEY_SIZE];

/// What a node holds
///
/// The flags are orthogonal and derived from the node's structure; only the
/// trie mutators change them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeKind {
    pub(crate) value: bool,
    pub(crate) edge: bool,
    pub(crate) metadata: bool,
    pub(crate) empty_directory: bool,
}

impl NodeKind {
    const VALUE: u8 = 0b0000_0010;
    const EDGE: u8 = 0b0000_0100;
    /// Fork-table flag: the edge label contains a path separator
    pub(crate) const PATH_SEPARATOR: u8 = 0b0000_1000;
    const METADATA: u8 = 0b0001_0000;
    const EMPTY_DIRECTORY: u8 = 0b0010_0000;

    /// The node holds an entry
    pub fn is_value(&self) -> bool {
        self.value
    }

    /// The node forks into other nodes
    pub fn is_edge(&self) -> bool {
        self.edge
    }

    pub fn has_metadata(&self) -> bool {
        self.metadata
    }

    /// The node is a placeholder for a directory without files
    pub fn is_empty_directory(&self) -> bool {
        self.empty_directory
    }

    pub(crate) fn to_byte(self) -> u8 {
        let mut byte = 0;
        if self.value {
            byte |= Self::VALUE;
        }
        if self.edge {
            byte |= Self::EDGE;
        }
        if self.metadata {
            byte |= Self::METADATA;
        }
        if self.empty_directory {
            byte |= Self::EMPTY_DIRECTORY;
        }
        byte
    }

    pub(crate) fn from_byte(byte: u8) -> Self {
        NodeKind {
            value: byte & Self::VALUE != 0,
            edge: byte & Self::EDGE != 0,
            metadata: byte & Self::METADATA != 0,
            empty_directory: byte & Self::EMPTY_DIRECTORY != 0,
        }
    }
}

/// Whether an expanded node still matches its persisted record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// Unchanged since it was saved under this reference
    Clean(Reference),
    /// Modified (or never saved); must be re-encoded on the next save
    Dirty,
}

/// Contents of an expanded node
#[derive(Clone, Debug, Default)]
pub(crate) struct Body {
    pub(crate) kind: NodeKind,
    pub(crate) ref_size: usize,
    pub(crate) obfuscation_key: ObfuscationKey,
    pub(crate) entry: Vec<u8>,
    pub(crate) metadata: Metadata,
    pub(crate) forks: BTreeMap<u8, Fork>,
}

impl Body {
    /// Enforce the entry size limits, fixing `ref_size` on the first entry
    pub(crate) fn check_entry_size(&mut self, len: usize) -> Result<()> {
        if self.ref_size == 0 {
            if len > MAX_ENTRY_SIZE {
                return Err(Error::EntryTooLarge(len));
            }
            // empty entries belong to directories and fix nothing
            if len > 0 {
                self.ref_size = len;
            }
        } else if len > 0 && len != self.ref_size {
            return Err(Error::SizeMismatch {
                expected: self.ref_size,
                found: len,
            });
        }
        Ok(())
    }

    /// Turn this node into an empty-directory placeholder
    pub(crate) fn make_empty_directory(&mut self) {
        self.forks.clear();
        self.kind.edge = false;
        self.kind.value = false;
        self.kind.empty_directory = true;
        self.entry = vec![0u8; self.ref_size];
    }

    pub(crate) fn clear_value(&mut self) {
        self.kind.value = false;
        self.kind.metadata = false;
        self.entry.clear();
        self.metadata.clear();
    }

    /// A childless empty-directory marker holding nothing else
    pub(crate) fn is_placeholder(&self) -> bool {
        self.kind.empty_directory && !self.kind.value && !self.kind.metadata && self.forks.is_empty()
    }

    /// Hang `node` below this body under `label`, splitting labels longer
    /// than [`MAX_PREFIX_LEN`] over fresh intermediates
    ///
    /// Unlike insertion this never looks inside `node`, so stubs stay stubs.
    pub(crate) fn graft(&mut self, mut label: Vec<u8>, node: Node) {
        let Some(&key) = label.first() else {
            return;
        };
        if label.len() > MAX_PREFIX_LEN {
            let tail = label.split_off(MAX_PREFIX_LEN);
            let mut mid = Body {
                ref_size: self.ref_size,
                obfuscation_key: self.obfuscation_key,
                ..Body::default()
            };
            mid.graft(tail, node);
            self.forks.insert(key, Fork::new(label, Node::resolved(mid)));
        } else {
            self.forks.insert(key, Fork::new(label, node));
        }
        self.kind.edge = true;
    }
}

#[derive(Clone, Debug)]
pub(crate) enum NodeState {
    /// A stub: only the reference of a persisted record is known
    Unresolved(Reference),
    /// Expanded in memory
    Resolved { body: Body, sync: SyncState },
}

/// A vertex of the path trie
///
/// A node is either a stub holding the reference of a persisted record, or
/// expanded in memory. Stubs are expanded through a [`Loader`] the first time
/// an operation needs to look inside them.
#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) state: NodeState,
    pub(crate) index: Option<u64>,
}

/// A labelled edge to an exclusively owned child node
#[derive(Clone, Debug)]
pub struct Fork {
    pub(crate) prefix: Vec<u8>,
    pub(crate) node: Node,
}

impl Fork {
    pub(crate) fn new(prefix: Vec<u8>, node: Node) -> Self {
        Fork { prefix, node }
    }

    /// The label of this edge; its first byte is the key in the parent
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Whether the label contains a path separator
    pub fn has_path_separator(&self) -> bool {
        path::has_separator(&self.prefix)
    }

    /// The edge reads as a directory: removing its exact path keeps an
    /// empty-directory placeholder rather than deleting the fork
    pub(crate) fn is_directory_flavored(&self) -> bool {
        self.has_path_separator()
    }
}

impl Node {
    /// Create an empty in-memory root
    pub fn new() -> Self {
        Node::resolved(Body::default())
    }

    /// Create an empty root whose entries are obfuscated with `key`
    ///
    /// Keys shorter than 32 bytes are zero-padded, longer ones truncated.
    pub fn with_obfuscation_key(key: &[u8]) -> Self {
        let mut node = Node::new();
        node.set_obfuscation_key(key);
        node
    }

    /// Create a stub standing for the record persisted under `reference`
    pub fn from_reference(reference: Reference) -> Self {
        Node {
            state: NodeState::Unresolved(reference),
            index: None,
        }
    }

    pub(crate) fn resolved(body: Body) -> Self {
        Node {
            state: NodeState::Resolved {
                body,
                sync: SyncState::Dirty,
            },
            index: None,
        }
    }

    /// A fresh node sharing the entry size and key of its future parent
    pub(crate) fn intermediate(ref_size: usize, obfuscation_key: ObfuscationKey) -> Self {
        Node::resolved(Body {
            ref_size,
            obfuscation_key,
            ..Body::default()
        })
    }

    /// A fresh empty-directory placeholder
    pub(crate) fn empty_directory(ref_size: usize, obfuscation_key: ObfuscationKey) -> Self {
        let mut body = Body {
            ref_size,
            obfuscation_key,
            ..Body::default()
        };
        body.make_empty_directory();
        Node::resolved(body)
    }

    /// Whether the node has been expanded in memory
    pub fn is_resolved(&self) -> bool {
        matches!(self.state, NodeState::Resolved { .. })
    }

    /// Whether the node changed since it was last saved
    pub fn is_dirty(&self) -> bool {
        matches!(
            self.state,
            NodeState::Resolved {
                sync: SyncState::Dirty,
                ..
            }
        )
    }

    /// Persistence state of an expanded node; `None` for a stub
    pub fn sync_state(&self) -> Option<SyncState> {
        match &self.state {
            NodeState::Unresolved(_) => None,
            NodeState::Resolved { sync, .. } => Some(*sync),
        }
    }

    /// Reference of the persisted record, if the node is unchanged since saving
    pub fn reference(&self) -> Option<Reference> {
        match &self.state {
            NodeState::Unresolved(reference) => Some(*reference),
            NodeState::Resolved {
                sync: SyncState::Clean(reference),
                ..
            } => Some(*reference),
            NodeState::Resolved {
                sync: SyncState::Dirty,
                ..
            } => None,
        }
    }

    pub(crate) fn body(&self) -> Option<&Body> {
        match &self.state {
            NodeState::Resolved { body, .. } => Some(body),
            NodeState::Unresolved(_) => None,
        }
    }

    pub(crate) fn body_mut(&mut self) -> Option<&mut Body> {
        match &mut self.state {
            NodeState::Resolved { body, .. } => Some(body),
            NodeState::Unresolved(_) => None,
        }
    }

    /// Kind flags of an expanded node; `None` for a stub
    pub fn kind(&self) -> Option<NodeKind> {
        self.body().map(|b| b.kind)
    }

    pub fn is_value(&self) -> bool {
        self.body().is_some_and(|b| b.kind.value)
    }

    pub fn is_edge(&self) -> bool {
        self.body().is_some_and(|b| b.kind.edge)
    }

    pub fn has_metadata(&self) -> bool {
        self.body().is_some_and(|b| b.kind.metadata)
    }

    pub fn is_empty_directory(&self) -> bool {
        self.body().is_some_and(|b| b.kind.empty_directory)
    }

    /// The entry stored on this node (empty for stubs and intermediates)
    pub fn entry(&self) -> &[u8] {
        self.body().map_or(&[], |b| b.entry.as_slice())
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.body()
            .filter(|b| b.kind.metadata)
            .map(|b| &b.metadata)
    }

    /// Byte length shared by the entries beneath this node (0 while unset)
    pub fn ref_size(&self) -> usize {
        self.body().map_or(0, |b| b.ref_size)
    }

    pub fn obfuscation_key(&self) -> Option<&ObfuscationKey> {
        self.body().map(|b| &b.obfuscation_key)
    }

    /// Labels of the forks below this node, in key order
    pub fn prefixes(&self) -> Vec<&[u8]> {
        self.forks().map(|f| f.prefix.as_slice()).collect()
    }

    pub fn forks(&self) -> impl Iterator<Item = &Fork> {
        self.body().into_iter().flat_map(|b| b.forks.values())
    }

    pub fn index(&self) -> Option<u64> {
        self.index
    }

    /// Tag this node with a sequence number reported by lookups through it
    pub fn set_index(&mut self, index: u64) {
        self.index = Some(index);
    }

    /// Set the key this node's entry is obfuscated with in its record
    ///
    /// Nodes created below inherit it. Has no effect on a stub.
    pub fn set_obfuscation_key(&mut self, key: &[u8]) {
        let Some(body) = self.body_mut() else {
            return;
        };
        let len = key.len().min(OBFUSCATION_KEY_SIZE);
        body.obfuscation_key = ZERO_OBFUSCATION_KEY;
        body.obfuscation_key[..len].copy_from_slice(&key[..len]);
        self.invalidate();
    }

    /// Mark the node as changed since its last save
    pub(crate) fn invalidate(&mut self) {
        if let NodeState::Resolved { sync, .. } = &mut self.state {
            *sync = SyncState::Dirty;
        }
    }

    pub(crate) fn mark_clean(&mut self, reference: Reference) {
        if let NodeState::Resolved { sync, .. } = &mut self.state {
            *sync = SyncState::Clean(reference);
        }
    }

    /// Expand a stub by loading its record; no-op for expanded nodes
    pub(crate) fn expand<L: Loader + ?Sized>(
        &mut self,
        ctx: &Context,
        loader: &L,
    ) -> Result<&mut Body> {
        if let NodeState::Unresolved(reference) = self.state {
            ctx.check()?;
            let data = loader.load(ctx, &reference)?;
            let body = codec::decode(&data)?;
            tracing::trace!(
                reference = %reference.short(),
                forks = body.forks.len(),
                "expanded node"
            );
            self.state = NodeState::Resolved {
                body,
                sync: SyncState::Clean(reference),
            };
        }
        match &mut self.state {
            NodeState::Resolved { body, .. } => Ok(body),
            NodeState::Unresolved(reference) => Err(Error::Corruption(format!(
                "node {} stayed unresolved after loading",
                reference.short()
            ))),
        }
    }

    /// A standalone copy of this value node: entry, metadata and key, no forks
    ///
    /// The copy keeps the persisted reference when dropping the forks leaves
    /// the record unchanged. Returns `None` for stubs and non-value nodes.
    pub(crate) fn value_copy(&self) -> Option<Node> {
        let body = self.body().filter(|b| b.kind.value)?;
        let copy = Body {
            kind: NodeKind {
                value: true,
                edge: false,
                metadata: body.kind.metadata,
                empty_directory: false,
            },
            ref_size: body.ref_size,
            obfuscation_key: body.obfuscation_key,
            entry: body.entry.clone(),
            metadata: body.metadata.clone(),
            forks: BTreeMap::new(),
        };
        let sync = match self.sync_state() {
            Some(SyncState::Clean(reference))
                if body.forks.is_empty() && !body.kind.empty_directory =>
            {
                SyncState::Clean(reference)
            }
            _ => SyncState::Dirty,
        };
        Some(Node {
            state: NodeState::Resolved { body: copy, sync },
            index: self.index,
        })
    }
}

impl Default for Node {
    fn default() -> Self {
        Node::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_byte_roundtrip_is_orthogonal() {
        let kind = NodeKind {
            value: true,
            edge: false,
            metadata: true,
            empty_directory: false,
        };
        assert_eq!(kind.to_byte(), 0b0001_0010);
        assert_eq!(NodeKind::from_byte(kind.to_byte()), kind);
        assert_eq!(NodeKind::from_byte(0), NodeKind::default());
    }

    #[test]
    fn test_new_node_is_dirty_and_resolved() {
        let node = Node::new();
        assert!(node.is_resolved());
        assert!(node.is_dirty());
        assert_eq!(node.reference(), None);
        assert_eq!(node.obfuscation_key(), Some(&ZERO_OBFUSCATION_KEY));
    }

    #[test]
    fn test_stub_is_clean() {
        let reference = Reference::digest(b"record");
        let node = Node::from_reference(reference);
        assert!(!node.is_resolved());
        assert!(!node.is_dirty());
        assert_eq!(node.reference(), Some(reference));
        assert_eq!(node.sync_state(), None);
        assert!(!node.is_value());
        assert!(node.entry().is_empty());
    }

    #[test]
    fn test_obfuscation_key_is_padded() {
        let node = Node::with_obfuscation_key(&[0xAB; 4]);
        let key = node.obfuscation_key().unwrap();
        assert_eq!(&key[..4], &[0xAB; 4]);
        assert_eq!(&key[4..], &[0u8; 28]);
    }

    #[test]
    fn test_check_entry_size() {
        let mut body = Body::default();
        assert!(matches!(
            body.check_entry_size(257),
            Err(Error::EntryTooLarge(257))
        ));
        body.check_entry_size(0).unwrap();
        assert_eq!(body.ref_size, 0);
        body.check_entry_size(32).unwrap();
        assert_eq!(body.ref_size, 32);
        assert!(matches!(
            body.check_entry_size(64),
            Err(Error::SizeMismatch {
                expected: 32,
                found: 64
            })
        ));
        body.check_entry_size(0).unwrap();
    }

    #[test]
    fn test_graft_splits_long_labels_without_expanding() {
        let mut body = Body {
            ref_size: 32,
            ..Body::default()
        };
        let stub = Node::from_reference(Reference::digest(b"grandchild"));
        body.graft(vec![b'a'; 70], stub);

        let first = &body.forks[&b'a'];
        assert_eq!(first.prefix.len(), MAX_PREFIX_LEN);
        let second = &first.node.body().unwrap().forks[&b'a'];
        assert_eq!(second.prefix.len(), MAX_PREFIX_LEN);
        let last = &second.node.body().unwrap().forks[&b'a'];
        assert_eq!(last.prefix.len(), 10);
        assert!(!last.node.is_resolved());
        assert_eq!(second.node.ref_size(), 32);
    }

    #[test]
    fn test_value_copy_drops_forks_and_reference() {
        let mut parent = Body {
            kind: NodeKind {
                value: true,
                edge: true,
                ..NodeKind::default()
            },
            entry: vec![1; 32],
            ref_size: 32,
            ..Body::default()
        };
        parent
            .forks
            .insert(b'x', Fork::new(b"x".to_vec(), Node::new()));
        let mut node = Node::resolved(parent);
        node.mark_clean(Reference::digest(b"parent"));

        let copy = node.value_copy().unwrap();
        assert!(copy.is_value());
        assert!(!copy.is_edge());
        assert_eq!(copy.entry(), &[1; 32]);
        assert_eq!(copy.forks().count(), 0);
        assert!(copy.is_dirty());

        assert!(Node::new().value_copy().is_none());
    }
}
