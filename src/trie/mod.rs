//! Compressed path trie
//!
//! Byte paths map to fixed-size entries (usually content references). Edges
//! carry multi-byte labels so that chains of single-child nodes never exist,
//! and any subtree can be saved to a store and loaded back lazily: a node
//! that was not touched since it was saved stays a stub holding only its
//! reference, and is neither read nor rewritten.
//!
//! ```ignore
//! use pathtrie::{Context, MemoryStore, Node};
//!
//! let store = MemoryStore::new();
//! let ctx = Context::new();
//! let mut root = Node::new();
//! root.add(&ctx, b"img/logo.png", &[7u8; 32], None, &store)?;
//! let reference = root.save(&ctx, &store)?;
//!
//! let mut reloaded = Node::from_reference(reference);
//! assert_eq!(reloaded.lookup(&ctx, b"img/logo.png", &store)?, vec![7u8; 32]);
//! ```

mod codec;
mod insert;
mod node;
pub mod path;
mod persist;
mod relocate;
mod remove;
mod resolve;

pub use codec::RECORD_VERSION;
pub use node::{
    Fork, Node, NodeKind, ObfuscationKey, SyncState, MAX_ENTRY_SIZE, MAX_METADATA_SIZE,
    MAX_PREFIX_LEN, OBFUSCATION_KEY_SIZE, ZERO_OBFUSCATION_KEY,
};
pub use path::PATH_SEPARATOR;
pub use resolve::Found;
