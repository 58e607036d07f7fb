//! # pathtrie
//!
//! A prefix-compressed path trie persisted in a content-addressed store.
//!
//! pathtrie maps filesystem-like byte paths to fixed-size entries, typically
//! the references of content blobs, and keeps directory trees compact by
//! sharing path prefixes between edges. A trie can be saved into any store
//! implementing [`Loader`] and [`Saver`] and reopened from its root
//! reference; only the nodes an operation touches are ever read back, and
//! only the nodes it changes are written again.
//!
//! ## Core Concepts
//!
//! - **Nodes**: trie vertices, either expanded in memory or stubs holding the
//!   reference of their persisted record
//! - **Forks**: labelled edges; a label is a run of path bytes
//! - **Entries**: the fixed-size value stored at a complete path
//! - **Empty directories**: zero-entry markers for directories without files
//!
//! ## Example
//!
//! ```ignore
//! use pathtrie::{Context, Node, ObjectStore};
//!
//! let store = ObjectStore::open_or_create("site.ptrie")?;
//! let ctx = Context::new();
//! let mut root = Node::new();
//! root.add(&ctx, b"index.html", &reference_bytes, None, &store)?;
//! store.set_root("main", root.save(&ctx, &store)?);
//! store.sync()?;
//! ```

pub mod model;
pub mod store;
pub mod trie;

mod context;
mod error;

pub use context::Context;
pub use error::{Error, Result};
pub use model::{Metadata, NodeEntry, Reference};
pub use store::{LoadSaver, Loader, MemoryStore, ObjectStore, Saver};
pub use trie::{Fork, Found, Node, NodeKind, SyncState};

/// Store format version
pub const VERSION: u32 = 1;

/// Magic bytes for file identification
pub const MAGIC: &[u8; 8] = b"PATHTRIE";
