//! Content-addressed object storage
//!
//! The trie never talks to a concrete backend. It loads and saves opaque node
//! records through the [`Loader`] and [`Saver`] traits; anything that maps
//! bytes to a [`Reference`] and back can back a trie. Two backends ship with
//! the crate: [`ObjectStore`], a single file of zstd-compressed blobs, and
//! [`MemoryStore`].

mod blob;
mod file_store;
mod memory;

pub use blob::{Blob, BlobType};
pub use file_store::ObjectStore;
pub use memory::MemoryStore;

use crate::model::Reference;
use crate::{Context, Result};

/// Fetches persisted node records by reference
pub trait Loader {
    /// Load the record stored under `reference`.
    ///
    /// Fails with [`crate::Error::NotFound`] if the store has no such record.
    fn load(&self, ctx: &Context, reference: &Reference) -> Result<Vec<u8>>;
}

/// Persists node records, returning their content address
pub trait Saver {
    fn save(&self, ctx: &Context, data: &[u8]) -> Result<Reference>;
}

/// A store that can both expand stubs and persist modified nodes
///
/// Required by every mutation, since a mutation may have to expand a stub
/// before changing it.
pub trait LoadSaver: Loader + Saver {}
