//! In-memory content-addressed store

use super::{Blob, BlobType, LoadSaver, Loader, Saver};
use crate::model::Reference;
use crate::{Context, Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A store that keeps blobs in a hash map
///
/// Counts loads and saves so callers can observe how much of a tree an
/// operation actually touched.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RwLock<HashMap<Reference, Blob>>,
    loads: AtomicUsize,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Store a blob, returns its reference
    pub fn put(&self, blob: Blob) -> Reference {
        let reference = blob.reference();
        self.blobs.write().entry(reference).or_insert(blob);
        reference
    }

    /// Retrieve a blob by reference
    pub fn get(&self, reference: &Reference) -> Result<Blob> {
        self.blobs
            .read()
            .get(reference)
            .cloned()
            .ok_or_else(|| Error::NotFound(reference.to_hex()))
    }

    /// Number of distinct blobs held
    pub fn object_count(&self) -> usize {
        self.blobs.read().len()
    }

    /// Number of node records loaded so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    /// Number of node records saved so far (including duplicates)
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

impl Loader for MemoryStore {
    fn load(&self, ctx: &Context, reference: &Reference) -> Result<Vec<u8>> {
        ctx.check()?;
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.get(reference)?.into_data(BlobType::Node)
    }
}

impl Saver for MemoryStore {
    fn save(&self, ctx: &Context, data: &[u8]) -> Result<Reference> {
        ctx.check()?;
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(self.put(Blob::new(BlobType::Node, data.to_vec())))
    }
}

impl LoadSaver for MemoryStore {}
