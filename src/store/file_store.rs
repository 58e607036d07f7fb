//! Single-file object store with content-addressed storage
//!
//! File format:
//! ```text
//! [HEADER: 64 bytes]
//!   - magic: 8 bytes ("PATHTRIE")
//!   - version: 4 bytes (u32 LE)
//!   - flags: 4 bytes
//!   - object_count: 8 bytes (u64 LE)
//!   - index_offset: 8 bytes (u64 LE)
//!   - roots_offset: 8 bytes (u64 LE)
//!   - roots_count: 8 bytes (u64 LE)
//!   - reserved: 16 bytes
//!
//! [OBJECTS: variable]
//!   - blob data, concatenated
//!
//! [INDEX: variable]
//!   - sorted array of (reference, offset, size) entries
//!
//! [ROOTS: variable]
//!   - root names → trie root references
//! ```

use super::{Blob, BlobType, LoadSaver, Loader, Saver};
use crate::model::Reference;
use crate::{Context, Error, Result, MAGIC, VERSION};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

const HEADER_SIZE: u64 = 64;

/// Each index entry: 32 (reference) + 8 (offset) + 4 (size) bytes
const INDEX_ENTRY_SIZE: usize = 44;

/// Index entry for an object
#[derive(Clone, Debug)]
struct IndexEntry {
    offset: u64,
    size: u32,
}

/// A content-addressed object store backed by a single file
///
/// Besides blobs, the store keeps a small table of named roots so a trie can
/// be found again after the process exits.
pub struct ObjectStore {
    /// Path to the store file
    path: std::path::PathBuf,
    /// The file handle
    file: RwLock<File>,
    /// In-memory index
    index: RwLock<HashMap<Reference, IndexEntry>>,
    /// Named trie roots
    roots: RwLock<HashMap<String, Reference>>,
    /// Current append position
    write_offset: RwLock<u64>,
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(buf)
}

fn le_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}

impl ObjectStore {
    /// Create a new store file, truncating any existing one
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        let mut header = [0u8; HEADER_SIZE as usize];
        header[0..8].copy_from_slice(MAGIC);
        header[8..12].copy_from_slice(&VERSION.to_le_bytes());
        file.write_all(&header)?;
        file.sync_all()?;

        tracing::debug!(path = %path.display(), "created object store");

        Ok(ObjectStore {
            path,
            file: RwLock::new(file),
            index: RwLock::new(HashMap::new()),
            roots: RwLock::new(HashMap::new()),
            write_offset: RwLock::new(HEADER_SIZE),
        })
    }

    /// Open an existing store file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;

        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;

        if &header[0..8] != MAGIC {
            return Err(Error::InvalidStore("Invalid magic bytes".into()));
        }

        let version = le_u32(&header, 8);
        if version != VERSION {
            return Err(Error::VersionMismatch {
                expected: VERSION,
                found: version,
            });
        }

        let object_count = le_u64(&header, 16);
        let index_offset = le_u64(&header, 24);
        let roots_offset = le_u64(&header, 32);
        let roots_count = le_u64(&header, 40);

        let mut index = HashMap::new();
        if index_offset > 0 && object_count > 0 {
            file.seek(SeekFrom::Start(index_offset))?;
            for _ in 0..object_count {
                let mut entry_buf = [0u8; INDEX_ENTRY_SIZE];
                file.read_exact(&mut entry_buf)?;

                let mut ref_bytes = [0u8; 32];
                ref_bytes.copy_from_slice(&entry_buf[0..32]);
                let reference = Reference::from_bytes(ref_bytes);

                let offset = le_u64(&entry_buf, 32);
                let size = le_u32(&entry_buf, 40);

                index.insert(reference, IndexEntry { offset, size });
            }
        }

        let mut roots = HashMap::new();
        if roots_offset > 0 && roots_count > 0 {
            file.seek(SeekFrom::Start(roots_offset))?;
            for _ in 0..roots_count {
                let mut len_buf = [0u8; 2];
                file.read_exact(&mut len_buf)?;
                let name_len = u16::from_le_bytes(len_buf) as usize;

                let mut name_buf = vec![0u8; name_len];
                file.read_exact(&mut name_buf)?;
                let name = String::from_utf8_lossy(&name_buf).to_string();

                let mut ref_buf = [0u8; 32];
                file.read_exact(&mut ref_buf)?;

                roots.insert(name, Reference::from_bytes(ref_buf));
            }
        }

        // Objects end where the index begins
        let write_offset = if index_offset > 0 {
            index_offset
        } else {
            file.seek(SeekFrom::End(0))?
        };

        tracing::debug!(
            path = %path.display(),
            objects = index.len(),
            roots = roots.len(),
            "opened object store"
        );

        Ok(ObjectStore {
            path,
            file: RwLock::new(file),
            index: RwLock::new(index),
            roots: RwLock::new(roots),
            write_offset: RwLock::new(write_offset),
        })
    }

    /// Open or create a store file
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Store a blob, returns its reference
    pub fn put(&self, blob: &Blob) -> Result<Reference> {
        let reference = blob.reference();

        if self.index.read().contains_key(&reference) {
            return Ok(reference);
        }

        let compressed = blob.compress()?;
        let size = compressed.len() as u32;

        let offset = {
            let mut write_offset = self.write_offset.write();
            let offset = *write_offset;

            let mut file = self.file.write();
            file.seek(SeekFrom::Start(offset))?;
            file.write_all(&compressed)?;

            *write_offset = offset + size as u64;
            offset
        };

        self.index
            .write()
            .insert(reference, IndexEntry { offset, size });

        tracing::trace!(reference = %reference.short(), blob_type = ?blob.blob_type, size, "wrote blob");
        Ok(reference)
    }

    /// Retrieve a blob by reference
    pub fn get(&self, reference: &Reference) -> Result<Blob> {
        let entry = self.index.read().get(reference).cloned();
        let entry = entry.ok_or_else(|| Error::NotFound(reference.to_hex()))?;

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(entry.offset))?;

        let mut data = vec![0u8; entry.size as usize];
        file.read_exact(&mut data)?;

        Blob::decompress(&data)
    }

    /// Check if a reference exists
    pub fn contains(&self, reference: &Reference) -> bool {
        self.index.read().contains_key(reference)
    }

    /// Store raw file content and return its reference
    pub fn put_content(&self, data: &[u8]) -> Result<Reference> {
        self.put(&Blob::new(BlobType::Content, data.to_vec()))
    }

    /// Retrieve raw file content by reference
    pub fn get_content(&self, reference: &Reference) -> Result<Vec<u8>> {
        self.get(reference)?.into_data(BlobType::Content)
    }

    // === Root Management ===

    /// Get the trie root stored under a name
    pub fn get_root(&self, name: &str) -> Option<Reference> {
        self.roots.read().get(name).copied()
    }

    /// Point a name at a trie root
    pub fn set_root(&self, name: &str, reference: Reference) {
        self.roots.write().insert(name.to_string(), reference);
    }

    /// Forget a named root; the blobs it points to stay in the file
    pub fn delete_root(&self, name: &str) -> Result<Reference> {
        self.roots
            .write()
            .remove(name)
            .ok_or_else(|| Error::NotFound(format!("root '{}'", name)))
    }

    /// List all named roots, sorted by name
    pub fn list_roots(&self) -> Vec<(String, Reference)> {
        let mut roots: Vec<_> = self
            .roots
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        roots.sort();
        roots
    }

    /// Get the number of objects in the store
    pub fn object_count(&self) -> usize {
        self.index.read().len()
    }

    /// Flush changes and write index and roots to disk
    pub fn sync(&self) -> Result<()> {
        let index = self.index.read();
        let roots = self.roots.read();
        let write_offset = *self.write_offset.read();
        let mut file = self.file.write();

        let index_size = index.len() * INDEX_ENTRY_SIZE;
        let roots_offset = write_offset + index_size as u64;

        file.seek(SeekFrom::Start(16))?;
        file.write_all(&(index.len() as u64).to_le_bytes())?;
        file.write_all(&write_offset.to_le_bytes())?;
        file.write_all(&roots_offset.to_le_bytes())?;
        file.write_all(&(roots.len() as u64).to_le_bytes())?;

        file.seek(SeekFrom::Start(write_offset))?;

        // Sort by reference for determinism
        let mut entries: Vec<_> = index.iter().collect();
        entries.sort_by_key(|(r, _)| r.as_bytes());

        for (reference, entry) in entries {
            file.write_all(reference.as_bytes())?;
            file.write_all(&entry.offset.to_le_bytes())?;
            file.write_all(&entry.size.to_le_bytes())?;
        }

        // Format: for each root: name_len (u16) + name + reference (32 bytes)
        let mut root_list: Vec<_> = roots.iter().collect();
        root_list.sort_by_key(|(name, _)| *name);

        for (name, reference) in root_list {
            let name_bytes = name.as_bytes();
            file.write_all(&(name_bytes.len() as u16).to_le_bytes())?;
            file.write_all(name_bytes)?;
            file.write_all(reference.as_bytes())?;
        }

        let end = file.stream_position()?;
        file.set_len(end)?;
        file.sync_all()?;

        tracing::debug!(objects = index.len(), roots = roots.len(), "synced object store");
        Ok(())
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Loader for ObjectStore {
    fn load(&self, ctx: &Context, reference: &Reference) -> Result<Vec<u8>> {
        ctx.check()?;
        self.get(reference)?.into_data(BlobType::Node)
    }
}

impl Saver for ObjectStore {
    fn save(&self, ctx: &Context, data: &[u8]) -> Result<Reference> {
        ctx.check()?;
        self.put(&Blob::new(BlobType::Node, data.to_vec()))
    }
}

impl LoadSaver for ObjectStore {}

impl Drop for ObjectStore {
    fn drop(&mut self) {
        // Best-effort sync on drop
        let _ = self.sync();
    }
}
