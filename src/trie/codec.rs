//! Node record encoding
//!
//! A record holds one node: its kind byte, entry size, obfuscation key,
//! entry (XORed with the key, present only for value nodes), metadata (only
//! when flagged), and the fork table. Forks carry the key byte, an edge flag
//! byte, the label, and the reference of the child's own record; children are
//! decoded as stubs.

use super::node::{Body, Fork, Node, NodeKind, ObfuscationKey, MAX_ENTRY_SIZE};
use crate::model::{Metadata, Reference};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Version byte leading every record
pub const RECORD_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct NodeRecord {
    version: u8,
    kind: u8,
    ref_size: u16,
    obfuscation_key: ObfuscationKey,
    entry: Option<Vec<u8>>,
    metadata: Option<Metadata>,
    forks: Vec<ForkRecord>,
}

#[derive(Serialize, Deserialize)]
struct ForkRecord {
    key: u8,
    flags: u8,
    prefix: Vec<u8>,
    child: Reference,
}

fn obfuscate(data: &[u8], key: &ObfuscationKey) -> Vec<u8> {
    data.iter()
        .zip(key.iter().cycle())
        .map(|(byte, k)| byte ^ k)
        .collect()
}

/// Encode a node body; `children` holds the reference of each fork's child,
/// in fork order
pub(crate) fn encode(body: &Body, children: &[Reference]) -> Result<Vec<u8>> {
    if children.len() != body.forks.len() {
        return Err(Error::Corruption(format!(
            "{} child references for {} forks",
            children.len(),
            body.forks.len()
        )));
    }

    let forks = body
        .forks
        .iter()
        .zip(children)
        .map(|((&key, fork), &child)| ForkRecord {
            key,
            flags: if fork.has_path_separator() {
                NodeKind::PATH_SEPARATOR
            } else {
                0
            },
            prefix: fork.prefix.clone(),
            child,
        })
        .collect();

    let record = NodeRecord {
        version: RECORD_VERSION,
        kind: body.kind.to_byte(),
        ref_size: body.ref_size as u16,
        obfuscation_key: body.obfuscation_key,
        entry: body
            .kind
            .value
            .then(|| obfuscate(&body.entry, &body.obfuscation_key)),
        metadata: body.kind.metadata.then(|| body.metadata.clone()),
        forks,
    };

    Ok(bincode::serialize(&record)?)
}

/// Decode a record into an expanded body whose children are stubs
pub(crate) fn decode(data: &[u8]) -> Result<Body> {
    let record: NodeRecord = bincode::deserialize(data)?;

    if record.version != RECORD_VERSION {
        return Err(Error::VersionMismatch {
            expected: RECORD_VERSION as u32,
            found: record.version as u32,
        });
    }

    let ref_size = record.ref_size as usize;
    if ref_size > MAX_ENTRY_SIZE {
        return Err(Error::Corruption(format!("entry size {} in record", ref_size)));
    }

    let kind = NodeKind::from_byte(record.kind);
    let entry = match record.entry {
        Some(entry) if kind.value => {
            if entry.len() != ref_size {
                return Err(Error::Corruption(format!(
                    "entry of {} bytes in record with entry size {}",
                    entry.len(),
                    ref_size
                )));
            }
            obfuscate(&entry, &record.obfuscation_key)
        }
        _ if kind.empty_directory => vec![0u8; ref_size],
        _ => Vec::new(),
    };

    let mut body = Body {
        kind,
        ref_size,
        obfuscation_key: record.obfuscation_key,
        entry,
        metadata: record.metadata.unwrap_or_default(),
        ..Body::default()
    };

    for fork in record.forks {
        if fork.prefix.first() != Some(&fork.key) {
            return Err(Error::Corruption(format!(
                "fork key {:#04x} does not start its label",
                fork.key
            )));
        }
        let stub = Node::from_reference(fork.child);
        body.forks.insert(fork.key, Fork::new(fork.prefix, stub));
    }

    Ok(body)
}
