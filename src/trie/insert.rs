//! Insertion: prefix splitting, placeholder replacement, and absorbing nodes

use super::node::{Body, Fork, Node, NodeState, MAX_METADATA_SIZE, MAX_PREFIX_LEN, ZERO_OBFUSCATION_KEY};
use super::path::{common_prefix_len, is_directory, is_zero_entry};
use crate::model::{Metadata, NodeEntry};
use crate::store::LoadSaver;
use crate::{Context, Error, Result};

impl Node {
    /// Store `entry` (and optional metadata) under `path`
    ///
    /// An all-zero entry is only accepted on a directory path (one ending in
    /// `/`), where it records an empty directory.
    pub fn add<S: LoadSaver + ?Sized>(
        &mut self,
        ctx: &Context,
        path: &[u8],
        entry: &[u8],
        metadata: Option<&Metadata>,
        store: &S,
    ) -> Result<()> {
        if path.is_empty() {
            return Err(Error::EmptyPath);
        }

        let mut body = Body {
            entry: entry.to_vec(),
            ..Body::default()
        };
        if is_zero_entry(entry) {
            if !is_directory(path) {
                return Err(Error::InvalidFile(format!(
                    "zero entry for non-directory path '{}'",
                    String::from_utf8_lossy(path)
                )));
            }
            body.kind.empty_directory = true;
        } else {
            body.kind.value = true;
        }

        if let Some(metadata) = metadata.filter(|m| !m.is_empty()) {
            let size = serde_json::to_vec(metadata)?.len();
            if size > MAX_METADATA_SIZE {
                return Err(Error::MetadataTooLarge {
                    size,
                    limit: MAX_METADATA_SIZE,
                });
            }
            body.metadata = metadata.clone();
            body.kind.metadata = true;
        }

        self.add_node(ctx, path, Node::resolved(body), store)
    }

    /// Insert a batch of entries in order, stopping at the first failure
    pub fn add_entries<S: LoadSaver + ?Sized>(
        &mut self,
        ctx: &Context,
        entries: &[NodeEntry],
        store: &S,
    ) -> Result<()> {
        for entry in entries {
            self.add(ctx, &entry.path, &entry.entry, Some(&entry.metadata), store)?;
        }
        tracing::debug!(count = entries.len(), "added entries");
        Ok(())
    }

    /// Insert `node` at `path` below this node
    pub(crate) fn add_node<S: LoadSaver + ?Sized>(
        &mut self,
        ctx: &Context,
        path: &[u8],
        mut node: Node,
        store: &S,
    ) -> Result<()> {
        ctx.check()?;
        let incoming = node.expand(ctx, store)?;
        let entry_size = incoming.entry.len().max(incoming.ref_size);

        let body = self.expand(ctx, store)?;
        body.check_entry_size(entry_size)?;

        if path.is_empty() {
            self.absorb(ctx, node, store)?;
            self.invalidate();
            return Ok(());
        }

        let key = path[0];
        if let Some(fork) = body.forks.get_mut(&key) {
            let matched = common_prefix_len(&fork.prefix, path);
            if matched < fork.prefix.len() {
                // split the edge at the common prefix
                let rest = fork.prefix.split_off(matched);
                let old = std::mem::take(&mut fork.node);
                let mut mid = Body {
                    ref_size: body.ref_size,
                    obfuscation_key: body.obfuscation_key,
                    ..Body::default()
                };
                mid.graft(rest, old);
                fork.node = Node::resolved(mid);
            }

            let suffix = &path[matched..];
            let child = fork.node.expand(ctx, store)?;
            if suffix.is_empty() || !child.is_placeholder() {
                fork.node.add_node(ctx, suffix, node, store)?;
                body.kind.edge = true;
                self.invalidate();
                return Ok(());
            }
            // a childless empty-directory placeholder gives way to the new path
            body.forks.remove(&key);
        }

        if path.len() > MAX_PREFIX_LEN {
            let mut mid = Node::intermediate(body.ref_size, body.obfuscation_key);
            mid.add_node(ctx, &path[MAX_PREFIX_LEN..], node, store)?;
            body.forks
                .insert(key, Fork::new(path[..MAX_PREFIX_LEN].to_vec(), mid));
        } else {
            node.inherit(body.ref_size, &body.obfuscation_key);
            body.forks.insert(key, Fork::new(path.to_vec(), node));
        }
        body.kind.edge = true;
        self.invalidate();
        Ok(())
    }

    /// Take over the entry, metadata, key and forks of `incoming`
    ///
    /// Forks are merged one by one when both nodes have children.
    fn absorb<S: LoadSaver + ?Sized>(
        &mut self,
        ctx: &Context,
        incoming: Node,
        store: &S,
    ) -> Result<()> {
        let source = match incoming.state {
            NodeState::Resolved { body, .. } => body,
            NodeState::Unresolved(reference) => {
                return Err(Error::Corruption(format!(
                    "cannot absorb unexpanded node {}",
                    reference.short()
                )))
            }
        };
        if incoming.index.is_some() {
            self.index = incoming.index;
        }

        let body = self.expand(ctx, store)?;
        if source.kind.value || source.kind.empty_directory {
            body.entry = source.entry;
            body.kind.value = source.kind.value;
            body.kind.empty_directory = source.kind.empty_directory;
        }
        if source.kind.metadata {
            body.metadata = source.metadata;
            body.kind.metadata = true;
        }
        if source.ref_size != 0 {
            body.ref_size = source.ref_size;
        }
        if source.obfuscation_key != ZERO_OBFUSCATION_KEY {
            body.obfuscation_key = source.obfuscation_key;
        }

        if source.forks.is_empty() {
            return Ok(());
        }
        body.kind.edge = true;
        if body.forks.is_empty() {
            body.forks = source.forks;
            return Ok(());
        }
        for fork in source.forks.into_values() {
            self.add_node(ctx, &fork.prefix, fork.node, store)?;
        }
        Ok(())
    }

    /// Adopt the entry size and key of a new parent where this node has none
    fn inherit(&mut self, ref_size: usize, obfuscation_key: &[u8; 32]) {
        let Some(body) = self.body_mut() else {
            return;
        };
        let mut changed = false;
        if body.ref_size == 0 && ref_size != 0 {
            body.ref_size = ref_size;
            if body.kind.empty_directory {
                body.entry = vec![0u8; ref_size];
            }
            changed = true;
        }
        if body.obfuscation_key == ZERO_OBFUSCATION_KEY && *obfuscation_key != ZERO_OBFUSCATION_KEY {
            body.obfuscation_key = *obfuscation_key;
            changed = true;
        }
        if changed {
            self.invalidate();
        }
    }
}
