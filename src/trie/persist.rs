//! Saving dirty subtrees and walking stored paths

use super::codec;
use super::node::{Node, NodeState, SyncState};
use crate::model::Reference;
use crate::store::{Loader, Saver};
use crate::{Context, Result};

impl Node {
    /// Persist every dirty node below and including this one
    ///
    /// Children are saved before their parents, since a record embeds the
    /// references of its children. Clean nodes and stubs are not rewritten.
    pub fn save<S: Saver + ?Sized>(&mut self, ctx: &Context, saver: &S) -> Result<Reference> {
        ctx.check()?;
        let body = match &mut self.state {
            NodeState::Unresolved(reference) => return Ok(*reference),
            NodeState::Resolved {
                sync: SyncState::Clean(reference),
                ..
            } => return Ok(*reference),
            NodeState::Resolved { body, .. } => body,
        };

        let children = body
            .forks
            .values_mut()
            .map(|fork| fork.node.save(ctx, saver))
            .collect::<Result<Vec<_>>>()?;
        let data = codec::encode(body, &children)?;
        let reference = saver.save(ctx, &data)?;

        tracing::trace!(
            reference = %reference.short(),
            forks = children.len(),
            size = data.len(),
            "saved node"
        );
        self.mark_clean(reference);
        Ok(reference)
    }

    /// Visit every node depth-first, in fork order, with its full path
    ///
    /// Stubs are expanded on the way; the root is visited with the empty path.
    pub fn walk<L, F>(&mut self, ctx: &Context, loader: &L, mut visit: F) -> Result<()>
    where
        L: Loader + ?Sized,
        F: FnMut(&[u8], &Node) -> Result<()>,
    {
        let mut path = Vec::new();
        self.walk_from(ctx, loader, &mut path, &mut visit)
    }

    fn walk_from<L, F>(
        &mut self,
        ctx: &Context,
        loader: &L,
        path: &mut Vec<u8>,
        visit: &mut F,
    ) -> Result<()>
    where
        L: Loader + ?Sized,
        F: FnMut(&[u8], &Node) -> Result<()>,
    {
        ctx.check()?;
        self.expand(ctx, loader)?;
        visit(path, self)?;

        let body = self.expand(ctx, loader)?;
        for fork in body.forks.values_mut() {
            let len = path.len();
            path.extend_from_slice(&fork.prefix);
            fork.node.walk_from(ctx, loader, path, visit)?;
            path.truncate(len);
        }
        Ok(())
    }

    /// All stored paths with their entries, in byte order
    ///
    /// Empty-directory markers are listed too, with their zero entry.
    pub fn entries<L: Loader + ?Sized>(
        &mut self,
        ctx: &Context,
        loader: &L,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut entries = Vec::new();
        self.walk(ctx, loader, |path, node| {
            if node.is_value() || node.is_empty_directory() {
                entries.push((path.to_vec(), node.entry().to_vec()));
            }
            Ok(())
        })?;
        Ok(entries)
    }
}
