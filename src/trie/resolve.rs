//! Path resolution: exact lookup, prefix tests, and closest matches

use super::node::Node;
use super::path::{common_prefix_len, is_directory};
use crate::store::Loader;
use crate::{Context, Error, Result};

/// A node reached by a lookup
#[derive(Debug)]
pub struct Found<'a> {
    pub node: &'a Node,
    /// Index of the deepest node on the traversed path that carries one
    pub index: Option<u64>,
}

impl Node {
    /// Find the node for a path, expanding stubs on the way
    ///
    /// The path must end exactly at a node boundary; a path that stops or
    /// diverges inside an edge label is not found.
    pub fn lookup_node<L: Loader + ?Sized>(
        &mut self,
        ctx: &Context,
        path: &[u8],
        loader: &L,
    ) -> Result<Found<'_>> {
        self.resolve(ctx, path, 0, loader, None)
    }

    fn resolve<L: Loader + ?Sized>(
        &mut self,
        ctx: &Context,
        full: &[u8],
        at: usize,
        loader: &L,
        inherited: Option<u64>,
    ) -> Result<Found<'_>> {
        ctx.check()?;
        let index = self.index.or(inherited);
        let path = &full[at..];
        if path.is_empty() {
            self.expand(ctx, loader)?;
            return Ok(Found { node: self, index });
        }
        let body = self.expand(ctx, loader)?;
        let fork = body
            .forks
            .get_mut(&path[0])
            .ok_or_else(|| Error::path_not_found(full))?;
        let matched = common_prefix_len(&fork.prefix, path);
        if matched == fork.prefix.len() {
            return fork.node.resolve(ctx, full, at + matched, loader, index);
        }
        Err(Error::path_not_found(full))
    }

    /// Find the entry for a path
    ///
    /// The empty path yields the root's own entry.
    pub fn lookup<L: Loader + ?Sized>(
        &mut self,
        ctx: &Context,
        path: &[u8],
        loader: &L,
    ) -> Result<Vec<u8>> {
        let found = self.lookup_node(ctx, path, loader)?;
        if !found.node.is_value() && !path.is_empty() {
            return Err(Error::path_not_found(path));
        }
        Ok(found.node.entry().to_vec())
    }

    /// Test whether any stored path starts with `path`
    ///
    /// The empty prefix holds exactly when the trie stores anything.
    pub fn has_prefix<L: Loader + ?Sized>(
        &mut self,
        ctx: &Context,
        path: &[u8],
        loader: &L,
    ) -> Result<bool> {
        if path.is_empty() {
            ctx.check()?;
            return Ok(!self.expand(ctx, loader)?.forks.is_empty());
        }
        self.prefix_below(ctx, path, loader)
    }

    fn prefix_below<L: Loader + ?Sized>(
        &mut self,
        ctx: &Context,
        path: &[u8],
        loader: &L,
    ) -> Result<bool> {
        ctx.check()?;
        let body = self.expand(ctx, loader)?;
        // some stored path runs through or ends at this node
        if path.is_empty() {
            return Ok(true);
        }
        let Some(fork) = body.forks.get_mut(&path[0]) else {
            return Ok(false);
        };
        let matched = common_prefix_len(&fork.prefix, path);
        if matched == fork.prefix.len() {
            return fork.node.prefix_below(ctx, &path[matched..], loader);
        }
        // the prefix ends inside a label that was never split
        Ok(fork.prefix.starts_with(path))
    }

    /// Like [`Node::lookup_node`], but a directory path that ends inside an
    /// edge label also matches
    ///
    /// Returns the node reached and the part of the label left unmatched,
    /// which is empty unless the path stopped inside an edge. The returned
    /// node is not expanded in that case.
    pub(crate) fn closest<L: Loader + ?Sized>(
        &mut self,
        ctx: &Context,
        path: &[u8],
        loader: &L,
    ) -> Result<(&Node, Vec<u8>)> {
        self.closest_below(ctx, path, 0, loader)
    }

    fn closest_below<L: Loader + ?Sized>(
        &mut self,
        ctx: &Context,
        full: &[u8],
        at: usize,
        loader: &L,
    ) -> Result<(&Node, Vec<u8>)> {
        ctx.check()?;
        let path = &full[at..];
        if path.is_empty() {
            self.expand(ctx, loader)?;
            return Ok((self, Vec::new()));
        }
        let body = self.expand(ctx, loader)?;
        let fork = body
            .forks
            .get_mut(&path[0])
            .ok_or_else(|| Error::path_not_found(full))?;
        let matched = common_prefix_len(&fork.prefix, path);
        if matched == fork.prefix.len() {
            return fork.node.closest_below(ctx, full, at + matched, loader);
        }
        if matched == path.len() && is_directory(path) {
            return Ok((&fork.node, fork.prefix[matched..].to_vec()));
        }
        Err(Error::path_not_found(full))
    }
}
