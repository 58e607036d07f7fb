//! Removal: deleting entries, keeping directory placeholders, and merging
//! the chains a removal leaves behind

use super::node::{Body, Fork, Node, ObfuscationKey};
use super::path::{common_prefix_len, directory_len, is_directory};
use crate::store::LoadSaver;
use crate::{Context, Error, Result};

/// What the parent does with a fork after removing below it
enum Outcome {
    Keep,
    Delete,
}

impl Node {
    /// Remove the entry at `path`
    ///
    /// A directory path removes everything beneath it. Removing the last file
    /// of a directory leaves an empty-directory placeholder behind. A path
    /// that stops inside an edge label must end in `/` or be a prefix of the
    /// label; the label is cut there and marked as an empty directory.
    pub fn remove<S: LoadSaver + ?Sized>(
        &mut self,
        ctx: &Context,
        path: &[u8],
        store: &S,
    ) -> Result<()> {
        ctx.check()?;
        if path.is_empty() {
            return Err(Error::EmptyPath);
        }
        self.remove_below(ctx, path, 0, false, store)
    }

    /// Remove `path` together with everything stored below it, even when it
    /// names a file
    pub(crate) fn prune<S: LoadSaver + ?Sized>(
        &mut self,
        ctx: &Context,
        path: &[u8],
        store: &S,
    ) -> Result<()> {
        ctx.check()?;
        if path.is_empty() {
            return Err(Error::EmptyPath);
        }
        self.remove_below(ctx, path, 0, true, store)
    }

    /// `full[at..]` is the part of the path below this node
    fn remove_below<S: LoadSaver + ?Sized>(
        &mut self,
        ctx: &Context,
        full: &[u8],
        at: usize,
        subtree: bool,
        store: &S,
    ) -> Result<()> {
        ctx.check()?;
        let path = &full[at..];
        let body = self.expand(ctx, store)?;
        let key = path[0];
        let (ref_size, obfuscation_key) = (body.ref_size, body.obfuscation_key);
        let fork = body
            .forks
            .get_mut(&key)
            .ok_or_else(|| Error::path_not_found(full))?;

        let outcome = if path.len() < fork.prefix.len() {
            truncate_label(fork, full, at, ref_size, obfuscation_key)?
        } else if !path.starts_with(&fork.prefix) {
            return Err(Error::path_not_found(full));
        } else if path.len() == fork.prefix.len() {
            remove_exact(ctx, fork, full, subtree, store)?
        } else {
            let next = at + fork.prefix.len();
            fork.node.remove_below(ctx, full, next, subtree, store)?;
            Outcome::Keep
        };

        match outcome {
            Outcome::Delete => {
                body.forks.remove(&key);
            }
            Outcome::Keep => tidy(body, key),
        }
        body.kind.edge = !body.forks.is_empty();
        self.invalidate();
        Ok(())
    }
}

/// The path ends exactly where the fork's label does
fn remove_exact<S: LoadSaver + ?Sized>(
    ctx: &Context,
    fork: &mut Fork,
    full: &[u8],
    subtree: bool,
    store: &S,
) -> Result<Outcome> {
    let directory = is_directory(full);
    let flavored = fork.is_directory_flavored();
    let child = fork.node.expand(ctx, store)?;

    if !directory && !subtree && !child.forks.is_empty() {
        // files stored below a file name stay where they are
        if child.kind.value || child.kind.empty_directory {
            child.clear_value();
            child.kind.empty_directory = false;
            fork.node.invalidate();
            return Ok(Outcome::Keep);
        }
        if !flavored {
            return Err(Error::path_not_found(full));
        }
    }
    if !flavored {
        return Ok(Outcome::Delete);
    }

    let len = directory_len(&fork.prefix);
    fork.prefix.truncate(len);
    child.make_empty_directory();
    fork.node.invalidate();
    Ok(Outcome::Keep)
}

/// The path ends inside the fork's label
///
/// A path that is a prefix of the label drops the label's remainder and
/// everything below it. A directory path that leaves the label early keeps
/// the remainder below the new placeholder, since nothing stored lies under
/// that path.
fn truncate_label(
    fork: &mut Fork,
    full: &[u8],
    at: usize,
    ref_size: usize,
    obfuscation_key: ObfuscationKey,
) -> Result<Outcome> {
    let path = &full[at..];
    let matched = common_prefix_len(&fork.prefix, path);
    if matched < path.len() && !is_directory(path) {
        return Err(Error::path_not_found(full));
    }

    let mut marker = Node::empty_directory(ref_size, obfuscation_key);
    if matched < path.len() {
        let rest = fork.prefix.split_off(matched);
        let old = std::mem::take(&mut fork.node);
        if let Some(body) = marker.body_mut() {
            body.graft(rest, old);
        }
    } else {
        fork.prefix.truncate(matched);
    }
    fork.node = marker;
    Ok(Outcome::Keep)
}

/// Prune an emptied child, or merge a child left with a single fork into
/// its grandchild
///
/// An emptied child behind a label with a separator becomes the placeholder
/// of its directory, however many intermediates the removed name spanned.
fn tidy(body: &mut Body, key: u8) {
    let Some(fork) = body.forks.get_mut(&key) else {
        return;
    };
    let flavored = fork.is_directory_flavored();
    let Some(child) = fork.node.body_mut() else {
        return;
    };
    let holds = child.kind.value || child.kind.metadata || child.kind.empty_directory;
    if child.forks.is_empty() && !holds {
        if flavored {
            child.make_empty_directory();
            let len = directory_len(&fork.prefix);
            fork.prefix.truncate(len);
            fork.node.invalidate();
        } else {
            body.forks.remove(&key);
        }
        return;
    }
    if child.forks.len() != 1 || holds {
        return;
    }

    let Some(mut fork) = body.forks.remove(&key) else {
        return;
    };
    if let Some((_, grandchild)) = fork.node.body_mut().and_then(|b| b.forks.pop_first()) {
        fork.prefix.extend_from_slice(&grandchild.prefix);
        body.graft(fork.prefix, grandchild.node);
    }
}
