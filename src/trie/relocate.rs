//! Moving and copying entries, within one trie or between two

use super::node::Node;
use super::path::{is_directory, last_segment};
use crate::store::LoadSaver;
use crate::{Context, Error, Result};

impl Node {
    /// Move `path` to `new_path` within this trie
    ///
    /// A directory source (ending in `/`) takes everything beneath it along.
    /// When `new_path` is a directory the source keeps its name below it.
    /// Without `create` the destination must already exist.
    pub fn move_entry<S: LoadSaver + ?Sized>(
        &mut self,
        ctx: &Context,
        path: &[u8],
        new_path: &[u8],
        create: bool,
        store: &S,
    ) -> Result<()> {
        self.relocate(ctx, None, path, new_path, create, false, store)
    }

    /// Like [`Node::move_entry`], but the source stays in place
    pub fn copy_entry<S: LoadSaver + ?Sized>(
        &mut self,
        ctx: &Context,
        path: &[u8],
        new_path: &[u8],
        create: bool,
        store: &S,
    ) -> Result<()> {
        self.relocate(ctx, None, path, new_path, create, true, store)
    }

    /// Move `path` out of this trie into `target` at `new_path`
    pub fn move_to<S: LoadSaver + ?Sized>(
        &mut self,
        ctx: &Context,
        target: &mut Node,
        path: &[u8],
        new_path: &[u8],
        create: bool,
        store: &S,
    ) -> Result<()> {
        self.relocate(ctx, Some(target), path, new_path, create, false, store)
    }

    pub fn copy_to<S: LoadSaver + ?Sized>(
        &mut self,
        ctx: &Context,
        target: &mut Node,
        path: &[u8],
        new_path: &[u8],
        create: bool,
        store: &S,
    ) -> Result<()> {
        self.relocate(ctx, Some(target), path, new_path, create, true, store)
    }

    /// `target` of `None` means this trie itself
    #[allow(clippy::too_many_arguments)]
    fn relocate<S: LoadSaver + ?Sized>(
        &mut self,
        ctx: &Context,
        target: Option<&mut Node>,
        path: &[u8],
        new_path: &[u8],
        create: bool,
        keep_origin: bool,
        store: &S,
    ) -> Result<()> {
        ctx.check()?;
        if path.is_empty() || new_path.is_empty() {
            return Err(Error::EmptyPath);
        }

        let source_dir = is_directory(path);
        let target_dir = is_directory(new_path);
        if source_dir && !target_dir {
            return Err(Error::ForbiddenAction(format!(
                "cannot move directory '{}' onto file '{}'",
                String::from_utf8_lossy(path),
                String::from_utf8_lossy(new_path)
            )));
        }
        if target.is_none() && new_path.starts_with(path) && (source_dir || new_path == path) {
            return Err(Error::ForbiddenAction(format!(
                "cannot move '{}' into itself",
                String::from_utf8_lossy(path)
            )));
        }

        let (mut source, remainder, tail) = {
            let (node, remainder) = self.closest(ctx, path, store)?;
            if source_dir {
                (node.clone(), remainder.clone(), remainder)
            } else {
                let copy = node
                    .value_copy()
                    .ok_or_else(|| Error::path_not_found(path))?;
                (copy, Vec::new(), last_segment(path).to_vec())
            }
        };

        let target_path = if target_dir {
            [new_path, &tail[..]].concat()
        } else {
            new_path.to_vec()
        };
        if target.is_none() && target_path == path {
            // already in place
            return Ok(());
        }

        {
            let target = match target {
                Some(target) => target,
                None => &mut *self,
            };
            if !create {
                target.closest(ctx, new_path, store)?;
            }

            source.expand(ctx, store)?;
            let own_value = source.value_copy();
            let forks = std::mem::take(&mut source.expand(ctx, store)?.forks);
            if forks.is_empty() {
                target.add_node(ctx, &target_path, source, store)?;
            } else {
                // an entry stored where the label ends moves along with its children
                if let Some(value) = own_value {
                    target.add_node(ctx, &target_path, value, store)?;
                }
                for fork in forks.into_values() {
                    let child_path = [&target_path[..], &fork.prefix[..]].concat();
                    target.add_node(ctx, &child_path, fork.node, store)?;
                }
            }
        }

        if !keep_origin {
            if source_dir {
                self.prune(ctx, &[path, &remainder[..]].concat(), store)?;
            } else {
                self.remove(ctx, path, store)?;
            }
        }

        tracing::debug!(
            from = %String::from_utf8_lossy(path),
            to = %String::from_utf8_lossy(&target_path),
            keep_origin,
            "relocated entry"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn entry_for(path: &[u8]) -> Vec<u8> {
        let mut entry = vec![0u8; 32 - path.len()];
        entry.extend_from_slice(path);
        entry
    }

    fn tree(paths: &[&str], store: &MemoryStore) -> Node {
        let ctx = Context::new();
        let mut root = Node::new();
        for path in paths {
            root.add(&ctx, path.as_bytes(), &entry_for(path.as_bytes()), None, store)
                .unwrap();
        }
        root
    }

    /// Move within one trie, then check what must and must not resolve
    fn check_move(paths: &[&str], from: &str, to: &str, expected: &[&str], unwanted: &[&str]) {
        let store = MemoryStore::new();
        let ctx = Context::new();
        let mut root = tree(paths, &store);

        root.move_entry(&ctx, from.as_bytes(), to.as_bytes(), true, &store)
            .unwrap();

        for path in expected {
            assert!(
                root.lookup_node(&ctx, path.as_bytes(), &store).is_ok(),
                "{} should resolve after moving {} to {}",
                path,
                from,
                to
            );
        }
        for path in unwanted {
            let err = root.lookup(&ctx, path.as_bytes(), &store).unwrap_err();
            assert!(err.is_not_found(), "{} should be gone, got {}", path, err);
        }
    }

    #[test]
    fn test_move_directory_ending_inside_label() {
        check_move(
            &[
                "index.html",
                "img/test/oho.png",
                "img/test/old/test.png",
                "img/test/olds/person.jpg",
                "img/test/ow/secret/.empty",
                "src/logo.gif",
                "src/default/check.jpg",
                "src/defaults/1/apple.png",
                "src/defaults/1/apple.png.bak",
            ],
            "img/",
            "src/",
            &[
                "index.html",
                "src/test/oho.png",
                "src/test/old/test.png",
                "src/test/olds/person.jpg",
                "src/test/ow/secret/.empty",
                "src/logo.gif",
                "src/default/check.jpg",
                "src/defaults/1/apple.png",
                "src/defaults/1/apple.png.bak",
            ],
            &[
                "img/test/oho.png",
                "img/test/old/test.png",
                "img/test/olds/person.jpg",
            ],
        );
    }

    #[test]
    fn test_move_file_into_directory() {
        check_move(
            &[
                "robots.txt",
                "robots.tx1",
                "robot/baidu.com",
                "robot/google/robots.txt",
                "robot/baidu/robots.txt",
                "src/logo.gif",
                "src/default/check.jpg",
                "src/defaults/1/apple.png",
                "src/defaults/1/apple.png.bak",
            ],
            "robots.txt",
            "src/defaults/",
            &[
                "robots.tx1",
                "src/defaults/robots.txt",
                "robot/baidu.com",
                "robot/google/robots.txt",
                "robot/baidu/robots.txt",
                "src/defaults/1/apple.png",
                "src/defaults/1/apple.png.bak",
            ],
            &["robots.txt"],
        );
    }

    #[test]
    fn test_move_directory_leaves_sibling_file() {
        check_move(
            &[
                "img/apple.png",
                "img/apple/1x/1x.png",
                "img/apple/2x/1x.png",
                "src/logo.gif",
                "src/default/check.jpg",
                "src/defaults/1/apple.png",
                "src/defaults/1/apple.png.bak",
            ],
            "img/apple/",
            "src/defaults/",
            &[
                "src/defaults/1x/1x.png",
                "src/defaults/2x/1x.png",
                "img/apple.png",
                "src/logo.gif",
                "src/defaults/1/apple.png",
            ],
            &["img/apple/1x/1x.png", "img/apple/2x/1x.png"],
        );
    }

    #[test]
    fn test_move_directory_to_similarly_named_sibling() {
        check_move(
            &[
                "dir/aufs/app_new",
                "dir/aufs.old/app",
                "dir/aux",
                "dir/video.tar",
                "dir/video/",
                "dir/video/file",
            ],
            "dir/aufs/",
            "dir/aufs.old/",
            &[
                "dir/aufs.old/app_new",
                "dir/aufs.old/app",
                "dir/aux",
                "dir/video.tar",
                "dir/video/file",
            ],
            &["dir/aufs/app_new"],
        );
    }

    #[test]
    fn test_move_directory_into_existing_directory() {
        check_move(
            &[
                "dir1/dx.txt",
                "dir1/dx1.txt",
                "dir1/di/a/b/x.txt",
                "dir1/di/a/b/x/cv.txt",
                "dir1/di/a/caaa.txt",
                "dir1/di/a/c/aaa.txt",
                "dir1/di/ab/c.txt",
                "dir2/abc/de.txt",
                "dir2/abc/de1.txt",
                "dir2/abc/de/1.txt",
                "dir2/abc/de/mm/n.txt",
                "dir2/abcde/1.txt",
                "dir3/1.txt",
                "dir3/12.txt",
            ],
            "dir1/di/a/",
            "dir2/abc/de/",
            &[
                "dir2/abc/de/b/x.txt",
                "dir2/abc/de/b/x/cv.txt",
                "dir2/abc/de/caaa.txt",
                "dir2/abc/de/c/aaa.txt",
                "dir2/abc/de/1.txt",
                "dir1/di/ab/c.txt",
            ],
            &[
                "dir1/di/a/b/x.txt",
                "dir1/di/a/b/x/cv.txt",
                "dir1/di/a/caaa.txt",
                "dir1/di/a/c/aaa.txt",
            ],
        );
    }

    #[test]
    fn test_move_file_over_existing_file() {
        check_move(
            &["a/aaaaa/aa.mp4", "a/aa/aaa/aa.mp4"],
            "a/aa/aaa/aa.mp4",
            "a/aaaaa/",
            &["a/aaaaa/aa.mp4"],
            &["a/aa/aaa/aa.mp4", "a/aaaaa/a/aa/aaa/aa.mp4"],
        );
    }

    #[test]
    fn test_rename_file() {
        check_move(
            &["test/a/a/a.png"],
            "test/a/a/a.png",
            "test/a/a/b.png",
            &["test/a/a/b.png"],
            &["test/a/a/a.png"],
        );
    }

    #[test]
    fn test_move_file_with_children() {
        check_move(
            &[
                "aaaaaa", "aaaaab", "abbbb", "abbba", "bbbbba", "bbbaaa", "bbbaab", "aa", "b",
            ],
            "aa",
            "abbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
            &["abbbbbbbbbbbbbbbbbbbbbbbbbbbbb", "aaaaaa", "aaaaab"],
            &["aa"],
        );
    }

    #[test]
    fn test_moved_file_keeps_entry() {
        let store = MemoryStore::new();
        let ctx = Context::new();
        let mut root = tree(&["robots.txt", "src/defaults/1/apple.png"], &store);

        root.move_entry(&ctx, b"robots.txt", b"src/defaults/", false, &store)
            .unwrap();

        assert_eq!(
            root.lookup(&ctx, b"src/defaults/robots.txt", &store).unwrap(),
            entry_for(b"robots.txt")
        );
    }

    #[test]
    fn test_move_file_into_its_own_directory_keeps_it() {
        let store = MemoryStore::new();
        let ctx = Context::new();
        let mut root = tree(&["img/1.png", "img/2.png"], &store);

        root.move_entry(&ctx, b"img/1.png", b"img/", false, &store)
            .unwrap();
        root.copy_entry(&ctx, b"img/2.png", b"img/", false, &store)
            .unwrap();

        assert_eq!(
            root.lookup(&ctx, b"img/1.png", &store).unwrap(),
            entry_for(b"img/1.png")
        );
        assert_eq!(
            root.lookup(&ctx, b"img/2.png", &store).unwrap(),
            entry_for(b"img/2.png")
        );
    }

    #[test]
    fn test_move_directory_ending_before_label_end() {
        let store = MemoryStore::new();
        let ctx = Context::new();
        let mut root = tree(&["img/ab1", "img/ab2", "index.html"], &store);

        root.move_entry(&ctx, b"img/", b"pics/", true, &store)
            .unwrap();

        assert_eq!(root.lookup(&ctx, b"pics/ab1", &store).unwrap(), entry_for(b"img/ab1"));
        assert_eq!(root.lookup(&ctx, b"pics/ab2", &store).unwrap(), entry_for(b"img/ab2"));
        assert!(root.lookup(&ctx, b"img/ab1", &store).unwrap_err().is_not_found());
        assert!(root.lookup(&ctx, b"img/ab2", &store).unwrap_err().is_not_found());
        assert!(root.lookup_node(&ctx, b"img/", &store).unwrap().node.is_empty_directory());
        assert!(root.lookup(&ctx, b"index.html", &store).is_ok());
    }

    #[test]
    fn test_move_directory_takes_entry_where_label_ends() {
        let store = MemoryStore::new();
        let ctx = Context::new();
        let mut root = tree(&["img/ab", "img/ab1", "img/ab2", "index.html"], &store);

        root.move_entry(&ctx, b"img/", b"pics/", true, &store)
            .unwrap();

        for (moved, from) in [("pics/ab", "img/ab"), ("pics/ab1", "img/ab1"), ("pics/ab2", "img/ab2")] {
            assert_eq!(
                root.lookup(&ctx, moved.as_bytes(), &store).unwrap(),
                entry_for(from.as_bytes())
            );
            assert!(root.lookup(&ctx, from.as_bytes(), &store).is_err(), "{}", from);
        }
    }

    #[test]
    fn test_forbidden_moves() {
        let store = MemoryStore::new();
        let ctx = Context::new();
        let mut root = tree(&["img/1.png", "img/sub/2.png", "index.html"], &store);

        let forbidden: [(&[u8], &[u8]); 4] = [
            (b"img/", b"index.html"),
            (b"img/", b"img/sub/"),
            (b"img/", b"img/"),
            (b"index.html", b"index.html"),
        ];
        for (from, to) in forbidden {
            assert!(
                matches!(
                    root.move_entry(&ctx, from, to, true, &store),
                    Err(Error::ForbiddenAction(_))
                ),
                "moving {:?} to {:?}",
                from,
                to
            );
        }
        assert!(matches!(
            root.move_entry(&ctx, b"", b"a", true, &store),
            Err(Error::EmptyPath)
        ));
        assert!(root.lookup(&ctx, b"img/sub/2.png", &store).is_ok());
    }

    #[test]
    fn test_move_missing_source_or_destination() {
        let store = MemoryStore::new();
        let ctx = Context::new();
        let mut root = tree(&["img/1.png", "index.html"], &store);

        assert!(root
            .move_entry(&ctx, b"img/2.png", b"x.png", true, &store)
            .unwrap_err()
            .is_not_found());
        // the destination directory must exist unless asked to create it
        assert!(root
            .move_entry(&ctx, b"index.html", b"pages/", false, &store)
            .unwrap_err()
            .is_not_found());
        assert!(root.lookup(&ctx, b"index.html", &store).is_ok());

        root.move_entry(&ctx, b"index.html", b"pages/", true, &store)
            .unwrap();
        assert!(root.lookup(&ctx, b"pages/index.html", &store).is_ok());
    }

    #[test]
    fn test_copy_keeps_origin() {
        let store = MemoryStore::new();
        let ctx = Context::new();
        let mut root = tree(&["img/1.png", "img/2.png", "index.html"], &store);

        root.copy_entry(&ctx, b"img/", b"backup/", true, &store)
            .unwrap();
        root.copy_entry(&ctx, b"index.html", b"home.html", true, &store)
            .unwrap();

        for path in ["img/1.png", "img/2.png", "backup/1.png", "backup/2.png", "index.html"] {
            assert!(root.lookup(&ctx, path.as_bytes(), &store).is_ok(), "{}", path);
        }
        assert_eq!(
            root.lookup(&ctx, b"home.html", &store).unwrap(),
            entry_for(b"index.html")
        );
    }

    #[test]
    fn test_move_between_tries() {
        let store = MemoryStore::new();
        let ctx = Context::new();
        let mut source = tree(&["img/1.png", "img/2.png", "index.html"], &store);
        let mut target = tree(&["assets/"], &store);

        source
            .move_to(&ctx, &mut target, b"img/", b"assets/", false, &store)
            .unwrap();
        source
            .copy_to(&ctx, &mut target, b"index.html", b"index.html", true, &store)
            .unwrap();

        assert!(target.lookup(&ctx, b"assets/1.png", &store).is_ok());
        assert!(target.lookup(&ctx, b"assets/2.png", &store).is_ok());
        assert!(target.lookup(&ctx, b"index.html", &store).is_ok());
        assert!(source.lookup(&ctx, b"img/1.png", &store).is_err());
        assert!(source.lookup(&ctx, b"index.html", &store).is_ok());
    }

    #[test]
    fn test_move_from_saved_trie() {
        let store = MemoryStore::new();
        let ctx = Context::new();
        let mut root = tree(&["img/a/1.png", "img/a/2.png", "img/b.png"], &store);
        let reference = root.save(&ctx, &store).unwrap();

        let mut reloaded = Node::from_reference(reference);
        reloaded
            .move_entry(&ctx, b"img/a/", b"pics/", true, &store)
            .unwrap();

        assert!(reloaded.lookup(&ctx, b"pics/1.png", &store).is_ok());
        assert!(reloaded.lookup(&ctx, b"pics/2.png", &store).is_ok());
        assert!(reloaded.lookup(&ctx, b"img/b.png", &store).is_ok());
        assert!(reloaded.lookup(&ctx, b"img/a/1.png", &store).is_err());
    }
}
