//! Bottom-up empty directory traversal.
//!
//! [`Traverser`] drives a `walkdir` walk in contents-first order, so a
//! directory is only classified once every one of its entries has been seen.
//! State is kept per depth of the walk: whether the directory holds something
//! that keeps it non-empty, and which of its subdirectories were yielded as
//! empty. Those children are discounted when their parent is classified, so a
//! parent whose only contents were empty directories is yielded too, whether
//! or not the consumer has removed those children yet.

use std::collections::HashSet;
use std::ffi::OsString;
use std::io;
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::classify::{self, access_error};
use crate::error::{AccessError, Error};

/// A directory found empty, in the order it was discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyDir {
    pub path: PathBuf,
    /// 1-based position in the traversal output.
    pub sequence: u64,
}

/// What is known about one open directory of the walk.
#[derive(Debug, Default)]
struct Level {
    /// Entries seen so far.
    entries: usize,
    /// Holds a file, a link, or a non-empty or unreadable subdirectory.
    blocked: bool,
    /// Children confirmed empty during this pass.
    confirmed: HashSet<OsString>,
}

impl Level {
    fn block(&mut self) {
        self.blocked = true;
        self.confirmed.clear();
    }
}

/// Lazy post-order iterator over the empty directories below a root.
///
/// Yields `Ok` records until the tree is exhausted. An `Err` is only yielded
/// when the run cannot continue (the root vanished or cannot be read), after
/// which the iterator is finished. Unreadable subdirectories are logged,
/// counted in [`Traverser::skipped`], and treated as non-empty.
pub struct Traverser {
    root: PathBuf,
    walk: walkdir::IntoIter,
    /// Indexed by walk depth; the root is level 0.
    levels: Vec<Level>,
    /// Directories whose listing failed, until their own entry comes up.
    unreadable: HashSet<PathBuf>,
    cancel: Option<Arc<AtomicBool>>,
    cancelled: bool,
    done: bool,
    emitted: u64,
    skipped: u64,
}

impl Traverser {
    /// Validate `root` and prepare a traversal. No directory is read until
    /// the first call to `next`.
    pub fn new(root: &Path) -> Result<Self, Error> {
        let root = root.canonicalize().map_err(|e| Error::root(root, e))?;

        if !root.is_dir() {
            return Err(Error::NotADirectory(root));
        }

        let walk = WalkDir::new(&root)
            .follow_links(false)
            .contents_first(true)
            .sort_by_file_name()
            .into_iter();

        Ok(Self {
            root,
            walk,
            levels: Vec::new(),
            unreadable: HashSet::new(),
            cancel: None,
            cancelled: false,
            done: false,
            emitted: 0,
            skipped: 0,
        })
    }

    /// End the traversal at the next entry once `flag` is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// The canonical root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of empty directories yielded so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Number of directories skipped because they could not be read.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// True if the traversal ended because the cancel flag was set.
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Number of directory levels currently tracked. Bounded by the depth of
    /// the tree.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    fn cancel_requested(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn level_mut(&mut self, depth: usize) -> &mut Level {
        if self.levels.len() <= depth {
            self.levels.resize_with(depth + 1, Level::default);
        }
        &mut self.levels[depth]
    }

    /// Remove the state of the directory at `depth`. Everything deeper
    /// belonged to its already resolved descendants.
    fn take_level(&mut self, depth: usize) -> Level {
        if self.levels.len() > depth {
            self.levels.truncate(depth + 1);
            self.levels.pop().unwrap_or_default()
        } else {
            Level::default()
        }
    }

    fn abort(&mut self, err: AccessError) -> Error {
        self.done = true;
        self.levels.clear();
        Error::Aborted {
            path: err.path,
            source: err.source,
        }
    }

    /// Record an unreadable directory. Escalates to an abort when the root
    /// itself has gone away.
    fn skip(&mut self, err: AccessError) -> Result<(), Error> {
        if !self.root.is_dir() {
            return Err(self.abort(err));
        }
        warn!(path = %err.path.display(), error = %err.source, "skipping unreadable directory");
        self.skipped += 1;
        Ok(())
    }

    fn walk_error(&mut self, err: walkdir::Error) -> Result<(), Error> {
        let depth = err.depth();
        let path = err.path().unwrap_or(&self.root).to_path_buf();
        let err = access_error(&path, io::Error::from(err));
        if depth == 0 {
            return Err(self.abort(err));
        }
        self.level_mut(depth - 1).block();
        self.unreadable.insert(path);
        self.skip(err)
    }

    /// Classify a directory whose entries have all been walked.
    fn resolve(&mut self, entry: walkdir::DirEntry) -> Result<Option<EmptyDir>, Error> {
        let depth = entry.depth();
        let name = entry.file_name().to_os_string();
        let path = entry.into_path();
        let level = self.take_level(depth);

        let empty = if self.unreadable.remove(&path) || level.blocked {
            false
        } else if level.entries == 0 {
            // Listed with no entries during this pass; no second read.
            true
        } else {
            match classify::is_empty_except(&path, &level.confirmed) {
                Ok(empty) => empty,
                Err(err) if depth == 0 => return Err(self.abort(err)),
                Err(err) => {
                    self.skip(err)?;
                    false
                }
            }
        };

        if depth > 0 {
            let parent = self.level_mut(depth - 1);
            parent.entries += 1;
            if !empty {
                parent.block();
            } else if !parent.blocked {
                parent.confirmed.insert(name);
            }
        }

        if !empty {
            return Ok(None);
        }
        self.emitted += 1;
        debug!(path = %path.display(), sequence = self.emitted, "empty");
        Ok(Some(EmptyDir {
            path,
            sequence: self.emitted,
        }))
    }

    fn step(&mut self) -> Option<Result<EmptyDir, Error>> {
        loop {
            if self.cancel_requested() {
                debug!(emitted = self.emitted, "traversal cancelled");
                self.cancelled = true;
                return None;
            }

            let entry = match self.walk.next()? {
                Ok(entry) => entry,
                Err(err) => match self.walk_error(err) {
                    Ok(()) => continue,
                    Err(e) => return Some(Err(e)),
                },
            };

            if entry.file_type().is_dir() {
                match self.resolve(entry) {
                    Ok(Some(record)) => return Some(Ok(record)),
                    Ok(None) => {}
                    Err(e) => return Some(Err(e)),
                }
            } else if entry.depth() > 0 {
                let parent = self.level_mut(entry.depth() - 1);
                parent.entries += 1;
                parent.block();
            }
        }
    }
}

impl Iterator for Traverser {
    type Item = Result<EmptyDir, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.step();
        if item.is_none() {
            self.done = true;
        }
        item
    }
}

impl FusedIterator for Traverser {}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn collect(root: &Path) -> Vec<PathBuf> {
        Traverser::new(root)
            .unwrap()
            .map(|r| r.unwrap().path)
            .collect()
    }

    fn rel(root: &Path, paths: &[PathBuf]) -> Vec<String> {
        let root = root.canonicalize().unwrap();
        paths
            .iter()
            .map(|p| {
                p.strip_prefix(&root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn empty_root_is_yielded() {
        let tmp = tempfile::tempdir().unwrap();
        let found = collect(tmp.path());
        assert_eq!(found, vec![tmp.path().canonicalize().unwrap()]);
    }

    #[test]
    fn nested_chain_is_yielded_deepest_first() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("a/b/c")).unwrap();
        fs::write(tmp.path().join("keep.txt"), b"x").unwrap();

        let found = collect(tmp.path());
        assert_eq!(rel(tmp.path(), &found), ["a/b/c", "a/b", "a"]);
    }

    #[test]
    fn file_keeps_ancestors_non_empty() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("x/y/empty")).unwrap();
        fs::write(tmp.path().join("x/y/file"), b"x").unwrap();

        let found = collect(tmp.path());
        assert_eq!(rel(tmp.path(), &found), ["x/y/empty"]);
    }

    #[test]
    fn siblings_are_lexicographic_and_sequence_counts_up() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["c", "a", "b"] {
            fs::create_dir(tmp.path().join(name)).unwrap();
        }
        fs::write(tmp.path().join("z.txt"), b"x").unwrap();

        let records: Vec<EmptyDir> = Traverser::new(tmp.path())
            .unwrap()
            .map(Result::unwrap)
            .collect();
        let paths: Vec<PathBuf> = records.iter().map(|r| r.path.clone()).collect();
        assert_eq!(rel(tmp.path(), &paths), ["a", "b", "c"]);
        let seq: Vec<u64> = records.iter().map(|r| r.sequence).collect();
        assert_eq!(seq, [1, 2, 3]);
    }

    #[test]
    fn removed_children_are_seen_when_parent_is_classified() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("p/q")).unwrap();

        let mut walk = Traverser::new(tmp.path()).unwrap();
        let first = walk.next().unwrap().unwrap();
        assert!(first.path.ends_with("p/q"));
        fs::remove_dir(&first.path).unwrap();

        let second = walk.next().unwrap().unwrap();
        assert!(second.path.ends_with("p"));
        let third = walk.next().unwrap().unwrap();
        assert_eq!(third.path, tmp.path().canonicalize().unwrap());
        assert!(walk.next().is_none());
        assert!(walk.next().is_none());
    }

    #[test]
    fn deep_nesting_tracks_one_level_per_depth() {
        let tmp = tempfile::tempdir().unwrap();
        let mut deep = tmp.path().to_path_buf();
        for _ in 0..300 {
            deep.push("d");
        }
        fs::create_dir_all(&deep).unwrap();

        let mut walk = Traverser::new(tmp.path()).unwrap();
        let first = walk.next().unwrap().unwrap();
        assert_eq!(first.path, deep.canonicalize().unwrap());
        assert_eq!(walk.depth(), 300);
        assert_eq!(walk.count(), 300);
    }

    #[test]
    fn cancel_flag_ends_the_walk() {
        let tmp = tempfile::tempdir().unwrap();
        for i in 0..50 {
            let dir = tmp.path().join(format!("full{i:02}"));
            fs::create_dir(&dir).unwrap();
            fs::write(dir.join("file"), b"x").unwrap();
        }
        fs::create_dir(tmp.path().join("zz")).unwrap();

        let flag = Arc::new(AtomicBool::new(true));
        let mut walk = Traverser::new(tmp.path()).unwrap().with_cancel(flag);
        assert!(walk.next().is_none());
        assert!(walk.was_cancelled());
        assert_eq!(walk.emitted(), 0);
        assert!(walk.next().is_none());
    }

    #[test]
    fn cancel_between_records_stops_before_the_next() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["a", "b", "c"] {
            fs::create_dir(tmp.path().join(name)).unwrap();
        }

        let flag = Arc::new(AtomicBool::new(false));
        let mut walk = Traverser::new(tmp.path())
            .unwrap()
            .with_cancel(flag.clone());
        assert!(walk.next().unwrap().unwrap().path.ends_with("a"));

        flag.store(true, Ordering::SeqCst);
        assert!(walk.next().is_none());
        assert!(walk.was_cancelled());
        assert_eq!(walk.emitted(), 1);
    }

    #[test]
    fn uncancelled_walk_reports_not_cancelled() {
        let tmp = tempfile::tempdir().unwrap();
        let flag = Arc::new(AtomicBool::new(false));
        let mut walk = Traverser::new(tmp.path()).unwrap().with_cancel(flag);
        assert_eq!(walk.by_ref().count(), 1);
        assert!(!walk.was_cancelled());
    }

    #[test]
    fn missing_root_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Traverser::new(&tmp.path().join("nope")).err().unwrap();
        assert!(matches!(err, Error::PathNotFound(_)));
    }

    #[test]
    fn file_root_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("f");
        fs::write(&file, b"x").unwrap();
        let err = Traverser::new(&file).err().unwrap();
        assert!(matches!(err, Error::NotADirectory(_)));
    }

    #[test]
    fn vanished_root_aborts() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        fs::create_dir_all(root.join("a")).unwrap();
        fs::create_dir_all(root.join("b")).unwrap();
        fs::write(root.join("b/file"), b"x").unwrap();

        let mut walk = Traverser::new(&root).unwrap();
        assert!(walk.next().unwrap().unwrap().path.ends_with("a"));

        fs::remove_dir_all(&root).unwrap();
        let err = walk.next().unwrap().unwrap_err();
        assert!(matches!(err, Error::Aborted { .. }));
        assert!(walk.next().is_none());
    }

    #[test]
    fn mixed_tree_discounts_only_confirmed_children() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("p/e1")).unwrap();
        fs::create_dir_all(tmp.path().join("p/e2/e3")).unwrap();
        fs::create_dir_all(tmp.path().join("p/full")).unwrap();
        fs::write(tmp.path().join("p/full/f"), b"x").unwrap();
        fs::create_dir_all(tmp.path().join("q/r")).unwrap();

        let found = collect(tmp.path());
        assert_eq!(
            rel(tmp.path(), &found),
            ["p/e1", "p/e2/e3", "p/e2", "q/r", "q"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn permission_denied_root_is_not_reported_missing() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let outer = tmp.path().join("outer");
        fs::create_dir_all(outer.join("inner")).unwrap();
        fs::set_permissions(&outer, fs::Permissions::from_mode(0o000)).unwrap();

        if fs::read_dir(&outer).is_ok() {
            fs::set_permissions(&outer, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = Traverser::new(&outer.join("inner"));
        fs::set_permissions(&outer, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(matches!(result, Err(Error::RootAccess { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_followed() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        fs::create_dir_all(root.join("real/inner")).unwrap();
        fs::create_dir_all(root.join("holder")).unwrap();
        std::os::unix::fs::symlink(root.join("real"), root.join("holder/link")).unwrap();
        std::os::unix::fs::symlink(&root, root.join("holder/loop")).unwrap();

        let found = collect(&root);
        assert_eq!(rel(&root, &found), ["real/inner", "real"]);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_is_skipped_and_keeps_parent() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let locked = tmp.path().join("outer/locked");
        fs::create_dir_all(locked.join("inner")).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can read regardless of mode bits.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let mut walk = Traverser::new(tmp.path()).unwrap();
        let found: Vec<PathBuf> = walk.by_ref().map(|r| r.unwrap().path).collect();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(found.is_empty());
        assert_eq!(walk.skipped(), 1);
    }
}
