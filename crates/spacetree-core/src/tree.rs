//! Sparse tree store for scanned entries.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::error::{ScanWarning, TreeError};
use crate::node::{Entry, find_in, find_in_mut};

/// Identity of one scan invocation.
///
/// Callers compare session ids to discard events and results from a
/// superseded scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Create a new SessionId from a u64.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything scanned so far under one root.
///
/// Only the root's immediate children are materialized after the initial
/// scan; deeper levels are attached one at a time with [`EntryTree::attach`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryTree {
    /// Root path that was scanned.
    pub root_path: PathBuf,

    /// Session that produced the root listing.
    pub session: SessionId,

    /// Immediate children of the root.
    pub contents: Vec<Entry>,

    /// When the root scan finished.
    pub scanned_at: SystemTime,

    /// Duration of the root scan.
    pub scan_duration: Duration,

    /// Errors absorbed while scanning.
    #[serde(default)]
    pub warnings: Vec<ScanWarning>,
}

impl EntryTree {
    /// Create a new tree from a root listing.
    pub fn new(
        root_path: PathBuf,
        session: SessionId,
        contents: Vec<Entry>,
        scan_duration: Duration,
        warnings: Vec<ScanWarning>,
    ) -> Self {
        Self {
            root_path,
            session,
            contents,
            scanned_at: SystemTime::now(),
            scan_duration,
            warnings,
        }
    }

    /// Sum of the root children's sizes.
    pub fn total_size(&self) -> u64 {
        self.contents.iter().map(|e| e.size).sum()
    }

    /// Check if there were any warnings during scanning.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Find a materialized entry by path.
    pub fn find(&self, path: &Path) -> Option<&Entry> {
        find_in(&self.contents, path)
    }

    /// Check whether a materialized entry exists at `path`.
    pub fn contains(&self, path: &Path) -> bool {
        self.find(path).is_some()
    }

    /// Materialize the children of the directory at `path`.
    ///
    /// Replaces any previously attached contents; attaching twice is not
    /// an error.
    pub fn attach(&mut self, path: &Path, children: Vec<Entry>) -> Result<(), TreeError> {
        let target = find_in_mut(&mut self.contents, path).ok_or_else(|| TreeError::NotFound {
            path: path.to_path_buf(),
        })?;

        if !target.is_expandable() {
            return Err(TreeError::NotExpandable {
                path: path.to_path_buf(),
            });
        }

        target.contents = Some(children);
        Ok(())
    }

    /// Excise the entry at `path` and its whole subtree.
    ///
    /// Ancestor sizes are left untouched and go stale until the next scan.
    /// Returns `None` when nothing matched.
    pub fn remove(&mut self, path: &Path) -> Option<Entry> {
        remove_from(&mut self.contents, path)
    }

    /// Like [`EntryTree::remove`], but also subtracts the removed size from
    /// every materialized ancestor.
    pub fn remove_and_reclaim(&mut self, path: &Path) -> Option<Entry> {
        let removed = self.remove(path)?;

        let mut ancestor = path.parent();
        while let Some(dir) = ancestor {
            if dir == self.root_path {
                break;
            }
            if let Some(entry) = find_in_mut(&mut self.contents, dir) {
                entry.size = entry.size.saturating_sub(removed.size);
            }
            ancestor = dir.parent();
        }

        Some(removed)
    }

    /// Iterate over all materialized entries in pre-order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stack: self.contents.iter().rev().collect(),
        }
    }

    /// Sort every materialized level by size, descending.
    pub fn sort_by_size(&mut self) {
        crate::node::sort_by_size(&mut self.contents);
    }
}

/// Pre-order iterator over materialized entries.
pub struct Iter<'a> {
    stack: Vec<&'a Entry>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.stack.pop()?;
        if let Some(children) = entry.contents.as_deref() {
            self.stack.extend(children.iter().rev());
        }
        Some(entry)
    }
}

fn remove_from(children: &mut Vec<Entry>, path: &Path) -> Option<Entry> {
    if let Some(index) = children.iter().position(|c| c.path == path) {
        return Some(children.remove(index));
    }
    children
        .iter_mut()
        .filter(|child| path.starts_with(&child.path))
        .find_map(|child| child.contents.as_mut().and_then(|c| remove_from(c, path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> EntryTree {
        let mut a = Entry::directory("a", "/r/a", 150, true);
        a.contents = Some(vec![
            Entry::file("f1", "/r/a/f1", 50),
            Entry::directory("b", "/r/a/b", 100, true),
        ]);
        EntryTree::new(
            PathBuf::from("/r"),
            SessionId::new(1),
            vec![a, Entry::file("top", "/r/top", 7)],
            Duration::ZERO,
            Vec::new(),
        )
    }

    #[test]
    fn test_total_size() {
        assert_eq!(sample_tree().total_size(), 157);
    }

    #[test]
    fn test_attach_replaces() {
        let mut tree = sample_tree();
        let b = Path::new("/r/a/b");

        tree.attach(b, vec![Entry::file("x", "/r/a/b/x", 100)]).unwrap();
        tree.attach(b, vec![Entry::file("y", "/r/a/b/y", 100)]).unwrap();

        assert!(tree.contains(Path::new("/r/a/b/y")));
        assert!(!tree.contains(Path::new("/r/a/b/x")));
        assert_eq!(tree.find(b).unwrap().child_count(), 1);
    }

    #[test]
    fn test_attach_errors() {
        let mut tree = sample_tree();
        assert_eq!(
            tree.attach(Path::new("/r/nope"), Vec::new()),
            Err(TreeError::NotFound {
                path: PathBuf::from("/r/nope")
            })
        );
        assert!(matches!(
            tree.attach(Path::new("/r/top"), Vec::new()),
            Err(TreeError::NotExpandable { .. })
        ));
    }

    #[test]
    fn test_remove_keeps_ancestor_sizes() {
        let mut tree = sample_tree();
        let removed = tree.remove(Path::new("/r/a/b")).unwrap();
        assert_eq!(removed.size, 100);
        assert_eq!(tree.find(Path::new("/r/a")).unwrap().size, 150);
        assert!(tree.remove(Path::new("/r/a/b")).is_none());
    }

    #[test]
    fn test_remove_and_reclaim() {
        let mut tree = sample_tree();
        tree.remove_and_reclaim(Path::new("/r/a/b")).unwrap();
        assert_eq!(tree.find(Path::new("/r/a")).unwrap().size, 50);
        assert_eq!(tree.total_size(), 57);
    }

    #[test]
    fn test_iter_preorder() {
        let tree = sample_tree();
        let names: Vec<_> = tree.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a", "f1", "b", "top"]);
    }
}
