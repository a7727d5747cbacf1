//! Entry types for scanned files and directories.

use std::path::{Path, PathBuf};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Inode information for hardlink detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InodeInfo {
    /// Inode number.
    pub inode: u64,
    /// Device ID.
    pub device: u64,
}

impl InodeInfo {
    /// Create new inode info.
    pub fn new(inode: u64, device: u64) -> Self {
        Self { inode, device }
    }
}

/// Type of file system entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryKind {
    /// Regular file (or any non-directory that is not a symlink).
    File,
    /// Directory.
    Directory,
    /// Symbolic link. Never traversed, contributes no bytes.
    Symlink {
        /// Link target path.
        target: CompactString,
    },
}

impl EntryKind {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File)
    }

    /// Check if this is a symlink.
    pub fn is_symlink(&self) -> bool {
        matches!(self, EntryKind::Symlink { .. })
    }
}

/// One file or directory as seen by the scanner.
///
/// `contents` is `None` until the directory is expanded, and
/// `Some(vec![])` once expanded if it turned out to be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Base name.
    pub name: CompactString,

    /// Absolute path, the identity used for tree mutation.
    pub path: PathBuf,

    /// Entry type.
    #[serde(flatten)]
    pub kind: EntryKind,

    /// Size in bytes (aggregate for directories, as of the last scan).
    pub size: u64,

    /// True for directories with children that can be materialized.
    pub has_contents: bool,

    /// Materialized children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<Vec<Entry>>,

    /// Reason the entry (or part of its subtree) could not be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CompactString>,
}

impl Entry {
    /// Create a file entry.
    pub fn file(name: impl Into<CompactString>, path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: EntryKind::File,
            size,
            has_contents: false,
            contents: None,
            error: None,
        }
    }

    /// Create an unexpanded directory entry with its aggregate size.
    pub fn directory(
        name: impl Into<CompactString>,
        path: impl Into<PathBuf>,
        size: u64,
        has_contents: bool,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: EntryKind::Directory,
            size,
            has_contents,
            contents: None,
            error: None,
        }
    }

    /// Create a symlink entry.
    pub fn symlink(
        name: impl Into<CompactString>,
        path: impl Into<PathBuf>,
        target: impl Into<CompactString>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: EntryKind::Symlink {
                target: target.into(),
            },
            size: 0,
            has_contents: false,
            contents: None,
            error: None,
        }
    }

    /// Create an entry whose metadata could not be read.
    ///
    /// Size is zero and the entry is never expandable.
    pub fn inaccessible(
        name: impl Into<CompactString>,
        path: impl Into<PathBuf>,
        kind: EntryKind,
        error: impl Into<CompactString>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind,
            size: 0,
            has_contents: false,
            contents: None,
            error: Some(error.into()),
        }
    }

    /// Attach an error reason to an otherwise usable entry.
    pub fn with_error(mut self, error: impl Into<CompactString>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Check if this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Check if this entry is a file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Check if this entry could not be read at all.
    ///
    /// Its size is unknown and reported as zero.
    pub fn is_inaccessible(&self) -> bool {
        self.error.is_some() && self.size == 0 && !self.has_contents
    }

    /// Check if this directory was only partly read.
    ///
    /// The size covers what could be read and the entry stays expandable.
    pub fn is_partial(&self) -> bool {
        self.error.is_some() && !self.is_inaccessible()
    }

    /// Check if this directory's children are materialized.
    pub fn is_expanded(&self) -> bool {
        self.contents.is_some()
    }

    /// Check if this entry can be expanded by a scan.
    pub fn is_expandable(&self) -> bool {
        self.is_dir() && self.has_contents
    }

    /// Number of materialized children.
    pub fn child_count(&self) -> usize {
        self.contents.as_ref().map_or(0, Vec::len)
    }

    /// Find a materialized descendant (or self) by path.
    pub fn find(&self, path: &Path) -> Option<&Entry> {
        if self.path == path {
            return Some(self);
        }
        if !path.starts_with(&self.path) {
            return None;
        }
        self.contents
            .as_deref()
            .and_then(|children| find_in(children, path))
    }

    /// Sort materialized children by size, descending, recursively.
    pub fn sort_by_size(&mut self) {
        if let Some(children) = self.contents.as_mut() {
            sort_by_size(children);
        }
    }
}

/// Depth-first search of a materialized child list.
///
/// Only children whose path is a prefix of `path` are descended into.
pub(crate) fn find_in<'a>(children: &'a [Entry], path: &Path) -> Option<&'a Entry> {
    children
        .iter()
        .filter(|child| path.starts_with(&child.path))
        .find_map(|child| child.find(path))
}

/// Mutable counterpart of [`find_in`].
pub(crate) fn find_in_mut<'a>(children: &'a mut [Entry], path: &Path) -> Option<&'a mut Entry> {
    for child in children.iter_mut() {
        if child.path == path {
            return Some(child);
        }
        if path.starts_with(&child.path) {
            if let Some(grandchildren) = child.contents.as_deref_mut() {
                if let Some(found) = find_in_mut(grandchildren, path) {
                    return Some(found);
                }
            }
        }
    }
    None
}

/// Sort entries by size, descending, recursively.
pub fn sort_by_size(entries: &mut [Entry]) {
    entries.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.name.cmp(&b.name)));
    for entry in entries.iter_mut() {
        entry.sort_by_size();
    }
}
