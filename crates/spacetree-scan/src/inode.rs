//! Inode tracking for hardlink deduplication.

use std::fs::Metadata;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use dashmap::DashSet;
use spacetree_core::InodeInfo;

/// Tracks seen inodes so a multiply-linked file is counted once.
#[derive(Debug, Default)]
pub struct InodeTracker {
    seen: DashSet<InodeInfo>,
}

impl InodeTracker {
    /// Create a new inode tracker.
    pub fn new() -> Self {
        Self {
            seen: DashSet::new(),
        }
    }

    /// Track an inode. Returns `true` if this is the first time seeing it.
    pub fn track(&self, info: InodeInfo) -> bool {
        self.seen.insert(info)
    }

    /// Bytes a file contributes: its length the first time its inode is
    /// seen, zero for every further hardlink.
    pub fn counted_size(&self, metadata: &Metadata) -> u64 {
        if link_count(metadata) > 1 && !self.track(inode_info(metadata)) {
            0
        } else {
            metadata.len()
        }
    }

    /// Get the number of unique multiply-linked inodes tracked.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if no inodes have been tracked.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Get the device ID from metadata.
#[cfg(unix)]
pub(crate) fn device_id(metadata: &Metadata) -> u64 {
    metadata.dev()
}

#[cfg(not(unix))]
pub(crate) fn device_id(_metadata: &Metadata) -> u64 {
    0
}

#[cfg(unix)]
fn inode_info(metadata: &Metadata) -> InodeInfo {
    InodeInfo::new(metadata.ino(), metadata.dev())
}

#[cfg(not(unix))]
fn inode_info(_metadata: &Metadata) -> InodeInfo {
    InodeInfo::new(0, 0)
}

#[cfg(unix)]
fn link_count(metadata: &Metadata) -> u64 {
    metadata.nlink()
}

#[cfg(not(unix))]
fn link_count(_metadata: &Metadata) -> u64 {
    1
}
