//! Directory size-scanning engine for spacetree.
//!
//! A scan lists one directory level and computes the aggregate size of
//! every child directory, without materializing anything below that
//! level. Deeper levels are listed on demand and attached to an
//! [`EntryTree`].
//!
//! # Example
//!
//! ```rust,no_run
//! use spacetree_scan::{ScanConfig, Scanner};
//!
//! let scanner = Scanner::new(ScanConfig::new("/path/to/scan"));
//! let mut tree = scanner.scan_root(None).unwrap();
//!
//! let first_dir = tree.contents.iter().find(|e| e.is_expandable()).map(|e| e.path.clone());
//! if let Some(dir) = first_dir {
//!     scanner.expand(&mut tree, &dir).unwrap();
//! }
//! println!("Total size: {} bytes", tree.total_size());
//! ```
//!
//! # Progress Monitoring
//!
//! Any `Fn(&ScanProgress)` is a [`ProgressSink`]. Directories are always
//! reported; files every `progress_interval` (50 by default).
//!
//! ```rust,no_run
//! use spacetree_scan::{ScanConfig, ScanProgress, Scanner};
//!
//! let scanner = Scanner::new(ScanConfig::new("/path/to/scan"));
//! let print = |p: &ScanProgress| eprintln!("{} files, {} dirs", p.files_count, p.dirs_count);
//! let tree = scanner.scan_root(Some(&print)).unwrap();
//! ```

mod aggregate;
mod inode;
mod progress;
mod scanner;
mod service;

pub use aggregate::DirSummary;
pub use inode::InodeTracker;
pub use progress::{ProgressLog, ProgressSink, ScanProgress};
pub use scanner::{Listing, Scanner, next_session};
pub use service::{ScanEvent, ScanHandle, ScanService};

// Re-export core types for convenience
pub use spacetree_core::{
    Entry, EntryKind, EntryTree, ScanConfig, ScanError, ScanWarning, SessionId, TreeError,
    WarningKind,
};

/// Channel buffer size for background scan events.
pub const SCAN_CHANNEL_SIZE: usize = 100;
