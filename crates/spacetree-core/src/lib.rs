//! Core types for spacetree.
//!
//! This crate provides the data structures shared by the scanner and the
//! file operations: scanned entries, the sparse entry tree, configuration
//! and error types.

mod config;
mod error;
mod node;
mod tree;

pub use config::{DEFAULT_PROGRESS_INTERVAL, IgnoreMatcher, ScanConfig, ScanConfigBuilder};
pub use error::{ScanError, ScanWarning, TreeError, WarningKind};
pub use node::{Entry, EntryKind, InodeInfo, sort_by_size};
pub use tree::{EntryTree, Iter, SessionId};
