//! File operations for spacetree.
//!
//! Deletion (synchronous, or on the blocking pool with the outcome sent
//! over a channel) and a pass-through to the platform file manager.
//! A successful deletion is reflected in an [`spacetree_core::EntryTree`]
//! with [`apply_outcome`].

mod delete;
mod operation;
mod reveal;

pub use delete::{apply_outcome, delete_entry, start_delete};
pub use operation::{DeleteError, DeleteOutcome};
pub use reveal::reveal;

/// Default channel buffer size for operation results.
pub const OPERATION_CHANNEL_SIZE: usize = 100;
