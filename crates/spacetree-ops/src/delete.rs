//! Delete operation.

use std::fs;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use spacetree_core::{Entry, EntryTree};

use crate::OPERATION_CHANNEL_SIZE;
use crate::operation::{DeleteError, DeleteOutcome};

/// Delete a path, recursively if it is a directory.
///
/// `is_directory` must match what is on disk. A symlink is always removed
/// as a link, never followed. Any error, including one part way through a
/// recursive removal, yields [`DeleteOutcome::Failed`].
pub fn delete_entry(path: &Path, is_directory: bool) -> DeleteOutcome {
    match delete_impl(path, is_directory) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "deleted");
            DeleteOutcome::Deleted {
                path: path.to_path_buf(),
            }
        }
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "delete failed");
            error.into()
        }
    }
}

fn delete_impl(path: &Path, is_directory: bool) -> Result<(), DeleteError> {
    if path.as_os_str().is_empty() {
        return Err(DeleteError::InvalidArgument {
            message: "path must not be empty".to_string(),
        });
    }

    let target = resolve_target(path)?;
    if target.parent().is_none() {
        return Err(DeleteError::Refused {
            path: path.to_path_buf(),
            reason: "filesystem root".to_string(),
        });
    }

    let metadata = fs::symlink_metadata(&target).map_err(|e| DeleteError::io(path, &e))?;
    let on_disk_dir = metadata.file_type().is_dir();

    let removed = match (is_directory, on_disk_dir) {
        (true, true) => fs::remove_dir_all(&target),
        (false, false) => fs::remove_file(&target),
        (true, false) => {
            return Err(DeleteError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        (false, true) => {
            return Err(DeleteError::IsADirectory {
                path: path.to_path_buf(),
            });
        }
    };
    removed.map_err(|e| DeleteError::io(path, &e))
}

/// Resolve `.` and `..` in `path` without following a final symlink.
///
/// The parent is canonicalized and the last component joined back on. A
/// path ending in `..`, `.` or a root has no last component and is
/// canonicalized whole, which can only name a directory.
fn resolve_target(path: &Path) -> Result<PathBuf, DeleteError> {
    let resolved = match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            parent.canonicalize().map(|p| p.join(name))
        }
        _ => path.canonicalize(),
    };
    resolved.map_err(|e| DeleteError::io(path, &e))
}

/// Start an async delete on the blocking pool.
///
/// The receiver yields exactly one outcome.
pub fn start_delete(path: PathBuf, is_directory: bool) -> mpsc::Receiver<DeleteOutcome> {
    let (tx, rx) = mpsc::channel(OPERATION_CHANNEL_SIZE);

    tokio::spawn(async move {
        let target = path.clone();
        let outcome = tokio::task::spawn_blocking(move || delete_entry(&target, is_directory))
            .await
            .unwrap_or_else(|e| {
                DeleteError::Io {
                    path,
                    reason: e.to_string(),
                }
                .into()
            });

        let _ = tx.send(outcome).await;
    });

    rx
}

/// Reflect a delete outcome in the tree.
///
/// On success the entry is excised and returned; ancestor sizes are not
/// recomputed. On failure the tree is left untouched.
pub fn apply_outcome(tree: &mut EntryTree, outcome: &DeleteOutcome) -> Option<Entry> {
    match outcome {
        DeleteOutcome::Deleted { path } => tree.remove(path),
        DeleteOutcome::Failed { .. } => None,
    }
}
