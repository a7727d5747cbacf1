//! Recursive size aggregation for a single directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use jwalk::{Parallelism, WalkDir};
use tokio_util::sync::CancellationToken;

use spacetree_core::{IgnoreMatcher, ScanError, ScanWarning, WarningKind};

use crate::inode::{InodeTracker, device_id};
use crate::progress::ProgressTracker;

/// Totals for one directory subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirSummary {
    /// Sum of all regular file sizes below the directory.
    pub size: u64,
    /// Number of files counted.
    pub files: u64,
    /// Number of directories below this one.
    pub dirs: u64,
    /// Number of listed immediate children.
    pub direct_children: u64,
    /// Why the directory itself could not be listed, if it could not.
    pub unreadable: Option<String>,
    /// Errors absorbed below the directory.
    pub warnings: Vec<ScanWarning>,
}

impl DirSummary {
    fn unreadable(path: &Path, error: &std::io::Error) -> Self {
        Self {
            unreadable: Some(error.to_string()),
            warnings: vec![ScanWarning::read_error(path, error)],
            ..Self::default()
        }
    }

    /// Check whether the whole subtree was read without errors.
    pub fn is_complete(&self) -> bool {
        self.unreadable.is_none() && self.warnings.is_empty()
    }
}

/// Settings shared by every aggregation within one scan call.
pub(crate) struct ScanContext {
    pub matcher: IgnoreMatcher,
    pub inodes: Option<InodeTracker>,
    pub follow_symlinks: bool,
    /// Set when descending into other filesystems is disallowed.
    pub root_device: Option<u64>,
    pub threads: usize,
    pub cancel: CancellationToken,
}

impl ScanContext {
    pub fn file_size(&self, metadata: &std::fs::Metadata) -> u64 {
        match &self.inodes {
            Some(tracker) => tracker.counted_size(metadata),
            None => metadata.len(),
        }
    }

    pub fn check_cancelled(&self) -> Result<(), ScanError> {
        if self.cancel.is_cancelled() {
            Err(ScanError::Interrupted)
        } else {
            Ok(())
        }
    }

    fn parallelism(&self) -> Parallelism {
        match self.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_millis(100),
            },
            n => Parallelism::RayonNewPool(n),
        }
    }
}

/// Sum the sizes of every file below `dir`.
///
/// Entries that cannot be read contribute zero and are recorded as
/// warnings at whatever depth they occur. Only cancellation aborts.
pub(crate) fn aggregate_dir(
    ctx: &ScanContext,
    dir: &Path,
    tracker: &mut ProgressTracker<'_>,
) -> Result<DirSummary, ScanError> {
    if let Err(err) = std::fs::read_dir(dir) {
        tracker.record_error();
        tracing::trace!(path = %dir.display(), error = %err, "directory unreadable");
        return Ok(DirSummary::unreadable(dir, &err));
    }

    let matcher = ctx.matcher.clone();
    let root_device = ctx.root_device;

    let walker = WalkDir::new(dir)
        .parallelism(ctx.parallelism())
        .skip_hidden(false)
        .follow_links(ctx.follow_symlinks)
        .min_depth(1)
        .process_read_dir(move |_depth, _path, _state, children| {
            children.retain(|child| match child {
                Ok(entry) => !matcher.is_ignored(&entry.file_name.to_string_lossy()),
                Err(_) => true,
            });
            if let Some(device) = root_device {
                for entry in children.iter_mut().flatten() {
                    let foreign = entry.file_type.is_dir()
                        && entry
                            .metadata()
                            .map(|m| device_id(&m) != device)
                            .unwrap_or(false);
                    if foreign {
                        entry.read_children_path = None;
                    }
                }
            }
        });

    let mut summary = DirSummary::default();

    for entry_result in walker {
        ctx.check_cancelled()?;

        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| dir.to_path_buf());
                tracker.record_error();
                tracing::trace!(path = %path.display(), error = %err, "read error absorbed");
                summary
                    .warnings
                    .push(ScanWarning::new(path, err.to_string(), WarningKind::ReadError));
                continue;
            }
        };

        if entry.depth() == 1 {
            summary.direct_children += 1;
        }

        let path: PathBuf = entry.path();
        let file_type = entry.file_type();

        if file_type.is_dir() {
            summary.dirs += 1;
            tracker.record_dir(&path);
            if let Some(err) = &entry.read_children_error {
                tracker.record_error();
                let warning = match err.io_error() {
                    Some(io) => ScanWarning::read_error(&path, io),
                    None => ScanWarning::new(&path, err.to_string(), WarningKind::ReadError),
                };
                summary.warnings.push(warning);
            }
            continue;
        }

        // Unfollowed links are opaque and weigh nothing.
        if file_type.is_symlink() {
            continue;
        }

        match entry.metadata() {
            Ok(metadata) => {
                let size = ctx.file_size(&metadata);
                summary.files += 1;
                summary.size += size;
                tracker.record_file(&path, size);
            }
            Err(err) => {
                tracker.record_error();
                summary.warnings.push(ScanWarning::new(
                    &path,
                    err.to_string(),
                    WarningKind::MetadataError,
                ));
            }
        }
    }

    Ok(summary)
}
