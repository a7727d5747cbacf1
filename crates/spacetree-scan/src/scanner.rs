//! Bounded-depth directory scanner.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use compact_str::CompactString;
use tokio_util::sync::CancellationToken;

use spacetree_core::{
    Entry, EntryKind, EntryTree, ScanConfig, ScanError, ScanWarning, SessionId,
};

use crate::aggregate::{DirSummary, ScanContext, aggregate_dir};
use crate::inode::{InodeTracker, device_id};
use crate::progress::{ProgressSink, ProgressTracker, ScanProgress};

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique scan session id.
pub fn next_session() -> SessionId {
    SessionId::new(NEXT_SESSION.fetch_add(1, Ordering::Relaxed))
}

/// One level of a directory, with aggregate sizes for child directories.
#[derive(Debug, Clone)]
pub struct Listing {
    /// Session the listing was produced under.
    pub session: SessionId,
    /// Directory that was listed.
    pub path: PathBuf,
    /// Immediate children, in filesystem order.
    pub entries: Vec<Entry>,
    /// Errors absorbed anywhere below `path`.
    pub warnings: Vec<ScanWarning>,
    /// Final counters of the scan.
    pub progress: ScanProgress,
}

/// Scanner that lists one directory level and sizes every child subtree.
///
/// Child directories come back with their aggregate size and
/// `contents: None`; their own children are only listed when they are
/// scanned in turn.
#[derive(Debug, Clone)]
pub struct Scanner {
    config: ScanConfig,
    cancel: CancellationToken,
}

impl Scanner {
    /// Create a scanner for the given configuration.
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Token that aborts in-flight scans of this scanner.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Scan the configured root into a fresh tree.
    pub fn scan_root(&self, sink: Option<&dyn ProgressSink>) -> Result<EntryTree, ScanError> {
        self.scan_root_as(next_session(), sink)
    }

    /// Scan the configured root under a caller-chosen session.
    pub fn scan_root_as(
        &self,
        session: SessionId,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<EntryTree, ScanError> {
        let start = Instant::now();
        validate_path(&self.config.root)?;

        let root = self
            .config
            .root
            .canonicalize()
            .map_err(|e| ScanError::io(&self.config.root, e))?;

        let listing = self.list(&root, session, sink)?;

        Ok(EntryTree::new(
            root,
            listing.session,
            listing.entries,
            start.elapsed(),
            listing.warnings,
        ))
    }

    /// List the immediate children of `path`.
    pub fn scan_dir(
        &self,
        path: &Path,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<Vec<Entry>, ScanError> {
        self.list(path, next_session(), sink).map(|listing| listing.entries)
    }

    /// Scan `path` without progress and attach the result to `tree`.
    pub fn expand(&self, tree: &mut EntryTree, path: &Path) -> Result<(), ScanError> {
        let listing = self.list(path, next_session(), None)?;
        tree.attach(&listing.path, listing.entries)?;
        tree.warnings.extend(listing.warnings);
        Ok(())
    }

    /// Total size of everything below `path`.
    pub fn aggregate(&self, path: &Path) -> Result<DirSummary, ScanError> {
        let path = self.checked_dir(path)?;
        let ctx = self.context(&path)?;
        let mut tracker = ProgressTracker::new(next_session(), self.config.progress_interval, None);
        aggregate_dir(&ctx, &path, &mut tracker)
    }

    /// List one directory level under an explicit session.
    pub fn list(
        &self,
        path: &Path,
        session: SessionId,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<Listing, ScanError> {
        let path = self.checked_dir(path)?;
        let ctx = self.context(&path)?;
        let read_dir = std::fs::read_dir(&path).map_err(|e| ScanError::io(&path, e))?;

        tracing::debug!(session = %session, path = %path.display(), "scan started");

        let mut tracker = ProgressTracker::new(session, self.config.progress_interval, sink);
        let mut entries = Vec::new();
        let mut warnings = Vec::new();

        for item in read_dir {
            ctx.check_cancelled()?;

            let dir_entry = match item {
                Ok(e) => e,
                Err(err) => {
                    tracker.record_error();
                    warnings.push(ScanWarning::read_error(&path, &err));
                    continue;
                }
            };

            let file_name = dir_entry.file_name();
            let name = CompactString::new(file_name.to_string_lossy());
            if ctx.matcher.is_ignored(&name) {
                continue;
            }

            let listed_kind = dir_entry.file_type().ok().map(listed_kind);
            let entry = self.child_entry(
                &ctx,
                name,
                path.join(&file_name),
                listed_kind,
                &mut tracker,
                &mut warnings,
            )?;
            entries.push(entry);
        }

        let progress = tracker.finish();
        tracing::debug!(
            session = %session,
            files = progress.files_count,
            dirs = progress.dirs_count,
            errors = progress.errors_count,
            elapsed_ms = progress.elapsed.as_millis() as u64,
            "scan finished"
        );

        Ok(Listing {
            session,
            path,
            entries,
            warnings,
            progress,
        })
    }

    fn child_entry(
        &self,
        ctx: &ScanContext,
        name: CompactString,
        path: PathBuf,
        listed_kind: Option<EntryKind>,
        tracker: &mut ProgressTracker<'_>,
        warnings: &mut Vec<ScanWarning>,
    ) -> Result<Entry, ScanError> {
        let metadata = match std::fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(err) => {
                tracker.record_error();
                warnings.push(ScanWarning::metadata(&path, &err));
                let kind = listed_kind.unwrap_or(EntryKind::File);
                return Ok(Entry::inaccessible(name, path, kind, err.to_string()));
            }
        };

        let file_type = metadata.file_type();

        if file_type.is_symlink() {
            if self.config.follow_symlinks && path.is_dir() {
                tracker.record_dir(&path);
                return self.directory_entry(ctx, name, path, tracker, warnings);
            }
            let target = std::fs::read_link(&path)
                .map(|p| CompactString::new(p.to_string_lossy()))
                .unwrap_or_default();
            return Ok(Entry::symlink(name, path, target));
        }

        if file_type.is_dir() {
            tracker.record_dir(&path);
            if ctx.root_device.is_some_and(|device| device != device_id(&metadata)) {
                return Ok(Entry::directory(name, path, 0, false).with_error("On another filesystem"));
            }
            return self.directory_entry(ctx, name, path, tracker, warnings);
        }

        let size = ctx.file_size(&metadata);
        tracker.record_file(&path, size);
        Ok(Entry::file(name, path, size))
    }

    fn directory_entry(
        &self,
        ctx: &ScanContext,
        name: CompactString,
        path: PathBuf,
        tracker: &mut ProgressTracker<'_>,
        warnings: &mut Vec<ScanWarning>,
    ) -> Result<Entry, ScanError> {
        let summary = aggregate_dir(ctx, &path, tracker)?;
        warnings.extend(summary.warnings.iter().cloned());

        if let Some(reason) = summary.unreadable {
            return Ok(Entry::inaccessible(name, path, EntryKind::Directory, reason));
        }

        let entry = Entry::directory(name, path, summary.size, summary.direct_children > 0);
        Ok(match summary.warnings.len() {
            0 => entry,
            1 => entry.with_error("1 entry could not be read"),
            n => entry.with_error(format!("{n} entries could not be read")),
        })
    }

    /// Validate and resolve a directory argument.
    fn checked_dir(&self, path: &Path) -> Result<PathBuf, ScanError> {
        validate_path(path)?;
        let path = std::path::absolute(path).map_err(|e| ScanError::io(path, e))?;
        let metadata = std::fs::metadata(&path).map_err(|e| ScanError::io(&path, e))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory { path });
        }
        Ok(path)
    }

    fn context(&self, dir: &Path) -> Result<ScanContext, ScanError> {
        let root_device = if self.config.cross_filesystems {
            None
        } else {
            let metadata = std::fs::metadata(dir).map_err(|e| ScanError::io(dir, e))?;
            Some(device_id(&metadata))
        };

        Ok(ScanContext {
            matcher: self.config.ignore_matcher()?,
            inodes: self.config.dedupe_hardlinks.then(InodeTracker::new),
            follow_symlinks: self.config.follow_symlinks,
            root_device,
            threads: self.config.threads,
            cancel: self.cancel.clone(),
        })
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

/// Kind reported by the directory listing, used when the entry can no longer be stat'ed.
fn listed_kind(file_type: std::fs::FileType) -> EntryKind {
    if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_symlink() {
        EntryKind::Symlink {
            target: CompactString::default(),
        }
    } else {
        EntryKind::File
    }
}

/// Reject arguments that can never name a directory.
fn validate_path(path: &Path) -> Result<(), ScanError> {
    if path.as_os_str().is_empty() {
        return Err(ScanError::invalid_argument("path must not be empty"));
    }
    if path.as_os_str().as_encoded_bytes().contains(&0) {
        return Err(ScanError::invalid_argument("path must not contain NUL"));
    }
    Ok(())
}
