//! Scan progress reporting.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};

use spacetree_core::SessionId;

/// Progress information during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanProgress {
    /// Scan call this event belongs to.
    pub session: SessionId,
    /// Number of files visited so far.
    pub files_count: u64,
    /// Number of directories visited so far.
    pub dirs_count: u64,
    /// Total bytes counted so far.
    pub bytes_count: u64,
    /// Path most recently touched.
    pub current_path: PathBuf,
    /// Number of errors absorbed so far.
    pub errors_count: u64,
    /// Time elapsed since the scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            files_count: 0,
            dirs_count: 0,
            bytes_count: 0,
            current_path: PathBuf::new(),
            errors_count: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Calculate scan rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_count as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Get total items visited (files + dirs).
    pub fn total_items(&self) -> u64 {
        self.files_count + self.dirs_count
    }
}

/// Receiver of progress events.
///
/// Implementations must not block: a scan calls `report` from its own
/// thread and keeps going as soon as it returns.
pub trait ProgressSink: Send + Sync {
    /// Handle one progress event.
    fn report(&self, progress: &ScanProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(&ScanProgress) + Send + Sync,
{
    fn report(&self, progress: &ScanProgress) {
        self(progress)
    }
}

/// Lossy: a full channel drops the event instead of stalling the scan.
impl ProgressSink for mpsc::Sender<ScanProgress> {
    fn report(&self, progress: &ScanProgress) {
        let _ = self.try_send(progress.clone());
    }
}

impl ProgressSink for broadcast::Sender<ScanProgress> {
    fn report(&self, progress: &ScanProgress) {
        let _ = self.send(progress.clone());
    }
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct ProgressLog {
    events: Mutex<Vec<ScanProgress>>,
}

impl ProgressLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the recorded events.
    pub fn take(&self) -> Vec<ScanProgress> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }
}

impl ProgressSink for ProgressLog {
    fn report(&self, progress: &ScanProgress) {
        if let Ok(mut events) = self.events.lock() {
            events.push(progress.clone());
        }
    }
}

/// Running counters for one scan call, with the sampling policy.
///
/// Reports on every directory visited and on every `interval`-th file.
pub(crate) struct ProgressTracker<'a> {
    start_time: Instant,
    interval: u64,
    sink: Option<&'a dyn ProgressSink>,
    state: ScanProgress,
    last_reported: Option<(u64, u64)>,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(session: SessionId, interval: u64, sink: Option<&'a dyn ProgressSink>) -> Self {
        Self {
            start_time: Instant::now(),
            interval: interval.max(1),
            sink,
            state: ScanProgress::new(session),
            last_reported: None,
        }
    }

    pub fn record_file(&mut self, path: &Path, size: u64) {
        self.state.files_count += 1;
        self.state.bytes_count += size;
        self.touch(path);
        if self.state.files_count % self.interval == 0 {
            self.emit();
        }
    }

    pub fn record_dir(&mut self, path: &Path) {
        self.state.dirs_count += 1;
        self.touch(path);
        self.emit();
    }

    pub fn record_error(&mut self) {
        self.state.errors_count += 1;
    }

    /// Emit the final totals unless the last event already carried them.
    pub fn finish(mut self) -> ScanProgress {
        let totals = (self.state.files_count, self.state.dirs_count);
        if totals != (0, 0) && self.last_reported != Some(totals) {
            self.emit();
        }
        self.snapshot()
    }

    pub fn snapshot(&self) -> ScanProgress {
        ScanProgress {
            elapsed: self.start_time.elapsed(),
            ..self.state.clone()
        }
    }

    fn touch(&mut self, path: &Path) {
        self.state.current_path.clear();
        self.state.current_path.push(path);
    }

    fn emit(&mut self) {
        self.last_reported = Some((self.state.files_count, self.state.dirs_count));
        if let Some(sink) = self.sink {
            sink.report(&self.snapshot());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_sampling() {
        let log = ProgressLog::new();
        let mut tracker = ProgressTracker::new(SessionId::new(1), 50, Some(&log));
        for i in 0..120 {
            tracker.record_file(Path::new(&format!("/r/{i}")), 1);
        }
        let last = tracker.finish();

        let counts: Vec<_> = log.take().iter().map(|p| p.files_count).collect();
        assert_eq!(counts, [50, 100, 120]);
        assert_eq!(last.files_count, 120);
        assert_eq!(last.bytes_count, 120);
    }

    #[test]
    fn test_every_directory_reported() {
        let log = ProgressLog::new();
        let mut tracker = ProgressTracker::new(SessionId::new(1), 50, Some(&log));
        tracker.record_dir(Path::new("/r/a"));
        tracker.record_file(Path::new("/r/a/f"), 3);
        tracker.record_dir(Path::new("/r/b"));
        tracker.finish();

        let events = log.take();
        let dirs: Vec<_> = events.iter().map(|p| p.dirs_count).collect();
        assert_eq!(dirs, [1, 2]);
        assert_eq!(events[1].files_count, 1);
        assert_eq!(events[1].current_path, PathBuf::from("/r/b"));
    }

    #[test]
    fn test_no_duplicate_final_event() {
        let log = ProgressLog::new();
        let mut tracker = ProgressTracker::new(SessionId::new(1), 2, Some(&log));
        tracker.record_file(Path::new("/r/a"), 1);
        tracker.record_file(Path::new("/r/b"), 1);
        tracker.finish();
        assert_eq!(log.take().len(), 1);
    }

    #[test]
    fn test_empty_scan_is_silent() {
        let log = ProgressLog::new();
        let tracker = ProgressTracker::new(SessionId::new(1), 50, Some(&log));
        let last = tracker.finish();
        assert!(log.take().is_empty());
        assert_eq!(last.total_items(), 0);
    }

    #[test]
    fn test_mpsc_sink_drops_when_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let progress = ScanProgress::new(SessionId::new(3));
        tx.report(&progress);
        tx.report(&progress);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
