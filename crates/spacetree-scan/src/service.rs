//! Background scans with session identity and cancellation.

use std::path::PathBuf;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use spacetree_core::{Entry, EntryTree, ScanConfig, ScanError, SessionId};

use crate::SCAN_CHANNEL_SIZE;
use crate::progress::{ProgressSink, ScanProgress};
use crate::scanner::{Scanner, next_session};

/// Event delivered by a background scan.
///
/// Every scan emits zero or more `Progress` events followed by exactly one
/// terminal event.
#[derive(Debug)]
pub enum ScanEvent {
    /// Sampled progress counters.
    Progress(ScanProgress),
    /// A root scan finished.
    Root {
        session: SessionId,
        result: Result<EntryTree, ScanError>,
    },
    /// A single directory expansion finished.
    Expanded {
        session: SessionId,
        path: PathBuf,
        result: Result<Vec<Entry>, ScanError>,
    },
}

impl ScanEvent {
    /// Session this event belongs to.
    pub fn session(&self) -> SessionId {
        match self {
            Self::Progress(progress) => progress.session,
            Self::Root { session, .. } | Self::Expanded { session, .. } => *session,
        }
    }

    /// Check whether this is the last event of its scan.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}

/// Handle to one in-flight background scan.
#[derive(Debug)]
pub struct ScanHandle {
    /// Session of the scan.
    pub session: SessionId,
    /// Event stream; closes after the terminal event.
    pub events: mpsc::Receiver<ScanEvent>,
    cancel: CancellationToken,
}

impl ScanHandle {
    /// Request best-effort cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the terminal event, discarding progress.
    pub async fn finish(mut self) -> Option<ScanEvent> {
        while let Some(event) = self.events.recv().await {
            if event.is_terminal() {
                return Some(event);
            }
        }
        None
    }
}

/// Progress sink that forwards into a scan's event channel without blocking.
struct EventSink(mpsc::Sender<ScanEvent>);

impl ProgressSink for EventSink {
    fn report(&self, progress: &ScanProgress) {
        let _ = self.0.try_send(ScanEvent::Progress(progress.clone()));
    }
}

/// Runs scans on the blocking pool and tracks which root scan is current.
///
/// Starting a new root scan cancels the previous one; callers use
/// [`ScanService::is_current`] to drop events from superseded sessions.
/// Methods that start scans must be called inside a tokio runtime.
#[derive(Debug)]
pub struct ScanService {
    config: ScanConfig,
    current: Mutex<Option<(SessionId, CancellationToken)>>,
}

impl ScanService {
    /// Create a service; the config's root is replaced per scan.
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            current: Mutex::new(None),
        }
    }

    /// Start scanning a new root, superseding any running root scan.
    pub fn start_root_scan(&self, root: PathBuf) -> ScanHandle {
        let session = next_session();
        let cancel = CancellationToken::new();

        if let Ok(mut current) = self.current.lock() {
            if let Some((previous, token)) = current.replace((session, cancel.clone())) {
                tracing::debug!(session = %previous, "superseded root scan cancelled");
                token.cancel();
            }
        }

        let scanner = Scanner::new(self.config.with_root(root)).with_cancellation(cancel.clone());
        let (tx, rx) = mpsc::channel(SCAN_CHANNEL_SIZE);

        tokio::spawn(async move {
            let sink = EventSink(tx.clone());
            let result = tokio::task::spawn_blocking(move || scanner.scan_root_as(session, Some(&sink)))
                .await
                .unwrap_or_else(|e| {
                    Err(ScanError::Other {
                        message: e.to_string(),
                    })
                });

            let _ = tx.send(ScanEvent::Root { session, result }).await;
        });

        ScanHandle {
            session,
            events: rx,
            cancel,
        }
    }

    /// Start listing one directory for lazy expansion.
    ///
    /// Progress events are only emitted when `with_progress` is set. The
    /// expansion is cancelled along with the root scan that is current
    /// when it starts.
    pub fn start_expand(&self, path: PathBuf, with_progress: bool) -> ScanHandle {
        let session = next_session();
        let cancel = self
            .current
            .lock()
            .ok()
            .and_then(|current| current.as_ref().map(|(_, token)| token.child_token()))
            .unwrap_or_default();

        let scanner = Scanner::new(self.config.with_root(&path)).with_cancellation(cancel.clone());
        let (tx, rx) = mpsc::channel(SCAN_CHANNEL_SIZE);

        tokio::spawn(async move {
            let sink = EventSink(tx.clone());
            let scan_path = path.clone();
            let result = tokio::task::spawn_blocking(move || {
                let sink = with_progress.then_some(&sink as &dyn ProgressSink);
                scanner
                    .list(&scan_path, session, sink)
                    .map(|listing| listing.entries)
            })
            .await
            .unwrap_or_else(|e| {
                Err(ScanError::Other {
                    message: e.to_string(),
                })
            });

            let _ = tx
                .send(ScanEvent::Expanded {
                    session,
                    path,
                    result,
                })
                .await;
        });

        ScanHandle {
            session,
            events: rx,
            cancel,
        }
    }

    /// Check whether `session` is the most recent root scan.
    pub fn is_current(&self, session: SessionId) -> bool {
        self.current
            .lock()
            .map(|current| current.as_ref().is_some_and(|(id, _)| *id == session))
            .unwrap_or(false)
    }

    /// Cancel the current root scan, if any.
    pub fn cancel_current(&self) {
        if let Ok(current) = self.current.lock() {
            if let Some((_, token)) = current.as_ref() {
                token.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        for i in 0..60 {
            fs::write(temp.path().join(format!("sub/f{i}")), [0u8; 2]).unwrap();
        }
        temp
    }

    #[tokio::test]
    async fn test_root_scan_events() {
        let temp = fixture();
        let service = ScanService::new(ScanConfig::default());
        let mut handle = service.start_root_scan(temp.path().to_path_buf());
        let session = handle.session;
        assert!(service.is_current(session));

        let mut events = Vec::new();
        while let Some(event) = handle.events.recv().await {
            events.push(event);
        }

        let (last, progress) = events.split_last().unwrap();
        assert!(progress.iter().all(|e| !e.is_terminal() && e.session() == session));
        match last {
            ScanEvent::Root { result, .. } => {
                let tree = result.as_ref().unwrap();
                assert_eq!(tree.session, session);
                assert_eq!(tree.total_size(), 120);
            }
            other => panic!("unexpected terminal event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_new_root_supersedes_old() {
        let temp = fixture();
        let service = ScanService::new(ScanConfig::default());
        let first = service.start_root_scan(temp.path().to_path_buf());
        let second = service.start_root_scan(temp.path().to_path_buf());

        assert!(!service.is_current(first.session));
        assert!(service.is_current(second.session));
        assert!(first.cancel.is_cancelled());

        match second.finish().await {
            Some(ScanEvent::Root { result, .. }) => assert!(result.is_ok()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_expand_without_progress() {
        let temp = fixture();
        let service = ScanService::new(ScanConfig::default());
        let mut handle = service.start_expand(temp.path().join("sub"), false);

        let first = handle.events.recv().await.unwrap();
        assert!(first.is_terminal());
        match first {
            ScanEvent::Expanded { result, path, .. } => {
                assert_eq!(path, temp.path().join("sub"));
                assert_eq!(result.unwrap().len(), 60);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_scan_reports_interrupted() {
        let temp = fixture();
        let service = ScanService::new(ScanConfig::default());
        let handle = service.start_root_scan(temp.path().to_path_buf());
        service.cancel_current();

        match handle.finish().await {
            Some(ScanEvent::Root { result, .. }) => {
                // The scan may have finished before the cancel landed.
                assert!(matches!(result, Ok(_) | Err(ScanError::Interrupted)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
