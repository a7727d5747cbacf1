//! Error types for scanning and tree mutation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort a scan call.
///
/// Per-entry failures never show up here; they are absorbed into
/// inaccessible entries and [`ScanWarning`]s.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The caller passed an argument that violates the contract
    /// (for example an empty path). Raised before any filesystem access.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Scan was cancelled before it completed.
    #[error("Scan interrupted")]
    Interrupted,

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Scanned path is not a directory.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Scan result could not be applied to the tree.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Check whether this error is a contract violation by the caller.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. } | Self::InvalidConfig { .. })
    }
}

/// Errors raised by tree store mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// No materialized node has this path.
    #[error("No entry at {path}")]
    NotFound { path: PathBuf },

    /// The node exists but cannot take children.
    #[error("Entry cannot be expanded: {path}")]
    NotExpandable { path: PathBuf },
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Entry disappeared between listing and stat.
    Vanished,
    /// Error reading a directory.
    ReadError,
    /// Error reading metadata.
    MetadataError,
}

impl WarningKind {
    /// Classify an I/O error.
    pub fn from_io(error: &std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            std::io::ErrorKind::NotFound => Self::Vanished,
            _ => Self::MetadataError,
        }
    }
}

/// Non-fatal error absorbed during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a warning from a failed metadata read.
    pub fn metadata(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self::new(path, error.to_string(), WarningKind::from_io(error))
    }

    /// Create a warning from a failed directory read.
    pub fn read_error(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let kind = match WarningKind::from_io(error) {
            WarningKind::MetadataError => WarningKind::ReadError,
            other => other,
        };
        Self::new(path, error.to_string(), kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_io() {
        let err = ScanError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, ScanError::PermissionDenied { .. }));

        let err = ScanError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, ScanError::NotFound { .. }));
    }

    #[test]
    fn test_contract_violation() {
        assert!(ScanError::invalid_argument("empty path").is_contract_violation());
        assert!(!ScanError::Interrupted.is_contract_violation());
    }

    #[test]
    fn test_read_error_kind() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(
            ScanWarning::read_error("/x", &denied).kind,
            WarningKind::PermissionDenied
        );

        let other = std::io::Error::other("boom");
        assert_eq!(ScanWarning::read_error("/x", &other).kind, WarningKind::ReadError);
        assert_eq!(ScanWarning::metadata("/x", &other).kind, WarningKind::MetadataError);
    }
}
