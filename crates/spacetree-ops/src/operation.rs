//! Deletion outcome and error types.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a deletion did not happen (or did not complete).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum DeleteError {
    /// The request was malformed; nothing was touched.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Nothing exists at the path.
    #[error("Not found: {path}")]
    NotFound { path: PathBuf },

    /// Asked to delete a directory, found something else.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Asked to delete a file, found a directory.
    #[error("Is a directory: {path}")]
    IsADirectory { path: PathBuf },

    /// The path is one we never delete.
    #[error("Refusing to delete {path}: {reason}")]
    Refused { path: PathBuf, reason: String },

    /// The filesystem rejected the removal.
    #[error("Failed to delete {path}: {reason}")]
    Io { path: PathBuf, reason: String },
}

impl DeleteError {
    /// Create an I/O failure with the OS reason.
    pub fn io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path = path.into();
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io {
                path,
                reason: error.to_string(),
            },
        }
    }

    /// Path the error refers to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::InvalidArgument { .. } => None,
            Self::NotFound { path }
            | Self::NotADirectory { path }
            | Self::IsADirectory { path }
            | Self::Refused { path, .. }
            | Self::Io { path, .. } => Some(path),
        }
    }
}

/// Result of a delete request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// The path and, for directories, everything below it is gone.
    Deleted { path: PathBuf },
    /// Nothing was deleted, or the deletion stopped part way.
    Failed { error: DeleteError },
}

impl DeleteOutcome {
    /// Check if the deletion succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Deleted { .. })
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&DeleteError> {
        match self {
            Self::Deleted { .. } => None,
            Self::Failed { error } => Some(error),
        }
    }
}

impl From<DeleteError> for DeleteOutcome {
    fn from(error: DeleteError) -> Self {
        Self::Failed { error }
    }
}

impl std::fmt::Display for DeleteOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deleted { path } => write!(f, "Deleted {}", path.display()),
            Self::Failed { error } => write!(f, "{error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mapping() {
        let gone = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(DeleteError::io("/x", &gone), DeleteError::NotFound { .. }));

        let busy = std::io::Error::other("resource busy");
        let err = DeleteError::io("/x", &busy);
        assert!(err.to_string().contains("resource busy"));
        assert_eq!(err.path(), Some(Path::new("/x")));
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome: DeleteOutcome = DeleteError::InvalidArgument {
            message: "empty path".to_string(),
        }
        .into();
        assert!(!outcome.is_success());

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
    }
}
