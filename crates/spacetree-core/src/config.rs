//! Scan configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Default number of files between two sampled progress events.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 50;

/// Configuration for scanning operations.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to scan.
    pub root: PathBuf,

    /// Follow symbolic links into directories.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Descend into directories that live on another filesystem.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub cross_filesystems: bool,

    /// Count a multiply-linked file only once per scan call.
    #[builder(default = "false")]
    #[serde(default)]
    pub dedupe_hardlinks: bool,

    /// Patterns to ignore (glob syntax, matched against base names).
    #[builder(default)]
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Number of threads for directory reading (0 = automatic).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,

    /// Include hidden files (starting with .).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,

    /// Emit a progress event every this many files.
    #[builder(default = "DEFAULT_PROGRESS_INTERVAL")]
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_true() -> bool {
    true
}

fn default_progress_interval() -> u64 {
    DEFAULT_PROGRESS_INTERVAL
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Root path cannot be empty".to_string());
            }
            None => return Err("Root path is required".to_string()),
            _ => {}
        }
        if self.progress_interval == Some(0) {
            return Err("Progress interval must be positive".to_string());
        }
        if let Some(ref patterns) = self.ignore_patterns {
            for pattern in patterns {
                Glob::new(pattern).map_err(|e| format!("Bad ignore pattern {pattern:?}: {e}"))?;
            }
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for scanning a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_symlinks: false,
            cross_filesystems: true,
            dedupe_hardlinks: false,
            ignore_patterns: Vec::new(),
            threads: 0,
            include_hidden: true,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Copy of this config pointed at another root.
    pub fn with_root(&self, root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..self.clone()
        }
    }

    /// Compile the ignore patterns into a matcher.
    pub fn ignore_matcher(&self) -> Result<IgnoreMatcher, ScanError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.ignore_patterns {
            let glob = Glob::new(pattern).map_err(|e| ScanError::InvalidConfig {
                message: format!("bad ignore pattern {pattern:?}: {e}"),
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| ScanError::InvalidConfig {
            message: e.to_string(),
        })?;
        Ok(IgnoreMatcher {
            set,
            include_hidden: self.include_hidden,
        })
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Compiled name filter derived from a [`ScanConfig`].
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    set: GlobSet,
    include_hidden: bool,
}

impl IgnoreMatcher {
    /// Check if an entry with this base name should be skipped.
    pub fn is_ignored(&self, name: &str) -> bool {
        (!self.include_hidden && name.starts_with('.')) || self.set.is_match(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ScanConfig::builder()
            .root("/home/user")
            .threads(4usize)
            .follow_symlinks(true)
            .build()
            .unwrap();

        assert_eq!(config.root, PathBuf::from("/home/user"));
        assert_eq!(config.threads, 4);
        assert!(config.follow_symlinks);
        assert_eq!(config.progress_interval, DEFAULT_PROGRESS_INTERVAL);
    }

    #[test]
    fn test_builder_rejects_bad_input() {
        assert!(ScanConfig::builder().root("").build().is_err());
        assert!(ScanConfig::builder().build().is_err());
        assert!(
            ScanConfig::builder()
                .root("/x")
                .progress_interval(0u64)
                .build()
                .is_err()
        );
        assert!(
            ScanConfig::builder()
                .root("/x")
                .ignore_patterns(vec!["a[".to_string()])
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_ignore_matcher() {
        let config = ScanConfig::builder()
            .root("/test")
            .ignore_patterns(vec!["node_modules".to_string(), "*.log".to_string()])
            .build()
            .unwrap();
        let matcher = config.ignore_matcher().unwrap();

        assert!(matcher.is_ignored("node_modules"));
        assert!(matcher.is_ignored("test.log"));
        assert!(!matcher.is_ignored("src"));
        assert!(!matcher.is_ignored(".git"));
    }

    #[test]
    fn test_hidden_exclusion() {
        let mut config = ScanConfig::new("/test");
        config.include_hidden = false;
        let matcher = config.ignore_matcher().unwrap();
        assert!(matcher.is_ignored(".git"));
        assert!(!matcher.is_ignored("src"));
    }

    #[test]
    fn test_with_root() {
        let config = ScanConfig::builder()
            .root("/a")
            .include_hidden(false)
            .build()
            .unwrap();
        let moved = config.with_root("/b");
        assert_eq!(moved.root, PathBuf::from("/b"));
        assert!(!moved.include_hidden);
    }
}
