//! Reveal a path in the platform file manager.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

/// Open the system file manager at `path`.
///
/// Returns whether the file manager was launched. The child is reaped on a
/// detached thread, so the caller never waits on it.
pub fn reveal(path: &Path) -> bool {
    if path.as_os_str().is_empty() {
        return false;
    }

    match spawn_reaped(reveal_command(path)) {
        Ok(_) => true,
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "could not launch file manager");
            false
        }
    }
}

/// Spawn `cmd` with null stdio and wait for it on a background thread.
fn spawn_reaped(mut cmd: Command) -> std::io::Result<JoinHandle<Option<ExitStatus>>> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(std::thread::spawn(move || child.wait().ok()))
}

#[cfg(target_os = "macos")]
fn reveal_command(path: &Path) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg("-R").arg(path);
    cmd
}

#[cfg(target_os = "windows")]
fn reveal_command(path: &Path) -> Command {
    let mut select = std::ffi::OsString::from("/select,");
    select.push(path);
    let mut cmd = Command::new("explorer");
    cmd.arg(select);
    cmd
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn reveal_command(path: &Path) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(open_target(path));
    cmd
}

/// Directory to open for `path`: itself if it is one, else its parent.
#[cfg_attr(any(target_os = "macos", target_os = "windows"), allow(dead_code))]
fn open_target(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.to_path_buf()
    } else {
        path.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| path.to_path_buf(), Path::to_path_buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_path_not_revealed() {
        assert!(!reveal(Path::new("")));
    }

    #[cfg(unix)]
    #[test]
    fn test_launched_child_is_reaped() {
        let reaper = spawn_reaped(Command::new("true")).unwrap();
        let status = reaper.join().unwrap();
        assert!(status.is_some_and(|s| s.success()));
    }

    #[test]
    fn test_missing_program_not_launched() {
        assert!(spawn_reaped(Command::new("spacetree-no-such-program")).is_err());
    }

    #[test]
    fn test_open_target() {
        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("f");
        std::fs::write(&file, "x").unwrap();

        assert_eq!(open_target(temp.path()), temp.path());
        assert_eq!(open_target(&file), temp.path());
    }
}
