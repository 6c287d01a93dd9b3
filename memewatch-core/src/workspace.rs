//! Scratch workspaces for subprocess I/O.
//!
//! Every fingerprinting entry point acquires exactly one workspace: a uniquely
//! named directory under the system temp root that holds extracted frames,
//! audio files, and other intermediates. The directory is removed on every
//! exit path; removal failures are logged and swallowed so cleanup can never
//! mask the primary operation's result.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{CoreError, Result};

/// An ephemeral scratch directory, removed when the workspace is closed or
/// dropped.
pub struct Workspace {
    dir: Option<TempDir>,
}

impl Workspace {
    /// Create a fresh workspace under the system temp root.
    ///
    /// Failure to create the directory (disk full, permissions) is fatal to
    /// the calling fingerprint operation.
    pub fn acquire() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("memewatch-")
            .tempdir()
            .map_err(|e| CoreError::Workspace(format!("unable to create scratch dir: {e}")))?;

        debug!(path = %dir.path().display(), "acquired workspace");
        Ok(Self { dir: Some(dir) })
    }

    /// Path of the workspace directory.
    pub fn path(&self) -> &Path {
        // `dir` is only None after `close`, which consumes self.
        self.dir
            .as_ref()
            .map(TempDir::path)
            .unwrap_or_else(|| Path::new(""))
    }

    /// Path of a file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    /// Create a subdirectory inside the workspace and return its path.
    pub fn subdir(&self, name: &str) -> Result<PathBuf> {
        let path = self.path().join(name);
        std::fs::create_dir(&path).map_err(|e| {
            CoreError::Workspace(format!(
                "unable to create workspace subdir {}: {e}",
                path.display()
            ))
        })?;
        Ok(path)
    }

    /// Release the workspace, deleting it recursively.
    ///
    /// Best-effort: failures are logged, never returned.
    pub fn close(mut self) {
        if let Some(dir) = self.dir.take() {
            release(dir);
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            release(dir);
        }
    }
}

fn release(dir: TempDir) {
    let path = dir.path().to_path_buf();
    if let Err(err) = dir.close() {
        warn!(path = %path.display(), error = %err, "failed to remove workspace");
    } else {
        debug!(path = %path.display(), "released workspace");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_creates_directory() {
        let ws = Workspace::acquire().unwrap();
        assert!(ws.path().is_dir());
        assert!(ws
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("memewatch-"));
    }

    #[test]
    fn test_close_removes_directory() {
        let ws = Workspace::acquire().unwrap();
        let path = ws.path().to_path_buf();
        ws.close();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let path = {
            let ws = Workspace::acquire().unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_removed_on_panic() {
        let ws = Workspace::acquire().unwrap();
        let path = ws.path().to_path_buf();

        let result = std::panic::catch_unwind(move || {
            let _ws = ws;
            panic!("boom");
        });

        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_subdir_and_file() {
        let ws = Workspace::acquire().unwrap();
        let sub = ws.subdir("frames").unwrap();
        assert!(sub.is_dir());
        assert_eq!(ws.file("a.png"), ws.path().join("a.png"));
    }

    #[test]
    fn test_two_workspaces_are_distinct() {
        let a = Workspace::acquire().unwrap();
        let b = Workspace::acquire().unwrap();
        assert_ne!(a.path(), b.path());
    }
}
