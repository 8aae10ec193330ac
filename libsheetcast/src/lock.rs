//! Invocation lock
//!
//! A trigger that fires while a previous sweep is still running must not
//! process the same rows twice. The lock is a plain file created with
//! `create_new`; it is removed when the guard drops. A lock older than the
//! configured staleness window is assumed to belong to a crashed invocation
//! and is replaced.
//!
//! Each guard writes a random token into the file and only removes a file
//! that still carries it, so a slow invocation whose lock was replaced does
//! not delete its successor's lock.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

use crate::error::{Result, SheetcastError};

/// Held lock; the file is removed on drop
#[derive(Debug)]
pub struct InvocationLock {
    path: PathBuf,
    token: String,
}

impl InvocationLock {
    /// Acquire the lock at `path`
    ///
    /// # Errors
    ///
    /// Returns `SheetcastError::Locked` when a fresh lock file already exists,
    /// and `SheetcastError::InvalidInput` when the file cannot be created.
    pub fn acquire(path: &Path, stale_after: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    SheetcastError::InvalidInput(format!(
                        "cannot create lock directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        match Self::create(path) {
            Ok(lock) => Ok(lock),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if !is_stale(path, stale_after) {
                    return Err(SheetcastError::Locked(format!(
                        "lock file {} is held by another invocation",
                        path.display()
                    )));
                }
                warn!("Replacing stale lock file {}", path.display());
                // Someone else may remove it first; only creation below counts
                let _ = fs::remove_file(path);
                Self::create(path).map_err(|e| match e.kind() {
                    ErrorKind::AlreadyExists => SheetcastError::Locked(format!(
                        "lock file {} is held by another invocation",
                        path.display()
                    )),
                    _ => lock_io_error(path, e),
                })
            }
            Err(e) => Err(lock_io_error(path, e)),
        }
    }

    fn create(path: &Path) -> std::io::Result<Self> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        writeln!(
            file,
            "pid={} started={} token={}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339(),
            token
        )?;
        debug!("Acquired lock {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            token,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file on disk is still this guard's
    fn owns_file(&self) -> bool {
        fs::read_to_string(&self.path)
            .map(|content| content.contains(&format!("token={}", self.token)))
            .unwrap_or(false)
    }
}

impl Drop for InvocationLock {
    fn drop(&mut self) {
        if !self.owns_file() {
            warn!(
                "Lock file {} was taken over by another invocation, leaving it",
                self.path.display()
            );
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to remove lock file {}: {}", self.path.display(), e);
        } else {
            debug!("Released lock {}", self.path.display());
        }
    }
}

fn is_stale(path: &Path, stale_after: Duration) -> bool {
    let modified = match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => modified,
        // Vanished between create_new and now
        Err(_) => return true,
    };
    SystemTime::now()
        .duration_since(modified)
        .map(|age| age > stale_after)
        .unwrap_or(false)
}

fn lock_io_error(path: &Path, error: std::io::Error) -> SheetcastError {
    SheetcastError::InvalidInput(format!("cannot create lock file {}: {}", path.display(), error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_acquire_and_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sweep.lock");

        let lock = InvocationLock::acquire(&path, HOUR).unwrap();
        assert!(path.exists());
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains(&format!("pid={}", std::process::id())));

        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn test_held_lock_blocks_second_acquire() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sweep.lock");

        let _held = InvocationLock::acquire(&path, HOUR).unwrap();
        let err = InvocationLock::acquire(&path, HOUR).unwrap_err();
        assert!(matches!(err, SheetcastError::Locked(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_stale_lock_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sweep.lock");
        fs::write(&path, "pid=1 started=long ago\n").unwrap();

        std::thread::sleep(Duration::from_millis(20));
        let lock = InvocationLock::acquire(&path, Duration::from_millis(1)).unwrap();
        let content = fs::read_to_string(lock.path()).unwrap();
        assert!(content.contains(&format!("pid={}", std::process::id())));
    }

    #[test]
    fn test_replaced_lock_survives_previous_holder_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sweep.lock");

        let old = InvocationLock::acquire(&path, HOUR).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        let new = InvocationLock::acquire(&path, Duration::from_millis(1)).unwrap();

        drop(old);
        assert!(path.exists());
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains(&format!("token={}", new.token)));

        let err = InvocationLock::acquire(&path, HOUR).unwrap_err();
        assert!(matches!(err, SheetcastError::Locked(_)));

        drop(new);
        assert!(!path.exists());
    }

    #[test]
    fn test_tokens_differ_between_guards() {
        let dir = TempDir::new().unwrap();
        let first = InvocationLock::acquire(&dir.path().join("a.lock"), HOUR).unwrap();
        let second = InvocationLock::acquire(&dir.path().join("b.lock"), HOUR).unwrap();
        assert_ne!(first.token, second.token);
        assert_eq!(first.token.len(), 32);
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("sweep.lock");
        let _lock = InvocationLock::acquire(&path, HOUR).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_reacquire_after_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sweep.lock");
        drop(InvocationLock::acquire(&path, HOUR).unwrap());
        assert!(InvocationLock::acquire(&path, HOUR).is_ok());
    }
}
