use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Name of the lock file at the workspace root
pub const LOCK_FILE: &str = ".lock";

/// How long a writer waits for another adq process by default
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(5);

const RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Exclusive advisory lock on a workspace, held while collection documents
/// are written. Released on drop.
///
/// The lock file itself is never removed: unlinking it would let a later
/// writer lock a fresh inode while a waiter still holds the old one.
pub struct WorkspaceLock {
    _file: File,
    path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not open lock file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("workspace is busy: {path} is held by another adq process")]
    Busy { path: PathBuf },
}

impl WorkspaceLock {
    /// Take the lock, retrying until `wait` has elapsed
    pub fn acquire(root: &Path, wait: Duration) -> Result<Self, LockError> {
        let path = root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| LockError::Open {
                path: path.clone(),
                source: e,
            })?;

        let deadline = Instant::now() + wait;
        while try_lock(&file).is_err() {
            if Instant::now() >= deadline {
                return Err(LockError::Busy { path });
            }
            std::thread::sleep(RETRY_INTERVAL);
        }
        tracing::debug!(path = %path.display(), "workspace lock acquired");
        Ok(WorkspaceLock { _file: file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn acquire_default(root: &Path) -> Result<Self, LockError> {
        Self::acquire(root, DEFAULT_LOCK_WAIT)
    }
}

#[cfg(unix)]
fn try_lock(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> std::io::Result<()> {
    Ok(())
}
