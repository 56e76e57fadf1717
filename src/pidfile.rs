//! PID file bookkeeping.
//!
//! A PID file holds nothing but the decimal process id of the tracked
//! program. Reads distinguish a missing file from a malformed one so callers
//! can report "not running" precisely, and a companion `.lock` file
//! serializes the check-then-write sequence of `start` and `restart`.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use thiserror::Error;

/// Failures while reading, writing or locking a PID file.
#[derive(Debug, Error)]
pub enum PidFileError {
    #[error("PID file {} does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("PID file {} does not hold a valid PID: {content:?}", path.display())]
    Malformed { path: PathBuf, content: String },

    #[error("failed to read PID file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write PID file {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to lock {}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("another procmanager invocation is working on {}", path.display())]
    Locked { path: PathBuf },
}

/// Read the PID recorded at `path`.
pub fn read(path: &Path) -> Result<u32, PidFileError> {
    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            PidFileError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            PidFileError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    parse_pid(&content).ok_or_else(|| PidFileError::Malformed {
        path: path.to_path_buf(),
        content,
    })
}

/// Write `pid` as the whole content of `path`, creating parent directories.
pub fn write(path: &Path, pid: u32) -> Result<(), PidFileError> {
    let wrap = |source: io::Error| PidFileError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(wrap)?;
    }
    fs::write(path, pid.to_string()).map_err(wrap)?;
    debug!("wrote pid {pid} to {}", path.display());
    Ok(())
}

/// Delete `path`. A missing file is fine; anything else is only logged.
pub fn remove(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("removed PID file {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("failed to remove PID file {}: {e}", path.display()),
    }
}

/// Accepts a positive integer that fits a `pid_t`.
fn parse_pid(content: &str) -> Option<u32> {
    let pid: i32 = content.trim().parse().ok()?;
    u32::try_from(pid).ok().filter(|pid| *pid > 0)
}

/// Exclusive advisory lock on `<pidfile>.lock`, released on drop.
///
/// The lock file itself is never deleted. Unlinking it would let a process
/// that opened the old inode and one that creates a new file both hold "the"
/// lock at once.
pub struct PidLock {
    path: PathBuf,
    _lock: Flock<File>,
}

impl PidLock {
    /// Take the lock guarding `pid_file` without blocking.
    pub fn acquire(pid_file: &Path) -> Result<Self, PidFileError> {
        let path = lock_path(pid_file);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| PidFileError::Lock {
                path: path.clone(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| PidFileError::Lock {
                path: path.clone(),
                source,
            })?;

        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => {
                debug!("acquired lock {}", path.display());
                Ok(Self { path, _lock: lock })
            }
            Err((_, Errno::EWOULDBLOCK)) => Err(PidFileError::Locked { path }),
            Err((_, errno)) => Err(PidFileError::Lock {
                path,
                source: errno.into(),
            }),
        }
    }
}

impl fmt::Debug for PidLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PidLock").field("path", &self.path).finish()
    }
}

fn lock_path(pid_file: &Path) -> PathBuf {
    let mut name = pid_file.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}
