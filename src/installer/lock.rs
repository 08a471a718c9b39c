//! Per-version advisory install lock.
//!
//! Backed by `flock(2)` on Unix and by the standard library's file locks
//! (`LockFileEx`) elsewhere. Either way the OS drops the lock when the holder
//! exits, including on a crash. The lock file itself is never removed.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::version::Version;

pub fn lock_path(versions_dir: &Path, version: &Version) -> PathBuf {
    versions_dir.join(format!(".{version}.lock"))
}

fn open_lock_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(|err| Error::io(path, err))
}

fn log_wait(path: &Path) {
    tracing::info!(lock = ?path, "waiting for another install of this version to finish");
}

#[cfg(unix)]
mod imp {
    use super::*;
    use nix::errno::Errno;
    use nix::fcntl::{Flock, FlockArg};

    /// Exclusive lock held until dropped.
    pub struct InstallLock {
        _guard: Flock<File>,
    }

    impl InstallLock {
        /// Take the lock, blocking while another process holds it.
        pub fn acquire(path: &Path) -> Result<Self> {
            let file = open_lock_file(path)?;
            let guard = match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
                Ok(guard) => guard,
                Err((file, errno)) if errno == Errno::EWOULDBLOCK => {
                    log_wait(path);
                    Flock::lock(file, FlockArg::LockExclusive)
                        .map_err(|(_, errno)| Error::io(path, errno.into()))?
                }
                Err((_, errno)) => return Err(Error::io(path, errno.into())),
            };

            tracing::debug!(lock = ?path, "acquired install lock");
            Ok(Self { _guard: guard })
        }
    }
}

#[cfg(not(unix))]
mod imp {
    use super::*;
    use std::fs::TryLockError;

    /// Exclusive lock held until the handle is closed.
    pub struct InstallLock {
        _file: File,
    }

    impl InstallLock {
        /// Take the lock, blocking while another process holds it.
        pub fn acquire(path: &Path) -> Result<Self> {
            let file = open_lock_file(path)?;
            match file.try_lock() {
                Ok(()) => {}
                Err(TryLockError::WouldBlock) => {
                    log_wait(path);
                    file.lock().map_err(|err| Error::io(path, err))?;
                }
                Err(TryLockError::Error(err)) => return Err(Error::io(path, err)),
            }

            tracing::debug!(lock = ?path, "acquired install lock");
            Ok(Self { _file: file })
        }
    }
}

pub use imp::InstallLock;
