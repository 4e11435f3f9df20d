//! Exclusive advisory lock guarding a state file

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::StateResult;

/// RAII guard holding an exclusive lock; released on drop
#[derive(Debug)]
pub struct StateLock {
    file: File,
    path: PathBuf,
}

impl StateLock {
    /// Block until the exclusive lock at `path` is acquired
    pub fn acquire(path: &Path) -> StateResult<Self> {
        let file = open_lock_file(path)?;
        file.lock_exclusive()?;
        debug!("Acquired state lock {:?}", path);

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Acquire the lock only if nobody else holds it
    ///
    /// Returns `None` when the lock is held elsewhere; other failures are
    /// errors.
    pub fn try_acquire(path: &Path) -> StateResult<Option<Self>> {
        let file = open_lock_file(path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                file,
                path: path.to_path_buf(),
            })),
            Err(e) if is_contended(&e) => {
                debug!("State lock {:?} is held elsewhere", path);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_lock_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
}

fn is_contended(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::WouldBlock
        || error.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!("Failed to release state lock {:?}: {}", self.path, e);
        } else {
            debug!("Released state lock {:?}", self.path);
        }
    }
}
