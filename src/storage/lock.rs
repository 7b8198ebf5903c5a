//! Advisory single-writer lock on a snapshot store.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fs4::FileExt;

use crate::error::{AppError, Result};

pub const LOCK_FILE: &str = ".store.lock";

/// Exclusive lock held for the duration of a writing run.
///
/// Released when dropped.
#[derive(Debug)]
pub struct StoreLock {
    _file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Try to take the lock, returning None if another holder has it.
    pub fn try_acquire(root: &Path) -> Result<Option<Self>> {
        fs::create_dir_all(root)?;
        let path = root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { _file: file, path })),
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(None),
            #[cfg(windows)]
            Err(err) if matches!(err.raw_os_error(), Some(32 | 33)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Take the lock or fail with [`AppError::StoreLocked`].
    pub fn acquire(root: &Path) -> Result<Self> {
        Self::try_acquire(root)?.ok_or_else(|| AppError::StoreLocked(root.to_path_buf()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
