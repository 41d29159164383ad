//! Advisory writer-serialization lock on a database's `toc.lock` sibling.
//! A single writer holds this for the duration of one flush; readers never
//! acquire it, since the TOC is safe to scan concurrently (records are
//! finalized -- length-prefixed and fsync'd -- before they become visible).

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::CatalogueError;

pub struct TocLock {
    path: PathBuf,
    file: File,
}

impl TocLock {
    /// Blocks until the lock is acquired. Writers call this once per flush;
    /// holding it across more than one flush would serialize unrelated
    /// writers for longer than necessary.
    pub fn acquire(dir: &Path) -> Result<Self, CatalogueError> {
        let path = dir.join("toc.lock");
        let file = OpenOptions::new().create(true).write(true).open(&path)?;
        file.lock_exclusive().map_err(|_| CatalogueError::Lock(path.clone()))?;
        Ok(Self { path, file })
    }

    /// Non-blocking variant used by `SubToc` writers, which must not stall
    /// behind a long-running master flush; the caller falls back to its own
    /// child TOC instead.
    pub fn try_acquire(dir: &Path) -> Result<Option<Self>, CatalogueError> {
        let path = dir.join("toc.lock");
        let file = OpenOptions::new().create(true).write(true).open(&path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { path, file })),
            Err(_) => Ok(None),
        }
    }
}

impl Drop for TocLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

impl std::fmt::Debug for TocLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TocLock").field("path", &self.path).finish()
    }
}
