//! POSIX file content store: one append-only data file per writer epoch,
//! rotated once it reaches `max_file_size`. Grounded on `FlatFileStore`'s
//! shape (segment files + `Mutex<HashMap<id, File>>`, one `fsync` per
//! batch, truncate-on-undo reused here as remove-on-wipe), adapted from
//! slot-indexed segmentation to a field archive's byte-size rotation.

pub mod error;

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use fdb_core::{FieldLocation, Key};

pub use error::StoreError;

const URI_SCHEME: &str = "file";

struct Epoch {
    path: PathBuf,
    file: File,
    len: u64,
}

/// A content store rooted at one database directory, matching the on-disk
/// layout's `<stamp>.<host>.<pid>.data` data files living alongside the
/// catalogue's `toc`/`index.*` files.
pub struct FileStore {
    root: PathBuf,
    max_file_size: u64,
    host: String,
    pid: u32,
    sequence: AtomicU64,
    current: Mutex<Option<Epoch>>,
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>, max_file_size: u64) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            max_file_size,
            host: hostname(),
            pid: std::process::id(),
            sequence: AtomicU64::new(0),
            current: Mutex::new(None),
        })
    }

    fn file_uri(&self, path: &Path) -> String {
        format!("{URI_SCHEME}://{}", path.display())
    }

    fn path_from_uri(&self, uri: &str) -> Result<PathBuf, StoreError> {
        uri.strip_prefix("file://").map(PathBuf::from).ok_or_else(|| StoreError::NotAFileUri(uri.to_string()))
    }

    fn rotate(&self) -> Result<Epoch, StoreError> {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let name = format!("{}.{}.{}.data", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default(), self.host, self.pid);
        let _ = seq; // sequence only disambiguates same-nanosecond rotations on very fast loops
        let path = self.root.join(name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Epoch { path, file, len: 0 })
    }

    /// Archives `data` into the current epoch's data file, rotating to a
    /// fresh one if this write would exceed `max_file_size`.
    pub fn archive(&self, hint: &Key, data: &[u8]) -> Result<FieldLocation, StoreError> {
        let _ = hint;
        let mut guard = self.current.lock().unwrap();
        let needs_rotation = match &*guard {
            Some(epoch) => epoch.len + data.len() as u64 > self.max_file_size,
            None => true,
        };
        if needs_rotation {
            *guard = Some(self.rotate()?);
        }
        let epoch = guard.as_mut().unwrap();
        let offset = epoch.len;
        epoch.file.write_all(data)?;
        epoch.len += data.len() as u64;
        Ok(FieldLocation::new(self.file_uri(&epoch.path), offset, data.len() as u64))
    }

    pub fn retrieve(&self, location: &FieldLocation) -> Result<Vec<u8>, StoreError> {
        let path = self.path_from_uri(&location.uri)?;
        let mut file = File::open(&path)?;
        let file_len = file.metadata()?.len();
        if location.offset + location.length > file_len {
            return Err(StoreError::OutOfRange { uri: location.uri.clone(), offset: location.offset, length: location.length });
        }
        file.seek(SeekFrom::Start(location.offset))?;
        let mut buf = vec![0u8; location.length as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Durably persists the current epoch. Per §4.3's ordering requirement,
    /// the dispatch layer must call this (and await completion) before the
    /// catalogue is allowed to publish the corresponding index record.
    pub fn flush(&self) -> Result<(), StoreError> {
        let guard = self.current.lock().unwrap();
        if let Some(epoch) = guard.as_ref() {
            epoch.file.sync_data()?;
        }
        Ok(())
    }

    pub fn remove(&self, uri: &str) -> Result<(), StoreError> {
        let path = self.path_from_uri(uri)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Every `*.data` file this store owns, excluding the catalogue's
    /// `index.*`/`axes.*` sidecars which share the same directory.
    pub fn store_unit_uris(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        entries
            .filter_map(Result::ok)
            .filter_map(|e| {
                let name = e.file_name();
                let name = name.to_string_lossy();
                if name.ends_with(".data") && !name.starts_with("index.") {
                    Some(self.file_uri(&e.path()))
                } else {
                    None
                }
            })
            .collect()
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

impl fdb_core::traits::ContentStore for FileStore {
    type Error = StoreError;

    async fn archive(&self, hint: &Key, data: &[u8]) -> Result<FieldLocation, Self::Error> {
        FileStore::archive(self, hint, data)
    }

    async fn retrieve(&self, location: &FieldLocation) -> Result<Vec<u8>, Self::Error> {
        FileStore::retrieve(self, location)
    }

    async fn flush(&self) -> Result<(), Self::Error> {
        FileStore::flush(self)
    }

    async fn remove(&self, uri: &str) -> Result<(), Self::Error> {
        FileStore::remove(self, uri)
    }

    fn store_unit_uris(&self) -> Vec<String> {
        FileStore::store_unit_uris(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_then_retrieve_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path(), 1024 * 1024).unwrap();
        let loc = store.archive(&Key::new(), b"Raining cats and dogs").unwrap();
        store.flush().unwrap();
        let bytes = store.retrieve(&loc).unwrap();
        assert_eq!(bytes, b"Raining cats and dogs");
    }

    #[test]
    fn rotates_once_max_file_size_is_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path(), 10).unwrap();
        let a = store.archive(&Key::new(), b"0123456789").unwrap();
        let b = store.archive(&Key::new(), b"x").unwrap();
        assert_ne!(a.uri, b.uri);
    }

    #[test]
    fn remove_is_idempotent_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path(), 1024).unwrap();
        assert!(store.remove("file:///no/such/file").is_ok());
    }

    #[test]
    fn retrieve_past_end_of_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path(), 1024).unwrap();
        let loc = store.archive(&Key::new(), b"short").unwrap();
        let bad = FieldLocation::new(loc.uri, 0, 1000);
        assert!(store.retrieve(&bad).is_err());
    }
}
