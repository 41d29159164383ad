//! Per-index hash table file: `fingerprint(datumKey) -> (datumKey,
//! FieldLocation)`, linear-probed, built once and never mutated after
//! publication (a new version is a new file referenced by a new `Index`
//! TOC record, per §4.2/§3's "Index files are immutable after publication").
//!
//! Layout: a fixed-size slot table sized for a load factor <= 0.75, followed
//! by a blob region holding the bincode-encoded `(Key, FieldLocation)` pairs
//! the slots point into. Slots carry the pair's fingerprint so a lookup can
//! reject a probe without touching the blob.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use fdb_core::{FieldLocation, Key};

use crate::error::CatalogueError;

const MAGIC: u32 = 0xF1DB_0001;
const HEADER_LEN: u64 = 20; // magic:u32 + capacity:u64 + count:u64
const SLOT_LEN: u64 = 21; // occupied:u8 + fingerprint:u64 + blob_offset:u64 + blob_len:u32
const MAX_LOAD_FACTOR: f64 = 0.75;

#[derive(Serialize, Deserialize)]
struct Entry {
    key: Key,
    location: FieldLocation,
}

/// In-memory accumulation of one index's entries before they are published
/// to disk as a single immutable hash table file.
#[derive(Debug, Default)]
pub struct IndexFileBuilder {
    entries: Vec<(u64, Key, FieldLocation)>,
}

impl IndexFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `key -> location`, masking (overwriting) any prior entry with
    /// the same fingerprint. Returns the masked entry, if any, so the
    /// caller can fold it into axes/purge bookkeeping.
    pub fn insert(&mut self, key: Key, location: FieldLocation) -> Option<(Key, FieldLocation)> {
        let fp = key.fingerprint();
        if let Some(pos) = self.entries.iter().position(|(f, _, _)| *f == fp) {
            let (_, old_key, old_loc) = std::mem::replace(&mut self.entries[pos], (fp, key, location));
            return Some((old_key, old_loc));
        }
        self.entries.push((fp, key, location));
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the accumulated entries out as one immutable hash table file.
    pub fn write_to(&self, path: &Path) -> Result<(), CatalogueError> {
        let capacity = capacity_for(self.entries.len());
        let mut slots: Vec<Option<(u64, u64, u32)>> = vec![None; capacity];
        let mut blob = Vec::new();

        for (fp, key, location) in &self.entries {
            let encoded = bincode::serialize(&Entry { key: key.clone(), location: location.clone() })?;
            let blob_offset = blob.len() as u64;
            let blob_len = encoded.len() as u32;
            blob.extend_from_slice(&encoded);

            let mut slot = (*fp as usize) % capacity;
            loop {
                if slots[slot].is_none() {
                    slots[slot] = Some((*fp, blob_offset, blob_len));
                    break;
                }
                slot = (slot + 1) % capacity;
            }
        }

        let mut file = File::create(path)?;
        file.write_all(&MAGIC.to_be_bytes())?;
        file.write_all(&(capacity as u64).to_be_bytes())?;
        file.write_all(&(self.entries.len() as u64).to_be_bytes())?;
        for slot in &slots {
            match slot {
                Some((fp, offset, len)) => {
                    file.write_all(&[1u8])?;
                    file.write_all(&fp.to_be_bytes())?;
                    file.write_all(&offset.to_be_bytes())?;
                    file.write_all(&len.to_be_bytes())?;
                }
                None => file.write_all(&[0u8; SLOT_LEN as usize])?,
            }
        }
        file.write_all(&blob)?;
        file.sync_all()?;
        Ok(())
    }
}

/// Minimum slot count keeping the load factor at or below
/// [`MAX_LOAD_FACTOR`], never below 1 so an empty index still has a valid
/// (if degenerate) file.
fn capacity_for(entry_count: usize) -> usize {
    let needed = (entry_count as f64 / MAX_LOAD_FACTOR).ceil() as usize;
    needed.max(1)
}

/// Read-only handle onto a published index file.
pub struct IndexFile {
    file: File,
    capacity: u64,
    count: u64,
}

impl IndexFile {
    pub fn open(path: &Path) -> Result<Self, CatalogueError> {
        let mut file = File::open(path)?;
        let mut header = [0u8; HEADER_LEN as usize];
        file.read_exact(&mut header)?;
        let magic = u32::from_be_bytes(header[0..4].try_into().unwrap());
        if magic != MAGIC {
            return Err(CatalogueError::Corrupt(format!("index file {path:?} has bad magic")));
        }
        let capacity = u64::from_be_bytes(header[4..12].try_into().unwrap());
        let count = u64::from_be_bytes(header[12..20].try_into().unwrap());
        Ok(Self { file, capacity, count })
    }

    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Looks up `key` by its fingerprint, linear-probing from the home
    /// slot. Stops at the first empty slot (absence of the key) or after a
    /// full cycle of the table.
    pub fn lookup(&mut self, key: &Key) -> Result<Option<FieldLocation>, CatalogueError> {
        let fp = key.fingerprint();
        let mut slot = fp % self.capacity;
        for _ in 0..self.capacity {
            let Some((slot_fp, offset, len)) = self.read_slot(slot)? else {
                return Ok(None);
            };
            if slot_fp == fp {
                let entry = self.read_entry(offset, len)?;
                if &entry.key == key {
                    return Ok(Some(entry.location));
                }
            }
            slot = (slot + 1) % self.capacity;
        }
        Ok(None)
    }

    /// Every `(Key, FieldLocation)` pair stored in this file, in slot order.
    /// Used by `list`/axes-building scans, which need every live entry
    /// rather than a single lookup.
    pub fn entries(&mut self) -> Result<Vec<(Key, FieldLocation)>, CatalogueError> {
        let mut out = Vec::with_capacity(self.count as usize);
        for slot in 0..self.capacity {
            if let Some((_, offset, len)) = self.read_slot(slot)? {
                let entry = self.read_entry(offset, len)?;
                out.push((entry.key, entry.location));
            }
        }
        Ok(out)
    }

    fn read_slot(&mut self, slot: u64) -> Result<Option<(u64, u64, u32)>, CatalogueError> {
        let pos = HEADER_LEN + slot * SLOT_LEN;
        self.file.seek(SeekFrom::Start(pos))?;
        let mut buf = [0u8; SLOT_LEN as usize];
        self.file.read_exact(&mut buf)?;
        if buf[0] == 0 {
            return Ok(None);
        }
        let fp = u64::from_be_bytes(buf[1..9].try_into().unwrap());
        let offset = u64::from_be_bytes(buf[9..17].try_into().unwrap());
        let len = u32::from_be_bytes(buf[17..21].try_into().unwrap());
        Ok(Some((fp, offset, len)))
    }

    fn read_entry(&mut self, blob_offset: u64, blob_len: u32) -> Result<Entry, CatalogueError> {
        let blob_start = HEADER_LEN + self.capacity * SLOT_LEN;
        self.file.seek(SeekFrom::Start(blob_start + blob_offset))?;
        let mut buf = vec![0u8; blob_len as usize];
        self.file.read_exact(&mut buf)?;
        Ok(bincode::deserialize(&buf)?)
    }
}

pub fn remove_index_file(path: &Path) -> Result<(), CatalogueError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(n: u64) -> FieldLocation {
        FieldLocation::new(format!("file:///data.{n}"), n * 100, 50)
    }

    fn key(param: &str) -> Key {
        let mut k = Key::new();
        k.set_raw("param", param);
        k
    }

    #[test]
    fn round_trips_through_a_published_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.0.data");

        let mut builder = IndexFileBuilder::new();
        for p in ["129", "130", "131"] {
            builder.insert(key(p), loc(p.parse().unwrap()));
        }
        builder.write_to(&path).unwrap();

        let mut file = IndexFile::open(&path).unwrap();
        assert_eq!(file.len(), 3);
        assert_eq!(file.lookup(&key("130")).unwrap(), Some(loc(130)));
        assert_eq!(file.lookup(&key("999")).unwrap(), None);
    }

    #[test]
    fn insert_masks_prior_entry_with_same_fingerprint() {
        let mut builder = IndexFileBuilder::new();
        builder.insert(key("130"), loc(1));
        let masked = builder.insert(key("130"), loc(2));
        assert_eq!(masked, Some((key("130"), loc(1))));
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn entries_returns_every_live_pair() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.0.data");

        let mut builder = IndexFileBuilder::new();
        for p in ["1", "2", "3", "4", "5"] {
            builder.insert(key(p), loc(p.parse().unwrap()));
        }
        builder.write_to(&path).unwrap();

        let mut file = IndexFile::open(&path).unwrap();
        let entries = file.entries().unwrap();
        assert_eq!(entries.len(), 5);
    }
}
