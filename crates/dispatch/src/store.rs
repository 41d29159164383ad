//! [`AnyStore`]: selects among the File/Object content store backends,
//! mirroring an `ArchiveAdapter`-style enum -- one `match self`
//! delegating arm per configured backend, so the rest of the dispatch
//! layer never needs to be generic over the store type.

use std::path::Path;

use fdb_core::config::{ObjectStoreConfig, StoreConfig};
use fdb_core::{FieldLocation, Key};
use fdb_store_file::FileStore;
use fdb_store_object::{ObjectStore, PackingPolicy};

use crate::error::FdbError;

#[non_exhaustive]
pub enum AnyStore {
    File(FileStore),
    Object(ObjectStore),
}

impl AnyStore {
    pub fn open(root: &Path, config: &StoreConfig) -> Result<Self, FdbError> {
        match config {
            StoreConfig::File(file_config) => Ok(AnyStore::File(FileStore::open(root, file_config.max_file_size)?)),
            StoreConfig::Object(object_config) => Ok(AnyStore::Object(open_object_store(root, object_config)?)),
        }
    }

    pub fn archive(&self, hint: &Key, data: &[u8]) -> Result<FieldLocation, FdbError> {
        let out = match self {
            AnyStore::File(s) => s.archive(hint, data)?,
            AnyStore::Object(s) => s.archive(hint, data)?,
        };
        Ok(out)
    }

    pub fn retrieve(&self, location: &FieldLocation) -> Result<Vec<u8>, FdbError> {
        let out = match self {
            AnyStore::File(s) => s.retrieve(location)?,
            AnyStore::Object(s) => s.retrieve(location)?,
        };
        Ok(out)
    }

    pub fn flush(&self) -> Result<(), FdbError> {
        match self {
            AnyStore::File(s) => s.flush()?,
            AnyStore::Object(s) => s.flush()?,
        }
        Ok(())
    }

    pub fn remove(&self, uri: &str) -> Result<(), FdbError> {
        match self {
            AnyStore::File(s) => s.remove(uri)?,
            AnyStore::Object(s) => s.remove(uri)?,
        }
        Ok(())
    }

    pub fn store_unit_uris(&self) -> Vec<String> {
        match self {
            AnyStore::File(s) => s.store_unit_uris(),
            AnyStore::Object(s) => s.store_unit_uris(),
        }
    }
}

fn open_object_store(root: &Path, config: &ObjectStoreConfig) -> Result<ObjectStore, FdbError> {
    let pool = config.bucket.clone().unwrap_or_else(|| "default".to_string());
    let packing = if config.packed {
        PackingPolicy::Packed { max_object_size: 64 * 1024 * 1024 * 1024 }
    } else {
        PackingPolicy::Unpacked
    };
    Ok(ObjectStore::open(root, config.scheme, pool, packing)?)
}
