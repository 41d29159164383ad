//! [`Database`]: one opened catalogue/store pair, the unit [`crate::local`]
//! caches and operates on. Bundles a [`TocCatalogue`] with the [`AnyStore`]
//! it was configured to write through, the same way a `Domain` type
//! elsewhere in this workspace bundles a wal/state/archive/index quartet
//! behind one handle instead of passing each piece around separately.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fdb_core::config::StoreConfig;
use fdb_core::{Axes, HyperCube, Key, KeyChain, ListElement, Request, Schema, TypeRegistry};
use fdb_toc::TocCatalogue;

use crate::error::FdbError;
use crate::store::AnyStore;

pub struct Database {
    catalogue: TocCatalogue,
    store: AnyStore,
}

impl Database {
    pub fn open(
        root: PathBuf,
        db_key: Key,
        schema_text: &str,
        schema: Arc<Schema>,
        registry: Arc<TypeRegistry>,
        use_subtoc: bool,
        store_config: &StoreConfig,
    ) -> Result<Self, FdbError> {
        let catalogue = TocCatalogue::open(root.clone(), db_key, schema_text, schema, registry, use_subtoc)?;
        let store = AnyStore::open(&root, store_config)?;
        Ok(Self { catalogue, store })
    }

    pub fn root(&self) -> &Path {
        self.catalogue.root()
    }

    pub fn db_key(&self) -> &Key {
        self.catalogue.db_key()
    }

    pub fn archive(&self, chain: &KeyChain, data: &[u8]) -> Result<(), FdbError> {
        let location = self.store.archive(&chain.combined(), data)?;
        self.catalogue.archive(chain, location)?;
        Ok(())
    }

    /// Data durable before index: the store's pending payloads must be
    /// `fsync`ed before the catalogue is allowed to publish the `Index`
    /// record that advertises them (§4.3).
    pub fn flush(&self) -> Result<(), FdbError> {
        self.store.flush()?;
        self.catalogue.flush()?;
        Ok(())
    }

    pub fn list(&self, request: &Request, deduplicate: bool) -> Result<Vec<ListElement>, FdbError> {
        Ok(self.catalogue.list(request, deduplicate)?)
    }

    pub fn inspect(&self, chain: &KeyChain) -> Result<Option<fdb_core::FieldLocation>, FdbError> {
        Ok(self.catalogue.inspect(chain)?)
    }

    pub fn retrieve(&self, location: &fdb_core::FieldLocation) -> Result<Vec<u8>, FdbError> {
        Ok(self.store.retrieve(location)?)
    }

    pub fn axes(&self) -> Result<Axes, FdbError> {
        Ok(self.catalogue.axes()?)
    }

    pub fn hypercube(&self, keywords: &[&str]) -> Result<HyperCube, FdbError> {
        Ok(self.catalogue.hypercube(keywords)?)
    }

    /// Purges superseded index generations, then removes the store units
    /// those generations exclusively owned. The catalogue and the store
    /// are purged in that order so a crash mid-purge leaves the catalogue
    /// pointing only at units that still exist.
    pub fn purge(&self, dry_run: bool) -> Result<Vec<String>, FdbError> {
        let reclaimed = self.catalogue.purge(dry_run)?;
        if !dry_run {
            for uri in &reclaimed {
                self.store.remove(uri)?;
            }
        }
        Ok(reclaimed)
    }

    /// Removes the whole database: every store unit, then the catalogue
    /// directory itself.
    pub fn wipe(&self, dry_run: bool) -> Result<Vec<String>, FdbError> {
        let owned = self.catalogue.wipe(dry_run)?;
        if !dry_run {
            for uri in &owned {
                self.store.remove(uri)?;
            }
            std::fs::remove_dir_all(self.root())?;
        }
        Ok(owned)
    }

    pub fn control_flags(&self) -> Result<fdb_toc::ControlFlags, FdbError> {
        Ok(self.catalogue.control_flags()?)
    }

    pub fn set_control(&self, action: fdb_toc::ControlAction, enabled: bool) -> Result<(), FdbError> {
        Ok(self.catalogue.set_control(action, enabled)?)
    }
}
