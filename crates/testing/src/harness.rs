//! [`ToyFdb`]: a tempdir-rooted local dispatcher ready to archive/list/flush
//! against, grounded on `crates/testing/src/toy_domain.rs`'s
//! `seed_random_memory_store()` -- same "build a throwaway backing store
//! and hand back something a test can drive directly" shape, generalized
//! from an in-memory ledger store to an on-disk FDB database.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;

use fdb_core::config::{RootConfig, SpaceConfig, StoreConfig};
use fdb_core::{KeyChain, ListElement, Request, Schema, TypeRegistry};
use fdb_dispatch::{Dispatcher, FdbError, LocalDispatch};

/// The schema every built-in scenario in this crate seeds against --
/// matches the literal end-to-end scenarios' keyword set.
pub const DEFAULT_SCHEMA: &str = "[ class, expver\n  [ stream, date, time, domain, type, levtype\n    [ param:Param, step:Step, levelist?, number? ] ] ]";

/// A single-root, local-dispatch FDB rooted at a temporary directory. The
/// directory is removed when this value is dropped.
pub struct ToyFdb {
    dir: TempDir,
    dispatcher: Dispatcher,
    schema: Arc<Schema>,
    registry: Arc<TypeRegistry>,
}

impl ToyFdb {
    /// A harness using [`DEFAULT_SCHEMA`] with a fixed reference date for
    /// relative-date canonicalization.
    pub fn new() -> Self {
        Self::with_schema(DEFAULT_SCHEMA, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    pub fn with_schema(schema_text: &str, today: NaiveDate) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let schema = Arc::new(Schema::parse(schema_text).expect("valid schema"));
        let registry = Arc::new(schema.build_registry(today));
        let spaces = vec![SpaceConfig {
            handler: "Default".to_string(),
            roots: vec![RootConfig { path: dir.path().to_string_lossy().to_string(), list: true, retrieve: true, archive: true }],
        }];
        let local = LocalDispatch::new(spaces, schema_text.to_string(), schema.clone(), registry.clone(), true, StoreConfig::default(), false, 16);
        Self { dir, dispatcher: Dispatcher::Local(local), schema, registry }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Expands a flat request down to the single `KeyChain` it names,
    /// failing with a schema error if the request uses an unrecognized
    /// keyword or resolves to anything other than exactly one field.
    pub fn resolve_chain(&self, request: &Request) -> Result<KeyChain, FdbError> {
        let mut chains = self.schema.expand(request, &self.registry)?;
        if chains.len() == 1 {
            Ok(chains.remove(0))
        } else {
            Err(fdb_core::SchemaError::InvalidValue { keyword: "request".into(), value: format!("resolved to {} fields", chains.len()) }.into())
        }
    }

    pub fn archive(&self, chain: &KeyChain, data: &[u8]) -> Result<(), FdbError> {
        self.dispatcher.archive(chain, data)
    }

    pub fn flush(&self) -> Result<(), FdbError> {
        self.dispatcher.flush()
    }

    pub fn list(&self, request: &Request, deduplicate: bool) -> Result<Vec<ListElement>, FdbError> {
        self.dispatcher.list(request, deduplicate)
    }

    pub fn read(&self, chain: &KeyChain) -> Result<Option<Vec<u8>>, FdbError> {
        self.dispatcher.read(chain)
    }

    pub fn purge(&self, request: &Request, dry_run: bool) -> Result<Vec<String>, FdbError> {
        self.dispatcher.purge(request, dry_run)
    }
}

impl Default for ToyFdb {
    fn default() -> Self {
        Self::new()
    }
}
