//! Root facade: loads an [`FdbConfig`] and its referenced schema file,
//! builds the configured [`Dispatcher`], and re-exports every sub-crate
//! behind one entry point. Mirrors `dolos`'s root `lib.rs`, which
//! re-exports its crates' public surface instead of making callers add
//! each one as its own dependency.

use std::fs;
use std::path::Path;
use std::sync::Arc;

pub use fdb_core as core;
pub use fdb_dispatch as dispatch;
pub use fdb_store_file as store_file;
pub use fdb_store_object as store_object;
pub use fdb_toc as toc;
pub use fdb_wire as wire;

pub use fdb_core::config::FdbConfig;
pub use fdb_core::{Key, KeyChain, Request, Schema, TypeRegistry};
pub use fdb_dispatch::{DispatchContext, DispatchError, Dispatcher, FdbError};

pub mod logging;

/// A loaded database: the routing `Dispatcher` the configuration describes,
/// plus the schema/registry it was built against. Client code that only
/// issues `Request`-shaped operations (list/wipe/purge/axes/control) needs
/// just the `Dispatcher`; operations that address a single field
/// (archive/inspect/retrieve) need [`Fdb::resolve_chain`] to turn a flat
/// request into the `KeyChain` those calls take.
pub struct Fdb {
    pub dispatcher: Dispatcher,
    pub schema: Arc<Schema>,
    pub registry: Arc<TypeRegistry>,
}

impl Fdb {
    /// Loads configuration from `config_path`, reads the schema file it
    /// references (defaulting to a `schema` file alongside the config), and
    /// builds the `Dispatcher` the configuration describes.
    pub fn open(config_path: impl AsRef<Path>) -> Result<Self, FdbError> {
        let config_path = config_path.as_ref();
        let text = fs::read_to_string(config_path)?;
        let config = FdbConfig::from_yaml(&text)?;
        let schema_path = config.schema.clone().unwrap_or_else(|| config_path.with_file_name("schema"));
        let schema_text = fs::read_to_string(schema_path)?;

        let ctx = DispatchContext::from_config(&config, schema_text)?;
        let dispatcher = Dispatcher::build(&config.dispatch, &ctx)?;
        Ok(Self { dispatcher, schema: ctx.schema, registry: ctx.registry })
    }

    /// Expands a flat keyword/value request down to the single `KeyChain`
    /// it names, for the operations (archive/inspect/retrieve) that address
    /// one exact field rather than a matching set.
    pub fn resolve_chain(&self, request: &Request) -> Result<KeyChain, FdbError> {
        let mut chains = self.schema.expand(request, &self.registry)?;
        match chains.len() {
            1 => Ok(chains.remove(0)),
            0 => Err(DispatchError::NoMatchingRoot.into()),
            n => Err(DispatchError::AmbiguousDatabase(n).into()),
        }
    }
}
