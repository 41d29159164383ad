//! Dispatch: the layer above the catalogue/store that decides which
//! database(s) an operation touches and how to reach them -- directly
//! (`Local`), by regex-routed lane (`Select`), by rendezvous-hashed lane
//! (`Dist`), or over the wire (`Remote`). One `match self` enum, never a
//! trait object, since the variant set is closed and known at config
//! time.

pub mod database;
pub mod dist;
pub mod error;
pub mod gather;
pub mod local;
pub mod naming;
pub mod remote;
pub mod rendezvous;
pub mod select;
pub mod space;
pub mod store;

use std::sync::Arc;

use chrono::Utc;

use fdb_core::config::{DispatchConfig, FdbConfig, SpaceConfig};
use fdb_core::{Axes, FieldLocation, KeyChain, ListElement, Request, Schema, TypeRegistry};
use fdb_toc::ControlAction;

pub use dist::DistDispatch;
pub use error::{DispatchError, FdbError};
pub use gather::HandleGatherer;
pub use local::LocalDispatch;
pub use remote::RemoteDispatch;
pub use select::SelectDispatch;

/// The parsed schema/registry/root set every dispatch variant is built
/// against, threaded down into nested `Select`/`Dist` lanes so they don't
/// each reparse the schema.
#[derive(Clone)]
pub struct DispatchContext {
    pub schema_text: Arc<str>,
    pub schema: Arc<Schema>,
    pub registry: Arc<TypeRegistry>,
    pub spaces: Vec<SpaceConfig>,
    pub optimise: bool,
    pub max_open_databases: usize,
}

impl DispatchContext {
    pub fn new(schema_text: String, schema: Arc<Schema>, registry: Arc<TypeRegistry>, spaces: Vec<SpaceConfig>, optimise: bool) -> Self {
        Self::with_max_open(schema_text, schema, registry, spaces, optimise, fdb_core::config::FdbConfig::default().max_open_databases)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_max_open(
        schema_text: String,
        schema: Arc<Schema>,
        registry: Arc<TypeRegistry>,
        spaces: Vec<SpaceConfig>,
        optimise: bool,
        max_open_databases: usize,
    ) -> Self {
        Self { schema_text: Arc::from(schema_text.as_str()), schema, registry, spaces, optimise, max_open_databases }
    }

    pub fn from_config(config: &FdbConfig, schema_text: String) -> Result<Self, FdbError> {
        let schema = Arc::new(Schema::parse(&schema_text)?);
        let registry = Arc::new(schema.build_registry(Utc::now().date_naive()));
        Ok(Self::with_max_open(schema_text, schema, registry, config.spaces.clone(), false, config.max_open_databases))
    }

    #[cfg(test)]
    pub fn for_test() -> Self {
        let schema_text = "[ class, expver\n  [ stream, date, time\n    [ param ] ] ]";
        let schema = Arc::new(Schema::parse(schema_text).unwrap());
        let registry = Arc::new(schema.build_registry(chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        Self::new(schema_text.to_string(), schema, registry, Vec::new(), false)
    }
}

/// The unified dispatch entry point: every FDB client operation lands on
/// one of these four variants, chosen once at config-load time.
pub enum Dispatcher {
    Local(LocalDispatch),
    Select(SelectDispatch),
    Dist(DistDispatch),
    Remote(RemoteDispatch),
}

impl Dispatcher {
    pub fn from_config(config: &FdbConfig, schema_text: String) -> Result<Self, FdbError> {
        let ctx = DispatchContext::from_config(config, schema_text)?;
        Self::build(&config.dispatch, &ctx)
    }

    pub fn build(config: &DispatchConfig, ctx: &DispatchContext) -> Result<Self, FdbError> {
        match config {
            DispatchConfig::Local(local) => Ok(Dispatcher::Local(LocalDispatch::new(
                ctx.spaces.clone(),
                ctx.schema_text.to_string(),
                ctx.schema.clone(),
                ctx.registry.clone(),
                true,
                local.store.clone(),
                ctx.optimise,
                ctx.max_open_databases,
            ))),
            DispatchConfig::Select(select) => Ok(Dispatcher::Select(SelectDispatch::new(select.lanes.clone(), ctx)?)),
            DispatchConfig::Dist(dist) => Ok(Dispatcher::Dist(DistDispatch::new(dist.lanes.clone(), ctx)?)),
            DispatchConfig::Remote(remote) => Ok(Dispatcher::Remote(RemoteDispatch::connect(remote)?)),
        }
    }

    pub fn archive(&self, chain: &KeyChain, data: &[u8]) -> Result<(), FdbError> {
        match self {
            Dispatcher::Local(d) => d.archive(chain, data),
            Dispatcher::Select(d) => d.archive(chain, data),
            Dispatcher::Dist(d) => d.archive(chain, data),
            Dispatcher::Remote(d) => d.archive(chain, data),
        }
    }

    pub fn flush(&self) -> Result<(), FdbError> {
        match self {
            Dispatcher::Local(d) => d.flush(),
            Dispatcher::Select(d) => d.flush(),
            Dispatcher::Dist(d) => d.flush(),
            Dispatcher::Remote(d) => d.flush(),
        }
    }

    pub fn list(&self, request: &Request, deduplicate: bool) -> Result<Vec<ListElement>, FdbError> {
        match self {
            Dispatcher::Local(d) => d.list(request, deduplicate),
            Dispatcher::Select(d) => d.list(request, deduplicate),
            Dispatcher::Dist(d) => d.list(request, deduplicate),
            Dispatcher::Remote(d) => d.list(request, deduplicate),
        }
    }

    pub fn inspect(&self, chain: &KeyChain) -> Result<Option<FieldLocation>, FdbError> {
        match self {
            Dispatcher::Local(d) => d.inspect(chain),
            Dispatcher::Select(d) => d.inspect(chain),
            Dispatcher::Dist(d) => d.inspect(chain),
            Dispatcher::Remote(d) => d.inspect(chain),
        }
    }

    pub fn read(&self, chain: &KeyChain) -> Result<Option<Vec<u8>>, FdbError> {
        match self {
            Dispatcher::Local(d) => d.read(chain),
            Dispatcher::Select(d) => d.read(chain),
            Dispatcher::Dist(d) => d.read(chain),
            Dispatcher::Remote(d) => d.read(chain),
        }
    }

    pub fn wipe(&self, request: &Request, dry_run: bool, unsafe_wipe_all: bool) -> Result<Vec<String>, FdbError> {
        match self {
            Dispatcher::Local(d) => d.wipe(request, dry_run, unsafe_wipe_all),
            Dispatcher::Select(d) => d.wipe(request, dry_run, unsafe_wipe_all),
            Dispatcher::Dist(d) => d.wipe(request, dry_run, unsafe_wipe_all),
            Dispatcher::Remote(d) => d.wipe(request, dry_run),
        }
    }

    pub fn purge(&self, request: &Request, dry_run: bool) -> Result<Vec<String>, FdbError> {
        match self {
            Dispatcher::Local(d) => d.purge(request, dry_run),
            Dispatcher::Select(d) => d.purge(request, dry_run),
            Dispatcher::Dist(d) => d.purge(request, dry_run),
            Dispatcher::Remote(d) => d.purge(request, dry_run),
        }
    }

    pub fn axes(&self, request: &Request) -> Result<Axes, FdbError> {
        match self {
            Dispatcher::Local(d) => d.axes(request),
            Dispatcher::Select(d) => d.axes(request),
            Dispatcher::Dist(d) => d.axes(request),
            Dispatcher::Remote(d) => d.axes(request),
        }
    }

    pub fn control(&self, action: ControlAction, request: &Request, enabled: bool) -> Result<(), FdbError> {
        match self {
            Dispatcher::Local(d) => d.control(action, request, enabled),
            Dispatcher::Select(_) | Dispatcher::Dist(_) => {
                Err(DispatchError::LaneFailure("control is only meaningful against a local database".into()).into())
            }
            Dispatcher::Remote(d) => d.control(control_action_name(action), request, enabled),
        }
    }

    /// `move` only makes sense against locally-visible directories; a
    /// request routed through `Select`/`Dist`/`Remote` must be unwrapped
    /// to its owning local lane first (the CLI does this by re-dispatching
    /// `move` straight at the lane `list` resolved the database to).
    pub fn move_database(&self, request: &Request, destination_root: &std::path::Path, delete_source: bool) -> Result<std::path::PathBuf, FdbError> {
        match self {
            Dispatcher::Local(d) => d.move_database(request, destination_root, delete_source),
            _ => Err(DispatchError::MoveRequiresSingleDatabase.into()),
        }
    }
}

fn control_action_name(action: ControlAction) -> String {
    match action {
        ControlAction::Archive => "archive",
        ControlAction::Retrieve => "retrieve",
        ControlAction::List => "list",
        ControlAction::Wipe => "wipe",
        ControlAction::UniqueRoot => "unique_root",
    }
    .to_string()
}
