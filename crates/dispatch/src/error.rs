use std::path::PathBuf;

use thiserror::Error;

use fdb_core::SchemaError;

/// Errors raised by the dispatch layer itself, as distinct from the
/// catalogue/store errors it wraps into [`FdbError`].
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("request does not match any configured root")]
    NoMatchingRoot,

    #[error("request matches {0} databases; specify a single database or set unsafe_wipe_all")]
    AmbiguousDatabase(usize),

    #[error("no writable lane available in this dist/select configuration")]
    NoWritableLane,

    #[error("lane '{0}' rejected the write mid-flush")]
    LaneFailure(String),

    #[error("dist archive to lane '{lane}' failed after data may already have been written; refusing to retry on another lane: {source}")]
    DistributionError { lane: String, source: String },

    #[error("root '{0}' does not permit this operation")]
    RootForbids(PathBuf),

    #[error("move requires a request that resolves to exactly one database")]
    MoveRequiresSingleDatabase,
}

/// Aggregates every downstream crate's error type behind one enum,
/// mirroring `dolos_core::DomainError`'s `#[error("wal error: {0}")]
/// WalError(#[from] WalError)` pattern -- each leaf crate keeps its own
/// `thiserror` enum, and this is the only place they get folded together.
#[derive(Debug, Error)]
pub enum FdbError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("catalogue error: {0}")]
    Catalogue(#[from] fdb_toc::CatalogueError),

    #[error("file store error: {0}")]
    FileStore(#[from] fdb_store_file::StoreError),

    #[error("object store error: {0}")]
    ObjectStore(#[from] fdb_store_object::StoreError),

    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("wire error: {0}")]
    Wire(#[from] fdb_wire::WireError),

    #[error("config error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
