//! Capability traits implemented by storage and catalogue backends. Each
//! trait carries its own associated `Error` so this crate never needs to
//! know about a downstream crate's concrete error type.

use crate::axes::Axes;
use crate::key::{Key, KeyChain};
use crate::list::ListElement;
use crate::location::FieldLocation;
use crate::request::Request;

/// A content-addressed blob store: archives and retrieves raw field bytes
/// without any awareness of keys or schemas.
#[trait_variant::make(Send)]
pub trait ContentStore {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn archive(&self, hint: &Key, data: &[u8]) -> Result<FieldLocation, Self::Error>;
    async fn retrieve(&self, location: &FieldLocation) -> Result<Vec<u8>, Self::Error>;
    async fn flush(&self) -> Result<(), Self::Error>;
    async fn remove(&self, uri: &str) -> Result<(), Self::Error>;

    /// URIs of every storage unit (file, object, segment) this store owns.
    fn store_unit_uris(&self) -> Vec<String>;
}

/// A catalogue: the indexed view over a single database that resolves
/// requests to field locations without touching their bytes. One instance
/// is scoped to one database -- `db_key` is fixed at open time, not passed
/// per call.
#[trait_variant::make(Send)]
pub trait Catalogue {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn archive(&self, chain: &KeyChain, location: FieldLocation) -> Result<(), Self::Error>;

    /// `deduplicate`: collapse repeated writes of the same combined key
    /// down to the most recently flushed one (§4.2's HyperCube-based
    /// dedup); `false` returns every generation's entry in write order.
    async fn list(&self, request: &Request, deduplicate: bool) -> Result<Vec<ListElement>, Self::Error>;
    async fn inspect(&self, chain: &KeyChain) -> Result<Option<FieldLocation>, Self::Error>;
    async fn axes(&self) -> Result<Axes, Self::Error>;

    /// Removes every entry in this database. `dry_run` reports what would
    /// be removed (URIs of now-orphaned store units) without touching disk.
    async fn wipe(&self, dry_run: bool) -> Result<Vec<String>, Self::Error>;

    async fn flush(&self) -> Result<(), Self::Error>;
}
