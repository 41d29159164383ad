//! The server-side capability surface a [`crate::server::WireServer`]
//! dispatches onto. Kept independent of `fdb-dispatch`'s concrete type so
//! this crate never depends upward on it; `fdb-dispatch`'s `Dispatcher`
//! implements this trait to become servable.

use fdb_core::{Axes, FieldLocation, KeyChain, ListElement, Request};

/// Mirrors `fdb_core::traits::Catalogue`/`ContentStore`'s shape but folded
/// into one surface and with string errors, since wire errors only need to
/// be displayed to the remote peer, never matched on downstream.
#[trait_variant::make(Send)]
pub trait RemoteHandler: Send + Sync + 'static {
    async fn archive(&self, chain: KeyChain, data: Vec<u8>) -> Result<(), String>;
    async fn flush(&self) -> Result<(), String>;
    async fn list(&self, request: Request, deduplicate: bool) -> Result<Vec<ListElement>, String>;
    async fn inspect(&self, chain: KeyChain) -> Result<Option<FieldLocation>, String>;
    async fn read(&self, chain: KeyChain) -> Result<Option<Vec<u8>>, String>;
    async fn wipe(&self, request: Request, dry_run: bool) -> Result<Vec<String>, String>;
    async fn purge(&self, request: Request, dry_run: bool) -> Result<Vec<String>, String>;
    async fn control(&self, action: String, request: Request, enabled: bool) -> Result<(), String>;
    async fn axes(&self, request: Request) -> Result<Axes, String>;
    async fn status(&self) -> Result<String, String>;
}
