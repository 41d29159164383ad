//! The TOC catalogue engine: an append-only journal per database (§4.2),
//! per-index hash-table files with a load factor cap, axes sidecars, and
//! the lifecycle operations (`purge`, `control`) layered directly on top
//! of the journal since they only ever touch catalogue state, never store
//! bytes.

mod axes_file;
pub mod catalogue;
pub mod control;
pub mod error;
mod index_file;
mod lock;
pub mod record;

pub use catalogue::TocCatalogue;
pub use control::{ControlAction, ControlFlags};
pub use error::CatalogueError;
pub use index_file::{IndexFile, IndexFileBuilder};

use fdb_core::{Axes, FieldLocation, KeyChain, Request};

/// Adapts [`TocCatalogue`]'s inherent methods to [`fdb_core::traits::Catalogue`]
/// for callers that want to hold it behind the generic capability trait
/// (e.g. a dispatch lane iterating over heterogeneous catalogues). The
/// concrete type is preferred wherever the caller needs `purge`/`control`,
/// which the trait does not expose.
impl fdb_core::traits::Catalogue for TocCatalogue {
    type Error = CatalogueError;

    async fn archive(&self, chain: &KeyChain, location: FieldLocation) -> Result<(), Self::Error> {
        TocCatalogue::archive(self, chain, location)
    }

    async fn list(&self, request: &Request, deduplicate: bool) -> Result<Vec<fdb_core::ListElement>, Self::Error> {
        TocCatalogue::list(self, request, deduplicate)
    }

    async fn inspect(&self, chain: &KeyChain) -> Result<Option<FieldLocation>, Self::Error> {
        TocCatalogue::inspect(self, chain)
    }

    async fn axes(&self) -> Result<Axes, Self::Error> {
        TocCatalogue::axes(self)
    }

    async fn wipe(&self, dry_run: bool) -> Result<Vec<String>, Self::Error> {
        TocCatalogue::wipe(self, dry_run)
    }

    async fn flush(&self) -> Result<(), Self::Error> {
        TocCatalogue::flush(self)
    }
}
