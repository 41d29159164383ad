//! Shared types for an indexed object store for scientific field data:
//! keys, the schema grammar that expands requests into key chains, the
//! type registry that canonicalizes keyword values, field locations, axes,
//! hypercubes and the capability traits storage/catalogue backends
//! implement.

pub mod axes;
pub mod config;
pub mod error;
pub mod hypercube;
pub mod key;
pub mod list;
pub mod location;
pub mod request;
pub mod schema;
pub mod traits;
pub mod types;

pub use axes::Axes;
pub use config::FdbConfig;
pub use error::SchemaError;
pub use hypercube::{Deduplicator, HyperCube};
pub use key::{Key, KeyChain};
pub use list::ListElement;
pub use location::FieldLocation;
pub use request::Request;
pub use schema::Schema;
pub use traits::{Catalogue, ContentStore};
pub use types::{Canonicalizer, TypeRegistry};
