//! Test harness for FDB-domain integration tests: a tempdir-backed
//! [`ToyFdb`] wrapping a local dispatcher, synthetic field/payload
//! generators, and fault-injecting store wrappers. Mirrors a
//! `toy_domain`/`synthetic`/`faults` module split used for ledger test
//! harnesses elsewhere, generalized to an archive harness for fields
//! instead of chain blocks.

pub mod faults;
pub mod fields;
pub mod harness;
pub mod synthetic;

pub use harness::{ToyFdb, DEFAULT_SCHEMA};
pub use synthetic::{archive_synthetic_grid, SyntheticArchiveConfig};
