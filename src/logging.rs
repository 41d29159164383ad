//! Tracing setup driven by [`fdb_core::config::LoggingConfig`], mirroring
//! `dolos`'s `common::setup_tracing` -- a `Targets` filter built from the
//! config's per-subsystem include toggles rather than a single global
//! level.

use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

use fdb_core::config::LoggingConfig;

pub fn init(config: &LoggingConfig) {
    let level = Level::INFO;

    let mut filter = Targets::new().with_target("fdb", level);

    if config.catalogue {
        filter = filter.with_target("fdb_toc", level);
    }
    if config.store {
        filter = filter.with_target("fdb_store_file", level).with_target("fdb_store_object", level);
    }
    if config.dispatch {
        filter = filter.with_target("fdb_dispatch", level);
    }
    if config.wire {
        filter = filter.with_target("fdb_wire", level);
    }

    let _ = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .finish()
        .with(filter)
        .try_init();
}
