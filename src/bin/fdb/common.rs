//! Tracing bring-up shared by every subcommand: reads the config file once
//! up front so logging is configured before `fdb::Fdb::open` builds the
//! dispatcher (which re-reads and parses the same file).

use std::path::Path;

use fdb_core::config::FdbConfig;
use miette::{IntoDiagnostic, Result};

pub fn init_logging(config_path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(config_path).into_diagnostic()?;
    let config = FdbConfig::from_yaml(&text).into_diagnostic()?;
    fdb::logging::init(&config.logging);
    Ok(())
}
