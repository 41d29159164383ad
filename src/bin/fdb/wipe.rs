//! `fdb wipe`: removes every database a request matches, including their
//! owned store data. Dry-run by default; pass `--doit` to actually delete.

use std::path::PathBuf;

use clap::Args as ClapArgs;
use miette::{IntoDiagnostic, Result};

use crate::common;
use crate::request::parse_request;

#[derive(Debug, ClapArgs)]
pub struct Args {
    #[arg(long)]
    pub config: PathBuf,
    #[arg(long = "key", value_name = "KEYWORD=VALUE")]
    pub keys: Vec<String>,
    /// Actually delete; without this flag only prints what would be
    /// removed.
    #[arg(long)]
    pub doit: bool,
    /// Required to wipe a request that would otherwise match more than
    /// one database.
    #[arg(long)]
    pub unsafe_wipe_all: bool,
}

pub fn run(args: &Args) -> Result<()> {
    common::init_logging(&args.config)?;
    let fdb = fdb::Fdb::open(&args.config).into_diagnostic()?;
    let request = parse_request(&args.keys)?;

    let removed = fdb.dispatcher.wipe(&request, !args.doit, args.unsafe_wipe_all).into_diagnostic()?;
    for path in &removed {
        println!("{path}");
    }
    if !args.doit {
        println!("(dry run; pass --doit to delete {} path(s))", removed.len());
    }
    Ok(())
}
