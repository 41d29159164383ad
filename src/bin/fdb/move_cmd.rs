//! `fdb move`: relocates the single database a request resolves to onto a
//! different root, optionally deleting the source once the copy lands.

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
    #[arg(long)]
    pub destination: PathBuf,
    /// Removes the source database once the destination copy is complete.
    /// Without this flag the move leaves a full copy behind (acts as
    /// `copy`).
    #[arg(long)]
    pub delete_source: bool,
}

pub fn run(args: &Args) -> Result<()> {
    common::init_logging(&args.config)?;
    let fdb = fdb::Fdb::open(&args.config).into_diagnostic()?;
    let request = parse_request(&args.keys)?;

    let moved_to = fdb.dispatcher.move_database(&request, &args.destination, args.delete_source).into_diagnostic()?;
    println!("moved to {}", moved_to.display());
    Ok(())
}
