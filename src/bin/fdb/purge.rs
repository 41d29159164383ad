//! `fdb purge`: reclaims store space masked by superseding writes, leaving
//! live fields untouched. Dry-run by default; pass `--doit` to delete.

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
    pub doit: bool,
}

pub fn run(args: &Args) -> Result<()> {
    common::init_logging(&args.config)?;
    let fdb = fdb::Fdb::open(&args.config).into_diagnostic()?;
    let request = parse_request(&args.keys)?;

    let reclaimed = fdb.dispatcher.purge(&request, !args.doit).into_diagnostic()?;
    for uri in &reclaimed {
        println!("{uri}");
    }
    if !args.doit {
        println!("(dry run; pass --doit to reclaim {} unit(s))", reclaimed.len());
    }
    Ok(())
}
