//! `fdb inspect`: resolves a request to a single field and prints where it
//! is stored, without reading the payload.

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
}

pub fn run(args: &Args) -> Result<()> {
    common::init_logging(&args.config)?;
    let fdb = fdb::Fdb::open(&args.config).into_diagnostic()?;
    let request = parse_request(&args.keys)?;
    let chain = fdb.resolve_chain(&request).into_diagnostic()?;

    match fdb.dispatcher.inspect(&chain).into_diagnostic()? {
        Some(location) => println!("{location}"),
        None => println!("not found"),
    }
    Ok(())
}
