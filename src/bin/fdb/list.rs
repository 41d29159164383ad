//! `fdb list`: enumerates the fields a request matches.

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
    /// List every matching field instead of only the most recent
    /// generation at each combined key.
    #[arg(long)]
    pub all: bool,
}

pub fn run(args: &Args) -> Result<()> {
    common::init_logging(&args.config)?;
    let fdb = fdb::Fdb::open(&args.config).into_diagnostic()?;
    let request = parse_request(&args.keys)?;

    let elements = fdb.dispatcher.list(&request, !args.all).into_diagnostic()?;
    for element in &elements {
        println!("{element}");
    }
    println!("{} field(s)", elements.len());
    Ok(())
}
