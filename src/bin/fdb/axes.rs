//! `fdb axes`: prints the observed values for each keyword across the
//! databases a request matches.

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

    let axes = fdb.dispatcher.axes(&request).into_diagnostic()?;
    for keyword in axes.keywords() {
        let values: Vec<&str> = axes.values_of(keyword).collect();
        println!("{keyword}: {}", values.join("/"));
    }
    Ok(())
}
