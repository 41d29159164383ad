//! `fdb retrieve`: resolves a request to a single field and writes its
//! payload to a file or stdout.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args as ClapArgs;
use miette::{miette, IntoDiagnostic, Result};

use crate::common;
use crate::request::parse_request;

#[derive(Debug, ClapArgs)]
pub struct Args {
    #[arg(long)]
    pub config: PathBuf,
    #[arg(long = "key", value_name = "KEYWORD=VALUE")]
    pub keys: Vec<String>,
    /// Writes the payload here instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &Args) -> Result<()> {
    common::init_logging(&args.config)?;
    let fdb = fdb::Fdb::open(&args.config).into_diagnostic()?;
    let request = parse_request(&args.keys)?;
    let chain = fdb.resolve_chain(&request).into_diagnostic()?;

    let data = fdb
        .dispatcher
        .read(&chain)
        .into_diagnostic()?
        .ok_or_else(|| miette!("no field archived for {}", chain.combined()))?;

    match &args.output {
        Some(path) => fs::write(path, &data).into_diagnostic()?,
        None => io::stdout().write_all(&data).into_diagnostic()?,
    }
    Ok(())
}
