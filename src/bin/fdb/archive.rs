//! `fdb archive`: writes one field's payload to the database the request
//! resolves to, flushing so the new entry becomes visible to readers.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Args as ClapArgs;
use miette::{IntoDiagnostic, Result};

use crate::common;
use crate::request::parse_request;

#[derive(Debug, ClapArgs)]
pub struct Args {
    #[arg(long)]
    pub config: PathBuf,
    /// `keyword=value`, repeatable. A value may itself be a `/`-separated
    /// list, but archive requires the full request to resolve to exactly
    /// one field.
    #[arg(long = "key", value_name = "KEYWORD=VALUE")]
    pub keys: Vec<String>,
    /// Reads the payload from this file instead of stdin.
    #[arg(long)]
    pub input: Option<PathBuf>,
}

pub fn run(args: &Args) -> Result<()> {
    common::init_logging(&args.config)?;
    let fdb = fdb::Fdb::open(&args.config).into_diagnostic()?;

    let request = parse_request(&args.keys)?;
    let chain = fdb.resolve_chain(&request).into_diagnostic()?;

    let data = match &args.input {
        Some(path) => fs::read(path).into_diagnostic()?,
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf).into_diagnostic()?;
            buf
        }
    };

    fdb.dispatcher.archive(&chain, &data).into_diagnostic()?;
    fdb.dispatcher.flush().into_diagnostic()?;
    println!("archived {} bytes as {}", data.len(), chain.combined());
    Ok(())
}
