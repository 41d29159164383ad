//! `fdb control`: locks or unlocks one control flag (archive/retrieve/
//! list/wipe/unique-root) on every database a request matches.

use std::path::PathBuf;

use clap::{Args as ClapArgs, ValueEnum};
use fdb_toc::ControlAction;
use miette::{IntoDiagnostic, Result};

use crate::common;
use crate::request::parse_request;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Action {
    Archive,
    Retrieve,
    List,
    Wipe,
    UniqueRoot,
}

impl From<Action> for ControlAction {
    fn from(action: Action) -> Self {
        match action {
            Action::Archive => ControlAction::Archive,
            Action::Retrieve => ControlAction::Retrieve,
            Action::List => ControlAction::List,
            Action::Wipe => ControlAction::Wipe,
            Action::UniqueRoot => ControlAction::UniqueRoot,
        }
    }
}

#[derive(Debug, ClapArgs)]
pub struct Args {
    #[arg(long)]
    pub config: PathBuf,
    #[arg(long = "key", value_name = "KEYWORD=VALUE")]
    pub keys: Vec<String>,
    #[arg(long, value_enum)]
    pub action: Action,
    /// Sets the flag to enabled (the default, "unlocked") state; pass
    /// `--disable` to lock it instead.
    #[arg(long, conflicts_with = "disable", default_value_t = true)]
    pub enable: bool,
    #[arg(long)]
    pub disable: bool,
}

pub fn run(args: &Args) -> Result<()> {
    common::init_logging(&args.config)?;
    let fdb = fdb::Fdb::open(&args.config).into_diagnostic()?;
    let request = parse_request(&args.keys)?;

    let enabled = !args.disable && args.enable;
    fdb.dispatcher.control(args.action.into(), &request, enabled).into_diagnostic()?;
    println!("{:?} set to {}", args.action, if enabled { "enabled" } else { "disabled" });
    Ok(())
}
