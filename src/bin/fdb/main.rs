//! CLI entrypoint. Mirrors `dolos`'s `enum Dolos { Sync(Args), Read(Args) }`
//! dispatch shape: one subcommand per enum variant, each variant wrapping
//! its module's `Args`, each module owning its own `run()`.

mod archive;
mod axes;
mod common;
mod control;
mod inspect;
mod list;
mod move_cmd;
mod purge;
mod request;
mod retrieve;
mod wipe;

use clap::Parser;
use miette::Result;

#[derive(Parser)]
#[clap(name = "fdb", version, about = "Indexed object store for scientific field data")]
enum Fdb {
    /// Writes a field's payload to the database the request resolves to.
    Archive(archive::Args),
    /// Enumerates the fields a request matches.
    List(list::Args),
    /// Resolves a request to a single field and prints where it lives.
    Inspect(inspect::Args),
    /// Resolves a request to a single field and writes its payload out.
    Retrieve(retrieve::Args),
    /// Deletes every database a request matches.
    Wipe(wipe::Args),
    /// Reclaims space masked by superseding writes.
    Purge(purge::Args),
    /// Locks or unlocks an archive/retrieve/list/wipe/unique-root flag.
    Control(control::Args),
    /// Relocates the database a request resolves to onto another root.
    Move(move_cmd::Args),
    /// Prints the observed keyword values across matching databases.
    Axes(axes::Args),
}

fn main() -> Result<()> {
    let args = Fdb::parse();

    match args {
        Fdb::Archive(args) => archive::run(&args),
        Fdb::List(args) => list::run(&args),
        Fdb::Inspect(args) => inspect::run(&args),
        Fdb::Retrieve(args) => retrieve::run(&args),
        Fdb::Wipe(args) => wipe::run(&args),
        Fdb::Purge(args) => purge::run(&args),
        Fdb::Control(args) => control::run(&args),
        Fdb::Move(args) => move_cmd::run(&args),
        Fdb::Axes(args) => axes::run(&args),
    }
}
