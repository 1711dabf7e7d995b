//! Command line tools for legacy EESchema schematics and symbol libraries

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;

mod check;
mod dump;
mod list_lib;
mod resave;

#[derive(Parser, Debug)]
#[command(name = "kicad-legacy", version, about, long_about = None)]
struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a schematic hierarchy and report problems
    Check(check::CheckArgs),
    /// Load a schematic and write it back out
    Resave(resave::ResaveArgs),
    /// List the symbols of a library
    ListLib(list_lib::ListLibArgs),
    /// Print a parsed schematic or library
    Dump(dump::DumpArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match cli.command {
        Commands::Check(args) => check::execute(args),
        Commands::Resave(args) => resave::execute(args),
        Commands::ListLib(args) => list_lib::execute(args),
        Commands::Dump(args) => dump::execute(args),
    }
}
