//! `list-lib` command: print every alias of a symbol library

use anyhow::{Context, Result};
use clap::Args;
use kicad_legacy::{Epoch, LibraryCache, LibraryCacheOptions};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ListLibArgs {
    /// Symbol library file (.lib)
    #[arg(value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub path: PathBuf,

    /// Do not read the .dcm documentation file
    #[arg(long)]
    pub no_doc: bool,
}

pub fn execute(args: ListLibArgs) -> Result<()> {
    let options = LibraryCacheOptions {
        load_doc: !args.no_doc,
        ..LibraryCacheOptions::default()
    };
    let cache = LibraryCache::load(&args.path, options, Epoch::new())
        .with_context(|| format!("Failed to load library: {}", args.path.display()))?;

    for name in cache.alias_names() {
        let Some((part, alias)) = cache.lookup(name) else {
            continue;
        };
        if part.name == name {
            println!("{name}\t{}", alias.description);
        } else {
            println!("{name} -> {}\t{}", part.name, alias.description);
        }
    }

    eprintln!(
        "{}: version {}, {} symbols, {} warnings",
        args.path.display(),
        cache.version(),
        cache.part_count(),
        cache.warnings().len()
    );
    Ok(())
}
