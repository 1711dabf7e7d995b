//! `check` command: load a whole hierarchy and summarize it

use anyhow::{Context, Result};
use clap::Args;
use kicad_legacy::Schematic;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Root schematic file
    #[arg(value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub path: PathBuf,

    /// Fail when any sub-sheet could not be loaded
    #[arg(long)]
    pub strict: bool,
}

pub fn execute(args: CheckArgs) -> Result<()> {
    let schematic = Schematic::load(&args.path)
        .with_context(|| format!("Failed to load schematic: {}", args.path.display()))?;

    for (path, screen) in schematic.screens() {
        let screen = screen.borrow();
        eprintln!(
            "  {}: {} items, {} components, {} sheets{}",
            path.display(),
            screen.items.len(),
            screen.components().count(),
            screen.sheets().count(),
            if screen.modified { " (repaired)" } else { "" }
        );
    }

    let warnings = schematic.warnings();
    if warnings.is_empty() {
        eprintln!("{}: OK", args.path.display());
        return Ok(());
    }

    eprintln!("{}", schematic.warning_text());
    if args.strict {
        anyhow::bail!(
            "{} sub-sheet(s) failed to load under {}",
            warnings.len(),
            args.path.display()
        );
    }
    Ok(())
}
