//! `dump` command: print the parsed model of one file

use anyhow::{Context, Result};
use clap::Args;
use kicad_legacy::{load_library_file, load_schematic_file};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Schematic (.sch) or symbol library (.lib)
    #[arg(value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub path: PathBuf,

    /// Print JSON instead of the debug representation
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: DumpArgs) -> Result<()> {
    println!("{}", render(&args.path, args.json)?);
    Ok(())
}

fn render(path: &Path, json: bool) -> Result<String> {
    let is_library = path.extension().is_some_and(|ext| ext == "lib");
    let context = || format!("Failed to load {}", path.display());

    let text = if is_library {
        let library = load_library_file(path).with_context(context)?;
        if json {
            serde_json::to_string_pretty(&library)?
        } else {
            format!("{library:#?}")
        }
    } else {
        let screen = load_schematic_file(path).with_context(context)?;
        if json {
            serde_json::to_string_pretty(&screen)?
        } else {
            format!("{screen:#?}")
        }
    };
    Ok(text)
}
