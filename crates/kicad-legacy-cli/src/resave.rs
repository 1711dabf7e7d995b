//! `resave` command: load a schematic and write it in canonical form

use anyhow::{Context, Result};
use clap::Args;
use kicad_legacy::{format_schematic, load_schematic_file, Schematic, SchematicWriterOptions};
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ResaveArgs {
    /// Schematic file to load
    #[arg(value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub path: PathBuf,

    /// Output file (defaults to overwriting the input)
    #[arg(short, long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Print to stdout instead of writing a file
    #[arg(long, conflicts_with_all = ["output", "hierarchy"])]
    pub stdout: bool,

    /// Rewrite every sheet of the hierarchy in place
    #[arg(long, conflicts_with = "output")]
    pub hierarchy: bool,

    /// Library names for the LIBS: header lines
    #[arg(long = "lib", value_name = "NAME")]
    pub libraries: Vec<String>,
}

pub fn execute(args: ResaveArgs) -> Result<()> {
    let options = SchematicWriterOptions {
        libraries: args.libraries.clone(),
    };

    if args.hierarchy {
        let schematic = Schematic::load(&args.path)
            .with_context(|| format!("Failed to load schematic: {}", args.path.display()))?;
        if !schematic.warnings().is_empty() {
            anyhow::bail!(
                "Refusing to rewrite a partially loaded hierarchy:\n{}",
                schematic.warning_text()
            );
        }
        schematic
            .save_all(&options)
            .with_context(|| format!("Failed to save hierarchy: {}", args.path.display()))?;
        eprintln!("Wrote {} sheet file(s)", schematic.screens().count());
        return Ok(());
    }

    let screen = load_schematic_file(&args.path)
        .with_context(|| format!("Failed to load schematic: {}", args.path.display()))?;
    let text = format_schematic(&screen, &options);

    if args.stdout {
        print!("{text}");
    } else {
        let output_path = args.output.unwrap_or(args.path);
        fs::write(&output_path, &text)
            .with_context(|| format!("Failed to write output file: {}", output_path.display()))?;
        eprintln!("Wrote {}", output_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCH: &str = "EESchema Schematic File Version 2\nLIBS:old\nEELAYER 25 0\nEELAYER END\n$Descr A4 11693 8268\n$EndDescr\nConnection ~ 100 200\n$EndSCHEMATC\n";

    #[test]
    fn test_resave_to_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.sch");
        let output = dir.path().join("out.sch");
        fs::write(&input, SCH).unwrap();

        execute(ResaveArgs {
            path: input.clone(),
            output: Some(output.clone()),
            stdout: false,
            hierarchy: false,
            libraries: vec!["device".to_string()],
        })
        .unwrap();

        let written = fs::read_to_string(&output).unwrap();
        assert!(written.starts_with("EESchema Schematic File Version 4\nLIBS:device\n"));
        assert!(written.contains("Connection ~ 100 200\n"));
        assert_eq!(fs::read_to_string(&input).unwrap(), SCH);
    }
}
