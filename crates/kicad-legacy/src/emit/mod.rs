//! Writers for the legacy schematic, library and documentation formats

mod doc;
mod library;
mod schematic;

pub use doc::{format_doc, write_doc};
pub use library::{format_library, save_library_file, write_library, write_part};
pub use schematic::{format_schematic, save_schematic, write_schematic, SchematicWriterOptions};

use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// A `"` delimited string with `"` and `\` backslash escaped.
pub(crate) struct Quoted<'a>(pub &'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for c in self.0.chars() {
            if matches!(c, '"' | '\\') {
                f.write_str("\\")?;
            }
            write!(f, "{c}")?;
        }
        f.write_str("\"")
    }
}

/// Six decimals like the legacy writers, unless that would lose precision.
pub(crate) fn format_double(value: f64) -> String {
    let fixed = format!("{value:.6}");
    if fixed.parse::<f64>() == Ok(value) {
        fixed
    } else {
        value.to_string()
    }
}

/// Run a writer into a fresh `String`.
pub(crate) fn to_string(write: impl FnOnce(&mut String) -> fmt::Result) -> String {
    let mut out = String::new();
    write(&mut out).expect("writing to a String cannot fail");
    out
}

/// Write `text` to `path`, following a symlink to its target.
pub(crate) fn write_file(path: &Path, text: &str) -> Result<()> {
    let target = match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            std::fs::canonicalize(path).map_err(|e| Error::io(path, e))?
        }
        _ => path.to_path_buf(),
    };
    log::debug!("writing {}", target.display());
    std::fs::write(&target, text).map_err(|e| Error::io(&target, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_escapes() {
        assert_eq!(Quoted(r#"a"b\c"#).to_string(), r#""a\"b\\c""#);
        assert_eq!(Quoted("").to_string(), "\"\"");
    }

    #[test]
    fn test_format_double() {
        assert_eq!(format_double(1.0), "1.000000");
        assert_eq!(format_double(0.1234567), "0.1234567");
    }
}
