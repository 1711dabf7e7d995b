//! Writer for `.dcm` documentation files

use std::fmt::{self, Write};

use super::to_string;
use crate::model::LibAlias;
use crate::parser::DOC_HEADER;

pub fn format_doc<'a>(aliases: impl IntoIterator<Item = &'a LibAlias>) -> String {
    to_string(|out| write_doc(out, aliases))
}

/// Write a block for every alias that carries documentation.
pub fn write_doc<'a, W: Write>(
    out: &mut W,
    aliases: impl IntoIterator<Item = &'a LibAlias>,
) -> fmt::Result {
    writeln!(out, "{DOC_HEADER}  Version 2.0")?;
    for alias in aliases.into_iter().filter(|a| a.has_doc()) {
        writeln!(out, "#")?;
        writeln!(out, "$CMP {}", alias.name)?;
        if !alias.description.is_empty() {
            writeln!(out, "D {}", alias.description)?;
        }
        if !alias.keywords.is_empty() {
            writeln!(out, "K {}", alias.keywords)?;
        }
        if !alias.doc_file.is_empty() {
            writeln!(out, "F {}", alias.doc_file)?;
        }
        writeln!(out, "$ENDCMP")?;
    }
    writeln!(out, "#")?;
    writeln!(out, "#End Doc Library")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_doc;

    #[test]
    fn test_undocumented_aliases_are_skipped() {
        let mut documented = LibAlias::new("LM358");
        documented.description = "Dual opamp".to_string();
        documented.doc_file = "lm358.pdf".to_string();
        let bare = LibAlias::new("LM2904");

        let text = format_doc([&documented, &bare]);
        assert_eq!(
            text,
            "EESchema-DOCLIB  Version 2.0\n#\n$CMP LM358\nD Dual opamp\nF lm358.pdf\n$ENDCMP\n#\n#End Doc Library\n"
        );

        let entries = parse_doc(&text, "t.dcm").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].description, "Dual opamp");
        assert!(entries[0].keywords.is_empty());
    }
}
