//! Loader for `.dcm` documentation files

use std::path::Path;

use crate::error::{Error, Result};
use crate::reader::{BufLineReader, LineReader};

/// Magic at the start of a documentation file
pub const DOC_HEADER: &str = "EESchema-DOCLIB";

/// Documentation of one alias
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocEntry {
    pub name: String,
    pub description: String,
    pub keywords: String,
    pub doc_file: String,
}

pub fn parse_doc(text: &str, source: &str) -> Result<Vec<DocEntry>> {
    let mut reader = BufLineReader::from_text(text, source);
    load_doc(&mut reader)
}

pub fn load_doc_file(path: &Path) -> Result<Vec<DocEntry>> {
    let mut reader = BufLineReader::open(path)?;
    load_doc(&mut reader)
}

/// Read every `$CMP` ... `$ENDCMP` block. Matching entries to aliases is left
/// to the caller.
pub fn load_doc(reader: &mut dyn LineReader) -> Result<Vec<DocEntry>> {
    log::debug!("loading documentation {}", reader.source());
    if !reader.advance()? {
        return Err(reader.missing(DOC_HEADER));
    }
    let mut s = reader.scanner();
    if !s.keyword(DOC_HEADER) {
        return Err(Error::InvalidHeader {
            expected: DOC_HEADER,
            at: s.location(),
        });
    }

    let mut entries = Vec::new();
    while reader.advance()? {
        let mut s = reader.scanner();
        if !s.keyword("$CMP") {
            // Comments and anything between blocks
            continue;
        }
        let mut entry = DocEntry {
            name: s.rest().trim_end().to_string(),
            ..DocEntry::default()
        };

        loop {
            if !reader.advance()? {
                return Err(reader.missing("$ENDCMP"));
            }
            let line = reader.line();
            let mut s = reader.scanner();
            if s.keyword("$ENDCMP") {
                break;
            }
            // Payload is the rest of the line after the one letter tag.
            let text = line.get(2..).unwrap_or("").trim().to_string();
            match line.as_bytes().first() {
                Some(b'D') => entry.description = text,
                Some(b'K') => entry.keywords = text,
                Some(b'F') => entry.doc_file = text,
                _ => {}
            }
        }
        entries.push(entry);
    }
    Ok(entries)
}
