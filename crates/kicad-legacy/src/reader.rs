//! Line supply for the line oriented legacy formats

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

use crate::error::{Error, Location, Result};
use crate::token::Scanner;

/// Supplies one logical line at a time, tracking position for diagnostics.
pub trait LineReader {
    /// Advance to the next line. Returns `false` at end of input.
    fn advance(&mut self) -> Result<bool>;

    /// The current line without its terminator.
    fn line(&self) -> &str;

    /// 1-based number of the current line, 0 before the first `advance`.
    fn line_number(&self) -> usize;

    /// Identifier of the input used in error messages.
    fn source(&self) -> &str;

    /// A token scanner over the current line.
    fn scanner(&self) -> Scanner<'_> {
        Scanner::new(self.source(), self.line(), self.line_number())
    }

    /// Error for a required terminator that never showed up.
    fn missing(&self, sentinel: &'static str) -> Error {
        Error::MissingSentinel {
            sentinel,
            source_name: self.source().to_string(),
            line_number: self.line_number(),
        }
    }

    /// Location of the start of the current line.
    fn location(&self) -> Location {
        Location {
            source: self.source().to_string(),
            line_number: self.line_number(),
            offset: 0,
            line: self.line().to_string(),
        }
    }
}

/// [`LineReader`] over any buffered byte stream.
///
/// Invalid UTF-8 is replaced rather than rejected; old files were written in
/// whatever the platform encoding happened to be.
pub struct BufLineReader<R> {
    inner: R,
    source: String,
    buf: Vec<u8>,
    line: String,
    line_number: usize,
}

impl<R: BufRead> BufLineReader<R> {
    pub fn new(inner: R, source: impl Into<String>) -> Self {
        Self {
            inner,
            source: source.into(),
            buf: Vec::new(),
            line: String::new(),
            line_number: 0,
        }
    }
}

impl BufLineReader<BufReader<File>> {
    /// Open a file for reading.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::new(BufReader::new(file), path.display().to_string()))
    }
}

impl BufLineReader<Cursor<Vec<u8>>> {
    /// Read from an in-memory string.
    pub fn from_text(text: &str, source: impl Into<String>) -> Self {
        Self::new(Cursor::new(text.as_bytes().to_vec()), source)
    }
}

impl<R: BufRead> LineReader for BufLineReader<R> {
    fn advance(&mut self) -> Result<bool> {
        self.buf.clear();
        let n = self
            .inner
            .read_until(b'\n', &mut self.buf)
            .map_err(|e| Error::io(&self.source, e))?;
        if n == 0 {
            return Ok(false);
        }
        while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
            self.buf.pop();
        }
        self.line = String::from_utf8_lossy(&self.buf).into_owned();
        self.line_number += 1;
        Ok(true)
    }

    fn line(&self) -> &str {
        &self.line
    }

    fn line_number(&self) -> usize {
        self.line_number
    }

    fn source(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_lines_and_counts() {
        let mut reader = BufLineReader::from_text("first\r\nsecond\n\nlast", "mem");
        let mut lines = Vec::new();
        while reader.advance().unwrap() {
            lines.push((reader.line_number(), reader.line().to_string()));
        }
        assert_eq!(
            lines,
            vec![
                (1, "first".to_string()),
                (2, "second".to_string()),
                (3, String::new()),
                (4, "last".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_sentinel_reports_source() {
        let mut reader = BufLineReader::from_text("a\n", "demo.sch");
        while reader.advance().unwrap() {}
        let err = reader.missing("$EndDescr");
        assert!(err.to_string().contains("demo.sch"));
        assert!(err.to_string().contains("$EndDescr"));
    }
}
