//! Primitive token parsers.
//!
//! Each parser takes the unread remainder of a line and returns the parsed
//! value together with the new remainder, positioned at the start of the next
//! token. [`Scanner`] threads the remainder through a sequence of calls so the
//! record loaders read like the grammar they implement.

use std::num::IntErrorKind;

use crate::error::{Error, Location, Result};

/// Diagnostic context of the line being scanned
#[derive(Debug, Clone, Copy)]
pub struct LineCtx<'a> {
    pub source: &'a str,
    pub line: &'a str,
    pub line_number: usize,
}

impl<'a> LineCtx<'a> {
    /// Location of `rest` within the line.
    pub fn at(&self, rest: &str) -> Location {
        Location {
            source: self.source.to_string(),
            line_number: self.line_number,
            offset: self.line.len().saturating_sub(rest.len()),
            line: self.line.to_string(),
        }
    }

    fn malformed(&self, expected: &'static str, rest: &str) -> Error {
        Error::MalformedToken {
            expected,
            at: self.at(rest),
        }
    }
}

fn skip_ws(s: &str) -> &str {
    s.trim_start_matches(|c: char| c.is_ascii_whitespace())
}

/// Split off the next whitespace delimited word.
fn word(s: &str) -> (&str, &str) {
    let s = skip_ws(s);
    let end = s
        .find(|c: char| c.is_ascii_whitespace())
        .unwrap_or(s.len());
    (&s[..end], skip_ws(&s[end..]))
}

fn int_error(ctx: &LineCtx, kind: &IntErrorKind, at: &str) -> Error {
    match kind {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
            Error::NumericRange { at: ctx.at(at) }
        }
        _ => ctx.malformed("integer", at),
    }
}

pub fn parse_int<'a>(ctx: &LineCtx, input: &'a str) -> Result<(i32, &'a str)> {
    let start = skip_ws(input);
    let (token, rest) = word(start);
    let value = token
        .parse::<i32>()
        .map_err(|e| int_error(ctx, e.kind(), start))?;
    Ok((value, rest))
}

pub fn parse_hex<'a>(ctx: &LineCtx, input: &'a str) -> Result<(u32, &'a str)> {
    let start = skip_ws(input);
    let (token, rest) = word(start);
    let value = u32::from_str_radix(token, 16).map_err(|e| int_error(ctx, e.kind(), start))?;
    Ok((value, rest))
}

pub fn parse_double<'a>(ctx: &LineCtx, input: &'a str) -> Result<(f64, &'a str)> {
    let start = skip_ws(input);
    let (token, rest) = word(start);
    let value = token
        .parse::<f64>()
        .map_err(|_| ctx.malformed("number", start))?;
    if value.is_infinite() {
        return Err(Error::NumericRange { at: ctx.at(start) });
    }
    Ok((value, rest))
}

pub fn parse_char<'a>(ctx: &LineCtx, input: &'a str) -> Result<(char, &'a str)> {
    let start = skip_ws(input);
    let mut chars = start.chars();
    match (chars.next(), chars.next()) {
        (Some(c), next)
            if !c.is_ascii_whitespace() && next.map_or(true, |n| n.is_ascii_whitespace()) =>
        {
            Ok((c, skip_ws(&start[c.len_utf8()..])))
        }
        _ => Err(Error::InvalidChar { at: ctx.at(start) }),
    }
}

/// A run of non-whitespace. With `can_be_empty`, end of line yields `""`.
pub fn parse_unquoted<'a>(
    ctx: &LineCtx,
    input: &'a str,
    can_be_empty: bool,
) -> Result<(&'a str, &'a str)> {
    let (token, rest) = word(input);
    if token.is_empty() && !can_be_empty {
        return Err(ctx.malformed("string", skip_ws(input)));
    }
    Ok((token, rest))
}

/// A `"` delimited string. A backslash protects the next byte; only `\"` and
/// `\\` lose the backslash.
pub fn parse_quoted<'a>(ctx: &LineCtx, input: &'a str) -> Result<(String, &'a str)> {
    let start = skip_ws(input);
    let Some(body) = start.strip_prefix('"') else {
        return Err(ctx.malformed("quoted string", start));
    };

    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((out, skip_ws(&body[i + 1..]))),
            '\\' => match chars.next() {
                Some((_, e @ ('"' | '\\'))) => out.push(e),
                Some((_, e)) => {
                    out.push('\\');
                    out.push(e);
                }
                None => break,
            },
            c => out.push(c),
        }
    }
    Err(Error::UnterminatedString { at: ctx.at(start) })
}

/// Cursor over one line, threading the remainder between primitive parsers.
#[derive(Debug, Clone, Copy)]
pub struct Scanner<'a> {
    ctx: LineCtx<'a>,
    rest: &'a str,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str, line: &'a str, line_number: usize) -> Self {
        Self {
            ctx: LineCtx {
                source,
                line,
                line_number,
            },
            rest: skip_ws(line),
        }
    }

    pub fn ctx(&self) -> &LineCtx<'a> {
        &self.ctx
    }

    /// What has not been consumed yet.
    pub fn rest(&self) -> &'a str {
        self.rest
    }

    pub fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    /// The next word, without consuming it.
    pub fn peek(&self) -> &'a str {
        word(self.rest).0
    }

    /// Consume `n` bytes of the remainder and any whitespace after them.
    pub fn skip(&mut self, n: usize) {
        self.rest = skip_ws(self.rest.get(n..).unwrap_or(""));
    }

    /// Location of the cursor.
    pub fn location(&self) -> Location {
        self.ctx.at(self.rest)
    }

    pub fn int(&mut self) -> Result<i32> {
        let (v, rest) = parse_int(&self.ctx, self.rest)?;
        self.rest = rest;
        Ok(v)
    }

    pub fn hex(&mut self) -> Result<u32> {
        let (v, rest) = parse_hex(&self.ctx, self.rest)?;
        self.rest = rest;
        Ok(v)
    }

    pub fn double(&mut self) -> Result<f64> {
        let (v, rest) = parse_double(&self.ctx, self.rest)?;
        self.rest = rest;
        Ok(v)
    }

    pub fn char(&mut self) -> Result<char> {
        let (v, rest) = parse_char(&self.ctx, self.rest)?;
        self.rest = rest;
        Ok(v)
    }

    pub fn unquoted(&mut self) -> Result<&'a str> {
        let (v, rest) = parse_unquoted(&self.ctx, self.rest, false)?;
        self.rest = rest;
        Ok(v)
    }

    /// Like [`Scanner::unquoted`], but `""` at end of line.
    pub fn unquoted_opt(&mut self) -> Result<&'a str> {
        let (v, rest) = parse_unquoted(&self.ctx, self.rest, true)?;
        self.rest = rest;
        Ok(v)
    }

    pub fn quoted(&mut self) -> Result<String> {
        let (v, rest) = parse_quoted(&self.ctx, self.rest)?;
        self.rest = rest;
        Ok(v)
    }

    /// Consume `keyword` if the line continues with it.
    ///
    /// Keywords ending in `=` (e.g. `Path=`) may be glued to what follows,
    /// all others must be followed by whitespace or end of line.
    pub fn keyword(&mut self, keyword: &str) -> bool {
        let Some(after) = self.rest.strip_prefix(keyword) else {
            return false;
        };
        let bounded = keyword.ends_with('=')
            || after.is_empty()
            || after.starts_with(|c: char| c.is_ascii_whitespace());
        if bounded {
            self.rest = skip_ws(after);
        }
        bounded
    }

    /// Like [`Scanner::keyword`] but fails with `UnrecognizedToken`.
    pub fn expect(&mut self, keyword: &str) -> Result<()> {
        if self.keyword(keyword) {
            Ok(())
        } else {
            Err(self.unrecognized())
        }
    }

    /// Error naming the word under the cursor as unrecognized.
    pub fn unrecognized(&self) -> Error {
        let (token, _) = word(self.rest);
        Error::UnrecognizedToken {
            token: token.to_string(),
            at: self.location(),
        }
    }

    pub fn invalid(&self, message: impl Into<String>) -> Error {
        Error::InvalidValue {
            message: message.into(),
            at: self.location(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(line: &str) -> LineCtx<'_> {
        LineCtx {
            source: "test",
            line,
            line_number: 1,
        }
    }

    #[test]
    fn test_int_advances_to_next_token() {
        let line = "  42   -7 x";
        let c = ctx(line);
        let (a, rest) = parse_int(&c, line).unwrap();
        let (b, rest) = parse_int(&c, rest).unwrap();
        assert_eq!((a, b), (42, -7));
        assert_eq!(rest, "x");
    }

    #[test]
    fn test_int_errors() {
        let line = "12a";
        assert!(matches!(
            parse_int(&ctx(line), line),
            Err(Error::MalformedToken { .. })
        ));
        let line = "99999999999";
        assert!(matches!(
            parse_int(&ctx(line), line),
            Err(Error::NumericRange { .. })
        ));
    }

    #[test]
    fn test_hex_and_double() {
        let line = "5C3A1B2F 1.5";
        let c = ctx(line);
        let (h, rest) = parse_hex(&c, line).unwrap();
        let (d, rest) = parse_double(&c, rest).unwrap();
        assert_eq!(h, 0x5C3A1B2F);
        assert_eq!(d, 1.5);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_char_token() {
        let line = "H L CNN";
        let c = ctx(line);
        let (h, rest) = parse_char(&c, line).unwrap();
        assert_eq!(h, 'H');
        let (l, rest) = parse_char(&c, rest).unwrap();
        assert_eq!(l, 'L');
        assert!(matches!(
            parse_char(&c, rest),
            Err(Error::InvalidChar { .. })
        ));
    }

    #[test]
    fn test_unquoted_empty_mode() {
        let line = "   ";
        assert_eq!(parse_unquoted(&ctx(line), line, true).unwrap().0, "");
        assert!(parse_unquoted(&ctx(line), line, false).is_err());
    }

    #[test]
    fn test_quoted_escapes() {
        let line = r#""a\"b" rest"#;
        let (s, rest) = parse_quoted(&ctx(line), line).unwrap();
        assert_eq!(s, "a\"b");
        assert_eq!(rest, "rest");

        let line = r#""c:\dir\\x""#;
        let (s, _) = parse_quoted(&ctx(line), line).unwrap();
        assert_eq!(s, r"c:\dir\x");
    }

    #[test]
    fn test_unterminated_quote_reports_offset() {
        let line = r#"F 0 "abc"#;
        let err = parse_quoted(&ctx(line), &line[4..]).unwrap_err();
        match err {
            Error::UnterminatedString { at } => assert_eq!(at.offset, 4),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_scanner_keywords() {
        let mut s = Scanner::new("t", r#"AR Path="/1/2" Ref="R1""#, 1);
        assert!(!s.keyword("A"));
        assert!(s.keyword("AR"));
        assert!(s.keyword("Path="));
        assert_eq!(s.quoted().unwrap(), "/1/2");
        assert!(s.keyword("Ref="));
        assert_eq!(s.quoted().unwrap(), "R1");
        assert!(s.is_empty());
    }
}
