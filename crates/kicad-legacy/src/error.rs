//! Error and warning types shared by every loader and writer

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Where in a source file a problem was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// File name or other identifier of the input
    pub source: String,
    /// 1-based line number
    pub line_number: usize,
    /// Byte offset into the line
    pub offset: usize,
    /// The offending line, without its terminator
    pub line: String,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: `{}`",
            self.source, self.line_number, self.offset, self.line
        )
    }
}

/// Fatal load and save errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed {expected} at {at}")]
    MalformedToken { expected: &'static str, at: Location },

    #[error("numeric value out of range at {at}")]
    NumericRange { at: Location },

    #[error("expected a single character token at {at}")]
    InvalidChar { at: Location },

    #[error("unterminated quoted string at {at}")]
    UnterminatedString { at: Location },

    #[error("unrecognized token `{token}` at {at}")]
    UnrecognizedToken { token: String, at: Location },

    #[error("{source_name}: end of file reached before `{sentinel}` (line {line_number})")]
    MissingSentinel {
        sentinel: &'static str,
        source_name: String,
        line_number: usize,
    },

    #[error("transform entry {value} is outside {{-1, 0, 1}} at {at}")]
    InvalidTransform { value: i32, at: Location },

    #[error("invalid header, expected `{expected}` at {at}")]
    InvalidHeader { expected: &'static str, at: Location },

    #[error("{message} at {at}")]
    InvalidValue { message: String, at: Location },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sheet file {} is already open higher in the hierarchy", path.display())]
    CyclicHierarchy { path: PathBuf },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Location of a token level error, if the error has one
    pub fn location(&self) -> Option<&Location> {
        match self {
            Error::MalformedToken { at, .. }
            | Error::NumericRange { at }
            | Error::InvalidChar { at }
            | Error::UnterminatedString { at }
            | Error::UnrecognizedToken { at, .. }
            | Error::InvalidTransform { at, .. }
            | Error::InvalidHeader { at, .. }
            | Error::InvalidValue { at, .. } => Some(at),
            Error::MissingSentinel { .. } | Error::Io { .. } | Error::CyclicHierarchy { .. } => {
                None
            }
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Recoverable problems reported next to an otherwise successful load
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    #[error("{library}: symbol name `{original}` already exists, renamed to `{renamed}`")]
    AliasNameCollision {
        library: String,
        original: String,
        renamed: String,
    },

    #[error("{source_name}: documentation for `{alias}` has no matching symbol, skipped")]
    DocSidecarMismatch { alias: String, source_name: String },

    #[error("documentation file {} could not be read: {message}", path.display())]
    DocSidecarUnreadable { path: PathBuf, message: String },

    #[error("error loading sheet {}: {message}", path.display())]
    SubSheet { path: PathBuf, message: String },
}
