//! Error types for the tmfgen-core library.
//!
//! Every error is fatal to the parse run that raised it: no partial schema
//! is ever returned. Callers decide whether to skip the file and continue.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tmfgen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all tmfgen operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to open or read an input TMF file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while scanning the input stream
    #[error("failed to read line {line}: {source}")]
    Read {
        /// 1-based line number that could not be read
        line: usize,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file header line does not match the preamble grammar
    #[error("preamble does not match '<provider> <component> // ... SRC=<file>': {line:?}")]
    PreambleFormat {
        /// The offending line (empty if the input ended early)
        line: String,
    },

    /// Neither event header variant matched the assembled header
    #[error("event header at line {line} does not match either supported TMF format: {header:?}")]
    EventHeaderFormat {
        /// Line number of the first header fragment
        line: usize,
        /// The space-joined header text
        header: String,
    },

    /// A line inside an event body is not `<name>, <type>`
    #[error("field definition at line {line} does not match expected format: {text:?}")]
    FieldFormat {
        /// Line number of the field
        line: usize,
        /// The offending line
        text: String,
    },

    /// Input ended inside a block that requires a terminator
    #[error("unexpected end of input after line {line}: expected {expected}")]
    UnexpectedEof {
        /// Last line number read
        line: usize,
        /// What the scanner was waiting for
        expected: &'static str,
    },
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new preamble format error
    pub fn preamble_format(line: impl Into<String>) -> Self {
        Self::PreambleFormat { line: line.into() }
    }

    /// Creates a new event header format error
    pub fn event_header_format(line: usize, header: impl Into<String>) -> Self {
        Self::EventHeaderFormat {
            line,
            header: header.into(),
        }
    }

    /// Creates a new field format error
    pub fn field_format(line: usize, text: impl Into<String>) -> Self {
        Self::FieldFormat {
            line,
            text: text.into(),
        }
    }

    /// Creates a new unexpected end-of-input error
    pub fn unexpected_eof(line: usize, expected: &'static str) -> Self {
        Self::UnexpectedEof { line, expected }
    }

    /// Returns true if the input violated the TMF grammar, as opposed to
    /// an I/O failure
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::PreambleFormat { .. }
                | Self::EventHeaderFormat { .. }
                | Self::FieldFormat { .. }
                | Self::UnexpectedEof { .. }
        )
    }
}
