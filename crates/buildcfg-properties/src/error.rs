//! Error types for properties loading.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Why a properties entry could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    /// Entry has no `=` or `:` separator.
    MissingSeparator,
    /// Separator found but the key before it is empty.
    EmptyKey,
    /// `\u` escape that is truncated, not hex, or not a valid scalar value.
    InvalidUnicodeEscape(String),
    /// Trailing `\` on the last line of the file.
    DanglingContinuation,
    /// File content is not valid UTF-8.
    InvalidUtf8,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSeparator => write!(f, "expected 'key=value' or 'key:value'"),
            Self::EmptyKey => write!(f, "empty key"),
            Self::InvalidUnicodeEscape(seq) => write!(f, "invalid unicode escape '\\u{}'", seq),
            Self::DanglingContinuation => write!(f, "line continuation at end of file"),
            Self::InvalidUtf8 => write!(f, "content is not valid UTF-8"),
        }
    }
}

/// Errors that can occur when loading a properties file
#[derive(Debug, thiserror::Error)]
pub enum PropertiesError {
    #[error("malformed properties file {}, line {line}: {reason}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: MalformedReason,
    },

    #[error("failed to read properties file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PropertiesError {
    /// Path of the file the error refers to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Malformed { path, .. } | Self::Io { path, .. } => path,
        }
    }

    /// 1-based line number for syntax errors.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Malformed { line, .. } => Some(*line),
            Self::Io { .. } => None,
        }
    }
}

/// Parse failure before a file path is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParseFailure {
    pub line: usize,
    pub reason: MalformedReason,
}

impl ParseFailure {
    pub(crate) fn new(line: usize, reason: MalformedReason) -> Self {
        Self { line, reason }
    }

    pub(crate) fn at(self, path: impl Into<PathBuf>) -> PropertiesError {
        PropertiesError::Malformed {
            path: path.into(),
            line: self.line,
            reason: self.reason,
        }
    }
}
