//! Error types for the framing layer.

use thiserror::Error;

/// Result type for framing operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Malformed framed input.
///
/// Every variant carries the byte offset at which the problem was detected so
/// callers can report where a payload went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Input ended in the middle of a field or structure
    #[error("input ended at offset {offset} while reading {context}")]
    Truncated {
        offset: usize,
        context: &'static str,
    },

    /// Length field is not a canonical decimal integer
    #[error("invalid length field at offset {offset}: {reason}")]
    BadLength { offset: usize, reason: String },

    /// Length field counts more bytes than the input holds
    #[error("field at offset {offset} declares {declared} bytes but only {remaining} remain")]
    LengthOverrun {
        offset: usize,
        declared: usize,
        remaining: usize,
    },

    /// A structural byte was required but something else was found
    #[error("expected '{expected}' at offset {offset}, found '{found}'")]
    Unexpected {
        offset: usize,
        expected: char,
        found: char,
    },

    /// Bytes remain after a complete top-level value
    #[error("unexpected trailing input at offset {offset}")]
    TrailingInput { offset: usize },

    /// A field that must hold text is not valid UTF-8
    #[error("field at offset {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: usize },

    /// A key field is empty
    #[error("empty key at offset {offset}")]
    EmptyKey { offset: usize },

    /// Structures are nested deeper than the reader allows
    #[error("nesting deeper than {limit} levels at offset {offset}")]
    TooDeep { offset: usize, limit: usize },
}

impl CodecError {
    /// Byte offset at which the error was detected.
    pub fn offset(&self) -> usize {
        match self {
            Self::Truncated { offset, .. }
            | Self::BadLength { offset, .. }
            | Self::LengthOverrun { offset, .. }
            | Self::Unexpected { offset, .. }
            | Self::TrailingInput { offset }
            | Self::InvalidUtf8 { offset }
            | Self::EmptyKey { offset }
            | Self::TooDeep { offset, .. } => *offset,
        }
    }
}
