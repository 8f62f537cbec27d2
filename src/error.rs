//! Error taxonomy for dataset operations.

use fiz_codec::CodecError;
use thiserror::Error;

use crate::dataset::{DesiredType, ValueKind};

/// Result type for dataset operations
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Errors raised by lookups, mutations, the codec and reminders.
///
/// `MissingPath` is recoverable by design: `check`-style reads turn it into
/// `None`. `Syntax` and `Authentication` are kept apart so callers can tell a
/// corrupted payload from a tampered one.
#[derive(Debug, Clone, Error)]
pub enum DatasetError {
    /// No value exists at the path
    #[error("couldn't find dataset element \"{path}\"")]
    MissingPath { path: String },

    /// A value exists at the path but has the wrong shape
    #[error("wrong type for dataset element \"{path}\": expected {expected}, found {found}")]
    WrongType {
        path: String,
        expected: DesiredType,
        found: ValueKind,
    },

    /// The path itself is malformed
    #[error("invalid dataset path \"{path}\": {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// Serialized input is malformed
    #[error("syntax error in serialized dataset: {0}")]
    Syntax(#[from] CodecError),

    /// A reminder token failed MAC verification
    #[error("reminder authentication failed: {0}")]
    Authentication(String),

    /// A stored string could not be converted to the requested type
    #[error("dataset element \"{path}\" has value \"{value}\", which can't be converted to {target}")]
    Conversion {
        path: String,
        value: String,
        target: &'static str,
    },

    /// A sort key specification could not be parsed
    #[error("invalid sort key \"{spec}\": {reason}")]
    InvalidSortKey { spec: String, reason: String },

    /// An internal invariant was violated; aborts only the current operation
    #[error("internal error: {0}")]
    Internal(String),
}

impl DatasetError {
    /// Create a MissingPath error
    pub fn missing(path: impl Into<String>) -> Self {
        Self::MissingPath { path: path.into() }
    }

    /// True for `MissingPath`
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingPath { .. })
    }

    /// True for `Syntax`
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax(_))
    }

    /// True for `Authentication`
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}
