//! Error types for compaction picking.

use thiserror::Error;

/// Result type alias for picker operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for compaction-input validation.
///
/// "Nothing to compact" is not an error; pickers signal it by returning
/// `None`. Errors are reserved for malformed input and for requests that
/// collide with work already in flight.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Malformed input: empty file set, unknown file number, illegal
    /// output level.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A requested file is already part of a running compaction.
    #[error("Aborted: {0}")]
    Aborted(String),

    /// Internal error (should not happen).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid-argument error with the given message.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Create an aborted error with the given message.
    pub fn aborted<S: Into<String>>(msg: S) -> Self {
        Error::Aborted(msg.into())
    }

    /// Create an internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Check if this error means the request raced with running work.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted(_))
    }

    /// Check if this error indicates malformed input.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}
