//! Error handling for listflow
//!
//! Every failure in this crate is a violation of a calling contract: an index
//! outside the valid bounds, a malformed argument, or a duplicate registration.
//! Errors are raised before any state changes and surface to the immediate
//! caller unchanged.

use thiserror::Error;

/// Main error type for list and pipeline operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    /// An index, or an index plus a count, falls outside the sequence
    #[error("index {index} out of range for length {len}")]
    OutOfRange { index: usize, len: usize },

    /// An argument is malformed (overflowing range, zero-length range)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The same observer, listener or source was registered twice
    #[error("duplicate registration: {0}")]
    DuplicateRegistration(&'static str),
}

impl CollectionError {
    pub(crate) fn out_of_range(index: usize, len: usize) -> Self {
        CollectionError::OutOfRange { index, len }
    }
}

/// Result type alias for listflow operations
pub type Result<T> = std::result::Result<T, CollectionError>;

/// Returns `start + count`, failing instead of wrapping around.
pub(crate) fn checked_end(start: usize, count: usize) -> Result<usize> {
    start.checked_add(count).ok_or_else(|| {
        CollectionError::InvalidArgument(format!("range {start}+{count} overflows"))
    })
}
