//! Error types for lbinary.
//!
//! Only the write path can fail. Reads are fail-soft and return default
//! values instead of errors.

use thiserror::Error;

/// Main error type for all lbinary write operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LBinaryError {
    /// Growing the buffer would exceed the pool's maximum buffer size.
    #[error("Buffer capacity exceeded: {required} bytes required, maximum is {max}")]
    CapacityExceeded {
        /// Total bytes the buffer would need to hold.
        required: usize,
        /// Configured maximum buffer size.
        max: usize,
    },

    /// The writer was used after `dispose()`.
    #[error("Writer has been disposed")]
    Disposed,

    /// A nested object would exceed the maximum nesting depth.
    #[error("Maximum nesting depth {0} exceeded")]
    DepthExceeded(usize),

    /// A character outside the Basic Multilingual Plane was written as a 16-bit char.
    #[error("Character {0:?} does not fit in a single UTF-16 code unit")]
    UnrepresentableChar(char),
}

/// Result type alias using LBinaryError.
pub type Result<T> = std::result::Result<T, LBinaryError>;
