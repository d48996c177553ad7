//! Error types for the packed R-tree.

use thiserror::Error;

/// Errors raised by index construction, building, querying, and restore.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The declared item count is zero or does not fit the header field.
    #[error("unexpected numItems value: {0}")]
    InvalidNumItems(u64),

    /// The buffer's coordinate type tag is outside the supported set.
    #[error("unknown coordinate type tag: {0}")]
    UnknownCoordType(u8),

    /// The buffer's coordinate type tag does not match the requested type.
    #[error("coordinate type tag {got} does not match requested type (tag {expected})")]
    CoordTypeMismatch {
        /// Tag stored in the buffer header.
        got: u8,
        /// Tag of the coordinate type the caller asked for.
        expected: u8,
    },

    /// The buffer does not start with the format magic byte.
    #[error("data does not appear to be in a supported format (magic byte {0:#04x})")]
    BadMagic(u8),

    /// The buffer was written by an incompatible format version.
    #[error("got version {got} data when expected version {expected}")]
    UnsupportedVersion {
        /// Version stored in the buffer header.
        got: u8,
        /// Version this crate reads and writes.
        expected: u8,
    },

    /// The buffer length does not match the size implied by its header.
    #[error("buffer is {got} bytes but the header implies {expected}")]
    LengthMismatch {
        /// Actual buffer length.
        got: usize,
        /// Length derived from the header fields.
        expected: usize,
    },

    /// More boxes were added than declared at construction.
    #[error("added more items than the declared {expected}")]
    Capacity {
        /// Item count declared at construction.
        expected: usize,
    },

    /// The index was queried before `finish()` completed.
    #[error("data not yet indexed - call finish() before querying")]
    NotIndexed,
}

/// Result type for packed R-tree operations.
pub type Result<T> = std::result::Result<T, Error>;
