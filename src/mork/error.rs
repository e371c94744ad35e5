//! Custom error types for the mork-reader crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum MorkError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// The file does not carry the Mork magic header line.
    #[error("Unsupported format: the Mork magic header line is missing.")]
    UnsupportedFormat,

    /// The grammar disallows the character found at this position.
    ///
    /// This is the only fatal decode condition: an unrecognized top-level
    /// construct, a lone `/` where a `//` comment was expected, or a stray
    /// character inside a row body. Truncated blocks are not errors.
    #[error("Malformed input: unexpected character {found:?} at offset {pos}")]
    MalformedInput { pos: usize, found: char },
}

/// A convenience `Result` type alias using the crate's `MorkError` type.
pub type Result<T> = std::result::Result<T, MorkError>;
