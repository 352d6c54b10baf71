//! Crate-specific error types for mapped-file.

use std::io;
use thiserror::Error;

/// Result alias for mapped-file operations.
pub type Result<T> = std::result::Result<T, MappedFileError>;

/// Error type covering file, mapping, positioning, and fault conditions.
#[derive(Debug, Error)]
pub enum MappedFileError {
    /// Failure from the backing file handle (open, stat, truncate, close).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failure establishing, resizing, or releasing a mapping.
    #[error("map error: {0}")]
    Map(String),

    /// No more bytes at the requested position. `read` holds the number of
    /// bytes that were still copied before the end was reached.
    #[error("end of file after {read} bytes")]
    EndOfFile {
        /// Bytes copied into the caller's buffer.
        read: usize,
    },

    /// Fewer bytes were written than requested.
    #[error("short write: wrote {written} of {requested} bytes")]
    ShortWrite {
        /// Bytes actually written.
        written: usize,
        /// Bytes the caller asked to write.
        requested: usize,
    },

    /// Operation not permitted for this handle's mode.
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    /// A seek resolved to a position before the start of the file.
    #[error("negative position: {0}")]
    NegativePosition(i128),

    /// A seek resolved to a position past the end of the mapping.
    #[error("position {position} out of range for size {size}")]
    OutOfRange {
        /// Requested absolute position.
        position: u64,
        /// Current mapped size.
        size: u64,
    },

    /// The byte range is no longer backed by the file, so touching it would
    /// fault.
    #[error("page fault: range offset={offset}, len={len} is not backed by the file")]
    PageFault {
        /// Start of the refused range.
        offset: u64,
        /// Length of the refused range.
        len: u64,
    },

    /// The handle has been closed.
    #[error("mapped file is closed")]
    Closed,
}

impl From<MappedFileError> for io::Error {
    fn from(err: MappedFileError) -> Self {
        match err {
            MappedFileError::Io(inner) => inner,
            other => {
                let kind = match &other {
                    MappedFileError::EndOfFile { .. } => io::ErrorKind::UnexpectedEof,
                    MappedFileError::ShortWrite { .. } => io::ErrorKind::WriteZero,
                    MappedFileError::InvalidOperation(_)
                    | MappedFileError::NegativePosition(_)
                    | MappedFileError::OutOfRange { .. } => io::ErrorKind::InvalidInput,
                    _ => io::ErrorKind::Other,
                };
                io::Error::new(kind, other)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_pass_through_unwrapped() {
        let original = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        let converted: io::Error = MappedFileError::from(original).into();
        assert_eq!(converted.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn kinds_map_onto_io_error_kinds() {
        let eof: io::Error = MappedFileError::EndOfFile { read: 3 }.into();
        assert_eq!(eof.kind(), io::ErrorKind::UnexpectedEof);

        let short: io::Error = MappedFileError::ShortWrite { written: 1, requested: 2 }.into();
        assert_eq!(short.kind(), io::ErrorKind::WriteZero);

        let range: io::Error = MappedFileError::OutOfRange { position: 10, size: 4 }.into();
        assert_eq!(range.kind(), io::ErrorKind::InvalidInput);

        let closed: io::Error = MappedFileError::Closed.into();
        assert_eq!(closed.kind(), io::ErrorKind::Other);
    }
}
