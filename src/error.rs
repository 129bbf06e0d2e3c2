//! Error types for dump decoding and persistence.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Low-level failure while decoding a dump buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input ended in the middle of a value.
    #[error("unexpected end of input")]
    UnexpectedEof,
    /// A varint does not fit in 64 bits.
    #[error("varint exceeds 64 bits")]
    VarintOverflow,
    /// A front-coded key claims more shared bytes than its predecessor has.
    #[error("key shares {shared} bytes with a {available}-byte predecessor")]
    SharedPrefixTooLong {
        /// Shared length read from the record.
        shared: usize,
        /// Length of the previous key.
        available: usize,
    },
}

/// Error type for saving, loading and merging trie dumps.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The storage collaborator failed to open, read or write a dump.
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        /// Dump location.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The stream ends inside the header.
    #[error("dump header truncated after {len} bytes")]
    TruncatedHeader {
        /// Bytes present.
        len: usize,
    },
    /// The stream does not start with the dump magic.
    #[error("not a trie dump (magic {found:02x?})")]
    BadMagic {
        /// First bytes of the stream.
        found: Vec<u8>,
    },
    /// The dump was written by an unknown format revision.
    #[error("unsupported dump format version {0}")]
    UnsupportedVersion(u8),
    /// A record could not be decoded.
    #[error("corrupt record #{record} at byte {offset}: {source}")]
    Record {
        /// Zero-based index of the failing record.
        record: usize,
        /// Byte offset where the record starts.
        offset: usize,
        /// What went wrong.
        #[source]
        source: DecodeError,
    },
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistError>;

impl PersistError {
    pub(crate) fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        PersistError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
