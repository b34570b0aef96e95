//! Error types and status code translation
//!
//! Every status returned by a [`NativeEngine`](crate::NativeEngine) call is
//! passed through [`check`] at the call site. Success values and unknown
//! codes come back unchanged, known failure codes become an [`Error`].

use crate::entry::FileFlags;
use mpq_native::status;
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for streaming operations
pub type Result<T> = std::result::Result<T, Error>;

/// The I/O operation a native I/O failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoOp {
    /// Opening the archive file
    Open,
    /// Closing a handle
    Close,
    /// Seeking in the archive file
    Seek,
    /// Reading from the archive file
    Read,
    /// Writing
    Write,
}

impl fmt::Display for IoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Seek => "seek",
            Self::Read => "read",
            Self::Write => "write",
        })
    }
}

/// A broken usage contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// The engine was not initialized
    NotInitialized,
    /// A destination buffer was too small for the data
    BufferTooSmall,
    /// The data could not be decrypted
    Decrypt,
    /// The data could not be decompressed
    Unpack,
    /// The entry is packed and cannot be the base of a nested archive
    NestedArchive {
        /// File number of the entry
        index: u32,
        /// Flags that rule the entry out
        flags: FileFlags,
    },
    /// The archive was already closed
    ArchiveClosed,
    /// The entry was already closed
    EntryClosed,
    /// The engine was called while a borrow of it was still held
    EngineBusy,
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => f.write_str("engine not initialized"),
            Self::BufferTooSmall => f.write_str("destination buffer too small"),
            Self::Decrypt => f.write_str("decryption failed"),
            Self::Unpack => f.write_str("decompression failed"),
            Self::NestedArchive { index, flags } => {
                write!(f, "file {index} is not stored plainly ({flags:?})")
            }
            Self::ArchiveClosed => f.write_str("archive is closed"),
            Self::EntryClosed => f.write_str("file entry is closed"),
            Self::EngineBusy => f.write_str("engine is already in use"),
        }
    }
}

/// Streaming layer error
#[derive(Error, Debug)]
pub enum Error {
    /// OS-level failure inside the engine
    #[error("I/O error during {0}")]
    Io(IoOp),

    /// The engine could not allocate memory
    #[error("Out of memory")]
    OutOfMemory,

    /// Not an MPQ archive, or a corrupted one
    #[error("Invalid or corrupted MPQ archive")]
    Format,

    /// Usage contract violated
    #[error("Precondition violated: {0}")]
    Precondition(Precondition),

    /// File or block index not present
    #[error("File or block not found")]
    NotFound,

    /// Bad lookup key, seek target or handle
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Check if this error is a violated usage contract
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }

    /// Check if this error indicates archive corruption
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::Format | Self::Precondition(Precondition::Decrypt | Precondition::Unpack)
        )
    }
}

impl From<Precondition> for Error {
    fn from(violation: Precondition) -> Self {
        Self::Precondition(violation)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match &err {
            Error::NotFound => io::ErrorKind::NotFound,
            Error::InvalidArgument(_) => io::ErrorKind::InvalidInput,
            Error::OutOfMemory => io::ErrorKind::OutOfMemory,
            Error::Format | Error::Precondition(Precondition::Decrypt | Precondition::Unpack) => {
                io::ErrorKind::InvalidData
            }
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

/// Translate a native status code
///
/// Non-negative values and unrecognized negative codes are returned as is.
pub fn check(code: i32) -> Result<i32> {
    let err = match code {
        status::ERROR_OPEN => Error::Io(IoOp::Open),
        status::ERROR_CLOSE => Error::Io(IoOp::Close),
        status::ERROR_SEEK => Error::Io(IoOp::Seek),
        status::ERROR_READ => Error::Io(IoOp::Read),
        status::ERROR_WRITE => Error::Io(IoOp::Write),
        status::ERROR_MALLOC => Error::OutOfMemory,
        status::ERROR_FORMAT => Error::Format,
        status::ERROR_NOT_INITIALIZED => Precondition::NotInitialized.into(),
        status::ERROR_SIZE => Precondition::BufferTooSmall.into(),
        status::ERROR_DECRYPT => Precondition::Decrypt.into(),
        status::ERROR_UNPACK => Precondition::Unpack.into(),
        status::ERROR_EXIST => Error::NotFound,
        status::ERROR_INFO => Error::InvalidArgument("rejected by the engine".to_string()),
        code => {
            if code < 0 {
                log::warn!("Passing through unrecognized status {code}");
            }
            return Ok(code);
        }
    };
    Err(err)
}
