//! Error types for the decoding engine
//!
//! Internally the engine works with [`Error`]; the call surface on
//! [`Engine`](crate::Engine) turns each error into its status code with
//! [`Error::status`].

use crate::status;
use std::io;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine error
#[derive(Error, Debug)]
pub enum Error {
    /// The archive file could not be opened
    #[error("Failed to open archive: {0}")]
    Open(#[source] io::Error),

    /// Handle or file state could not be closed
    #[error("Failed to close: {0}")]
    Close(String),

    /// Seek in the archive file failed
    #[error("Seek failed: {0}")]
    Seek(#[source] io::Error),

    /// Read from the archive file failed
    #[error("Read failed: {0}")]
    Read(#[source] io::Error),

    /// An allocation sized from archive data could not be satisfied
    #[error("Allocation of {requested} bytes failed")]
    OutOfMemory {
        /// Requested size in bytes
        requested: usize,
    },

    /// Not an MPQ archive or corrupted structure
    #[error("Invalid MPQ format: {0}")]
    InvalidFormat(String),

    /// Engine used before `init` or after `shutdown`
    #[error("Engine is not initialized")]
    NotInitialized,

    /// Destination buffer smaller than the data to be written
    #[error("Buffer too small: need {needed} bytes, got {available}")]
    BufferTooSmall {
        /// Required size
        needed: usize,
        /// Provided size
        available: usize,
    },

    /// File, block or name not present
    #[error("Not found: {0}")]
    NotFound(String),

    /// Decryption key unknown or undetectable
    #[error("Cryptography error: {0}")]
    Crypto(String),

    /// Decompression failed or method not supported
    #[error("Compression error: {0}")]
    Compression(String),

    /// Unknown handle or otherwise invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Create a new InvalidFormat error
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Self::InvalidFormat(msg.into())
    }

    /// Create a new Crypto error
    pub fn crypto<S: Into<String>>(msg: S) -> Self {
        Self::Crypto(msg.into())
    }

    /// Create a new Compression error
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Self::Compression(msg.into())
    }

    /// Create a new NotFound error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Status code reported for this error on the call surface
    pub fn status(&self) -> i32 {
        match self {
            Self::Open(_) => status::ERROR_OPEN,
            Self::Close(_) => status::ERROR_CLOSE,
            Self::Seek(_) => status::ERROR_SEEK,
            Self::Read(_) => status::ERROR_READ,
            Self::OutOfMemory { .. } => status::ERROR_MALLOC,
            Self::InvalidFormat(_) => status::ERROR_FORMAT,
            Self::NotInitialized => status::ERROR_NOT_INITIALIZED,
            Self::BufferTooSmall { .. } => status::ERROR_SIZE,
            Self::NotFound(_) => status::ERROR_EXIST,
            Self::Crypto(_) => status::ERROR_DECRYPT,
            Self::Compression(_) => status::ERROR_UNPACK,
            Self::InvalidArgument(_) => status::ERROR_INFO,
        }
    }

    /// Check if this error indicates archive corruption
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::InvalidFormat(_) | Self::Crypto(_) | Self::Compression(_)
        )
    }
}

/// Allocate a zeroed buffer whose size comes from archive data
pub(crate) fn alloc_zeroed(len: usize) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| Error::OutOfMemory { requested: len })?;
    buffer.resize(len, 0);
    Ok(buffer)
}
