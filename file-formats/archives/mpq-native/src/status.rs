//! Status codes returned by the engine call surface
//!
//! Every call on [`Engine`](crate::Engine) returns an `i32`. Zero or a
//! positive value means success (some calls return a length), a small
//! negative value identifies the failure.

/// Call succeeded
pub const OK: i32 = 0;
/// Opening the archive file failed
pub const ERROR_OPEN: i32 = -1;
/// Closing a handle failed (or the handle was not open)
pub const ERROR_CLOSE: i32 = -2;
/// Seeking in the archive file failed
pub const ERROR_SEEK: i32 = -3;
/// Reading from the archive file failed
pub const ERROR_READ: i32 = -4;
/// Writing failed (never produced by this read-only engine)
pub const ERROR_WRITE: i32 = -5;
/// Memory allocation failed
pub const ERROR_MALLOC: i32 = -6;
/// File is not an MPQ archive or is corrupted
pub const ERROR_FORMAT: i32 = -7;
/// Engine used before `init` or after `shutdown`
pub const ERROR_NOT_INITIALIZED: i32 = -8;
/// Destination buffer is too small
pub const ERROR_SIZE: i32 = -9;
/// File or block does not exist in the archive
pub const ERROR_EXIST: i32 = -10;
/// Decryption failed
pub const ERROR_DECRYPT: i32 = -11;
/// Decompression failed
pub const ERROR_UNPACK: i32 = -12;
/// Invalid argument passed to an info or handle query
pub const ERROR_INFO: i32 = -13;

/// Short symbolic name of a status code, for log output
pub fn name(status: i32) -> &'static str {
    match status {
        OK => "OK",
        ERROR_OPEN => "ERROR_OPEN",
        ERROR_CLOSE => "ERROR_CLOSE",
        ERROR_SEEK => "ERROR_SEEK",
        ERROR_READ => "ERROR_READ",
        ERROR_WRITE => "ERROR_WRITE",
        ERROR_MALLOC => "ERROR_MALLOC",
        ERROR_FORMAT => "ERROR_FORMAT",
        ERROR_NOT_INITIALIZED => "ERROR_NOT_INITIALIZED",
        ERROR_SIZE => "ERROR_SIZE",
        ERROR_EXIST => "ERROR_EXIST",
        ERROR_DECRYPT => "ERROR_DECRYPT",
        ERROR_UNPACK => "ERROR_UNPACK",
        ERROR_INFO => "ERROR_INFO",
        s if s > 0 => "OK",
        _ => "UNKNOWN",
    }
}
