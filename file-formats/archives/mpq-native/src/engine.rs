//! The engine call surface
//!
//! Every call returns a status code from [`status`](crate::status). Values
//! are written to out-parameters and archives are addressed by integer
//! handles, so a consumer can treat the engine as an opaque native service.

use crate::archive::OpenArchive;
use crate::config::EngineConfig;
use crate::info::{ArchiveField, BlockField, FileField};
use crate::{Error, Result, status};
use std::collections::HashMap;
use std::path::Path;

/// Integer handle of an open archive
pub type ArchiveHandle = usize;

/// Offset argument of [`Engine::archive_open`] requesting header auto-detection
pub const AUTO_DETECT_OFFSET: i64 = -1;

/// MPQ decoding engine
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    initialized: bool,
    archives: HashMap<ArchiveHandle, OpenArchive>,
    next_handle: ArchiveHandle,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn an internal result into a status code, logging the cause of failures
fn complete(call: &str, result: Result<i32>) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            let code = e.status();
            if code == status::ERROR_EXIST {
                log::trace!("{call}: {e}");
            } else {
                log::debug!("{call} failed with {}: {e}", status::name(code));
            }
            code
        }
    }
}

fn to_status(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| Error::InvalidArgument(format!("Length {len} exceeds i32")))
}

impl Engine {
    /// Create an uninitialized engine with default limits
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an uninitialized engine with custom limits
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            initialized: false,
            archives: HashMap::new(),
            next_handle: 1,
        }
    }

    /// Engine version string
    pub fn version(&self) -> &'static str {
        concat!("mpq-native ", env!("CARGO_PKG_VERSION"))
    }

    /// Check if `init` has been called
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of currently open archive handles
    pub fn open_archives(&self) -> usize {
        self.archives.len()
    }

    /// Initialize the engine
    pub fn init(&mut self) -> i32 {
        if !self.initialized {
            log::debug!("Initializing {}", self.version());
            self.initialized = true;
        }
        status::OK
    }

    /// Shut the engine down, closing any archive still open
    pub fn shutdown(&mut self) -> i32 {
        if !self.initialized {
            return status::ERROR_NOT_INITIALIZED;
        }

        for (handle, archive) in self.archives.drain() {
            log::warn!(
                "Archive handle {handle} still open at shutdown: {}",
                archive.path().display()
            );
        }
        self.initialized = false;
        log::debug!("Engine shut down");
        status::OK
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    fn archive(&mut self, handle: ArchiveHandle) -> Result<&mut OpenArchive> {
        self.ensure_initialized()?;
        self.archives
            .get_mut(&handle)
            .ok_or_else(|| Error::InvalidArgument(format!("Unknown archive handle {handle}")))
    }

    /// Open an archive
    ///
    /// `offset` is [`AUTO_DETECT_OFFSET`] to search for the header, or the
    /// absolute byte offset of the header in the host file.
    pub fn archive_open(&mut self, path: &Path, offset: i64, handle: &mut ArchiveHandle) -> i32 {
        let result = self
            .ensure_initialized()
            .and_then(|()| match offset {
                AUTO_DETECT_OFFSET => Ok(None),
                at if at >= 0 => Ok(Some(at as u64)),
                at => Err(Error::InvalidArgument(format!("Invalid archive offset {at}"))),
            })
            .and_then(|offset| OpenArchive::open(path, offset, &self.config))
            .map(|archive| {
                let id = self.next_handle;
                self.next_handle += 1;
                self.archives.insert(id, archive);
                *handle = id;
                status::OK
            });
        complete("archive_open", result)
    }

    /// Close an archive and everything opened through it
    pub fn archive_close(&mut self, handle: ArchiveHandle) -> i32 {
        let result = self.ensure_initialized().and_then(|()| {
            let archive = self
                .archives
                .remove(&handle)
                .ok_or_else(|| Error::Close(format!("Archive handle {handle} is not open")))?;
            if archive.open_file_count() > 0 {
                log::debug!(
                    "Archive handle {handle} closed with {} open files",
                    archive.open_file_count()
                );
            }
            Ok(status::OK)
        });
        complete("archive_close", result)
    }

    /// Query an archive-level value
    pub fn archive_info(
        &mut self,
        handle: ArchiveHandle,
        field: ArchiveField,
        value: &mut u64,
    ) -> i32 {
        let result = self.archive(handle).map(|archive| {
            *value = archive.info(field);
            status::OK
        });
        complete("archive_info", result)
    }

    /// Resolve a file name to its zero-based file number
    pub fn file_number(&mut self, handle: ArchiveHandle, name: &str, number: &mut u32) -> i32 {
        let result = self
            .archive(handle)
            .and_then(|archive| archive.file_number(name))
            .map(|index| {
                *number = index;
                status::OK
            });
        complete("file_number", result)
    }

    /// Write the name of a file number into `buffer`, returning its length
    pub fn file_name(&mut self, handle: ArchiveHandle, number: u32, buffer: &mut [u8]) -> i32 {
        let result = self
            .archive(handle)
            .and_then(|archive| archive.file_name(number))
            .and_then(|name| {
                let bytes = name.as_bytes();
                if buffer.len() < bytes.len() {
                    return Err(Error::BufferTooSmall {
                        needed: bytes.len(),
                        available: buffer.len(),
                    });
                }
                buffer[..bytes.len()].copy_from_slice(bytes);
                to_status(bytes.len())
            });
        complete("file_name", result)
    }

    /// Load the block layout of a file and keep it until `file_close`
    pub fn file_open(&mut self, handle: ArchiveHandle, number: u32) -> i32 {
        let result = self
            .archive(handle)
            .and_then(|archive| archive.file_open(number))
            .map(|()| status::OK);
        complete("file_open", result)
    }

    /// Release a layout loaded by `file_open`
    pub fn file_close(&mut self, handle: ArchiveHandle, number: u32) -> i32 {
        let result = self
            .archive(handle)
            .and_then(|archive| archive.file_close(number))
            .map(|()| status::OK);
        complete("file_close", result)
    }

    /// Query a file-level value
    pub fn file_info(
        &mut self,
        handle: ArchiveHandle,
        number: u32,
        field: FileField,
        value: &mut u64,
    ) -> i32 {
        let result = self
            .archive(handle)
            .and_then(|archive| archive.file_info(number, field))
            .map(|v| {
                *value = v;
                status::OK
            });
        complete("file_info", result)
    }

    /// Decode a whole file into `buffer`
    pub fn file_read(
        &mut self,
        handle: ArchiveHandle,
        number: u32,
        buffer: &mut [u8],
        transferred: &mut u64,
    ) -> i32 {
        let result = self
            .archive(handle)
            .and_then(|archive| archive.read_file_into(number, buffer))
            .map(|len| {
                *transferred = len as u64;
                status::OK
            });
        complete("file_read", result)
    }

    /// Query a block-level value
    pub fn block_info(
        &mut self,
        handle: ArchiveHandle,
        number: u32,
        block: u32,
        field: BlockField,
        value: &mut u64,
    ) -> i32 {
        let result = self
            .archive(handle)
            .and_then(|archive| archive.block_info(number, block, field))
            .map(|v| {
                *value = v;
                status::OK
            });
        complete("block_info", result)
    }

    /// Decode one block of a file into `buffer`
    pub fn block_read(
        &mut self,
        handle: ArchiveHandle,
        number: u32,
        block: u32,
        buffer: &mut [u8],
        transferred: &mut u64,
    ) -> i32 {
        let result = self
            .archive(handle)
            .and_then(|archive| archive.read_block(number, block, buffer))
            .map(|len| {
                *transferred = len as u64;
                status::OK
            });
        complete("block_read", result)
    }
}
