//! The native engine call surface
//!
//! [`NativeEngine`] is the seam between the streaming layer and the
//! decoder. Every call returns a raw status code that callers route through
//! [`check`](crate::check).

use mpq_native::{ArchiveField, ArchiveHandle, BlockField, Engine, FileField};
use std::path::Path;

/// Status-code call surface of an MPQ decoding engine
pub trait NativeEngine {
    /// Initialize the engine
    fn init(&mut self) -> i32;

    /// Shut the engine down
    fn shutdown(&mut self) -> i32;

    /// Engine version string
    fn version(&self) -> &str;

    /// Open an archive at `offset`, or search for it when `offset` is negative
    fn archive_open(&mut self, path: &Path, offset: i64, handle: &mut ArchiveHandle) -> i32;

    /// Close an archive
    fn archive_close(&mut self, handle: ArchiveHandle) -> i32;

    /// Query an archive-level value
    fn archive_info(&mut self, handle: ArchiveHandle, field: ArchiveField, value: &mut u64)
    -> i32;

    /// Resolve a name to a file number
    fn file_number(&mut self, handle: ArchiveHandle, name: &str, number: &mut u32) -> i32;

    /// Write the name of a file number into `buffer`, returning its length
    fn file_name(&mut self, handle: ArchiveHandle, number: u32, buffer: &mut [u8]) -> i32;

    /// Acquire per-file state
    fn file_open(&mut self, handle: ArchiveHandle, number: u32) -> i32;

    /// Release per-file state
    fn file_close(&mut self, handle: ArchiveHandle, number: u32) -> i32;

    /// Query a file-level value
    fn file_info(
        &mut self,
        handle: ArchiveHandle,
        number: u32,
        field: FileField,
        value: &mut u64,
    ) -> i32;

    /// Decode a whole file
    fn file_read(
        &mut self,
        handle: ArchiveHandle,
        number: u32,
        buffer: &mut [u8],
        transferred: &mut u64,
    ) -> i32;

    /// Query a block-level value
    fn block_info(
        &mut self,
        handle: ArchiveHandle,
        number: u32,
        block: u32,
        field: BlockField,
        value: &mut u64,
    ) -> i32;

    /// Decode one block
    fn block_read(
        &mut self,
        handle: ArchiveHandle,
        number: u32,
        block: u32,
        buffer: &mut [u8],
        transferred: &mut u64,
    ) -> i32;
}

impl NativeEngine for Engine {
    fn init(&mut self) -> i32 {
        Engine::init(self)
    }

    fn shutdown(&mut self) -> i32 {
        Engine::shutdown(self)
    }

    fn version(&self) -> &str {
        Engine::version(self)
    }

    fn archive_open(&mut self, path: &Path, offset: i64, handle: &mut ArchiveHandle) -> i32 {
        Engine::archive_open(self, path, offset, handle)
    }

    fn archive_close(&mut self, handle: ArchiveHandle) -> i32 {
        Engine::archive_close(self, handle)
    }

    fn archive_info(
        &mut self,
        handle: ArchiveHandle,
        field: ArchiveField,
        value: &mut u64,
    ) -> i32 {
        Engine::archive_info(self, handle, field, value)
    }

    fn file_number(&mut self, handle: ArchiveHandle, name: &str, number: &mut u32) -> i32 {
        Engine::file_number(self, handle, name, number)
    }

    fn file_name(&mut self, handle: ArchiveHandle, number: u32, buffer: &mut [u8]) -> i32 {
        Engine::file_name(self, handle, number, buffer)
    }

    fn file_open(&mut self, handle: ArchiveHandle, number: u32) -> i32 {
        Engine::file_open(self, handle, number)
    }

    fn file_close(&mut self, handle: ArchiveHandle, number: u32) -> i32 {
        Engine::file_close(self, handle, number)
    }

    fn file_info(
        &mut self,
        handle: ArchiveHandle,
        number: u32,
        field: FileField,
        value: &mut u64,
    ) -> i32 {
        Engine::file_info(self, handle, number, field, value)
    }

    fn file_read(
        &mut self,
        handle: ArchiveHandle,
        number: u32,
        buffer: &mut [u8],
        transferred: &mut u64,
    ) -> i32 {
        Engine::file_read(self, handle, number, buffer, transferred)
    }

    fn block_info(
        &mut self,
        handle: ArchiveHandle,
        number: u32,
        block: u32,
        field: BlockField,
        value: &mut u64,
    ) -> i32 {
        Engine::block_info(self, handle, number, block, field, value)
    }

    fn block_read(
        &mut self,
        handle: ArchiveHandle,
        number: u32,
        block: u32,
        buffer: &mut [u8],
        transferred: &mut u64,
    ) -> i32 {
        Engine::block_read(self, handle, number, block, buffer, transferred)
    }
}
