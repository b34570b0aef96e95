//! Common test utilities and fixtures

#![allow(dead_code)]

use mpq_native::test_utils::ArchiveBuilder;
use mpq_native::{AUTO_DETECT_OFFSET, ArchiveHandle, Engine, FileField, status};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a temporary directory for tests
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Generate test data of a specific size
pub fn generate_test_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// Write an archive into `dir`
pub fn write_archive(dir: &Path, name: &str, builder: &ArchiveBuilder) -> PathBuf {
    let path = dir.join(name);
    builder.write_to(&path).expect("Failed to write test archive");
    path
}

/// An initialized engine
pub fn engine() -> Engine {
    let _ = env_logger::try_init();
    let mut engine = Engine::new();
    assert_eq!(engine.init(), status::OK);
    engine
}

/// Open `path` with header auto-detection
pub fn open(engine: &mut Engine, path: &Path) -> ArchiveHandle {
    let mut handle = 0;
    let code = engine.archive_open(path, AUTO_DETECT_OFFSET, &mut handle);
    assert_eq!(code, status::OK, "archive_open: {}", status::name(code));
    handle
}

/// Look up a file number, panicking when the name is missing
pub fn number(engine: &mut Engine, handle: ArchiveHandle, name: &str) -> u32 {
    let mut number = 0;
    let code = engine.file_number(handle, name, &mut number);
    assert_eq!(code, status::OK, "file_number({name}): {}", status::name(code));
    number
}

/// Query a file field
pub fn file_info(engine: &mut Engine, handle: ArchiveHandle, number: u32, field: FileField) -> u64 {
    let mut value = 0;
    let code = engine.file_info(handle, number, field, &mut value);
    assert_eq!(code, status::OK, "file_info({field:?}): {}", status::name(code));
    value
}

/// Decode a whole file
pub fn read_all(engine: &mut Engine, handle: ArchiveHandle, number: u32) -> Vec<u8> {
    let size = file_info(engine, handle, number, FileField::UnpackedSize);
    let mut data = vec![0u8; size as usize];
    let mut transferred = 0;
    let code = engine.file_read(handle, number, &mut data, &mut transferred);
    assert_eq!(code, status::OK, "file_read: {}", status::name(code));
    assert_eq!(transferred, size);
    data
}

/// Decode a file block by block
pub fn read_blocks(engine: &mut Engine, handle: ArchiveHandle, number: u32) -> Vec<u8> {
    let blocks = file_info(engine, handle, number, FileField::Blocks);
    let block_size = file_info(engine, handle, number, FileField::BlockSize);

    let mut data = Vec::new();
    let mut buffer = vec![0u8; block_size as usize];
    for block in 0..blocks as u32 {
        let mut transferred = 0;
        let code = engine.block_read(handle, number, block, &mut buffer, &mut transferred);
        assert_eq!(code, status::OK, "block_read({block}): {}", status::name(code));
        data.extend_from_slice(&buffer[..transferred as usize]);
    }
    data
}
