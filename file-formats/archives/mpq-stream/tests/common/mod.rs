//! Common test utilities and fixtures

#![allow(dead_code)]


use mpq_native::test_utils::{ArchiveBuilder, Packing, TestFile, noise, text};
use mpq_stream::Library;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary directory for tests
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// An initialized library over the bundled engine
pub fn library() -> Library {
    let _ = env_logger::try_init();
    Library::init().expect("Failed to initialize engine")
}

/// A generated archive on disk
#[derive(Debug)]
pub struct Fixture {
    pub dir: TempDir,
    pub path: PathBuf,
}

fn write(builder: &ArchiveBuilder, name: &str) -> Fixture {
    let dir = temp_dir();
    let path = dir.path().join(name);
    builder.write_to(&path).expect("Failed to write test archive");
    Fixture { dir, path }
}

/// Content of the archive nested as "c.dat"
pub fn sub_archive() -> Vec<u8> {
    ArchiveBuilder::new()
        .file("inner/one.txt", b"one".to_vec())
        .file("inner/two.txt", text(3000))
        .build()
        .expect("Failed to build sub-archive")
}

/// Files in [`sub_archive`], counting its (listfile)
pub const SUB_ARCHIVE_FILES: u32 = 3;

/// "a.txt" (10 bytes, one stored block), "b.bin" (5000 bytes in three
/// compressed 2048 byte blocks) and "c.dat" (an archive stored as one
/// plain block), without a (listfile)
pub fn end_to_end_archive() -> Fixture {
    let builder = ArchiveBuilder::new()
        .listfile(false)
        .block_size(2)
        .add(TestFile::new("a.txt", b"0123456789".to_vec()).single_unit())
        .add(TestFile::new("b.bin", text(5000)).packing(Packing::Zlib))
        .add(TestFile::new("c.dat", sub_archive()).single_unit());
    write(&builder, "end_to_end.mpq")
}

/// Names and contents of the files in [`mixed_archive`]
pub fn mixed_files() -> Vec<(&'static str, Vec<u8>)> {
    vec![
        ("stored.bin", noise(9000, 1)),
        ("zlib.txt", text(20_000)),
        ("bzip2.txt", text(7000)),
        ("pkware.txt", text(6000)),
        ("imploded.txt", text(5000)),
        ("secret.txt", text(12_345)),
        ("fixed.bin", noise(4100, 2)),
        ("single.txt", text(3333)),
        ("empty.bin", Vec::new()),
    ]
}

/// Every packing and flag combination, 4KB sectors, with a (listfile)
pub fn mixed_archive() -> Fixture {
    let files = mixed_files();
    let packed = |i: usize| TestFile::new(files[i].0, files[i].1.clone());
    let builder = ArchiveBuilder::new()
        .add(packed(0))
        .add(packed(1).packing(Packing::Zlib))
        .add(packed(2).packing(Packing::Bzip2))
        .add(packed(3).packing(Packing::Pkware))
        .add(packed(4).packing(Packing::Imploded))
        .add(packed(5).packing(Packing::Zlib).encrypted())
        .add(packed(6).fix_key())
        .add(packed(7).packing(Packing::Bzip2).single_unit())
        .add(packed(8));
    write(&builder, "mixed.mpq")
}

/// An archive preceded by `prefix` bytes of other data
pub fn embedded_archive(prefix: usize) -> Fixture {
    let dir = temp_dir();
    let path = dir.path().join("host.bin");
    let mut host = vec![0x5Au8; prefix];
    host.extend(
        ArchiveBuilder::new()
            .file("embedded.txt", text(700))
            .build()
            .expect("Failed to build embedded archive"),
    );
    std::fs::write(&path, host).expect("Failed to write host file");
    Fixture { dir, path }
}
