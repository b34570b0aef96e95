//! File lookup, names and whole-file decoding

use crate::common::{engine, file_info, number, open, read_all, temp_dir, write_archive};
use mpq_native::crypto::file_key;
use mpq_native::test_utils::{ArchiveBuilder, Packing, TestFile, noise, text};
use mpq_native::{BlockField, Engine, EngineConfig, FileField, status};
use pretty_assertions::assert_eq;
use test_case::test_case;

fn file_name(engine: &mut Engine, handle: usize, number: u32) -> String {
    let mut buffer = [0u8; 260];
    let code = engine.file_name(handle, number, &mut buffer);
    assert!(code > 0, "file_name: {}", mpq_native::status::name(code));
    String::from_utf8(buffer[..code as usize].to_vec()).unwrap()
}

#[test_case(Packing::Stored, false ; "stored sectored")]
#[test_case(Packing::Stored, true ; "stored single unit")]
#[test_case(Packing::Zlib, false ; "zlib sectored")]
#[test_case(Packing::Zlib, true ; "zlib single unit")]
#[test_case(Packing::Bzip2, false ; "bzip2 sectored")]
#[test_case(Packing::Bzip2, true ; "bzip2 single unit")]
#[test_case(Packing::Pkware, false ; "pkware sectored")]
#[test_case(Packing::Imploded, false ; "imploded sectored")]
#[test_case(Packing::Imploded, true ; "imploded single unit")]
fn test_packing(packing: Packing, single_unit: bool) {
    let data = text(10_000);
    let mut plain = TestFile::new("data/plain.txt", data.clone()).packing(packing);
    let mut encrypted = TestFile::new("data/secret.txt", data.clone())
        .packing(packing)
        .encrypted();
    let mut fixed = TestFile::new("data/fixed.txt", data.clone())
        .packing(packing)
        .fix_key();
    if single_unit {
        plain = plain.single_unit();
        encrypted = encrypted.single_unit();
        fixed = fixed.single_unit();
    }

    let dir = temp_dir();
    let builder = ArchiveBuilder::new().add(plain).add(encrypted).add(fixed);
    let path = write_archive(dir.path(), "packing.mpq", &builder);

    let mut engine = engine();
    let handle = open(&mut engine, &path);
    for name in ["data/plain.txt", "data/secret.txt", "data/fixed.txt"] {
        let number = number(&mut engine, handle, name);
        assert_eq!(read_all(&mut engine, handle, number), data, "{name}");
        assert_eq!(
            crate::common::read_blocks(&mut engine, handle, number),
            data,
            "{name} by blocks"
        );
    }
}

#[test]
fn test_incompressible_data_is_stored_raw() {
    let data = noise(9000, 7);
    let dir = temp_dir();
    let builder = ArchiveBuilder::new()
        .add(TestFile::new("noise.bin", data.clone()).packing(Packing::Zlib))
        .add(
            TestFile::new("noise_enc.bin", data.clone())
                .packing(Packing::Bzip2)
                .encrypted(),
        );
    let path = write_archive(dir.path(), "noise.mpq", &builder);

    let mut engine = engine();
    let handle = open(&mut engine, &path);
    for name in ["noise.bin", "noise_enc.bin"] {
        let number = number(&mut engine, handle, name);
        assert_eq!(file_info(&mut engine, handle, number, FileField::Compressed), 1);
        assert_eq!(read_all(&mut engine, handle, number), data);
    }
}

#[test]
fn test_names_from_listfile() {
    let dir = temp_dir();
    let builder = ArchiveBuilder::new()
        .file("Interface\\Icons\\a.blp", b"icon".to_vec())
        .file("readme.txt", b"hello".to_vec());
    let path = write_archive(dir.path(), "names.mpq", &builder);

    let mut engine = engine();
    let handle = open(&mut engine, &path);
    assert_eq!(file_name(&mut engine, handle, 0), "Interface\\Icons\\a.blp");
    assert_eq!(file_name(&mut engine, handle, 1), "readme.txt");
    assert_eq!(file_name(&mut engine, handle, 2), "(listfile)");

    // Lookups are case-insensitive and accept either separator
    assert_eq!(number(&mut engine, handle, "README.TXT"), 1);
    assert_eq!(number(&mut engine, handle, "interface/icons/A.BLP"), 0);

    let mut missing = 99;
    assert_eq!(
        engine.file_number(handle, "missing.txt", &mut missing),
        status::ERROR_EXIST
    );
    assert_eq!(missing, 99);
}

#[test]
fn test_synthesized_names() {
    let dir = temp_dir();
    let builder = ArchiveBuilder::new()
        .listfile(false)
        .file("a.txt", b"a".to_vec())
        .file("b.txt", b"b".to_vec());
    let path = write_archive(dir.path(), "unnamed.mpq", &builder);

    let mut engine = engine();
    let handle = open(&mut engine, &path);
    assert_eq!(file_name(&mut engine, handle, 1), "file000001.xxx");

    // A successful lookup makes the name known
    assert_eq!(number(&mut engine, handle, "b.txt"), 1);
    assert_eq!(file_name(&mut engine, handle, 1), "b.txt");

    let mut buffer = [0u8; 4];
    assert_eq!(
        engine.file_name(handle, 0, &mut buffer),
        status::ERROR_SIZE
    );
    assert_eq!(
        engine.file_name(handle, 2, &mut [0u8; 64]),
        status::ERROR_EXIST
    );
}

#[test_case(false ; "plain key")]
#[test_case(true ; "fix key")]
fn test_key_detection_without_name(fix_key: bool) {
    let data = text(10_000);
    let mut file = TestFile::new("hidden.bin", data.clone())
        .packing(Packing::Zlib)
        .encrypted();
    if fix_key {
        file = file.fix_key();
    }

    let dir = temp_dir();
    let builder = ArchiveBuilder::new().listfile(false).add(file);
    let path = write_archive(dir.path(), "hidden.mpq", &builder);

    let mut engine = engine();
    let handle = open(&mut engine, &path);
    assert_eq!(file_name(&mut engine, handle, 0), "file000000.xxx");
    assert_eq!(read_all(&mut engine, handle, 0), data);

    // The first file starts right after the 32 byte header
    let key = file_key("hidden.bin", 0x20, 10_000, fix_key);
    let mut seed = 0;
    assert_eq!(
        engine.block_info(handle, 0, 1, BlockField::Seed, &mut seed),
        status::OK
    );
    assert_eq!(seed, u64::from(key.wrapping_add(1)));
}

#[test_case(TestFile::new("x.bin", text(100)).encrypted().single_unit() ; "single unit")]
#[test_case(TestFile::new("x.bin", text(10_000)).encrypted() ; "stored sectors")]
fn test_undetectable_key(file: TestFile) {
    let dir = temp_dir();
    let path = write_archive(
        dir.path(),
        "locked.mpq",
        &ArchiveBuilder::new().listfile(false).add(file),
    );

    let mut engine = engine();
    let handle = open(&mut engine, &path);
    let mut buffer = vec![0u8; 10_000];
    let mut transferred = 0;
    assert_eq!(
        engine.file_read(handle, 0, &mut buffer, &mut transferred),
        status::ERROR_DECRYPT
    );

    // Knowing the name unlocks the file
    assert_eq!(number(&mut engine, handle, "x.bin"), 0);
    assert_eq!(
        engine.file_read(handle, 0, &mut buffer, &mut transferred),
        status::OK
    );
}

#[test]
fn test_file_info_flags() {
    let dir = temp_dir();
    let builder = ArchiveBuilder::new()
        .add(TestFile::new("z.bin", text(9000)).packing(Packing::Zlib).encrypted())
        .add(TestFile::new("i.bin", text(100)).packing(Packing::Imploded).single_unit())
        .file("s.bin", text(100))
        .file("empty.bin", Vec::new());
    let path = write_archive(dir.path(), "flags.mpq", &builder);

    let mut engine = engine();
    let handle = open(&mut engine, &path);

    let z = number(&mut engine, handle, "z.bin");
    assert_eq!(file_info(&mut engine, handle, z, FileField::UnpackedSize), 9000);
    assert_eq!(file_info(&mut engine, handle, z, FileField::Offset), 0x20);
    assert_eq!(file_info(&mut engine, handle, z, FileField::Blocks), 3);
    assert_eq!(file_info(&mut engine, handle, z, FileField::BlockSize), 4096);
    assert_eq!(file_info(&mut engine, handle, z, FileField::Encrypted), 1);
    assert_eq!(file_info(&mut engine, handle, z, FileField::Compressed), 1);
    assert_eq!(file_info(&mut engine, handle, z, FileField::Copied), 0);

    let i = number(&mut engine, handle, "i.bin");
    assert_eq!(file_info(&mut engine, handle, i, FileField::Imploded), 1);
    assert_eq!(file_info(&mut engine, handle, i, FileField::Single), 1);
    assert_eq!(file_info(&mut engine, handle, i, FileField::Blocks), 1);
    assert_eq!(file_info(&mut engine, handle, i, FileField::BlockSize), 100);

    let s = number(&mut engine, handle, "s.bin");
    assert_eq!(file_info(&mut engine, handle, s, FileField::Copied), 1);
    assert_eq!(
        file_info(&mut engine, handle, s, FileField::PackedSize),
        file_info(&mut engine, handle, s, FileField::UnpackedSize)
    );

    let empty = number(&mut engine, handle, "empty.bin");
    assert_eq!(file_info(&mut engine, handle, empty, FileField::Blocks), 0);
    assert!(read_all(&mut engine, handle, empty).is_empty());

    let mut value = 0;
    assert_eq!(
        engine.file_info(handle, 42, FileField::PackedSize, &mut value),
        status::ERROR_EXIST
    );
}

#[test]
fn test_read_limits() {
    let dir = temp_dir();
    let builder = ArchiveBuilder::new().file("big.bin", text(1000));
    let path = write_archive(dir.path(), "big.mpq", &builder);

    let _ = env_logger::try_init();
    let mut engine = Engine::with_config(EngineConfig::default().max_file_size(100));
    engine.init();
    let handle = open(&mut engine, &path);
    let number = number(&mut engine, handle, "big.bin");

    let mut buffer = vec![0u8; 1000];
    let mut transferred = 0;
    assert_eq!(
        engine.file_read(handle, number, &mut buffer, &mut transferred),
        status::ERROR_MALLOC
    );
    let mut size = 0;
    assert_eq!(
        engine.block_info(handle, number, 0, BlockField::UnpackedSize, &mut size),
        status::ERROR_MALLOC
    );
    assert_eq!(
        engine.block_read(handle, number, 0, &mut buffer, &mut transferred),
        status::ERROR_MALLOC
    );

    let mut engine = crate::common::engine();
    let handle = open(&mut engine, &path);
    let mut small = vec![0u8; 999];
    assert_eq!(
        engine.file_read(handle, number, &mut small, &mut transferred),
        status::ERROR_SIZE
    );
}

#[test]
fn test_file_open_is_reference_counted() {
    let dir = temp_dir();
    let builder = ArchiveBuilder::new().file("a.bin", text(9000));
    let path = write_archive(dir.path(), "refs.mpq", &builder);

    let mut engine = engine();
    let handle = open(&mut engine, &path);
    let number = number(&mut engine, handle, "a.bin");

    assert_eq!(engine.file_open(handle, number), status::OK);
    assert_eq!(engine.file_open(handle, number), status::OK);
    assert_eq!(engine.file_close(handle, number), status::OK);
    assert_eq!(read_all(&mut engine, handle, number), text(9000));
    assert_eq!(engine.file_close(handle, number), status::OK);
    assert_eq!(engine.file_close(handle, number), status::ERROR_CLOSE);

    assert_eq!(engine.file_open(handle, 17), status::ERROR_EXIST);
}
