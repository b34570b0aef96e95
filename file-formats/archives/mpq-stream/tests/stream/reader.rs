//! Block streams: chunked reads, seeking and the std::io adapters

use crate::common::{library, mixed_archive, mixed_files};
use mpq_stream::{Archive, Error, Offset};
use pretty_assertions::assert_eq;
use std::io::{Read, Seek, SeekFrom};
use test_case::test_case;

#[test_case(1 ; "byte by byte")]
#[test_case(777 ; "odd chunks")]
#[test_case(4096 ; "block sized chunks")]
#[test_case(10_000 ; "chunks spanning blocks")]
fn test_chunked_reads_match_materialize(chunk: usize) {
    let fixture = mixed_archive();
    let library = library();
    let archive = Archive::open(&library, &fixture.path, Offset::Detect).unwrap();

    for (name, data) in mixed_files() {
        let entry = archive.lookup(name).unwrap();
        assert_eq!(entry.materialize().unwrap(), data, "{name}");

        let mut stream = entry.open_stream().unwrap();
        let mut streamed = Vec::with_capacity(data.len());
        loop {
            let bytes = stream.read_up_to(chunk).unwrap();
            if bytes.is_empty() {
                break;
            }
            streamed.extend_from_slice(&bytes);
            assert_eq!(stream.tell(), streamed.len() as u64);
        }
        assert_eq!(streamed, data, "{name} in chunks of {chunk}");
    }
}

#[test]
fn test_read_remaining() {
    let fixture = mixed_archive();
    let library = library();
    let archive = Archive::open(&library, &fixture.path, Offset::Detect).unwrap();
    let entry = archive.lookup("zlib.txt").unwrap();
    let data = entry.materialize().unwrap();

    let mut stream = entry.open_stream().unwrap();
    assert_eq!(stream.read_up_to(100).unwrap(), &data[..100]);
    assert_eq!(stream.read_remaining().unwrap(), &data[100..]);
    assert!(stream.is_exhausted());
    assert_eq!(stream.tell(), data.len() as u64);
    assert!(stream.read_remaining().unwrap().is_empty());
    assert!(stream.read_up_to(10).unwrap().is_empty());
}

#[test]
fn test_zero_length_read_decodes_nothing() {
    let fixture = mixed_archive();
    let library = library();
    let archive = Archive::open(&library, &fixture.path, Offset::Detect).unwrap();
    let entry = archive.lookup("zlib.txt").unwrap();

    let mut stream = entry.open_stream().unwrap();
    assert!(stream.read_up_to(0).unwrap().is_empty());
    assert_eq!(stream.tell(), 0);
    assert!(!stream.is_exhausted());
}

#[test]
fn test_empty_file() {
    let fixture = mixed_archive();
    let library = library();
    let archive = Archive::open(&library, &fixture.path, Offset::Detect).unwrap();
    let entry = archive.lookup("empty.bin").unwrap();
    assert_eq!(entry.info().blocks, 0);

    let mut stream = entry.open_stream().unwrap();
    assert!(stream.read_up_to(16).unwrap().is_empty());
    assert!(stream.is_exhausted());
}

#[test]
fn test_seek_modes() {
    let fixture = mixed_archive();
    let library = library();
    let archive = Archive::open(&library, &fixture.path, Offset::Detect).unwrap();
    let entry = archive.lookup("secret.txt").unwrap();
    let data = entry.materialize().unwrap();
    let len = data.len() as u64;

    let mut stream = entry.open_stream().unwrap();
    assert_eq!(stream.seek(SeekFrom::Start(5000)).unwrap(), 5000);
    assert_eq!(stream.read_up_to(10).unwrap(), &data[5000..5010]);

    assert_eq!(stream.seek(SeekFrom::Current(-10)).unwrap(), 5000);
    assert_eq!(stream.read_up_to(10).unwrap(), &data[5000..5010]);

    assert_eq!(stream.seek(SeekFrom::Current(1000)).unwrap(), 6010);
    assert_eq!(stream.read_up_to(5).unwrap(), &data[6010..6015]);

    assert_eq!(stream.seek(SeekFrom::End(-45)).unwrap(), len - 45);
    assert_eq!(stream.read_remaining().unwrap(), &data[data.len() - 45..]);

    assert_eq!(stream.seek(SeekFrom::Start(0)).unwrap(), 0);
    assert_eq!(stream.read_up_to(3).unwrap(), &data[..3]);
}

#[test]
fn test_seek_past_end_stops_at_end() {
    let fixture = mixed_archive();
    let library = library();
    let archive = Archive::open(&library, &fixture.path, Offset::Detect).unwrap();
    let entry = archive.lookup("bzip2.txt").unwrap();
    let len = entry.info().unpacked_size;

    let mut stream = entry.open_stream().unwrap();
    assert_eq!(stream.seek(SeekFrom::Start(len + 1000)).unwrap(), len);
    assert_eq!(stream.tell(), len);
    assert!(stream.is_exhausted());
    assert!(stream.read_up_to(1).unwrap().is_empty());

    assert_eq!(stream.seek(SeekFrom::End(500)).unwrap(), len);
}

#[test]
fn test_negative_seek_is_rejected() {
    let fixture = mixed_archive();
    let library = library();
    let archive = Archive::open(&library, &fixture.path, Offset::Detect).unwrap();
    let entry = archive.lookup("pkware.txt").unwrap();

    let mut stream = entry.open_stream().unwrap();
    stream.read_up_to(50).unwrap();
    assert!(matches!(
        stream.seek(SeekFrom::Current(-51)),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        stream.seek(SeekFrom::End(-100_000)),
        Err(Error::InvalidArgument(_))
    ));
    assert_eq!(stream.tell(), 50);
}

#[test]
fn test_streams_are_independent() {
    let fixture = mixed_archive();
    let library = library();
    let archive = Archive::open(&library, &fixture.path, Offset::Detect).unwrap();
    let entry = archive.lookup("imploded.txt").unwrap();
    let data = entry.materialize().unwrap();

    let mut first = entry.open_stream().unwrap();
    let mut second = entry.open_stream().unwrap();
    assert_eq!(first.read_up_to(4500).unwrap(), &data[..4500]);
    assert_eq!(second.read_up_to(10).unwrap(), &data[..10]);
    assert_eq!(first.read_remaining().unwrap(), &data[4500..]);
    assert_eq!(second.tell(), 10);
}

#[test]
fn test_std_io_adapters() {
    let fixture = mixed_archive();
    let library = library();
    let archive = Archive::open(&library, &fixture.path, Offset::Detect).unwrap();
    let entry = archive.lookup("stored.bin").unwrap();
    let data = entry.materialize().unwrap();

    let mut stream = entry.open_stream().unwrap();
    let mut all = Vec::new();
    stream.read_to_end(&mut all).unwrap();
    assert_eq!(all, data);

    Seek::seek(&mut stream, SeekFrom::Start(4090)).unwrap();
    let mut window = [0u8; 12];
    stream.read_exact(&mut window).unwrap();
    assert_eq!(&window[..], &data[4090..4102]);
    assert_eq!(stream.stream_position().unwrap(), 4102);

    let err = Seek::seek(&mut stream, SeekFrom::Current(-5000)).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
}
