//! Sector decompression
//!
//! A sector with the COMPRESS flag starts with one byte naming the
//! methods applied to it. IMPLODE sectors carry raw PKWARE DCL data.

use crate::{Error, Result};
use bzip2::read::BzDecoder;
use flate2::read::ZlibDecoder;
use std::borrow::Cow;
use std::io::Read;

/// Compression method flags of the leading method byte
pub mod method {
    /// Huffman encoding (WAVE files only)
    pub const HUFFMAN: u8 = 0x01;
    /// Deflate/zlib compression
    pub const ZLIB: u8 = 0x02;
    /// PKWARE DCL compression
    pub const PKWARE: u8 = 0x08;
    /// BZip2 compression
    pub const BZIP2: u8 = 0x10;
    /// Sparse/RLE compression
    pub const SPARSE: u8 = 0x20;
    /// IMA ADPCM mono
    pub const ADPCM_MONO: u8 = 0x40;
    /// IMA ADPCM stereo
    pub const ADPCM_STEREO: u8 = 0x80;
    /// LZMA compression (not a flag combination)
    pub const LZMA: u8 = 0x12;
}

const SUPPORTED: u8 = method::ZLIB | method::PKWARE | method::BZIP2;

/// Unpack a COMPRESS sector
pub fn decompress(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let Some((&methods, payload)) = data.split_first() else {
        return Err(Error::compression("Empty compressed sector"));
    };

    if methods == method::LZMA || methods & !SUPPORTED != 0 {
        return Err(Error::compression(format!(
            "Unsupported compression method 0x{methods:02X}"
        )));
    }
    log::trace!(
        "Unpacking {} bytes to {expected_size} with methods 0x{methods:02X}",
        payload.len()
    );

    let steps: [(u8, fn(&[u8], usize) -> Result<Vec<u8>>); 3] = [
        (method::BZIP2, bzip2),
        (method::PKWARE, explode),
        (method::ZLIB, zlib),
    ];
    let mut current = Cow::Borrowed(payload);
    for (flag, step) in steps {
        if methods & flag != 0 {
            current = Cow::Owned(step(&current, expected_size)?);
        }
    }

    check_size(current.into_owned(), expected_size)
}

/// Unpack an IMPLODE sector
pub fn explode_sector(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    check_size(explode(data, expected_size)?, expected_size)
}

fn check_size(data: Vec<u8>, expected_size: usize) -> Result<Vec<u8>> {
    if data.len() != expected_size {
        return Err(Error::compression(format!(
            "Decompressed size mismatch: expected {expected_size}, got {}",
            data.len()
        )));
    }
    Ok(data)
}

fn zlib(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::with_capacity(expected_size);
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| Error::compression(format!("Zlib decompression failed: {e}")))?;
    Ok(decompressed)
}

fn bzip2(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut decoder = BzDecoder::new(data);
    let mut decompressed = Vec::with_capacity(expected_size);
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| Error::compression(format!("BZip2 decompression failed: {e}")))?;
    Ok(decompressed)
}

fn explode(data: &[u8], _expected_size: usize) -> Result<Vec<u8>> {
    pklib::explode_bytes(data)
        .map_err(|e| Error::compression(format!("PKWare decompression failed: {e}")))
}

/// Packers used by the test archive writer
#[cfg(any(test, feature = "test-utils"))]
pub(crate) mod pack {
    use crate::{Error, Result};
    use bzip2::write::BzEncoder;
    use flate2::write::ZlibEncoder;
    use pklib::{CompressionMode, DictionarySize, implode_bytes};
    use std::io::Write;

    pub(crate) fn zlib(data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(data)
            .and_then(|()| encoder.finish())
            .map_err(|e| Error::compression(format!("Zlib compression failed: {e}")))
    }

    pub(crate) fn bzip2(data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = BzEncoder::new(Vec::new(), bzip2::Compression::default());
        encoder
            .write_all(data)
            .and_then(|()| encoder.finish())
            .map_err(|e| Error::compression(format!("BZip2 compression failed: {e}")))
    }

    pub(crate) fn implode(data: &[u8]) -> Result<Vec<u8>> {
        implode_bytes(data, CompressionMode::Binary, DictionarySize::Size2K)
            .map_err(|e| Error::compression(format!("PKWare compression failed: {e}")))
    }
}
