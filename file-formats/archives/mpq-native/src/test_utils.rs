//! Test archive writer
//!
//! Writes small v1 archives covering every layout the engine decodes:
//! single-unit and sectored files, stored, compressed and imploded data,
//! plain and encrypted (optionally FIX_KEY) storage.

use crate::compression::{method, pack};
use crate::crypto::{BLOCK_TABLE_KEY, HASH_TABLE_KEY, encrypt_block, encrypt_bytes, file_key};
use crate::crypto::{hash_string, hash_type};
use crate::header::HEADER_SIGNATURE;
use crate::listfile::LISTFILE_NAME;
use crate::tables::{BlockEntry, HashEntry};
use crate::{Error, Result};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::path::Path;

const HEADER_SIZE: usize = 0x20;

/// How a test file's data is packed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packing {
    /// Stored as is
    Stored,
    /// COMPRESS with zlib
    Zlib,
    /// COMPRESS with bzip2
    Bzip2,
    /// COMPRESS with PKWARE DCL
    Pkware,
    /// IMPLODE (PKWARE DCL without a method byte)
    Imploded,
}

/// A file to include in a test archive
#[derive(Debug, Clone)]
pub struct TestFile {
    /// Name within the archive
    pub name: String,
    /// Unpacked content
    pub data: Vec<u8>,
    /// Packing of each block
    pub packing: Packing,
    /// Store as one block instead of sectors
    pub single_unit: bool,
    /// Encrypt the blocks
    pub encrypted: bool,
    /// Bind the key to the block position
    pub fix_key: bool,
}

impl TestFile {
    /// A stored, sectored, unencrypted file
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            packing: Packing::Stored,
            single_unit: false,
            encrypted: false,
            fix_key: false,
        }
    }

    /// Set the packing
    pub fn packing(mut self, packing: Packing) -> Self {
        self.packing = packing;
        self
    }

    /// Store as a single unit
    pub fn single_unit(mut self) -> Self {
        self.single_unit = true;
        self
    }

    /// Encrypt the file
    pub fn encrypted(mut self) -> Self {
        self.encrypted = true;
        self
    }

    /// Encrypt with a position-adjusted key
    pub fn fix_key(mut self) -> Self {
        self.encrypted = true;
        self.fix_key = true;
        self
    }
}

/// Writer for v1 test archives
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    block_size: u16,
    hash_table_size: Option<u32>,
    listfile: bool,
    files: Vec<TestFile>,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveBuilder {
    /// Empty builder with 4KB sectors and a (listfile)
    pub fn new() -> Self {
        Self {
            block_size: 3,
            hash_table_size: None,
            listfile: true,
            files: Vec::new(),
        }
    }

    /// Set the sector size shift (sector size = 512 << shift)
    pub fn block_size(mut self, shift: u16) -> Self {
        self.block_size = shift;
        self
    }

    /// Set the hash table size (a power of two)
    pub fn hash_table_size(mut self, entries: u32) -> Self {
        self.hash_table_size = Some(entries);
        self
    }

    /// Whether to write a (listfile)
    pub fn listfile(mut self, include: bool) -> Self {
        self.listfile = include;
        self
    }

    /// Add a stored file
    pub fn file(self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.add(TestFile::new(name, data))
    }

    /// Add a file
    pub fn add(mut self, file: TestFile) -> Self {
        self.files.push(file);
        self
    }

    /// Write the archive to a byte vector
    pub fn build(&self) -> Result<Vec<u8>> {
        let sector_size = 512usize << self.block_size;
        let mut files = self.files.clone();
        if self.listfile {
            let names: Vec<&str> = self.files.iter().map(|f| f.name.as_str()).collect();
            files.push(TestFile::new(LISTFILE_NAME, names.join("\r\n")).packing(Packing::Zlib));
        }

        let mut out = vec![0u8; HEADER_SIZE];
        let mut blocks = Vec::with_capacity(files.len());
        for file in &files {
            blocks.push(write_file(&mut out, file, sector_size)?);
        }

        let hash_entries = self
            .hash_table_size
            .unwrap_or_else(|| (files.len() as u32 * 2).next_power_of_two().max(16));
        let hash_table_pos = position(&out)?;
        let mut words = hash_table_words(&files, hash_entries)?;
        encrypt_block(&mut words, HASH_TABLE_KEY);
        write_words(&mut out, &words);

        let block_table_pos = position(&out)?;
        let mut words: Vec<u32> = blocks.iter().flat_map(BlockEntry::to_words).collect();
        encrypt_block(&mut words, BLOCK_TABLE_KEY);
        write_words(&mut out, &words);

        let archive_size = position(&out)?;
        let mut header = Vec::with_capacity(HEADER_SIZE);
        for value in [HEADER_SIGNATURE, HEADER_SIZE as u32, archive_size] {
            header.extend_from_slice(&value.to_le_bytes());
        }
        header.extend_from_slice(&0u16.to_le_bytes());
        header.extend_from_slice(&self.block_size.to_le_bytes());
        for value in [
            hash_table_pos,
            block_table_pos,
            hash_entries,
            blocks.len() as u32,
        ] {
            header.extend_from_slice(&value.to_le_bytes());
        }
        out[..HEADER_SIZE].copy_from_slice(&header);

        Ok(out)
    }

    /// Write the archive to `path`
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.build()?).map_err(Error::Open)
    }
}

fn position(out: &[u8]) -> Result<u32> {
    u32::try_from(out.len())
        .map_err(|_| Error::InvalidArgument("Test archive exceeds 4GB".to_string()))
}

fn write_words(out: &mut Vec<u8>, words: &[u32]) {
    for word in words {
        out.extend_from_slice(&word.to_le_bytes());
    }
}

fn hash_table_words(files: &[TestFile], entries: u32) -> Result<Vec<u32>> {
    let mut slots = vec![HashEntry::empty(); entries as usize];
    for (block, file) in files.iter().enumerate() {
        let start = hash_string(&file.name, hash_type::TABLE_OFFSET) as usize % slots.len();
        let slot = (0..slots.len())
            .map(|step| (start + step) % slots.len())
            .find(|&slot| slots[slot].is_empty())
            .ok_or_else(|| Error::InvalidArgument("Hash table is full".to_string()))?;
        slots[slot] = HashEntry::for_name(&file.name, block as u32);
    }
    Ok(slots.iter().flat_map(HashEntry::to_words).collect())
}

fn with_method(methods: u8, payload: Vec<u8>) -> Vec<u8> {
    let mut sector = Vec::with_capacity(payload.len() + 1);
    sector.push(methods);
    sector.extend(payload);
    sector
}

/// Pack one block, falling back to the raw data when packing does not help
fn pack_block(packing: Packing, data: &[u8]) -> Result<Vec<u8>> {
    let packed = match packing {
        Packing::Stored => return Ok(data.to_vec()),
        Packing::Imploded => pack::implode(data)?,
        Packing::Zlib => with_method(method::ZLIB, pack::zlib(data)?),
        Packing::Bzip2 => with_method(method::BZIP2, pack::bzip2(data)?),
        Packing::Pkware => with_method(method::PKWARE, pack::implode(data)?),
    };

    if packed.len() < data.len() {
        Ok(packed)
    } else {
        Ok(data.to_vec())
    }
}

fn write_file(out: &mut Vec<u8>, file: &TestFile, sector_size: usize) -> Result<BlockEntry> {
    let file_pos = position(out)?;
    let file_size = u32::try_from(file.data.len())
        .map_err(|_| Error::InvalidArgument(format!("{} is too large", file.name)))?;

    let mut flags = BlockEntry::FLAG_EXISTS;
    if file_size == 0 {
        return Ok(BlockEntry {
            file_pos,
            compressed_size: 0,
            file_size,
            flags,
        });
    }

    flags |= match file.packing {
        Packing::Stored => 0,
        Packing::Imploded => BlockEntry::FLAG_IMPLODE,
        _ => BlockEntry::FLAG_COMPRESS,
    };
    if file.single_unit {
        flags |= BlockEntry::FLAG_SINGLE_UNIT;
    }
    let key = if file.encrypted {
        flags |= BlockEntry::FLAG_ENCRYPTED;
        if file.fix_key {
            flags |= BlockEntry::FLAG_FIX_KEY;
        }
        file_key(&file.name, file_pos, file_size, file.fix_key)
    } else {
        0
    };

    if file.single_unit {
        let mut data = pack_block(file.packing, &file.data)?;
        encrypt_bytes(&mut data, key);
        out.extend(data);
    } else if file.packing == Packing::Stored {
        for (i, chunk) in file.data.chunks(sector_size).enumerate() {
            let mut data = chunk.to_vec();
            encrypt_bytes(&mut data, key.wrapping_add(i as u32));
            out.extend(data);
        }
    } else {
        let sectors = file.data.len().div_ceil(sector_size);
        let table_size = ((sectors + 1) * 4) as u32;
        let mut offsets = vec![table_size];
        let mut body = Vec::new();
        for (i, chunk) in file.data.chunks(sector_size).enumerate() {
            let mut data = pack_block(file.packing, chunk)?;
            encrypt_bytes(&mut data, key.wrapping_add(i as u32));
            body.extend(data);
            offsets.push(table_size + body.len() as u32);
        }

        if file.encrypted {
            encrypt_block(&mut offsets, key.wrapping_sub(1));
        }
        write_words(out, &offsets);
        out.extend(body);
    }

    Ok(BlockEntry {
        file_pos,
        compressed_size: position(out)? - file_pos,
        file_size,
        flags,
    })
}

/// Incompressible bytes from a seeded generator
pub fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill(&mut data[..]);
    data
}

/// Compressible text of exactly `len` bytes
pub fn text(len: usize) -> Vec<u8> {
    b"Lorem ipsum dolor sit amet, consectetur adipiscing elit. "
        .iter()
        .copied()
        .cycle()
        .take(len)
        .collect()
}
