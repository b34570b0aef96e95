//! Hash and block tables

use crate::crypto::{BLOCK_TABLE_KEY, HASH_TABLE_KEY, decrypt_block, hash_string, hash_type};
use crate::error::alloc_zeroed;
use crate::{Error, Result};
use std::io::{self, Read, Seek, SeekFrom};

/// Hash table entry (16 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEntry {
    /// The hash of the full file name (part A)
    pub name_1: u32,
    /// The hash of the full file name (part B)
    pub name_2: u32,
    /// The language of the file (Windows LANGID)
    pub locale: u16,
    /// The platform the file is used for
    pub platform: u16,
    /// Block table index or special value
    pub block_index: u32,
}

impl HashEntry {
    /// Value indicating the hash entry has never been used
    pub const EMPTY_NEVER_USED: u32 = 0xFFFF_FFFF;
    /// Value indicating the hash entry was deleted
    pub const EMPTY_DELETED: u32 = 0xFFFF_FFFE;

    /// Create an empty hash entry
    pub fn empty() -> Self {
        Self {
            name_1: Self::EMPTY_NEVER_USED,
            name_2: Self::EMPTY_NEVER_USED,
            locale: 0xFFFF,
            platform: 0xFFFF,
            block_index: Self::EMPTY_NEVER_USED,
        }
    }

    /// Create an entry pointing `name` at `block_index`
    pub fn for_name(name: &str, block_index: u32) -> Self {
        Self {
            name_1: hash_string(name, hash_type::NAME_A),
            name_2: hash_string(name, hash_type::NAME_B),
            locale: 0,
            platform: 0,
            block_index,
        }
    }

    /// Check if this entry has never been used
    pub fn is_empty(&self) -> bool {
        self.block_index == Self::EMPTY_NEVER_USED
    }

    /// Check if this entry contains valid file information
    pub fn is_valid(&self) -> bool {
        self.block_index < Self::EMPTY_DELETED
    }

    fn from_words(words: &[u32]) -> Self {
        Self {
            name_1: words[0],
            name_2: words[1],
            locale: (words[2] & 0xFFFF) as u16,
            platform: (words[2] >> 16) as u16,
            block_index: words[3],
        }
    }

    /// Table representation as four words
    pub fn to_words(&self) -> [u32; 4] {
        [
            self.name_1,
            self.name_2,
            u32::from(self.locale) | (u32::from(self.platform) << 16),
            self.block_index,
        ]
    }
}

/// Block table entry (16 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEntry {
    /// Offset of the file data, relative to the beginning of the archive
    pub file_pos: u32,
    /// Packed file size
    pub compressed_size: u32,
    /// Unpacked file size
    pub file_size: u32,
    /// Flags for the file
    pub flags: u32,
}

impl BlockEntry {
    /// File is compressed using PKWARE Data compression library
    pub const FLAG_IMPLODE: u32 = 0x0000_0100;
    /// File is compressed using one or more compression methods
    pub const FLAG_COMPRESS: u32 = 0x0000_0200;
    /// File is encrypted
    pub const FLAG_ENCRYPTED: u32 = 0x0001_0000;
    /// The decryption key for the file is adjusted by the block position
    pub const FLAG_FIX_KEY: u32 = 0x0002_0000;
    /// File is stored as a single unit, not split into sectors
    pub const FLAG_SINGLE_UNIT: u32 = 0x0100_0000;
    /// File has checksums for each sector
    pub const FLAG_SECTOR_CRC: u32 = 0x0400_0000;
    /// File exists in the archive
    pub const FLAG_EXISTS: u32 = 0x8000_0000;

    fn from_words(words: &[u32]) -> Self {
        Self {
            file_pos: words[0],
            compressed_size: words[1],
            file_size: words[2],
            flags: words[3],
        }
    }

    /// Table representation as four words
    pub fn to_words(&self) -> [u32; 4] {
        [self.file_pos, self.compressed_size, self.file_size, self.flags]
    }

    /// Check if the file has the COMPRESS flag
    pub fn is_compressed(&self) -> bool {
        self.flags & Self::FLAG_COMPRESS != 0
    }

    /// Check if the file has the IMPLODE flag
    pub fn is_imploded(&self) -> bool {
        self.flags & Self::FLAG_IMPLODE != 0
    }

    /// Check if the file is encrypted
    pub fn is_encrypted(&self) -> bool {
        self.flags & Self::FLAG_ENCRYPTED != 0
    }

    /// Check if the key is adjusted by position and size
    pub fn has_fix_key(&self) -> bool {
        self.flags & Self::FLAG_FIX_KEY != 0
    }

    /// Check if the file is stored as a single unit
    pub fn is_single_unit(&self) -> bool {
        self.flags & Self::FLAG_SINGLE_UNIT != 0
    }

    /// Check if the file exists
    pub fn exists(&self) -> bool {
        self.flags & Self::FLAG_EXISTS != 0
    }

    /// Stored without compression or implosion
    pub fn is_copied(&self) -> bool {
        !self.is_compressed() && !self.is_imploded()
    }
}

/// Read `count` encrypted 16-byte entries at `position` as decrypted words
fn read_table<R: Read + Seek>(
    reader: &mut R,
    position: u64,
    count: u32,
    key: u32,
    table: &str,
) -> Result<Vec<u32>> {
    reader
        .seek(SeekFrom::Start(position))
        .map_err(Error::Seek)?;

    let mut raw = alloc_zeroed(count as usize * 16)?;
    reader.read_exact(&mut raw).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::invalid_format(format!("{table} table is truncated"))
        } else {
            Error::Read(e)
        }
    })?;

    let mut words: Vec<u32> = raw
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    decrypt_block(&mut words, key);
    Ok(words)
}

/// Decrypted hash table
#[derive(Debug, Clone)]
pub struct HashTable {
    entries: Vec<HashEntry>,
}

impl HashTable {
    /// Read and decrypt the hash table
    pub fn read<R: Read + Seek>(reader: &mut R, position: u64, count: u32) -> Result<Self> {
        let words = read_table(reader, position, count, HASH_TABLE_KEY, "Hash")?;
        let entries = words.chunks_exact(4).map(HashEntry::from_words).collect();
        Ok(Self { entries })
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the block index for `name`
    ///
    /// The neutral locale wins over other locales; otherwise the first
    /// matching entry of the probe chain is used.
    pub fn find(&self, name: &str) -> Option<u32> {
        if self.entries.is_empty() {
            return None;
        }

        let name_a = hash_string(name, hash_type::NAME_A);
        let name_b = hash_string(name, hash_type::NAME_B);
        let start = hash_string(name, hash_type::TABLE_OFFSET) as usize % self.entries.len();

        let mut fallback = None;
        let mut index = start;
        loop {
            let entry = &self.entries[index];
            if entry.is_empty() {
                break;
            }
            if entry.is_valid() && entry.name_1 == name_a && entry.name_2 == name_b {
                if entry.locale == 0 {
                    return Some(entry.block_index);
                }
                fallback.get_or_insert(entry.block_index);
            }

            index = (index + 1) % self.entries.len();
            if index == start {
                break;
            }
        }

        fallback
    }
}

/// Decrypted block table
#[derive(Debug, Clone)]
pub struct BlockTable {
    entries: Vec<BlockEntry>,
}

impl BlockTable {
    /// Read and decrypt the block table
    pub fn read<R: Read + Seek>(reader: &mut R, position: u64, count: u32) -> Result<Self> {
        let words = read_table(reader, position, count, BLOCK_TABLE_KEY, "Block")?;
        let entries = words.chunks_exact(4).map(BlockEntry::from_words).collect();
        Ok(Self { entries })
    }

    /// Entry at `index`
    pub fn get(&self, index: u32) -> Option<&BlockEntry> {
        self.entries.get(index as usize)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries
    pub fn iter(&self) -> impl Iterator<Item = &BlockEntry> {
        self.entries.iter()
    }
}
