//! Archive header location and parsing

use crate::config::EngineConfig;
use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor, Read, Seek, SeekFrom};

/// MPQ archive header signature ('MPQ\x1A')
pub const HEADER_SIGNATURE: u32 = 0x1A51_504D;

/// MPQ user data header signature ('MPQ\x1B')
pub const USER_DATA_SIGNATURE: u32 = 0x1B51_504D;

/// Auto-detection only looks at multiples of this
pub const HEADER_ALIGNMENT: u64 = 0x200;

const HEADER_SIZE_V1: u32 = 0x20;
const HEADER_SIZE_V2: u32 = 0x2C;
const V2_EXTENSION: usize = (HEADER_SIZE_V2 - HEADER_SIZE_V1) as usize;

/// Parsed archive header
///
/// Table positions are relative to the header and already include the
/// v2 high words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveHeader {
    /// Size of the header structure
    pub header_size: u32,
    /// Archive size recorded in the header
    pub archive_size: u32,
    /// Raw format version (0 = v1)
    pub format_version: u16,
    /// Sector size shift
    pub block_size: u16,
    /// Hash table position
    pub hash_table_pos: u64,
    /// Block table position
    pub block_table_pos: u64,
    /// Hash table entry count
    pub hash_table_size: u32,
    /// Block table entry count
    pub block_table_size: u32,
}

impl ArchiveHeader {
    /// Sector size in bytes
    pub fn sector_size(&self) -> u32 {
        512 << self.block_size
    }

    /// One-based format version
    pub fn version(&self) -> u32 {
        u32::from(self.format_version) + 1
    }

    /// Read and validate the header at `offset`
    pub fn read_at<R: Read + Seek>(
        reader: &mut R,
        offset: u64,
        config: &EngineConfig,
    ) -> Result<Self> {
        reader
            .seek(SeekFrom::Start(offset))
            .map_err(Error::Seek)?;

        let mut raw = [0u8; HEADER_SIZE_V1 as usize];
        read_header_bytes(reader, &mut raw)?;
        let mut cursor = Cursor::new(&raw[..]);

        let signature = field(cursor.read_u32::<LittleEndian>())?;
        if signature != HEADER_SIGNATURE {
            return Err(Error::invalid_format(format!(
                "No MPQ header at offset 0x{offset:X}"
            )));
        }

        let header_size = field(cursor.read_u32::<LittleEndian>())?;
        let archive_size = field(cursor.read_u32::<LittleEndian>())?;
        let format_version = field(cursor.read_u16::<LittleEndian>())?;
        let block_size = field(cursor.read_u16::<LittleEndian>())?;
        let hash_table_pos = field(cursor.read_u32::<LittleEndian>())?;
        let block_table_pos = field(cursor.read_u32::<LittleEndian>())?;
        let hash_table_size = field(cursor.read_u32::<LittleEndian>())?;
        let block_table_size = field(cursor.read_u32::<LittleEndian>())?;

        let mut header = Self {
            header_size,
            archive_size,
            format_version,
            block_size,
            hash_table_pos: u64::from(hash_table_pos),
            block_table_pos: u64::from(block_table_pos),
            hash_table_size,
            block_table_size,
        };
        header.validate(config)?;

        if format_version >= 1 {
            let mut extension = [0u8; V2_EXTENSION];
            read_header_bytes(reader, &mut extension)?;
            let mut cursor = Cursor::new(&extension[..]);

            // hi-block table position, only needed for files above 4GB
            let _hi_block_table_pos = field(cursor.read_u64::<LittleEndian>())?;
            let hash_table_pos_hi = field(cursor.read_u16::<LittleEndian>())?;
            let block_table_pos_hi = field(cursor.read_u16::<LittleEndian>())?;

            header.hash_table_pos |= u64::from(hash_table_pos_hi) << 32;
            header.block_table_pos |= u64::from(block_table_pos_hi) << 32;
        }

        log::trace!("Header at 0x{offset:X}: {header:?}");
        Ok(header)
    }

    fn validate(&self, config: &EngineConfig) -> Result<()> {
        if self.format_version > 3 {
            return Err(Error::invalid_format(format!(
                "Unsupported format version {}",
                self.format_version
            )));
        }

        let minimum = if self.format_version == 0 {
            HEADER_SIZE_V1
        } else {
            HEADER_SIZE_V2
        };
        if self.header_size < minimum {
            return Err(Error::invalid_format(format!(
                "Header size {} too small for format version {}",
                self.header_size,
                self.version()
            )));
        }

        if self.block_size > config.max_sector_shift {
            return Err(Error::invalid_format(format!(
                "Sector shift {} exceeds limit {}",
                self.block_size, config.max_sector_shift
            )));
        }
        if self.hash_table_size > config.max_hash_entries {
            return Err(Error::invalid_format(format!(
                "Hash table has {} entries (limit {})",
                self.hash_table_size, config.max_hash_entries
            )));
        }
        if self.block_table_size > config.max_block_entries {
            return Err(Error::invalid_format(format!(
                "Block table has {} entries (limit {})",
                self.block_table_size, config.max_block_entries
            )));
        }

        Ok(())
    }
}

fn field<T>(value: io::Result<T>) -> Result<T> {
    value.map_err(|e| Error::invalid_format(format!("Truncated header: {e}")))
}

fn read_header_bytes<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::invalid_format("Truncated header")
        } else {
            Error::Read(e)
        }
    })
}

/// Find the archive header
///
/// With an explicit `offset` the header must start exactly there. Without
/// one the host file is scanned from the start in [`HEADER_ALIGNMENT`]
/// steps; a user data header is followed to the header it points at.
pub fn locate<R: Read + Seek>(
    reader: &mut R,
    offset: Option<u64>,
    config: &EngineConfig,
) -> Result<(u64, ArchiveHeader)> {
    if let Some(offset) = offset {
        return ArchiveHeader::read_at(reader, offset, config).map(|header| (offset, header));
    }

    let file_size = reader.seek(SeekFrom::End(0)).map_err(Error::Seek)?;
    let limit = file_size.min(config.max_header_search.saturating_add(1));
    let mut position = 0u64;

    while position < limit {
        reader
            .seek(SeekFrom::Start(position))
            .map_err(Error::Seek)?;

        let mut probe = [0u8; 12];
        let available = (file_size - position).min(12) as usize;
        reader
            .read_exact(&mut probe[..available])
            .map_err(Error::Read)?;
        if available < 4 {
            break;
        }

        let signature = u32::from_le_bytes([probe[0], probe[1], probe[2], probe[3]]);
        match signature {
            HEADER_SIGNATURE => {
                log::debug!("Found MPQ header at 0x{position:X}");
                let header = ArchiveHeader::read_at(reader, position, config)?;
                return Ok((position, header));
            }
            USER_DATA_SIGNATURE if available == 12 => {
                let header_offset = u32::from_le_bytes([probe[8], probe[9], probe[10], probe[11]]);
                let target = position + u64::from(header_offset);
                if target + 4 <= file_size {
                    log::debug!(
                        "User data header at 0x{position:X} points to 0x{target:X}"
                    );
                    if let Ok(header) = ArchiveHeader::read_at(reader, target, config) {
                        return Ok((target, header));
                    }
                }
            }
            _ => {}
        }

        position += HEADER_ALIGNMENT;
    }

    Err(Error::invalid_format("No MPQ header found"))
}
