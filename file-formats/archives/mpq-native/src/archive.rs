//! State of one open archive: tables, known names and block layouts

use crate::compression;
use crate::config::EngineConfig;
use crate::crypto::{decrypt_bytes, decrypt_block, detect_table_key, file_key};
use crate::error::alloc_zeroed;
use crate::header::{self, ArchiveHeader};
use crate::info::{ArchiveField, BlockField, FileField};
use crate::listfile::{self, LISTFILE_NAME};
use crate::tables::{BlockEntry, BlockTable, HashTable};
use crate::{Error, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One independently decodable block of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockSpan {
    /// Offset relative to the start of the file data
    pub(crate) offset: u32,
    /// Bytes stored on disk
    pub(crate) packed: u32,
    /// Bytes after decoding
    pub(crate) unpacked: u32,
}

/// Block layout of one file
#[derive(Debug, Clone)]
pub(crate) struct FileLayout {
    pub(crate) entry: BlockEntry,
    /// Detected key, for files whose name is unknown
    pub(crate) detected_key: Option<u32>,
    pub(crate) spans: Vec<BlockSpan>,
}

#[derive(Debug)]
struct OpenFile {
    layout: Arc<FileLayout>,
    references: usize,
}

/// An archive opened by the engine
#[derive(Debug)]
pub(crate) struct OpenArchive {
    path: PathBuf,
    reader: BufReader<File>,
    offset: u64,
    header: ArchiveHeader,
    hash_table: HashTable,
    block_table: BlockTable,
    names: HashMap<u32, String>,
    open_files: HashMap<u32, OpenFile>,
    max_file_size: u64,
}

impl OpenArchive {
    /// Open the archive at `path`, auto-detecting the header when `offset` is `None`
    pub(crate) fn open(path: &Path, offset: Option<u64>, config: &EngineConfig) -> Result<Self> {
        let file = File::open(path).map_err(Error::Open)?;
        let mut reader = BufReader::new(file);

        let (offset, header) = header::locate(&mut reader, offset, config)?;
        let hash_table =
            HashTable::read(&mut reader, offset + header.hash_table_pos, header.hash_table_size)?;
        let block_table = BlockTable::read(
            &mut reader,
            offset + header.block_table_pos,
            header.block_table_size,
        )?;

        let mut archive = Self {
            path: path.to_path_buf(),
            reader,
            offset,
            header,
            hash_table,
            block_table,
            names: HashMap::new(),
            open_files: HashMap::new(),
            max_file_size: config.max_file_size,
        };
        archive.load_listfile();

        log::debug!(
            "Opened {} at 0x{offset:X}: v{}, {} blocks, {} names known",
            archive.path.display(),
            archive.header.version(),
            archive.block_table.len(),
            archive.names.len()
        );
        Ok(archive)
    }

    fn load_listfile(&mut self) {
        let Some(index) = self.hash_table.find(LISTFILE_NAME) else {
            return;
        };
        self.names.insert(index, LISTFILE_NAME.to_string());

        let data = match self.read_file(index) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Ignoring unreadable (listfile) in {}: {e}", self.path.display());
                return;
            }
        };

        for name in listfile::parse(&data) {
            if let Some(index) = self.hash_table.find(&name) {
                self.names.entry(index).or_insert(name);
            }
        }
    }

    /// Path of the host file
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Archive-level info query
    pub(crate) fn info(&self, field: ArchiveField) -> u64 {
        let existing = || self.block_table.iter().filter(|entry| entry.exists());
        match field {
            ArchiveField::PackedSize => existing().map(|e| u64::from(e.compressed_size)).sum(),
            ArchiveField::UnpackedSize => existing().map(|e| u64::from(e.file_size)).sum(),
            ArchiveField::Offset => self.offset,
            ArchiveField::Version => u64::from(self.header.version()),
            ArchiveField::Files => self.block_table.len() as u64,
            ArchiveField::HashTableSize => u64::from(self.header.hash_table_size),
            ArchiveField::BlockTableSize => u64::from(self.header.block_table_size),
            ArchiveField::BlockSize => u64::from(self.header.sector_size()),
        }
    }

    fn entry(&self, index: u32) -> Result<BlockEntry> {
        self.block_table
            .get(index)
            .copied()
            .ok_or_else(|| Error::not_found(format!("File number {index} out of range")))
    }

    /// Resolve a name to its file number and remember the name
    pub(crate) fn file_number(&mut self, name: &str) -> Result<u32> {
        let index = self
            .hash_table
            .find(name)
            .ok_or_else(|| Error::not_found(format!("File '{name}' not in archive")))?;

        let entry = self.entry(index)?;
        if !entry.exists() {
            return Err(Error::not_found(format!("File '{name}' was deleted")));
        }

        self.names.insert(index, name.to_string());
        Ok(index)
    }

    /// Name of a file number, synthesized when no name is known
    pub(crate) fn file_name(&self, index: u32) -> Result<String> {
        self.entry(index)?;
        Ok(self
            .names
            .get(&index)
            .cloned()
            .unwrap_or_else(|| format!("file{index:06}.xxx")))
    }

    /// Load and pin the layout of a file
    pub(crate) fn file_open(&mut self, index: u32) -> Result<()> {
        if let Some(open) = self.open_files.get_mut(&index) {
            open.references += 1;
            return Ok(());
        }

        let layout = Arc::new(self.load_layout(index)?);
        self.open_files.insert(
            index,
            OpenFile {
                layout,
                references: 1,
            },
        );
        Ok(())
    }

    /// Release one pin on a file layout
    pub(crate) fn file_close(&mut self, index: u32) -> Result<()> {
        let open = self
            .open_files
            .get_mut(&index)
            .ok_or_else(|| Error::Close(format!("File {index} is not open")))?;

        open.references -= 1;
        if open.references == 0 {
            self.open_files.remove(&index);
        }
        Ok(())
    }

    /// Number of files with a pinned layout
    pub(crate) fn open_file_count(&self) -> usize {
        self.open_files.len()
    }

    /// File-level info query
    pub(crate) fn file_info(&mut self, index: u32, field: FileField) -> Result<u64> {
        let entry = self.entry(index)?;
        let flag = |set: bool| u64::from(set);

        Ok(match field {
            FileField::PackedSize => u64::from(entry.compressed_size),
            FileField::UnpackedSize => u64::from(entry.file_size),
            FileField::Offset => u64::from(entry.file_pos),
            FileField::Blocks => self.layout(index)?.spans.len() as u64,
            FileField::BlockSize => {
                if entry.is_single_unit() {
                    u64::from(entry.file_size)
                } else {
                    u64::from(self.header.sector_size())
                }
            }
            FileField::Encrypted => flag(entry.is_encrypted()),
            FileField::Compressed => flag(entry.is_compressed()),
            FileField::Imploded => flag(entry.is_imploded()),
            FileField::Single => flag(entry.is_single_unit()),
            FileField::Copied => flag(entry.is_copied()),
        })
    }

    /// Block-level info query
    pub(crate) fn block_info(&mut self, index: u32, block: u32, field: BlockField) -> Result<u64> {
        let layout = self.layout(index)?;
        self.check_size(&layout)?;
        let span = span(&layout, index, block)?;

        Ok(match field {
            BlockField::PackedSize => u64::from(span.packed),
            BlockField::UnpackedSize => u64::from(span.unpacked),
            BlockField::Offset => u64::from(span.offset),
            BlockField::Seed => {
                if layout.entry.is_encrypted() {
                    u64::from(self.key(index, &layout)?.wrapping_add(block))
                } else {
                    0
                }
            }
        })
    }

    /// Decode all blocks of a file into `out`
    pub(crate) fn read_file_into(&mut self, index: u32, out: &mut [u8]) -> Result<usize> {
        let layout = self.layout(index)?;
        let size = layout.entry.file_size as usize;
        self.check_size(&layout)?;
        if out.len() < size {
            return Err(Error::BufferTooSmall {
                needed: size,
                available: out.len(),
            });
        }

        let mut written = 0;
        for block in 0..layout.spans.len() as u32 {
            let data = self.decode_block(index, &layout, block)?;
            out[written..written + data.len()].copy_from_slice(&data);
            written += data.len();
        }
        Ok(written)
    }

    fn read_file(&mut self, index: u32) -> Result<Vec<u8>> {
        let size = self.entry(index)?.file_size as usize;
        let mut data = alloc_zeroed(size)?;
        let written = self.read_file_into(index, &mut data)?;
        data.truncate(written);
        Ok(data)
    }

    /// Decode one block into `out`
    pub(crate) fn read_block(&mut self, index: u32, block: u32, out: &mut [u8]) -> Result<usize> {
        let layout = self.layout(index)?;
        self.check_size(&layout)?;
        let expected = span(&layout, index, block)?.unpacked as usize;
        if out.len() < expected {
            return Err(Error::BufferTooSmall {
                needed: expected,
                available: out.len(),
            });
        }

        let data = self.decode_block(index, &layout, block)?;
        out[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }

    /// Reject files above the configured unpacked size limit
    fn check_size(&self, layout: &FileLayout) -> Result<()> {
        let size = layout.entry.file_size;
        if u64::from(size) > self.max_file_size {
            return Err(Error::OutOfMemory {
                requested: size as usize,
            });
        }
        Ok(())
    }

    fn layout(&mut self, index: u32) -> Result<Arc<FileLayout>> {
        match self.open_files.get(&index) {
            Some(open) => Ok(Arc::clone(&open.layout)),
            None => self.load_layout(index).map(Arc::new),
        }
    }

    /// Key of an encrypted file, from its known name or the detected key
    fn key(&self, index: u32, layout: &FileLayout) -> Result<u32> {
        let entry = &layout.entry;
        self.names
            .get(&index)
            .map(|name| file_key(name, entry.file_pos, entry.file_size, entry.has_fix_key()))
            .or(layout.detected_key)
            .ok_or_else(|| Error::crypto(format!("Encryption key of file {index} is unknown")))
    }

    fn load_layout(&mut self, index: u32) -> Result<FileLayout> {
        let entry = self.entry(index)?;
        if !entry.exists() {
            return Err(Error::not_found(format!("File number {index} does not exist")));
        }

        let sector_size = self.header.sector_size();
        let mut layout = FileLayout {
            entry,
            detected_key: None,
            spans: Vec::new(),
        };

        if entry.file_size == 0 {
            return Ok(layout);
        }

        if entry.is_single_unit() {
            layout.spans.push(BlockSpan {
                offset: 0,
                packed: entry.compressed_size,
                unpacked: entry.file_size,
            });
            return Ok(layout);
        }

        let sectors = entry.file_size.div_ceil(sector_size);
        let unpacked = |i: u32| sector_size.min(entry.file_size - i * sector_size);

        if entry.is_copied() {
            layout.spans = (0..sectors)
                .map(|i| BlockSpan {
                    offset: i * sector_size,
                    packed: unpacked(i),
                    unpacked: unpacked(i),
                })
                .collect();
            return Ok(layout);
        }

        let offsets = self.read_sector_table(index, &mut layout, sectors, sector_size)?;
        for i in 0..sectors {
            let (start, end) = (offsets[i as usize], offsets[i as usize + 1]);
            if end < start || end > entry.compressed_size {
                return Err(Error::invalid_format(format!(
                    "Corrupt sector table in file {index}: sector {i} spans {start}..{end}"
                )));
            }
            layout.spans.push(BlockSpan {
                offset: start,
                packed: end - start,
                unpacked: unpacked(i),
            });
        }

        log::trace!("File {index}: {} sectors of {sector_size} bytes", sectors);
        Ok(layout)
    }

    fn read_sector_table(
        &mut self,
        index: u32,
        layout: &mut FileLayout,
        sectors: u32,
        sector_size: u32,
    ) -> Result<Vec<u32>> {
        let entry = layout.entry;
        let crc_entries = u32::from(entry.flags & BlockEntry::FLAG_SECTOR_CRC != 0);
        let table_len = (sectors + 1) as usize;

        self.seek_file(&entry, 0)?;
        let mut raw = alloc_zeroed(table_len * 4)?;
        self.read_exact(&mut raw)?;
        let mut offsets: Vec<u32> = raw
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        if entry.is_encrypted() {
            let key = match self.key(index, layout) {
                Ok(key) => key,
                Err(_) => {
                    let first = (sectors + 1 + crc_entries) * 4;
                    let table_key = detect_table_key([offsets[0], offsets[1]], first, sector_size)
                        .ok_or_else(|| {
                            Error::crypto(format!("Cannot detect encryption key of file {index}"))
                        })?;
                    log::debug!("Detected key 0x{:08X} for file {index}", table_key + 1);
                    layout.detected_key = Some(table_key.wrapping_add(1));
                    table_key.wrapping_add(1)
                }
            };
            decrypt_block(&mut offsets, key.wrapping_sub(1));
        }

        Ok(offsets)
    }

    fn decode_block(&mut self, index: u32, layout: &FileLayout, block: u32) -> Result<Vec<u8>> {
        let entry = layout.entry;
        let span = span(layout, index, block)?;

        self.seek_file(&entry, span.offset)?;
        let mut data = alloc_zeroed(span.packed as usize)?;
        self.read_exact(&mut data)?;

        if entry.is_encrypted() {
            let key = self.key(index, layout)?;
            decrypt_bytes(&mut data, key.wrapping_add(block));
        }

        let expected = span.unpacked as usize;
        if data.len() >= expected {
            data.truncate(expected);
            return Ok(data);
        }

        log::trace!(
            "File {index} block {block}: unpacking {} -> {expected} bytes",
            data.len()
        );
        if entry.is_compressed() {
            compression::decompress(&data, expected)
        } else if entry.is_imploded() {
            compression::explode_sector(&data, expected)
        } else {
            Err(Error::invalid_format(format!(
                "Stored block {block} of file {index} is shorter than its size"
            )))
        }
    }

    fn seek_file(&mut self, entry: &BlockEntry, offset: u32) -> Result<()> {
        let position = self.offset + u64::from(entry.file_pos) + u64::from(offset);
        self.reader
            .seek(SeekFrom::Start(position))
            .map(|_| ())
            .map_err(Error::Seek)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact(buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Error::invalid_format("File data extends past the end of the archive")
            } else {
                Error::Read(e)
            }
        })
    }
}

fn span(layout: &FileLayout, index: u32, block: u32) -> Result<BlockSpan> {
    layout
        .spans
        .get(block as usize)
        .copied()
        .ok_or_else(|| Error::not_found(format!("Block {block} of file {index} out of range")))
}
