//! Packed files: metadata, whole-file reads and streams

use crate::archive::Archive;
use crate::error::{Error, Precondition, Result};
use crate::handle::ResourceHandle;
use crate::native::NativeEngine;
use crate::reader::BlockReader;
use bitflags::bitflags;
use mpq_native::{ArchiveHandle, Engine, FileField};

/// Name buffer size tried first
const NAME_BUFFER_LEN: usize = 1024;
/// Longest file name read back from the engine
const MAX_NAME_LEN: usize = 1024 * 1024;

bitflags! {
    /// How a file is stored
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FileFlags: u32 {
        /// Blocks are encrypted
        const ENCRYPTED = 0x01;
        /// Blocks are compressed
        const COMPRESSED = 0x02;
        /// Blocks are imploded
        const IMPLODED = 0x04;
        /// The file is one block
        const SINGLE = 0x08;
        /// Blocks are stored without compression or implosion
        const COPIED = 0x10;
    }
}

/// Per-file values, queried once at lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileInfo {
    /// Bytes stored in the archive
    pub packed_size: u64,
    /// Bytes after decoding
    pub unpacked_size: u64,
    /// Number of blocks
    pub blocks: u32,
    /// Offset of the file data relative to the archive start
    pub offset: u64,
    /// Unpacked size of a full block
    pub block_size: u32,
    /// Storage flags
    pub flags: FileFlags,
}

impl FileInfo {
    fn query<E: NativeEngine>(archive: &Archive<'_, E>, raw: ArchiveHandle, index: u32) -> Result<Self> {
        let field = |field: FileField| -> Result<u64> {
            let mut value = 0;
            archive.call(|engine| engine.file_info(raw, index, field, &mut value))?;
            Ok(value)
        };
        let narrow = |field_id: FileField| -> Result<u32> {
            let value = field(field_id)?;
            u32::try_from(value).map_err(|_| {
                Error::InvalidArgument(format!("{field_id:?} of file {index} is {value}"))
            })
        };

        let mut flags = FileFlags::empty();
        for (field_id, flag) in [
            (FileField::Encrypted, FileFlags::ENCRYPTED),
            (FileField::Compressed, FileFlags::COMPRESSED),
            (FileField::Imploded, FileFlags::IMPLODED),
            (FileField::Single, FileFlags::SINGLE),
            (FileField::Copied, FileFlags::COPIED),
        ] {
            match field(field_id)? {
                0 => {}
                1 => flags |= flag,
                value => {
                    return Err(Error::InvalidArgument(format!(
                        "{field_id:?} flag of file {index} is {value}"
                    )));
                }
            }
        }

        Ok(Self {
            packed_size: field(FileField::PackedSize)?,
            unpacked_size: field(FileField::UnpackedSize)?,
            blocks: narrow(FileField::Blocks)?,
            offset: field(FileField::Offset)?,
            block_size: narrow(FileField::BlockSize)?,
            flags,
        })
    }
}

/// One file in an open archive
///
/// Holds the engine's per-file state from lookup until [`close`](Self::close)
/// or drop. Every operation fails with a precondition violation once the
/// entry or its archive has been closed.
#[derive(Debug)]
pub struct FileEntry<'a, E: NativeEngine = Engine> {
    archive: &'a Archive<'a, E>,
    index: u32,
    name: String,
    info: FileInfo,
    handle: ResourceHandle<(ArchiveHandle, u32)>,
}

impl<'a, E: NativeEngine> FileEntry<'a, E> {
    pub(crate) fn open(archive: &'a Archive<'a, E>, index: u32) -> Result<Self> {
        let raw = archive.raw()?;
        archive.call(|engine| engine.file_open(raw, index))?;

        // From here on dropping the entry closes the file state
        let mut entry = Self {
            archive,
            index,
            name: String::new(),
            info: FileInfo::default(),
            handle: ResourceHandle::new((raw, index), Precondition::EntryClosed),
        };

        entry.name = Self::query_name(archive, raw, index)?;
        entry.info = FileInfo::query(archive, raw, index)?;

        log::debug!(
            "File {index} '{}': {} bytes in {} blocks, {:?}",
            entry.name,
            entry.info.unpacked_size,
            entry.info.blocks,
            entry.info.flags
        );
        Ok(entry)
    }

    /// Read the name, growing the buffer while the engine reports it too small
    fn query_name(archive: &Archive<'_, E>, raw: ArchiveHandle, index: u32) -> Result<String> {
        let mut buffer = vec![0u8; NAME_BUFFER_LEN];
        loop {
            match archive.call(|engine| engine.file_name(raw, index, &mut buffer)) {
                Ok(len) => {
                    let len = usize::try_from(len).map_err(|_| {
                        Error::InvalidArgument(format!("Name length {len} of file {index}"))
                    })?;
                    let name = &buffer[..len.min(buffer.len())];
                    return Ok(String::from_utf8_lossy(name).into_owned());
                }
                Err(Error::Precondition(Precondition::BufferTooSmall))
                    if buffer.len() < MAX_NAME_LEN =>
                {
                    log::trace!("Name of file {index} exceeds {} bytes", buffer.len());
                    buffer.resize(buffer.len() * 2, 0);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Zero-based file number
    pub fn index(&self) -> u32 {
        self.index
    }

    /// File name; synthesized by the engine when the archive does not list it
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Per-file values
    pub fn info(&self) -> &FileInfo {
        &self.info
    }

    /// The archive this entry belongs to
    pub fn archive(&self) -> &'a Archive<'a, E> {
        self.archive
    }

    /// Check if both the entry and its archive are open
    pub fn is_open(&self) -> bool {
        self.archive.is_open() && self.handle.is_open()
    }

    /// Raw handles, after checking that the archive and entry are open
    pub(crate) fn raw(&self) -> Result<(ArchiveHandle, u32)> {
        self.archive.raw()?;
        self.handle.get()
    }

    pub(crate) fn call(&self, f: impl FnOnce(&mut E) -> i32) -> Result<i32> {
        self.archive.call(f)
    }

    /// Decode the whole file in one call
    pub fn materialize(&self) -> Result<Vec<u8>> {
        let (raw, index) = self.raw()?;
        let size = usize::try_from(self.info.unpacked_size).map_err(|_| Error::OutOfMemory)?;

        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| Error::OutOfMemory)?;
        data.resize(size, 0);

        let mut transferred = 0;
        self.call(|engine| engine.file_read(raw, index, &mut data, &mut transferred))?;
        data.truncate(transferred as usize);
        Ok(data)
    }

    /// A new stream over the file, positioned at its start
    pub fn open_stream(&self) -> Result<BlockReader<'_, E>> {
        self.raw()?;
        Ok(BlockReader::new(self))
    }

    /// Release the engine's per-file state
    ///
    /// Only the first call does anything. When the archive is already
    /// closed there is nothing left to release in the engine.
    pub fn close(&self) -> Result<()> {
        let archive = self.archive;
        match self.handle.release(|(raw, index)| {
            archive
                .is_open()
                .then(|| archive.call(|engine| engine.file_close(raw, index)))
        }) {
            Some(Some(result)) => result.map(|_| ()),
            Some(None) => {
                log::debug!("File {} released after its archive closed", self.index);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl<E: NativeEngine> Drop for FileEntry<'_, E> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Failed to close file {}: {e}", self.index);
        }
    }
}
