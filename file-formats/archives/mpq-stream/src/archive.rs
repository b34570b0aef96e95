//! Opened archives and entry lookup

use crate::entry::{FileEntry, FileFlags};
use crate::error::{Error, Precondition, Result};
use crate::handle::ResourceHandle;
use crate::library::Library;
use crate::native::NativeEngine;
use mpq_native::{AUTO_DETECT_OFFSET, ArchiveField, ArchiveHandle, Engine};
use std::path::{Path, PathBuf};

/// Where the archive header sits in the host file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Offset {
    /// Search the host file for the header
    #[default]
    Detect,
    /// The header starts at this absolute byte offset
    At(u64),
}

impl Offset {
    fn raw(self) -> Result<i64> {
        match self {
            Self::Detect => Ok(AUTO_DETECT_OFFSET),
            Self::At(offset) => i64::try_from(offset)
                .map_err(|_| Error::InvalidArgument(format!("Archive offset {offset} too large"))),
        }
    }
}

/// How to find a file in an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// By file name
    Name(&'a str),
    /// By zero-based file number
    Index(u32),
}

impl<'a> From<&'a str> for Lookup<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a String> for Lookup<'a> {
    fn from(name: &'a String) -> Self {
        Self::Name(name)
    }
}

impl From<u32> for Lookup<'_> {
    fn from(index: u32) -> Self {
        Self::Index(index)
    }
}

/// Aggregate archive values, queried once at open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArchiveInfo {
    /// Sum of packed file sizes
    pub packed_size: u64,
    /// Sum of unpacked file sizes
    pub unpacked_size: u64,
    /// Absolute offset of the archive header in the host file
    pub offset: u64,
    /// Format version, starting at 1
    pub version: u32,
    /// Number of files (block table entries)
    pub files: u32,
    /// Hash table entry count
    pub hash_table_size: u32,
    /// Block table entry count
    pub block_table_size: u32,
    /// Sector size in bytes
    pub block_size: u32,
}

impl ArchiveInfo {
    fn query<E: NativeEngine>(library: &Library<E>, handle: ArchiveHandle) -> Result<Self> {
        let field = |field: ArchiveField| -> Result<u64> {
            let mut value = 0;
            library.call(|engine| engine.archive_info(handle, field, &mut value))?;
            Ok(value)
        };
        let narrow = |field_id: ArchiveField| -> Result<u32> {
            let value = field(field_id)?;
            u32::try_from(value).map_err(|_| {
                Error::InvalidArgument(format!("{field_id:?} value {value} out of range"))
            })
        };

        Ok(Self {
            packed_size: field(ArchiveField::PackedSize)?,
            unpacked_size: field(ArchiveField::UnpackedSize)?,
            offset: field(ArchiveField::Offset)?,
            version: narrow(ArchiveField::Version)?,
            files: narrow(ArchiveField::Files)?,
            hash_table_size: narrow(ArchiveField::HashTableSize)?,
            block_table_size: narrow(ArchiveField::BlockTableSize)?,
            block_size: narrow(ArchiveField::BlockSize)?,
        })
    }
}

/// An open MPQ archive
///
/// Owns the native archive handle. The handle is released by
/// [`close`](Self::close) or on drop, whichever comes first.
#[derive(Debug)]
pub struct Archive<'lib, E: NativeEngine = Engine> {
    library: &'lib Library<E>,
    path: PathBuf,
    info: ArchiveInfo,
    handle: ResourceHandle<ArchiveHandle>,
}

impl<'lib, E: NativeEngine> Archive<'lib, E> {
    /// Open the archive in `path`
    pub fn open(library: &'lib Library<E>, path: impl AsRef<Path>, offset: Offset) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let raw_offset = offset.raw()?;

        let mut raw = 0;
        library.call(|engine| engine.archive_open(&path, raw_offset, &mut raw))?;

        // From here on dropping the archive closes the handle
        let mut archive = Self {
            library,
            path,
            info: ArchiveInfo::default(),
            handle: ResourceHandle::new(raw, Precondition::ArchiveClosed),
        };
        archive.info = ArchiveInfo::query(library, raw)?;

        log::debug!(
            "Opened {} at 0x{:X}: v{}, {} files",
            archive.path.display(),
            archive.info.offset,
            archive.info.version,
            archive.info.files
        );
        Ok(archive)
    }

    /// Close the archive
    ///
    /// Only the first call reaches the engine; later calls succeed without
    /// doing anything.
    pub fn close(&self) -> Result<()> {
        match self
            .handle
            .release(|raw| self.library.call(|engine| engine.archive_close(raw)))
        {
            Some(result) => {
                log::debug!("Closed {}", self.path.display());
                result.map(|_| ())
            }
            None => Ok(()),
        }
    }

    /// Check if the archive is still open
    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    /// Path of the host file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Absolute offset of the archive in the host file
    pub fn offset(&self) -> u64 {
        self.info.offset
    }

    /// Aggregate values
    pub fn info(&self) -> &ArchiveInfo {
        &self.info
    }

    /// Number of files
    pub fn files(&self) -> u32 {
        self.info.files
    }

    /// Find a file by name or zero-based index
    ///
    /// ```no_run
    /// # use mpq_stream::{Archive, Library, Offset};
    /// # fn main() -> mpq_stream::Result<()> {
    /// let library = Library::init()?;
    /// let archive = Archive::open(&library, "patch.mpq", Offset::Detect)?;
    /// let by_name = archive.lookup("(listfile)")?;
    /// let by_index = archive.lookup(by_name.index())?;
    /// assert_eq!(by_name.info(), by_index.info());
    /// # Ok(())
    /// # }
    /// ```
    pub fn lookup<'n>(&self, id: impl Into<Lookup<'n>>) -> Result<FileEntry<'_, E>> {
        let raw = self.handle.get()?;
        let index = match id.into() {
            Lookup::Name(name) => {
                let mut number = 0;
                self.call(|engine| engine.file_number(raw, name, &mut number))
                    .inspect_err(|_| log::debug!("No file '{name}' in {}", self.path.display()))?;
                number
            }
            Lookup::Index(index) => index,
        };
        FileEntry::open(self, index)
    }

    /// Open the archive stored inside `entry`
    ///
    /// The entry must belong to this archive and be stored without
    /// compression, implosion or encryption.
    pub fn nested(&self, entry: &FileEntry<'_, E>) -> Result<Archive<'lib, E>> {
        self.handle.get()?;
        if !std::ptr::eq(entry.archive(), self) {
            return Err(Error::InvalidArgument(format!(
                "File {} belongs to another archive",
                entry.index()
            )));
        }

        let packed = entry.info().flags
            & (FileFlags::ENCRYPTED | FileFlags::COMPRESSED | FileFlags::IMPLODED);
        if !packed.is_empty() {
            return Err(Precondition::NestedArchive {
                index: entry.index(),
                flags: packed,
            }
            .into());
        }

        let offset = self
            .info
            .offset
            .checked_add(entry.info().offset)
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "Nested archive offset of file {} overflows",
                    entry.index()
                ))
            })?;
        log::debug!("Opening nested archive '{}' at 0x{offset:X}", entry.name());
        Archive::open(self.library, &self.path, Offset::At(offset))
    }

    pub(crate) fn raw(&self) -> Result<ArchiveHandle> {
        self.handle.get()
    }

    pub(crate) fn call(&self, f: impl FnOnce(&mut E) -> i32) -> Result<i32> {
        self.library.call(f)
    }
}

impl<E: NativeEngine> Drop for Archive<'_, E> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Failed to close {}: {e}", self.path.display());
        }
    }
}
