//! Queryable fields of archives, files and blocks

/// Archive-level info query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveField {
    /// Sum of the packed sizes of all existing files
    PackedSize,
    /// Sum of the unpacked sizes of all existing files
    UnpackedSize,
    /// Absolute byte offset of the archive header in the host file
    Offset,
    /// Format version, starting at 1
    Version,
    /// Number of block table entries
    Files,
    /// Hash table entry count
    HashTableSize,
    /// Block table entry count
    BlockTableSize,
    /// Sector size in bytes
    BlockSize,
}

/// File-level info query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileField {
    /// Packed size
    PackedSize,
    /// Unpacked size
    UnpackedSize,
    /// Offset of the file data relative to the archive start
    Offset,
    /// Number of blocks
    Blocks,
    /// Unpacked size of a full block
    BlockSize,
    /// 1 if encrypted
    Encrypted,
    /// 1 if compressed
    Compressed,
    /// 1 if imploded
    Imploded,
    /// 1 if stored as a single unit
    Single,
    /// 1 if stored without compression or implosion
    Copied,
}

/// Block-level info query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockField {
    /// Packed size
    PackedSize,
    /// Unpacked size
    UnpackedSize,
    /// Offset relative to the start of the file data
    Offset,
    /// Decryption key of the block, 0 if not encrypted
    Seed,
}
