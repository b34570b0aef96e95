//! Engine configuration

/// Limits applied while parsing untrusted archives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum allowed hash table entries (default: 1M)
    pub max_hash_entries: u32,
    /// Maximum allowed block table entries (default: 1M)
    pub max_block_entries: u32,
    /// Maximum allowed sector size shift (default: 20)
    pub max_sector_shift: u16,
    /// Maximum unpacked size of a single file (default: 1GB)
    pub max_file_size: u64,
    /// How far into a host file auto-detection looks for a header (default: 64MB)
    pub max_header_search: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_hash_entries: 1_000_000,
            max_block_entries: 1_000_000,
            max_sector_shift: 20,
            max_file_size: 1024 * 1024 * 1024, // 1GB
            max_header_search: 64 * 1024 * 1024, // 64MB
        }
    }
}

impl EngineConfig {
    /// Set the block table limit
    pub fn max_block_entries(mut self, entries: u32) -> Self {
        self.max_block_entries = entries;
        self
    }

    /// Set the hash table limit
    pub fn max_hash_entries(mut self, entries: u32) -> Self {
        self.max_hash_entries = entries;
        self
    }

    /// Set the per-file size limit
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Set the header search window
    pub fn max_header_search(mut self, bytes: u64) -> Self {
        self.max_header_search = bytes;
        self
    }
}
