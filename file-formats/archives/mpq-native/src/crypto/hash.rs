//! The MPQ name hash

use super::keys::ENCRYPTION_TABLE;

/// Hash types selecting a 0x100-entry slice of the encryption table
pub mod hash_type {
    /// Starting slot in the hash table
    pub const TABLE_OFFSET: u32 = 0;
    /// First name check value
    pub const NAME_A: u32 = 1;
    /// Second name check value
    pub const NAME_B: u32 = 2;
    /// Encryption key derivation
    pub const FILE_KEY: u32 = 3;
}

/// Hash a string with the MPQ hash algorithm
///
/// Matching is case-insensitive and treats `/` as `\`.
pub fn hash_string(name: &str, hash_type: u32) -> u32 {
    let mut seed1: u32 = 0x7FED_7FED;
    let mut seed2: u32 = 0xEEEE_EEEE;

    for &byte in name.as_bytes() {
        let ch = if byte == b'/' {
            b'\\'
        } else {
            byte.to_ascii_uppercase()
        };

        let index = (hash_type * 0x100 + ch as u32) as usize;
        seed1 = ENCRYPTION_TABLE[index] ^ seed1.wrapping_add(seed2);
        seed2 = (ch as u32)
            .wrapping_add(seed1)
            .wrapping_add(seed2)
            .wrapping_add(seed2 << 5)
            .wrapping_add(3);
    }

    seed1
}

/// Encryption key of a file
///
/// Only the part of the name after the last path separator contributes.
/// With `fix_key` the key is additionally bound to the block's position
/// and size.
pub fn file_key(name: &str, file_pos: u32, file_size: u32, fix_key: bool) -> u32 {
    let base = name.rsplit(['\\', '/']).next().unwrap_or(name);
    let key = hash_string(base, hash_type::FILE_KEY);

    if fix_key {
        key.wrapping_add(file_pos) ^ file_size
    } else {
        key
    }
}
