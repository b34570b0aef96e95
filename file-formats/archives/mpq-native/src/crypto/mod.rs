//! MPQ cryptography: the shared encryption table, the name hash and the
//! block cipher used for tables, sector offset tables and file sectors.

mod cipher;
mod hash;
mod keys;

pub use cipher::{decrypt_block, decrypt_bytes, detect_table_key, encrypt_block, encrypt_bytes};
pub use hash::{file_key, hash_string, hash_type};
pub use keys::ENCRYPTION_TABLE;

/// Key of the encrypted hash table, `hash_string("(hash table)", FILE_KEY)`
pub const HASH_TABLE_KEY: u32 = 0xC3AF_3770;

/// Key of the encrypted block table, `hash_string("(block table)", FILE_KEY)`
pub const BLOCK_TABLE_KEY: u32 = 0xEC83_B3A3;
