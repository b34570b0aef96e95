//! Block cipher over little-endian u32 words

use super::keys::ENCRYPTION_TABLE;

const SEED: u32 = 0xEEEE_EEEE;

#[inline]
fn next_key(key: u32) -> u32 {
    (!key << 0x15).wrapping_add(0x1111_1111) | (key >> 0x0B)
}

/// Decrypt a block of words in place
pub fn decrypt_block(data: &mut [u32], mut key: u32) {
    if key == 0 {
        return;
    }

    let mut seed = SEED;
    for value in data.iter_mut() {
        seed = seed.wrapping_add(ENCRYPTION_TABLE[0x400 + (key & 0xFF) as usize]);
        let plain = *value ^ key.wrapping_add(seed);
        *value = plain;

        key = next_key(key);
        seed = plain
            .wrapping_add(seed)
            .wrapping_add(seed << 5)
            .wrapping_add(3);
    }
}

/// Encrypt a block of words in place
pub fn encrypt_block(data: &mut [u32], mut key: u32) {
    if key == 0 {
        return;
    }

    let mut seed = SEED;
    for value in data.iter_mut() {
        seed = seed.wrapping_add(ENCRYPTION_TABLE[0x400 + (key & 0xFF) as usize]);
        let plain = *value;
        *value = plain ^ key.wrapping_add(seed);

        key = next_key(key);
        seed = plain
            .wrapping_add(seed)
            .wrapping_add(seed << 5)
            .wrapping_add(3);
    }
}

fn apply_to_bytes(data: &mut [u8], key: u32, cipher: fn(&mut [u32], u32)) {
    let mut words: Vec<u32> = data
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    cipher(&mut words, key);
    for (chunk, word) in data.chunks_exact_mut(4).zip(words) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
}

/// Decrypt a byte buffer in place
///
/// Trailing bytes that do not fill a whole word are stored in the clear.
pub fn decrypt_bytes(data: &mut [u8], key: u32) {
    apply_to_bytes(data, key, decrypt_block);
}

/// Encrypt a byte buffer in place, leaving a partial trailing word as is
pub fn encrypt_bytes(data: &mut [u8], key: u32) {
    apply_to_bytes(data, key, encrypt_block);
}

/// Recover the key of an encrypted sector offset table
///
/// The first plaintext entry of an offset table is its own size in bytes,
/// which pins down the key up to its low byte. Each of the 256 candidates is
/// checked against the second entry, which must be the end of a non-empty
/// first sector no larger than `max_sector`.
pub fn detect_table_key(encrypted: [u32; 2], first: u32, max_sector: u32) -> Option<u32> {
    let key_plus_seed = encrypted[0] ^ first;

    (0..0x100u32).find_map(|low| {
        let key = key_plus_seed
            .wrapping_sub(SEED)
            .wrapping_sub(ENCRYPTION_TABLE[0x400 + low as usize]);
        if key & 0xFF != low {
            return None;
        }

        let mut words = encrypted;
        decrypt_block(&mut words, key);
        let plausible = words[0] == first
            && words[1] > first
            && words[1] - first <= max_sector;
        plausible.then_some(key)
    })
}
