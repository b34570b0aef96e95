//! The 0x500-entry encryption table shared by hashing and the block cipher

/// Encryption table, generated at compile time
pub static ENCRYPTION_TABLE: [u32; 0x500] = generate_table();

const fn generate_table() -> [u32; 0x500] {
    let mut table = [0u32; 0x500];
    let mut seed: u32 = 0x0010_0001;

    let mut index1 = 0;
    while index1 < 0x100 {
        let mut index2 = index1;
        let mut round = 0;
        while round < 5 {
            seed = (seed * 125 + 3) % 0x002A_AAAB;
            let high = (seed & 0xFFFF) << 0x10;
            seed = (seed * 125 + 3) % 0x002A_AAAB;
            let low = seed & 0xFFFF;

            table[index2] = high | low;
            index2 += 0x100;
            round += 1;
        }
        index1 += 1;
    }

    table
}
