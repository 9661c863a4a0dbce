//! CRC-8, polynomial 0x07, initial value 0, no reflection (CRC-8/SMBUS).

/// Generator polynomial (x⁸ + x² + x + 1).
pub const POLY: u8 = 0x07;

const TABLE: [u8; 256] = build_table();

// i < 256 and bit < 8 throughout
#[allow(
    clippy::cast_possible_truncation,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ POLY } else { crc << 1 };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Continue a CRC over `data`.
pub fn update(crc: u8, data: &[u8]) -> u8 {
    data.iter().fold(crc, |crc, &b| {
        TABLE.get(usize::from(crc ^ b)).copied().unwrap_or(0)
    })
}

/// CRC of `data` from the initial value.
pub fn crc8(data: &[u8]) -> u8 {
    update(0, data)
}
