//! CRC-32 (IEEE 802.3, reflected polynomial 0xEDB88320)
//!
//! Whole-buffer checksums go through `crc32fast`. The ZipCrypto key schedule
//! needs the raw single-byte register update, which is served from the
//! lookup table below.

/// Lookup table for the reflected IEEE polynomial
const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0u32;
    while i < 256 {
        let mut crc = i;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB88320;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i as usize] = crc;
        i += 1;
    }
    table
};

/// CRC-32 of a byte sequence (init 0xFFFFFFFF, final complement)
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Advance a raw CRC register by one byte, without pre/post conditioning
#[inline]
pub(crate) fn update_byte(crc: u32, byte: u8) -> u32 {
    CRC32_TABLE[((crc ^ byte as u32) & 0xff) as usize] ^ (crc >> 8)
}
