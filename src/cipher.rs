//! Traditional PKWARE encryption ("ZipCrypto")
//!
//! Three 32-bit keys are seeded with fixed constants and folded with every
//! password byte. Each payload is prefixed with a 12-byte encryption header
//! whose last decrypted byte must equal a verification byte taken from the
//! entry's CRC (or DOS time when a data descriptor is used).
//!
//! ZipCrypto is weak. It exists here for compatibility with old
//! password-protected archives, nothing more.

use crate::crc::update_byte;
use crate::error::{Result, ZipError};
use std::fmt;
use std::io;

/// Length of the per-entry encryption header
pub const ENCRYPTION_HEADER_LEN: usize = 12;

const INITIAL_KEYS: [u32; 3] = [0x12345678, 0x23456789, 0x34567890];

/// Source of salt bytes for new encryption headers
pub trait RandomSource: Send + Sync {
    /// Fill `buf` entirely with random bytes
    fn fill(&self, buf: &mut [u8]) -> Result<()>;
}

/// Operating system CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, buf: &mut [u8]) -> Result<()> {
        getrandom::getrandom(buf).map_err(|e| ZipError::Io(io::Error::other(e)))
    }
}

/// Deterministic source that repeats a fixed byte pattern (for reproducible tests)
#[derive(Debug, Clone)]
pub struct FixedRandom {
    pattern: Vec<u8>,
}

impl FixedRandom {
    pub fn new(pattern: impl Into<Vec<u8>>) -> Self {
        let mut pattern = pattern.into();
        if pattern.is_empty() {
            pattern.push(0);
        }
        Self { pattern }
    }
}

impl RandomSource for FixedRandom {
    fn fill(&self, buf: &mut [u8]) -> Result<()> {
        for (dst, src) in buf.iter_mut().zip(self.pattern.iter().cycle()) {
            *dst = *src;
        }
        Ok(())
    }
}

/// ZipCrypto key state
#[derive(Clone)]
pub struct ZipCrypto {
    keys: [u32; 3],
}

impl fmt::Debug for ZipCrypto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipCrypto").finish_non_exhaustive()
    }
}

impl ZipCrypto {
    /// Initialize the key schedule from a password
    pub fn new(password: &[u8]) -> Self {
        let mut cipher = ZipCrypto { keys: INITIAL_KEYS };
        for &b in password {
            cipher.update_keys(b);
        }
        cipher
    }

    fn update_keys(&mut self, plain: u8) {
        self.keys[0] = update_byte(self.keys[0], plain);
        self.keys[1] = self.keys[1]
            .wrapping_add(self.keys[0] & 0xff)
            .wrapping_mul(134775813)
            .wrapping_add(1);
        self.keys[2] = update_byte(self.keys[2], (self.keys[1] >> 24) as u8);
    }

    /// Next keystream byte, derived from the third key
    pub fn stream_byte(&self) -> u8 {
        let temp = (self.keys[2] | 2) as u16;
        (temp.wrapping_mul(temp ^ 1) >> 8) as u8
    }

    /// Decrypt one byte and advance the keys with the plaintext
    pub fn decrypt_byte(&mut self, cipher: u8) -> u8 {
        let plain = cipher ^ self.stream_byte();
        self.update_keys(plain);
        plain
    }

    /// Encrypt one byte and advance the keys with the plaintext
    pub fn encrypt_byte(&mut self, plain: u8) -> u8 {
        let cipher = plain ^ self.stream_byte();
        self.update_keys(plain);
        cipher
    }
}

/// Verification byte for an entry: high byte of the CRC, or the high byte of
/// the DOS time when the sizes and CRC live in a trailing data descriptor.
pub fn check_byte(crc: u32, dos_time: u16, has_data_descriptor: bool) -> u8 {
    if has_data_descriptor {
        (dos_time >> 8) as u8
    } else {
        (crc >> 24) as u8
    }
}

/// Decrypt a payload (encryption header included).
///
/// Returns `None` when the header does not verify against `check`. The bulk
/// of the payload is not touched in that case.
pub fn decrypt(password: &[u8], data: &[u8], check: u8) -> Option<Vec<u8>> {
    if data.len() < ENCRYPTION_HEADER_LEN {
        return None;
    }

    let mut cipher = ZipCrypto::new(password);
    let (header, body) = data.split_at(ENCRYPTION_HEADER_LEN);

    let mut last = 0u8;
    for &b in header {
        last = cipher.decrypt_byte(b);
    }
    if last != check {
        return None;
    }

    Some(body.iter().map(|&b| cipher.decrypt_byte(b)).collect())
}

/// Encrypt a payload, prefixing a fresh 12-byte encryption header whose last
/// byte is `check`.
pub fn encrypt(password: &[u8], data: &[u8], check: u8, random: &dyn RandomSource) -> Result<Vec<u8>> {
    let mut header = [0u8; ENCRYPTION_HEADER_LEN];
    random.fill(&mut header)?;
    header[ENCRYPTION_HEADER_LEN - 1] = check;

    let mut cipher = ZipCrypto::new(password);
    let mut out = Vec::with_capacity(ENCRYPTION_HEADER_LEN + data.len());
    out.extend(header.iter().map(|&b| cipher.encrypt_byte(b)));
    out.extend(data.iter().map(|&b| cipher.encrypt_byte(b)));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_keys() {
        let c = ZipCrypto::new(b"");
        assert_eq!(c.keys, [305419896, 591751049, 878082192]);
    }

    #[test]
    fn different_passwords_different_keys() {
        assert_ne!(ZipCrypto::new(b"abc").keys, ZipCrypto::new(b"xyz").keys);
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let rng = FixedRandom::new(vec![1, 2, 3, 4, 5]);
        let data = b"hello modpack";
        let check = check_byte(crate::crc::crc32(data), 0, false);

        let sealed = encrypt(b"p@ss", data, check, &rng).unwrap();
        assert_eq!(sealed.len(), data.len() + ENCRYPTION_HEADER_LEN);
        assert_ne!(&sealed[ENCRYPTION_HEADER_LEN..], data);

        let opened = decrypt(b"p@ss", &sealed, check).unwrap();
        assert_eq!(opened, data);
    }

    #[test]
    fn fixed_salt_is_reproducible() {
        let rng = FixedRandom::new(vec![9; 12]);
        let a = encrypt(b"pw", b"same", 0x42, &rng).unwrap();
        let b = encrypt(b"pw", b"same", 0x42, &rng).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn wrong_password_fails_verification() {
        let rng = FixedRandom::new(vec![7; 12]);
        // Both passwords are tried against many check bytes, so a 1/256 collision
        // on one byte value cannot make the test flaky.
        let mut rejected = 0;
        for check in 0..=255u8 {
            let sealed = encrypt(b"p@ss", b"payload", check, &rng).unwrap();
            if decrypt(b"wrong", &sealed, check).is_none() {
                rejected += 1;
            }
            assert!(decrypt(b"p@ss", &sealed, check).is_some());
        }
        assert!(rejected > 200);
    }

    #[test]
    fn check_byte_source() {
        assert_eq!(check_byte(0xAB000000, 0x1234, false), 0xAB);
        assert_eq!(check_byte(0xAB000000, 0x1234, true), 0x12);
    }

    #[test]
    fn truncated_payload_is_rejected() {
        assert!(decrypt(b"pw", &[0u8; 5], 0).is_none());
    }
}
