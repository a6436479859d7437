//! Compression codec boundary
//!
//! Raw DEFLATE (no zlib or gzip framing) through `flate2`, plus the Stored
//! pass-through. Every decode is bounded by the size recorded in the entry
//! header so a corrupt stream cannot grow the output without limit.

use crate::error::{Result, ZipError};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Worst-case DEFLATE expansion ratio, used to cap preallocation
const MAX_INFLATE_RATIO: usize = 1032;

/// Compression method of a ZIP entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionMethod {
    /// No compression (stored)
    Stored,
    /// DEFLATE compression
    Deflated,
}

impl CompressionMethod {
    /// Method id as written in the headers
    pub fn to_zip_method(self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflated => 8,
        }
    }

    /// Parse a header method id. Anything else is unsupported.
    pub fn from_zip_method(method: u16) -> Option<Self> {
        match method {
            0 => Some(CompressionMethod::Stored),
            8 => Some(CompressionMethod::Deflated),
            _ => None,
        }
    }

    /// Minimum "version needed to extract" for this method
    pub fn version_needed(self) -> u16 {
        match self {
            CompressionMethod::Stored => 10,
            CompressionMethod::Deflated => 20,
        }
    }
}

/// Compress with raw DEFLATE at the given level (0-9)
pub fn deflate(raw: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(
        Vec::with_capacity(raw.len() / 2 + 64),
        Compression::new(level.min(9)),
    );
    encoder.write_all(raw)?;
    Ok(encoder.finish()?)
}

/// Inflate a raw DEFLATE stream that must produce exactly `expected_size` bytes
pub fn inflate(compressed: &[u8], expected_size: u64) -> Result<Vec<u8>> {
    let capacity = (expected_size as usize).min(
        compressed
            .len()
            .saturating_mul(MAX_INFLATE_RATIO)
            .max(64),
    );
    let mut out = Vec::with_capacity(capacity);

    // One byte of slack so overlong streams are detected rather than truncated
    let mut decoder = DeflateDecoder::new(compressed).take(expected_size.saturating_add(1));
    decoder
        .read_to_end(&mut out)
        .map_err(|e| ZipError::Decode(format!("corrupt deflate stream: {}", e)))?;

    if out.len() as u64 != expected_size {
        return Err(ZipError::Decode(format!(
            "inflated {} bytes, expected {}",
            out.len(),
            expected_size
        )));
    }

    Ok(out)
}

/// Compress `raw` with `method`
pub fn compress(method: CompressionMethod, raw: &[u8], level: u32) -> Result<Vec<u8>> {
    match method {
        CompressionMethod::Stored => Ok(raw.to_vec()),
        CompressionMethod::Deflated => deflate(raw, level),
    }
}

/// Decompress `data` with `method`, expecting `expected_size` output bytes
pub fn decompress(method: CompressionMethod, data: &[u8], expected_size: u64) -> Result<Vec<u8>> {
    match method {
        CompressionMethod::Stored => {
            if data.len() as u64 != expected_size {
                return Err(ZipError::Decode(format!(
                    "stored payload is {} bytes, expected {}",
                    data.len(),
                    expected_size
                )));
            }
            Ok(data.to_vec())
        }
        CompressionMethod::Deflated => inflate(data, expected_size),
    }
}
