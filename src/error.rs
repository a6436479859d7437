//! Error types for modzip

use std::io;
use std::path::PathBuf;

/// Result type for modzip operations
pub type Result<T> = std::result::Result<T, ZipError>;

/// Error types that can occur during ZIP operations
#[derive(Debug)]
pub enum ZipError {
    /// I/O error
    Io(io::Error),
    /// No End-of-Central-Directory record could be found
    InvalidFormat(String),
    /// Local file header signature mismatch
    InvalidLocalHeader {
        name: String,
        offset: u64,
        signature: u32,
    },
    /// Central directory header signature mismatch
    InvalidCentralHeader { offset: u64, signature: u32 },
    /// End record (32-bit or Zip64) is malformed or points outside the buffer
    InvalidEndRecord(String),
    /// Data descriptor missing, unrecognized or contradicting the central header
    InvalidDataDescriptor { name: String, reason: String },
    /// Decompressed data does not match the recorded CRC-32
    BadCrc {
        name: String,
        expected: u32,
        actual: u32,
    },
    /// Password verification byte mismatch
    WrongPassword(String),
    /// Entry is encrypted but no password was supplied
    InvalidPasswordParameter(String),
    /// Compression method is neither Stored nor Deflated
    UnknownMethod { name: String, method: u16 },
    /// Strong (non-ZipCrypto) encryption
    UnsupportedEncryption(String),
    /// Codec could not produce the expected output
    Decode(String),
    /// Entry not found in ZIP archive
    EntryNotFound(String),
    /// Archive path does not exist
    FileNotFound(PathBuf),
    /// Extraction target exists and overwrite was not requested
    CannotOverwrite(PathBuf),
    /// Entry name resolves outside the extraction root
    PathEscapesTarget { name: String, target: PathBuf },
    /// Comment longer than 65535 bytes
    CommentTooLong(usize),
    /// Entry name longer than 65535 bytes
    NameTooLong(usize),
    /// Extra field longer than 65535 bytes
    ExtraFieldTooLong(usize),
    /// Declared entry count cannot fit in the central directory bytes available
    DiskEntryTooLarge { entries: u64, available: u64 },
}

impl ZipError {
    /// Per-entry content errors. Batch operations record these and move on;
    /// anything else (bad signatures, malformed descriptors) is a format error.
    pub fn is_content_error(&self) -> bool {
        matches!(
            self,
            ZipError::BadCrc { .. }
                | ZipError::WrongPassword(_)
                | ZipError::InvalidPasswordParameter(_)
                | ZipError::UnknownMethod { .. }
                | ZipError::UnsupportedEncryption(_)
        )
    }
}

impl std::fmt::Display for ZipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZipError::Io(e) => write!(f, "I/O error: {}", e),
            ZipError::InvalidFormat(msg) => write!(f, "Invalid ZIP format: {}", msg),
            ZipError::InvalidLocalHeader {
                name,
                offset,
                signature,
            } => write!(
                f,
                "Invalid local header for {} at offset {}: signature 0x{:08x}",
                name, offset, signature
            ),
            ZipError::InvalidCentralHeader { offset, signature } => write!(
                f,
                "Invalid central directory header at offset {}: signature 0x{:08x}",
                offset, signature
            ),
            ZipError::InvalidEndRecord(msg) => write!(f, "Invalid end record: {}", msg),
            ZipError::InvalidDataDescriptor { name, reason } => {
                write!(f, "Invalid data descriptor for {}: {}", name, reason)
            }
            ZipError::BadCrc {
                name,
                expected,
                actual,
            } => write!(
                f,
                "CRC mismatch for {}: expected 0x{:08x}, got 0x{:08x}",
                name, expected, actual
            ),
            ZipError::WrongPassword(name) => write!(f, "Wrong password for {}", name),
            ZipError::InvalidPasswordParameter(name) => {
                write!(f, "Entry {} is encrypted and no password was given", name)
            }
            ZipError::UnknownMethod { name, method } => {
                write!(f, "Unsupported compression method {} for {}", method, name)
            }
            ZipError::UnsupportedEncryption(name) => {
                write!(f, "Strong encryption is not supported ({})", name)
            }
            ZipError::Decode(msg) => write!(f, "Decode error: {}", msg),
            ZipError::EntryNotFound(name) => write!(f, "Entry not found: {}", name),
            ZipError::FileNotFound(path) => write!(f, "File not found: {}", path.display()),
            ZipError::CannotOverwrite(path) => {
                write!(f, "Refusing to overwrite existing file: {}", path.display())
            }
            ZipError::PathEscapesTarget { name, target } => write!(
                f,
                "Entry {} resolves outside of {}",
                name,
                target.display()
            ),
            ZipError::CommentTooLong(len) => {
                write!(f, "Comment is {} bytes, the limit is 65535", len)
            }
            ZipError::NameTooLong(len) => {
                write!(f, "Entry name is {} bytes, the limit is 65535", len)
            }
            ZipError::ExtraFieldTooLong(len) => {
                write!(f, "Extra field is {} bytes, the limit is 65535", len)
            }
            ZipError::DiskEntryTooLarge { entries, available } => write!(
                f,
                "Central directory claims {} entries but only {} bytes are available",
                entries, available
            ),
        }
    }
}

impl std::error::Error for ZipError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ZipError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ZipError {
    fn from(err: io::Error) -> Self {
        ZipError::Io(err)
    }
}
