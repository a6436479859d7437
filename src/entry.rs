//! Archive members
//!
//! A [`ZipEntry`] owns its header fields, raw name/extra/comment bytes and a
//! [`Payload`]: either compressed bytes still living in the source archive,
//! or uncompressed bytes waiting to be compressed on the next write.

use crate::cipher::{self, RandomSource};
use crate::codec::{self, CompressionMethod};
use crate::crc::crc32;
use crate::dostime::DosDateTime;
use crate::error::{Result, ZipError};
use crate::header::{
    self, CentralRecord, DataDescriptor, EntryHeader, LocalHeader, FLAG_DATA_DESCRIPTOR,
    FLAG_ENCRYPTED, FLAG_UTF8, MAX_FIELD_LEN, ZIP64_EXTRA_ID, ZIP64_VERSION_NEEDED,
};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Default permissions for new files (regular file, rw-r--r--)
pub const DEFAULT_FILE_MODE: u32 = 0o100644;
/// Default permissions for new directories (directory, rwxr-xr-x)
pub const DEFAULT_DIR_MODE: u32 = 0o040755;
/// MS-DOS directory attribute bit
const DOS_DIRECTORY_ATTR: u32 = 0x10;

/// Where an entry's data currently lives
#[derive(Clone)]
pub enum Payload {
    /// Compressed (possibly encrypted) bytes inside a parsed archive buffer,
    /// behind the local header at `header_offset`
    Source {
        buffer: Arc<[u8]>,
        header_offset: u64,
    },
    /// Uncompressed bytes to be compressed on the next write
    Pending(Vec<u8>),
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Source { header_offset, .. } => f
                .debug_struct("Source")
                .field("header_offset", header_offset)
                .finish_non_exhaustive(),
            Payload::Pending(data) => f.debug_tuple("Pending").field(&data.len()).finish(),
        }
    }
}

/// Settings the write path needs from its archive
pub struct WriteContext<'a> {
    pub compression_level: u32,
    pub random: &'a dyn RandomSource,
}

/// One member of a ZIP archive
#[derive(Clone)]
pub struct ZipEntry {
    name: String,
    raw_name: Vec<u8>,
    header: EntryHeader,
    extra: Vec<u8>,
    comment: Vec<u8>,
    payload: Payload,
    password: Option<Vec<u8>>,
}

impl fmt::Debug for ZipEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipEntry")
            .field("name", &self.name)
            .field("header", &self.header)
            .field("extra_len", &self.extra.len())
            .field("comment_len", &self.comment.len())
            .field("payload", &self.payload)
            .field("encrypt_on_write", &self.password.is_some())
            .finish()
    }
}

fn decode_name(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(s) => s.to_string(),
        Err(_) => String::from_utf8_lossy(raw).into_owned(),
    }
}

impl ZipEntry {
    /// New empty entry stamped with the current time
    pub fn new(name: &str) -> Result<Self> {
        if name.len() > MAX_FIELD_LEN {
            return Err(ZipError::NameTooLong(name.len()));
        }
        let is_dir = name.ends_with('/');
        let attr = if is_dir {
            (DEFAULT_DIR_MODE << 16) | DOS_DIRECTORY_ATTR
        } else {
            DEFAULT_FILE_MODE << 16
        };
        let header = EntryHeader::default()
            .with_time(DosDateTime::now())
            .with_external_attr(attr)
            .with_flag(FLAG_UTF8, !name.is_ascii());

        Ok(Self {
            name: name.to_string(),
            raw_name: name.as_bytes().to_vec(),
            header,
            extra: Vec::new(),
            comment: Vec::new(),
            payload: Payload::Pending(Vec::new()),
            password: None,
        })
    }

    /// Entry backed by a parsed central directory record
    pub(crate) fn from_central(record: CentralRecord, buffer: Arc<[u8]>) -> Self {
        let header_offset = record.header.offset();
        Self {
            name: decode_name(&record.name),
            raw_name: record.name,
            header: record.header,
            extra: record.extra,
            comment: record.comment,
            payload: Payload::Source {
                buffer,
                header_offset,
            },
            password: None,
        }
    }

    /// Synthetic zero-length directory entry
    pub(crate) fn synthetic_directory(name: &str) -> Self {
        let header = EntryHeader::default()
            .with_external_attr((DEFAULT_DIR_MODE << 16) | DOS_DIRECTORY_ATTR)
            .with_flag(FLAG_UTF8, !name.is_ascii());
        Self {
            name: name.to_string(),
            raw_name: name.as_bytes().to_vec(),
            header,
            extra: Vec::new(),
            comment: Vec::new(),
            payload: Payload::Pending(Vec::new()),
            password: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name bytes exactly as stored in the archive
    pub fn raw_name(&self) -> &[u8] {
        &self.raw_name
    }

    pub fn header(&self) -> &EntryHeader {
        &self.header
    }

    pub fn extra(&self) -> &[u8] {
        &self.extra
    }

    pub fn comment(&self) -> &[u8] {
        &self.comment
    }

    pub fn comment_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.comment)
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn is_directory(&self) -> bool {
        self.raw_name.last() == Some(&b'/')
    }

    /// True once the entry holds data that has not been written out yet
    pub fn is_changed(&self) -> bool {
        matches!(self.payload, Payload::Pending(_))
    }

    pub fn size(&self) -> u64 {
        self.header.size()
    }

    pub fn compressed_size(&self) -> u64 {
        self.header.compressed_size()
    }

    pub fn method(&self) -> u16 {
        self.header.method()
    }

    pub fn time(&self) -> DosDateTime {
        self.header.time()
    }

    pub fn crc(&self) -> u32 {
        self.header.crc()
    }

    pub fn is_encrypted(&self) -> bool {
        self.header.is_encrypted() || self.password.is_some()
    }

    /// Last path segment, without a trailing slash
    pub fn base_name(&self) -> &str {
        self.name
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }

    pub fn set_comment(&mut self, comment: &[u8]) -> Result<()> {
        if comment.len() > MAX_FIELD_LEN {
            return Err(ZipError::CommentTooLong(comment.len()));
        }
        self.comment = comment.to_vec();
        Ok(())
    }

    pub fn set_extra(&mut self, extra: Vec<u8>) -> Result<()> {
        if extra.len() > MAX_FIELD_LEN {
            return Err(ZipError::ExtraFieldTooLong(extra.len()));
        }
        self.extra = extra;
        Ok(())
    }

    pub fn set_time(&mut self, time: DosDateTime) {
        self.header = self.header.with_time(time);
    }

    /// Store Unix permission bits (file type bits included) in the external attributes
    pub fn set_unix_mode(&mut self, mode: u32) {
        let dos = self.header.external_attr() & 0xffff;
        self.header = self.header.with_external_attr((mode << 16) | dos);
    }

    /// Choose the method used for the next write of a pending payload.
    /// Empty payloads and directories are still written Stored; entries
    /// that still point into their source archive keep their method.
    pub fn set_method(&mut self, method: CompressionMethod) {
        if self.is_changed() {
            self.header = self.header.with_method(method);
        }
    }

    /// Replace the payload with uncompressed `data`.
    ///
    /// CRC and size are recomputed. Method becomes Stored for empty data and
    /// directories, Deflated otherwise. Directories never carry data.
    pub fn set_data(&mut self, data: Vec<u8>) {
        let data = if self.is_directory() { Vec::new() } else { data };
        let method = if data.is_empty() {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };

        self.header = self
            .header
            .with_method(method)
            .with_crc(crc32(&data))
            .with_sizes(0, data.len() as u64)
            .with_flag(FLAG_ENCRYPTED, false)
            .with_flag(FLAG_DATA_DESCRIPTOR, false);
        self.payload = Payload::Pending(data);
    }

    /// Encrypt the pending payload with ZipCrypto on the next write
    pub(crate) fn set_password(&mut self, password: Option<&[u8]>) {
        self.password = password.map(|p| p.to_vec());
    }

    /// Compressed payload as it will be written.
    ///
    /// Unchanged entries return their source bytes verbatim. Pending entries
    /// are compressed (and encrypted, if a password was set) and the header's
    /// compressed size and flags are updated to match.
    pub fn compressed_data(&mut self, ctx: &WriteContext<'_>) -> Result<Vec<u8>> {
        let data = match &self.payload {
            Payload::Source {
                buffer,
                header_offset,
            } => {
                let (_, start, end) = self.source_range(buffer, *header_offset)?;
                return Ok(buffer[start..end].to_vec());
            }
            Payload::Pending(data) => data,
        };

        let compressed = if data.is_empty() || self.is_directory() {
            self.header = self.header.with_method(CompressionMethod::Stored);
            Vec::new()
        } else {
            let method = self.header.compression_method().ok_or(ZipError::UnknownMethod {
                name: self.name.clone(),
                method: self.header.method(),
            })?;
            codec::compress(method, data, ctx.compression_level)?
        };

        let out = match &self.password {
            Some(password) if !self.is_directory() => {
                let check = cipher::check_byte(self.header.crc(), self.header.time().time, false);
                let sealed = cipher::encrypt(password, &compressed, check, ctx.random)?;
                self.header = self.header.with_flag(FLAG_ENCRYPTED, true);
                sealed
            }
            _ => compressed,
        };

        trace!(
            "compressed {}: {} -> {} bytes (method {})",
            self.name,
            self.header.size(),
            out.len(),
            self.header.method()
        );
        self.header = self.header.with_compressed_size(out.len() as u64);
        Ok(out)
    }

    /// Start and end of the compressed bytes, found through the local header
    fn source_range(
        &self,
        buffer: &[u8],
        header_offset: u64,
    ) -> Result<(LocalHeader, usize, usize)> {
        let local = LocalHeader::parse(buffer, header_offset, &self.name)?;
        let start = header_offset.saturating_add(local.header_len());
        let end = start.saturating_add(self.header.compressed_size());
        if end > buffer.len() as u64 {
            return Err(ZipError::InvalidFormat(format!(
                "payload of {} ({} bytes at {}) runs past the end of the archive",
                self.name,
                self.header.compressed_size(),
                start
            )));
        }
        Ok((local, start as usize, end as usize))
    }

    /// Uncompressed payload, decrypted with `password` if the entry is encrypted.
    ///
    /// The method is validated before anything is decoded, and the password
    /// before anything is inflated. The result is always CRC-checked.
    pub fn decompressed_data(&self, password: Option<&[u8]>) -> Result<Vec<u8>> {
        if self.is_directory() {
            return Ok(Vec::new());
        }

        let (buffer, header_offset) = match &self.payload {
            Payload::Pending(data) => return Ok(data.clone()),
            Payload::Source {
                buffer,
                header_offset,
            } => (buffer, *header_offset),
        };

        let method = self
            .header
            .compression_method()
            .ok_or_else(|| ZipError::UnknownMethod {
                name: self.name.clone(),
                method: self.header.method(),
            })?;
        if self.header.has_strong_encryption() {
            return Err(ZipError::UnsupportedEncryption(self.name.clone()));
        }

        let (local, start, end) = self.source_range(buffer, header_offset)?;
        let raw = &buffer[start..end];

        let compressed: Cow<'_, [u8]> = if self.header.is_encrypted() {
            let password = password
                .ok_or_else(|| ZipError::InvalidPasswordParameter(self.name.clone()))?;
            let check = cipher::check_byte(
                self.header.crc(),
                self.header.time().time,
                self.header.has_data_descriptor(),
            );
            let plain = cipher::decrypt(password, raw, check)
                .ok_or_else(|| ZipError::WrongPassword(self.name.clone()))?;
            Cow::Owned(plain)
        } else {
            Cow::Borrowed(raw)
        };

        let expected_crc = if self.header.has_data_descriptor() {
            let descriptor = DataDescriptor::locate(
                buffer,
                end,
                self.header.crc(),
                self.header.compressed_size(),
                self.header.size(),
            )
            .map_err(|reason| ZipError::InvalidDataDescriptor {
                name: self.name.clone(),
                reason,
            })?;
            trace!("{}: data descriptor layout {:?}", self.name, descriptor.layout);
            descriptor.crc
        } else {
            local.crc
        };

        let data = match codec::decompress(method, &compressed, self.header.size()) {
            Ok(data) => data,
            Err(ZipError::Decode(reason)) => {
                debug!("{} failed to decode: {}", self.name, reason);
                return Err(ZipError::BadCrc {
                    name: self.name.clone(),
                    expected: expected_crc,
                    actual: 0,
                });
            }
            Err(e) => return Err(e),
        };

        let actual = crc32(&data);
        if actual != expected_crc {
            return Err(ZipError::BadCrc {
                name: self.name.clone(),
                expected: expected_crc,
                actual,
            });
        }
        Ok(data)
    }

    /// Header as written: version-needed raised to 45 when Zip64 is required
    fn write_header(&self) -> EntryHeader {
        if self.header.zip64_need().any() && self.header.version_needed() < ZIP64_VERSION_NEEDED {
            self.header.with_version_needed(ZIP64_VERSION_NEEDED)
        } else {
            self.header
        }
    }

    /// Local header: fixed part, name, extra (Zip64 record regenerated)
    pub fn local_header_bytes(&self) -> Result<Vec<u8>> {
        let header = self.write_header();
        let mut extra = header::strip_extra(&self.extra, ZIP64_EXTRA_ID);
        extra.extend(header::local_zip64_extra(&header));
        header.local_bytes(&self.raw_name, &extra)
    }

    /// Central header: fixed part, name, extra (Zip64 record regenerated), comment
    pub fn central_header_bytes(&self) -> Result<Vec<u8>> {
        let header = self.write_header();
        let mut extra = header::strip_extra(&self.extra, ZIP64_EXTRA_ID);
        extra.extend(header::central_zip64_extra(&header));
        header.central_bytes(&self.raw_name, &extra, &self.comment)
    }

    /// Trailing data descriptor, for entries flagged to carry one
    pub fn data_descriptor_bytes(&self) -> Option<Vec<u8>> {
        if !self.header.has_data_descriptor() {
            return None;
        }
        let descriptor = DataDescriptor {
            crc: self.header.crc(),
            compressed_size: self.header.compressed_size(),
            size: self.header.size(),
            layout: header::DescriptorLayout::Signed32,
        };
        Some(descriptor.to_bytes())
    }

    /// Record where this entry's local header lands in a new archive
    pub(crate) fn set_offset(&mut self, offset: u64) {
        self.header = self.header.with_offset(offset);
    }
}
