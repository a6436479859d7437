//! Binary layout of ZIP records
//!
//! Local file header, central directory header, end of central directory
//! (32-bit and Zip64 with its locator), extra-field sub-records and data
//! descriptors. All integers are little-endian. Offsets follow the PKWARE
//! APPNOTE.

use crate::dostime::DosDateTime;
use crate::error::{Result, ZipError};
use crate::codec::CompressionMethod;

/// ZIP local file header signature
pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x04034b50;

/// ZIP central directory signature
pub const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x02014b50;

/// ZIP end of central directory signature
pub const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x06054b50;

/// ZIP64 end of central directory record signature
pub const ZIP64_END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x06064b50;

/// ZIP64 end of central directory locator signature
pub const ZIP64_LOCATOR_SIGNATURE: u32 = 0x07064b50;

/// Data descriptor signature (optional in the wild)
pub const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x08074b50;

/// Fixed size of a local file header
pub const LOCAL_HEADER_LEN: usize = 30;
/// Fixed size of a central directory header
pub const CENTRAL_HEADER_LEN: usize = 46;
/// Fixed size of the end of central directory record
pub const END_RECORD_LEN: usize = 22;
/// Fixed size of the Zip64 end record
pub const ZIP64_END_RECORD_LEN: usize = 56;
/// Fixed size of the Zip64 locator
pub const ZIP64_LOCATOR_LEN: usize = 20;

/// Largest comment, name or extra field a 16-bit length can describe
pub const MAX_FIELD_LEN: usize = 0xFFFF;

pub const SENTINEL_32: u32 = 0xFFFFFFFF;
pub const SENTINEL_16: u16 = 0xFFFF;

/// Extra field id of the Zip64 extended information record
pub const ZIP64_EXTRA_ID: u16 = 0x0001;

/// General purpose flag: payload is encrypted
pub const FLAG_ENCRYPTED: u16 = 0x0001;
/// General purpose flag: CRC and sizes follow the payload in a data descriptor
pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;
/// General purpose flag: strong encryption
pub const FLAG_STRONG_ENCRYPTION: u16 = 0x0040;
/// General purpose flag: name and comment are UTF-8
pub const FLAG_UTF8: u16 = 0x0800;

/// Version needed when Zip64 records are present
pub const ZIP64_VERSION_NEEDED: u16 = 45;

/// Version made by: Unix host, PKZIP 2.0
pub const VERSION_MADE_BY_UNIX: u16 = (3 << 8) | 20;

#[inline]
pub(crate) fn read_u16(buf: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([buf[pos], buf[pos + 1]])
}

#[inline]
pub(crate) fn read_u32(buf: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]])
}

#[inline]
pub(crate) fn read_u64(buf: &[u8], pos: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[pos..pos + 8]);
    u64::from_le_bytes(bytes)
}

/// Signature at `pos`, if four bytes are available
pub(crate) fn signature_at(buf: &[u8], pos: usize) -> Option<u32> {
    if pos.checked_add(4)? <= buf.len() {
        Some(read_u32(buf, pos))
    } else {
        None
    }
}

fn checked_len(len: usize, too_long: fn(usize) -> ZipError) -> Result<u16> {
    u16::try_from(len).map_err(|_| too_long(len))
}

/// Header fields shared by the local and central records of one entry.
///
/// Sizes and offset are held as 64-bit values; the 32-bit sentinels and the
/// Zip64 extra record only exist on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    version_made_by: u16,
    version_needed: u16,
    flags: u16,
    method: u16,
    time: DosDateTime,
    crc: u32,
    compressed_size: u64,
    size: u64,
    disk_number_start: u32,
    internal_attr: u16,
    external_attr: u32,
    offset: u64,
}

impl Default for EntryHeader {
    fn default() -> Self {
        Self {
            version_made_by: VERSION_MADE_BY_UNIX,
            version_needed: CompressionMethod::Stored.version_needed(),
            flags: 0,
            method: CompressionMethod::Stored.to_zip_method(),
            time: DosDateTime::default(),
            crc: 0,
            compressed_size: 0,
            size: 0,
            disk_number_start: 0,
            internal_attr: 0,
            external_attr: 0,
            offset: 0,
        }
    }
}

impl EntryHeader {
    pub fn version_made_by(&self) -> u16 {
        self.version_made_by
    }

    pub fn version_needed(&self) -> u16 {
        self.version_needed
    }

    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// Raw method id, which may be one this crate cannot decode
    pub fn method(&self) -> u16 {
        self.method
    }

    pub fn compression_method(&self) -> Option<CompressionMethod> {
        CompressionMethod::from_zip_method(self.method)
    }

    pub fn time(&self) -> DosDateTime {
        self.time
    }

    pub fn crc(&self) -> u32 {
        self.crc
    }

    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn disk_number_start(&self) -> u32 {
        self.disk_number_start
    }

    pub fn internal_attr(&self) -> u16 {
        self.internal_attr
    }

    pub fn external_attr(&self) -> u32 {
        self.external_attr
    }

    /// Offset of the local header from the start of the archive
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }

    pub fn has_strong_encryption(&self) -> bool {
        self.flags & FLAG_STRONG_ENCRYPTION != 0
    }

    pub fn is_utf8(&self) -> bool {
        self.flags & FLAG_UTF8 != 0
    }

    /// Unix permission bits carried in the high half of the external attributes
    pub fn unix_mode(&self) -> Option<u32> {
        let mode = self.external_attr >> 16;
        if mode == 0 {
            None
        } else {
            Some(mode)
        }
    }

    /// Switch method. Version-needed follows the method: 20 for Deflated,
    /// 10 for Stored (never lowered below a Zip64 requirement).
    pub fn with_method(mut self, method: CompressionMethod) -> Self {
        self.method = method.to_zip_method();
        self.version_needed = if self.version_needed >= ZIP64_VERSION_NEEDED {
            self.version_needed
        } else {
            method.version_needed()
        };
        self
    }

    pub fn with_flag(mut self, flag: u16, on: bool) -> Self {
        if on {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
        self
    }

    pub fn with_time(mut self, time: DosDateTime) -> Self {
        self.time = time;
        self
    }

    pub fn with_crc(mut self, crc: u32) -> Self {
        self.crc = crc;
        self
    }

    pub fn with_sizes(mut self, compressed_size: u64, size: u64) -> Self {
        self.compressed_size = compressed_size;
        self.size = size;
        self
    }

    pub fn with_compressed_size(mut self, compressed_size: u64) -> Self {
        self.compressed_size = compressed_size;
        self
    }

    pub fn with_external_attr(mut self, attr: u32) -> Self {
        self.external_attr = attr;
        self
    }

    pub fn with_internal_attr(mut self, attr: u16) -> Self {
        self.internal_attr = attr;
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_version_made_by(mut self, version: u16) -> Self {
        self.version_made_by = version;
        self
    }

    pub fn with_version_needed(mut self, version: u16) -> Self {
        self.version_needed = version;
        self
    }

    /// Which 64-bit values overflow their 32-bit header fields
    pub(crate) fn zip64_need(&self) -> Zip64Need {
        Zip64Need {
            size: self.size >= SENTINEL_32 as u64,
            compressed_size: self.compressed_size >= SENTINEL_32 as u64,
            offset: self.offset >= SENTINEL_32 as u64,
        }
    }

    /// Serialize the fixed local header, then name, then extra.
    ///
    /// `extra` must already carry any Zip64 record the sizes require.
    pub fn local_bytes(&self, name: &[u8], extra: &[u8]) -> Result<Vec<u8>> {
        let name_len = checked_len(name.len(), ZipError::NameTooLong)?;
        let extra_len = checked_len(extra.len(), ZipError::ExtraFieldTooLong)?;
        let need = self.zip64_need();
        let zip64_sizes = need.size || need.compressed_size;

        let mut out = Vec::with_capacity(LOCAL_HEADER_LEN + name.len() + extra.len());
        out.extend_from_slice(&LOCAL_FILE_HEADER_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&self.version_needed.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.method.to_le_bytes());
        out.extend_from_slice(&self.time.time.to_le_bytes());
        out.extend_from_slice(&self.time.date.to_le_bytes());
        out.extend_from_slice(&self.crc.to_le_bytes());
        if zip64_sizes {
            // Local Zip64 records always carry both sizes
            out.extend_from_slice(&SENTINEL_32.to_le_bytes());
            out.extend_from_slice(&SENTINEL_32.to_le_bytes());
        } else {
            out.extend_from_slice(&(self.compressed_size as u32).to_le_bytes());
            out.extend_from_slice(&(self.size as u32).to_le_bytes());
        }
        out.extend_from_slice(&name_len.to_le_bytes());
        out.extend_from_slice(&extra_len.to_le_bytes());
        out.extend_from_slice(name);
        out.extend_from_slice(extra);
        Ok(out)
    }

    /// Serialize the fixed central header, then name, then extra, then comment.
    pub fn central_bytes(&self, name: &[u8], extra: &[u8], comment: &[u8]) -> Result<Vec<u8>> {
        let name_len = checked_len(name.len(), ZipError::NameTooLong)?;
        let extra_len = checked_len(extra.len(), ZipError::ExtraFieldTooLong)?;
        let comment_len =
            u16::try_from(comment.len()).map_err(|_| ZipError::CommentTooLong(comment.len()))?;
        let need = self.zip64_need();

        let mut out =
            Vec::with_capacity(CENTRAL_HEADER_LEN + name.len() + extra.len() + comment.len());
        out.extend_from_slice(&CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&self.version_made_by.to_le_bytes());
        out.extend_from_slice(&self.version_needed.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.method.to_le_bytes());
        out.extend_from_slice(&self.time.time.to_le_bytes());
        out.extend_from_slice(&self.time.date.to_le_bytes());
        out.extend_from_slice(&self.crc.to_le_bytes());
        out.extend_from_slice(&sentinel_or(need.compressed_size, self.compressed_size).to_le_bytes());
        out.extend_from_slice(&sentinel_or(need.size, self.size).to_le_bytes());
        out.extend_from_slice(&name_len.to_le_bytes());
        out.extend_from_slice(&extra_len.to_le_bytes());
        out.extend_from_slice(&comment_len.to_le_bytes());
        out.extend_from_slice(&(self.disk_number_start.min(SENTINEL_16 as u32 - 1) as u16).to_le_bytes());
        out.extend_from_slice(&self.internal_attr.to_le_bytes());
        out.extend_from_slice(&self.external_attr.to_le_bytes());
        out.extend_from_slice(&sentinel_or(need.offset, self.offset).to_le_bytes());
        out.extend_from_slice(name);
        out.extend_from_slice(extra);
        out.extend_from_slice(comment);
        Ok(out)
    }
}

fn sentinel_or(overflow: bool, value: u64) -> u32 {
    if overflow {
        SENTINEL_32
    } else {
        value as u32
    }
}

/// Which header fields need a Zip64 extension on write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Zip64Need {
    pub size: bool,
    pub compressed_size: bool,
    pub offset: bool,
}

impl Zip64Need {
    pub fn any(&self) -> bool {
        self.size || self.compressed_size || self.offset
    }
}

/// Iterator over `(id, data)` extra-field sub-records.
///
/// Stops at the first truncated record.
pub struct ExtraFields<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ExtraFields<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl<'a> Iterator for ExtraFields<'a> {
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos + 4 > self.data.len() {
            return None;
        }
        let id = read_u16(self.data, self.pos);
        let len = read_u16(self.data, self.pos + 2) as usize;
        let start = self.pos + 4;
        if start + len > self.data.len() {
            self.pos = self.data.len();
            return None;
        }
        self.pos = start + len;
        Some((id, &self.data[start..start + len]))
    }
}

/// Remove every sub-record with `id`, keeping the rest verbatim
pub fn strip_extra(extra: &[u8], id: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(extra.len());
    for (field_id, data) in ExtraFields::new(extra) {
        if field_id != id {
            out.extend_from_slice(&field_id.to_le_bytes());
            out.extend_from_slice(&(data.len() as u16).to_le_bytes());
            out.extend_from_slice(data);
        }
    }
    out
}

/// Zip64 extra record for the central directory: only overflowing fields,
/// in the fixed order size, compressed size, offset.
pub(crate) fn central_zip64_extra(header: &EntryHeader) -> Vec<u8> {
    let need = header.zip64_need();
    let mut data = Vec::with_capacity(24);
    if need.size {
        data.extend_from_slice(&header.size.to_le_bytes());
    }
    if need.compressed_size {
        data.extend_from_slice(&header.compressed_size.to_le_bytes());
    }
    if need.offset {
        data.extend_from_slice(&header.offset.to_le_bytes());
    }
    zip64_record(&data)
}

/// Zip64 extra record for a local header: both sizes, or nothing
pub(crate) fn local_zip64_extra(header: &EntryHeader) -> Vec<u8> {
    let need = header.zip64_need();
    if !(need.size || need.compressed_size) {
        return Vec::new();
    }
    let mut data = Vec::with_capacity(16);
    data.extend_from_slice(&header.size.to_le_bytes());
    data.extend_from_slice(&header.compressed_size.to_le_bytes());
    zip64_record(&data)
}

fn zip64_record(data: &[u8]) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(4 + data.len());
    out.extend_from_slice(&ZIP64_EXTRA_ID.to_le_bytes());
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(data);
    out
}

/// One parsed central directory record
#[derive(Debug, Clone)]
pub struct CentralRecord {
    pub header: EntryHeader,
    pub name: Vec<u8>,
    pub extra: Vec<u8>,
    pub comment: Vec<u8>,
    /// Total bytes consumed, fixed part plus variable fields
    pub len: usize,
}

impl CentralRecord {
    /// Parse the central header at `pos`, applying any Zip64 overrides
    pub fn parse(buf: &[u8], pos: usize) -> Result<Self> {
        let signature = signature_at(buf, pos).unwrap_or(0);
        if signature != CENTRAL_DIRECTORY_SIGNATURE {
            return Err(ZipError::InvalidCentralHeader {
                offset: pos as u64,
                signature,
            });
        }
        if pos + CENTRAL_HEADER_LEN > buf.len() {
            return Err(ZipError::InvalidFormat(format!(
                "central directory header at {} is truncated",
                pos
            )));
        }

        let h = &buf[pos..pos + CENTRAL_HEADER_LEN];
        let compressed_32 = read_u32(h, 20);
        let size_32 = read_u32(h, 24);
        let name_len = read_u16(h, 28) as usize;
        let extra_len = read_u16(h, 30) as usize;
        let comment_len = read_u16(h, 32) as usize;
        let disk_16 = read_u16(h, 34);
        let offset_32 = read_u32(h, 42);

        let var_start = pos + CENTRAL_HEADER_LEN;
        let var_end = var_start + name_len + extra_len + comment_len;
        if var_end > buf.len() {
            return Err(ZipError::InvalidFormat(format!(
                "central directory header at {} overruns the archive",
                pos
            )));
        }
        let name = buf[var_start..var_start + name_len].to_vec();
        let extra = buf[var_start + name_len..var_start + name_len + extra_len].to_vec();
        let comment = buf[var_start + name_len + extra_len..var_end].to_vec();

        let mut header = EntryHeader {
            version_made_by: read_u16(h, 4),
            version_needed: read_u16(h, 6),
            flags: read_u16(h, 8),
            method: read_u16(h, 10),
            time: DosDateTime::new(read_u16(h, 14), read_u16(h, 12)),
            crc: read_u32(h, 16),
            compressed_size: compressed_32 as u64,
            size: size_32 as u64,
            disk_number_start: disk_16 as u32,
            internal_attr: read_u16(h, 36),
            external_attr: read_u32(h, 38),
            offset: offset_32 as u64,
        };
        apply_zip64_extra(&mut header, &extra, size_32, compressed_32, offset_32, disk_16);

        Ok(Self {
            header,
            name,
            extra,
            comment,
            len: var_end - pos,
        })
    }
}

/// Replace sentinel header values with the Zip64 record's 64-bit values.
///
/// Sub-fields are consumed in order and are present only when the matching
/// header field holds its sentinel.
fn apply_zip64_extra(
    header: &mut EntryHeader,
    extra: &[u8],
    size_32: u32,
    compressed_32: u32,
    offset_32: u32,
    disk_16: u16,
) {
    let Some((_, data)) = ExtraFields::new(extra).find(|(id, _)| *id == ZIP64_EXTRA_ID) else {
        return;
    };

    let mut cursor = 0usize;
    if size_32 == SENTINEL_32 && cursor + 8 <= data.len() {
        header.size = read_u64(data, cursor);
        cursor += 8;
    }
    if compressed_32 == SENTINEL_32 && cursor + 8 <= data.len() {
        header.compressed_size = read_u64(data, cursor);
        cursor += 8;
    }
    if offset_32 == SENTINEL_32 && cursor + 8 <= data.len() {
        header.offset = read_u64(data, cursor);
        cursor += 8;
    }
    if disk_16 == SENTINEL_16 && cursor + 4 <= data.len() {
        header.disk_number_start = read_u32(data, cursor);
    }
}

/// Local file header as found in front of an entry's payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub method: u16,
    pub time: DosDateTime,
    pub crc: u32,
    pub compressed_size: u32,
    pub size: u32,
    pub name_len: u16,
    pub extra_len: u16,
}

impl LocalHeader {
    /// Parse the local header at `offset`. `name` is only used for errors.
    pub fn parse(buf: &[u8], offset: u64, name: &str) -> Result<Self> {
        let pos = usize::try_from(offset).unwrap_or(usize::MAX);
        let signature = signature_at(buf, pos).unwrap_or(0);
        if signature != LOCAL_FILE_HEADER_SIGNATURE || pos + LOCAL_HEADER_LEN > buf.len() {
            return Err(ZipError::InvalidLocalHeader {
                name: name.to_string(),
                offset,
                signature,
            });
        }

        let h = &buf[pos..pos + LOCAL_HEADER_LEN];
        Ok(Self {
            version_needed: read_u16(h, 4),
            flags: read_u16(h, 6),
            method: read_u16(h, 8),
            time: DosDateTime::new(read_u16(h, 12), read_u16(h, 10)),
            crc: read_u32(h, 14),
            compressed_size: read_u32(h, 18),
            size: read_u32(h, 22),
            name_len: read_u16(h, 26),
            extra_len: read_u16(h, 28),
        })
    }

    /// Bytes from the start of the local header to the first payload byte
    pub fn header_len(&self) -> u64 {
        (LOCAL_HEADER_LEN + self.name_len as usize + self.extra_len as usize) as u64
    }
}

/// Classic end of central directory record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub cd_disk: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment: Vec<u8>,
}

impl EndOfCentralDirectory {
    /// Parse the record at `pos`. The comment must fit inside `buf`.
    pub fn parse(buf: &[u8], pos: usize) -> Result<Self> {
        if signature_at(buf, pos) != Some(END_OF_CENTRAL_DIRECTORY_SIGNATURE)
            || pos + END_RECORD_LEN > buf.len()
        {
            return Err(ZipError::InvalidEndRecord(format!(
                "no end of central directory record at {}",
                pos
            )));
        }
        let h = &buf[pos..pos + END_RECORD_LEN];
        let comment_len = read_u16(h, 20) as usize;
        let comment_start = pos + END_RECORD_LEN;
        if comment_start + comment_len > buf.len() {
            return Err(ZipError::InvalidEndRecord(format!(
                "comment of {} bytes runs past the end of the archive",
                comment_len
            )));
        }

        Ok(Self {
            disk_number: read_u16(h, 4),
            cd_disk: read_u16(h, 6),
            disk_entries: read_u16(h, 8),
            total_entries: read_u16(h, 10),
            cd_size: read_u32(h, 12),
            cd_offset: read_u32(h, 16),
            comment: buf[comment_start..comment_start + comment_len].to_vec(),
        })
    }

    /// Whether any field holds a sentinel that defers to a Zip64 record
    pub fn has_zip64_sentinels(&self) -> bool {
        self.disk_entries == SENTINEL_16
            || self.total_entries == SENTINEL_16
            || self.cd_size == SENTINEL_32
            || self.cd_offset == SENTINEL_32
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let comment_len = u16::try_from(self.comment.len())
            .map_err(|_| ZipError::CommentTooLong(self.comment.len()))?;
        let mut out = Vec::with_capacity(END_RECORD_LEN + self.comment.len());
        out.extend_from_slice(&END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&self.disk_number.to_le_bytes());
        out.extend_from_slice(&self.cd_disk.to_le_bytes());
        out.extend_from_slice(&self.disk_entries.to_le_bytes());
        out.extend_from_slice(&self.total_entries.to_le_bytes());
        out.extend_from_slice(&self.cd_size.to_le_bytes());
        out.extend_from_slice(&self.cd_offset.to_le_bytes());
        out.extend_from_slice(&comment_len.to_le_bytes());
        out.extend_from_slice(&self.comment);
        Ok(out)
    }
}

/// Zip64 end of central directory record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zip64EndRecord {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub disk_number: u32,
    pub cd_disk: u32,
    pub disk_entries: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EndRecord {
    pub fn parse(buf: &[u8], pos: usize) -> Result<Self> {
        let signature = signature_at(buf, pos).unwrap_or(0);
        if signature != ZIP64_END_OF_CENTRAL_DIRECTORY_SIGNATURE {
            return Err(ZipError::InvalidEndRecord(format!(
                "invalid Zip64 end record signature 0x{:08x} at {}",
                signature, pos
            )));
        }
        if pos + ZIP64_END_RECORD_LEN > buf.len() {
            return Err(ZipError::InvalidEndRecord(
                "Zip64 end record is truncated".to_string(),
            ));
        }
        let h = &buf[pos..pos + ZIP64_END_RECORD_LEN];
        Ok(Self {
            version_made_by: read_u16(h, 12),
            version_needed: read_u16(h, 14),
            disk_number: read_u32(h, 16),
            cd_disk: read_u32(h, 20),
            disk_entries: read_u64(h, 24),
            total_entries: read_u64(h, 32),
            cd_size: read_u64(h, 40),
            cd_offset: read_u64(h, 48),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ZIP64_END_RECORD_LEN);
        out.extend_from_slice(&ZIP64_END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
        // size of the remaining record
        out.extend_from_slice(&((ZIP64_END_RECORD_LEN - 12) as u64).to_le_bytes());
        out.extend_from_slice(&self.version_made_by.to_le_bytes());
        out.extend_from_slice(&self.version_needed.to_le_bytes());
        out.extend_from_slice(&self.disk_number.to_le_bytes());
        out.extend_from_slice(&self.cd_disk.to_le_bytes());
        out.extend_from_slice(&self.disk_entries.to_le_bytes());
        out.extend_from_slice(&self.total_entries.to_le_bytes());
        out.extend_from_slice(&self.cd_size.to_le_bytes());
        out.extend_from_slice(&self.cd_offset.to_le_bytes());
        out
    }
}

/// Zip64 end of central directory locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zip64Locator {
    pub cd_disk: u32,
    pub end_record_offset: u64,
    pub total_disks: u32,
}

impl Zip64Locator {
    /// Parse the locator at `pos`; `None` if there is none there
    pub fn parse(buf: &[u8], pos: usize) -> Option<Self> {
        if signature_at(buf, pos)? != ZIP64_LOCATOR_SIGNATURE || pos + ZIP64_LOCATOR_LEN > buf.len() {
            return None;
        }
        Some(Self {
            cd_disk: read_u32(buf, pos + 4),
            end_record_offset: read_u64(buf, pos + 8),
            total_disks: read_u32(buf, pos + 16),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ZIP64_LOCATOR_LEN);
        out.extend_from_slice(&ZIP64_LOCATOR_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&self.cd_disk.to_le_bytes());
        out.extend_from_slice(&self.end_record_offset.to_le_bytes());
        out.extend_from_slice(&self.total_disks.to_le_bytes());
        out
    }
}

/// Wire layout a data descriptor was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorLayout {
    /// signature, crc, 32-bit sizes (16 bytes)
    Signed32,
    /// signature, crc, 64-bit sizes (24 bytes)
    Signed64,
    /// crc, 32-bit sizes, no signature (12 bytes)
    Unsigned32,
}

impl DescriptorLayout {
    pub fn byte_len(self) -> usize {
        match self {
            DescriptorLayout::Signed32 => 16,
            DescriptorLayout::Signed64 => 24,
            DescriptorLayout::Unsigned32 => 12,
        }
    }
}

/// CRC and sizes trailing an entry's payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDescriptor {
    pub crc: u32,
    pub compressed_size: u64,
    pub size: u64,
    pub layout: DescriptorLayout,
}

impl DataDescriptor {
    fn read(buf: &[u8], pos: usize, layout: DescriptorLayout) -> Option<Self> {
        if pos.checked_add(layout.byte_len())? > buf.len() {
            return None;
        }
        Some(match layout {
            DescriptorLayout::Signed32 => Self {
                crc: read_u32(buf, pos + 4),
                compressed_size: read_u32(buf, pos + 8) as u64,
                size: read_u32(buf, pos + 12) as u64,
                layout,
            },
            DescriptorLayout::Signed64 => Self {
                crc: read_u32(buf, pos + 4),
                compressed_size: read_u64(buf, pos + 8),
                size: read_u64(buf, pos + 16),
                layout,
            },
            DescriptorLayout::Unsigned32 => Self {
                crc: read_u32(buf, pos),
                compressed_size: read_u32(buf, pos + 4) as u64,
                size: read_u32(buf, pos + 8) as u64,
                layout,
            },
        })
    }

    /// Find the descriptor that follows a payload ending at `data_end`.
    ///
    /// Producers disagree on the layout, so every plausible one is tried: a
    /// layout is plausible when it fits and is followed by the end of the
    /// buffer or a `PK` marker. Among plausible layouts the one agreeing with
    /// the central directory (`crc`, `compressed_size`, `size`) wins. The
    /// error string explains why none was accepted.
    pub fn locate(
        buf: &[u8],
        data_end: usize,
        crc: u32,
        compressed_size: u64,
        size: u64,
    ) -> std::result::Result<Self, String> {
        match signature_at(buf, data_end) {
            Some(LOCAL_FILE_HEADER_SIGNATURE) | Some(CENTRAL_DIRECTORY_SIGNATURE) => {
                return Err("no descriptor, a header directly follows the payload".to_string());
            }
            None => return Err("descriptor runs past the end of the archive".to_string()),
            _ => {}
        }

        let followed_by_marker = |len: usize| {
            let next = data_end + len;
            next == buf.len() || (next + 2 <= buf.len() && read_u16(buf, next) == 0x4b50)
        };

        let candidates: &[DescriptorLayout] =
            if signature_at(buf, data_end) == Some(DATA_DESCRIPTOR_SIGNATURE) {
                &[
                    DescriptorLayout::Signed32,
                    DescriptorLayout::Signed64,
                    DescriptorLayout::Unsigned32,
                ]
            } else {
                &[DescriptorLayout::Unsigned32]
            };

        let plausible: Vec<DataDescriptor> = candidates
            .iter()
            .filter(|layout| followed_by_marker(layout.byte_len()))
            .filter_map(|&layout| Self::read(buf, data_end, layout))
            .collect();

        if let Some(found) = plausible
            .iter()
            .find(|d| d.crc == crc && d.compressed_size == compressed_size && d.size == size)
        {
            return Ok(*found);
        }

        match plausible.first() {
            Some(d) => Err(format!(
                "descriptor ({:?}) says crc 0x{:08x}, sizes {}/{}; central directory says crc 0x{:08x}, sizes {}/{}",
                d.layout, d.crc, d.compressed_size, d.size, crc, compressed_size, size
            )),
            None => Err("unrecognized descriptor layout".to_string()),
        }
    }

    /// Signed descriptor bytes, 64-bit sizes when either size needs them
    pub fn to_bytes(&self) -> Vec<u8> {
        let wide = self.compressed_size >= SENTINEL_32 as u64 || self.size >= SENTINEL_32 as u64;
        let mut out = Vec::with_capacity(24);
        out.extend_from_slice(&DATA_DESCRIPTOR_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&self.crc.to_le_bytes());
        if wide {
            out.extend_from_slice(&self.compressed_size.to_le_bytes());
            out.extend_from_slice(&self.size.to_le_bytes());
        } else {
            out.extend_from_slice(&(self.compressed_size as u32).to_le_bytes());
            out.extend_from_slice(&(self.size as u32).to_le_bytes());
        }
        out
    }
}
