//! The archive: entry table, central directory and end record
//!
//! Reading is a small state machine. An opened buffer is `Unparsed` until
//! the end record is located (`HeaderLocated`), and the central directory is
//! only walked on first access (`EntriesLoaded`). Writing always produces a
//! brand new buffer; the archive then re-opens itself on that buffer, so the
//! bytes being read are never modified in place.

use crate::cipher::{OsRandom, RandomSource};
use crate::entry::{WriteContext, ZipEntry};
use crate::error::{Result, ZipError};
use crate::header::{
    CentralRecord, EndOfCentralDirectory, Zip64EndRecord, Zip64Locator, CENTRAL_HEADER_LEN,
    END_OF_CENTRAL_DIRECTORY_SIGNATURE, END_RECORD_LEN, MAX_FIELD_LEN, SENTINEL_16, SENTINEL_32,
    VERSION_MADE_BY_UNIX, ZIP64_LOCATOR_LEN, ZIP64_VERSION_NEEDED,
};
use crate::options::ArchiveOptions;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Counts, size and offset of the central directory, from whichever end
/// record (32-bit or Zip64) is authoritative
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainHeader {
    pub disk_entries: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
    /// Offset of the 32-bit end record
    pub end_offset: u64,
    /// Values came from a Zip64 end record
    pub zip64: bool,
}

#[derive(Debug, Clone)]
enum ArchiveState {
    Unparsed,
    HeaderLocated(MainHeader),
    EntriesLoaded,
}

/// In-memory ZIP archive
pub struct Archive {
    source: Arc<[u8]>,
    options: ArchiveOptions,
    random: Arc<dyn RandomSource>,
    state: ArchiveState,
    comment: Vec<u8>,
    entries: Vec<ZipEntry>,
    index: HashMap<String, usize>,
    synthetic: BTreeMap<String, ZipEntry>,
}

impl fmt::Debug for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archive")
            .field("source_len", &self.source.len())
            .field("options", &self.options)
            .field("state", &self.state)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl Default for Archive {
    fn default() -> Self {
        Self::new(ArchiveOptions::default())
    }
}

/// Find the end record, scanning backwards from the last possible position.
///
/// The scan covers the maximum comment length unless `trailing_space` is
/// set, in which case the whole buffer is searched. A Zip64 locator directly
/// in front of the 32-bit record makes the Zip64 end record authoritative.
pub fn locate_end_record(buf: &[u8], trailing_space: bool) -> Result<(MainHeader, Vec<u8>)> {
    if buf.len() < END_RECORD_LEN {
        return Err(ZipError::InvalidFormat(format!(
            "{} bytes is too short for a ZIP archive",
            buf.len()
        )));
    }

    let last = buf.len() - END_RECORD_LEN;
    let floor = if trailing_space {
        0
    } else {
        last.saturating_sub(MAX_FIELD_LEN)
    };
    let signature = END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes();

    for pos in (floor..=last).rev() {
        if buf[pos..pos + 4] != signature {
            continue;
        }
        // A signature inside comment bytes whose length overruns the buffer
        // is not the real record
        let Ok(end) = EndOfCentralDirectory::parse(buf, pos) else {
            continue;
        };

        if pos >= ZIP64_LOCATOR_LEN {
            if let Some(locator) = Zip64Locator::parse(buf, pos - ZIP64_LOCATOR_LEN) {
                let record_pos = usize::try_from(locator.end_record_offset).map_err(|_| {
                    ZipError::InvalidEndRecord("Zip64 end record offset out of range".to_string())
                })?;
                let record = Zip64EndRecord::parse(buf, record_pos)?;
                debug!(
                    "Zip64 end record at {}: {} entries, directory {} bytes at {}",
                    record_pos, record.total_entries, record.cd_size, record.cd_offset
                );
                let header = MainHeader {
                    disk_entries: record.disk_entries,
                    total_entries: record.total_entries,
                    cd_size: record.cd_size,
                    cd_offset: record.cd_offset,
                    end_offset: pos as u64,
                    zip64: true,
                };
                validate_main_header(&header, buf.len())?;
                return Ok((header, end.comment));
            }
        }

        if end.has_zip64_sentinels() {
            return Err(ZipError::InvalidEndRecord(
                "end record holds Zip64 sentinels but no Zip64 locator precedes it".to_string(),
            ));
        }

        debug!(
            "end record at {}: {} entries, directory {} bytes at {}",
            pos, end.total_entries, end.cd_size, end.cd_offset
        );
        let header = MainHeader {
            disk_entries: end.disk_entries as u64,
            total_entries: end.total_entries as u64,
            cd_size: end.cd_size as u64,
            cd_offset: end.cd_offset as u64,
            end_offset: pos as u64,
            zip64: false,
        };
        validate_main_header(&header, buf.len())?;
        return Ok((header, end.comment));
    }

    Err(ZipError::InvalidFormat(
        "end of central directory not found".to_string(),
    ))
}

fn validate_main_header(header: &MainHeader, len: usize) -> Result<()> {
    if header.cd_offset.saturating_add(header.cd_size) > len as u64 {
        return Err(ZipError::InvalidEndRecord(format!(
            "central directory ({} bytes at {}) lies outside the {}-byte archive",
            header.cd_size, header.cd_offset, len
        )));
    }
    Ok(())
}

/// Every directory prefix of `name`, shortest first ("a/", "a/b/")
fn parent_prefixes(name: &str) -> impl Iterator<Item = &str> {
    name.match_indices('/')
        .map(move |(i, _)| &name[..=i])
        .filter(move |prefix| prefix.len() < name.len())
}

impl Archive {
    /// Empty archive
    pub fn new(options: ArchiveOptions) -> Self {
        Self {
            source: Arc::from(Vec::<u8>::new()),
            options,
            random: Arc::new(OsRandom),
            state: ArchiveState::EntriesLoaded,
            comment: Vec::new(),
            entries: Vec::new(),
            index: HashMap::new(),
            synthetic: BTreeMap::new(),
        }
    }

    /// Open an archive held in memory. Only the end record is parsed unless
    /// `options.read_entries` is set.
    pub fn from_bytes(bytes: Vec<u8>, options: ArchiveOptions) -> Result<Self> {
        let mut archive = Self {
            source: Arc::from(bytes),
            options,
            random: Arc::new(OsRandom),
            state: ArchiveState::Unparsed,
            comment: Vec::new(),
            entries: Vec::new(),
            index: HashMap::new(),
            synthetic: BTreeMap::new(),
        };
        archive.locate()?;
        if archive.options.read_entries {
            archive.ensure_loaded()?;
        }
        Ok(archive)
    }

    /// Replace the salt source used when encrypting entries
    pub fn set_random_source(&mut self, random: Arc<dyn RandomSource>) {
        self.random = random;
    }

    pub fn options(&self) -> &ArchiveOptions {
        &self.options
    }

    /// Bytes of the current generation (the last opened or written buffer)
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// End-record values, while the central directory has not been walked yet
    pub fn main_header(&self) -> Option<&MainHeader> {
        match &self.state {
            ArchiveState::HeaderLocated(header) => Some(header),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, ArchiveState::EntriesLoaded)
    }

    pub fn comment(&self) -> &[u8] {
        &self.comment
    }

    pub fn set_comment(&mut self, comment: &[u8]) -> Result<()> {
        if comment.len() > MAX_FIELD_LEN {
            return Err(ZipError::CommentTooLong(comment.len()));
        }
        self.comment = comment.to_vec();
        Ok(())
    }

    fn locate(&mut self) -> Result<()> {
        let (header, comment) = locate_end_record(&self.source, self.options.trailing_space)?;
        self.comment = comment;
        self.state = ArchiveState::HeaderLocated(header);
        Ok(())
    }

    /// Walk the central directory if that has not happened yet
    pub fn ensure_loaded(&mut self) -> Result<()> {
        if matches!(self.state, ArchiveState::Unparsed) {
            self.locate()?;
        }
        let header = match &self.state {
            ArchiveState::HeaderLocated(header) => header.clone(),
            _ => return Ok(()),
        };

        let start = usize::try_from(header.cd_offset).unwrap_or(usize::MAX);
        let available = self.source.len().saturating_sub(start) as u64;
        if header.total_entries.saturating_mul(CENTRAL_HEADER_LEN as u64) > available {
            return Err(ZipError::DiskEntryTooLarge {
                entries: header.total_entries,
                available,
            });
        }

        let mut entries = Vec::with_capacity(header.total_entries as usize);
        let mut pos = start;
        for _ in 0..header.total_entries {
            let record = CentralRecord::parse(&self.source, pos)?;
            pos += record.len;
            entries.push(ZipEntry::from_central(record, Arc::clone(&self.source)));
        }
        debug!(
            "loaded {} entries from {} bytes of central directory",
            entries.len(),
            pos - start
        );

        self.entries = entries;
        self.state = ArchiveState::EntriesLoaded;
        self.rebuild_index();
        Ok(())
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, entry) in self.entries.iter().enumerate() {
            self.index.entry(entry.name().to_string()).or_insert(i);
        }
        self.synthetic.clear();
        for entry in &self.entries {
            for prefix in parent_prefixes(entry.name()) {
                if !self.index.contains_key(prefix) && !self.synthetic.contains_key(prefix) {
                    self.synthetic
                        .insert(prefix.to_string(), ZipEntry::synthetic_directory(prefix));
                }
            }
        }
    }

    /// Real entries, in table order
    pub fn entries(&mut self) -> Result<&[ZipEntry]> {
        self.ensure_loaded()?;
        Ok(&self.entries)
    }

    /// Number of real entries. Answered from the end record when the
    /// directory has not been walked yet.
    pub fn entry_count(&self) -> usize {
        match &self.state {
            ArchiveState::HeaderLocated(header) => header.total_entries as usize,
            _ => self.entries.len(),
        }
    }

    /// Directory prefixes implied by entry names that have no entry of their own
    pub fn synthetic_directories(&mut self) -> Result<Vec<&ZipEntry>> {
        self.ensure_loaded()?;
        Ok(self.synthetic.values().collect())
    }

    /// Real entries plus synthetic directories, ordered by name
    pub fn display_entries(&mut self) -> Result<Vec<&ZipEntry>> {
        self.ensure_loaded()?;
        let mut all: Vec<&ZipEntry> = self.entries.iter().chain(self.synthetic.values()).collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(all)
    }

    pub fn entry(&mut self, name: &str) -> Result<Option<&ZipEntry>> {
        self.ensure_loaded()?;
        Ok(self.index.get(name).map(|&i| &self.entries[i]))
    }

    pub fn entry_mut(&mut self, name: &str) -> Result<Option<&mut ZipEntry>> {
        self.ensure_loaded()?;
        Ok(self.index.get(name).map(|&i| &mut self.entries[i]))
    }

    /// Real or synthetic directory entry
    pub fn directory(&mut self, name: &str) -> Result<Option<&ZipEntry>> {
        self.ensure_loaded()?;
        Ok(self
            .index
            .get(name)
            .map(|&i| &self.entries[i])
            .or_else(|| self.synthetic.get(name)))
    }

    /// Entries strictly below directory `dir` (which must end with '/')
    pub fn children(&mut self, dir: &str) -> Result<Vec<&ZipEntry>> {
        self.ensure_loaded()?;
        Ok(self
            .entries
            .iter()
            .filter(|e| e.name().len() > dir.len() && e.name().starts_with(dir))
            .collect())
    }

    /// Add an entry, replacing any entry with the same name in place
    pub fn insert(&mut self, entry: ZipEntry) -> Result<&mut ZipEntry> {
        self.ensure_loaded()?;
        let name = entry.name().to_string();
        let existing = self.index.get(&name).copied();
        let idx = match existing {
            Some(i) => {
                self.entries[i] = entry;
                i
            }
            None => {
                let i = self.entries.len();
                self.entries.push(entry);
                self.index.insert(name.clone(), i);
                self.synthetic.remove(&name);
                for prefix in parent_prefixes(&name) {
                    if !self.index.contains_key(prefix) && !self.synthetic.contains_key(prefix) {
                        self.synthetic
                            .insert(prefix.to_string(), ZipEntry::synthetic_directory(prefix));
                    }
                }
                i
            }
        };
        Ok(&mut self.entries[idx])
    }

    /// Remove one entry by exact name
    pub fn remove(&mut self, name: &str) -> Result<Option<ZipEntry>> {
        self.ensure_loaded()?;
        let Some(&idx) = self.index.get(name) else {
            return Ok(None);
        };
        let removed = self.entries.remove(idx);
        self.rebuild_index();
        Ok(Some(removed))
    }

    /// Remove `name` and everything below it. Returns how many entries went.
    pub fn remove_subtree(&mut self, name: &str) -> Result<usize> {
        self.ensure_loaded()?;
        let trimmed = name.trim_end_matches('/');
        let dir = format!("{}/", trimmed);
        let before = self.entries.len();
        self.entries
            .retain(|e| e.name() != trimmed && !e.name().starts_with(&dir));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.rebuild_index();
        }
        Ok(removed)
    }

    /// Turn every synthetic directory into a real zero-length entry
    pub fn materialize_directories(&mut self) -> Result<usize> {
        self.ensure_loaded()?;
        let names: Vec<String> = self.synthetic.keys().cloned().collect();
        for name in &names {
            let entry = ZipEntry::new(name)?;
            self.insert(entry)?;
        }
        Ok(names.len())
    }

    /// Entry indices in write order
    pub(crate) fn write_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        if self.options.sort_entries {
            order.sort_by_cached_key(|&i| self.entries[i].name().to_lowercase());
        }
        order
    }

    #[cfg(feature = "async")]
    pub(crate) fn entry_name_at(&self, idx: usize) -> &str {
        self.entries[idx].name()
    }

    /// Compressed payload of entry `idx` as it will be written
    pub(crate) fn prepare_payload(&mut self, idx: usize) -> Result<Vec<u8>> {
        let random = Arc::clone(&self.random);
        let ctx = WriteContext {
            compression_level: self.options.compression_level,
            random: random.as_ref(),
        };
        self.entries[idx].compressed_data(&ctx)
    }

    /// Serialize the archive into one contiguous buffer.
    ///
    /// On success the archive re-opens itself on the returned bytes.
    pub fn to_buffer(&mut self) -> Result<Vec<u8>> {
        self.ensure_loaded()?;
        let order = self.write_order();
        let mut payloads = Vec::with_capacity(order.len());
        for &idx in &order {
            payloads.push(self.prepare_payload(idx)?);
        }
        self.assemble(&order, payloads)
    }

    /// Lay out local headers and payloads, then the central directory, then
    /// the end record(s). `payloads[i]` belongs to entry `order[i]`.
    pub(crate) fn assemble(&mut self, order: &[usize], payloads: Vec<Vec<u8>>) -> Result<Vec<u8>> {
        let payload_bytes: usize = payloads.iter().map(Vec::len).sum();
        let mut out = Vec::with_capacity(payload_bytes + order.len() * 160 + 128);

        for (&idx, payload) in order.iter().zip(payloads) {
            let entry = &mut self.entries[idx];
            entry.set_offset(out.len() as u64);
            out.extend(entry.local_header_bytes()?);
            out.extend_from_slice(&payload);
            if let Some(descriptor) = entry.data_descriptor_bytes() {
                out.extend(descriptor);
            }
            trace!("wrote {} at offset {}", entry.name(), entry.header().offset());
        }

        let cd_offset = out.len() as u64;
        for &idx in order {
            out.extend(self.entries[idx].central_header_bytes()?);
        }
        let cd_size = out.len() as u64 - cd_offset;

        let count = order.len() as u64;
        let entries_overflow = count >= SENTINEL_16 as u64;
        let size_overflow = cd_size >= SENTINEL_32 as u64;
        let offset_overflow = cd_offset >= SENTINEL_32 as u64;

        if entries_overflow || size_overflow || offset_overflow {
            let record_offset = out.len() as u64;
            let record = Zip64EndRecord {
                version_made_by: VERSION_MADE_BY_UNIX,
                version_needed: ZIP64_VERSION_NEEDED,
                disk_number: 0,
                cd_disk: 0,
                disk_entries: count,
                total_entries: count,
                cd_size,
                cd_offset,
            };
            out.extend(record.to_bytes());
            out.extend(
                Zip64Locator {
                    cd_disk: 0,
                    end_record_offset: record_offset,
                    total_disks: 1,
                }
                .to_bytes(),
            );
        }

        let count_16 = if entries_overflow {
            SENTINEL_16
        } else {
            count as u16
        };
        let end = EndOfCentralDirectory {
            disk_number: 0,
            cd_disk: 0,
            disk_entries: count_16,
            total_entries: count_16,
            cd_size: if size_overflow { SENTINEL_32 } else { cd_size as u32 },
            cd_offset: if offset_overflow {
                SENTINEL_32
            } else {
                cd_offset as u32
            },
            comment: self.comment.clone(),
        };
        out.extend(end.to_bytes()?);

        debug!(
            "serialized {} entries into {} bytes (directory {} bytes at {})",
            count,
            out.len(),
            cd_size,
            cd_offset
        );

        self.reopen(&out)?;
        Ok(out)
    }

    /// Start a new generation on freshly written bytes
    fn reopen(&mut self, bytes: &[u8]) -> Result<()> {
        self.source = Arc::from(bytes);
        self.entries.clear();
        self.index.clear();
        self.synthetic.clear();
        self.state = ArchiveState::Unparsed;
        self.locate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{CENTRAL_DIRECTORY_SIGNATURE, END_OF_CENTRAL_DIRECTORY_SIGNATURE};

    fn archive_with(names: &[&str]) -> Archive {
        let mut archive = Archive::default();
        for name in names {
            let mut entry = ZipEntry::new(name).unwrap();
            entry.set_data(name.as_bytes().to_vec());
            archive.insert(entry).unwrap();
        }
        archive
    }

    #[test]
    fn empty_archive_is_just_an_end_record() {
        let mut archive = Archive::default();
        let bytes = archive.to_buffer().unwrap();
        assert_eq!(bytes.len(), END_RECORD_LEN);
        assert_eq!(&bytes[..4], &END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
        assert_eq!(archive.entry_count(), 0);
    }

    #[test]
    fn serialize_then_read_back() {
        let mut archive = archive_with(&["b.txt", "A.txt", "c/d.txt"]);
        let bytes = archive.to_buffer().unwrap();

        // re-opened lazily on the new generation
        assert!(!archive.is_loaded());
        assert_eq!(archive.entry_count(), 3);
        assert_eq!(archive.source(), &bytes[..]);

        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(names, vec!["A.txt", "b.txt", "c/d.txt"]);

        let entry = archive.entry("c/d.txt").unwrap().unwrap();
        assert_eq!(entry.decompressed_data(None).unwrap(), b"c/d.txt");
    }

    #[test]
    fn insertion_order_when_sorting_disabled() {
        let mut archive = Archive::new(ArchiveOptions::default().with_sort_entries(false));
        for name in ["z", "a", "m"] {
            archive.insert(ZipEntry::new(name).unwrap()).unwrap();
        }
        archive.to_buffer().unwrap();
        let names: Vec<&str> = archive.entries().unwrap().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn central_directory_size_matches_records() {
        let mut archive = archive_with(&["one", "two/three"]);
        archive.entry_mut("one").unwrap().unwrap().set_comment(b"hi").unwrap();
        let bytes = archive.to_buffer().unwrap();
        let header = archive.main_header().unwrap().clone();

        let expected: u64 = (CENTRAL_HEADER_LEN + 3 + 2) as u64 + (CENTRAL_HEADER_LEN + 9) as u64;
        assert_eq!(header.cd_size, expected);
        assert_eq!(
            &bytes[header.cd_offset as usize..header.cd_offset as usize + 4],
            &CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes()
        );
    }

    #[test]
    fn missing_end_record_is_invalid_format() {
        let err = Archive::from_bytes(vec![0u8; 100], ArchiveOptions::default()).unwrap_err();
        assert!(matches!(err, ZipError::InvalidFormat(_)));
        let err = Archive::from_bytes(vec![1, 2, 3], ArchiveOptions::default()).unwrap_err();
        assert!(matches!(err, ZipError::InvalidFormat(_)));
    }

    #[test]
    fn trailing_padding_needs_option() {
        let mut archive = archive_with(&["x"]);
        let mut bytes = archive.to_buffer().unwrap();
        bytes.extend(vec![0u8; MAX_FIELD_LEN + 100]);

        assert!(Archive::from_bytes(bytes.clone(), ArchiveOptions::default()).is_err());
        let mut reopened =
            Archive::from_bytes(bytes, ArchiveOptions::default().with_trailing_space(true))
                .unwrap();
        assert_eq!(reopened.entries().unwrap().len(), 1);
    }

    #[test]
    fn implausible_entry_count_is_rejected() {
        let mut archive = archive_with(&["x"]);
        let mut bytes = archive.to_buffer().unwrap();
        let end = bytes.len() - END_RECORD_LEN;
        bytes[end + 8..end + 10].copy_from_slice(&5000u16.to_le_bytes());
        bytes[end + 10..end + 12].copy_from_slice(&5000u16.to_le_bytes());

        let mut reopened = Archive::from_bytes(bytes, ArchiveOptions::default()).unwrap();
        assert!(matches!(
            reopened.entries(),
            Err(ZipError::DiskEntryTooLarge { entries: 5000, .. })
        ));
    }

    #[test]
    fn corrupt_central_signature() {
        let mut archive = archive_with(&["x", "y"]);
        let mut bytes = archive.to_buffer().unwrap();
        let cd = archive.main_header().unwrap().cd_offset as usize;
        bytes[cd] = 0;
        let mut reopened = Archive::from_bytes(bytes, ArchiveOptions::default()).unwrap();
        assert!(matches!(
            reopened.entries(),
            Err(ZipError::InvalidCentralHeader { .. })
        ));
    }

    #[test]
    fn eager_load_option() {
        let mut archive = archive_with(&["x"]);
        let bytes = archive.to_buffer().unwrap();
        let reopened =
            Archive::from_bytes(bytes, ArchiveOptions::default().with_read_entries(true)).unwrap();
        assert!(reopened.is_loaded());
    }

    #[test]
    fn synthetic_directories_follow_the_table() {
        let mut archive = archive_with(&["a/b/c.txt"]);
        let dirs: Vec<&str> = archive
            .synthetic_directories()
            .unwrap()
            .iter()
            .map(|e| e.name())
            .collect();
        assert_eq!(dirs, vec!["a/", "a/b/"]);
        assert_eq!(archive.entry_count(), 1);

        archive.insert(ZipEntry::new("a/").unwrap()).unwrap();
        let dirs: Vec<&str> = archive
            .synthetic_directories()
            .unwrap()
            .iter()
            .map(|e| e.name())
            .collect();
        assert_eq!(dirs, vec!["a/b/"]);

        archive.remove("a/b/c.txt").unwrap();
        assert!(archive.synthetic_directories().unwrap().is_empty());
    }

    #[test]
    fn remove_subtree_respects_segment_boundaries() {
        let mut archive = archive_with(&["mods/a.jar", "mods/b.jar", "mods.txt", "config/x"]);
        assert_eq!(archive.remove_subtree("mods").unwrap(), 2);
        let names: Vec<&str> = archive.entries().unwrap().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["mods.txt", "config/x"]);
    }

    #[test]
    fn archive_comment_roundtrip_and_limit() {
        let mut archive = archive_with(&["x"]);
        archive.set_comment(b"exported by launcher").unwrap();
        let bytes = archive.to_buffer().unwrap();
        let reopened = Archive::from_bytes(bytes, ArchiveOptions::default()).unwrap();
        assert_eq!(reopened.comment(), b"exported by launcher");

        assert!(matches!(
            archive.set_comment(&vec![0u8; 70000]),
            Err(ZipError::CommentTooLong(70000))
        ));
    }

    #[test]
    fn parent_prefix_iteration() {
        let prefixes: Vec<&str> = parent_prefixes("a/b/c.txt").collect();
        assert_eq!(prefixes, vec!["a/", "a/b/"]);
        let prefixes: Vec<&str> = parent_prefixes("a/b/").collect();
        assert_eq!(prefixes, vec!["a/"]);
    }
}
