//! Archive facade
//!
//! [`ZipFile`] is the entry point for callers: open an archive from disk or
//! memory, look entries up, add/update/delete them, extract to the
//! filesystem and write the result back out.

use crate::archive::Archive;
use crate::cipher::RandomSource;
use crate::entry::ZipEntry;
use crate::error::{Result, ZipError};
use crate::extract::{self, ExtractReport};
use crate::options::{ArchiveOptions, ExtractOptions};
use crate::path::normalize_name;
use std::borrow::Cow;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::debug;

const FILE_TYPE_MASK: u32 = 0o170000;
const REGULAR_FILE: u32 = 0o100000;
const DIRECTORY: u32 = 0o040000;

/// A ZIP archive held in memory
#[derive(Debug, Default)]
pub struct ZipFile {
    archive: Archive,
    path: Option<PathBuf>,
}

pub(crate) fn read_archive_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ZipError::FileNotFound(path.to_path_buf()),
        _ => ZipError::Io(e),
    })
}

impl ZipFile {
    /// New empty archive
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ArchiveOptions) -> Self {
        Self {
            archive: Archive::new(options),
            path: None,
        }
    }

    /// Open an archive file
    ///
    /// # Example
    ///
    /// ```no_run
    /// use modzip::ZipFile;
    ///
    /// let mut zip = ZipFile::open("modpack.zip")?;
    /// for entry in zip.entries()? {
    ///     println!("{}: {} bytes", entry.name(), entry.size());
    /// }
    /// # Ok::<(), modzip::ZipError>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ArchiveOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ArchiveOptions) -> Result<Self> {
        let path = path.as_ref();
        let bytes = read_archive_file(path)?;
        debug!("opened {} ({} bytes)", path.display(), bytes.len());
        let mut zip = Self::from_bytes_with_options(bytes, options)?;
        zip.set_path(path);
        Ok(zip)
    }

    /// Open an archive held in memory
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_bytes_with_options(bytes, ArchiveOptions::default())
    }

    pub fn from_bytes_with_options(bytes: Vec<u8>, options: ArchiveOptions) -> Result<Self> {
        Ok(Self {
            archive: Archive::from_bytes(bytes, options)?,
            path: None,
        })
    }

    /// Replace the salt source used for encrypted entries
    pub fn set_random_source(&mut self, random: Arc<dyn RandomSource>) {
        self.archive.set_random_source(random);
    }

    /// File this archive was opened from or last written to
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn archive_mut(&mut self) -> &mut Archive {
        &mut self.archive
    }

    pub(crate) fn set_path(&mut self, path: &Path) {
        self.path = Some(path.to_path_buf());
    }

    pub fn entries(&mut self) -> Result<&[ZipEntry]> {
        self.archive.entries()
    }

    /// Entries plus the directories implied by their names, ordered by name
    pub fn display_entries(&mut self) -> Result<Vec<&ZipEntry>> {
        self.archive.display_entries()
    }

    /// Number of real entries (synthetic directories are not counted)
    pub fn entry_count(&self) -> usize {
        self.archive.entry_count()
    }

    /// Look an entry up by exact name, then by its normalized form.
    /// Synthetic directories are found too.
    pub fn get_entry(&mut self, name: &str) -> Result<Option<&ZipEntry>> {
        let key = self.resolve_name(name)?;
        self.archive.directory(&key)
    }

    /// `name` itself when an entry (or implied directory) has it, otherwise
    /// its normalized form
    fn resolve_name<'n>(&mut self, name: &'n str) -> Result<Cow<'n, str>> {
        if self.archive.directory(name)?.is_some() {
            Ok(Cow::Borrowed(name))
        } else {
            Ok(Cow::Owned(normalize_name(name)))
        }
    }

    /// Uncompressed contents of `name`
    pub fn read_entry(&mut self, name: &str, password: Option<&str>) -> Result<Vec<u8>> {
        let entry = self
            .get_entry(name)?
            .ok_or_else(|| ZipError::EntryNotFound(name.to_string()))?;
        entry.decompressed_data(password.map(str::as_bytes))
    }

    /// Add an entry, or replace the data of an existing one with that name.
    ///
    /// `attr` holds Unix permission bits; the file type bits are filled in
    /// when missing.
    pub fn add_entry(
        &mut self,
        name: &str,
        data: Vec<u8>,
        comment: Option<&str>,
        attr: Option<u32>,
    ) -> Result<&mut ZipEntry> {
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(ZipError::InvalidFormat("empty entry name".to_string()));
        }

        let exists = self.archive.entry(&name)?.is_some();
        let entry = if exists {
            self.archive
                .entry_mut(&name)?
                .ok_or_else(|| ZipError::EntryNotFound(name.clone()))?
        } else {
            self.archive.insert(ZipEntry::new(&name)?)?
        };

        entry.set_data(data);
        entry.set_password(None);
        if let Some(comment) = comment {
            entry.set_comment(comment.as_bytes())?;
        }
        if let Some(mode) = attr {
            let mode = if mode & FILE_TYPE_MASK == 0 {
                mode | if entry.is_directory() {
                    DIRECTORY
                } else {
                    REGULAR_FILE
                }
            } else {
                mode
            };
            entry.set_unix_mode(mode);
        }
        debug!("added {} ({} bytes)", entry.name(), entry.size());
        Ok(entry)
    }

    /// Add an entry that is ZipCrypto-encrypted with `password` when written
    pub fn add_encrypted_entry(
        &mut self,
        name: &str,
        data: Vec<u8>,
        password: &str,
    ) -> Result<&mut ZipEntry> {
        if password.is_empty() {
            return Err(ZipError::InvalidPasswordParameter(name.to_string()));
        }
        let entry = self.add_entry(name, data, None, None)?;
        entry.set_password(Some(password.as_bytes()));
        Ok(entry)
    }

    /// Replace the data of an existing entry
    pub fn update_entry(&mut self, name: &str, data: Vec<u8>) -> Result<()> {
        let key = self.resolve_name(name)?;
        let entry = self
            .archive
            .entry_mut(&key)?
            .ok_or_else(|| ZipError::EntryNotFound(name.to_string()))?;
        entry.set_data(data);
        Ok(())
    }

    /// Remove one entry. Returns whether it existed.
    pub fn delete_entry(&mut self, name: &str) -> Result<bool> {
        let key = self.resolve_name(name)?;
        Ok(self.archive.remove(&key)?.is_some())
    }

    /// Remove an entry and everything below it
    pub fn delete_subtree(&mut self, name: &str) -> Result<usize> {
        let key = self.resolve_name(name)?;
        self.archive.remove_subtree(&key)
    }

    pub fn comment(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.archive.comment())
    }

    pub fn set_comment(&mut self, comment: &str) -> Result<()> {
        self.archive.set_comment(comment.as_bytes())
    }

    pub fn set_entry_comment(&mut self, name: &str, comment: &str) -> Result<()> {
        let key = self.resolve_name(name)?;
        self.archive
            .entry_mut(&key)?
            .ok_or_else(|| ZipError::EntryNotFound(name.to_string()))?
            .set_comment(comment.as_bytes())
    }

    /// Give every implied directory a real entry of its own
    pub fn materialize_directories(&mut self) -> Result<usize> {
        self.archive.materialize_directories()
    }

    /// Extract one entry (a directory extracts everything beneath it)
    pub fn extract_entry<P: AsRef<Path>>(
        &mut self,
        name: &str,
        target: P,
        options: &ExtractOptions,
    ) -> Result<()> {
        let key = self.resolve_name(name)?;
        extract::extract_entry(&mut self.archive, &key, target.as_ref(), options)
    }

    /// Extract everything, collecting per-entry content failures
    pub fn extract_all<P: AsRef<Path>>(
        &mut self,
        target: P,
        options: &ExtractOptions,
    ) -> Result<ExtractReport> {
        extract::extract_all(&mut self.archive, target.as_ref(), options)
    }

    /// Serialize to a new buffer
    pub fn to_buffer(&mut self) -> Result<Vec<u8>> {
        self.archive.to_buffer()
    }

    /// Serialize and atomically replace `path`
    pub fn write_to_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_buffer()?;
        persist_atomically(path, &bytes)?;
        self.set_path(path);
        Ok(())
    }

    /// Decompress and CRC-check every non-directory entry.
    ///
    /// Returns `false` on the first failure, including a malformed archive.
    pub fn test(&mut self, password: Option<&str>) -> bool {
        let password = password.map(str::as_bytes);
        let entries = match self.archive.entries() {
            Ok(entries) => entries,
            Err(e) => {
                debug!("test failed to load the central directory: {}", e);
                return false;
            }
        };
        for entry in entries.iter().filter(|e| !e.is_directory()) {
            if let Err(e) = entry.decompressed_data(password) {
                debug!("test failed for {}: {}", entry.name(), e);
                return false;
            }
        }
        true
    }
}

/// Write through a temporary file in the destination directory, then rename
pub(crate) fn persist_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| ZipError::Io(e.error))?;
    debug!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
