//! Configuration for opening, writing and extracting archives

/// How an archive is opened and written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// Parse the central directory at open time instead of on first access (default: false)
    pub read_entries: bool,
    /// Scan the whole buffer for the end record, for producers that pad
    /// after the archive comment (default: false)
    pub trailing_space: bool,
    /// Write entries in case-insensitive name order (default: true)
    pub sort_entries: bool,
    /// DEFLATE level 0-9 (default: 6)
    pub compression_level: u32,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            read_entries: false,
            trailing_space: false,
            sort_entries: true,
            compression_level: 6,
        }
    }
}

impl ArchiveOptions {
    /// Parse every entry at open time
    pub fn with_read_entries(mut self, read: bool) -> Self {
        self.read_entries = read;
        self
    }

    /// Tolerate bytes after the end record
    pub fn with_trailing_space(mut self, tolerate: bool) -> Self {
        self.trailing_space = tolerate;
        self
    }

    /// Keep insertion order on write instead of sorting
    pub fn with_sort_entries(mut self, sort: bool) -> Self {
        self.sort_entries = sort;
        self
    }

    /// Set compression level (clamped to 9)
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }
}

/// How entries are written to the filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Recreate the entry's directory structure under the target (default: true)
    pub maintain_path: bool,
    /// Replace existing files (default: false)
    pub overwrite: bool,
    /// Apply stored Unix permission bits (default: false)
    pub keep_permissions: bool,
    /// File name to use instead of the entry's own (single-file extraction only)
    pub rename_to: Option<String>,
    /// Password for encrypted entries
    pub password: Option<String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            maintain_path: true,
            overwrite: false,
            keep_permissions: false,
            rename_to: None,
            password: None,
        }
    }
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_maintain_path(mut self, maintain: bool) -> Self {
        self.maintain_path = maintain;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_keep_permissions(mut self, keep: bool) -> Self {
        self.keep_permissions = keep;
        self
    }

    pub fn with_rename_to(mut self, name: impl Into<String>) -> Self {
        self.rename_to = Some(name.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub(crate) fn password_bytes(&self) -> Option<&[u8]> {
        self.password.as_deref().map(str::as_bytes)
    }
}
