//! Async variants of the facade operations
//!
//! File I/O goes through `tokio::fs`, and serialization yields to the
//! runtime between entries so large archives do not starve other tasks.
//! The bytes produced are identical to [`ZipFile::to_buffer`].

use crate::error::{Result, ZipError};
use crate::options::ArchiveOptions;
use crate::zipfile::{persist_atomically, ZipFile};
use std::io;
use std::path::Path;
use tracing::debug;

/// Progress notifications from [`ZipFile::to_buffer_async`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerializeEvent {
    /// Serialization began
    Started { entries: usize },
    /// Entry `index` of `total` is about to be compressed
    EntryStarted {
        name: String,
        index: usize,
        total: usize,
    },
    /// Entry `index` of `total` has its payload ready
    EntryCompressed {
        name: String,
        index: usize,
        total: usize,
    },
    /// The archive is complete
    Finished { bytes: usize },
}

impl ZipFile {
    /// Open an archive file without blocking the runtime
    pub async fn open_async<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_async_with_options(path, ArchiveOptions::default()).await
    }

    pub async fn open_async_with_options<P: AsRef<Path>>(
        path: P,
        options: ArchiveOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ZipError::FileNotFound(path.to_path_buf()),
            _ => ZipError::Io(e),
        })?;
        debug!("opened {} ({} bytes)", path.display(), bytes.len());

        let mut zip = Self::from_bytes_with_options(bytes, options)?;
        zip.set_path(path);
        Ok(zip)
    }

    /// Serialize, reporting progress and yielding after every entry
    pub async fn to_buffer_async<F>(&mut self, mut progress: F) -> Result<Vec<u8>>
    where
        F: FnMut(SerializeEvent),
    {
        let archive = self.archive_mut();
        archive.ensure_loaded()?;
        let order = archive.write_order();
        let total = order.len();
        progress(SerializeEvent::Started { entries: total });

        let mut payloads = Vec::with_capacity(total);
        for (index, &idx) in order.iter().enumerate() {
            progress(SerializeEvent::EntryStarted {
                name: archive.entry_name_at(idx).to_string(),
                index,
                total,
            });
            payloads.push(archive.prepare_payload(idx)?);
            progress(SerializeEvent::EntryCompressed {
                name: archive.entry_name_at(idx).to_string(),
                index,
                total,
            });
            tokio::task::yield_now().await;
        }

        let bytes = archive.assemble(&order, payloads)?;
        progress(SerializeEvent::Finished { bytes: bytes.len() });
        Ok(bytes)
    }

    /// Serialize and atomically replace `path`
    pub async fn write_to_path_async<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        let bytes = self.to_buffer_async(|_| {}).await?;

        let target = path.clone();
        tokio::task::spawn_blocking(move || persist_atomically(&target, &bytes))
            .await
            .map_err(|e| ZipError::Io(io::Error::other(e)))??;

        self.set_path(&path);
        Ok(())
    }
}
