//! Writing entries out to the filesystem

use crate::archive::Archive;
use crate::entry::ZipEntry;
use crate::error::{Result, ZipError};
use crate::options::ExtractOptions;
use crate::path::sanitize;
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Outcome of a batch extraction
#[derive(Debug, Default)]
pub struct ExtractReport {
    /// Names written successfully
    pub extracted: Vec<String>,
    /// Entries skipped because their content could not be recovered
    pub failed: Vec<(String, ZipError)>,
}

impl ExtractReport {
    /// Every entry made it to disk
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

struct Planned<'a> {
    entry: &'a ZipEntry,
    path: PathBuf,
}

fn check_overwrite(path: &Path, overwrite: bool) -> Result<()> {
    if path.is_dir() || (path.exists() && !overwrite) {
        return Err(ZipError::CannotOverwrite(path.to_path_buf()));
    }
    Ok(())
}

/// Two entries resolving to the same file clash unless overwrite is set
fn claim_target(claimed: &mut HashSet<PathBuf>, path: &Path, overwrite: bool) -> Result<()> {
    if !claimed.insert(path.to_path_buf()) && !overwrite {
        return Err(ZipError::CannotOverwrite(path.to_path_buf()));
    }
    Ok(())
}

fn modified_time(entry: &ZipEntry) -> Option<SystemTime> {
    let secs = entry.time().to_unix_seconds()?;
    let secs = u64::try_from(secs).ok()?;
    SystemTime::UNIX_EPOCH.checked_add(Duration::from_secs(secs))
}

#[cfg(unix)]
fn apply_permissions(path: &Path, entry: &ZipEntry) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = entry.header().unix_mode() {
        let bits = mode & 0o7777;
        if bits != 0 {
            fs::set_permissions(path, fs::Permissions::from_mode(bits))?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn apply_permissions(_path: &Path, _entry: &ZipEntry) -> Result<()> {
    Ok(())
}

fn write_file(path: &Path, data: &[u8], entry: &ZipEntry, keep_permissions: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, data)?;

    if let Some(mtime) = modified_time(entry) {
        let file = File::options().write(true).open(path)?;
        file.set_modified(mtime)?;
    }
    if keep_permissions {
        apply_permissions(path, entry)?;
    }
    debug!("extracted {} ({} bytes) to {}", entry.name(), data.len(), path.display());
    Ok(())
}

/// Extract one entry (real or synthetic directory) below `target`.
///
/// Directory entries extract every entry beneath them. All target paths are
/// validated before anything is written.
pub fn extract_entry(
    archive: &mut Archive,
    name: &str,
    target: &Path,
    options: &ExtractOptions,
) -> Result<()> {
    let is_dir = archive
        .directory(name)?
        .map(ZipEntry::is_directory)
        .ok_or_else(|| ZipError::EntryNotFound(name.to_string()))?;
    let password = options.password_bytes();

    if !is_dir {
        let entry = archive
            .entry(name)?
            .ok_or_else(|| ZipError::EntryNotFound(name.to_string()))?;
        let relative = match &options.rename_to {
            Some(rename) => rename.as_str(),
            None if options.maintain_path => entry.name(),
            None => entry.base_name(),
        };
        let path = sanitize(target, relative)?;
        check_overwrite(&path, options.overwrite)?;

        let data = entry.decompressed_data(password)?;
        return write_file(&path, &data, entry, options.keep_permissions);
    }

    let root = if options.maintain_path {
        sanitize(target, name)?
    } else {
        target.to_path_buf()
    };

    let children = archive.children(name)?;
    let mut plan = Vec::with_capacity(children.len());
    let mut claimed = HashSet::with_capacity(children.len());
    for child in children {
        let relative = if options.maintain_path {
            child.name()
        } else {
            &child.name()[name.len()..]
        };
        let path = sanitize(target, relative)?;
        if !child.is_directory() {
            check_overwrite(&path, options.overwrite)?;
            claim_target(&mut claimed, &path, options.overwrite)?;
        }
        plan.push(Planned { entry: child, path });
    }

    fs::create_dir_all(&root)?;
    for item in plan.iter().filter(|p| p.entry.is_directory()) {
        fs::create_dir_all(&item.path)?;
    }
    for item in plan.iter().filter(|p| !p.entry.is_directory()) {
        let data = item.entry.decompressed_data(password)?;
        write_file(&item.path, &data, item.entry, options.keep_permissions)?;
    }
    Ok(())
}

/// Extract every entry below `target`.
///
/// Path escapes and refused overwrites (including two entries landing on the
/// same file) abort before any byte is written.
/// Entries whose content fails (bad CRC, wrong password, unknown method) are
/// recorded in the report and the rest are still extracted. Format errors
/// such as a bad local header signature abort the batch.
pub fn extract_all(
    archive: &mut Archive,
    target: &Path,
    options: &ExtractOptions,
) -> Result<ExtractReport> {
    let password = options.password_bytes();
    let entries = archive.entries()?;

    let mut plan = Vec::with_capacity(entries.len());
    let mut claimed = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !options.maintain_path && entry.is_directory() {
            continue;
        }
        let relative = if options.maintain_path {
            entry.name()
        } else {
            entry.base_name()
        };
        let path = sanitize(target, relative)?;
        if !entry.is_directory() {
            check_overwrite(&path, options.overwrite)?;
            claim_target(&mut claimed, &path, options.overwrite)?;
        }
        plan.push(Planned { entry, path });
    }

    fs::create_dir_all(target)?;
    for item in plan.iter().filter(|p| p.entry.is_directory()) {
        fs::create_dir_all(&item.path)?;
    }

    let mut report = ExtractReport::default();
    for item in plan.iter().filter(|p| !p.entry.is_directory()) {
        match item.entry.decompressed_data(password) {
            Ok(data) => {
                write_file(&item.path, &data, item.entry, options.keep_permissions)?;
                report.extracted.push(item.entry.name().to_string());
            }
            Err(e) if e.is_content_error() => {
                warn!("skipping {}: {}", item.entry.name(), e);
                report.failed.push((item.entry.name().to_string(), e));
            }
            Err(e) => return Err(e),
        }
    }

    debug!(
        "extracted {} entries to {} ({} failed)",
        report.extracted.len(),
        target.display(),
        report.failed.len()
    );
    Ok(report)
}
