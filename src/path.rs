//! Entry name normalization and extraction path checks

use crate::error::{Result, ZipError};
use std::path::{Component, Path, PathBuf};

/// Canonical form of an entry name.
///
/// Backslashes become forward slashes, empty and `.` segments are dropped,
/// `..` pops the previous segment (or is dropped at the root), and a leading
/// slash is stripped. A trailing slash survives so directories stay directories.
pub fn normalize_name(name: &str) -> String {
    let unified = name.replace('\\', "/");
    let is_dir = unified.ends_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }

    let mut out = parts.join("/");
    if is_dir && !out.is_empty() {
        out.push('/');
    }
    out
}

fn has_drive_prefix(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Resolve `name` below `target` without touching the filesystem.
///
/// Fails with [`ZipError::PathEscapesTarget`] when the name is absolute,
/// carries a drive prefix, or climbs above `target` with `..`.
pub fn sanitize(target: &Path, name: &str) -> Result<PathBuf> {
    let escapes = || ZipError::PathEscapesTarget {
        name: name.to_string(),
        target: target.to_path_buf(),
    };

    let unified = name.replace('\\', "/");
    if unified.starts_with('/') || has_drive_prefix(&unified) {
        return Err(escapes());
    }

    let mut resolved = PathBuf::new();
    let mut depth = 0usize;
    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(escapes());
                }
                resolved.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return Err(escapes()),
        }
    }

    Ok(target.join(resolved))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_separators_and_dots() {
        assert_eq!(normalize_name("dir\\test.txt"), "dir/test.txt");
        assert_eq!(normalize_name("dir//test.txt"), "dir/test.txt");
        assert_eq!(normalize_name("./test.txt"), "test.txt");
        assert_eq!(normalize_name("/test.txt"), "test.txt");
        assert_eq!(normalize_name("a/b/c/d/../../test.txt"), "a/b/test.txt");
        assert_eq!(normalize_name("../../etc/passwd"), "etc/passwd");
        assert_eq!(normalize_name("dir/"), "dir/");
        assert_eq!(normalize_name("/"), "");
    }

    #[test]
    fn sanitize_keeps_paths_inside_target() {
        let target = Path::new("/tmp/out");
        assert_eq!(
            sanitize(target, "a/b.txt").unwrap(),
            PathBuf::from("/tmp/out/a/b.txt")
        );
        assert_eq!(
            sanitize(target, "a/../b.txt").unwrap(),
            PathBuf::from("/tmp/out/b.txt")
        );
        assert_eq!(sanitize(target, "dir/").unwrap(), PathBuf::from("/tmp/out/dir"));
    }

    #[cfg(unix)]
    #[test]
    fn sanitize_allows_colons_inside_names() {
        let target = Path::new("/tmp/out");
        assert_eq!(
            sanitize(target, "logs/2024-01-01T10:00.log").unwrap(),
            PathBuf::from("/tmp/out/logs/2024-01-01T10:00.log")
        );
        assert_eq!(
            sanitize(target, "ab:cd.txt").unwrap(),
            PathBuf::from("/tmp/out/ab:cd.txt")
        );
    }

    #[test]
    fn sanitize_rejects_escapes() {
        let target = Path::new("/tmp/out");
        for name in [
            "../../etc/evil",
            "a/../../evil",
            "/etc/passwd",
            "..\\..\\evil.dll",
            "C:/Windows/evil.dll",
            "d:evil.dll",
        ] {
            assert!(
                matches!(sanitize(target, name), Err(ZipError::PathEscapesTarget { .. })),
                "{} was accepted",
                name
            );
        }
    }
}
