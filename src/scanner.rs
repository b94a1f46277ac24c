use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::UnitFailure;
use crate::files::{EXCLUDE_DIRS, FileFilter};
use crate::version::VersionToken;

/// A directory whose basename is a version token.
#[derive(Debug, Clone, Serialize)]
pub struct VersionDir {
    pub path: PathBuf,
    pub version: VersionToken,
    /// Separators between the root and this directory; a direct child of the
    /// root has depth 1.
    pub depth: usize,
}

/// Every version directory at most `max_depth` levels below `root`
/// (0 means unlimited). Directories past the limit are never opened.
pub fn find_version_dirs(
    root: &Path,
    max_depth: usize,
    filter: &FileFilter,
    failures: &mut Vec<UnitFailure>,
) -> Vec<VersionDir> {
    let mut walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
    if max_depth > 0 {
        walker = walker.max_depth(max_depth);
    }

    let mut found = Vec::new();
    for entry in walker
        .into_iter()
        .filter_entry(|entry| entry.file_type().is_dir() && filter.descend_into(entry))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                tracing::warn!("cannot scan {}: {err}", path.display());
                failures.push(UnitFailure::new(path, &err.into()));
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        if let Some(version) = VersionToken::from_dir_name(entry.path()) {
            tracing::trace!(depth = entry.depth(), "version dir {}", entry.path().display());
            found.push(VersionDir {
                depth: entry.depth(),
                path: entry.into_path(),
                version,
            });
        }
    }
    found
}

/// First-level version directories of `root`, oldest first.
pub fn list_versions(root: &Path) -> Result<Vec<VersionToken>> {
    let mut versions = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("listing {}", root.display()))? {
        let entry = entry.with_context(|| format!("listing {}", root.display()))?;
        if !entry.file_type().map(|ty| ty.is_dir()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name();
        if name.to_str().is_some_and(|name| EXCLUDE_DIRS.contains(&name)) {
            continue;
        }
        if let Some(version) = VersionToken::from_dir_name(&entry.path()) {
            versions.push(version);
        }
    }
    versions.sort();
    Ok(versions)
}

/// The greatest first-level version under `root`, with how many were found.
pub fn detect_latest_version(root: &Path) -> Result<Option<(VersionToken, usize)>> {
    let versions = list_versions(root)?;
    let count = versions.len();
    Ok(versions.into_iter().last().map(|latest| (latest, count)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn mkdirs(root: &Path, dirs: &[&str]) {
        for dir in dirs {
            fs::create_dir_all(root.join(dir)).expect("mkdir");
        }
    }

    fn relative(root: &Path, found: &[VersionDir]) -> Vec<String> {
        found
            .iter()
            .map(|dir| {
                dir.path
                    .strip_prefix(root)
                    .expect("under root")
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn finds_version_directories_at_any_depth() {
        let temp = tempdir().expect("temp dir");
        mkdirs(
            temp.path(),
            &["3.1.0/src", "a/b/2.0.0.1", "a/not.a.version", "a/1.2"],
        );
        let found = find_version_dirs(temp.path(), 0, &FileFilter::default(), &mut Vec::new());
        assert_eq!(relative(temp.path(), &found), ["3.1.0", "a/b/2.0.0.1"]);
        assert_eq!(found[1].depth, 3);
    }

    #[test]
    fn depth_limit_prunes_descent() {
        let temp = tempdir().expect("temp dir");
        mkdirs(temp.path(), &["1.0.0", "a/2.0.0", "a/b/3.0.0"]);
        let filter = FileFilter::default();
        let shallow = find_version_dirs(temp.path(), 1, &filter, &mut Vec::new());
        assert_eq!(relative(temp.path(), &shallow), ["1.0.0"]);
        let two = find_version_dirs(temp.path(), 2, &filter, &mut Vec::new());
        assert_eq!(relative(temp.path(), &two), ["1.0.0", "a/2.0.0"]);
    }

    #[test]
    fn housekeeping_directories_are_skipped() {
        let temp = tempdir().expect("temp dir");
        mkdirs(
            temp.path(),
            &["node_modules/pkg/1.0.0", ".git/refs/2.0.0", "lib/3.0.0"],
        );
        let found = find_version_dirs(temp.path(), 0, &FileFilter::default(), &mut Vec::new());
        assert_eq!(relative(temp.path(), &found), ["lib/3.0.0"]);
    }

    #[test]
    fn latest_version_uses_numeric_order() {
        let temp = tempdir().expect("temp dir");
        mkdirs(temp.path(), &["3.9.0", "3.10.0", "3.2.0.1", "nested/9.9.9"]);
        fs::write(temp.path().join("4.0.0"), "a file, not a dir").expect("write");
        let (latest, count) = detect_latest_version(temp.path())
            .expect("detect")
            .expect("some version");
        assert_eq!(latest.as_str(), "3.10.0");
        assert_eq!(count, 3);
    }

    #[test]
    fn latest_version_is_none_without_candidates() {
        let temp = tempdir().expect("temp dir");
        mkdirs(temp.path(), &["src"]);
        assert!(detect_latest_version(temp.path()).expect("detect").is_none());
    }
}
