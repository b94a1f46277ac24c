use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::{DirEntry, WalkDir};

use crate::error::UnitFailure;

const BINARY_CHECK_BYTES: usize = 4096;

/// Build caches and tool metadata that are never scanned, copied or
/// rewritten.
pub const EXCLUDE_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "__pycache__",
    ".venv",
    "venv",
    ".idea",
    ".vscode",
];

pub const DEFAULT_EXTENSIONS: &[&str] = &["js", "html", "ts", "json", "xml"];

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub len: u64,
    pub is_probably_binary: bool,
}

impl FileEntry {
    pub fn inspect(path: &Path) -> Result<Self> {
        let (len, is_probably_binary) = inspect(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            len,
            is_probably_binary,
        })
    }

    pub fn extension(&self) -> &str {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
    }
}

/// Which files a job looks at.
#[derive(Debug, Clone)]
pub struct FileFilter {
    extensions: Vec<String>,
    exclude: Option<GlobSet>,
}

impl Default for FileFilter {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            exclude: None,
        }
    }
}

impl FileFilter {
    pub fn new(extensions: &[String], exclude_patterns: &[String]) -> Result<Self> {
        let extensions = if extensions.is_empty() {
            Self::default().extensions
        } else {
            extensions
                .iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect()
        };
        Ok(Self {
            extensions,
            exclude: build_exclude_globs(exclude_patterns)?,
        })
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn tracks(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.extensions
                    .iter()
                    .any(|tracked| tracked.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        self.exclude
            .as_ref()
            .is_some_and(|set| set.is_match(normalize_slashes(path).as_str()))
    }

    /// Directory pruning shared by the scanner and file walks.
    pub fn descend_into(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }
        if entry.file_type().is_dir() && is_housekeeping_dir(entry) {
            return false;
        }
        !self.is_excluded(entry.path())
    }
}

pub fn is_housekeeping_dir(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| EXCLUDE_DIRS.contains(&name))
}

/// Tracked files below `dir`, sorted by path. Entries that cannot be walked
/// or inspected are recorded in `failures` and skipped.
pub fn collect_files(
    dir: &Path,
    filter: &FileFilter,
    failures: &mut Vec<UnitFailure>,
) -> Vec<FileEntry> {
    let mut entries = Vec::new();
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| filter.descend_into(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(dir).to_path_buf();
                tracing::warn!("cannot read {}: {err}", path.display());
                failures.push(UnitFailure::new(path, &err.into()));
                continue;
            }
        };
        if !entry.file_type().is_file() || !filter.tracks(entry.path()) {
            continue;
        }
        let path = entry.into_path();
        match FileEntry::inspect(&path) {
            Ok(file) => entries.push(file),
            Err(err) => {
                tracing::warn!("cannot read {}: {err:#}", path.display());
                failures.push(UnitFailure::new(path, &err));
            }
        }
    }

    entries
}

fn inspect(path: &Path) -> Result<(u64, bool)> {
    let len = fs::metadata(path)
        .with_context(|| format!("metadata for {}", path.display()))?
        .len();
    Ok((len, detect_binary(path)?))
}

/// True when no regular file exists anywhere below `dir`. Empty
/// subdirectories don't count.
pub fn is_directory_empty(dir: &Path) -> Result<bool> {
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.with_context(|| format!("walking {}", dir.display()))?;
        if !entry.file_type().is_dir() {
            return Ok(false);
        }
    }
    Ok(true)
}

fn normalize_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn detect_binary(path: &Path) -> Result<bool> {
    let mut file = fs::File::open(path)
        .with_context(|| format!("opening '{}' for binary detection", path.display()))?;
    let mut buf = [0u8; BINARY_CHECK_BYTES];
    let read = file.read(&mut buf)?;
    // UTF-16 text is full of NULs; trust its BOM.
    if buf[..read].starts_with(&[0xFF, 0xFE]) || buf[..read].starts_with(&[0xFE, 0xFF]) {
        return Ok(false);
    }
    Ok(buf[..read].contains(&0))
}

fn build_exclude_globs(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).map_err(|err| anyhow!("invalid exclude glob '{pattern}': {err}"))?;
        builder.add(glob);
    }

    builder
        .build()
        .map(Some)
        .map_err(|err| anyhow!("unable to build exclude globs: {err}"))
}
