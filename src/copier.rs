use std::fs::{self, File, FileTimes};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use walkdir::WalkDir;

use crate::files::{is_directory_empty, is_housekeeping_dir};

/// Where a version copy would land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Absent,
    /// Exists but holds no files, e.g. left behind by an interrupted run.
    Empty,
    /// Holds at least one file; the copy must not touch it.
    Occupied,
}

impl Destination {
    pub fn inspect(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Destination::Absent);
        }
        if is_directory_empty(path)? {
            Ok(Destination::Empty)
        } else {
            Ok(Destination::Occupied)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CopyOutcome {
    Copied { files: usize, into_existing: bool },
    SkippedNotEmpty,
}

/// Copies every regular file from `src` into `dst`, keeping the relative
/// layout and timestamps. Only housekeeping directories are left out; exclude
/// globs narrow the rewrite, not the copy. A destination that already holds
/// files is left alone and reported as skipped.
pub fn copy_directory(src: &Path, dst: &Path) -> Result<CopyOutcome> {
    let destination = Destination::inspect(dst)?;
    if destination == Destination::Occupied {
        return Ok(CopyOutcome::SkippedNotEmpty);
    }

    fs::create_dir_all(dst).with_context(|| format!("creating {}", dst.display()))?;
    let mut files = 0usize;
    let walker = WalkDir::new(src)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !(entry.file_type().is_dir() && is_housekeeping_dir(entry))
        });

    for entry in walker {
        let entry = entry.with_context(|| format!("walking {}", src.display()))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("{} is outside {}", entry.path().display(), src.display()))?;
        let target = dst.join(rel);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("creating {}", target.display()))?;
        } else if file_type.is_file() {
            copy_file_with_times(entry.path(), &target)?;
            files += 1;
        } else {
            tracing::debug!("not copying special file {}", entry.path().display());
        }
    }

    Ok(CopyOutcome::Copied {
        files,
        into_existing: destination == Destination::Empty,
    })
}

/// `fs::copy` keeps permissions; access and modification times are applied
/// afterwards.
pub fn copy_file_with_times(src: &Path, dst: &Path) -> Result<()> {
    fs::copy(src, dst)
        .with_context(|| format!("copying {} -> {}", src.display(), dst.display()))?;
    let meta = fs::metadata(src).with_context(|| format!("metadata for {}", src.display()))?;
    let mut times = FileTimes::new();
    if let Ok(accessed) = meta.accessed() {
        times = times.set_accessed(accessed);
    }
    if let Ok(modified) = meta.modified() {
        times = times.set_modified(modified);
    }
    // Read-only sources produce read-only copies; unix accepts a read handle.
    File::options()
        .write(true)
        .open(dst)
        .or_else(|_| File::open(dst))
        .and_then(|file| file.set_times(times))
        .with_context(|| format!("setting timestamps on {}", dst.display()))?;
    Ok(())
}
