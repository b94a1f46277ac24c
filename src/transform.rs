use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use time::OffsetDateTime;
use time::macros::format_description;

use crate::encoding::{DecodedText, EncodingSource, EncodingStrategy};
use crate::files::FileEntry;
use crate::rewrite::Rewrite;

pub struct TransformResult {
    pub decoded: DecodedText,
    pub rewrite: Rewrite,
}

/// Reads and decodes `entry`. Returns `None` for suspected binaries.
pub fn read_decoded(entry: &FileEntry, encoding: &EncodingStrategy) -> Result<Option<DecodedText>> {
    if entry.is_probably_binary {
        tracing::debug!(
            "skipping {} ({} bytes, suspected binary file)",
            entry.path.display(),
            entry.len
        );
        return Ok(None);
    }

    let bytes =
        fs::read(&entry.path).with_context(|| format!("failed to read {}", entry.path.display()))?;
    let decoded = encoding.decode(&bytes);
    if decoded.had_errors {
        tracing::warn!(
            "decoding errors in {} ({} via {}); continuing",
            entry.path.display(),
            decoded.encoding.name(),
            decoded.source
        );
    } else if decoded.source != EncodingSource::Utf8 {
        tracing::debug!(
            "reading {} as {} ({})",
            entry.path.display(),
            decoded.encoding.name(),
            decoded.source
        );
    }
    Ok(Some(decoded))
}

/// Decodes `entry` and hands the text to `transformer`. Returns `None` for
/// suspected binaries and for files with nothing to change.
pub fn run_transform<F>(
    entry: &FileEntry,
    encoding: &EncodingStrategy,
    transformer: F,
) -> Result<Option<TransformResult>>
where
    F: FnOnce(&DecodedText) -> Rewrite,
{
    let Some(decoded) = read_decoded(entry, encoding)? else {
        return Ok(None);
    };
    let rewrite = transformer(&decoded);
    if !rewrite.is_changed() {
        return Ok(None);
    }
    Ok(Some(TransformResult { decoded, rewrite }))
}

/// Writes the rewritten text in the file's original encoding, after an
/// optional timestamped backup. Returns the backup path.
pub fn apply_transform(
    entry: &FileEntry,
    result: &TransformResult,
    create_backup: bool,
) -> Result<Option<PathBuf>> {
    let (encoded, had_errors) = result.decoded.encode_like(&result.rewrite.text);
    if had_errors {
        tracing::warn!(
            "encoding fallback occurred when writing {}; output may be lossy",
            entry.path.display()
        );
    }
    let backup = if create_backup {
        Some(create_backup_file(&entry.path)?)
    } else {
        None
    };
    write_via_temp(&entry.path, &encoded)
        .with_context(|| format!("writing {}", entry.path.display()))?;
    Ok(backup)
}

/// Copies `path` to `<path>.bak.<YYYYMMDD_HHMMSS>` (local time), appending
/// `.N` if a backup from the same second exists.
pub fn create_backup_file(path: &Path) -> Result<PathBuf> {
    let stamp = backup_stamp(now_local())?;
    let mut attempt = 0usize;
    loop {
        let candidate = backup_candidate(path, &stamp, attempt);
        if !candidate.exists() {
            fs::copy(path, &candidate)
                .with_context(|| format!("creating backup {}", candidate.display()))?;
            return Ok(candidate);
        }
        attempt += 1;
    }
}

fn now_local() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn backup_stamp(at: OffsetDateTime) -> Result<String> {
    let format = format_description!("[year][month][day]_[hour][minute][second]");
    Ok(at.format(format)?)
}

fn backup_candidate(path: &Path, stamp: &str, index: usize) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak.");
    name.push(stamp);
    if index > 0 {
        name.push(format!(".{index}"));
    }
    PathBuf::from(name)
}

/// True for names produced by [`create_backup_file`].
pub fn is_backup_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
        return false;
    };
    let Some((_, suffix)) = name.rsplit_once(".bak.") else {
        return false;
    };
    let (stamp, counter) = match suffix.split_once('.') {
        Some((stamp, counter)) => (stamp, Some(counter)),
        None => (suffix, None),
    };
    let stamp_ok = stamp.len() == 15
        && stamp.char_indices().all(|(idx, ch)| {
            if idx == 8 {
                ch == '_'
            } else {
                ch.is_ascii_digit()
            }
        });
    let counter_ok =
        counter.is_none_or(|c| !c.is_empty() && c.chars().all(|ch| ch.is_ascii_digit()));
    stamp_ok && counter_ok
}

fn write_via_temp(path: &Path, data: &[u8]) -> Result<()> {
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let unique = format!(
        ".woda-upgrade-tmp-{}-{}",
        std::process::id(),
        OffsetDateTime::now_utc().unix_timestamp_nanos()
    );
    let temp_path = base_dir.join(unique);
    {
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("creating temp file {}", temp_path.display()))?;
        file.write_all(data)
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;
        file.sync_all()
            .with_context(|| format!("syncing temp file {}", temp_path.display()))?;
    }
    if let Ok(meta) = fs::metadata(path) {
        if let Err(err) = fs::set_permissions(&temp_path, meta.permissions()) {
            tracing::debug!("cannot copy permissions to {}: {err}", temp_path.display());
        }
    }
    fs::rename(&temp_path, path).or_else(|err| {
        let _ = fs::remove_file(&temp_path);
        Err(err).with_context(|| format!("replacing {}", path.display()))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::SpanChange;
    use tempfile::tempdir;
    use time::macros::datetime;

    fn entry_for(path: &Path) -> FileEntry {
        FileEntry {
            path: path.to_path_buf(),
            len: fs::metadata(path).map(|m| m.len()).unwrap_or_default(),
            is_probably_binary: false,
        }
    }

    fn upper(decoded: &DecodedText) -> Rewrite {
        let text = decoded.text.to_uppercase();
        let changes = if text == decoded.text {
            Vec::new()
        } else {
            vec![SpanChange {
                line: 1,
                old: decoded.text.clone(),
                new: text.clone(),
            }]
        };
        Rewrite { text, changes }
    }

    #[test]
    fn backup_name_uses_timestamp_suffix() {
        let stamp = backup_stamp(datetime!(2024-03-05 07:08:09 UTC)).expect("stamp");
        assert_eq!(stamp, "20240305_070809");
        let candidate = backup_candidate(Path::new("/a/b/file.js"), &stamp, 0);
        assert_eq!(candidate, PathBuf::from("/a/b/file.js.bak.20240305_070809"));
        let second = backup_candidate(Path::new("/a/b/file.js"), &stamp, 2);
        assert_eq!(second, PathBuf::from("/a/b/file.js.bak.20240305_070809.2"));
    }

    #[test]
    fn backup_detector_matches_generated_names() {
        assert!(is_backup_file(Path::new("x/file.js.bak.20240305_070809")));
        assert!(is_backup_file(Path::new("file.js.bak.20240305_070809.3")));
        assert!(!is_backup_file(Path::new("file.js.bak")));
        assert!(!is_backup_file(Path::new("file.js.bak.2024")));
        assert!(!is_backup_file(Path::new("file.js.bak.20240305-070809")));
        assert!(!is_backup_file(Path::new("notes.bak.md")));
    }

    #[test]
    fn unchanged_files_yield_none() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("a.js");
        fs::write(&path, "ALREADY UPPER").expect("write");
        let result =
            run_transform(&entry_for(&path), &EncodingStrategy::default(), upper).expect("run");
        assert!(result.is_none());
    }

    #[test]
    fn apply_writes_text_and_backup() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("a.js");
        fs::write(&path, "lower").expect("write");
        let entry = entry_for(&path);
        let result = run_transform(&entry, &EncodingStrategy::default(), upper)
            .expect("run")
            .expect("changed");

        let backup = apply_transform(&entry, &result, true)
            .expect("apply")
            .expect("backup path");
        assert_eq!(fs::read_to_string(&path).expect("read"), "LOWER");
        assert_eq!(fs::read_to_string(&backup).expect("read backup"), "lower");
        assert!(is_backup_file(&backup));
    }

    #[test]
    fn apply_without_backup_leaves_no_sibling() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("a.js");
        fs::write(&path, "lower").expect("write");
        let entry = entry_for(&path);
        let result = run_transform(&entry, &EncodingStrategy::default(), upper)
            .expect("run")
            .expect("changed");

        assert!(apply_transform(&entry, &result, false).expect("apply").is_none());
        let siblings = fs::read_dir(temp.path()).expect("list").count();
        assert_eq!(siblings, 1);
    }

    #[test]
    fn binary_files_are_not_read() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("a.js");
        fs::write(&path, "lower").expect("write");
        let mut entry = entry_for(&path);
        entry.is_probably_binary = true;
        let result = run_transform(&entry, &EncodingStrategy::default(), upper).expect("run");
        assert!(result.is_none());
    }
}
