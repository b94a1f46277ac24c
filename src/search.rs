use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::component::component_path_pattern;
use crate::encoding::EncodingStrategy;
use crate::error::UnitFailure;
use crate::files::{FileFilter, collect_files};
use crate::rewrite::LineCounter;
use crate::scope::ScopeToken;
use crate::transform::read_decoded;

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub file_name: String,
    pub relative_path: PathBuf,
    pub line: usize,
    pub matched: String,
}

#[derive(Debug, Default, Serialize)]
pub struct SearchReport {
    pub files_scanned: usize,
    pub hits: Vec<SearchHit>,
    pub failures: Vec<UnitFailure>,
}

/// Case-insensitive lookup of `<Component>.component.xml` paths under
/// `root`. With `version`, only hits whose text contains it are kept.
pub fn search_component(
    root: &Path,
    component: &ScopeToken,
    version: Option<&str>,
    filter: &FileFilter,
    encoding: &EncodingStrategy,
) -> Result<SearchReport> {
    let pattern = component_path_pattern(component, true)?;
    let version = version.map(str::trim).filter(|v| !v.is_empty());
    let mut report = SearchReport::default();
    let files = collect_files(root, filter, &mut report.failures);

    for entry in &files {
        report.files_scanned += 1;
        let decoded = match read_decoded(entry, encoding) {
            Ok(Some(decoded)) => decoded,
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!("cannot search {}: {err:#}", entry.path.display());
                report.failures.push(UnitFailure::new(&entry.path, &err));
                continue;
            }
        };
        let mut lines = LineCounter::new(&decoded.text);
        let found: Vec<_> = pattern
            .find_iter(&decoded.text)
            .filter(|hit| version.is_none_or(|v| hit.as_str().contains(v)))
            .map(|hit| (lines.line_at(hit.start()), hit.as_str().to_string()))
            .collect();
        if found.is_empty() {
            continue;
        }

        let relative_path = entry
            .path
            .strip_prefix(root)
            .unwrap_or(&entry.path)
            .to_path_buf();
        let file_name = entry
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        report
            .hits
            .extend(found.into_iter().map(|(line, matched)| SearchHit {
                file_name: file_name.clone(),
                relative_path: relative_path.clone(),
                line,
                matched,
            }));
    }

    tracing::debug!(
        "{} hit(s) for {} in {} file(s)",
        report.hits.len(),
        component,
        report.files_scanned
    );
    Ok(report)
}
