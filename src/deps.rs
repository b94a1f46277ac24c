use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use regex::Regex;
use serde::Serialize;
use walkdir::WalkDir;

use crate::encoding::EncodingStrategy;
use crate::error::UnitFailure;
use crate::files::{FileEntry, FileFilter, collect_files, is_housekeeping_dir};
use crate::job::{JobOptions, JobResult, run_rewrite};
use crate::rewrite::{LineCounter, Rewrite, SpanChange};
use crate::scanner::find_version_dirs;
use crate::scope::EAMD_PATH_PREFIX;
use crate::transform::read_decoded;
use crate::version::{VersionToken, numeric_parts};

const DEPENDENCIES_BLOCK: &str = r"static\s+get\s+dependencies\s*\(\s*\)\s*\{\s*return\s*\[([^\]]*)\]";
const QUOTED: &str = r#"["']([^"'\n]*)["']"#;
const QUOTED_EAMD_PATH: &str = r#"["'](/EAMD\.ucp/[^"'<>\s]*)["']"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyStatus {
    ComponentMissing,
    VersionMissing,
    VersionExists,
}

impl fmt::Display for DependencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DependencyStatus::ComponentMissing => "component missing",
            DependencyStatus::VersionMissing => "version missing",
            DependencyStatus::VersionExists => "version exists",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutdatedDependency {
    pub file: PathBuf,
    pub dependency: String,
    pub component: String,
    pub pinned: String,
    pub status: DependencyStatus,
}

#[derive(Debug, Serialize)]
pub struct DepsReport {
    pub target: VersionToken,
    pub source_files: Vec<PathBuf>,
    pub outdated: Vec<OutdatedDependency>,
    pub failures: Vec<UnitFailure>,
}

impl DepsReport {
    pub fn updatable(&self) -> impl Iterator<Item = &OutdatedDependency> {
        self.outdated
            .iter()
            .filter(|dep| dep.status == DependencyStatus::VersionExists)
    }
}

#[derive(Debug, Clone)]
pub struct DepsRequest {
    pub root: PathBuf,
    pub target: VersionToken,
    /// Where components are looked up; defaults to `root`.
    pub lookup: Option<PathBuf>,
    pub all_versions: bool,
}

struct DependencyExtractor {
    block: Regex,
    quoted: Regex,
    eamd: Regex,
}

impl DependencyExtractor {
    fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|err| anyhow!("invalid dependency pattern: {err}"))
        };
        Ok(Self {
            block: compile(DEPENDENCIES_BLOCK)?,
            quoted: compile(QUOTED)?,
            eamd: compile(QUOTED_EAMD_PATH)?,
        })
    }

    /// Entries of a `static get dependencies()` block when the file has one,
    /// otherwise every quoted `/EAMD.ucp/` path.
    fn extract(&self, content: &str) -> Vec<String> {
        let block = self.block.captures(content).and_then(|caps| caps.get(1));
        let strings: Vec<String> = match block {
            Some(block) => self
                .quoted
                .captures_iter(block.as_str())
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
                .collect(),
            None => self
                .eamd
                .captures_iter(content)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
                .collect(),
        };
        strings
            .into_iter()
            .filter(|dep| dep.contains(EAMD_PATH_PREFIX))
            .collect()
    }
}

/// `(component, version)` from `.../<Component>/<version>/<file>`.
pub fn split_dependency(dependency: &str) -> Option<(&str, &str)> {
    let parts: Vec<&str> = dependency.split('/').collect();
    if parts.len() < 5 {
        return None;
    }
    let version = parts[parts.len() - 2];
    let component = parts[parts.len() - 3];
    if component.is_empty() || numeric_parts(version).is_none() {
        return None;
    }
    Some((component, version))
}

/// The dependency with its version segment replaced by `target`.
pub fn updated_dependency(dependency: &str, target: &VersionToken) -> Option<String> {
    split_dependency(dependency)?;
    let mut parts: Vec<&str> = dependency.split('/').collect();
    let idx = parts.len() - 2;
    parts[idx] = target.as_str();
    Some(parts.join("/"))
}

fn is_older(pinned: &str, target: &VersionToken) -> bool {
    numeric_parts(pinned).is_some_and(|parts| parts.as_slice() < target.parts())
}

/// Tracked files inside the version folders being audited.
fn source_files(
    request: &DepsRequest,
    filter: &FileFilter,
    failures: &mut Vec<UnitFailure>,
) -> Vec<FileEntry> {
    let folders = find_version_dirs(&request.root, 0, filter, failures);
    let mut seen = BTreeSet::new();
    let mut files = Vec::new();
    for folder in folders {
        if !request.all_versions && folder.version.as_str() != request.target.as_str() {
            continue;
        }
        for entry in collect_files(&folder.path, filter, failures) {
            if seen.insert(entry.path.clone()) {
                files.push(entry);
            }
        }
    }
    files
}

/// Resolves component presence by walking the lookup tree once per component.
struct ComponentIndex<'a> {
    root: &'a Path,
    target: &'a VersionToken,
    cache: HashMap<String, DependencyStatus>,
}

impl<'a> ComponentIndex<'a> {
    fn new(root: &'a Path, target: &'a VersionToken) -> Self {
        Self {
            root,
            target,
            cache: HashMap::new(),
        }
    }

    fn status(&mut self, component: &str) -> DependencyStatus {
        if let Some(status) = self.cache.get(component) {
            return *status;
        }
        let status = self.lookup(component);
        self.cache.insert(component.to_string(), status);
        status
    }

    fn lookup(&self, component: &str) -> DependencyStatus {
        let mut found = false;
        for entry in WalkDir::new(self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.file_type().is_dir() && !is_housekeeping_dir(entry))
            .filter_map(Result::ok)
        {
            let relative = entry.path().strip_prefix(self.root).unwrap_or(entry.path());
            let names_component = relative
                .components()
                .any(|part| part.as_os_str() == component);
            if !names_component {
                continue;
            }
            found = true;
            if entry.path().join(self.target.as_str()).is_dir() {
                return DependencyStatus::VersionExists;
            }
        }
        if found {
            DependencyStatus::VersionMissing
        } else {
            DependencyStatus::ComponentMissing
        }
    }
}

/// Finds pinned `/EAMD.ucp/` dependencies older than the target version and
/// checks whether the target version exists for each component.
pub fn audit(
    request: &DepsRequest,
    filter: &FileFilter,
    encoding: &EncodingStrategy,
) -> Result<DepsReport> {
    let extractor = DependencyExtractor::new()?;
    let mut failures = Vec::new();
    let files = source_files(request, filter, &mut failures);
    let lookup_root = request.lookup.as_deref().unwrap_or(&request.root);
    let mut index = ComponentIndex::new(lookup_root, &request.target);
    let mut outdated = Vec::new();

    for entry in &files {
        let decoded = match read_decoded(entry, encoding) {
            Ok(Some(decoded)) => decoded,
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!("cannot read {}: {err:#}", entry.path.display());
                failures.push(UnitFailure::new(&entry.path, &err));
                continue;
            }
        };
        let mut seen = BTreeSet::new();
        for dependency in extractor.extract(&decoded.text) {
            let Some((component, pinned)) = split_dependency(&dependency) else {
                continue;
            };
            if !is_older(pinned, &request.target) || !seen.insert(dependency.clone()) {
                continue;
            }
            let status = index.status(component);
            tracing::debug!("{dependency} in {}: {status}", entry.path.display());
            outdated.push(OutdatedDependency {
                file: entry.path.clone(),
                component: component.to_string(),
                pinned: pinned.to_string(),
                dependency,
                status,
            });
        }
    }

    Ok(DepsReport {
        target: request.target.clone(),
        source_files: files.into_iter().map(|entry| entry.path).collect(),
        outdated,
        failures,
    })
}

/// Rewrites every updatable dependency to the report's target version.
pub fn apply_updates(report: &DepsReport, options: &JobOptions) -> JobResult {
    let mut per_file: BTreeMap<&Path, Vec<(&str, String)>> = BTreeMap::new();
    for dep in report.updatable() {
        if let Some(updated) = updated_dependency(&dep.dependency, &report.target) {
            per_file
                .entry(dep.file.as_path())
                .or_default()
                .push((dep.dependency.as_str(), updated));
        }
    }

    let mut failures = Vec::new();
    let files: Vec<FileEntry> = per_file
        .keys()
        .filter_map(|path| match FileEntry::inspect(path) {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!("cannot read {}: {err:#}", path.display());
                failures.push(UnitFailure::new(*path, &err));
                None
            }
        })
        .collect();
    let mut result = run_rewrite(&files, options, |entry, decoded| {
        let replacements = per_file
            .get(&entry.path.as_path())
            .map(Vec::as_slice)
            .unwrap_or_default();
        replace_literals(&decoded.text, replacements)
    });
    result.failures.extend(failures);
    result
}

/// Literal, non-overlapping replacement of each `(old, new)` pair.
fn replace_literals(content: &str, replacements: &[(&str, String)]) -> Rewrite {
    let mut text = content.to_string();
    let mut changes = Vec::new();
    for (old, new) in replacements {
        let mut rebuilt = String::with_capacity(text.len());
        let mut last = 0;
        let mut lines = LineCounter::new(&text);
        for (start, matched) in text.match_indices(old) {
            changes.push(SpanChange {
                line: lines.line_at(start),
                old: matched.to_string(),
                new: new.clone(),
            });
            rebuilt.push_str(&text[last..start]);
            rebuilt.push_str(new);
            last = start + matched.len();
        }
        rebuilt.push_str(&text[last..]);
        text = rebuilt;
    }
    Rewrite { text, changes }
}
