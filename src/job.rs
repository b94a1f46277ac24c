use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::component::{ComponentPathReplacer, validate_replacement};
use crate::copier::{CopyOutcome, Destination, copy_directory};
use crate::encoding::{DecodedText, EncodingStrategy};
use crate::error::{UnitFailure, ValidationError};
use crate::files::{FileEntry, FileFilter, collect_files};
use crate::rewrite::{CommentPolicy, Rewrite, ScopedRewriter};
use crate::scanner::find_version_dirs;
use crate::scope::ScopeToken;
use crate::transform::{apply_transform, run_transform};
use crate::version::VersionToken;

pub const DEFAULT_SUBDIRS: &[&str] = &["src", "test"];

/// Settings shared by every mutating job.
#[derive(Debug, Clone)]
pub struct JobOptions {
    pub dry_run: bool,
    pub create_backup: bool,
    pub filter: FileFilter,
    pub encoding: EncodingStrategy,
    pub comment_masking: bool,
    pub capture_diffs: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            dry_run: true,
            create_backup: true,
            filter: FileFilter::default(),
            encoding: EncodingStrategy::default(),
            comment_masking: true,
            capture_diffs: false,
        }
    }
}

/// Raw user input for an upgrade, before validation.
#[derive(Debug, Clone, Default)]
pub struct UpgradeRequest {
    pub entry_path: Option<PathBuf>,
    pub old_version: String,
    pub new_version: String,
    pub max_depth: usize,
    /// Component name to scope by instead of the entry path's last segment.
    pub scope: Option<String>,
    /// Subtrees of each copied version folder to rewrite; empty means the
    /// whole folder.
    pub subdirs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UpgradeJob {
    pub entry_path: PathBuf,
    pub old_version: VersionToken,
    pub new_version: VersionToken,
    pub max_depth: usize,
    pub scope: ScopeToken,
    pub subdirs: Vec<String>,
    pub options: JobOptions,
}

impl UpgradeJob {
    pub fn new(request: UpgradeRequest, options: JobOptions) -> Result<Self, ValidationError> {
        let entry_path = request
            .entry_path
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or(ValidationError::MissingField("entry path"))?;
        if request.old_version.trim().is_empty() {
            return Err(ValidationError::MissingField("current version"));
        }
        if request.new_version.trim().is_empty() {
            return Err(ValidationError::MissingField("new version"));
        }
        if !entry_path.is_dir() {
            return Err(ValidationError::NotADirectory(entry_path));
        }
        let old_version = VersionToken::parse("current version", &request.old_version)?;
        let new_version = VersionToken::parse("new version", &request.new_version)?;
        if old_version.as_str() == new_version.as_str() {
            return Err(ValidationError::SameVersion(old_version.to_string()));
        }
        let scope = match request.scope.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => ScopeToken::from_component_name(name)?,
            _ => ScopeToken::from_entry_path(&entry_path)?,
        };
        Ok(Self {
            entry_path,
            old_version,
            new_version,
            max_depth: request.max_depth,
            scope,
            subdirs: request.subdirs,
            options,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ComponentJob {
    pub root: PathBuf,
    pub component: ScopeToken,
    pub replacement: String,
    pub options: JobOptions,
}

impl ComponentJob {
    pub fn new(
        root: Option<PathBuf>,
        component_name: &str,
        replacement: &str,
        options: JobOptions,
    ) -> Result<Self, ValidationError> {
        let root = root
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or(ValidationError::MissingField("component directory"))?;
        if component_name.trim().is_empty() {
            return Err(ValidationError::MissingField("component name"));
        }
        if !root.is_dir() {
            return Err(ValidationError::NotADirectory(root));
        }
        let replacement = validate_replacement(replacement)?;
        let component = ScopeToken::from_component_name(component_name)?;
        Ok(Self {
            root,
            component,
            replacement,
            options,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Idle,
    Scanning,
    Copying,
    Rewriting,
    Summarizing,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FolderStatus {
    Copied { files: usize, into_existing: bool },
    WouldCopy { into_existing: bool },
    SkippedNotEmpty,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FolderOutcome {
    pub source: PathBuf,
    pub destination: PathBuf,
    #[serde(flatten)]
    pub status: FolderStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModifiedFile {
    pub path: PathBuf,
    pub replacements: usize,
    pub backup: Option<PathBuf>,
}

/// A replacement that a dry run would make.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeRecord {
    pub path: PathBuf,
    pub line: usize,
    pub old: String,
    pub new: String,
}

#[derive(Debug, Clone)]
pub struct FilePreview {
    pub path: PathBuf,
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub dry_run: bool,
    pub folders: Vec<FolderOutcome>,
    pub files_scanned: usize,
    pub files_modified: usize,
    pub modified: Vec<ModifiedFile>,
    pub changes: Vec<ChangeRecord>,
    pub failures: Vec<UnitFailure>,
    #[serde(skip)]
    pub previews: Vec<FilePreview>,
}

impl JobResult {
    fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            folders: Vec::new(),
            files_scanned: 0,
            files_modified: 0,
            modified: Vec::new(),
            changes: Vec::new(),
            failures: Vec::new(),
            previews: Vec::new(),
        }
    }

    /// Folders copied, or that would be copied in a dry run.
    pub fn folders_processed(&self) -> usize {
        self.folders
            .iter()
            .filter(|folder| {
                matches!(
                    folder.status,
                    FolderStatus::Copied { .. } | FolderStatus::WouldCopy { .. }
                )
            })
            .count()
    }

    pub fn folders_skipped(&self) -> usize {
        self.folders
            .iter()
            .filter(|folder| matches!(folder.status, FolderStatus::SkippedNotEmpty))
            .count()
    }
}

/// Per-job state: the current phase and the result being built. A run goes
/// over every candidate folder and file; failures are recorded per unit and
/// only an invalid pattern stops it.
struct Runner<'a> {
    options: &'a JobOptions,
    phase: JobPhase,
    result: JobResult,
}

impl<'a> Runner<'a> {
    fn new(options: &'a JobOptions) -> Self {
        Self {
            options,
            phase: JobPhase::Idle,
            result: JobResult::new(options.dry_run),
        }
    }

    fn enter(&mut self, phase: JobPhase) {
        if self.phase != phase {
            tracing::debug!(from = ?self.phase, to = ?phase, "job phase");
            self.phase = phase;
        }
    }

    fn rewrite_tree<F>(&mut self, dir: &Path, transformer: &F)
    where
        F: Fn(&FileEntry, &DecodedText) -> Rewrite,
    {
        let files = collect_files(dir, &self.options.filter, &mut self.result.failures);
        for entry in &files {
            self.rewrite_file(entry, transformer);
        }
    }

    fn rewrite_file<F>(&mut self, entry: &FileEntry, transformer: &F)
    where
        F: Fn(&FileEntry, &DecodedText) -> Rewrite,
    {
        self.result.files_scanned += 1;
        let outcome = match run_transform(entry, &self.options.encoding, |decoded| {
            transformer(entry, decoded)
        }) {
            Ok(Some(outcome)) => outcome,
            Ok(None) => return,
            Err(err) => {
                tracing::error!("cannot read file {}: {err:#}", entry.path.display());
                self.result.failures.push(UnitFailure::new(&entry.path, &err));
                return;
            }
        };

        let replacements = outcome.rewrite.changes.len();
        let backup = if self.options.dry_run {
            tracing::info!(
                "[DRY RUN] would update {} ({replacements} replacement(s))",
                entry.path.display()
            );
            self.result
                .changes
                .extend(outcome.rewrite.changes.iter().map(|change| ChangeRecord {
                    path: entry.path.clone(),
                    line: change.line,
                    old: change.old.clone(),
                    new: change.new.clone(),
                }));
            None
        } else {
            match apply_transform(entry, &outcome, self.options.create_backup) {
                Ok(backup) => {
                    tracing::info!("updated {}", entry.path.display());
                    backup
                }
                Err(err) => {
                    tracing::error!("cannot update {}: {err:#}", entry.path.display());
                    self.result.failures.push(UnitFailure::new(&entry.path, &err));
                    return;
                }
            }
        };

        self.result.files_modified += 1;
        self.result.modified.push(ModifiedFile {
            path: entry.path.clone(),
            replacements,
            backup,
        });
        if self.options.capture_diffs {
            self.result.previews.push(FilePreview {
                path: entry.path.clone(),
                before: outcome.decoded.text,
                after: outcome.rewrite.text,
            });
        }
    }

    fn finish(mut self) -> JobResult {
        self.enter(JobPhase::Summarizing);
        tracing::debug!(
            folders = self.result.folders.len(),
            scanned = self.result.files_scanned,
            modified = self.result.files_modified,
            failures = self.result.failures.len(),
            "job finished"
        );
        self.enter(JobPhase::Idle);
        self.result
    }
}

fn comment_policy(options: &JobOptions, entry: &FileEntry) -> CommentPolicy {
    if options.comment_masking {
        CommentPolicy::for_extension(entry.extension())
    } else {
        CommentPolicy::Ignore
    }
}

/// Copies every `old_version` folder under the entry path to a `new_version`
/// sibling and rewrites scoped version strings inside the copy.
///
/// In a dry run nothing is copied; the source folder is scanned instead,
/// which yields the same counts since a real run rewrites a verbatim copy.
pub fn run_upgrade(job: &UpgradeJob) -> Result<JobResult> {
    let rewriter = ScopedRewriter::new(&job.scope, &job.old_version, &job.new_version)?;
    let options = &job.options;
    let transformer = |entry: &FileEntry, decoded: &DecodedText| {
        rewriter.rewrite(&decoded.text, comment_policy(options, entry))
    };

    let mut runner = Runner::new(options);
    runner.enter(JobPhase::Scanning);
    let candidates: Vec<_> = find_version_dirs(
        &job.entry_path,
        job.max_depth,
        &options.filter,
        &mut runner.result.failures,
    )
    .into_iter()
    .filter(|dir| dir.version.as_str() == job.old_version.as_str())
    .collect();
    tracing::debug!("{} folder(s) named {}", candidates.len(), job.old_version);

    for candidate in candidates {
        tracing::debug!(depth = candidate.depth, "candidate {}", candidate.path.display());
        let source = candidate.path;
        let destination = source.with_file_name(job.new_version.as_str());
        runner.enter(JobPhase::Copying);

        let (status, rewrite_root) = if options.dry_run {
            match Destination::inspect(&destination) {
                Ok(Destination::Occupied) => (FolderStatus::SkippedNotEmpty, None),
                Ok(found) => {
                    tracing::info!(
                        "[DRY RUN] would copy {} -> {}",
                        source.display(),
                        destination.display()
                    );
                    let status = FolderStatus::WouldCopy {
                        into_existing: found == Destination::Empty,
                    };
                    (status, Some(source.clone()))
                }
                Err(err) => (failed_folder(&source, &err), None),
            }
        } else {
            match copy_directory(&source, &destination) {
                Ok(CopyOutcome::Copied {
                    files,
                    into_existing,
                }) => {
                    tracing::info!(
                        "copied {} -> {} ({files} file(s){})",
                        source.display(),
                        destination.display(),
                        if into_existing {
                            ", into existing empty folder"
                        } else {
                            ""
                        }
                    );
                    let status = FolderStatus::Copied {
                        files,
                        into_existing,
                    };
                    (status, Some(destination.clone()))
                }
                Ok(CopyOutcome::SkippedNotEmpty) => (FolderStatus::SkippedNotEmpty, None),
                Err(err) => (failed_folder(&source, &err), None),
            }
        };

        if matches!(status, FolderStatus::SkippedNotEmpty) {
            tracing::warn!(
                "skipping {} (already exists and not empty)",
                destination.display()
            );
        }
        runner.result.folders.push(FolderOutcome {
            source,
            destination,
            status,
        });

        if let Some(root) = rewrite_root {
            runner.enter(JobPhase::Rewriting);
            for dir in rewrite_targets(&root, &job.subdirs) {
                runner.rewrite_tree(&dir, &transformer);
            }
        }
    }

    Ok(runner.finish())
}

fn failed_folder(source: &Path, err: &anyhow::Error) -> FolderStatus {
    tracing::error!("cannot copy {}: {err:#}", source.display());
    FolderStatus::Failed {
        reason: format!("{err:#}"),
    }
}

fn rewrite_targets(root: &Path, subdirs: &[String]) -> Vec<PathBuf> {
    if subdirs.is_empty() {
        return vec![root.to_path_buf()];
    }
    subdirs
        .iter()
        .map(|sub| root.join(sub))
        .filter(|dir| dir.is_dir())
        .collect()
}

/// Replaces every full `.component.xml` path of the component below the
/// job root.
pub fn run_component_replace(job: &ComponentJob) -> Result<JobResult> {
    let replacer = ComponentPathReplacer::new(&job.component, &job.replacement)?;
    let mut runner = Runner::new(&job.options);
    runner.enter(JobPhase::Scanning);
    let files = collect_files(&job.root, &job.options.filter, &mut runner.result.failures);
    runner.enter(JobPhase::Rewriting);
    let transformer = |_: &FileEntry, decoded: &DecodedText| replacer.rewrite(&decoded.text);
    for entry in &files {
        runner.rewrite_file(entry, &transformer);
    }
    Ok(runner.finish())
}

/// Runs an arbitrary per-file rewrite over `files` under the usual dry-run
/// and backup rules.
pub fn run_rewrite<F>(files: &[FileEntry], options: &JobOptions, transformer: F) -> JobResult
where
    F: Fn(&FileEntry, &DecodedText) -> Rewrite,
{
    let mut runner = Runner::new(options);
    runner.enter(JobPhase::Rewriting);
    for entry in files {
        runner.rewrite_file(entry, &transformer);
    }
    runner.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const WIDGET_JS: &str = concat!(
        "// shipped with /EAMD.ucp/Components/MyWidget/3.1.0/src/old.js\n",
        "import a from '/EAMD.ucp/Components/MyWidget/3.1.0/src/a.js';\n",
        "const notes = 'version 3.1.0 release notes';\n",
    );
    const WIDGET_HTML: &str =
        "<script src=\"/EAMD.ucp/Components/MyWidget/3.1.0/src/a.js\"></script>\n";

    fn write(path: &Path, body: &str) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, body).expect("write");
    }

    /// `<tmp>/MyWidget/3.1.0/{src,test,docs}` plus an unrelated version.
    fn widget_tree() -> (tempfile::TempDir, PathBuf) {
        let temp = tempdir().expect("temp dir");
        let entry = temp.path().join("MyWidget");
        write(&entry.join("3.1.0/src/a.js"), WIDGET_JS);
        write(&entry.join("3.1.0/src/view.html"), WIDGET_HTML);
        write(&entry.join("3.1.0/test/a.test.js"), WIDGET_JS);
        write(&entry.join("3.1.0/src/plain.css"), "/* 3.1.0 */");
        write(&entry.join("3.1.0/docs/readme.html"), WIDGET_HTML);
        write(&entry.join("3.0.0/src/a.js"), WIDGET_JS);
        (temp, entry)
    }

    fn request(entry: &Path) -> UpgradeRequest {
        UpgradeRequest {
            entry_path: Some(entry.to_path_buf()),
            old_version: "3.1.0".into(),
            new_version: "3.2.0".into(),
            max_depth: 0,
            scope: None,
            subdirs: DEFAULT_SUBDIRS.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn apply_options() -> JobOptions {
        JobOptions {
            dry_run: false,
            create_backup: false,
            ..JobOptions::default()
        }
    }

    #[test]
    fn upgrade_copies_and_rewrites_scoped_paths() {
        let (_temp, entry) = widget_tree();
        let job = UpgradeJob::new(request(&entry), apply_options()).expect("valid job");
        assert_eq!(job.scope.as_str(), "MyWidget");

        let result = run_upgrade(&job).expect("run");
        assert_eq!(result.folders_processed(), 1);
        assert_eq!(result.files_modified, 3);
        assert_eq!(result.files_scanned, 3);
        assert!(result.failures.is_empty());

        let copied = fs::read_to_string(entry.join("3.2.0/src/a.js")).expect("read");
        assert_eq!(
            copied,
            concat!(
                "// shipped with /EAMD.ucp/Components/MyWidget/3.1.0/src/old.js\n",
                "import a from '/EAMD.ucp/Components/MyWidget/3.2.0/src/a.js';\n",
                "const notes = 'version 3.1.0 release notes';\n",
            )
        );
        // Outside src/test the copy is verbatim.
        assert_eq!(
            fs::read_to_string(entry.join("3.2.0/docs/readme.html")).expect("read"),
            WIDGET_HTML
        );
        // The source is never touched.
        assert_eq!(
            fs::read_to_string(entry.join("3.1.0/src/a.js")).expect("read"),
            WIDGET_JS
        );
    }

    #[test]
    fn dry_run_touches_nothing_and_matches_real_counts() {
        let (_temp, entry) = widget_tree();
        let dry = UpgradeJob::new(request(&entry), JobOptions::default()).expect("valid job");
        let preview = run_upgrade(&dry).expect("dry run");
        assert!(preview.dry_run);
        assert!(!entry.join("3.2.0").exists());
        assert_eq!(preview.folders_processed(), 1);
        assert_eq!(preview.changes.len(), 3);
        assert!(preview.changes.iter().all(|c| c.new.ends_with("/3.2.0")));

        let real = UpgradeJob::new(request(&entry), apply_options()).expect("valid job");
        let applied = run_upgrade(&real).expect("run");
        assert_eq!(preview.files_modified, applied.files_modified);
        assert!(applied.changes.is_empty());
    }

    #[test]
    fn rerun_skips_populated_destination() {
        let (_temp, entry) = widget_tree();
        write(&entry.join("3.2.0/src/mine.js"), "keep me");
        let job = UpgradeJob::new(request(&entry), apply_options()).expect("valid job");
        let result = run_upgrade(&job).expect("run");
        assert_eq!(result.folders_skipped(), 1);
        assert_eq!(result.folders_processed(), 0);
        assert_eq!(result.files_modified, 0);
        assert!(!entry.join("3.2.0/src/a.js").exists());
    }

    /// `<tmp>/{a,b}/MyWidget/3.1.0/src/a.js`, scoped by name from `<tmp>`.
    fn two_widget_copies() -> (tempfile::TempDir, UpgradeRequest) {
        let temp = tempdir().expect("temp dir");
        for parent in ["a", "b"] {
            write(
                &temp.path().join(parent).join("MyWidget/3.1.0/src/a.js"),
                WIDGET_JS,
            );
        }
        let mut request = request(temp.path());
        request.scope = Some("MyWidget".into());
        (temp, request)
    }

    #[test]
    fn skipped_destination_does_not_stop_other_candidates() {
        let (temp, request) = two_widget_copies();
        write(&temp.path().join("a/MyWidget/3.2.0/keep.txt"), "mine");

        let job = UpgradeJob::new(request, apply_options()).expect("valid job");
        let result = run_upgrade(&job).expect("run");
        assert_eq!(result.folders.len(), 2);
        assert_eq!(result.folders_skipped(), 1);
        assert_eq!(result.folders_processed(), 1);
        assert_eq!(result.files_modified, 1);
        assert!(!temp.path().join("a/MyWidget/3.2.0/src").exists());
        assert!(
            fs::read_to_string(temp.path().join("b/MyWidget/3.2.0/src/a.js"))
                .expect("read")
                .contains("/MyWidget/3.2.0/src/a.js")
        );
    }

    #[cfg(unix)]
    #[test]
    fn failed_copy_is_recorded_and_next_candidate_runs() {
        let (temp, request) = two_widget_copies();
        // A dangling link reads as absent but cannot be created as a folder.
        std::os::unix::fs::symlink(
            temp.path().join("nowhere"),
            temp.path().join("a/MyWidget/3.2.0"),
        )
        .expect("symlink");

        let job = UpgradeJob::new(request, apply_options()).expect("valid job");
        let result = run_upgrade(&job).expect("run");
        assert!(matches!(result.folders[0].status, FolderStatus::Failed { .. }));
        assert!(matches!(result.folders[1].status, FolderStatus::Copied { .. }));
        assert_eq!(result.files_modified, 1);
        assert!(temp.path().join("b/MyWidget/3.2.0/src/a.js").is_file());
    }

    #[test]
    fn unreadable_file_is_recorded_and_others_still_modified() {
        let temp = tempdir().expect("temp dir");
        let present = temp.path().join("a.js");
        write(&present, WIDGET_JS);
        let files = vec![
            FileEntry {
                path: temp.path().join("gone.js"),
                len: 0,
                is_probably_binary: false,
            },
            FileEntry::inspect(&present).expect("inspect"),
        ];
        let scope = ScopeToken::from_component_name("MyWidget").expect("scope");
        let old = VersionToken::parse("current version", "3.1.0").expect("old");
        let new = VersionToken::parse("new version", "3.2.0").expect("new");
        let rewriter = ScopedRewriter::new(&scope, &old, &new).expect("rewriter");

        let result = run_rewrite(&files, &apply_options(), |_, decoded| {
            rewriter.rewrite(&decoded.text, CommentPolicy::Ignore)
        });
        assert_eq!(result.files_scanned, 2);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].path, temp.path().join("gone.js"));
        assert_eq!(result.files_modified, 1);
        assert!(
            fs::read_to_string(&present)
                .expect("read")
                .contains("/MyWidget/3.2.0/src/a.js")
        );
    }

    #[test]
    fn excluded_files_are_copied_but_not_rewritten() {
        let (_temp, entry) = widget_tree();
        write(&entry.join("3.1.0/src/app.min.js"), WIDGET_JS);
        let options = JobOptions {
            filter: FileFilter::new(&[], &["**/*.min.js".into()]).expect("filter"),
            ..apply_options()
        };
        let job = UpgradeJob::new(request(&entry), options).expect("valid job");
        let result = run_upgrade(&job).expect("run");
        assert_eq!(result.files_modified, 3);
        assert_eq!(
            fs::read_to_string(entry.join("3.2.0/src/app.min.js")).expect("read"),
            WIDGET_JS
        );
    }

    #[test]
    fn interrupted_run_with_empty_destination_is_retried() {
        let (_temp, entry) = widget_tree();
        fs::create_dir_all(entry.join("3.2.0/src")).expect("mkdir");
        let job = UpgradeJob::new(request(&entry), apply_options()).expect("valid job");
        let result = run_upgrade(&job).expect("run");
        assert!(matches!(
            result.folders[0].status,
            FolderStatus::Copied {
                into_existing: true,
                ..
            }
        ));
        assert!(entry.join("3.2.0/src/a.js").is_file());
    }

    #[test]
    fn backups_are_written_beside_rewritten_files() {
        let (_temp, entry) = widget_tree();
        let options = JobOptions {
            create_backup: true,
            ..apply_options()
        };
        let job = UpgradeJob::new(request(&entry), options).expect("valid job");
        let result = run_upgrade(&job).expect("run");
        for modified in &result.modified {
            let backup = modified.backup.as_ref().expect("backup recorded");
            assert_eq!(backup.parent(), modified.path.parent());
            assert_eq!(fs::read_to_string(backup).expect("read"), {
                if modified.path.extension().is_some_and(|e| e == "html") {
                    WIDGET_HTML
                } else {
                    WIDGET_JS
                }
            });
        }
    }

    #[test]
    fn depth_limit_hides_deeper_version_folders() {
        let (_temp, entry) = widget_tree();
        let mut shallow = request(&entry.parent().expect("parent").to_path_buf());
        shallow.max_depth = 1;
        shallow.scope = Some("MyWidget".into());
        let job = UpgradeJob::new(shallow, JobOptions::default()).expect("valid job");
        let result = run_upgrade(&job).expect("run");
        assert!(result.folders.is_empty());
    }

    #[test]
    fn validation_rejects_bad_input() {
        let (_temp, entry) = widget_tree();
        let mut same = request(&entry);
        same.new_version = "3.1.0".into();
        assert_eq!(
            UpgradeJob::new(same, JobOptions::default()).unwrap_err(),
            ValidationError::SameVersion("3.1.0".into())
        );

        let mut malformed = request(&entry);
        malformed.old_version = "3.1".into();
        assert!(matches!(
            UpgradeJob::new(malformed, JobOptions::default()),
            Err(ValidationError::MalformedVersion { .. })
        ));

        let mut missing = request(&entry);
        missing.entry_path = None;
        assert_eq!(
            UpgradeJob::new(missing, JobOptions::default()).unwrap_err(),
            ValidationError::MissingField("entry path")
        );

        let mut not_dir = request(&entry);
        not_dir.entry_path = Some(entry.join("nope"));
        assert!(matches!(
            UpgradeJob::new(not_dir, JobOptions::default()),
            Err(ValidationError::NotADirectory(_))
        ));
    }

    #[test]
    fn component_replacement_rewrites_full_paths() {
        let temp = tempdir().expect("temp dir");
        let page = temp.path().join("app/index.html");
        write(
            &page,
            "<link href=\"/EAMD.ucp/a/b/MediaPlayer.component.xml\">\n<p>MediaPlayer</p>\n",
        );
        write(&temp.path().join("app/other.js"), "'/EAMD.ucp/a/Other.component.xml'");

        let dry = ComponentJob::new(
            Some(temp.path().to_path_buf()),
            "media player",
            "/EAMD.ucp/new/Path/MediaPlayer.component.xml",
            JobOptions::default(),
        )
        .expect("valid job");
        let preview = run_component_replace(&dry).expect("dry run");
        assert_eq!(preview.files_modified, 1);
        assert_eq!(preview.files_scanned, 2);
        assert!(
            fs::read_to_string(&page)
                .expect("read")
                .contains("/a/b/MediaPlayer")
        );

        let real = ComponentJob {
            options: apply_options(),
            ..dry
        };
        let result = run_component_replace(&real).expect("run");
        assert_eq!(result.files_modified, preview.files_modified);
        assert_eq!(
            fs::read_to_string(&page).expect("read"),
            "<link href=\"/EAMD.ucp/new/Path/MediaPlayer.component.xml\">\n<p>MediaPlayer</p>\n"
        );
    }

    #[test]
    fn component_job_validates_replacement() {
        let temp = tempdir().expect("temp dir");
        let err = ComponentJob::new(
            Some(temp.path().to_path_buf()),
            "MediaPlayer",
            "/EAMD.ucp/new/MediaPlayer.xml",
            JobOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::ReplacementSuffix { .. }));
    }

    #[test]
    fn diffs_are_captured_on_request() {
        let (_temp, entry) = widget_tree();
        let options = JobOptions {
            capture_diffs: true,
            ..JobOptions::default()
        };
        let job = UpgradeJob::new(request(&entry), options).expect("valid job");
        let result = run_upgrade(&job).expect("run");
        assert_eq!(result.previews.len(), result.files_modified);
        assert!(result.previews[0].after.contains("/MyWidget/3.2.0/"));
    }
}
