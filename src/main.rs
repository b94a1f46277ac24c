use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use serde_json::json;
use walkdir::WalkDir;

mod batch;
mod component;
mod copier;
mod deps;
mod diff;
mod encoding;
mod error;
mod files;
mod job;
mod logging;
mod rewrite;
mod scanner;
mod scope;
mod search;
mod settings;
mod transform;
mod version;

use encoding::EncodingStrategy;
use files::FileFilter;
use job::{
    ComponentJob, FolderStatus, JobOptions, JobResult, UpgradeJob, UpgradeRequest,
    run_component_replace, run_upgrade,
};
use logging::{ChangeLog, record_change};
use scope::ScopeToken;
use settings::Settings;
use version::VersionToken;

const CHANGE_PREVIEW_LIMIT: usize = 10;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Upgrade(cmd) => handle_upgrade(cmd)?,
        Command::Component(cmd) => handle_component(cmd)?,
        Command::Detect(cmd) => handle_detect(cmd)?,
        Command::Search(cmd) => handle_search(cmd)?,
        Command::Deps(cmd) => handle_deps(cmd)?,
        Command::Batch(cmd) => handle_batch(cmd)?,
        Command::Log(cmd) => handle_log(cmd)?,
        Command::Cleanup(cmd) => handle_cleanup(cmd)?,
    }

    Ok(())
}

fn handle_upgrade(cmd: UpgradeCommand) -> Result<()> {
    let mut settings = Settings::load();
    let root = remembered_root(cmd.root, settings.last_path.as_ref());
    let old_version = match (cmd.from, root.as_deref()) {
        (Some(from), _) => from,
        (None, Some(root)) if root.is_dir() => detect_current_version(root, cmd.common.json)?,
        (None, _) => String::new(),
    };
    let subdirs = if cmd.whole_folder {
        Vec::new()
    } else {
        cmd.subdirs
    };
    let mut options = cmd.common.job_options()?;
    options.comment_masking = !cmd.no_comment_mask;

    let job = UpgradeJob::new(
        UpgradeRequest {
            entry_path: root,
            old_version,
            new_version: cmd.to,
            max_depth: cmd.depth,
            scope: cmd.scope,
            subdirs,
        },
        options,
    )?;
    print_command_summary(
        "upgrade",
        &cmd.common,
        &job.options,
        &[
            format!("entry path: {}", job.entry_path.display()),
            format!("versions: {} -> {}", job.old_version, job.new_version),
            format!("scope: {}", job.scope),
            format!(
                "max depth: {}",
                if job.max_depth == 0 {
                    "unlimited".to_string()
                } else {
                    job.max_depth.to_string()
                }
            ),
            format!(
                "rewritten subtrees: {}",
                if job.subdirs.is_empty() {
                    "(whole folder)".to_string()
                } else {
                    job.subdirs.join(", ")
                }
            ),
        ],
    );

    let result = run_upgrade(&job)?;
    report_job("upgrade", &cmd.common, &result)?;
    settings.last_path = Some(std::fs::canonicalize(&job.entry_path).unwrap_or(job.entry_path));
    settings.save();
    Ok(())
}

fn detect_current_version(root: &Path, quiet: bool) -> Result<String> {
    match scanner::detect_latest_version(root)? {
        Some((latest, count)) => {
            if !quiet {
                println!("detected current version {latest} ({count} version folder(s))");
            }
            Ok(latest.to_string())
        }
        None => bail!(
            "no version folders directly under {}; pass --from",
            root.display()
        ),
    }
}

fn handle_component(cmd: ComponentCommand) -> Result<()> {
    let mut settings = Settings::load();
    let root = remembered_root(cmd.root, settings.last_component_path.as_ref());
    let options = cmd.common.job_options()?;
    let job = ComponentJob::new(root, &cmd.name, &cmd.replacement, options)?;
    print_command_summary(
        "component",
        &cmd.common,
        &job.options,
        &[
            format!("directory: {}", job.root.display()),
            format!("component: {}", job.component),
            format!("replacement: {}", job.replacement),
        ],
    );

    let result = run_component_replace(&job)?;
    report_job("component", &cmd.common, &result)?;
    settings.last_component_path = Some(std::fs::canonicalize(&job.root).unwrap_or(job.root));
    settings.save();
    Ok(())
}

fn handle_detect(cmd: DetectCommand) -> Result<()> {
    let settings = Settings::load();
    let Some(root) = remembered_root(cmd.root, settings.last_path.as_ref()) else {
        bail!("--root is required (no remembered path)");
    };
    let versions = scanner::list_versions(&root)?;
    if cmd.json {
        let payload = json!({
            "root": root,
            "latest": versions.last(),
            "count": versions.len(),
            "versions": versions,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }
    match versions.last() {
        Some(latest) => {
            println!("version folders under {}:", root.display());
            for version in &versions {
                println!("  - {version}");
            }
            println!("latest: {latest} ({} found)", versions.len());
        }
        None => println!("no version folders directly under {}", root.display()),
    }
    Ok(())
}

fn handle_search(cmd: SearchCommand) -> Result<()> {
    let settings = Settings::load();
    let Some(root) = remembered_root(cmd.root, settings.last_component_path.as_ref()) else {
        bail!("--root is required (no remembered path)");
    };
    if !root.is_dir() {
        return Err(error::ValidationError::NotADirectory(root).into());
    }
    let component = ScopeToken::from_component_name(&cmd.name)?;
    let filter = FileFilter::new(&cmd.extensions, &cmd.exclude)?;
    let encoding = EncodingStrategy::new(cmd.encoding.as_deref())?;
    let report =
        search::search_component(&root, &component, cmd.version.as_deref(), &filter, &encoding)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if report.hits.is_empty() {
        println!(
            "no references to {component}.component.xml in {} file(s)",
            report.files_scanned
        );
    } else {
        for hit in &report.hits {
            println!(
                "{:<28} {}:{}  {}",
                hit.file_name,
                hit.relative_path.display(),
                hit.line,
                hit.matched
            );
        }
        println!(
            "search summary: hits={}, files scanned={}",
            report.hits.len(),
            report.files_scanned
        );
    }
    print_failures(&report.failures);
    Ok(())
}

fn handle_deps(cmd: DepsCommand) -> Result<()> {
    let settings = Settings::load();
    let Some(root) = remembered_root(cmd.root, settings.last_path.as_ref()) else {
        bail!("--root is required (no remembered path)");
    };
    if !root.is_dir() {
        return Err(error::ValidationError::NotADirectory(root).into());
    }
    if let Some(lookup) = &cmd.lookup {
        if !lookup.is_dir() {
            return Err(error::ValidationError::NotADirectory(lookup.clone()).into());
        }
    }
    let target = VersionToken::parse("version", &cmd.version)?;
    let options = cmd.common.job_options()?;
    let request = deps::DepsRequest {
        root,
        target,
        lookup: cmd.lookup,
        all_versions: cmd.all_versions,
    };
    let report = deps::audit(&request, &options.filter, &options.encoding)?;

    if cmd.common.json && !cmd.common.apply {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if !cmd.common.json {
        println!(
            "scanned {} file(s) in version folders{}",
            report.source_files.len(),
            if request.all_versions {
                String::new()
            } else {
                format!(" named {}", report.target)
            }
        );
        for dep in &report.outdated {
            println!(
                "{:<18} {} < {}  {:<18} {}  ({})",
                dep.component,
                dep.pinned,
                report.target,
                dep.status.to_string(),
                dep.dependency,
                dep.file.display()
            );
        }
        print_failures(&report.failures);
    }

    let updatable = report.updatable().count();
    if !cmd.common.apply {
        println!(
            "deps summary: outdated={}, updatable={updatable}",
            report.outdated.len()
        );
        if updatable > 0 {
            println!("dry-run: rerun with --apply to update {updatable} dependency reference(s).");
        }
        return Ok(());
    }
    let result = deps::apply_updates(&report, &options);
    report_job("deps", &cmd.common, &result)
}

fn handle_batch(cmd: BatchCommand) -> Result<()> {
    let BatchCommand { common, plan } = cmd;
    let batch_plan = batch::load_plan(&plan)?;
    if batch_plan.steps.is_empty() {
        bail!("plan {} does not contain any steps", plan.display());
    }
    if !common.json {
        println!(
            "plan={} ({} steps)",
            plan.display(),
            batch_plan.steps.len()
        );
    }
    let total = batch_plan.steps.len();
    for (idx, step) in batch_plan.steps.into_iter().enumerate() {
        if !common.json {
            println!("\n=== Batch Step {}/{}: {} ===", idx + 1, total, step.kind());
        }
        match step {
            batch::PlanEntry::Upgrade(step_plan) => {
                handle_upgrade(build_upgrade_command(&common, step_plan))?;
            }
            batch::PlanEntry::Component(step_plan) => {
                handle_component(build_component_command(&common, step_plan))?;
            }
        }
    }
    Ok(())
}

fn handle_log(cmd: LogCommand) -> Result<()> {
    let log = ChangeLog::default();
    let entries = log.read_recent(cmd.tail)?;
    if entries.is_empty() {
        println!("change log {} is empty.", log.path().display());
        return Ok(());
    }
    for entry in entries {
        println!(
            "[{}] {:<10} {:<14} {} {}",
            entry.timestamp,
            entry.command,
            entry.action,
            entry.path.display(),
            entry.detail
        );
    }
    Ok(())
}

fn handle_cleanup(cmd: CleanupCommand) -> Result<()> {
    let root = std::fs::canonicalize(&cmd.root)
        .with_context(|| format!("resolving cleanup root {}", cmd.root.display()))?;
    if !root.is_dir() {
        bail!("cleanup root {} is not a directory", root.display());
    }
    let candidates = find_backup_files(&root)?;
    if candidates.is_empty() {
        println!("no backup files found under {}", root.display());
        return Ok(());
    }
    println!("cleanup root: {}", root.display());
    println!("found {} backup file(s):", candidates.len());
    for path in &candidates {
        println!("  - {}", path.display());
    }
    if !cmd.apply {
        println!("dry-run: rerun with --apply to delete these backups.");
        return Ok(());
    }

    let mut stats = CommandStats::default();
    let mut apply_all = cmd.auto_apply;
    for path in candidates {
        let decision = if apply_all {
            ApprovalDecision::Apply
        } else {
            prompt_approval(&path)?
        };
        match decision {
            ApprovalDecision::Apply | ApprovalDecision::ApplyAll => {
                if matches!(decision, ApprovalDecision::ApplyAll) {
                    apply_all = true;
                }
                std::fs::remove_file(&path)
                    .with_context(|| format!("removing backup {}", path.display()))?;
                println!("removed {}", path.display());
                record_change("cleanup", &path, "removed", "");
                stats.applied += 1;
            }
            ApprovalDecision::Skip => {
                println!("skipped {}", path.display());
                stats.skipped += 1;
            }
            ApprovalDecision::Quit => {
                println!("stopping cleanup after user request.");
                break;
            }
        }
    }
    stats.print("cleanup");
    Ok(())
}

fn find_backup_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !files::is_housekeeping_dir(entry));
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && transform::is_backup_file(entry.path()) {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

/// Explicit `--root`, else the remembered path for the command.
fn remembered_root(explicit: Option<PathBuf>, remembered: Option<&PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        let path = remembered?.clone();
        tracing::info!("using remembered path {}", path.display());
        Some(path)
    })
}

/// Writes the change log, then prints either the JSON result or the text
/// summary.
fn report_job(command: &str, common: &CommonArgs, result: &JobResult) -> Result<()> {
    log_job(command, result);
    if common.json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    if result.dry_run {
        println!("[DRY RUN] no files were changed");
    }
    for folder in &result.folders {
        let line = match &folder.status {
            FolderStatus::Copied {
                files,
                into_existing,
            } => format!(
                "copied {} -> {} ({files} file(s){})",
                folder.source.display(),
                folder.destination.display(),
                if *into_existing { ", reused empty folder" } else { "" }
            ),
            FolderStatus::WouldCopy { .. } => format!(
                "would copy {} -> {}",
                folder.source.display(),
                folder.destination.display()
            ),
            FolderStatus::SkippedNotEmpty => format!(
                "skipped {} (already exists and not empty)",
                folder.destination.display()
            ),
            FolderStatus::Failed { reason } => {
                format!("failed {}: {reason}", folder.source.display())
            }
        };
        println!("{line}");
    }
    for file in &result.modified {
        let verb = if result.dry_run { "would update" } else { "updated" };
        match &file.backup {
            Some(backup) => println!(
                "{verb} {} ({} replacement(s), backup {})",
                file.path.display(),
                file.replacements,
                backup.display()
            ),
            None => println!(
                "{verb} {} ({} replacement(s))",
                file.path.display(),
                file.replacements
            ),
        }
    }
    if !result.changes.is_empty() {
        println!("changes:");
        for change in result.changes.iter().take(CHANGE_PREVIEW_LIMIT) {
            println!(
                "  {}:{}: {} -> {}",
                change.path.display(),
                change.line,
                change.old,
                change.new
            );
        }
        if result.changes.len() > CHANGE_PREVIEW_LIMIT {
            println!(
                "  ... and {} more",
                result.changes.len() - CHANGE_PREVIEW_LIMIT
            );
        }
    }
    if common.diff {
        for preview in &result.previews {
            println!("--- {}", preview.path.display());
            diff::print_diff(&preview.before, &preview.after, common.context);
        }
    }
    print_failures(&result.failures);
    println!(
        "{command} summary: folders processed={}, folders skipped={}, files scanned={}, files modified={}, failures={}",
        result.folders_processed(),
        result.folders_skipped(),
        result.files_scanned,
        result.files_modified,
        result.failures.len()
    );
    Ok(())
}

fn log_job(command: &str, result: &JobResult) {
    for folder in &result.folders {
        let (action, detail) = match &folder.status {
            FolderStatus::Copied { files, .. } => ("copied", format!("{files} file(s)")),
            FolderStatus::WouldCopy { .. } => ("would_copy", String::new()),
            FolderStatus::SkippedNotEmpty => ("skipped", "not empty".to_string()),
            FolderStatus::Failed { reason } => ("failed", reason.clone()),
        };
        record_change(command, &folder.destination, action, &detail);
    }
    for file in &result.modified {
        let action = if result.dry_run { "would_modify" } else { "modified" };
        let mut detail = format!("{} replacement(s)", file.replacements);
        if let Some(backup) = &file.backup {
            detail.push_str(&format!(", backup {}", backup.display()));
        }
        record_change(command, &file.path, action, &detail);
    }
}

fn print_failures(failures: &[error::UnitFailure]) {
    if failures.is_empty() {
        return;
    }
    println!("failures ({}):", failures.len());
    for failure in failures {
        println!("  - {failure}");
    }
}

fn print_command_summary(
    command: &str,
    common: &CommonArgs,
    options: &JobOptions,
    details: &[String],
) {
    if common.json {
        return;
    }
    println!("command: {command}");
    println!("mode: {}", if common.apply { "apply" } else { "dry-run" });
    println!("encoding strategy: {}", options.encoding.describe());
    println!("extensions: {}", options.filter.extensions().join(", "));
    if !common.exclude.is_empty() {
        println!("exclude globs: {:?}", common.exclude);
    }
    if common.no_backup {
        println!("backups disabled");
    }
    for detail in details {
        println!("{detail}");
    }
    println!("---");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApprovalDecision {
    Apply,
    Skip,
    ApplyAll,
    Quit,
}

fn prompt_approval(path: &Path) -> Result<ApprovalDecision> {
    read_approval(path, &mut io::stdin().lock())
}

/// Deletion cannot be undone, so an empty answer skips the file and a closed
/// input stops the whole run.
fn read_approval<R: BufRead>(path: &Path, input: &mut R) -> Result<ApprovalDecision> {
    loop {
        print_prompt(&format!(
            "Delete {}? [y]es/[N]o/[a]ll/[q]uit: ",
            path.display()
        ))?;
        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            println!();
            return Ok(ApprovalDecision::Quit);
        }
        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(ApprovalDecision::Apply),
            "n" | "no" | "" => return Ok(ApprovalDecision::Skip),
            "a" | "all" => return Ok(ApprovalDecision::ApplyAll),
            "q" | "quit" => return Ok(ApprovalDecision::Quit),
            _ => {
                println!("Please enter y, n, a, or q.");
            }
        }
    }
}

fn print_prompt(message: &str) -> Result<()> {
    print!("{message}");
    io::stdout().flush()?;
    Ok(())
}

#[derive(Default)]
struct CommandStats {
    applied: usize,
    skipped: usize,
}

impl CommandStats {
    fn print(&self, label: &str) {
        if self.applied + self.skipped == 0 {
            return;
        }
        println!(
            "{label} summary: applied={}, skipped={}",
            self.applied, self.skipped
        );
    }
}

fn merge_common(base: &CommonArgs, overrides: &batch::PlanCommon) -> CommonArgs {
    let mut merged = base.clone();
    if let Some(apply) = overrides.apply {
        merged.apply = apply;
    }
    if let Some(no_backup) = overrides.no_backup {
        merged.no_backup = no_backup;
    }
    if let Some(json) = overrides.json {
        merged.json = json;
    }
    if let Some(encoding) = &overrides.encoding {
        merged.encoding = Some(encoding.clone());
    }
    if let Some(exclude) = &overrides.exclude {
        merged.exclude = exclude.clone();
    }
    if let Some(extensions) = &overrides.extensions {
        merged.extensions = extensions.clone();
    }
    merged
}

fn build_upgrade_command(base_common: &CommonArgs, step: batch::UpgradePlan) -> UpgradeCommand {
    let whole_folder = step.subdirs.as_ref().is_some_and(Vec::is_empty);
    UpgradeCommand {
        common: merge_common(base_common, &step.common),
        root: Some(step.root),
        from: step.from,
        to: step.to,
        depth: step.depth,
        scope: step.scope,
        subdirs: step.subdirs.unwrap_or_else(default_subdirs),
        whole_folder,
        no_comment_mask: false,
    }
}

fn build_component_command(
    base_common: &CommonArgs,
    step: batch::ComponentPlan,
) -> ComponentCommand {
    ComponentCommand {
        common: merge_common(base_common, &step.common),
        root: Some(step.root),
        name: step.name,
        replacement: step.replacement,
    }
}

fn default_subdirs() -> Vec<String> {
    job::DEFAULT_SUBDIRS
        .iter()
        .map(|dir| dir.to_string())
        .collect()
}

#[derive(Debug, Parser)]
#[command(
    name = "woda-upgrade",
    version,
    about = "Version folder upgrades for /EAMD.ucp/ component trees"
)]
struct Cli {
    /// Diagnostics on stderr: -v for debug, -vv for trace. RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Copy a version folder to a new version and rewrite scoped paths.
    Upgrade(UpgradeCommand),
    /// Replace full `<Name>.component.xml` paths with a new path.
    Component(ComponentCommand),
    /// Report the latest version folder under a directory.
    Detect(DetectCommand),
    /// Find references to a component's `.component.xml`.
    Search(SearchCommand),
    /// Audit pinned dependencies older than a version.
    Deps(DepsCommand),
    /// Run a YAML or JSON plan of upgrade and component steps.
    Batch(BatchCommand),
    /// Show recent change log entries.
    Log(LogCommand),
    /// Find and delete timestamped backups.
    Cleanup(CleanupCommand),
}

#[derive(Debug, Clone, Args)]
struct CommonArgs {
    /// Write changes; without it every command is a dry run.
    #[arg(long, action = ArgAction::SetTrue)]
    apply: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    no_backup: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
    /// Print a line diff for each modified file.
    #[arg(long, action = ArgAction::SetTrue)]
    diff: bool,
    #[arg(long, default_value_t = 3)]
    context: usize,
    #[arg(long, value_name = "ENCODING")]
    encoding: Option<String>,
    #[arg(long = "exclude", value_name = "GLOB")]
    exclude: Vec<String>,
    #[arg(long = "ext", value_name = "EXT", value_delimiter = ',')]
    extensions: Vec<String>,
}

impl CommonArgs {
    fn job_options(&self) -> Result<JobOptions> {
        Ok(JobOptions {
            dry_run: !self.apply,
            create_backup: !self.no_backup,
            filter: FileFilter::new(&self.extensions, &self.exclude)?,
            encoding: EncodingStrategy::new(self.encoding.as_deref())?,
            comment_masking: true,
            capture_diffs: self.diff,
        })
    }
}

#[derive(Debug, Args)]
struct UpgradeCommand {
    #[command(flatten)]
    common: CommonArgs,
    /// Component folder; its name is the scope token.
    #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    root: Option<PathBuf>,
    /// Version to copy; detected from the root's version folders if omitted.
    #[arg(long, value_name = "VERSION")]
    from: Option<String>,
    #[arg(long, value_name = "VERSION")]
    to: String,
    /// Folder levels to search below the root (0 for unlimited).
    #[arg(long, default_value_t = 0)]
    depth: usize,
    /// Scope by this component name instead of the root's folder name.
    #[arg(long, value_name = "NAME")]
    scope: Option<String>,
    #[arg(long = "subdir", value_name = "DIR", default_values = ["src", "test"])]
    subdirs: Vec<String>,
    /// Rewrite the whole copied folder instead of the listed subdirectories.
    #[arg(long, action = ArgAction::SetTrue)]
    whole_folder: bool,
    /// Rewrite matches inside `//` and `/* */` comments of script files too.
    #[arg(long, action = ArgAction::SetTrue)]
    no_comment_mask: bool,
}

#[derive(Debug, Args)]
struct ComponentCommand {
    #[command(flatten)]
    common: CommonArgs,
    #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    root: Option<PathBuf>,
    /// Component name; normalised to PascalCase.
    #[arg(long, value_name = "NAME")]
    name: String,
    /// Full `/EAMD.ucp/.../<Name>.component.xml` path to substitute.
    #[arg(long, value_name = "PATH")]
    replacement: String,
}

#[derive(Debug, Args)]
struct DetectCommand {
    #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    root: Option<PathBuf>,
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Debug, Args)]
struct SearchCommand {
    #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    root: Option<PathBuf>,
    #[arg(long, value_name = "NAME")]
    name: String,
    #[arg(long, value_name = "VERSION")]
    version: Option<String>,
    #[arg(long, value_name = "ENCODING")]
    encoding: Option<String>,
    #[arg(long = "exclude", value_name = "GLOB")]
    exclude: Vec<String>,
    #[arg(long = "ext", value_name = "EXT", value_delimiter = ',')]
    extensions: Vec<String>,
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Debug, Args)]
struct DepsCommand {
    #[command(flatten)]
    common: CommonArgs,
    #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    root: Option<PathBuf>,
    /// Target version; pins older than this are reported.
    #[arg(long, value_name = "VERSION")]
    version: String,
    /// Directory searched for components (defaults to the root).
    #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    lookup: Option<PathBuf>,
    /// Audit files in every version folder, not only those named VERSION.
    #[arg(long, action = ArgAction::SetTrue)]
    all_versions: bool,
}

#[derive(Debug, Args)]
struct BatchCommand {
    #[command(flatten)]
    common: CommonArgs,
    #[arg(value_name = "PLAN", value_hint = ValueHint::FilePath)]
    plan: PathBuf,
}

#[derive(Debug, Args)]
struct LogCommand {
    #[arg(long = "tail", default_value_t = 20)]
    tail: usize,
}

#[derive(Debug, Args)]
struct CleanupCommand {
    #[arg(long = "root", value_name = "DIR", default_value = ".", value_hint = ValueHint::DirPath)]
    root: PathBuf,
    #[arg(long, action = ArgAction::SetTrue)]
    apply: bool,
    #[arg(long = "yes", action = ArgAction::SetTrue)]
    auto_apply: bool,
}
