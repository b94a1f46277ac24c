use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing_subscriber::EnvFilter;

const LOG_DIR: &str = ".woda-upgrade";
const LOG_FILE: &str = "change_log.jsonl";
const MAX_ENTRIES: usize = 500;

/// Installs the stderr diagnostics subscriber. `RUST_LOG` wins over the
/// verbosity count.
pub fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub timestamp: String,
    pub command: String,
    pub path: PathBuf,
    pub action: String,
    #[serde(default)]
    pub detail: String,
}

/// Change log rooted at a directory; the CLI uses the working directory.
#[derive(Debug, Clone)]
pub struct ChangeLog {
    path: PathBuf,
}

impl Default for ChangeLog {
    fn default() -> Self {
        Self::in_dir(Path::new("."))
    }
}

impl ChangeLog {
    pub fn in_dir(base: &Path) -> Self {
        Self {
            path: base.join(LOG_DIR).join(LOG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, command: &str, path: &Path, action: &str, detail: &str) -> Result<()> {
        self.ensure_dir()?;
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".into());
        let entry = ChangeLogEntry {
            timestamp,
            command: command.to_string(),
            path: path.to_path_buf(),
            action: action.to_string(),
            detail: detail.to_string(),
        };
        let json = serde_json::to_string(&entry)?;
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        writeln!(file, "{json}")?;
        truncate_log(&self.path)?;
        Ok(())
    }

    /// The last `tail` entries, oldest first. Lines that fail to parse are
    /// skipped.
    pub fn read_recent(&self, tail: usize) -> Result<Vec<ChangeLogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let lines = read_lines(&self.path)?;
        let start = lines.len().saturating_sub(tail);
        Ok(lines[start..]
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }

    fn ensure_dir(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
            }
        }
        Ok(())
    }
}

/// Appends to the default change log. Failures only warn; the log never
/// stops a job.
pub fn record_change(command: &str, path: &Path, action: &str, detail: &str) {
    if let Err(err) = ChangeLog::default().record(command, path, action, detail) {
        tracing::warn!("cannot write change log: {err:#}");
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let file = OpenOptions::new()
        .read(true)
        .open(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let reader = BufReader::new(file);
    Ok(reader.lines().collect::<Result<_, _>>()?)
}

fn truncate_log(path: &Path) -> Result<()> {
    let lines = read_lines(path)?;
    if lines.len() <= MAX_ENTRIES {
        return Ok(());
    }
    let keep = &lines[lines.len() - MAX_ENTRIES..];
    fs::write(path, keep.join("\n") + "\n")?;
    Ok(())
}
