use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Input problems detected before a job starts. Nothing on disk has been
/// touched when one of these is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must be provided")]
    MissingField(&'static str),

    #[error("{field} '{value}' must be in format X.X.X or X.X.X.X")]
    MalformedVersion { field: &'static str, value: String },

    #[error("current and new versions must be different (both are {0})")]
    SameVersion(String),

    #[error("{} does not exist or is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("cannot derive a scope token from {}", .0.display())]
    NoScopeToken(PathBuf),

    #[error("component name '{0}' is empty after normalisation")]
    EmptyComponentName(String),

    #[error("replacement path should start with '{prefix}' (got '{value}')")]
    ReplacementPrefix { prefix: &'static str, value: String },

    #[error("replacement path should end with '{suffix}' (got '{value}')")]
    ReplacementSuffix { suffix: &'static str, value: String },
}

/// A file or folder that could not be processed. Recorded in the job result;
/// the job carries on with the next unit.
#[derive(Debug, Clone, Serialize)]
pub struct UnitFailure {
    pub path: PathBuf,
    pub reason: String,
}

impl UnitFailure {
    pub fn new(path: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        Self {
            path: path.into(),
            reason: format!("{err:#}"),
        }
    }
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}
