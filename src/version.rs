use std::cmp::Ordering;
use std::fmt;
use std::path::Path;

use serde::{Serialize, Serializer};

use crate::error::ValidationError;

/// True when `name` looks like `X.X.X` or `X.X.X.X` (ASCII digits only).
pub fn is_version_token(name: &str) -> bool {
    let mut count = 0usize;
    for part in name.split('.') {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        count += 1;
    }
    matches!(count, 3 | 4)
}

/// Dot-separated numeric components, for any number of parts. Used where the
/// input is looser than a directory name, e.g. dependency strings.
pub fn numeric_parts(value: &str) -> Option<Vec<u64>> {
    if value.is_empty() {
        return None;
    }
    value
        .split('.')
        .map(|part| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                None
            } else {
                part.parse::<u64>().ok()
            }
        })
        .collect()
}

/// A release number used both as a directory name and as a path substring.
///
/// Matching against file content is always done on [`VersionToken::as_str`];
/// the numeric parts only drive ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken {
    raw: String,
    parts: Vec<u64>,
}

impl VersionToken {
    pub fn parse(field: &'static str, value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingField(field));
        }
        let malformed = || ValidationError::MalformedVersion {
            field,
            value: trimmed.to_string(),
        };
        if !is_version_token(trimmed) {
            return Err(malformed());
        }
        let parts = numeric_parts(trimmed).ok_or_else(malformed)?;
        Ok(Self {
            raw: trimmed.to_string(),
            parts,
        })
    }

    /// Parses a directory basename, returning `None` for anything that is not
    /// a version token.
    pub fn from_dir_name(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        Self::parse("directory name", name).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn parts(&self) -> &[u64] {
        &self.parts
    }
}

impl Ord for VersionToken {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts
            .cmp(&other.parts)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for VersionToken {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for VersionToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}
