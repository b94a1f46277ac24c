use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::ValidationError;

pub const EAMD_PATH_PREFIX: &str = "/EAMD.ucp/";
pub const COMPONENT_XML_SUFFIX: &str = ".component.xml";

/// Capitalises each whitespace, `-` or `_` separated word and joins them.
/// Words without lower-case letters (`XML`, `UI2`) are kept as typed.
pub fn to_pascal_case(input: &str) -> String {
    input
        .split(|ch: char| ch.is_whitespace() || ch == '-' || ch == '_')
        .filter(|word| !word.is_empty())
        .map(capitalize_word)
        .collect()
}

fn capitalize_word(word: &str) -> String {
    if !word.chars().any(char::is_lowercase) {
        return word.to_string();
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Literal text that must appear as a whole path segment for a rewrite to
/// apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ScopeToken(String);

impl ScopeToken {
    /// Last component of the entry path, resolved through `canonicalize` so
    /// `.` and trailing separators behave.
    pub fn from_entry_path(path: &Path) -> Result<Self, ValidationError> {
        let resolved = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        resolved
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .map(|name| Self(name.to_string()))
            .ok_or_else(|| ValidationError::NoScopeToken(path.to_path_buf()))
    }

    pub fn from_component_name(name: &str) -> Result<Self, ValidationError> {
        let normalized = to_pascal_case(name);
        if normalized.is_empty() {
            return Err(ValidationError::EmptyComponentName(name.to_string()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
