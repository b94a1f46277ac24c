use anyhow::{Result, anyhow};
use regex::{Captures, Regex, RegexBuilder};

use crate::error::ValidationError;
use crate::rewrite::{LineCounter, PATH_CHARS, Rewrite, SpanChange};
use crate::scope::{COMPONENT_XML_SUFFIX, EAMD_PATH_PREFIX, ScopeToken};

/// Checks the replacement path's shape before any file is read.
pub fn validate_replacement(path: &str) -> Result<String, ValidationError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField("replacement path"));
    }
    if !trimmed.starts_with(EAMD_PATH_PREFIX) {
        return Err(ValidationError::ReplacementPrefix {
            prefix: EAMD_PATH_PREFIX,
            value: trimmed.to_string(),
        });
    }
    if !trimmed.ends_with(COMPONENT_XML_SUFFIX) {
        return Err(ValidationError::ReplacementSuffix {
            suffix: COMPONENT_XML_SUFFIX,
            value: trimmed.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// `/EAMD.ucp/<path chars>/<Component>.component.xml`.
pub fn component_path_pattern(component: &ScopeToken, case_insensitive: bool) -> Result<Regex> {
    let pattern = format!(
        "{prefix}{chars}*?/{name}{suffix}",
        prefix = regex::escape(EAMD_PATH_PREFIX),
        chars = PATH_CHARS,
        name = regex::escape(component.as_str()),
        suffix = regex::escape(COMPONENT_XML_SUFFIX),
    );
    RegexBuilder::new(&pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|err| anyhow!("invalid component pattern: {err}"))
}

/// Swaps every full component path for a fixed replacement string.
#[derive(Debug, Clone)]
pub struct ComponentPathReplacer {
    pattern: Regex,
    replacement: String,
}

impl ComponentPathReplacer {
    pub fn new(component: &ScopeToken, replacement: &str) -> Result<Self> {
        let replacement = validate_replacement(replacement)?;
        Ok(Self {
            pattern: component_path_pattern(component, false)?,
            replacement,
        })
    }

    pub fn rewrite(&self, content: &str) -> Rewrite {
        let mut changes = Vec::new();
        let mut lines = LineCounter::new(content);
        let text = self
            .pattern
            .replace_all(content, |caps: &Captures<'_>| {
                let Some(whole) = caps.get(0) else {
                    return String::new();
                };
                changes.push(SpanChange {
                    line: lines.line_at(whole.start()),
                    old: whole.as_str().to_string(),
                    new: self.replacement.clone(),
                });
                self.replacement.clone()
            })
            .into_owned();
        Rewrite { text, changes }
    }
}
