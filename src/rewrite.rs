use anyhow::{Result, anyhow};
use regex::{Captures, Regex};
use serde::Serialize;

use crate::scope::{EAMD_PATH_PREFIX, ScopeToken};
use crate::version::VersionToken;

/// Characters allowed inside a path literal. Quotes, angle brackets and
/// whitespace end a path so a match cannot bleed into neighbouring strings,
/// markup or the next line.
pub const PATH_CHARS: &str = r#"[^"'<>\s]"#;

const LINE_COMMENT: &str = r"//[^\n]*";
const BLOCK_COMMENT: &str = r"/\*(?s:.*?)\*/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentPolicy {
    /// `//` and `/* */` comments are matched first and left untouched.
    Mask,
    /// Every scoped path is eligible, comments included.
    Ignore,
}

impl CommentPolicy {
    /// Script sources get comment masking; markup and data files don't,
    /// because `https://` inside them reads as a line comment.
    pub fn for_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "js" | "mjs" | "cjs" | "ts" => CommentPolicy::Mask,
            _ => CommentPolicy::Ignore,
        }
    }
}

/// One replaced span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpanChange {
    pub line: usize,
    pub old: String,
    pub new: String,
}

#[derive(Debug, Clone)]
pub struct Rewrite {
    pub text: String,
    pub changes: Vec<SpanChange>,
}

impl Rewrite {
    pub fn is_changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Version rewriting restricted to `/EAMD.ucp/` path strings that name one
/// scope segment. Holds compiled patterns for one `(scope, old, new)` triple.
#[derive(Debug, Clone)]
pub struct ScopedRewriter {
    plain: Regex,
    masked: Regex,
    new_version: String,
}

impl ScopedRewriter {
    pub fn new(scope: &ScopeToken, old: &VersionToken, new: &VersionToken) -> Result<Self> {
        let target = format!(
            "(?P<head>{prefix}{chars}*?/{scope}/{chars}*?){old}",
            prefix = regex::escape(EAMD_PATH_PREFIX),
            chars = PATH_CHARS,
            scope = regex::escape(scope.as_str()),
            old = regex::escape(old.as_str()),
        );
        let masked = format!("(?P<comment>{LINE_COMMENT}|{BLOCK_COMMENT})|{target}");
        let plain = Regex::new(&target).map_err(|err| anyhow!("invalid scoped pattern: {err}"))?;
        let masked =
            Regex::new(&masked).map_err(|err| anyhow!("invalid scoped pattern: {err}"))?;
        Ok(Self {
            plain,
            masked,
            new_version: new.as_str().to_string(),
        })
    }

    /// Rewrites every in-scope occurrence in a single left-to-right pass.
    pub fn rewrite(&self, content: &str, policy: CommentPolicy) -> Rewrite {
        let regex = match policy {
            CommentPolicy::Mask => &self.masked,
            CommentPolicy::Ignore => &self.plain,
        };
        let mut changes = Vec::new();
        let mut lines = LineCounter::new(content);
        let text = regex
            .replace_all(content, |caps: &Captures<'_>| {
                let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
                let Some(head) = caps.name("head") else {
                    return whole.to_string();
                };
                let replacement = format!("{}{}", head.as_str(), self.new_version);
                let start = caps.get(0).map(|m| m.start()).unwrap_or_default();
                changes.push(SpanChange {
                    line: lines.line_at(start),
                    old: whole.to_string(),
                    new: replacement.clone(),
                });
                replacement
            })
            .into_owned();
        Rewrite { text, changes }
    }
}

/// 1-based line numbers for a run of ascending byte offsets. Each lookup
/// counts newlines only from the previous offset.
pub struct LineCounter<'a> {
    content: &'a str,
    offset: usize,
    line: usize,
}

impl<'a> LineCounter<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            content,
            offset: 0,
            line: 1,
        }
    }

    pub fn line_at(&mut self, offset: usize) -> usize {
        let offset = offset.min(self.content.len());
        if offset < self.offset {
            self.offset = 0;
            self.line = 1;
        }
        self.line += self.content.as_bytes()[self.offset..offset]
            .iter()
            .filter(|&&b| b == b'\n')
            .count();
        self.offset = offset;
        self.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter(scope: &str, old: &str, new: &str) -> ScopedRewriter {
        ScopedRewriter::new(
            &ScopeToken::from_component_name(scope).expect("scope"),
            &VersionToken::parse("old", old).expect("old"),
            &VersionToken::parse("new", new).expect("new"),
        )
        .expect("rewriter")
    }

    #[test]
    fn only_scoped_occurrence_is_replaced() {
        let input = concat!(
            "import x from \"/EAMD.ucp/x/MyWidget/3.1.0/y.js\";\n",
            "const notes = \"version 3.1.0 release notes\";\n",
        );
        let out = rewriter("MyWidget", "3.1.0", "3.2.0").rewrite(input, CommentPolicy::Mask);
        assert_eq!(
            out.text,
            concat!(
                "import x from \"/EAMD.ucp/x/MyWidget/3.2.0/y.js\";\n",
                "const notes = \"version 3.1.0 release notes\";\n",
            )
        );
        assert_eq!(out.changes.len(), 1);
        assert_eq!(out.changes[0].line, 1);
        assert_eq!(out.changes[0].old, "/EAMD.ucp/x/MyWidget/3.1.0");
        assert_eq!(out.changes[0].new, "/EAMD.ucp/x/MyWidget/3.2.0");
    }

    #[test]
    fn other_scopes_are_left_alone() {
        let input = "\"/EAMD.ucp/x/OtherWidget/3.1.0/y.js\"";
        let out = rewriter("MyWidget", "3.1.0", "3.2.0").rewrite(input, CommentPolicy::Ignore);
        assert_eq!(out.text, input);
        assert!(!out.is_changed());
    }

    #[test]
    fn scope_must_be_a_whole_segment() {
        let input = "\"/EAMD.ucp/x/MyWidgetExtra/3.1.0/y.js\"";
        let out = rewriter("MyWidget", "3.1.0", "3.2.0").rewrite(input, CommentPolicy::Ignore);
        assert!(!out.is_changed());
    }

    #[test]
    fn match_cannot_cross_quotes_or_lines() {
        let input = concat!(
            "'/EAMD.ucp/a/b.js' + '/MyWidget/3.1.0/c.js'\n",
            "/EAMD.ucp/a/MyWidget/\n3.1.0\n",
            "<a href=\"/EAMD.ucp/a\"><MyWidget/3.1.0>",
        );
        let out = rewriter("MyWidget", "3.1.0", "3.2.0").rewrite(input, CommentPolicy::Ignore);
        assert_eq!(out.text, input);
    }

    #[test]
    fn comments_are_masked_for_scripts() {
        let input = concat!(
            "// see /EAMD.ucp/x/MyWidget/3.1.0/old.js\n",
            "/* legacy:\n   /EAMD.ucp/x/MyWidget/3.1.0/older.js */\n",
            "load('/EAMD.ucp/x/MyWidget/3.1.0/main.js');\n",
        );
        let out = rewriter("MyWidget", "3.1.0", "3.2.0").rewrite(input, CommentPolicy::Mask);
        assert_eq!(
            out.text,
            concat!(
                "// see /EAMD.ucp/x/MyWidget/3.1.0/old.js\n",
                "/* legacy:\n   /EAMD.ucp/x/MyWidget/3.1.0/older.js */\n",
                "load('/EAMD.ucp/x/MyWidget/3.2.0/main.js');\n",
            )
        );
        assert_eq!(out.changes.len(), 1);
        assert_eq!(out.changes[0].line, 4);
    }

    #[test]
    fn ignore_policy_rewrites_inside_comments() {
        let input = "<!-- ok --> // /EAMD.ucp/x/MyWidget/3.1.0/a.html";
        let out = rewriter("MyWidget", "3.1.0", "3.2.0").rewrite(input, CommentPolicy::Ignore);
        assert!(out.text.ends_with("/MyWidget/3.2.0/a.html"));
    }

    #[test]
    fn every_non_overlapping_match_is_replaced() {
        let input = "[\"/EAMD.ucp/a/MyWidget/3.1.0/x.js\", \"/EAMD.ucp/b/MyWidget/3.1.0/y.js\"]";
        let out = rewriter("MyWidget", "3.1.0", "3.2.0").rewrite(input, CommentPolicy::Mask);
        assert_eq!(
            out.text,
            "[\"/EAMD.ucp/a/MyWidget/3.2.0/x.js\", \"/EAMD.ucp/b/MyWidget/3.2.0/y.js\"]"
        );
        assert_eq!(out.changes.len(), 2);
    }

    #[test]
    fn rewriting_back_restores_the_original() {
        let original = concat!(
            "// header 3.1.0\n",
            "import a from '/EAMD.ucp/Components/tla/MyWidget/3.1.0/src/a.js';\n",
            "<script src=\"/EAMD.ucp/Components/tla/MyWidget/3.1.0/b.js\"></script>\n",
            "const v = '3.1.0';\n",
        );
        let forward = rewriter("MyWidget", "3.1.0", "3.2.0").rewrite(original, CommentPolicy::Mask);
        assert_ne!(forward.text, original);
        let back = rewriter("MyWidget", "3.2.0", "3.1.0").rewrite(&forward.text, CommentPolicy::Mask);
        assert_eq!(back.text, original);
    }

    #[test]
    fn version_dots_are_literal() {
        let input = "'/EAMD.ucp/x/MyWidget/3x1y0/a.js'";
        let out = rewriter("MyWidget", "3.1.0", "3.2.0").rewrite(input, CommentPolicy::Ignore);
        assert!(!out.is_changed());
    }

    #[test]
    fn policy_follows_extension() {
        assert_eq!(CommentPolicy::for_extension("JS"), CommentPolicy::Mask);
        assert_eq!(CommentPolicy::for_extension("ts"), CommentPolicy::Mask);
        assert_eq!(CommentPolicy::for_extension("html"), CommentPolicy::Ignore);
        assert_eq!(CommentPolicy::for_extension("json"), CommentPolicy::Ignore);
    }

    #[test]
    fn line_counter_follows_ascending_and_repeated_offsets() {
        let content = "a\nbb\n\nccc\n";
        let mut lines = LineCounter::new(content);
        assert_eq!(lines.line_at(0), 1);
        assert_eq!(lines.line_at(3), 2);
        assert_eq!(lines.line_at(3), 2);
        assert_eq!(lines.line_at(7), 4);
        assert_eq!(lines.line_at(100), 5);
        assert_eq!(lines.line_at(1), 1);
    }

    #[test]
    fn change_lines_are_reported_for_many_matches() {
        let line = "import '/EAMD.ucp/Components/MyWidget/3.1.0/a.js';\n";
        let input = format!("// header\n{}", line.repeat(3));
        let out = rewriter("MyWidget", "3.1.0", "3.2.0").rewrite(&input, CommentPolicy::Mask);
        let lines: Vec<_> = out.changes.iter().map(|c| c.line).collect();
        assert_eq!(lines, vec![2, 3, 4]);
    }
}
