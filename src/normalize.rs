//! Title normalization and system-identifier classification
//!
//! Normalization folds the cosmetic variance out of a heading title so two
//! wordings of the same section can be compared. Classification recognizes
//! titles that are really configuration/variable keys; those are
//! language-invariant and must only ever match exactly.

use regex::Regex;

/// Canonicalize a heading title for fuzzy comparison.
///
/// Deterministic and pure: lower-cases, strips surrounding punctuation and
/// Markdown decoration (backticks, emphasis markers, trailing colons), and
/// collapses internal whitespace.
pub fn normalize_title(title: &str) -> String {
    let stripped = title
        .trim()
        .trim_matches(|c: char| matches!(c, '`' | '*' | '_' | '~' | ':' | '#' | '.' | ',' | '!' | '?' | '"' | '\'' | '(' | ')' | '[' | ']'))
        .trim();
    stripped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize every component of a heading path.
pub fn normalize_path(path: &[String]) -> Vec<String> {
    path.iter().map(|c| normalize_title(c)).collect()
}

/// Recognizes system-identifier titles using a configurable pattern set.
///
/// The default patterns cover the common shapes of configuration and
/// system-variable section titles in technical documentation: a
/// backtick-wrapped key, or a bare snake_case key.
#[derive(Debug, Clone)]
pub struct SystemIdMatcher {
    patterns: Vec<Regex>,
}

impl SystemIdMatcher {
    const DEFAULT_PATTERNS: [&'static str; 2] = [
        r"^`[A-Za-z][A-Za-z0-9_.-]*`$",
        r"^[a-z][a-z0-9]*(?:_[a-z0-9]+)+$",
    ];

    /// Build a matcher from custom regex patterns.
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let compiled = patterns
            .iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SystemIdMatcher { patterns: compiled })
    }

    /// Whether the title matches any configured identifier pattern.
    ///
    /// Advisory input to the section matcher, not a matching strategy
    /// by itself.
    pub fn is_system_identifier(&self, title: &str) -> bool {
        let trimmed = title.trim();
        self.patterns.iter().any(|p| p.is_match(trimmed))
    }

    /// The canonical key of an identifier title: decoration stripped,
    /// lower-cased. `None` when the title is not a system identifier.
    pub fn identifier_key(&self, title: &str) -> Option<String> {
        if !self.is_system_identifier(title) {
            return None;
        }
        Some(title.trim().trim_matches('`').to_lowercase())
    }
}

impl Default for SystemIdMatcher {
    fn default() -> Self {
        let patterns = Self::DEFAULT_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("default identifier pattern"))
            .collect();
        SystemIdMatcher { patterns }
    }
}
