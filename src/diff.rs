//! Textual diff model
//!
//! The changeset source supplies per-file patches in unified format (the
//! shape returned by repository hosting APIs). This module parses them into
//! hunks with line coordinates in the old and new text, which is all the
//! change localizer needs.

/// One line of a diff hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Added(String),
    Removed(String),
    Context(String),
}

/// A contiguous run of added/removed/context lines with positions in the
/// old and new text. Line numbers are 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub old_start: usize,
    pub old_lines: usize,
    pub new_start: usize,
    pub new_lines: usize,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    /// Line range this hunk covers in the new text. Empty for pure removals.
    pub fn new_range(&self) -> std::ops::Range<usize> {
        self.new_start..self.new_start + self.new_lines
    }

    /// Line range this hunk covers in the old text. Empty for pure additions.
    pub fn old_range(&self) -> std::ops::Range<usize> {
        self.old_start..self.old_start + self.old_lines
    }

    /// A hunk that only removes lines has no footprint in the new text.
    pub fn is_pure_removal(&self) -> bool {
        self.new_lines == 0
    }
}

/// Parse a unified-format patch for one file into hunks.
///
/// Permissive: `---`/`+++` headers, `\ No newline at end of file` markers and
/// anything before the first `@@` are skipped; a malformed hunk header ends
/// the current hunk rather than failing. An empty or non-diff input yields no
/// hunks.
pub fn parse_patch(patch: &str) -> Vec<DiffHunk> {
    let mut hunks: Vec<DiffHunk> = Vec::new();
    let mut current: Option<DiffHunk> = None;

    for line in patch.lines() {
        if line.starts_with("@@") {
            if let Some(hunk) = current.take() {
                hunks.push(hunk);
            }
            current = parse_hunk_header(line);
            continue;
        }
        if line.starts_with("---") || line.starts_with("+++") || line.starts_with('\\') {
            continue;
        }
        let parsed = if let Some(rest) = line.strip_prefix('+') {
            Some(DiffLine::Added(rest.to_string()))
        } else if let Some(rest) = line.strip_prefix('-') {
            Some(DiffLine::Removed(rest.to_string()))
        } else if let Some(rest) = line.strip_prefix(' ') {
            Some(DiffLine::Context(rest.to_string()))
        } else if line.is_empty() {
            // Some transports trim the leading space off blank context lines.
            Some(DiffLine::Context(String::new()))
        } else {
            None
        };
        match (parsed, current.as_mut()) {
            (Some(diff_line), Some(hunk)) => hunk.lines.push(diff_line),
            // End of diff content (e.g. a separator between files).
            (None, _) => {
                if let Some(hunk) = current.take() {
                    hunks.push(hunk);
                }
            }
            (_, None) => {}
        }
    }
    if let Some(hunk) = current.take() {
        hunks.push(hunk);
    }
    hunks
}

/// Parse `@@ -a,b +c,d @@` into an empty hunk with coordinates.
/// Unified diff counts lines from 1; a zero start marks an empty range.
fn parse_hunk_header(line: &str) -> Option<DiffHunk> {
    let inner = line.trim_start_matches('@').trim();
    let inner = inner.split("@@").next()?.trim();
    let mut old = (0usize, 0usize);
    let mut new = (0usize, 0usize);
    for part in inner.split_whitespace() {
        if let Some(spec) = part.strip_prefix('-') {
            old = parse_range(spec)?;
        } else if let Some(spec) = part.strip_prefix('+') {
            new = parse_range(spec)?;
        }
    }
    Some(DiffHunk {
        old_start: old.0.saturating_sub(1),
        old_lines: old.1,
        new_start: new.0.saturating_sub(1),
        new_lines: new.1,
        lines: Vec::new(),
    })
}

fn parse_range(spec: &str) -> Option<(usize, usize)> {
    let mut parts = spec.splitn(2, ',');
    let start: usize = parts.next()?.parse().ok()?;
    let count: usize = match parts.next() {
        Some(c) => c.parse().ok()?,
        None => 1,
    };
    Some((start, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATCH: &str = "\
@@ -1,3 +1,4 @@
 # Install
-Run setup.
+Run setup.sh.
+Check the output.
 Done.";

    #[test]
    fn test_parse_single_hunk() {
        let hunks = parse_patch(PATCH);
        assert_eq!(hunks.len(), 1);
        let hunk = &hunks[0];
        assert_eq!(hunk.old_start, 0);
        assert_eq!(hunk.old_lines, 3);
        assert_eq!(hunk.new_start, 0);
        assert_eq!(hunk.new_lines, 4);
        assert_eq!(hunk.lines.len(), 5);
        assert_eq!(hunk.new_range(), 0..4);
    }

    #[test]
    fn test_parse_multiple_hunks() {
        let patch = "@@ -1,2 +1,2 @@\n-a\n+b\n x\n@@ -10,2 +10,3 @@\n x\n+c\n y\n";
        let hunks = parse_patch(patch);
        assert_eq!(hunks.len(), 2);
        assert_eq!(hunks[1].new_start, 9);
        assert_eq!(hunks[1].new_lines, 3);
    }

    #[test]
    fn test_parse_counts_defaulted() {
        let hunks = parse_patch("@@ -5 +7 @@\n-a\n+b\n");
        assert_eq!(hunks[0].old_lines, 1);
        assert_eq!(hunks[0].new_lines, 1);
    }

    #[test]
    fn test_pure_removal_has_empty_new_range() {
        let hunks = parse_patch("@@ -4,2 +3,0 @@\n-gone\n-also gone\n");
        assert!(hunks[0].is_pure_removal());
        assert!(hunks[0].new_range().is_empty());
        assert_eq!(hunks[0].old_range(), 3..5);
    }

    #[test]
    fn test_headers_and_no_newline_marker_skipped() {
        let patch = "--- a/doc.md\n+++ b/doc.md\n@@ -1 +1 @@\n-a\n+b\n\\ No newline at end of file\n";
        let hunks = parse_patch(patch);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].lines.len(), 2);
    }

    #[test]
    fn test_non_diff_input_yields_nothing() {
        assert!(parse_patch("").is_empty());
        assert!(parse_patch("hello world\n").is_empty());
    }

    #[test]
    fn test_blank_context_line_without_space() {
        let patch = "@@ -1,3 +1,3 @@\n a\n\n-b\n+c\n";
        let hunks = parse_patch(patch);
        assert_eq!(hunks[0].lines.len(), 4);
        assert_eq!(hunks[0].lines[1], DiffLine::Context(String::new()));
    }
}
