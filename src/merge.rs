//! Surgical merge application
//!
//! Rewrites the target document so that only the sections named by the
//! edits change. Every untouched section is copied verbatim, byte for byte;
//! the applier verifies this before handing the rewrite back, and discards
//! it on violation. Runs single-threaded per document, applying all edits
//! in one pass.

use std::collections::{HashMap, HashSet};

use crate::error::{SyncError, SyncResult};
use crate::outline::Outline;

/// One section-scoped edit to the target document.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionEdit {
    /// Replace the body of the section at `target_path`. The title is only
    /// rewritten when the match strategy indicates the wording itself
    /// changed (normalized or ai-fuzzy matches); direct and
    /// system-identifier matches never set `new_title`.
    Replace {
        target_path: Vec<String>,
        new_body: String,
        new_title: Option<String>,
    },
    /// Insert a new section at the given position.
    Insert {
        position: InsertPosition,
        level: usize,
        title: String,
        body: String,
    },
    /// Delete the section at `target_path`, heading and body. Subsections
    /// are separate sections and are not deleted implicitly.
    Remove { target_path: Vec<String> },
}

/// Where an inserted section lands in the target document.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertPosition {
    /// As the next sibling after the named section's subtree.
    AfterSubtree(Vec<String>),
    /// Directly after the named section's own body, before any existing
    /// children. Used when the source section is its parent's first child.
    FirstChildOf(Vec<String>),
    /// At the end of the document, when no anchor could be resolved.
    End,
}

/// Applies section edits to a target outline and re-serializes it.
pub struct MergeApplier;

impl MergeApplier {
    /// Apply all edits in one pass and return the rewritten document text.
    ///
    /// Fails with [`SyncError::MissingSection`] if an edit names a path the
    /// target outline does not contain, and with
    /// [`SyncError::SerializationMismatch`] if any untouched section did
    /// not survive byte-identically; in both cases the target must be left
    /// as it was.
    pub fn apply(target: &Outline, edits: &[SectionEdit]) -> SyncResult<String> {
        let sections = target.sections();
        let mut replaced: HashMap<usize, (&str, Option<&str>)> = HashMap::new();
        let mut removed: HashSet<usize> = HashSet::new();
        // Insertion texts keyed by the section index they precede.
        let mut inserts: HashMap<usize, Vec<String>> = HashMap::new();

        for edit in edits {
            match edit {
                SectionEdit::Replace {
                    target_path,
                    new_body,
                    new_title,
                } => {
                    let idx = Self::resolve(target, target_path)?;
                    replaced.insert(idx, (new_body.as_str(), new_title.as_deref()));
                }
                SectionEdit::Remove { target_path } => {
                    let idx = Self::resolve(target, target_path)?;
                    removed.insert(idx);
                }
                SectionEdit::Insert {
                    position,
                    level,
                    title,
                    body,
                } => {
                    let at = match position {
                        InsertPosition::AfterSubtree(path) => {
                            let idx = Self::resolve(target, path)?;
                            target.subtree_end(idx)
                        }
                        InsertPosition::FirstChildOf(path) => Self::resolve(target, path)? + 1,
                        InsertPosition::End => sections.len(),
                    };
                    inserts
                        .entry(at)
                        .or_default()
                        .push(render_section(*level, title, body));
                }
            }
        }

        let mut out = String::new();
        for (i, section) in sections.iter().enumerate() {
            if let Some(texts) = inserts.get(&i) {
                for text in texts {
                    out.push_str(text);
                }
            }
            if removed.contains(&i) {
                continue;
            }
            match replaced.get(&i) {
                Some((new_body, new_title)) => {
                    match new_title {
                        Some(title) => out.push_str(&section.heading_with_title(title)),
                        None => out.push_str(&section.heading_raw),
                    }
                    out.push_str(new_body);
                }
                None => {
                    out.push_str(&section.heading_raw);
                    out.push_str(&section.body);
                }
            }
        }
        if let Some(texts) = inserts.get(&sections.len()) {
            for text in texts {
                out.push_str(text);
            }
        }

        // Round-trip guard: every untouched section must appear verbatim,
        // in order, in the rewritten text.
        let mut cursor = 0usize;
        for (i, section) in sections.iter().enumerate() {
            if removed.contains(&i) || replaced.contains_key(&i) {
                continue;
            }
            let piece = format!("{}{}", section.heading_raw, section.body);
            if piece.is_empty() {
                continue;
            }
            match out[cursor..].find(&piece) {
                Some(offset) => cursor += offset + piece.len(),
                None => {
                    return Err(SyncError::SerializationMismatch(format!(
                        "untouched section '{}' was altered by the merge",
                        section.path.join(" > ")
                    )));
                }
            }
        }

        Ok(out)
    }

    fn resolve(target: &Outline, path: &[String]) -> SyncResult<usize> {
        target
            .index_of(path)
            .ok_or_else(|| SyncError::MissingSection(path.join(" > ")))
    }
}

/// Render a brand-new section: heading markers per level, body with a
/// guaranteed trailing newline so the following section stays intact.
fn render_section(level: usize, title: &str, body: &str) -> String {
    let mut text = format!("{} {}\n", "#".repeat(level.max(1)), title);
    text.push_str(body);
    if !body.is_empty() && !body.ends_with('\n') {
        text.push('\n');
    }
    text
}
