//! Change localization
//!
//! Intersects a file's diff hunks with its old and new outlines to determine
//! exactly which sections were touched. Sections with no overlapping hunk
//! never produce a record; this is what guarantees untouched content is never
//! re-translated or rewritten.

use serde::Serialize;

use crate::diff::DiffHunk;
use crate::outline::Outline;

/// What happened to a source section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    ContentModified,
    SectionAdded,
    SectionRemoved,
}

/// One localized edit, scoped to a single section of the source document.
///
/// Created per document per synchronization run and consumed immediately by
/// the section matcher; never persisted across runs.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeRecord {
    /// Heading path in the new source outline (old outline for removals).
    pub source_path: Vec<String>,
    pub kind: ChangeKind,
    pub old_body: Option<String>,
    pub new_body: Option<String>,
}

/// Map diff hunks onto section boundaries.
///
/// A hunk spanning multiple sections is split into one record per
/// overlapping section. A hunk that cannot be mapped to any section in
/// either outline becomes a single whole-document fallback record on the
/// root path rather than being dropped.
pub fn localize(hunks: &[DiffHunk], old: &Outline, new: &Outline) -> Vec<ChangeRecord> {
    let mut records: Vec<ChangeRecord> = Vec::new();

    // Modified and added sections, in new-outline document order.
    for section in new.sections() {
        let touched = hunks
            .iter()
            .any(|h| touches(&section.extent(), &h.new_range()));
        if !touched {
            continue;
        }
        match old.get(&section.path) {
            Some(old_section) => {
                // Context lines can spill a hunk into a neighboring section;
                // an identical body means nothing actually changed there.
                if old_section.body != section.body {
                    records.push(ChangeRecord {
                        source_path: section.path.clone(),
                        kind: ChangeKind::ContentModified,
                        old_body: Some(old_section.body.clone()),
                        new_body: Some(section.body.clone()),
                    });
                }
            }
            None => {
                records.push(ChangeRecord {
                    source_path: section.path.clone(),
                    kind: ChangeKind::SectionAdded,
                    old_body: None,
                    new_body: Some(section.body.clone()),
                });
            }
        }
    }

    // Removed sections: present in the old outline, overlapped by a hunk's
    // old-side range, and gone from the new outline.
    for section in old.sections() {
        if new.contains(&section.path) {
            continue;
        }
        let touched = hunks
            .iter()
            .any(|h| touches(&section.extent(), &h.old_range()));
        if touched {
            records.push(ChangeRecord {
                source_path: section.path.clone(),
                kind: ChangeKind::SectionRemoved,
                old_body: Some(section.body.clone()),
                new_body: None,
            });
        }
    }

    // Localization gap: a hunk touching neither outline falls back to a
    // whole-document change on the root path. An ordinary root-body record
    // (preamble change) from the same patch is widened to the fallback so
    // the unmappable hunk is recorded either way.
    let gap = hunks.iter().any(|h| {
        let in_new = new
            .sections()
            .iter()
            .any(|s| touches(&s.extent(), &h.new_range()));
        let in_old = old
            .sections()
            .iter()
            .any(|s| touches(&s.extent(), &h.old_range()));
        !in_new && !in_old
    });
    if gap {
        let fallback = ChangeRecord {
            source_path: Vec::new(),
            kind: ChangeKind::ContentModified,
            old_body: Some(old.serialize()),
            new_body: Some(new.serialize()),
        };
        match records.iter_mut().find(|r| r.source_path.is_empty()) {
            Some(existing) => *existing = fallback,
            None => records.push(fallback),
        }
    }

    records
}

/// Overlap test between a section extent and a hunk range. An empty hunk
/// range (pure removal) is treated as a point touch at its position, since
/// the deletion still happened inside some section.
fn touches(extent: &std::ops::Range<usize>, hunk: &std::ops::Range<usize>) -> bool {
    if hunk.is_empty() {
        let point = hunk.start;
        return extent.contains(&point)
            || (point > 0 && extent.contains(&(point - 1)));
    }
    hunk.start < extent.end && extent.start < hunk.end
}
