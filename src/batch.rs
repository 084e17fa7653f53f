//! Budgeted batching of sections bound for the AI collaborator
//!
//! Groups unmatched or ambiguous change records into request batches that
//! respect content-size and request-count ceilings before any network call
//! is made. Packing is greedy by content size and preserves document order
//! inside each batch, which keeps runs reproducible.

use crate::localize::ChangeRecord;

/// Ceilings applied before any AI request.
#[derive(Debug, Clone)]
pub struct BatchLimits {
    /// Maximum number of sections per batch.
    pub max_sections: usize,
    /// Maximum total content bytes per batch.
    pub max_bytes: usize,
    /// Maximum number of candidate target sections presented per request.
    pub max_candidates: usize,
}

/// One section's content scoped for an AI request.
#[derive(Debug, Clone, PartialEq)]
pub struct Snippet {
    pub source_path: Vec<String>,
    pub content: String,
    /// Set when the section exceeded the per-batch ceiling and was reduced
    /// to a head+tail window. The caller must warn; content is never
    /// silently lost.
    pub truncated: bool,
}

/// An ordered group of snippets fitting the configured ceilings.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub snippets: Vec<Snippet>,
}

impl Batch {
    pub fn content_bytes(&self) -> usize {
        self.snippets.iter().map(|s| s.content.len()).sum()
    }
}

/// Greedy bin-packing of records into batches.
///
/// Records keep their given (document) order. A record whose own content
/// exceeds `max_bytes` is truncated to a bounded head+tail window and
/// flagged rather than dropped.
pub fn build_batches(records: &[ChangeRecord], limits: &BatchLimits) -> Vec<Batch> {
    let mut batches: Vec<Batch> = Vec::new();
    let mut current = Batch::default();
    // A ceiling of zero sections would flush forever without draining.
    let max_sections = limits.max_sections.max(1);

    for record in records {
        let body = record
            .new_body
            .as_deref()
            .or(record.old_body.as_deref())
            .unwrap_or("");
        let (content, truncated) = truncate_middle(body, limits.max_bytes);

        let over_count = current.snippets.len() >= max_sections;
        let over_bytes = !current.snippets.is_empty()
            && current.content_bytes() + content.len() > limits.max_bytes;
        if over_count || over_bytes {
            batches.push(std::mem::take(&mut current));
        }
        current.snippets.push(Snippet {
            source_path: record.source_path.clone(),
            content,
            truncated,
        });
    }
    if !current.snippets.is_empty() {
        batches.push(current);
    }
    batches
}

/// Reduce text to a head+tail window of at most `max_bytes`, cutting at
/// character boundaries. Returns the text and whether it was truncated.
pub fn truncate_middle(text: &str, max_bytes: usize) -> (String, bool) {
    const ELLIPSIS: &str = "\n…\n";
    if text.len() <= max_bytes {
        return (text.to_string(), false);
    }
    if max_bytes <= ELLIPSIS.len() {
        return (String::new(), true);
    }
    let window = (max_bytes - ELLIPSIS.len()) / 2;
    let head_end = floor_char_boundary(text, window);
    let tail_start = ceil_char_boundary(text, text.len() - window);
    (
        format!("{}{}{}", &text[..head_end], ELLIPSIS, &text[tail_start..]),
        true,
    )
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}
