//! Document outline parsing and serialization
//!
//! Converts raw Markdown text into an ordered tree of titled sections and
//! back. The parser is strictly line-based and permissive: it never rejects
//! input, records heading-depth jumps literally, and preserves every byte of
//! the original text so that `serialize(parse(text)) == text` always holds.

use std::collections::HashMap;

use crate::normalize::SystemIdMatcher;

/// A node in a document outline.
///
/// A section owns the raw text strictly between its heading line and the next
/// heading of equal-or-shallower depth. Sub-headings open their own sections;
/// a parent's `body` never contains a child's text.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Display text of the heading, without the marker characters.
    pub title: String,
    /// Heading depth, 1 for top-level. The implicit root is level 0.
    pub level: usize,
    /// Ordered ancestor titles from the document root to this section.
    /// Unique within one outline snapshot.
    pub path: Vec<String>,
    /// Raw body text, whitespace preserved verbatim.
    pub body: String,
    /// Position among siblings under the same parent, 0-based.
    pub ordinal: usize,
    /// Whether the title matches a recognized system-identifier pattern
    /// (e.g. a configuration-variable name). Advisory for the matcher.
    pub is_system_identifier: bool,
    /// Raw heading line including markers and line ending. Empty for the
    /// implicit root section.
    pub(crate) heading_raw: String,
    /// Line index of the heading in the source text, if any.
    pub(crate) heading_line: Option<usize>,
    /// Line range of the body, end exclusive.
    pub(crate) body_start: usize,
    pub(crate) body_end: usize,
    /// Ordinal chain from the root, used for position-based matching of
    /// special files whose titles are language-variant.
    pub(crate) position: Vec<usize>,
}

impl Section {
    /// Line range covered by this section including its heading line.
    pub(crate) fn extent(&self) -> std::ops::Range<usize> {
        self.heading_line.unwrap_or(self.body_start)..self.body_end
    }

    /// Ordinal chain from the document root to this section.
    pub fn position(&self) -> &[usize] {
        &self.position
    }

    /// Rebuild the heading line with a different title, keeping the original
    /// marker style and line ending.
    pub(crate) fn heading_with_title(&self, new_title: &str) -> String {
        if self.heading_raw.is_empty() {
            return String::new();
        }
        let markers: String = self.heading_raw.chars().take_while(|c| *c == '#').collect();
        let eol = if self.heading_raw.ends_with("\r\n") {
            "\r\n"
        } else if self.heading_raw.ends_with('\n') {
            "\n"
        } else {
            ""
        };
        format!("{} {}{}", markers, new_title, eol)
    }
}

/// An ordered tree of sections plus a path-indexed lookup.
#[derive(Debug, Clone)]
pub struct Outline {
    sections: Vec<Section>,
    index: HashMap<Vec<String>, usize>,
}

impl Outline {
    /// Parse document text using the default system-identifier patterns.
    pub fn parse(text: &str) -> Self {
        Self::parse_with(text, &SystemIdMatcher::default())
    }

    /// Parse document text, classifying titles with the given patterns.
    ///
    /// Never fails. A document with no headings yields the implicit root
    /// section only; malformed depth jumps are recorded as written.
    pub fn parse_with(text: &str, ids: &SystemIdMatcher) -> Self {
        let lines: Vec<&str> = text.split_inclusive('\n').collect();

        // (line index, level, title, raw line) for every heading outside
        // fenced code blocks.
        let mut headings: Vec<(usize, usize, String, String)> = Vec::new();
        let mut in_fence = false;
        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                in_fence = !in_fence;
                continue;
            }
            if in_fence {
                continue;
            }
            if let Some((level, title)) = parse_heading(line) {
                headings.push((i, level, title, (*line).to_string()));
            }
        }

        let mut sections: Vec<Section> = Vec::new();
        let mut index: HashMap<Vec<String>, usize> = HashMap::new();
        // Occurrence counts for collision disambiguation.
        let mut seen: HashMap<Vec<String>, usize> = HashMap::new();
        // Next sibling ordinal per parent path.
        let mut ordinals: HashMap<Vec<String>, usize> = HashMap::new();

        let first_heading_line = headings.first().map_or(lines.len(), |h| h.0);
        let root = Section {
            title: String::new(),
            level: 0,
            path: Vec::new(),
            body: lines[..first_heading_line].concat(),
            ordinal: 0,
            is_system_identifier: false,
            heading_raw: String::new(),
            heading_line: None,
            body_start: 0,
            body_end: first_heading_line,
            position: Vec::new(),
        };
        index.insert(Vec::new(), 0);
        sections.push(root);

        // Ancestor chain: (level, disambiguated path component, position).
        let mut stack: Vec<(usize, String, usize)> = Vec::new();
        for (h, &(line_no, level, ref title, ref raw)) in headings.iter().enumerate() {
            while stack.last().is_some_and(|(l, _, _)| *l >= level) {
                stack.pop();
            }
            let parent_path: Vec<String> =
                stack.iter().map(|(_, name, _)| name.clone()).collect();

            let mut path = parent_path.clone();
            path.push(title.clone());
            let occurrence = seen.entry(path.clone()).or_insert(0);
            *occurrence += 1;
            if *occurrence > 1 {
                // Append the occurrence number only when a collision would
                // otherwise occur, keeping first occurrences stable.
                if let Some(last) = path.last_mut() {
                    *last = format!("{}#{}", title, occurrence);
                }
            }

            let ordinal_slot = ordinals.entry(parent_path).or_insert(0);
            let ordinal = *ordinal_slot;
            *ordinal_slot += 1;

            let mut position: Vec<usize> =
                stack.iter().map(|(_, _, ord)| *ord).collect();
            position.push(ordinal);

            let body_start = line_no + 1;
            let body_end = headings.get(h + 1).map_or(lines.len(), |next| next.0);

            let component = path
                .last()
                .cloned()
                .unwrap_or_else(|| title.clone());
            stack.push((level, component, ordinal));

            index.insert(path.clone(), sections.len());
            sections.push(Section {
                title: title.clone(),
                level,
                path,
                body: lines[body_start..body_end].concat(),
                ordinal,
                is_system_identifier: ids.is_system_identifier(title),
                heading_raw: raw.clone(),
                heading_line: Some(line_no),
                body_start,
                body_end,
                position,
            });
        }

        Outline { sections, index }
    }

    /// All sections in document order. Index 0 is the implicit root.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Look up a section by its heading path.
    pub fn get(&self, path: &[String]) -> Option<&Section> {
        self.index.get(path).map(|&i| &self.sections[i])
    }

    /// Whether a section with this heading path exists.
    pub fn contains(&self, path: &[String]) -> bool {
        self.index.contains_key(path)
    }

    /// Position of a section in document order.
    pub fn index_of(&self, path: &[String]) -> Option<usize> {
        self.index.get(path).copied()
    }

    /// The implicit root section holding any text before the first heading.
    pub fn root(&self) -> &Section {
        &self.sections[0]
    }

    /// Index one past the last descendant of the section at `idx`.
    pub(crate) fn subtree_end(&self, idx: usize) -> usize {
        let level = self.sections[idx].level;
        let mut end = idx + 1;
        while end < self.sections.len() && self.sections[end].level > level {
            end += 1;
        }
        end
    }

    /// Reconstruct the document text, byte-identical to the parsed input.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push_str(&section.heading_raw);
            out.push_str(&section.body);
        }
        out
    }
}

/// Parse an ATX heading line into (level, title). Levels above 6 are not
/// headings in Markdown and are left to the surrounding body.
fn parse_heading(line: &str) -> Option<(usize, String)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    Some((level, rest.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(outline: &Outline) -> Vec<String> {
        outline
            .sections()
            .iter()
            .skip(1)
            .map(|s| s.path.join(" > "))
            .collect()
    }

    #[test]
    fn test_round_trip_simple() {
        let text = "# Install\n\nRun setup.\n\n## Step 1\n\nDo it.\n";
        let outline = Outline::parse(text);
        assert_eq!(outline.serialize(), text);
    }

    #[test]
    fn test_round_trip_no_trailing_newline() {
        let text = "# Title\nbody without trailing newline";
        let outline = Outline::parse(text);
        assert_eq!(outline.serialize(), text);
    }

    #[test]
    fn test_round_trip_no_headings() {
        let text = "just prose\nno headings at all\n";
        let outline = Outline::parse(text);
        assert_eq!(outline.sections().len(), 1);
        assert_eq!(outline.root().body, text);
        assert_eq!(outline.serialize(), text);
    }

    #[test]
    fn test_round_trip_empty() {
        let outline = Outline::parse("");
        assert_eq!(outline.sections().len(), 1);
        assert_eq!(outline.serialize(), "");
    }

    #[test]
    fn test_preamble_goes_to_root() {
        let text = "---\ntitle: Doc\n---\n\n# First\n\nbody\n";
        let outline = Outline::parse(text);
        assert_eq!(outline.root().body, "---\ntitle: Doc\n---\n\n");
        assert_eq!(outline.serialize(), text);
    }

    #[test]
    fn test_heading_inside_code_fence_ignored() {
        let text = "# Real\n\n```\n# not a heading\n```\n\nmore\n";
        let outline = Outline::parse(text);
        assert_eq!(outline.sections().len(), 2);
        assert_eq!(outline.serialize(), text);
    }

    #[test]
    fn test_paths_reflect_nesting() {
        let text = "# A\n\n## B\n\nb\n\n## C\n\nc\n\n# D\n\nd\n";
        let outline = Outline::parse(text);
        assert_eq!(paths(&outline), vec!["A", "A > B", "A > C", "D"]);
    }

    #[test]
    fn test_depth_jump_recorded_literally() {
        // Level 1 directly followed by level 3: accepted, literal nesting.
        let text = "# A\n\n### Deep\n\nbody\n";
        let outline = Outline::parse(text);
        assert_eq!(paths(&outline), vec!["A", "A > Deep"]);
        let deep = &outline.sections()[2];
        assert_eq!(deep.level, 3);
        assert_eq!(outline.serialize(), text);
    }

    #[test]
    fn test_duplicate_titles_disambiguated() {
        let text = "# Setup\n\none\n\n# Setup\n\ntwo\n";
        let outline = Outline::parse(text);
        assert_eq!(paths(&outline), vec!["Setup", "Setup#2"]);
        let first = outline.get(&["Setup".to_string()]).unwrap();
        assert_eq!(first.body, "\none\n\n");
        let second = outline.get(&["Setup#2".to_string()]).unwrap();
        assert_eq!(second.body, "\ntwo\n");
    }

    #[test]
    fn test_ordinals_count_siblings() {
        let text = "# A\n\n## X\n\n## Y\n\n# B\n";
        let outline = Outline::parse(text);
        let a = outline.get(&["A".to_string()]).unwrap();
        let b = outline.get(&["B".to_string()]).unwrap();
        let y = outline
            .get(&["A".to_string(), "Y".to_string()])
            .unwrap();
        assert_eq!(a.ordinal, 0);
        assert_eq!(b.ordinal, 1);
        assert_eq!(y.ordinal, 1);
        assert_eq!(y.position(), &[0, 1]);
    }

    #[test]
    fn test_body_excludes_subsections() {
        let text = "# A\n\nparent body\n\n## B\n\nchild body\n";
        let outline = Outline::parse(text);
        let a = outline.get(&["A".to_string()]).unwrap();
        assert_eq!(a.body, "\nparent body\n\n");
    }

    #[test]
    fn test_system_identifier_classification() {
        let text = "# Variables\n\n## `tidb_enable_async_commit`\n\nbody\n";
        let outline = Outline::parse(text);
        let var = &outline.sections()[2];
        assert!(var.is_system_identifier);
        assert!(!outline.sections()[1].is_system_identifier);
    }

    #[test]
    fn test_heading_with_title_preserves_style() {
        let text = "## Old Title\r\nbody\r\n";
        let outline = Outline::parse(text);
        let section = &outline.sections()[1];
        assert_eq!(section.heading_with_title("New"), "## New\r\n");
    }

    #[test]
    fn test_subtree_end_spans_descendants() {
        let text = "# A\n## B\n### C\n# D\n";
        let outline = Outline::parse(text);
        let a = outline.index_of(&["A".to_string()]).unwrap();
        assert_eq!(outline.subtree_end(a), a + 3);
    }
}
