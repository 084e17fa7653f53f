//! Synchronization runs
//!
//! Wires the pipeline together per document: parse old/new source and
//! current target outlines, localize the diff, resolve each change through
//! the layered matcher, batch the leftovers for the AI collaborator,
//! translate matched content, and apply all edits in one merge pass.
//!
//! Documents share no mutable state, so a run processes them concurrently
//! with one task per document. A document whose merge pass has not
//! committed leaves its target text unmodified; the run always attempts
//! every document and reports a per-document outcome.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::ai::{
    LocateRequest, LocateResponse, MatchCandidate, SectionLocator, TranslateRequest, Translator,
};
use crate::batch::build_batches;
use crate::config::SyncConfig;
use crate::diff::parse_patch;
use crate::localize::{ChangeKind, ChangeRecord, localize};
use crate::matcher::{MatchMethod, MatchResult, Resolution, SectionMatcher};
use crate::merge::{InsertPosition, MergeApplier, SectionEdit};
use crate::normalize::normalize_path;
use crate::outline::Outline;

/// Everything the core needs about one changed document. The changeset
/// source resolves repository contents to plain text; the core never
/// fetches anything.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    /// Repository-relative path, used for special/skip list decisions and
    /// reporting.
    pub path: String,
    pub old_source: String,
    pub new_source: String,
    /// Current target-language text for the same document.
    pub target: String,
    /// Unified-format patch for this file.
    pub patch: String,
}

/// Per-section telemetry for one run.
#[derive(Debug, Clone, Serialize)]
pub struct SectionReport {
    pub source_path: Vec<String>,
    pub kind: ChangeKind,
    pub method: MatchMethod,
    pub confidence: f32,
    pub target_path: Option<Vec<String>>,
    /// Whether this section's content was reduced to a head+tail window
    /// before the AI call.
    pub truncated: bool,
    /// Whether an edit for this section made it into the merge pass.
    pub applied: bool,
}

/// Terminal state of one document after a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum DocumentOutcome {
    /// The target text was rewritten; the new text is in the report.
    Updated,
    /// Nothing to apply (no hunks, no localized changes, or only orphaned
    /// records).
    Unchanged,
    /// The document is on the skip list.
    Skipped,
    /// Combined changed source content exceeded the configured gate.
    SourceTooLarge,
    /// The document's update was aborted; the target was left untouched.
    Failed { reason: String },
}

/// Outcome and telemetry for one document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub path: String,
    pub outcome: DocumentOutcome,
    pub sections: Vec<SectionReport>,
    /// Rewritten target text; persisting it is the caller's responsibility.
    #[serde(skip)]
    pub new_target: Option<String>,
}

impl DocumentReport {
    fn terminal(path: &str, outcome: DocumentOutcome) -> Self {
        DocumentReport {
            path: path.to_string(),
            outcome,
            sections: Vec::new(),
            new_target: None,
        }
    }
}

/// Per-document outcomes for a whole run, serializable for downstream
/// tooling.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub documents: Vec<DocumentReport>,
}

impl RunReport {
    pub fn updated(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| d.outcome == DocumentOutcome::Updated)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| matches!(d.outcome, DocumentOutcome::Failed { .. }))
            .count()
    }
}

/// The synchronization engine: immutable configuration plus the two AI
/// collaborators.
#[derive(Clone)]
pub struct SyncEngine {
    config: Arc<SyncConfig>,
    locator: Arc<dyn SectionLocator>,
    translator: Arc<dyn Translator>,
    source_lang: String,
    target_lang: String,
}

impl SyncEngine {
    pub fn new(
        config: Arc<SyncConfig>,
        locator: Arc<dyn SectionLocator>,
        translator: Arc<dyn Translator>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        SyncEngine {
            config,
            locator,
            translator,
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
        }
    }

    /// Process every document concurrently, one task per document.
    pub async fn sync_all(&self, documents: Vec<DocumentInput>) -> RunReport {
        let mut handles = Vec::with_capacity(documents.len());
        for doc in documents {
            let engine = self.clone();
            let path = doc.path.clone();
            handles.push((path, tokio::spawn(async move { engine.sync_document(&doc).await })));
        }
        let mut reports = Vec::with_capacity(handles.len());
        for (path, handle) in handles {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(err) => {
                    warn!(document = %path, error = %err, "document task aborted");
                    reports.push(DocumentReport::terminal(
                        &path,
                        DocumentOutcome::Failed {
                            reason: format!("task aborted: {}", err),
                        },
                    ));
                }
            }
        }
        RunReport { documents: reports }
    }

    /// Run the full pipeline for one document. Never touches the input
    /// text; the rewritten target is only present on success.
    pub async fn sync_document(&self, doc: &DocumentInput) -> DocumentReport {
        if self.config.is_ignored(&doc.path) {
            info!(document = %doc.path, "skipped (ignore list)");
            return DocumentReport::terminal(&doc.path, DocumentOutcome::Skipped);
        }

        let hunks = parse_patch(&doc.patch);
        if hunks.is_empty() {
            return DocumentReport::terminal(&doc.path, DocumentOutcome::Unchanged);
        }

        let ids = &self.config.system_ids;
        let old = Outline::parse_with(&doc.old_source, ids);
        let new = Outline::parse_with(&doc.new_source, ids);
        let target = Outline::parse_with(&doc.target, ids);

        let records = localize(&hunks, &old, &new);
        if records.is_empty() {
            return DocumentReport::terminal(&doc.path, DocumentOutcome::Unchanged);
        }
        debug!(document = %doc.path, changes = records.len(), "localized diff");

        let changed_bytes: usize = records
            .iter()
            .map(|r| r.new_body.as_deref().unwrap_or("").len())
            .sum();
        if changed_bytes > self.config.max_source_bytes_per_doc {
            warn!(
                document = %doc.path,
                changed_bytes, "changed content exceeds the source size gate"
            );
            return DocumentReport::terminal(&doc.path, DocumentOutcome::SourceTooLarge);
        }

        // An unmappable hunk degrades the whole document to a single
        // translate-everything change.
        if let Some(fallback) = records
            .iter()
            .find(|r| r.source_path.is_empty() && r.new_body.as_deref() != Some(new.root().body.as_str()))
        {
            return self.sync_whole_document(doc, fallback).await;
        }

        let matcher = if self.config.is_special(&doc.path) {
            SectionMatcher::positional(ids.clone())
        } else {
            SectionMatcher::new(ids.clone())
        };

        // Deterministic pass. AI-eligible records stay unresolved for the
        // batched collaborator phase.
        let mut results: Vec<Option<MatchResult>> = Vec::with_capacity(records.len());
        let mut truncated: Vec<bool> = vec![false; records.len()];
        let mut pending: Vec<usize> = Vec::new();
        for (i, record) in records.iter().enumerate() {
            let source_outline = if record.kind == ChangeKind::SectionRemoved {
                &old
            } else {
                &new
            };
            match matcher.resolve(record, source_outline, &target) {
                Resolution::Matched(result) => results.push(Some(result)),
                Resolution::NoMatch { ai_eligible: false } => {
                    results.push(Some(MatchResult::none()));
                }
                Resolution::NoMatch { ai_eligible: true } => {
                    results.push(None);
                    pending.push(i);
                }
            }
        }

        // Batched AI phase for whatever the deterministic pass left over.
        if !pending.is_empty() {
            let candidates: Vec<MatchCandidate> = target
                .sections()
                .iter()
                .skip(1)
                .take(self.config.max_candidates)
                .map(|s| MatchCandidate {
                    path: s.path.clone(),
                    title: s.title.clone(),
                })
                .collect();
            let by_path: HashMap<Vec<String>, usize> = pending
                .iter()
                .map(|&i| (records[i].source_path.clone(), i))
                .collect();
            let pending_records: Vec<ChangeRecord> =
                pending.iter().map(|&i| records[i].clone()).collect();
            let batches = build_batches(&pending_records, &self.config.batch_limits());
            debug!(
                document = %doc.path,
                sections = pending.len(),
                batches = batches.len(),
                "consulting section locator"
            );
            for batch in &batches {
                for snippet in &batch.snippets {
                    let Some(&idx) = by_path.get(&snippet.source_path) else {
                        continue;
                    };
                    if snippet.truncated {
                        warn!(
                            document = %doc.path,
                            section = snippet.source_path.join(" > "),
                            "section content truncated to fit the batch budget"
                        );
                        truncated[idx] = true;
                    }
                    let request = LocateRequest {
                        source_path: snippet.source_path.clone(),
                        title: snippet.source_path.last().cloned().unwrap_or_default(),
                        body: snippet.content.clone(),
                        candidates: candidates.clone(),
                    };
                    let response = self.locate_with_retry(&request).await;
                    let result = matcher.accept_ai_response(
                        &response,
                        &target,
                        self.config.acceptance_threshold,
                    );
                    results[idx] = Some(result);
                }
            }
        }

        self.apply_results(doc, &new, &target, &records, results, truncated)
            .await
    }

    /// Build edits from the match results, translating matched content, and
    /// run the merge pass.
    async fn apply_results(
        &self,
        doc: &DocumentInput,
        new: &Outline,
        target: &Outline,
        records: &[ChangeRecord],
        results: Vec<Option<MatchResult>>,
        truncated: Vec<bool>,
    ) -> DocumentReport {
        let mut edits: Vec<SectionEdit> = Vec::new();
        let mut sections: Vec<SectionReport> = Vec::new();
        // Each target section belongs to at most one edit. A rename can
        // localize as an added+removed pair that both resolve to the same
        // target; the first claimant in document order wins and the later
        // edit is superseded, so a removal can never delete a section
        // another record just rewrote.
        let mut claimed: HashSet<Vec<String>> = HashSet::new();

        for (i, record) in records.iter().enumerate() {
            let result = results[i].clone().unwrap_or_else(MatchResult::none);
            let mut applied = false;

            match (record.kind, result.target_path.clone()) {
                (ChangeKind::SectionRemoved, Some(target_path)) => {
                    if claimed.contains(&target_path) {
                        warn!(
                            document = %doc.path,
                            section = record.source_path.join(" > "),
                            target = target_path.join(" > "),
                            "removal superseded by an earlier edit to the same target section"
                        );
                    } else {
                        claimed.insert(target_path.clone());
                        edits.push(SectionEdit::Remove { target_path });
                        applied = true;
                    }
                }
                (ChangeKind::SectionRemoved, None) => {
                    warn!(
                        document = %doc.path,
                        section = record.source_path.join(" > "),
                        "orphaned removal: no counterpart in target"
                    );
                }
                (ChangeKind::ContentModified | ChangeKind::SectionAdded, Some(target_path)) => {
                    if claimed.contains(&target_path) {
                        warn!(
                            document = %doc.path,
                            section = record.source_path.join(" > "),
                            target = target_path.join(" > "),
                            "edit superseded by an earlier claim on the same target section"
                        );
                        sections.push(self.section_report(record, &result, truncated[i], false));
                        continue;
                    }
                    // Claimed even if translation fails below: a superseded
                    // removal must not delete the section instead.
                    claimed.insert(target_path.clone());
                    let Some(new_body) = record.new_body.as_deref() else {
                        continue;
                    };
                    let reference = target.get(&target_path).map(|s| s.body.clone());
                    let mut request = TranslateRequest::new(new_body);
                    if let Some(reference) = reference {
                        request = request.with_reference(reference);
                    }
                    let Some(translated) = self.translate_with_retry(&request).await else {
                        warn!(
                            document = %doc.path,
                            section = record.source_path.join(" > "),
                            "translation failed, section left untouched"
                        );
                        sections.push(self.section_report(record, &result, truncated[i], false));
                        continue;
                    };
                    // Only fallback matches may rewrite the title: the
                    // wording variance is what triggered them. Direct and
                    // identifier matches never do.
                    let new_title = match result.method {
                        MatchMethod::Normalized | MatchMethod::AiFuzzy => {
                            self.translate_title(record).await
                        }
                        _ => None,
                    };
                    edits.push(SectionEdit::Replace {
                        target_path,
                        new_body: translated,
                        new_title,
                    });
                    applied = true;
                }
                (ChangeKind::ContentModified, None) => {
                    warn!(
                        document = %doc.path,
                        section = record.source_path.join(" > "),
                        "orphaned modification: no counterpart in target"
                    );
                }
                (ChangeKind::SectionAdded, None) => {
                    let Some(section) = new.get(&record.source_path) else {
                        continue;
                    };
                    let Some(new_body) = record.new_body.as_deref() else {
                        continue;
                    };
                    let body_request = TranslateRequest::new(new_body);
                    let Some(body) = self.translate_with_retry(&body_request).await else {
                        sections.push(self.section_report(record, &result, truncated[i], false));
                        continue;
                    };
                    let title = self
                        .translate_title(record)
                        .await
                        .unwrap_or_else(|| section.title.clone());
                    edits.push(SectionEdit::Insert {
                        position: insertion_position(new, target, record),
                        level: section.level,
                        title,
                        body,
                    });
                    applied = true;
                }
            }
            sections.push(self.section_report(record, &result, truncated[i], applied));
        }

        if edits.is_empty() {
            return DocumentReport {
                path: doc.path.clone(),
                outcome: DocumentOutcome::Unchanged,
                sections,
                new_target: None,
            };
        }

        match MergeApplier::apply(target, &edits) {
            Ok(new_target) => {
                info!(
                    document = %doc.path,
                    edits = edits.len(),
                    "target document rewritten"
                );
                DocumentReport {
                    path: doc.path.clone(),
                    outcome: DocumentOutcome::Updated,
                    sections,
                    new_target: Some(new_target),
                }
            }
            Err(err) => {
                warn!(document = %doc.path, error = %err, "merge aborted");
                DocumentReport {
                    path: doc.path.clone(),
                    outcome: DocumentOutcome::Failed {
                        reason: err.to_string(),
                    },
                    sections,
                    new_target: None,
                }
            }
        }
    }

    /// Whole-document fallback for a localization gap: translate the full
    /// new source with the full target as reference.
    async fn sync_whole_document(
        &self,
        doc: &DocumentInput,
        fallback: &ChangeRecord,
    ) -> DocumentReport {
        warn!(
            document = %doc.path,
            "diff could not be mapped to sections, falling back to whole-document translation"
        );
        let Some(source) = fallback.new_body.as_deref() else {
            return DocumentReport::terminal(&doc.path, DocumentOutcome::Unchanged);
        };
        let request = TranslateRequest::new(source).with_reference(doc.target.clone());
        let report_section = SectionReport {
            source_path: Vec::new(),
            kind: ChangeKind::ContentModified,
            method: MatchMethod::None,
            confidence: 0.0,
            target_path: None,
            truncated: false,
            applied: true,
        };
        match self.translate_with_retry(&request).await {
            Some(new_target) => DocumentReport {
                path: doc.path.clone(),
                outcome: DocumentOutcome::Updated,
                sections: vec![report_section],
                new_target: Some(new_target),
            },
            None => DocumentReport::terminal(
                &doc.path,
                DocumentOutcome::Failed {
                    reason: "whole-document translation failed".to_string(),
                },
            ),
        }
    }

    fn section_report(
        &self,
        record: &ChangeRecord,
        result: &MatchResult,
        truncated: bool,
        applied: bool,
    ) -> SectionReport {
        SectionReport {
            source_path: record.source_path.clone(),
            kind: record.kind,
            method: result.method,
            confidence: result.confidence,
            target_path: result.target_path.clone(),
            truncated,
            applied,
        }
    }

    async fn translate_title(&self, record: &ChangeRecord) -> Option<String> {
        let title = record.source_path.last()?;
        let request = TranslateRequest::new(title.clone());
        self.translate_with_retry(&request).await
    }

    /// Collaborator call with caller-imposed timeout and bounded retries.
    /// Locator calls are read-only, so retrying is safe; a final failure is
    /// equivalent to a none match.
    async fn locate_with_retry(&self, request: &LocateRequest) -> LocateResponse {
        for attempt in 0..=self.config.ai_max_retries {
            match timeout(self.config.ai_timeout, self.locator.locate(request)).await {
                Ok(Ok(response)) => return response,
                Ok(Err(err)) => {
                    warn!(attempt, error = %err, "section locator failed");
                }
                Err(_) => {
                    warn!(attempt, "section locator timed out");
                }
            }
        }
        LocateResponse::none()
    }

    async fn translate_with_retry(&self, request: &TranslateRequest) -> Option<String> {
        for attempt in 0..=self.config.ai_max_retries {
            let call = self
                .translator
                .translate(request, &self.source_lang, &self.target_lang);
            match timeout(self.config.ai_timeout, call).await {
                Ok(Ok(text)) => return Some(text),
                Ok(Err(err)) => {
                    warn!(attempt, error = %err, "translator failed");
                }
                Err(_) => {
                    warn!(attempt, "translator timed out");
                }
            }
        }
        None
    }
}

/// Insertion point for a section with no counterpart: after the target
/// resolution of its nearest preceding source sibling, else under its
/// parent, else at the end of the document.
fn insertion_position(new: &Outline, target: &Outline, record: &ChangeRecord) -> InsertPosition {
    let Some(section) = new.get(&record.source_path) else {
        return InsertPosition::End;
    };
    let parent_len = record.source_path.len().saturating_sub(1);
    if section.ordinal > 0 {
        let sibling = new.sections().iter().find(|s| {
            s.path.len() == record.source_path.len()
                && s.path[..parent_len] == record.source_path[..parent_len]
                && s.ordinal == section.ordinal - 1
        });
        if let Some(sibling) = sibling {
            if let Some(anchor) = resolve_in_target(&sibling.path, target) {
                return InsertPosition::AfterSubtree(anchor);
            }
        }
    }
    if parent_len > 0 {
        if let Some(anchor) = resolve_in_target(&record.source_path[..parent_len], target) {
            return InsertPosition::FirstChildOf(anchor);
        }
    }
    InsertPosition::End
}

/// Resolve a source path in the target outline: exact first, then
/// normalized.
fn resolve_in_target(path: &[String], target: &Outline) -> Option<Vec<String>> {
    if target.contains(path) {
        return Some(path.to_vec());
    }
    let wanted = normalize_path(path);
    target
        .sections()
        .iter()
        .find(|s| normalize_path(&s.path) == wanted)
        .map(|s| s.path.clone())
}
