//! Deterministic matching strategies
//!
//! Each strategy implements one attempt at finding a changed source
//! section's counterpart in the target outline. They are evaluated in
//! order, first success wins; a new strategy slots into the list without
//! touching the existing ones.

use crate::localize::ChangeRecord;
use crate::matcher::{MatchMethod, MatchResult};
use crate::normalize::{SystemIdMatcher, normalize_path};
use crate::outline::Outline;

/// One attempt at matching a change record against the target outline.
pub trait MatchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `source` is the outline the record's path resolves in (the new
    /// source outline, or the old one for removals).
    fn attempt(
        &self,
        record: &ChangeRecord,
        source: &Outline,
        target: &Outline,
    ) -> Option<MatchResult>;
}

/// Exact structural match: same titles, same ancestor chain.
pub struct DirectStrategy;

impl MatchStrategy for DirectStrategy {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn attempt(
        &self,
        record: &ChangeRecord,
        _source: &Outline,
        target: &Outline,
    ) -> Option<MatchResult> {
        if !target.contains(&record.source_path) {
            return None;
        }
        Some(MatchResult {
            target_path: Some(record.source_path.clone()),
            method: MatchMethod::Direct,
            confidence: 1.0,
        })
    }
}

/// Identifier-exact match for system-variable titles.
///
/// Identifiers are language-invariant, so the deepest path component is
/// compared in normalized form across the whole target outline, ignoring
/// ancestors. Either it matches exactly or the record stays unmatched;
/// identifiers never reach fuzzy matching.
pub struct SystemIdentifierStrategy {
    ids: SystemIdMatcher,
}

impl SystemIdentifierStrategy {
    pub fn new(ids: SystemIdMatcher) -> Self {
        Self { ids }
    }
}

impl MatchStrategy for SystemIdentifierStrategy {
    fn name(&self) -> &'static str {
        "system-identifier"
    }

    fn attempt(
        &self,
        record: &ChangeRecord,
        _source: &Outline,
        target: &Outline,
    ) -> Option<MatchResult> {
        let title = record.source_path.last()?;
        let key = self.ids.identifier_key(title)?;
        let hit = target
            .sections()
            .iter()
            .find(|s| self.ids.identifier_key(&s.title).as_deref() == Some(key.as_str()))?;
        Some(MatchResult {
            target_path: Some(hit.path.clone()),
            method: MatchMethod::SystemIdentifier,
            confidence: 1.0,
        })
    }
}

/// Match on the normalized heading path (case, punctuation and whitespace
/// folded). Carries a fixed sub-maximal confidence to stay distinguishable
/// from direct matches in reports.
pub struct NormalizedStrategy {
    ids: SystemIdMatcher,
}

impl NormalizedStrategy {
    /// Confidence assigned to every normalized match.
    pub const CONFIDENCE: f32 = 0.9;

    pub fn new(ids: SystemIdMatcher) -> Self {
        Self { ids }
    }
}

impl MatchStrategy for NormalizedStrategy {
    fn name(&self) -> &'static str {
        "normalized"
    }

    fn attempt(
        &self,
        record: &ChangeRecord,
        source: &Outline,
        target: &Outline,
    ) -> Option<MatchResult> {
        // Identifiers are exact-or-unmatched; they never match fuzzily.
        if record
            .source_path
            .last()
            .is_some_and(|t| self.ids.is_system_identifier(t))
        {
            return None;
        }
        let wanted = normalize_path(&record.source_path);
        if wanted.is_empty() {
            return None;
        }
        let source_ordinal = source.get(&record.source_path).map_or(0, |s| s.ordinal);
        // Duplicate normalized paths tie-break on sibling-ordinal distance,
        // favoring structural locality.
        let hit = target
            .sections()
            .iter()
            .filter(|s| normalize_path(&s.path) == wanted)
            .min_by_key(|s| s.ordinal.abs_diff(source_ordinal))?;
        Some(MatchResult {
            target_path: Some(hit.path.clone()),
            method: MatchMethod::Normalized,
            confidence: Self::CONFIDENCE,
        })
    }
}

/// Structural-position match for special files (indexes, tables of
/// contents) whose entry titles are language-variant. Matches on level and
/// ordinal chain only; such files never consume AI-matcher budget.
pub struct PositionStrategy;

impl MatchStrategy for PositionStrategy {
    fn name(&self) -> &'static str {
        "position"
    }

    fn attempt(
        &self,
        record: &ChangeRecord,
        source: &Outline,
        target: &Outline,
    ) -> Option<MatchResult> {
        let section = source.get(&record.source_path)?;
        let hit = target
            .sections()
            .iter()
            .find(|s| s.level == section.level && s.position() == section.position())?;
        Some(MatchResult {
            target_path: Some(hit.path.clone()),
            method: MatchMethod::Position,
            confidence: 1.0,
        })
    }
}
