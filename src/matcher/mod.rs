//! Section matching
//!
//! Resolves each changed source section to at most one target section
//! through a layered strategy: exact structural match, identifier-exact
//! match for system-variable titles, normalized match, and finally the
//! external AI collaborator for the leftovers. First success wins; matching
//! never mutates an outline, so records can be resolved concurrently
//! against the same target snapshot.

pub mod strategies;

use serde::Serialize;

use crate::ai::LocateResponse;
use crate::localize::ChangeRecord;
use crate::normalize::SystemIdMatcher;
use crate::outline::Outline;

pub use strategies::{
    DirectStrategy, MatchStrategy, NormalizedStrategy, PositionStrategy, SystemIdentifierStrategy,
};

/// Which strategy produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMethod {
    Direct,
    SystemIdentifier,
    Normalized,
    Position,
    AiFuzzy,
    None,
}

/// Outcome of matching one change record against the target outline.
///
/// Strategy and confidence are always consistent: direct, system-identifier
/// and position matches carry 1.0, normalized matches carry
/// [`NormalizedStrategy::CONFIDENCE`], ai-fuzzy matches carry the
/// collaborator's score, and `None` carries 0.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub target_path: Option<Vec<String>>,
    pub method: MatchMethod,
    pub confidence: f32,
}

impl MatchResult {
    pub fn none() -> Self {
        MatchResult {
            target_path: None,
            method: MatchMethod::None,
            confidence: 0.0,
        }
    }

    pub fn is_match(&self) -> bool {
        self.target_path.is_some()
    }
}

/// Outcome of the deterministic strategy pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Matched(MatchResult),
    /// No deterministic strategy succeeded. `ai_eligible` is false for
    /// system identifiers, which must never be matched fuzzily.
    NoMatch { ai_eligible: bool },
}

/// Layered matcher over an ordered strategy list.
pub struct SectionMatcher {
    ids: SystemIdMatcher,
    strategies: Vec<Box<dyn MatchStrategy>>,
    ai_fallback: bool,
}

impl SectionMatcher {
    /// The standard strategy order: direct, system-identifier, normalized.
    pub fn new(ids: SystemIdMatcher) -> Self {
        let strategies: Vec<Box<dyn MatchStrategy>> = vec![
            Box::new(DirectStrategy),
            Box::new(SystemIdentifierStrategy::new(ids.clone())),
            Box::new(NormalizedStrategy::new(ids.clone())),
        ];
        SectionMatcher {
            ids,
            strategies,
            ai_fallback: true,
        }
    }

    /// Matcher for special files: structural position only, no AI fallback.
    pub fn positional(ids: SystemIdMatcher) -> Self {
        SectionMatcher {
            ids,
            strategies: vec![Box::new(PositionStrategy)],
            ai_fallback: false,
        }
    }

    /// Run the deterministic strategies in order against the target
    /// outline. `source` is the outline the record's path resolves in.
    pub fn resolve(
        &self,
        record: &ChangeRecord,
        source: &Outline,
        target: &Outline,
    ) -> Resolution {
        for strategy in &self.strategies {
            if let Some(result) = strategy.attempt(record, source, target) {
                tracing::debug!(
                    strategy = strategy.name(),
                    path = record.source_path.join(" > "),
                    confidence = result.confidence,
                    "section matched"
                );
                return Resolution::Matched(result);
            }
        }
        let is_identifier = record
            .source_path
            .last()
            .is_some_and(|t| self.ids.is_system_identifier(t));
        Resolution::NoMatch {
            ai_eligible: self.ai_fallback && !is_identifier,
        }
    }

    /// Interpret a collaborator response under the acceptance threshold.
    ///
    /// A response below the threshold, with no chosen path, or naming a
    /// path absent from the target outline is downgraded to none, never an
    /// error.
    pub fn accept_ai_response(
        &self,
        response: &LocateResponse,
        target: &Outline,
        threshold: f32,
    ) -> MatchResult {
        let Some(path) = &response.chosen else {
            return MatchResult::none();
        };
        if response.confidence < threshold || !target.contains(path) {
            return MatchResult::none();
        }
        MatchResult {
            target_path: Some(path.clone()),
            method: MatchMethod::AiFuzzy,
            confidence: response.confidence,
        }
    }
}
