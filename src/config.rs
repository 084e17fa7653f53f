//! Synchronization configuration
//!
//! All size limits, thresholds and pattern lists live in one explicitly
//! constructed, immutable object handed to each component at construction
//! time. Per-document tasks share it behind an `Arc`; there is no ambient
//! global state to race on.

use std::time::Duration;

use crate::batch::BatchLimits;
use crate::normalize::SystemIdMatcher;

/// Immutable configuration for a synchronization run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum sections per AI request batch.
    pub max_sections_per_batch: usize,
    /// Maximum total content bytes per AI request batch.
    pub max_batch_bytes: usize,
    /// Maximum candidate target sections presented to the AI matcher.
    pub max_candidates: usize,
    /// Minimum collaborator confidence for an ai-fuzzy match to be accepted.
    pub acceptance_threshold: f32,
    /// Patterns classifying system-identifier titles.
    pub system_ids: SystemIdMatcher,
    /// File names matched positionally instead of by title (indexes,
    /// tables of contents).
    pub special_files: Vec<String>,
    /// File names skipped entirely.
    pub ignored_files: Vec<String>,
    /// A document whose combined changed source content exceeds this many
    /// bytes is reported and left untouched.
    pub max_source_bytes_per_doc: usize,
    /// Caller-imposed timeout on each collaborator call.
    pub ai_timeout: Duration,
    /// Retries after a transient collaborator failure. Collaborator calls
    /// are read-only, so retrying is safe.
    pub ai_max_retries: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            max_sections_per_batch: 8,
            max_batch_bytes: 16_000,
            max_candidates: 120,
            acceptance_threshold: 0.6,
            system_ids: SystemIdMatcher::default(),
            special_files: vec!["TOC.md".to_string()],
            ignored_files: Vec::new(),
            max_source_bytes_per_doc: 20_000,
            ai_timeout: Duration::from_secs(30),
            ai_max_retries: 1,
        }
    }
}

impl SyncConfig {
    pub fn with_acceptance_threshold(mut self, threshold: f32) -> Self {
        self.acceptance_threshold = threshold;
        self
    }

    pub fn with_special_files<S: Into<String>>(mut self, files: Vec<S>) -> Self {
        self.special_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ignored_files<S: Into<String>>(mut self, files: Vec<S>) -> Self {
        self.ignored_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_system_ids(mut self, ids: SystemIdMatcher) -> Self {
        self.system_ids = ids;
        self
    }

    /// Batch ceilings derived from this configuration.
    pub fn batch_limits(&self) -> BatchLimits {
        BatchLimits {
            max_sections: self.max_sections_per_batch,
            max_bytes: self.max_batch_bytes,
            max_candidates: self.max_candidates,
        }
    }

    /// Whether a document path is on the special (positional) list.
    /// Matched on the file name so callers can pass repository paths.
    pub fn is_special(&self, doc_path: &str) -> bool {
        Self::name_listed(doc_path, &self.special_files)
    }

    /// Whether a document path is on the skip list.
    pub fn is_ignored(&self, doc_path: &str) -> bool {
        Self::name_listed(doc_path, &self.ignored_files)
    }

    fn name_listed(doc_path: &str, list: &[String]) -> bool {
        let name = doc_path.rsplit('/').next().unwrap_or(doc_path);
        list.iter().any(|f| f == name || f == doc_path)
    }
}
