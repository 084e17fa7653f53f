//! docsync — section-level synchronization of translated documentation
//!
//! Keeps a translated Markdown documentation tree in step with its source
//! tree. Instead of re-translating whole files, a run parses both sides
//! into heading outlines, intersects the source diff with the outline to
//! find exactly which sections changed, resolves each changed section to
//! its counterpart in the target document through a layered matcher, and
//! rewrites only those sections. Everything the diff did not touch is
//! carried over byte for byte.
//!
//! The pipeline per document:
//!
//! 1. [`outline`] — parse old source, new source and current target into
//!    section outlines.
//! 2. [`diff`] + [`localize`] — map the unified-diff hunks onto section
//!    boundaries.
//! 3. [`matcher`] — resolve each changed section deterministically
//!    (direct, system-identifier, normalized, positional), falling back to
//!    the AI collaborator for the leftovers.
//! 4. [`batch`] — group AI-bound sections under request ceilings.
//! 5. [`merge`] — apply all section edits in one pass and verify the
//!    untouched remainder survived verbatim.
//!
//! [`run::SyncEngine`] wires these together; [`ai`] holds the collaborator
//! traits, the chat-completion provider, and mock implementations for
//! tests.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use docsync::ai::{LocatorMode, MockLocator, MockTranslator, TranslateMode};
//! use docsync::config::SyncConfig;
//! use docsync::run::{DocumentInput, SyncEngine};
//!
//! # async fn demo() {
//! let engine = SyncEngine::new(
//!     Arc::new(SyncConfig::default()),
//!     Arc::new(MockLocator::new(LocatorMode::NoMatch)),
//!     Arc::new(MockTranslator::new(TranslateMode::Suffix)),
//!     "English",
//!     "Chinese",
//! );
//! let report = engine
//!     .sync_document(&DocumentInput {
//!         path: "guide.md".to_string(),
//!         old_source: "# Guide\n\nold\n".to_string(),
//!         new_source: "# Guide\n\nnew\n".to_string(),
//!         target: "# Guide\n\n旧\n".to_string(),
//!         patch: "@@ -3,1 +3,1 @@\n-old\n+new\n".to_string(),
//!     })
//!     .await;
//! println!("{:?}", report.outcome);
//! # }
//! ```

pub mod ai;
pub mod batch;
pub mod config;
pub mod diff;
pub mod error;
pub mod localize;
pub mod matcher;
pub mod merge;
pub mod normalize;
pub mod outline;
pub mod run;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use localize::{ChangeKind, ChangeRecord};
pub use matcher::{MatchMethod, MatchResult, SectionMatcher};
pub use outline::{Outline, Section};
pub use run::{DocumentInput, DocumentOutcome, DocumentReport, RunReport, SyncEngine};

#[cfg(test)]
mod integration_tests;
