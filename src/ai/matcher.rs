//! Section-locating collaborator interface
//!
//! When the deterministic matching strategies fail, the matcher hands the
//! changed section and a bounded list of target candidates to an external
//! collaborator that picks the most likely counterpart and scores its own
//! confidence. The interface is a single method so the core can be tested
//! with deterministic stand-ins; nothing here depends on a specific
//! provider's request or response shape.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ai::error::AiResult;

/// A target section offered to the collaborator. Paths and titles only, to
/// bound the payload size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchCandidate {
    pub path: Vec<String>,
    pub title: String,
}

/// One section to locate in the target outline.
#[derive(Debug, Clone, Serialize)]
pub struct LocateRequest {
    /// Heading path of the changed source section.
    pub source_path: Vec<String>,
    /// Title of the changed source section.
    pub title: String,
    /// Body content, possibly truncated to the configured window.
    pub body: String,
    /// Candidate target sections, already capped to the configured count.
    pub candidates: Vec<MatchCandidate>,
}

/// The collaborator's answer: a chosen candidate path, or none, with a
/// confidence score in [0, 1].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocateResponse {
    pub chosen: Option<Vec<String>>,
    pub confidence: f32,
}

impl LocateResponse {
    /// The response equivalent to "no counterpart found".
    pub fn none() -> Self {
        LocateResponse {
            chosen: None,
            confidence: 0.0,
        }
    }
}

/// External collaborator that matches a source section against target
/// candidates.
///
/// Must be treated as fallible and latent: callers impose a timeout and
/// treat failure as a none match, never a fatal error.
#[async_trait]
pub trait SectionLocator: Send + Sync {
    /// Pick the target section corresponding to the request's source
    /// section, or report that none fits.
    async fn locate(&self, request: &LocateRequest) -> AiResult<LocateResponse>;

    /// Provider name for logs and reports.
    fn provider_name(&self) -> &str;
}
