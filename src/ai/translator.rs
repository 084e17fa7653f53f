//! Translation collaborator interface
//!
//! The core never translates text itself; it scopes source and reference
//! content per matched section and hands it to an external collaborator
//! through this trait.

use async_trait::async_trait;
use serde::Serialize;

use crate::ai::error::AiResult;

/// A translation request for one section-scoped piece of content.
#[derive(Debug, Clone, Serialize)]
pub struct TranslateRequest {
    /// Source-language content to translate.
    pub source: String,
    /// Existing target-language content for the same section, as a style
    /// and terminology reference.
    pub reference: Option<String>,
    /// Output size hint for the provider, in bytes.
    pub max_output_bytes: usize,
}

impl TranslateRequest {
    pub fn new(source: impl Into<String>) -> Self {
        TranslateRequest {
            source: source.into(),
            reference: None,
            max_output_bytes: 16_000,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// External collaborator that translates section content between languages.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate one request from `source_lang` to `target_lang`.
    async fn translate(
        &self,
        request: &TranslateRequest,
        source_lang: &str,
        target_lang: &str,
    ) -> AiResult<String>;

    /// Provider name for logs and reports.
    fn provider_name(&self) -> &str;
}
