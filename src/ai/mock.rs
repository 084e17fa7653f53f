//! Mock collaborators for testing
//!
//! Deterministic, API-free stand-ins for the section-locating and
//! translation collaborators, so the pipeline can be exercised without
//! API keys or network access.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::ai::error::{AiError, AiResult};
use crate::ai::matcher::{LocateRequest, LocateResponse, SectionLocator};
use crate::ai::translator::{TranslateRequest, Translator};

/// Behaviors for the mock locator.
#[derive(Debug, Clone)]
pub enum LocatorMode {
    /// Predefined answers keyed by the source path joined with " > ":
    /// (chosen target path, confidence).
    Mappings(HashMap<String, (Vec<String>, f32)>),
    /// Always pick the first candidate with the given confidence.
    FirstCandidate(f32),
    /// Never find a counterpart.
    NoMatch,
    /// Simulate a provider failure.
    Error(String),
}

/// Mock section locator with configurable behavior and optional simulated
/// network delay.
#[derive(Debug, Clone)]
pub struct MockLocator {
    mode: LocatorMode,
    delay_ms: u64,
}

impl MockLocator {
    pub fn new(mode: LocatorMode) -> Self {
        Self { mode, delay_ms: 0 }
    }

    pub fn with_delay(mode: LocatorMode, delay_ms: u64) -> Self {
        Self { mode, delay_ms }
    }
}

#[async_trait]
impl SectionLocator for MockLocator {
    async fn locate(&self, request: &LocateRequest) -> AiResult<LocateResponse> {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        match &self.mode {
            LocatorMode::Mappings(map) => {
                let key = request.source_path.join(" > ");
                Ok(match map.get(&key) {
                    Some((path, confidence)) => LocateResponse {
                        chosen: Some(path.clone()),
                        confidence: *confidence,
                    },
                    None => LocateResponse::none(),
                })
            }
            LocatorMode::FirstCandidate(confidence) => Ok(match request.candidates.first() {
                Some(candidate) => LocateResponse {
                    chosen: Some(candidate.path.clone()),
                    confidence: *confidence,
                },
                None => LocateResponse::none(),
            }),
            LocatorMode::NoMatch => Ok(LocateResponse::none()),
            LocatorMode::Error(msg) => Err(AiError::ProviderError(msg.clone())),
        }
    }

    fn provider_name(&self) -> &str {
        "Mock Locator"
    }
}

/// Behaviors for the mock translator.
#[derive(Debug, Clone)]
pub enum TranslateMode {
    /// Append the target language: "hello" → "hello_zh".
    Suffix,
    /// Predefined mappings: (text, target language) → translation, falling
    /// back to suffix behavior for unknown inputs.
    Mappings(HashMap<(String, String), String>),
    /// Return input unchanged.
    NoOp,
    /// Simulate a provider failure.
    Error(String),
}

/// Mock translator with configurable behavior.
#[derive(Debug, Clone)]
pub struct MockTranslator {
    mode: TranslateMode,
    delay_ms: u64,
}

impl MockTranslator {
    pub fn new(mode: TranslateMode) -> Self {
        Self { mode, delay_ms: 0 }
    }

    pub fn with_delay(mode: TranslateMode, delay_ms: u64) -> Self {
        Self { mode, delay_ms }
    }

    fn apply(&self, text: &str, target: &str) -> AiResult<String> {
        match &self.mode {
            TranslateMode::Suffix => Ok(format!("{}_{}", text, target)),
            TranslateMode::Mappings(map) => {
                let key = (text.to_string(), target.to_string());
                Ok(map
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| format!("{}_{}", text, target)))
            }
            TranslateMode::NoOp => Ok(text.to_string()),
            TranslateMode::Error(msg) => Err(AiError::ProviderError(msg.clone())),
        }
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(
        &self,
        request: &TranslateRequest,
        _source_lang: &str,
        target_lang: &str,
    ) -> AiResult<String> {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        self.apply(&request.source, target_lang)
    }

    fn provider_name(&self) -> &str {
        "Mock Translator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::matcher::MatchCandidate;

    fn request_with_candidates() -> LocateRequest {
        LocateRequest {
            source_path: vec!["Config".to_string(), "Timeout".to_string()],
            title: "Timeout".to_string(),
            body: String::new(),
            candidates: vec![MatchCandidate {
                path: vec!["配置".to_string(), "超时".to_string()],
                title: "超时".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_locator_mappings() {
        let mut map = HashMap::new();
        map.insert(
            "Config > Timeout".to_string(),
            (vec!["配置".to_string(), "超时".to_string()], 0.82),
        );
        let mock = MockLocator::new(LocatorMode::Mappings(map));
        let response = mock.locate(&request_with_candidates()).await.unwrap();
        assert_eq!(
            response.chosen,
            Some(vec!["配置".to_string(), "超时".to_string()])
        );
        assert!((response.confidence - 0.82).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_locator_mappings_unknown_is_none() {
        let mock = MockLocator::new(LocatorMode::Mappings(HashMap::new()));
        let response = mock.locate(&request_with_candidates()).await.unwrap();
        assert_eq!(response, LocateResponse::none());
    }

    #[tokio::test]
    async fn test_locator_first_candidate() {
        let mock = MockLocator::new(LocatorMode::FirstCandidate(0.7));
        let response = mock.locate(&request_with_candidates()).await.unwrap();
        assert_eq!(
            response.chosen,
            Some(vec!["配置".to_string(), "超时".to_string()])
        );
    }

    #[tokio::test]
    async fn test_locator_error_mode() {
        let mock = MockLocator::new(LocatorMode::Error("unavailable".to_string()));
        let result = mock.locate(&request_with_candidates()).await;
        assert!(matches!(result, Err(AiError::ProviderError(_))));
    }

    #[tokio::test]
    async fn test_translator_suffix() {
        let mock = MockTranslator::new(TranslateMode::Suffix);
        let result = mock
            .translate(&TranslateRequest::new("hello"), "en", "zh")
            .await
            .unwrap();
        assert_eq!(result, "hello_zh");
    }

    #[tokio::test]
    async fn test_translator_mappings_fallback() {
        let mut map = HashMap::new();
        map.insert(
            ("hello".to_string(), "zh".to_string()),
            "你好".to_string(),
        );
        let mock = MockTranslator::new(TranslateMode::Mappings(map));
        let hit = mock
            .translate(&TranslateRequest::new("hello"), "en", "zh")
            .await
            .unwrap();
        let miss = mock
            .translate(&TranslateRequest::new("bye"), "en", "zh")
            .await
            .unwrap();
        assert_eq!(hit, "你好");
        assert_eq!(miss, "bye_zh");
    }

    #[tokio::test]
    async fn test_translator_noop() {
        let mock = MockTranslator::new(TranslateMode::NoOp);
        let result = mock
            .translate(&TranslateRequest::new("unchanged"), "en", "zh")
            .await
            .unwrap();
        assert_eq!(result, "unchanged");
    }

    #[tokio::test]
    async fn test_delay_adds_latency() {
        let mock = MockLocator::with_delay(LocatorMode::NoMatch, 50);
        let start = std::time::Instant::now();
        let _ = mock.locate(&request_with_candidates()).await.unwrap();
        assert!(start.elapsed().as_millis() >= 50);
    }
}
