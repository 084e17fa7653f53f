//! OpenAI-compatible chat-completion provider
//!
//! Backs both collaborator traits with a single HTTP provider speaking the
//! `/chat/completions` wire format, which DeepSeek and compatible services
//! expose.
//!
//! # Authentication
//!
//! `from_env` reads the API key from `DOCSYNC_API_KEY`, the model from
//! `DOCSYNC_MODEL` and the endpoint from `DOCSYNC_BASE_URL` (the latter two
//! optional).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::ai::error::{AiError, AiResult};
use crate::ai::matcher::{LocateRequest, LocateResponse, SectionLocator};
use crate::ai::translator::{TranslateRequest, Translator};

/// Chat-completion provider implementing both the section-locating and the
/// translation collaborator interfaces.
#[derive(Clone)]
pub struct ChatCompletionProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl ChatCompletionProvider {
    const DEFAULT_MODEL: &'static str = "deepseek-chat";
    const DEFAULT_BASE_URL: &'static str = "https://api.deepseek.com/v1";

    /// Create a provider with an explicit API key and model.
    pub fn new(api_key: String, model: String) -> AiResult<Self> {
        if api_key.trim().is_empty() {
            return Err(AiError::ConfigError("API key cannot be empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| AiError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            api_key,
            model,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            client,
        })
    }

    /// Create a provider from environment variables.
    pub fn from_env() -> AiResult<Self> {
        let api_key = std::env::var("DOCSYNC_API_KEY").map_err(|_| {
            AiError::ConfigError("DOCSYNC_API_KEY environment variable not set".to_string())
        })?;
        let model =
            std::env::var("DOCSYNC_MODEL").unwrap_or_else(|_| Self::DEFAULT_MODEL.to_string());
        let mut provider = Self::new(api_key, model)?;
        if let Ok(base_url) = std::env::var("DOCSYNC_BASE_URL") {
            provider.base_url = base_url;
        }
        Ok(provider)
    }

    /// Override the API endpoint (e.g. for a compatible self-hosted service).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// One round trip through `/chat/completions`, returning the assistant
    /// message content.
    async fn complete(&self, system: &str, user: &str) -> AiResult<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": 0.1,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(if status.is_client_error() {
                AiError::ConfigError(format!("API client error ({}): {}", status, error_text))
            } else {
                AiError::ProviderError(format!("API server error ({}): {}", status, error_text))
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AiError::ProtocolError(format!("Failed to parse API response: {}", e)))?;
        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| {
                AiError::ProtocolError(
                    "Invalid API response: missing 'choices[0].message.content'".to_string(),
                )
            })
    }
}

/// The JSON shape the locating prompt asks the model to answer with.
#[derive(Debug, Deserialize)]
struct ChoiceReply {
    choice: Option<usize>,
    confidence: f32,
}

fn locate_prompt(request: &LocateRequest) -> String {
    let mut prompt = String::new();
    prompt.push_str("A section of a source document changed. Pick the section of the translated document that corresponds to it.\n\n");
    prompt.push_str(&format!(
        "Source section path: {}\nSource section title: {}\nSource section content:\n{}\n\nCandidate target sections:\n",
        request.source_path.join(" > "),
        request.title,
        request.body
    ));
    for (i, candidate) in request.candidates.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i, candidate.path.join(" > ")));
    }
    prompt.push_str(
        "\nAnswer with JSON only: {\"choice\": <candidate number or null>, \"confidence\": <0.0-1.0>}\n",
    );
    prompt
}

/// Parse the model's reply into a response, resolving the candidate index
/// back to a path. A reply that cannot be interpreted is a protocol error;
/// the caller downgrades it to a none match.
fn parse_locate_reply(reply: &str, request: &LocateRequest) -> AiResult<LocateResponse> {
    let stripped = reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let parsed: ChoiceReply = serde_json::from_str(stripped)
        .map_err(|e| AiError::ProtocolError(format!("Unparseable locate reply: {}", e)))?;
    let chosen = match parsed.choice {
        Some(i) => Some(
            request
                .candidates
                .get(i)
                .map(|c| c.path.clone())
                .ok_or_else(|| {
                    AiError::ProtocolError(format!("Candidate index {} out of range", i))
                })?,
        ),
        None => None,
    };
    Ok(LocateResponse {
        chosen,
        confidence: parsed.confidence.clamp(0.0, 1.0),
    })
}

#[async_trait]
impl SectionLocator for ChatCompletionProvider {
    async fn locate(&self, request: &LocateRequest) -> AiResult<LocateResponse> {
        if request.candidates.is_empty() {
            return Ok(LocateResponse::none());
        }
        let system = "You match sections between a document and its translation. \
                      You answer with strict JSON and nothing else.";
        let reply = self.complete(system, &locate_prompt(request)).await?;
        parse_locate_reply(&reply, request)
    }

    fn provider_name(&self) -> &str {
        "Chat Completion Locator"
    }
}

fn translate_prompt(request: &TranslateRequest, source_lang: &str, target_lang: &str) -> String {
    let mut prompt = format!(
        "Translate the following technical documentation from {} to {}. \
         Preserve Markdown structure, code blocks, links and inline code exactly. \
         Return only the translation, no commentary.\n\n",
        source_lang, target_lang
    );
    if let Some(reference) = &request.reference {
        prompt.push_str(&format!(
            "Existing translation of the previous revision, for style and terminology:\n---\n{}\n---\n\n",
            reference
        ));
    }
    prompt.push_str(&format!("Content to translate:\n---\n{}\n---\n", request.source));
    prompt
}

#[async_trait]
impl Translator for ChatCompletionProvider {
    async fn translate(
        &self,
        request: &TranslateRequest,
        source_lang: &str,
        target_lang: &str,
    ) -> AiResult<String> {
        let system = "You are a professional technical documentation translator.";
        self.complete(system, &translate_prompt(request, source_lang, target_lang))
            .await
    }

    fn provider_name(&self) -> &str {
        "Chat Completion Translator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::matcher::MatchCandidate;

    fn request() -> LocateRequest {
        LocateRequest {
            source_path: vec!["Config".to_string(), "Idle Timeout".to_string()],
            title: "Idle Timeout".to_string(),
            body: "How long a connection may idle.".to_string(),
            candidates: vec![
                MatchCandidate {
                    path: vec!["配置".to_string(), "超时".to_string()],
                    title: "超时".to_string(),
                },
                MatchCandidate {
                    path: vec!["配置".to_string(), "重试".to_string()],
                    title: "重试".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_new_rejects_empty_api_key() {
        let result = ChatCompletionProvider::new("  ".to_string(), "m".to_string());
        assert!(matches!(result, Err(AiError::ConfigError(_))));
    }

    #[test]
    fn test_locate_prompt_lists_candidates() {
        let prompt = locate_prompt(&request());
        assert!(prompt.contains("Config > Idle Timeout"));
        assert!(prompt.contains("0. 配置 > 超时"));
        assert!(prompt.contains("1. 配置 > 重试"));
    }

    #[test]
    fn test_parse_reply_resolves_index() {
        let req = request();
        let response =
            parse_locate_reply("{\"choice\": 0, \"confidence\": 0.82}", &req).unwrap();
        assert_eq!(
            response.chosen,
            Some(vec!["配置".to_string(), "超时".to_string()])
        );
        assert!((response.confidence - 0.82).abs() < 1e-6);
    }

    #[test]
    fn test_parse_reply_null_choice() {
        let response =
            parse_locate_reply("{\"choice\": null, \"confidence\": 0.1}", &request()).unwrap();
        assert_eq!(response.chosen, None);
    }

    #[test]
    fn test_parse_reply_strips_code_fence() {
        let reply = "```json\n{\"choice\": 1, \"confidence\": 0.7}\n```";
        let response = parse_locate_reply(reply, &request()).unwrap();
        assert_eq!(
            response.chosen,
            Some(vec!["配置".to_string(), "重试".to_string()])
        );
    }

    #[test]
    fn test_parse_reply_out_of_range_is_protocol_error() {
        let result = parse_locate_reply("{\"choice\": 9, \"confidence\": 0.9}", &request());
        assert!(matches!(result, Err(AiError::ProtocolError(_))));
    }

    #[test]
    fn test_parse_reply_clamps_confidence() {
        let response =
            parse_locate_reply("{\"choice\": 0, \"confidence\": 1.7}", &request()).unwrap();
        assert_eq!(response.confidence, 1.0);
    }

    #[test]
    fn test_parse_reply_garbage_is_protocol_error() {
        let result = parse_locate_reply("I think it is the first one", &request());
        assert!(matches!(result, Err(AiError::ProtocolError(_))));
    }

    #[test]
    fn test_translate_prompt_includes_reference() {
        let req = TranslateRequest::new("Run setup.sh.").with_reference("运行 setup。");
        let prompt = translate_prompt(&req, "English", "Chinese");
        assert!(prompt.contains("Run setup.sh."));
        assert!(prompt.contains("运行 setup。"));
        assert!(prompt.contains("English"));
    }
}
