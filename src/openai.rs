//! OpenAI-compatible chat completion backend for both capabilities.
//!
//! Translation and detection are plain chat completions. There is no local
//! model, so the capability is either `Available` (an API key is configured)
//! or `Unavailable`; it never needs a download.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::capability::{
    CapabilityError, CapabilityStatus, DetectionCapability, DetectorHandle, DownloadMonitor,
    PlatformDetection, TranslationCapability, TranslatorHandle,
};
use crate::config::Config;
use crate::i18n::LanguageRegistry;
use crate::retry::{with_retry_if, RetryConfig};

const TRANSLATION_MAX_TOKENS: u32 = 2048;
const DETECTION_MAX_TOKENS: u32 = 200;
const REASONING_MAX_TOKENS: u32 = 16000;

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
}

/// Check if a model is a reasoning model that doesn't support temperature
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// One entry of the JSON array the detection prompt asks for.
#[derive(Debug, Deserialize)]
struct DetectedLanguage {
    language: String,
    confidence: f64,
}

fn build_translation_system_prompt(source_language: &str, target_language: &str) -> String {
    format!(
        r#"You are a professional translator. Translate the text the user selected from {} to {}.

## Translation Rules

### DO NOT translate:
- URLs, email addresses and file paths
- Code snippets, identifiers and command names
- Proper names of people, companies, and products

### Formatting:
- Preserve line breaks, markdown formatting and emojis
- Keep punctuation appropriate for the target language

### Output:
- Reply with the translation only, without quotes, notes or explanations
- If a term has no good translation, keep the original term"#,
        source_language, target_language
    )
}

fn build_translation_user_prompt(text: &str, target_language: &str) -> String {
    format!("Translate the following text to {}:\n\n{}", target_language, text)
}

fn build_detection_system_prompt(registry: &LanguageRegistry) -> String {
    let languages = registry
        .all()
        .iter()
        .map(|p| format!("- {} ({})", p.code(), p.display_name()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You identify the language of a text snippet.

Reply with a JSON array only, best guess first, at most 3 entries:
[{{"language": "<ISO 639-1 code>", "confidence": <number between 0 and 1>}}]

Prefer these codes when they apply:
{}

Use any other ISO 639-1 code if the text is in a different language."#,
        languages
    )
}

/// Parse the detection reply, tolerating a surrounding markdown code fence.
fn parse_detection_response(content: &str) -> Result<Vec<PlatformDetection>> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let detected: Vec<DetectedLanguage> = serde_json::from_str(body)
        .with_context(|| format!("Detection reply is not a JSON array: {}", body))?;

    Ok(detected
        .into_iter()
        .map(|d| PlatformDetection {
            language_code: d.language.trim().to_ascii_lowercase(),
            confidence: d.confidence,
        })
        .collect())
}

/// Determine if an error is retryable (5xx errors, 429 rate limit, network errors)
/// Other 4xx client errors should not be retried
fn is_retryable_error(error: &anyhow::Error) -> bool {
    let error_str = error.to_string();

    // Error format: "OpenAI API error during translation (400 Bad Request): ..."
    if error_str.contains("OpenAI API error") {
        if let Some(start) = error_str.find('(') {
            if let Some(end) = error_str[start..].find(')') {
                let status_str = &error_str[start + 1..start + end];
                let status_num = status_str.split_whitespace().next().unwrap_or("");
                if let Ok(status) = status_num.parse::<u16>() {
                    return status == 429 || status >= 500;
                }
            }
        }
    }

    // Network errors, timeouts and malformed replies
    true
}

/// Connection settings shared by the capability and every handle it creates.
#[derive(Debug, Clone)]
struct ChatClient {
    http: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
    model: String,
    temperature: f32,
    retry: RetryConfig,
}

impl ChatClient {
    async fn complete(
        &self,
        operation: &str,
        system_prompt: String,
        user_prompt: String,
        max_tokens: u32,
    ) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .context("OpenAI API key is not configured")?;

        // Reasoning models need higher token limits and don't support temperature
        let is_reasoning = is_reasoning_model(&self.model);
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system_prompt,
                },
                Message {
                    role: "user".to_string(),
                    content: user_prompt,
                },
            ],
            max_completion_tokens: if is_reasoning {
                REASONING_MAX_TOKENS
            } else {
                max_tokens
            },
            temperature: if is_reasoning {
                None
            } else {
                Some(self.temperature)
            },
            reasoning_effort: if is_reasoning {
                Some("low".to_string())
            } else {
                None
            },
        };

        with_retry_if(
            &self.retry,
            operation,
            || async {
                let response = self
                    .http
                    .post(&self.api_url)
                    .header("Authorization", format!("Bearer {}", api_key))
                    .header("Content-Type", "application/json")
                    .json(&request)
                    .send()
                    .await
                    .with_context(|| format!("Failed to send {} request to OpenAI API", operation))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
                    anyhow::bail!("OpenAI API error during {} ({}): {}", operation, status, body);
                }

                let chat_response: ChatResponse = response
                    .json()
                    .await
                    .with_context(|| format!("Failed to parse OpenAI {} response", operation))?;

                chat_response
                    .choices
                    .into_iter()
                    .next()
                    .map(|c| c.message.content.trim().to_string())
                    .with_context(|| format!("OpenAI {} response contained no choices", operation))
            },
            is_retryable_error,
        )
        .await
    }
}

/// Translation and detection through an OpenAI-compatible chat endpoint.
#[derive(Clone)]
pub struct OpenAiCapability {
    client: Arc<ChatClient>,
    registry: Arc<LanguageRegistry>,
}

impl OpenAiCapability {
    pub fn new(api_key: Option<String>, api_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Arc::new(ChatClient {
                http: reqwest::Client::new(),
                api_key,
                api_url: api_url.into(),
                model: model.into(),
                temperature: 0.3,
                retry: RetryConfig::remote_call(),
            }),
            registry: LanguageRegistry::global(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.openai_api_key.clone(),
            config.openai_api_url.clone(),
            config.openai_model.clone(),
        )
        .with_temperature(config.openai_temperature)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        Arc::make_mut(&mut self.client).temperature = temperature;
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        Arc::make_mut(&mut self.client).retry = retry;
        self
    }

    fn status(&self) -> CapabilityStatus {
        if self.client.api_key.is_some() {
            CapabilityStatus::Available
        } else {
            CapabilityStatus::Unavailable
        }
    }

    /// Display names for a pair, or `UnsupportedPair` if either is unknown.
    fn pair_names(&self, source: &str, target: &str) -> Result<(String, String), CapabilityError> {
        match (self.registry.get(source), self.registry.get(target)) {
            (Ok(from), Ok(to)) => Ok((
                from.display_name().to_string(),
                to.display_name().to_string(),
            )),
            _ => Err(CapabilityError::UnsupportedPair {
                from: source.to_string(),
                to: target.to_string(),
            }),
        }
    }
}

#[async_trait]
impl TranslationCapability for OpenAiCapability {
    async fn availability(
        &self,
        source: &str,
        target: &str,
    ) -> Result<CapabilityStatus, CapabilityError> {
        self.pair_names(source, target)?;
        Ok(self.status())
    }

    async fn create(
        &self,
        source: &str,
        target: &str,
        _monitor: DownloadMonitor,
    ) -> Result<Box<dyn TranslatorHandle>, CapabilityError> {
        let (source_name, target_name) = self.pair_names(source, target)?;
        if self.status() == CapabilityStatus::Unavailable {
            return Err(CapabilityError::Failed(
                "OpenAI API key is not configured".to_string(),
            ));
        }

        Ok(Box::new(OpenAiTranslator {
            client: self.client.clone(),
            source_name,
            target_name,
        }))
    }
}

#[async_trait]
impl DetectionCapability for OpenAiCapability {
    async fn availability(&self) -> Result<CapabilityStatus, CapabilityError> {
        Ok(self.status())
    }

    async fn create(
        &self,
        _monitor: DownloadMonitor,
    ) -> Result<Box<dyn DetectorHandle>, CapabilityError> {
        if self.status() == CapabilityStatus::Unavailable {
            return Err(CapabilityError::Failed(
                "OpenAI API key is not configured".to_string(),
            ));
        }

        Ok(Box::new(OpenAiDetector {
            client: self.client.clone(),
            system_prompt: build_detection_system_prompt(&self.registry),
        }))
    }
}

struct OpenAiTranslator {
    client: Arc<ChatClient>,
    source_name: String,
    target_name: String,
}

#[async_trait]
impl TranslatorHandle for OpenAiTranslator {
    async fn translate(&self, text: &str) -> Result<String, CapabilityError> {
        debug!(
            "Requesting {} -> {} translation from {}",
            self.source_name, self.target_name, self.client.model
        );

        let translated = self
            .client
            .complete(
                "translation",
                build_translation_system_prompt(&self.source_name, &self.target_name),
                build_translation_user_prompt(text, &self.target_name),
                TRANSLATION_MAX_TOKENS,
            )
            .await?;

        if translated.is_empty() {
            warn!("OpenAI returned an empty translation");
            return Err(CapabilityError::Failed(
                "OpenAI returned an empty translation".to_string(),
            ));
        }
        Ok(translated)
    }
}

struct OpenAiDetector {
    client: Arc<ChatClient>,
    system_prompt: String,
}

#[async_trait]
impl DetectorHandle for OpenAiDetector {
    async fn detect(&self, text: &str) -> Result<Vec<PlatformDetection>, CapabilityError> {
        let reply = self
            .client
            .complete(
                "language detection",
                self.system_prompt.clone(),
                text.to_string(),
                DETECTION_MAX_TOKENS,
            )
            .await?;

        Ok(parse_detection_response(&reply)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn capability(server: &MockServer) -> OpenAiCapability {
        OpenAiCapability::new(
            Some("test-openai-key".to_string()),
            format!("{}/v1/chat/completions", server.uri()),
            "gpt-4o-mini",
        )
        .with_retry_config(RetryConfig::new(3, Duration::from_millis(10)))
    }

    fn create_openai_response(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [
                {
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": content
                    },
                    "finish_reason": "stop"
                }
            ]
        })
    }

    async fn translator(cap: &OpenAiCapability, from: &str, to: &str) -> Box<dyn TranslatorHandle> {
        TranslationCapability::create(cap, from, to, DownloadMonitor::noop())
            .await
            .expect("translator should be created")
    }

    // ==================== Prompt Tests ====================

    #[test]
    fn test_translation_system_prompt_names_languages() {
        let prompt = build_translation_system_prompt("English", "Chinese");

        assert!(prompt.contains("from English to Chinese"));
        assert!(prompt.contains("DO NOT translate"));
        assert!(prompt.contains("translation only"));
    }

    #[test]
    fn test_translation_user_prompt() {
        let prompt = build_translation_user_prompt("Hello world", "Japanese");

        assert!(prompt.contains("to Japanese"));
        assert!(prompt.ends_with("Hello world"));
    }

    #[test]
    fn test_detection_prompt_lists_registry() {
        let prompt = build_detection_system_prompt(&LanguageRegistry::global());

        assert!(prompt.contains("- zh (Chinese)"));
        assert!(prompt.contains("- pt (Portuguese)"));
        assert!(prompt.contains("JSON array"));
    }

    // ==================== Parsing Tests ====================

    #[test]
    fn test_parse_detection_plain_json() {
        let parsed = parse_detection_response(
            r#"[{"language": "FR", "confidence": 0.9}, {"language": "it", "confidence": 0.05}]"#,
        )
        .unwrap();

        assert_eq!(
            parsed,
            vec![
                PlatformDetection {
                    language_code: "fr".to_string(),
                    confidence: 0.9,
                },
                PlatformDetection {
                    language_code: "it".to_string(),
                    confidence: 0.05,
                },
            ]
        );
    }

    #[test]
    fn test_parse_detection_code_fence() {
        let parsed =
            parse_detection_response("```json\n[{\"language\": \"ja\", \"confidence\": 0.8}]\n```")
                .unwrap();
        assert_eq!(parsed[0].language_code, "ja");

        let parsed =
            parse_detection_response("```\n[{\"language\": \"ko\", \"confidence\": 0.7}]\n```")
                .unwrap();
        assert_eq!(parsed[0].language_code, "ko");
    }

    #[test]
    fn test_parse_detection_rejects_prose() {
        let err = parse_detection_response("The text is French.").unwrap_err();
        assert!(err.to_string().contains("not a JSON array"));
    }

    // ==================== Request Tests ====================

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![],
            max_completion_tokens: 2048,
            temperature: Some(0.3),
            reasoning_effort: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_completion_tokens"], 2048);
        assert!(json.get("temperature").is_some());
        assert!(json.get("reasoning_effort").is_none());
    }

    #[test]
    fn test_is_reasoning_model() {
        assert!(is_reasoning_model("gpt-5-mini"));
        assert!(is_reasoning_model("o1-preview"));
        assert!(is_reasoning_model("o3-mini"));
        assert!(is_reasoning_model("o4-mini"));
        assert!(!is_reasoning_model("gpt-4o-mini"));
        assert!(!is_reasoning_model("gpt-4.1"));
    }

    #[test]
    fn test_is_retryable_error() {
        let retryable = |msg: &str| is_retryable_error(&anyhow::anyhow!(msg.to_string()));

        assert!(retryable("OpenAI API error during translation (500 Internal Server Error): x"));
        assert!(retryable("OpenAI API error during translation (429 Too Many Requests): x"));
        assert!(!retryable("OpenAI API error during translation (400 Bad Request): x"));
        assert!(!retryable("OpenAI API error during language detection (401 Unauthorized): x"));
        assert!(retryable("connection reset by peer"));
    }

    // ==================== Availability Tests ====================

    #[tokio::test]
    async fn test_no_api_key_is_unavailable() {
        let cap = OpenAiCapability::new(None, "http://localhost/unused", "gpt-4o-mini");

        assert_eq!(
            TranslationCapability::availability(&cap, "en", "zh").await.unwrap(),
            CapabilityStatus::Unavailable
        );
        assert_eq!(
            DetectionCapability::availability(&cap).await.unwrap(),
            CapabilityStatus::Unavailable
        );
        assert!(DetectionCapability::create(&cap, DownloadMonitor::noop())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_unregistered_pair_is_unsupported() {
        let server = MockServer::start().await;
        let cap = capability(&server);

        let err = TranslationCapability::availability(&cap, "en", "xx")
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::UnsupportedPair { .. }));
    }

    #[tokio::test]
    async fn test_with_api_key_is_available() {
        let server = MockServer::start().await;
        let cap = capability(&server);

        assert_eq!(
            TranslationCapability::availability(&cap, "en", "zh").await.unwrap(),
            CapabilityStatus::Available
        );
    }

    // ==================== HTTP Tests ====================

    #[tokio::test]
    async fn test_translate_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-openai-key"))
            .and(body_partial_json(serde_json::json!({ "model": "gpt-4o-mini" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(create_openai_response("你好，世界")))
            .expect(1)
            .mount(&server)
            .await;

        let cap = capability(&server);
        let result = translator(&cap, "en", "zh").await.translate("Hello, world").await;

        assert_eq!(result.unwrap(), "你好，世界");
    }

    #[tokio::test]
    async fn test_translate_retries_on_500() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_string(r#"{"error": {"message": "Internal Server Error"}}"#),
            )
            .up_to_n_times(2)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(create_openai_response("Hola")))
            .mount(&server)
            .await;

        let cap = capability(&server);
        let result = translator(&cap, "en", "es").await.translate("Hello").await;

        assert_eq!(result.unwrap(), "Hola");
    }

    #[tokio::test]
    async fn test_translate_no_retry_on_400() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"error": {"message": "Bad request"}}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cap = capability(&server);
        let err = translator(&cap, "en", "de")
            .await
            .translate("Hello")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("400"), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn test_translate_exhausts_retries() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(3)
            .mount(&server)
            .await;

        let cap = capability(&server);
        let err = translator(&cap, "en", "fr")
            .await
            .translate("Hello")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_translate_empty_choices() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let cap = capability(&server).with_retry_config(RetryConfig::once());
        let err = translator(&cap, "en", "ja")
            .await
            .translate("Hello")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("no choices"));
    }

    #[tokio::test]
    async fn test_detect_parses_reply() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(create_openai_response(
                "```json\n[{\"language\": \"de\", \"confidence\": 0.93}]\n```",
            )))
            .mount(&server)
            .await;

        let cap = capability(&server);
        let detector = DetectionCapability::create(&cap, DownloadMonitor::noop())
            .await
            .unwrap();
        let detected = detector.detect("Guten Morgen").await.unwrap();

        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].language_code, "de");
        assert_eq!(detected[0].confidence, 0.93);
    }

    #[tokio::test]
    async fn test_reasoning_model_omits_temperature() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "reasoning_effort": "low",
                "max_completion_tokens": REASONING_MAX_TOKENS
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(create_openai_response("Ciao")))
            .expect(1)
            .mount(&server)
            .await;

        let cap = OpenAiCapability::new(
            Some("test-openai-key".to_string()),
            format!("{}/v1/chat/completions", server.uri()),
            "o3-mini",
        )
        .with_retry_config(RetryConfig::once());

        let result = translator(&cap, "en", "it").await.translate("Hello").await;
        assert_eq!(result.unwrap(), "Ciao");
    }
}
