//! LLM text generation via the Gemini `generateContent` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{ProviderError, ProviderFailure, ProviderResult};
use crate::http::{build_client, check_status, instrumented};

pub const GEMINI: &str = "Gemini";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-latest";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Requested shape of the model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmResponse {
    /// Model text with surrounding code fences removed.
    pub text: String,
    pub total_tokens: u64,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn name(&self) -> &'static str;

    /// Single attempt; failures are returned, never retried here.
    async fn generate(&self, prompt: &str, format: ResponseFormat) -> ProviderResult<LlmResponse>;
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl GeminiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.model),
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            timeout: std::env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            http: build_client(config.timeout)?,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn request_body(prompt: &str, format: ResponseFormat) -> Value {
        let mut body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        if format == ResponseFormat::Json {
            body["generationConfig"] = json!({ "responseMimeType": "application/json" });
        }
        body
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn name(&self) -> &'static str {
        GEMINI
    }

    async fn generate(&self, prompt: &str, format: ResponseFormat) -> ProviderResult<LlmResponse> {
        instrumented(GEMINI, "generate_content", async {
            let api_key = self
                .config
                .api_key
                .as_deref()
                .ok_or(ProviderError::NotConfigured(GEMINI))?;

            let response = self
                .http
                .post(self.endpoint())
                .header("x-goog-api-key", api_key)
                .json(&Self::request_body(prompt, format))
                .send()
                .await?;
            let body: Value = check_status(response).await?.json().await?;

            let text = candidate_text(&body)
                .ok_or_else(|| ProviderError::invalid_response("no candidate text in Gemini response"))?;
            let total_tokens = body["usageMetadata"]["totalTokenCount"].as_u64().unwrap_or(0);
            debug!(chars = text.len(), total_tokens, "Gemini responded");

            Ok::<_, ProviderFailure>(LlmResponse {
                text: strip_code_fences(text),
                total_tokens,
            })
        })
        .await
    }
}

/// `candidates[0].content.parts[0].text`, or the older `candidates[0].parts[0].text`.
fn candidate_text(body: &Value) -> Option<&str> {
    let candidate = body.get("candidates")?.get(0)?;
    candidate
        .pointer("/content/parts/0/text")
        .or_else(|| candidate.pointer("/parts/0/text"))
        .and_then(Value::as_str)
}

/// Remove a surrounding Markdown code fence (```json ... ```).
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GeminiClient {
        GeminiClient::new(GeminiConfig {
            api_key: Some("key".into()),
            base_url: server.uri(),
            ..GeminiConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n[{\"a\":1}]\n```"), "[{\"a\":1}]");
        assert_eq!(strip_code_fences("  plain  "), "plain");
        assert_eq!(strip_code_fences("```\nHook: x\n```"), "Hook: x");
    }

    #[tokio::test]
    async fn test_json_mode_request_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash-latest:generateContent"))
            .and(header("x-goog-api-key", "key"))
            .and(body_partial_json(json!({"generationConfig": {"responseMimeType": "application/json"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "```json\n{\"script\": \"hi\"}\n```"}]}}],
                "usageMetadata": {"totalTokenCount": 321}
            })))
            .mount(&server)
            .await;

        let response = client(&server).generate("prompt", ResponseFormat::Json).await.unwrap();
        assert_eq!(response.text, "{\"script\": \"hi\"}");
        assert_eq!(response.total_tokens, 321);
    }

    #[tokio::test]
    async fn test_text_mode_omits_generation_config() {
        let body = GeminiClient::request_body("p", ResponseFormat::Text);
        assert!(body.get("generationConfig").is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = client(&server).generate("p", ResponseFormat::Json).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.error().status_code(), 503);
    }

    #[tokio::test]
    async fn test_missing_key_is_fatal() {
        let client = GeminiClient::new(GeminiConfig::default()).unwrap();
        let err = client.generate("p", ResponseFormat::Text).await.unwrap_err();
        assert!(matches!(err, ProviderFailure::Fatal(ProviderError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn test_missing_candidates_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"promptFeedback": {}})))
            .mount(&server)
            .await;

        let err = client(&server).generate("p", ResponseFormat::Json).await.unwrap_err();
        assert!(matches!(err, ProviderFailure::Fatal(ProviderError::InvalidResponse(_))));
    }
}
