//! Text-to-speech via Google Cloud `text:synthesize`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use ltc_storage::AccessTokenSource;

use crate::error::{ProviderError, ProviderFailure, ProviderResult};
use crate::http::{build_client, check_status, instrumented};

pub const GOOGLE_TTS: &str = "Google TTS";
pub const DEFAULT_TTS_BASE_URL: &str = "https://texttospeech.googleapis.com";

/// Speaking rate for languages narrated through SSML prosody.
pub const SLOW_SPEAKING_RATE: f32 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceSelection {
    pub name: &'static str,
    pub language_code: &'static str,
}

const DEFAULT_VOICE: VoiceSelection = VoiceSelection {
    name: "en-US-Wavenet-F",
    language_code: "en-US",
};

/// Voice for a (language, gender) pair; unknown pairs get the default.
pub fn select_voice(language: &str, voice_gender: &str) -> VoiceSelection {
    let voice = |name, language_code| VoiceSelection { name, language_code };
    match (language, voice_gender) {
        ("English", "Male") => voice("en-US-Wavenet-D", "en-US"),
        ("English", "Female") => voice("en-US-Wavenet-F", "en-US"),
        ("Hindi" | "Hinglish", "Male") => voice("hi-IN-Wavenet-B", "hi-IN"),
        ("Hindi" | "Hinglish", "Female") => voice("hi-IN-Wavenet-E", "hi-IN"),
        ("Urdu", "Male") => voice("ur-IN-Wavenet-B", "ur-IN"),
        ("Urdu", "Female") => voice("ur-IN-Wavenet-A", "ur-IN"),
        _ => DEFAULT_VOICE,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisInput {
    Text(String),
    Ssml(String),
}

/// Everything needed for one synthesis request.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechPlan {
    pub input: SynthesisInput,
    pub voice: VoiceSelection,
    pub speaking_rate: f32,
}

impl SpeechPlan {
    /// Urdu, Hindi and Hinglish are wrapped in slowed SSML; everything else is
    /// plain text at normal speed. A rate override in [0.5, 2.0] wins.
    pub fn for_script(script: &str, language: &str, voice_gender: &str, rate_override: Option<f32>) -> Self {
        let slowed = matches!(language, "Urdu" | "Hindi" | "Hinglish");
        let input = if slowed {
            SynthesisInput::Ssml(format!(
                "<speak><prosody rate='{}'>{}</prosody></speak>",
                SLOW_SPEAKING_RATE,
                escape_ssml(script)
            ))
        } else {
            SynthesisInput::Text(script.to_string())
        };
        let default_rate = if slowed { SLOW_SPEAKING_RATE } else { 1.0 };
        let speaking_rate = rate_override
            .filter(|r| (0.5..=2.0).contains(r))
            .unwrap_or(default_rate);

        Self {
            input,
            voice: select_voice(language, voice_gender),
            speaking_rate,
        }
    }
}

pub fn escape_ssml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// MP3 bytes for the planned input.
    async fn synthesize(&self, plan: &SpeechPlan) -> ProviderResult<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_TTS_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl TtsConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("GOOGLE_TTS_BASE_URL").unwrap_or(defaults.base_url),
            timeout: std::env::var("TTS_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: String,
}

pub struct GoogleTtsClient {
    http: Client,
    config: TtsConfig,
    tokens: Arc<dyn AccessTokenSource>,
}

impl GoogleTtsClient {
    pub fn new(config: TtsConfig, tokens: Arc<dyn AccessTokenSource>) -> Result<Self, ProviderError> {
        Ok(Self {
            http: build_client(config.timeout)?,
            config,
            tokens,
        })
    }

    fn request_body(plan: &SpeechPlan) -> Value {
        let input = match &plan.input {
            SynthesisInput::Text(text) => json!({ "text": text }),
            SynthesisInput::Ssml(ssml) => json!({ "ssml": ssml }),
        };
        json!({
            "input": input,
            "voice": { "languageCode": plan.voice.language_code, "name": plan.voice.name },
            "audioConfig": { "audioEncoding": "MP3", "speakingRate": plan.speaking_rate },
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTtsClient {
    fn name(&self) -> &'static str {
        GOOGLE_TTS
    }

    async fn synthesize(&self, plan: &SpeechPlan) -> ProviderResult<Vec<u8>> {
        instrumented(GOOGLE_TTS, "synthesize", async {
            let token = self
                .tokens
                .access_token()
                .await
                .map_err(|e| ProviderFailure::Fatal(ProviderError::Auth(e.to_string())))?;

            let url = format!("{}/v1/text:synthesize", self.config.base_url.trim_end_matches('/'));
            let response = self
                .http
                .post(url)
                .bearer_auth(token)
                .json(&Self::request_body(plan))
                .send()
                .await?;
            let body: SynthesizeResponse = check_status(response).await?.json().await?;

            let audio = STANDARD
                .decode(body.audio_content.as_bytes())
                .map_err(|e| ProviderError::invalid_response(format!("audioContent is not base64: {}", e)))?;
            if audio.is_empty() {
                return Err(ProviderError::invalid_response("empty audioContent").into());
            }
            debug!(voice = plan.voice.name, bytes = audio.len(), "Speech synthesized");
            Ok::<_, ProviderFailure>(audio)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ltc_storage::StaticToken;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_voice_map() {
        assert_eq!(select_voice("English", "Male").name, "en-US-Wavenet-D");
        assert_eq!(select_voice("Hinglish", "Female").name, "hi-IN-Wavenet-E");
        assert_eq!(select_voice("Urdu", "Female").language_code, "ur-IN");
        assert_eq!(select_voice("Klingon", "Male"), DEFAULT_VOICE);
    }

    #[test]
    fn test_plan_uses_ssml_for_hindi() {
        let plan = SpeechPlan::for_script("Tom & Jerry <3", "Hindi", "Male", None);
        assert_eq!(
            plan.input,
            SynthesisInput::Ssml("<speak><prosody rate='0.85'>Tom &amp; Jerry &lt;3</prosody></speak>".into())
        );
        assert_eq!(plan.speaking_rate, SLOW_SPEAKING_RATE);
        assert_eq!(plan.voice.name, "hi-IN-Wavenet-B");
    }

    #[test]
    fn test_plan_rate_override() {
        let plan = SpeechPlan::for_script("hi", "English", "Female", Some(1.3));
        assert_eq!(plan.input, SynthesisInput::Text("hi".into()));
        assert_eq!(plan.speaking_rate, 1.3);

        let ignored = SpeechPlan::for_script("hi", "English", "Female", Some(4.0));
        assert_eq!(ignored.speaking_rate, 1.0);
    }

    #[tokio::test]
    async fn test_synthesize_decodes_audio() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text:synthesize"))
            .and(header("authorization", "Bearer tok"))
            .and(body_partial_json(json!({
                "voice": {"name": "en-US-Wavenet-F"},
                "audioConfig": {"audioEncoding": "MP3"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "audioContent": STANDARD.encode(b"ID3fake-mp3")
            })))
            .mount(&server)
            .await;

        let client = GoogleTtsClient::new(
            TtsConfig {
                base_url: server.uri(),
                ..TtsConfig::default()
            },
            Arc::new(StaticToken("tok".into())),
        )
        .unwrap();
        let plan = SpeechPlan::for_script("Hello", "English", "Female", None);
        assert_eq!(client.synthesize(&plan).await.unwrap(), b"ID3fake-mp3");
    }

    #[tokio::test]
    async fn test_bad_request_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Invalid voice"))
            .mount(&server)
            .await;

        let client = GoogleTtsClient::new(
            TtsConfig {
                base_url: server.uri(),
                ..TtsConfig::default()
            },
            Arc::new(StaticToken("tok".into())),
        )
        .unwrap();
        let plan = SpeechPlan::for_script("Hello", "English", "Female", None);
        assert!(!client.synthesize(&plan).await.unwrap_err().is_retryable());
    }
}
