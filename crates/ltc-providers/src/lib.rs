//! Adapters for the external generation services.
//!
//! Each adapter wraps one kind of call and never calls another adapter.
//! Failures are [`ProviderFailure::Retryable`] or [`ProviderFailure::Fatal`].

pub mod error;
mod http;
pub mod images;
pub mod llm;
pub mod metrics;
pub mod tts;

pub use error::{ProviderError, ProviderFailure, ProviderResult};
pub use images::{
    CloudflareImageProvider, GeneratedImage, HuggingFaceImageProvider, ImageProvider, ImageProviderConfig,
    TogetherImageProvider, CLOUDFLARE, HUGGINGFACE, PROMPT_SUFFIX, TOGETHER,
};
pub use llm::{strip_code_fences, GeminiClient, GeminiConfig, LlmClient, LlmResponse, ResponseFormat, GEMINI};
pub use tts::{select_voice, GoogleTtsClient, SpeechPlan, SpeechSynthesizer, SynthesisInput, TtsConfig, VoiceSelection, GOOGLE_TTS};
