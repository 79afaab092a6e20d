//! Image prompts derived from a finished script.
//!
//! Three tiers:
//! 1. Ask the LLM for four labelled cinematic prompts.
//! 2. Otherwise sample four evenly spaced words from the script.
//! 3. Always prefix every prompt with the style phrase of the script's genre.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, warn};

use ltc_models::IMAGE_SLOTS;
use ltc_providers::{LlmClient, ResponseFormat};

use crate::prompts::scene_prompts_prompt;

static SCRIPT_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[अ-हa-zA-Z]{3,}\b").unwrap());

/// Genre keyword sets, checked in order, with their style prefix.
const GENRES: [(&str, &[&str], &str); 5] = [
    (
        "horror",
        &["भूत", "ghost", "डर", "haunted", "चुड़ैल", "horror", "कब्र", "witch"],
        "Dark, suspenseful, cinematic horror atmosphere of",
    ),
    (
        "romance",
        &["प्यार", "love", "romance", "दिल", "प्रेम", "सपना", "kiss"],
        "Dreamy, soft lighting, cinematic romance scene of",
    ),
    (
        "comedy",
        &["funny", "कॉमेडी", "joke", "हंसी", "comedy", "laugh"],
        "Bright, colorful, exaggerated comedy scene of",
    ),
    (
        "educational",
        &[
            "शिक्षा", "education", "learn", "training", "science", "technology", "history", "model",
            "language model", "data", "bias", "study", "गणित", "भौतिकी", "रसायन", "इतिहास",
        ],
        "Clean, modern, infographic-style cinematic educational depiction of",
    ),
    (
        "motivational",
        &[
            "motivation", "inspiration", "success", "leader", "growth", "dream", "vision", "goal",
            "achievement", "journey", "never give up", "संघर्ष", "सफलता", "नेता", "प्रेरणा",
        ],
        "Bold, uplifting, cinematic motivational scene of",
    ),
];

const DEFAULT_GENRE_PREFIX: &str = "Cinematic, realistic depiction of";

/// Style prefix for the genre detected in `script`.
pub fn genre_prefix(script: &str) -> &'static str {
    let text = script.to_lowercase();
    GENRES
        .iter()
        .find(|(_, keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .map(|(genre, _, prefix)| {
            debug!(genre, "Detected script genre");
            *prefix
        })
        .unwrap_or(DEFAULT_GENRE_PREFIX)
}

/// Parse `Label: text` lines, keeping at most four.
fn labelled_lines(response: &str) -> Vec<String> {
    response
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(_, text)| text.trim().to_string())
        .take(IMAGE_SLOTS)
        .collect()
}

/// Four evenly spaced words of the script, wrapped as scene prompts.
fn keyword_prompts(script: &str) -> Vec<String> {
    let words: Vec<&str> = SCRIPT_WORD.find_iter(script).map(|m| m.as_str()).collect();
    if words.is_empty() {
        return Vec::new();
    }
    let step = (words.len() / IMAGE_SLOTS).max(1);
    words
        .iter()
        .step_by(step)
        .take(IMAGE_SLOTS)
        .map(|word| format!("Cinematic scene featuring {}", word))
        .collect()
}

pub struct ImagePromptDeriver {
    llm: Option<Arc<dyn LlmClient>>,
}

impl ImagePromptDeriver {
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { llm }
    }

    /// Exactly four prompts for `script`.
    pub async fn derive(&self, script: &str) -> Vec<String> {
        let mut prompts = match &self.llm {
            Some(llm) => match llm.generate(&scene_prompts_prompt(script), ResponseFormat::Text).await {
                Ok(response) => labelled_lines(&response.text),
                Err(e) => {
                    warn!(provider = llm.name(), "LLM image prompt extraction failed: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        if prompts.len() < IMAGE_SLOTS {
            prompts = keyword_prompts(script);
        }

        let prefix = genre_prefix(script);
        let mut prompts: Vec<String> = prompts
            .into_iter()
            .map(|prompt| format!("{} {}", prefix, prompt))
            .collect();
        while prompts.len() < IMAGE_SLOTS {
            prompts.push(format!("{} cinematic filler scene", prefix));
        }
        prompts.truncate(IMAGE_SLOTS);
        prompts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ltc_providers::{LlmResponse, ProviderError, ProviderFailure, ProviderResult};

    struct ScriptedLlm(Option<&'static str>);

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        fn name(&self) -> &'static str {
            "Scripted"
        }

        async fn generate(&self, prompt: &str, format: ResponseFormat) -> ProviderResult<LlmResponse> {
            assert_eq!(format, ResponseFormat::Text);
            assert!(prompt.contains("SCRIPT:\n"));
            match self.0 {
                Some(text) => Ok(LlmResponse {
                    text: text.to_string(),
                    total_tokens: 10,
                }),
                None => Err(ProviderFailure::Fatal(ProviderError::invalid_response("down"))),
            }
        }
    }

    #[test]
    fn test_genre_detection() {
        assert_eq!(genre_prefix("A haunted house at night"), GENRES[0].2);
        assert_eq!(genre_prefix("They fell in LOVE"), GENRES[1].2);
        assert_eq!(genre_prefix("Learn how data flows"), GENRES[3].2);
        assert_eq!(genre_prefix("Never give up on the climb"), GENRES[4].2);
        assert_eq!(genre_prefix("A cat sat on a mat"), DEFAULT_GENRE_PREFIX);
    }

    #[tokio::test]
    async fn test_llm_prompts_get_genre_prefix() {
        let llm = ScriptedLlm(Some("Hook: a ghost\nImage 1: an attic\nImage 2: a candle\nTeaser: a door"));
        let deriver = ImagePromptDeriver::new(Some(Arc::new(llm)));
        let prompts = deriver.derive("A ghost story").await;
        assert_eq!(
            prompts,
            vec![
                "Dark, suspenseful, cinematic horror atmosphere of a ghost",
                "Dark, suspenseful, cinematic horror atmosphere of an attic",
                "Dark, suspenseful, cinematic horror atmosphere of a candle",
                "Dark, suspenseful, cinematic horror atmosphere of a door",
            ]
        );
    }

    #[tokio::test]
    async fn test_short_llm_answer_falls_back_to_keywords() {
        let llm = ScriptedLlm(Some("Hook: only one"));
        let deriver = ImagePromptDeriver::new(Some(Arc::new(llm)));
        let prompts = deriver.derive("Rust makes systems programming safer and faster").await;
        assert_eq!(prompts.len(), 4);
        assert_eq!(prompts[0], "Cinematic, realistic depiction of Cinematic scene featuring Rust");
        assert_eq!(prompts[1], "Cinematic, realistic depiction of Cinematic scene featuring makes");
    }

    #[tokio::test]
    async fn test_llm_failure_and_empty_script_pad_to_four() {
        let deriver = ImagePromptDeriver::new(Some(Arc::new(ScriptedLlm(None))));
        let prompts = deriver.derive("").await;
        assert_eq!(prompts, vec!["Cinematic, realistic depiction of cinematic filler scene"; 4]);
    }

    #[tokio::test]
    async fn test_without_llm_uses_keywords() {
        let deriver = ImagePromptDeriver::new(None);
        let prompts = deriver.derive("one two three four five six seven eight nine").await;
        assert_eq!(prompts.len(), 4);
        assert!(prompts[0].ends_with("featuring one"));
        assert!(prompts[1].ends_with("featuring three"));
    }
}
