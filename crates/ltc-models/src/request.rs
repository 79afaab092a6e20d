//! Inbound webhook payload.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::topic::InputMode;

/// Number of characters echoed back as the input preview.
pub const PREVIEW_CHARS: usize = 100;

/// Request body accepted by the learning-to-content webhook.
///
/// Form submissions send every field as a string, so numeric and boolean
/// fields accept both representations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default = "default_input_type")]
    pub input_type: String,
    #[serde(default)]
    pub raw_notes: String,
    #[serde(default)]
    pub script_text: Option<String>,
    /// Alternate key for `script_text`.
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub custom_prompt: String,
    #[serde(default)]
    pub context_notes: String,
    #[serde(default, deserialize_with = "de::opt_u32")]
    pub target_duration_seconds: Option<u32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub voice_gender: Option<String>,
    #[serde(default, deserialize_with = "de::string_list")]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub track: String,
    #[serde(default, deserialize_with = "de::opt_u32")]
    pub posts_per_day: Option<u32>,
    #[serde(default = "default_true", deserialize_with = "de::flexible_bool")]
    pub full_pipeline: bool,
    #[serde(default, deserialize_with = "de::opt_u32")]
    pub image_width: Option<u32>,
    #[serde(default, deserialize_with = "de::opt_u32")]
    pub image_height: Option<u32>,
    /// Caller-supplied image prompts; these win over every derived prompt.
    #[serde(default)]
    pub image_prompts: Option<Vec<String>>,
    #[serde(default, deserialize_with = "de::opt_f32")]
    pub audio_speaking_rate: Option<f32>,
    #[serde(default, skip_serializing)]
    pub webhook_secret: Option<String>,
}

fn default_input_type() -> String {
    "notes".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for WebhookPayload {
    fn default() -> Self {
        Self {
            input_type: default_input_type(),
            raw_notes: String::new(),
            script_text: None,
            script: None,
            custom_prompt: String::new(),
            context_notes: String::new(),
            target_duration_seconds: None,
            title: None,
            language: None,
            tone: None,
            voice_gender: None,
            platforms: Vec::new(),
            track: String::new(),
            posts_per_day: None,
            full_pipeline: true,
            image_width: None,
            image_height: None,
            image_prompts: None,
            audio_speaking_rate: None,
            webhook_secret: None,
        }
    }
}

impl WebhookPayload {
    /// Parse a raw JSON body, rejecting empty bodies and UI feature dumps.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let obj = match value.as_object() {
            Some(obj) if !obj.is_empty() => obj,
            _ => return Err("No payload provided".to_string()),
        };
        if obj.get("Implemented").map(Value::is_object).unwrap_or(false) {
            return Err(
                "Invalid payload format - received UI feature data instead of content data"
                    .to_string(),
            );
        }
        serde_json::from_value(value.clone()).map_err(|e| format!("Invalid payload: {}", e))
    }

    pub fn input_mode(&self) -> InputMode {
        InputMode::parse(&self.input_type)
    }

    /// The user-supplied script, trimmed, from `script_text` or `script`.
    pub fn direct_script(&self) -> Option<String> {
        [self.script_text.as_deref(), self.script.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Check the fields required by the selected input mode.
    pub fn validate(&self) -> Result<(), String> {
        match self.input_mode() {
            InputMode::Script => {
                if self.direct_script().is_none() {
                    return Err("Missing required field: script_text for input_type=script".into());
                }
            }
            InputMode::Prompt => {
                if self.custom_prompt.trim().is_empty() && self.raw_notes.trim().is_empty() {
                    return Err(
                        "Provide custom_prompt (preferred) or raw_notes for input_type=prompt"
                            .into(),
                    );
                }
            }
            InputMode::Notes => {
                if self.raw_notes.trim().is_empty() {
                    return Err("raw_notes field cannot be empty for input_type=notes".into());
                }
            }
        }
        Ok(())
    }

    /// First characters of the mode's primary input.
    pub fn input_preview(&self) -> String {
        let source = match self.input_mode() {
            InputMode::Script => self.direct_script().unwrap_or_default(),
            InputMode::Prompt => {
                if self.custom_prompt.trim().is_empty() {
                    self.raw_notes.trim().to_string()
                } else {
                    self.custom_prompt.trim().to_string()
                }
            }
            InputMode::Notes => self.raw_notes.trim().to_string(),
        };
        source.chars().take(PREVIEW_CHARS).collect()
    }

    /// Requested topic count, clamped to at least one.
    pub fn topic_count(&self) -> u32 {
        self.posts_per_day.unwrap_or(1).max(1)
    }

    /// Context notes for prompt and script modes: `context_notes`, else `raw_notes`.
    pub fn context_text(&self) -> String {
        if self.context_notes.trim().is_empty() {
            self.raw_notes.trim().to_string()
        } else {
            self.context_notes.trim().to_string()
        }
    }

    pub fn language(&self) -> &str {
        non_empty(self.language.as_deref()).unwrap_or("English")
    }

    pub fn tone(&self) -> &str {
        non_empty(self.tone.as_deref()).unwrap_or("Friendly")
    }

    pub fn voice_gender(&self) -> &str {
        non_empty(self.voice_gender.as_deref()).unwrap_or("Female")
    }

    /// Platforms, defaulting to YouTube Shorts.
    pub fn platforms_or_default(&self) -> Vec<String> {
        if self.platforms.is_empty() {
            vec!["YouTube Shorts".to_string()]
        } else {
            self.platforms.clone()
        }
    }

    /// Speaking-rate override, only when within the accepted range.
    pub fn speaking_rate_override(&self) -> Option<f32> {
        self.audio_speaking_rate
            .filter(|rate| (0.5..=2.0).contains(rate))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

mod de {
    use super::*;

    pub fn opt_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                .and_then(|n| u32::try_from(n).ok()),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn opt_f32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f32>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Number(n)) => n.as_f64().map(|f| f as f32),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn flexible_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => {
                matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
            }
            Some(Value::Number(n)) => n.as_i64().map(|n| n != 0).unwrap_or(false),
            _ => true,
        })
    }

    pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notes_mode_requires_raw_notes() {
        let payload = WebhookPayload::from_value(&json!({"input_type": "notes", "raw_notes": "  "}))
            .unwrap();
        assert_eq!(
            payload.validate().unwrap_err(),
            "raw_notes field cannot be empty for input_type=notes"
        );
    }

    #[test]
    fn test_script_mode_accepts_script_alias() {
        let payload =
            WebhookPayload::from_value(&json!({"input_type": "script", "script": " Hello world "}))
                .unwrap();
        assert!(payload.validate().is_ok());
        assert_eq!(payload.direct_script().as_deref(), Some("Hello world"));

        let missing = WebhookPayload::from_value(&json!({"input_type": "script"})).unwrap();
        assert_eq!(
            missing.validate().unwrap_err(),
            "Missing required field: script_text for input_type=script"
        );
    }

    #[test]
    fn test_prompt_mode_needs_prompt_or_notes() {
        let payload = WebhookPayload::from_value(&json!({"input_type": "prompt"})).unwrap();
        assert!(payload.validate().unwrap_err().starts_with("Provide custom_prompt"));

        let ok = WebhookPayload::from_value(&json!({"input_type": "prompt", "raw_notes": "x"}))
            .unwrap();
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_form_style_fields_are_coerced() {
        let payload = WebhookPayload::from_value(&json!({
            "raw_notes": "notes",
            "full_pipeline": "false",
            "posts_per_day": "3",
            "platforms": "YouTube Shorts, Instagram Reels",
            "audio_speaking_rate": "1.2"
        }))
        .unwrap();
        assert!(!payload.full_pipeline);
        assert_eq!(payload.topic_count(), 3);
        assert_eq!(payload.platforms, vec!["YouTube Shorts", "Instagram Reels"]);
        assert_eq!(payload.speaking_rate_override(), Some(1.2));
    }

    #[test]
    fn test_defaults() {
        let payload = WebhookPayload::from_value(&json!({"raw_notes": "n", "posts_per_day": 0}))
            .unwrap();
        assert!(payload.full_pipeline);
        assert_eq!(payload.topic_count(), 1);
        assert_eq!(payload.language(), "English");
        assert_eq!(payload.tone(), "Friendly");
        assert_eq!(payload.voice_gender(), "Female");
        assert_eq!(payload.platforms_or_default(), vec!["YouTube Shorts"]);
    }

    #[test]
    fn test_rejects_empty_and_ui_payloads() {
        assert!(WebhookPayload::from_value(&json!({})).is_err());
        assert!(WebhookPayload::from_value(&json!({"Implemented": {"a": 1}}))
            .unwrap_err()
            .contains("UI feature data"));
    }

    #[test]
    fn test_input_preview_truncates() {
        let long = "a".repeat(250);
        let payload = WebhookPayload::from_value(&json!({"raw_notes": long})).unwrap();
        assert_eq!(payload.input_preview().len(), PREVIEW_CHARS);
    }

    #[test]
    fn test_speaking_rate_out_of_range_is_ignored() {
        let payload =
            WebhookPayload::from_value(&json!({"raw_notes": "n", "audio_speaking_rate": 3.0}))
                .unwrap();
        assert_eq!(payload.speaking_rate_override(), None);
    }
}
