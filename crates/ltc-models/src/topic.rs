//! Topic records and the per-topic stage state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::run::RunId;

/// Number of image slots every topic carries.
pub const IMAGE_SLOTS: usize = 4;

/// Provider tag written into a slot when every image provider failed.
pub const FAILED_PROVIDER_TAG: &str = "Failed";

/// Unique identifier for a topic within a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct TopicId(String);

impl TopicId {
    /// Build the identifier for the `order`-th topic of a run started at `unix_secs`.
    ///
    /// The run tag keeps batches started in the same second apart.
    pub fn for_batch(unix_secs: i64, run_id: &RunId, order: u32) -> Self {
        let tag: String = run_id
            .as_str()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(8)
            .collect();
        Self(format!("topic_{}_{}_{}", unix_secs, tag, order))
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the originating request supplied its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Free-form learning notes; topics are extracted by the LLM.
    #[default]
    Notes,
    /// A finished narration script supplied by the user.
    Script,
    /// A custom instruction passed through to script generation.
    Prompt,
}

impl InputMode {
    /// Parse a request value. Unknown values fall back to notes mode.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "script" => InputMode::Script,
            "prompt" => InputMode::Prompt,
            _ => InputMode::Notes,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputMode::Notes => "notes",
            InputMode::Script => "script",
            InputMode::Prompt => "prompt",
        }
    }
}

/// Stage status of a topic.
///
/// Forward order: `Pending → ScriptGenerated → AudioGenerated → ImagesGenerated →
/// VideoGenerated → Completed`. Failure variants can be entered from any
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum TopicStatus {
    #[default]
    #[serde(rename = "Pending")]
    Pending,
    #[serde(rename = "Script Generated")]
    ScriptGenerated,
    #[serde(rename = "Audio Generated")]
    AudioGenerated,
    #[serde(rename = "Images Generated")]
    ImagesGenerated,
    #[serde(rename = "Video Generated")]
    VideoGenerated,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Script Too Short")]
    ScriptTooShort,
    /// Zero images were produced. The pipeline still attempts video assembly.
    #[serde(rename = "Images Failed")]
    ImagesFailed,
    #[serde(rename = "Video Failed")]
    VideoFailed,
    #[serde(rename = "Failed")]
    Failed,
}

impl TopicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicStatus::Pending => "Pending",
            TopicStatus::ScriptGenerated => "Script Generated",
            TopicStatus::AudioGenerated => "Audio Generated",
            TopicStatus::ImagesGenerated => "Images Generated",
            TopicStatus::VideoGenerated => "Video Generated",
            TopicStatus::Completed => "Completed",
            TopicStatus::ScriptTooShort => "Script Too Short",
            TopicStatus::ImagesFailed => "Images Failed",
            TopicStatus::VideoFailed => "Video Failed",
            TopicStatus::Failed => "Failed",
        }
    }

    /// Parse the label stored in the sheet.
    pub fn from_label(label: &str) -> Option<Self> {
        let status = match label.trim() {
            "Pending" => TopicStatus::Pending,
            "Script Generated" => TopicStatus::ScriptGenerated,
            "Audio Generated" => TopicStatus::AudioGenerated,
            "Images Generated" => TopicStatus::ImagesGenerated,
            "Video Generated" => TopicStatus::VideoGenerated,
            "Completed" => TopicStatus::Completed,
            "Script Too Short" => TopicStatus::ScriptTooShort,
            "Images Failed" => TopicStatus::ImagesFailed,
            "Video Failed" => TopicStatus::VideoFailed,
            "Failed" => TopicStatus::Failed,
            _ => return None,
        };
        Some(status)
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TopicStatus::ScriptTooShort
                | TopicStatus::ImagesFailed
                | TopicStatus::VideoFailed
                | TopicStatus::Failed
        )
    }

    /// Terminal states end the topic's pipeline.
    ///
    /// `ImagesFailed` is a failure variant that the pipeline tolerates: video
    /// assembly is still attempted afterwards, so it is not terminal here.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TopicStatus::Completed
                | TopicStatus::ScriptTooShort
                | TopicStatus::VideoFailed
                | TopicStatus::Failed
        )
    }

    /// Position in the forward stage order. `ImagesFailed` shares the image stage.
    fn rank(&self) -> u8 {
        match self {
            TopicStatus::Pending => 0,
            TopicStatus::ScriptGenerated | TopicStatus::ScriptTooShort => 1,
            TopicStatus::AudioGenerated => 2,
            TopicStatus::ImagesGenerated | TopicStatus::ImagesFailed => 3,
            TopicStatus::VideoGenerated | TopicStatus::VideoFailed => 4,
            TopicStatus::Completed => 5,
            TopicStatus::Failed => 6,
        }
    }

    /// Whether moving from `self` to `next` respects the stage order.
    pub fn can_transition_to(&self, next: TopicStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next.is_failure() {
            return true;
        }
        next.rank() > self.rank()
    }
}

impl fmt::Display for TopicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a status change would move a topic backwards.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid status transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: TopicStatus,
    pub to: TopicStatus,
}

/// Terminal outcome of image generation for one slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImageSlot {
    /// Remote URL or local path. Empty until the image stage runs.
    pub link: String,
    /// Provider that produced the image, or `Failed`.
    pub generated_by: String,
}

impl ImageSlot {
    pub fn generated(link: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            generated_by: provider.into(),
        }
    }

    /// Placeholder for a slot where every provider failed.
    pub fn failed(slot: usize) -> Self {
        Self {
            link: format!("placeholder_image_{}.png", slot),
            generated_by: FAILED_PROVIDER_TAG.to_string(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.generated_by == FAILED_PROVIDER_TAG
    }

    /// True when the slot holds a real generated image.
    pub fn is_generated(&self) -> bool {
        !self.link.is_empty() && !self.is_failed()
    }
}

/// The unit of work flowing through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Topic {
    pub topic_id: TopicId,
    pub run_id: RunId,
    /// Position within the batch (1-based).
    pub order: u32,
    pub title: String,
    #[serde(default)]
    pub main_points: Vec<String>,
    #[serde(default)]
    pub transition_note: String,
    pub language: String,
    pub tone: String,
    pub voice_gender: String,
    #[serde(default)]
    pub platforms: Vec<String>,
    pub input_mode: InputMode,
    /// Raw notes or context notes supplied with the request.
    #[serde(default)]
    pub context_notes: String,
    #[serde(default)]
    pub custom_prompt: Option<String>,
    #[serde(default)]
    pub target_duration_seconds: Option<u32>,
    #[serde(default)]
    pub audio_speaking_rate: Option<f32>,
    pub image_width: u32,
    pub image_height: u32,
    #[serde(default)]
    pub script: String,
    #[serde(default)]
    pub voice_style: String,
    /// Prompts for the four image slots. Empty until the script stage derives them.
    #[serde(default)]
    pub image_prompts: Vec<String>,
    #[serde(default)]
    pub images: [ImageSlot; IMAGE_SLOTS],
    #[serde(default)]
    pub audio_link: String,
    #[serde(default)]
    pub tts_voice_name: String,
    #[serde(default)]
    pub tts_language_code: String,
    #[serde(default)]
    pub video_link: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    pub status: TopicStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Topic {
    /// Create a pending topic with empty content fields.
    pub fn new(topic_id: TopicId, run_id: RunId, order: u32, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            topic_id,
            run_id,
            order,
            title: title.into(),
            main_points: Vec::new(),
            transition_note: String::new(),
            language: "English".to_string(),
            tone: "Friendly".to_string(),
            voice_gender: "Female".to_string(),
            platforms: Vec::new(),
            input_mode: InputMode::Notes,
            context_notes: String::new(),
            custom_prompt: None,
            target_duration_seconds: None,
            audio_speaking_rate: None,
            image_width: 1080,
            image_height: 1920,
            script: String::new(),
            voice_style: String::new(),
            image_prompts: Vec::new(),
            images: Default::default(),
            audio_link: String::new(),
            tts_voice_name: String::new(),
            tts_language_code: String::new(),
            video_link: String::new(),
            caption: String::new(),
            hashtags: Vec::new(),
            status: TopicStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Move to `next`, refusing backwards transitions.
    pub fn advance(&mut self, next: TopicStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        if next == TopicStatus::Completed {
            self.completed_at = Some(self.updated_at);
        }
        Ok(())
    }

    /// Whether the script carries any narration text.
    pub fn has_script(&self) -> bool {
        !self.script.trim().is_empty()
    }

    /// Links of slots that hold a real generated image, in slot order.
    pub fn generated_image_links(&self) -> Vec<String> {
        self.images
            .iter()
            .filter(|slot| slot.is_generated())
            .map(|slot| slot.link.clone())
            .collect()
    }

    /// Hashtags joined the way they are stored in the sheet.
    pub fn hashtags_text(&self) -> String {
        self.hashtags.join(", ")
    }

    /// Platforms as the JSON list stored in the sheet.
    pub fn platforms_json(&self) -> String {
        serde_json::to_string(&self.platforms).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic() -> Topic {
        let run_id = RunId::new();
        Topic::new(TopicId::for_batch(1_700_000_000, &run_id, 1), run_id, 1, "Ownership")
    }

    #[test]
    fn test_topic_id_format() {
        let run_id = RunId::from_string("3f2a9c1e-77aa-4b10-9d3e-0c5b1a2f8e44");
        assert_eq!(
            TopicId::for_batch(1_700_000_000, &run_id, 2).as_str(),
            "topic_1700000000_3f2a9c1e_2"
        );
    }

    #[test]
    fn test_topic_ids_differ_across_runs_in_same_second() {
        let a = TopicId::for_batch(1_700_000_000, &RunId::new(), 1);
        let b = TopicId::for_batch(1_700_000_000, &RunId::new(), 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_new_topic_has_four_empty_slots() {
        let topic = topic();
        assert_eq!(topic.images.len(), IMAGE_SLOTS);
        assert!(topic.images.iter().all(|s| s.link.is_empty() && s.generated_by.is_empty()));
        assert_eq!(topic.status, TopicStatus::Pending);
    }

    #[test]
    fn test_forward_transitions() {
        let mut topic = topic();
        for next in [
            TopicStatus::ScriptGenerated,
            TopicStatus::AudioGenerated,
            TopicStatus::ImagesGenerated,
            TopicStatus::VideoGenerated,
            TopicStatus::Completed,
        ] {
            topic.advance(next).unwrap();
        }
        assert!(topic.completed_at.is_some());
        assert!(topic.status.is_terminal());
    }

    #[test]
    fn test_backward_transition_rejected() {
        let mut topic = topic();
        topic.advance(TopicStatus::AudioGenerated).unwrap();
        let err = topic.advance(TopicStatus::ScriptGenerated).unwrap_err();
        assert_eq!(err.from, TopicStatus::AudioGenerated);
        assert_eq!(topic.status, TopicStatus::AudioGenerated);
    }

    #[test]
    fn test_failure_reachable_from_any_non_terminal_state() {
        for start in [
            TopicStatus::Pending,
            TopicStatus::ScriptGenerated,
            TopicStatus::AudioGenerated,
            TopicStatus::ImagesGenerated,
            TopicStatus::ImagesFailed,
            TopicStatus::VideoGenerated,
        ] {
            assert!(start.can_transition_to(TopicStatus::Failed), "{start}");
        }
        assert!(!TopicStatus::Completed.can_transition_to(TopicStatus::Failed));
        assert!(!TopicStatus::ScriptTooShort.can_transition_to(TopicStatus::AudioGenerated));
    }

    #[test]
    fn test_images_failed_continues_to_video_stage() {
        assert!(TopicStatus::ImagesFailed.can_transition_to(TopicStatus::VideoGenerated));
        assert!(TopicStatus::ImagesFailed.can_transition_to(TopicStatus::VideoFailed));
        assert!(!TopicStatus::ImagesFailed.can_transition_to(TopicStatus::ImagesGenerated));
    }

    #[test]
    fn test_status_labels_round_trip_through_sheet_form() {
        let status = TopicStatus::ScriptTooShort;
        assert_eq!(TopicStatus::from_label(status.as_str()), Some(status));
        assert_eq!(
            serde_json::to_string(&TopicStatus::VideoFailed).unwrap(),
            "\"Video Failed\""
        );
        assert_eq!(TopicStatus::from_label("Topics Created"), None);
    }

    #[test]
    fn test_generated_image_links_skip_placeholders() {
        let mut topic = topic();
        topic.images[0] = ImageSlot::generated("https://img/1.png", "Together");
        topic.images[1] = ImageSlot::failed(2);
        assert_eq!(topic.generated_image_links(), vec!["https://img/1.png".to_string()]);
        assert_eq!(topic.images[1].link, "placeholder_image_2.png");
    }

    #[test]
    fn test_input_mode_parse() {
        assert_eq!(InputMode::parse("SCRIPT"), InputMode::Script);
        assert_eq!(InputMode::parse("prompt"), InputMode::Prompt);
        assert_eq!(InputMode::parse("anything"), InputMode::Notes);
    }
}
