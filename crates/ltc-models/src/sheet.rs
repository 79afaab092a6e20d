//! Fixed column layout of the persisted tables.

use chrono::{DateTime, Utc};

use crate::topic::{Topic, TopicStatus, IMAGE_SLOTS};

/// Tab holding one row per topic.
pub const ESSENTIAL_CONTENT: &str = "EssentialContent";
/// Append-only provider usage log.
pub const API_USAGE: &str = "API_Usage";
/// Append-only error log.
pub const ERROR_LOG: &str = "ErrorLog";

pub const ESSENTIAL_CONTENT_HEADERS: [&str; 24] = [
    "Time",
    "TopicID",
    "RunID",
    "Order",
    "Title",
    "Script",
    "Language",
    "Gender",
    "Tone",
    "Platform",
    "StatusProgress",
    "FinalStatus",
    "Caption",
    "Hashtag",
    "Image1Link",
    "Image2Link",
    "Image3Link",
    "Image4Link",
    "AudioLink",
    "VideoLink",
    "Image1GeneratedBy",
    "Image2GeneratedBy",
    "Image3GeneratedBy",
    "Image4GeneratedBy",
];

pub const API_USAGE_HEADERS: [&str; 6] = [
    "Timestamp",
    "RunID",
    "TopicID",
    "Provider",
    "StatusCode",
    "TokensUsed",
];

pub const ERROR_LOG_HEADERS: [&str; 5] = ["Timestamp", "RunID", "TopicID", "ErrorMessage", "Status"];

/// Every table with its header row, in creation order.
pub const TABLES: [(&str, &[&str]); 3] = [
    (ESSENTIAL_CONTENT, &ESSENTIAL_CONTENT_HEADERS),
    (API_USAGE, &API_USAGE_HEADERS),
    (ERROR_LOG, &ERROR_LOG_HEADERS),
];

/// StatusProgress label for a freshly inserted topic.
pub const TOPICS_CREATED: &str = "Topics Created";

/// Maximum stored length of an error message.
pub const ERROR_MESSAGE_MAX_CHARS: usize = 500;

/// 1-based column positions in the EssentialContent tab.
pub mod columns {
    pub const TIME: usize = 1;
    pub const TOPIC_ID: usize = 2;
    pub const SCRIPT: usize = 6;
    pub const STATUS_PROGRESS: usize = 11;
    pub const FINAL_STATUS: usize = 12;
    pub const CAPTION: usize = 13;
    pub const HASHTAG: usize = 14;
    pub const IMAGE_LINK_FIRST: usize = 15;
    pub const AUDIO_LINK: usize = 19;
    pub const VIDEO_LINK: usize = 20;
    pub const IMAGE_PROVIDER_FIRST: usize = 21;
}

/// Format used for the `Time` column.
pub fn sheet_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// StatusProgress column value for a status.
pub fn status_progress(status: TopicStatus) -> &'static str {
    match status {
        TopicStatus::Pending => TOPICS_CREATED,
        other => other.as_str(),
    }
}

/// Row inserted for a new topic. Content columns start empty.
pub fn new_topic_row(topic: &Topic) -> Vec<String> {
    let mut row = vec![String::new(); ESSENTIAL_CONTENT_HEADERS.len()];
    row[0] = sheet_time(topic.created_at);
    row[1] = topic.topic_id.to_string();
    row[2] = topic.run_id.to_string();
    row[3] = topic.order.to_string();
    row[4] = topic.title.clone();
    row[6] = topic.language.clone();
    row[7] = topic.voice_gender.clone();
    row[8] = topic.tone.clone();
    row[9] = topic.platforms_json();
    row[10] = status_progress(TopicStatus::Pending).to_string();
    row[11] = TopicStatus::Pending.as_str().to_string();
    row
}

/// Cell writes that persist a topic snapshot, as `(column, value)` pairs.
///
/// Always covers all four image link and provider columns.
pub fn snapshot_cells(topic: &Topic) -> Vec<(usize, String)> {
    let mut cells = Vec::with_capacity(6 + 2 * IMAGE_SLOTS + 2);
    for (i, slot) in topic.images.iter().enumerate() {
        cells.push((columns::IMAGE_LINK_FIRST + i, slot.link.clone()));
    }
    for (i, slot) in topic.images.iter().enumerate() {
        cells.push((columns::IMAGE_PROVIDER_FIRST + i, slot.generated_by.clone()));
    }
    cells.push((columns::SCRIPT, topic.script.clone()));
    cells.push((columns::STATUS_PROGRESS, status_progress(topic.status).to_string()));
    cells.push((columns::FINAL_STATUS, topic.status.as_str().to_string()));
    cells.push((columns::CAPTION, topic.caption.clone()));
    cells.push((columns::HASHTAG, topic.hashtags_text()));
    cells.push((columns::AUDIO_LINK, topic.audio_link.clone()));
    cells.push((columns::VIDEO_LINK, topic.video_link.clone()));
    cells
}

/// Row appended to the API usage log.
pub fn api_usage_row(
    at: DateTime<Utc>,
    run_id: &str,
    topic_id: &str,
    provider: &str,
    status_code: u16,
    tokens: u64,
) -> Vec<String> {
    vec![
        at.to_rfc3339(),
        run_id.to_string(),
        topic_id.to_string(),
        provider.to_string(),
        status_code.to_string(),
        tokens.to_string(),
    ]
}

/// Row appended to the error log. The message is truncated.
pub fn error_row(at: DateTime<Utc>, run_id: &str, topic_id: &str, message: &str) -> Vec<String> {
    vec![
        at.to_rfc3339(),
        run_id.to_string(),
        topic_id.to_string(),
        message.chars().take(ERROR_MESSAGE_MAX_CHARS).collect(),
        "Failed".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RunId;
    use crate::topic::{ImageSlot, TopicId};

    fn topic() -> Topic {
        let mut topic = Topic::new(TopicId::from_string("topic_1_1"), RunId::from_string("r"), 1, "T");
        topic.platforms = vec!["YouTube Shorts".into()];
        topic
    }

    #[test]
    fn test_new_row_matches_schema() {
        let row = new_topic_row(&topic());
        assert_eq!(row.len(), 24);
        assert_eq!(row[1], "topic_1_1");
        assert_eq!(row[9], "[\"YouTube Shorts\"]");
        assert_eq!(row[10], "Topics Created");
        assert_eq!(row[11], "Pending");
        assert!(row[5].is_empty() && row[18].is_empty() && row[19].is_empty());
    }

    #[test]
    fn test_snapshot_always_writes_four_image_pairs() {
        let mut topic = topic();
        topic.images[2] = ImageSlot::generated("https://x/3.png", "HuggingFace");
        topic.status = TopicStatus::ImagesGenerated;
        let cells = snapshot_cells(&topic);

        let image_cols: Vec<_> = cells
            .iter()
            .filter(|(c, _)| (15..=18).contains(c) || (21..=24).contains(c))
            .collect();
        assert_eq!(image_cols.len(), 8);
        assert!(cells.contains(&(17, "https://x/3.png".to_string())));
        assert!(cells.contains(&(23, "HuggingFace".to_string())));
        assert!(cells.contains(&(11, "Images Generated".to_string())));
        assert!(cells.contains(&(12, "Images Generated".to_string())));
    }

    #[test]
    fn test_error_row_truncates() {
        let row = error_row(Utc::now(), "r", "t", &"x".repeat(900));
        assert_eq!(row[3].len(), ERROR_MESSAGE_MAX_CHARS);
        assert_eq!(row[4], "Failed");
    }
}
