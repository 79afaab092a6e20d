//! Normalisation of the topic-extraction response.
//!
//! Accepted shapes, tried in order:
//!
//! | Shape                          | Topics taken from         |
//! |--------------------------------|---------------------------|
//! | `[{..}, ..]`                   | the array                 |
//! | `{"topics": [..]}`             | `topics`                  |
//! | `{"data": [..]}`               | `data`                    |
//! | `{"a": {..}, "b": {..}}`       | the values, in key order  |
//! | `{"title": ..}`                | the object itself, when it carries a topic field |
//!
//! Field precedence per topic:
//!
//! | Field           | First            | Then             | Default          |
//! |-----------------|------------------|------------------|------------------|
//! | title           | `title`          | `Title`          | `Topic {n}`      |
//! | main points     | `main_points`    | `MainPoints`     | empty            |
//! | transition note | `transition_note`| `TransitionNote` | empty            |
//! | order           | `Order`          |                  | position (1-based) |
//!
//! Empty values count as missing. Anything else (scalars, arrays holding
//! non-objects, empty collections) is rejected.

use serde_json::{Map, Value};
use thiserror::Error;

/// Title of the placeholder topic used when the model output is unusable.
pub const FALLBACK_TOPIC_TITLE: &str = "Educational content from notes";

/// Keys that mark a bare object as a single topic.
const TOPIC_KEYS: [&str; 6] = [
    "title",
    "Title",
    "main_points",
    "MainPoints",
    "transition_note",
    "TransitionNote",
];

#[derive(Debug, Error)]
pub enum TopicParseError {
    #[error("Malformed topic JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unrecognised topic response shape: {0}")]
    UnrecognisedShape(&'static str),
}

/// A topic as proposed by the model, before it is bound to a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDraft {
    pub title: String,
    pub main_points: Vec<String>,
    pub transition_note: String,
    pub order: u32,
}

impl TopicDraft {
    /// Single placeholder topic for unusable model output.
    pub fn fallback() -> Self {
        Self {
            title: FALLBACK_TOPIC_TITLE.to_string(),
            main_points: vec!["Key concept".to_string()],
            transition_note: "Learn more".to_string(),
            order: 1,
        }
    }
}

/// Parse the model's JSON text, keeping at most `limit` topics.
pub fn parse_topics(text: &str, limit: usize) -> Result<Vec<TopicDraft>, TopicParseError> {
    let value: Value = serde_json::from_str(text.trim())?;
    let objects = topic_objects(&value)?;
    Ok(objects
        .into_iter()
        .take(limit.max(1))
        .enumerate()
        .map(|(i, obj)| normalise(obj, i + 1))
        .collect())
}

fn topic_objects(value: &Value) -> Result<Vec<&Map<String, Value>>, TopicParseError> {
    match value {
        Value::Array(items) => objects_in(items),
        Value::Object(obj) => {
            if let Some(Value::Array(items)) = obj.get("topics") {
                return objects_in(items);
            }
            if let Some(Value::Array(items)) = obj.get("data") {
                return objects_in(items);
            }
            if obj.is_empty() {
                return Err(TopicParseError::UnrecognisedShape("empty object"));
            }
            if obj.values().all(Value::is_object) {
                return Ok(obj.values().filter_map(Value::as_object).collect());
            }
            if TOPIC_KEYS.iter().any(|key| obj.contains_key(*key)) {
                return Ok(vec![obj]);
            }
            Err(TopicParseError::UnrecognisedShape("object without topic fields"))
        }
        _ => Err(TopicParseError::UnrecognisedShape("scalar")),
    }
}

fn objects_in(items: &[Value]) -> Result<Vec<&Map<String, Value>>, TopicParseError> {
    if items.is_empty() {
        return Err(TopicParseError::UnrecognisedShape("empty array"));
    }
    items
        .iter()
        .map(|item| {
            item.as_object()
                .ok_or(TopicParseError::UnrecognisedShape("array of non-objects"))
        })
        .collect()
}

fn normalise(obj: &Map<String, Value>, position: usize) -> TopicDraft {
    let title = first_text(obj, &["title", "Title"]).unwrap_or_else(|| format!("Topic {}", position));
    let main_points = ["main_points", "MainPoints"]
        .iter()
        .map(|key| text_list(obj.get(*key)))
        .find(|points| !points.is_empty())
        .unwrap_or_default();
    let transition_note = first_text(obj, &["transition_note", "TransitionNote"]).unwrap_or_default();
    let order = obj
        .get("Order")
        .and_then(|v| match v {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .filter(|order| *order > 0)
        .unwrap_or(position as u32);

    TopicDraft {
        title,
        main_points,
        transition_note,
        order,
    }
}

fn first_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn text_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}
