//! Script responses and author-embedded scene labels.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Voice style recorded when the model does not name one.
pub const DEFAULT_VOICE_STYLE: &str = "conversational";

/// Order of the keys in the object form of `ImagePrompts`.
const IMAGE_PROMPT_KEYS: [&str; 4] = ["Hook", "MainPoint1", "MainPoint2", "Teaser"];

/// Parsed script-generation output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptContent {
    pub script: String,
    /// Empty when the model gave none; the caller derives them.
    pub image_prompts: Vec<String>,
    pub voice_style: String,
    pub caption: String,
    pub hashtags: Vec<String>,
}

impl ScriptContent {
    /// Templated content used when the model output is not a JSON object.
    pub fn fallback(title: &str) -> Self {
        Self {
            script: format!(
                "This is an educational video about {}. Learn the key concepts and apply them in your work.",
                title
            ),
            image_prompts: vec![
                format!("Educational illustration about {}", title),
                format!("Diagram showing key concepts of {}", title),
                format!("Visual representation of {} in action", title),
                format!("Summary infographic about {}", title),
            ],
            voice_style: DEFAULT_VOICE_STYLE.to_string(),
            caption: format!("Learn about {} in 60 seconds! 🎓", title),
            hashtags: vec!["#education".into(), "#learning".into(), "#shorts".into()],
        }
    }
}

/// Parse the model's script response for the topic titled `title`.
///
/// Field precedence: `script` > `Script`, `voice_style` > `VoiceStyle`,
/// `caption` > `Caption`, `hashtags` > `Hashtags`, and the `image_prompts`
/// list > the `ImagePrompts` object. A bare JSON string is taken as the
/// script itself.
pub fn parse_script_response(text: &str, title: &str) -> ScriptContent {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(obj)) => from_object(&obj),
        Ok(Value::String(script)) => ScriptContent {
            script: script.trim().to_string(),
            image_prompts: Vec::new(),
            voice_style: DEFAULT_VOICE_STYLE.to_string(),
            caption: String::new(),
            hashtags: Vec::new(),
        },
        _ => ScriptContent::fallback(title),
    }
}

fn from_object(obj: &Map<String, Value>) -> ScriptContent {
    let text = |keys: [&str; 2]| -> Option<String> {
        keys.iter()
            .filter_map(|key| obj.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
    };

    let hashtags = ["hashtags", "Hashtags"]
        .iter()
        .map(|key| tag_list(obj.get(*key)))
        .find(|tags| !tags.is_empty())
        .unwrap_or_default();

    let mut image_prompts = string_list(obj.get("image_prompts"));
    if image_prompts.is_empty() {
        if let Some(Value::Object(prompts)) = obj.get("ImagePrompts") {
            image_prompts = IMAGE_PROMPT_KEYS
                .iter()
                .filter_map(|key| prompts.get(*key).and_then(Value::as_str))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    ScriptContent {
        script: text(["script", "Script"]).unwrap_or_default(),
        image_prompts,
        voice_style: text(["voice_style", "VoiceStyle"]).unwrap_or_else(|| DEFAULT_VOICE_STYLE.to_string()),
        caption: text(["caption", "Caption"]).unwrap_or_default(),
        hashtags,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn tag_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect(),
        other => string_list(other),
    }
}

static HOOK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^(hook)\s*:\s*(.+)$").unwrap());
static IMAGE1: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(image\s*1|image1|main\s*point\s*1|mainpoint1)\s*:\s*(.+)$").unwrap());
static IMAGE2: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(image\s*2|image2|main\s*point\s*2|mainpoint2)\s*:\s*(.+)$").unwrap());
static TEASER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(teaser|transition|image\s*4|image4)\s*:\s*(.+)$").unwrap());
static IMAGE3: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^(image\s*3|image3)\s*:\s*(.+)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SceneLabel {
    Hook,
    Image1,
    Image2,
    Teaser,
    Image3,
}

/// Scene prompts the author wrote into the script as `Label: text` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneLabels {
    /// Hook, Image 1, Image 2, then Image 3 or else Teaser.
    pub prompts: Vec<String>,
    /// The script with every labelled line removed.
    pub cleaned_script: String,
}

/// Pull labelled scene lines out of `script`.
///
/// Returns `None` unless at least two prompts were found. For each label
/// the first occurrence wins.
pub fn extract_scene_labels(script: &str) -> Option<SceneLabels> {
    let patterns: [(SceneLabel, &Regex); 5] = [
        (SceneLabel::Hook, &*HOOK),
        (SceneLabel::Image1, &*IMAGE1),
        (SceneLabel::Image2, &*IMAGE2),
        (SceneLabel::Teaser, &*TEASER),
        (SceneLabel::Image3, &*IMAGE3),
    ];

    let mut found: Vec<(SceneLabel, String)> = Vec::new();
    let mut kept = Vec::new();
    for line in script.lines() {
        let matched = patterns.iter().find_map(|(label, rx)| {
            rx.captures(line.trim())
                .and_then(|caps| caps.get(2))
                .map(|text| (*label, text.as_str().trim().to_string()))
        });
        match matched {
            Some((label, text)) => {
                if !found.iter().any(|(l, _)| *l == label) {
                    found.push((label, text));
                }
            }
            None => kept.push(line),
        }
    }

    let get = |label: SceneLabel| {
        found
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, text)| text.clone())
            .filter(|text| !text.is_empty())
    };
    let mut prompts: Vec<String> = [SceneLabel::Hook, SceneLabel::Image1, SceneLabel::Image2]
        .into_iter()
        .filter_map(|label| get(label))
        .collect();
    if let Some(last) = get(SceneLabel::Image3).or_else(|| get(SceneLabel::Teaser)) {
        prompts.push(last);
    }

    if prompts.len() < 2 {
        return None;
    }
    Some(SceneLabels {
        prompts,
        cleaned_script: kept.join("\n"),
    })
}
