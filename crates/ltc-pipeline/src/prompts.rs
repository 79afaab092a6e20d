//! LLM prompt builders.

use ltc_models::{InputMode, Topic};

const DEFAULT_DURATION_REQUIREMENT: &str = "- Exactly 40-60 seconds when spoken (approximately 100-150 words for English, 120-180 words for Urdu/Hindi)";

const OUTPUT_FORMAT: &str = r##"**Output Format** (JSON):
{
  "script": "The complete narration script here...",
  "image_prompts": [
    "Image 1 prompt for visual representation",
    "Image 2 prompt for visual representation",
    "Image 3 prompt for visual representation",
    "Image 4 prompt for visual representation"
  ],
  "voice_style": "conversational",
  "caption": "Engaging social media caption with hashtags",
  "hashtags": ["#education", "#learning", "#shorts"]
}

Return ONLY the JSON, no other text."##;

/// Instruction asking the model for four labelled scene prompts.
pub const SCENE_PROMPT_INSTRUCTION: &str = "Read this script. Extract 4 cinematic, scene-specific image prompts in this format:\nHook: ...\nImage 1: ...\nImage 2: ...\nTeaser: ...\nKeep them short, visual, and descriptive. Adapt to the script's genre.";

/// Prompt asking for `count` topics as a JSON array.
pub fn topic_extraction_prompt(raw_notes: &str, count: u32, language: &str, tone: &str) -> String {
    format!(
        r#"You are an expert content strategist specializing in educational short-form content.

**Task**: Extract {count} specific, engaging topics from the raw notes below that can be turned into educational short videos.

**Requirements**:
- Each topic should be specific and focused (suitable for 40-60 second videos)
- Educational and engaging for {language} audience
- {tone} tone throughout
- Clear, actionable learning outcomes
- Suitable for platforms: YouTube Shorts, Instagram Reels, LinkedIn

**Raw Notes**:
{raw_notes}

**Output Format** (JSON only):
[
  {{
    "title": "Specific topic title here",
    "main_points": ["Key point 1", "Key point 2", "Key point 3"],
    "transition_note": "Brief transition or hook for the topic"
  }}
]

Return ONLY the JSON array, no other text or formatting."#
    )
}

/// Prompt for the topic's narration script.
///
/// Prompt-mode topics with a custom instruction bypass the template: the
/// instruction is sent as-is, followed by the context notes when present.
pub fn script_prompt(topic: &Topic) -> String {
    let custom = topic
        .custom_prompt
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let context = topic.context_notes.trim();

    if let (InputMode::Prompt, Some(custom)) = (topic.input_mode, custom) {
        return if context.is_empty() {
            custom.to_string()
        } else {
            format!("{}\n\n{}", custom, context)
        };
    }

    let mut preface = String::new();
    if let Some(custom) = custom {
        preface.push_str(&format!("Follow these instructions strictly: {}\n\n", custom));
    }

    let target = topic.target_duration_seconds.filter(|secs| *secs > 0);
    let duration_requirement = match target {
        Some(secs) => {
            preface.push_str(&format!(
                "Target spoken duration: approximately {} seconds in {}. Adjust word count accordingly while preserving clarity.\n\n",
                secs, topic.language
            ));
            format!(
                "- Target spoken duration approximately {} seconds (adjust word count accordingly)",
                secs
            )
        }
        None => DEFAULT_DURATION_REQUIREMENT.to_string(),
    };

    let task_line = if custom.is_some() || target.is_some() {
        "**Task**: Create a short video script for the topic below."
    } else {
        "**Task**: Create a 40-60 second educational video script for the topic below."
    };

    let context_block = if context.is_empty() {
        String::new()
    } else {
        format!("\n**Context Notes (use faithfully):**\n{}\n", context)
    };

    format!(
        "{preface}You are an expert educational content creator specializing in short-form videos.

{task_line}

**Topic**: {title}
**Key Points**: {points}
**Language**: {language}
**Tone**: {tone}
{context_block}
**Requirements**:
{duration_requirement}
- Hook in first 3 seconds
- Clear educational value
- Engaging and {tone_lower} tone
- Include call-to-action at the end
- No stage directions, just narration text
- For Urdu: Use detailed explanations and examples to ensure minimum 40 seconds duration

{OUTPUT_FORMAT}",
        title = topic.title,
        points = topic.main_points.join(", "),
        language = topic.language,
        tone = topic.tone,
        tone_lower = topic.tone.to_lowercase(),
    )
}

/// Scene-prompt request for an already written script.
pub fn scene_prompts_prompt(script: &str) -> String {
    format!("{}\n\nSCRIPT:\n{}", SCENE_PROMPT_INSTRUCTION, script)
}
