//! Helpers shared across crates for naming and link checks.

use std::path::Path;

/// Maximum length of the title part of a topic folder name.
pub const SAFE_TITLE_MAX_CHARS: usize = 50;

/// Replace characters that are unsafe in file names and cap the length.
pub fn safe_title(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\\' | '/' | ' ' => '_',
            other => other,
        })
        .take(SAFE_TITLE_MAX_CHARS)
        .collect();
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned
    }
}

/// Folder name for a topic's generated files: `{topic_id}_{safe_title}`.
pub fn topic_folder_name(topic_id: &str, title: &str) -> String {
    format!("{}_{}", topic_id, safe_title(title))
}

/// Whether `link` is an http(s) URL.
pub fn is_remote(link: &str) -> bool {
    let link = link.trim();
    link.starts_with("http://") || link.starts_with("https://")
}

/// A video link counts as produced when it is a remote URL or an existing
/// non-empty local file.
pub fn video_link_valid(link: &str) -> bool {
    let link = link.trim();
    if link.is_empty() {
        return false;
    }
    if is_remote(link) {
        return true;
    }
    std::fs::metadata(Path::new(link))
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}
