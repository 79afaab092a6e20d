//! Conversion of Google Drive share links to direct-download URLs.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

const DIRECT_PREFIX: &str = "https://drive.google.com/uc?export=download&id=";

/// `/file/d/{id}` share links.
static FILE_PATH_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/file/d/([a-zA-Z0-9_-]+)").unwrap());

/// `open?id={id}` links.
static QUERY_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"id=([a-zA-Z0-9_-]+)").unwrap());

/// Any other Drive URL carrying a long id.
static LONG_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([a-zA-Z0-9_-]{25,})").unwrap());

/// Rewrite a Drive share URL into its direct-download form.
///
/// Non-Drive URLs and Drive URLs without a recognizable file id are
/// returned unchanged.
pub fn to_direct_download(url: &str) -> String {
    if url.contains("drive.google.com/uc?export=download&id=") {
        return url.to_string();
    }

    let file_id = if url.contains("drive.google.com/file/d/") {
        FILE_PATH_ID.captures(url).map(|c| c[1].to_string())
    } else if url.contains("drive.google.com/open?id=") {
        QUERY_ID.captures(url).map(|c| c[1].to_string())
    } else if url.contains("drive.google.com") {
        LONG_ID.captures(url).map(|c| c[1].to_string())
    } else {
        return url.to_string();
    };

    match file_id {
        Some(id) => {
            let direct = format!("{}{}", DIRECT_PREFIX, id);
            debug!(from = %url, to = %direct, "Converted Drive URL");
            direct
        }
        None => {
            warn!(url = %url, "Could not extract file id from Drive URL");
            url.to_string()
        }
    }
}
