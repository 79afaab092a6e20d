//! Byte-level sniffing of downloaded media.
//!
//! Remote storage often answers with an HTML error page and a 200 status,
//! so every file is checked for a size floor, HTML markers in its head and a
//! known container signature before it reaches the encoder.

use std::path::Path;

use tokio::io::AsyncReadExt;

use crate::error::{MediaError, MediaResult};

/// Minimum audio file size (10 KiB).
pub const MIN_AUDIO_BYTES: u64 = 10 * 1024;

/// Minimum image file size (5 KiB).
pub const MIN_IMAGE_BYTES: u64 = 5 * 1024;

/// Number of leading bytes inspected.
const HEADER_BYTES: usize = 512;

/// Lowercased markers that indicate an error page instead of media.
const HTML_MARKERS: [&str; 7] = [
    "<!doctype",
    "<html",
    "<head>",
    "<body>",
    "error",
    "access denied",
    "not found",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Image,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Image => "image",
        }
    }

    pub fn min_bytes(&self) -> u64 {
        match self {
            MediaKind::Audio => MIN_AUDIO_BYTES,
            MediaKind::Image => MIN_IMAGE_BYTES,
        }
    }
}

/// Container detected from the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    Mp3,
    Wav,
    Png,
    Jpeg,
    Gif,
}

/// Find an HTML marker in the head of a buffer.
pub fn html_marker(header: &[u8]) -> Option<&'static str> {
    let text = String::from_utf8_lossy(header).to_lowercase();
    HTML_MARKERS.iter().copied().find(|m| text.contains(m))
}

pub fn sniff_audio(header: &[u8]) -> Option<MediaFormat> {
    if header.starts_with(b"ID3") || header.starts_with(b"\xff\xfb") || header.starts_with(b"\xff\xf3") {
        return Some(MediaFormat::Mp3);
    }
    if header.starts_with(b"RIFF") && header.len() >= 12 && &header[8..12] == b"WAVE" {
        return Some(MediaFormat::Wav);
    }
    None
}

pub fn sniff_image(header: &[u8]) -> Option<MediaFormat> {
    if header.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Some(MediaFormat::Png);
    }
    if header.starts_with(b"\xff\xd8\xff") {
        return Some(MediaFormat::Jpeg);
    }
    if header.starts_with(b"GIF87a") || header.starts_with(b"GIF89a") {
        return Some(MediaFormat::Gif);
    }
    None
}

/// Validate a buffer of `total_len` bytes whose first bytes are `header`.
pub fn validate_header(
    kind: MediaKind,
    path: &Path,
    header: &[u8],
    total_len: u64,
) -> MediaResult<MediaFormat> {
    if total_len < kind.min_bytes() {
        return Err(MediaError::invalid_media(
            kind.as_str(),
            path,
            format!("too small: {} bytes (minimum {})", total_len, kind.min_bytes()),
        ));
    }

    let head = &header[..header.len().min(HEADER_BYTES)];
    if let Some(marker) = html_marker(head) {
        return Err(MediaError::invalid_media(
            kind.as_str(),
            path,
            format!("contains HTML content ('{}')", marker),
        ));
    }

    let format = match kind {
        MediaKind::Audio => sniff_audio(head),
        MediaKind::Image => sniff_image(head),
    };
    format.ok_or_else(|| {
        let hex: String = head.iter().take(16).map(|b| format!("{:02x}", b)).collect();
        MediaError::invalid_media(kind.as_str(), path, format!("unknown format, header {}", hex))
    })
}

/// Validate a file on disk.
pub async fn validate_file(path: &Path, kind: MediaKind) -> MediaResult<MediaFormat> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|_| MediaError::FileNotFound(path.to_path_buf()))?;

    let mut file = tokio::fs::File::open(path).await?;
    let mut header = vec![0u8; HEADER_BYTES];
    let mut read = 0;
    while read < HEADER_BYTES {
        let n = file.read(&mut header[read..]).await?;
        if n == 0 {
            break;
        }
        read += n;
    }
    header.truncate(read);

    validate_header(kind, path, &header, meta.len())
}
