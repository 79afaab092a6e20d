//! Narrated slideshow assembly.
//!
//! Inputs are resolved into a scratch directory (remote files downloaded,
//! local images copied), checked by content, then encoded into an MP4 in
//! the topic folder. Without an encoder on the host a text placeholder is
//! written instead, and callers must not treat it as a video.

use std::env;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{info, info_span, warn, Instrument};

use ltc_models::is_remote;
use ltc_storage::{upload_or_local, AssetKind, AssetUploader};

use crate::command::{check_ffmpeg, FfmpegRunner};
use crate::download::download_to;
use crate::error::{MediaError, MediaResult};
use crate::metrics::{record_assembly, record_encode, record_invalid_input};
use crate::probe::probe_duration;
use crate::slideshow::{build_slideshow_command, FrameSpec, SlideshowTimeline};
use crate::validate::{validate_file, MediaKind};

/// Duration used when the narration cannot be probed.
pub const DEFAULT_AUDIO_DURATION_SECS: f64 = 45.0;

#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    pub ffmpeg_binary: String,
    pub ffprobe_binary: String,
    /// Encoder wall-clock limit.
    pub encode_timeout_secs: u64,
    pub probe_timeout: Duration,
    pub download_timeout: Duration,
    pub default_audio_duration: f64,
    pub frame: FrameSpec,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            ffmpeg_binary: "ffmpeg".to_string(),
            ffprobe_binary: "ffprobe".to_string(),
            encode_timeout_secs: 300,
            probe_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(60),
            default_audio_duration: DEFAULT_AUDIO_DURATION_SECS,
            frame: FrameSpec::default(),
        }
    }
}

impl AssemblerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ffmpeg_binary: env::var("FFMPEG_PATH").unwrap_or(defaults.ffmpeg_binary),
            ffprobe_binary: env::var("FFPROBE_PATH").unwrap_or(defaults.ffprobe_binary),
            encode_timeout_secs: env::var("FFMPEG_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.encode_timeout_secs),
            probe_timeout: defaults.probe_timeout,
            download_timeout: env::var("MEDIA_DOWNLOAD_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.download_timeout),
            default_audio_duration: defaults.default_audio_duration,
            frame: FrameSpec {
                width: env::var("VIDEO_WIDTH")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.frame.width),
                height: env::var("VIDEO_HEIGHT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.frame.height),
                fps: defaults.frame.fps,
            },
        }
    }
}

/// What to assemble for one topic.
#[derive(Debug, Clone)]
pub struct AssemblyRequest<'a> {
    pub topic_id: &'a str,
    pub title: &'a str,
    /// Narration: URL or local path.
    pub audio: &'a str,
    /// Generated images in slot order: URLs or local paths.
    pub images: &'a [String],
    /// Topic folder receiving the output.
    pub output_dir: &'a Path,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssemblyOutput {
    Video { link: String, local_path: PathBuf },
    /// Encoder unavailable; `path` is a text file, not a video.
    Placeholder { path: PathBuf },
}

impl AssemblyOutput {
    /// Link recorded in the topic row.
    pub fn link(&self) -> String {
        match self {
            AssemblyOutput::Video { link, .. } => link.clone(),
            AssemblyOutput::Placeholder { path } => path.display().to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, AssemblyOutput::Placeholder { .. })
    }
}

pub struct VideoAssembler {
    config: AssemblerConfig,
    http: Client,
}

impl VideoAssembler {
    pub fn new(config: AssemblerConfig) -> MediaResult<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("ltc-media/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Assemble the slideshow and upload it, keeping the local path if the
    /// upload fails.
    pub async fn assemble(
        &self,
        request: &AssemblyRequest<'_>,
        uploader: &dyn AssetUploader,
    ) -> MediaResult<AssemblyOutput> {
        let span = info_span!("assemble_video", topic_id = %request.topic_id, images = request.images.len());
        async {
            let result = self.assemble_inner(request, uploader).await;
            match &result {
                Ok(AssemblyOutput::Video { .. }) => record_assembly("video"),
                Ok(AssemblyOutput::Placeholder { .. }) => record_assembly("placeholder"),
                Err(e) => {
                    warn!("Video assembly failed: {}", e);
                    record_assembly("failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn assemble_inner(
        &self,
        request: &AssemblyRequest<'_>,
        uploader: &dyn AssetUploader,
    ) -> MediaResult<AssemblyOutput> {
        if request.images.is_empty() {
            return Err(MediaError::NoImages);
        }

        if let Err(e) = check_ffmpeg(&self.config.ffmpeg_binary) {
            warn!("{}; writing placeholder", e);
            let path = self.write_placeholder(request).await?;
            return Ok(AssemblyOutput::Placeholder { path });
        }

        let work = tempfile::Builder::new().prefix("ltc_video_").tempdir()?;

        let audio = self.resolve_audio(request.audio, request.topic_id, work.path()).await?;
        let duration = match probe_duration(&self.config.ffprobe_binary, &audio, self.config.probe_timeout).await {
            Ok(secs) if secs > 0.0 => secs,
            Ok(_) => self.config.default_audio_duration,
            Err(e) => {
                warn!("Could not probe narration, assuming {}s: {}", self.config.default_audio_duration, e);
                self.config.default_audio_duration
            }
        };

        let mut images = Vec::with_capacity(request.images.len());
        for (i, reference) in request.images.iter().enumerate() {
            images.push(self.resolve_image(reference, i, request.topic_id, work.path()).await?);
        }

        // Everything handed to the encoder is checked once more.
        checked(&audio, MediaKind::Audio).await?;
        for image in &images {
            checked(image, MediaKind::Image).await?;
        }

        let timeline = SlideshowTimeline::new(duration, images.len())?;
        tokio::fs::create_dir_all(request.output_dir).await?;
        let output = request
            .output_dir
            .join(format!("video_{}_{}.mp4", request.topic_id, chrono::Utc::now().timestamp()));

        let cmd = build_slideshow_command(&images, &audio, &output, &timeline, &self.config.frame);
        let started = Instant::now();
        FfmpegRunner::new()
            .with_binary(self.config.ffmpeg_binary.clone())
            .with_timeout(self.config.encode_timeout_secs)
            .run(&cmd)
            .await?;
        record_encode(started.elapsed().as_millis() as f64, images.len());

        match tokio::fs::metadata(&output).await {
            Ok(meta) if meta.len() > 0 => {}
            _ => return Err(MediaError::EmptyOutput(output)),
        }

        info!(output = %output.display(), duration_secs = duration, "Video assembled");
        let link = upload_or_local(uploader, &output, AssetKind::Video).await;
        Ok(AssemblyOutput::Video {
            link,
            local_path: output,
        })
    }

    /// Narration path usable by the encoder. Remote audio is downloaded into
    /// `work_dir`; local audio is used in place.
    pub async fn resolve_audio(&self, reference: &str, topic_id: &str, work_dir: &Path) -> MediaResult<PathBuf> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(MediaError::InvalidReference("empty audio reference".to_string()));
        }
        let path = if is_remote(reference) {
            let dest = work_dir.join(format!("audio_{}.mp3", topic_id));
            download_to(&self.http, reference, &dest, self.config.download_timeout).await?;
            dest
        } else {
            let local = PathBuf::from(reference);
            if !local.is_file() {
                return Err(MediaError::FileNotFound(local));
            }
            local
        };
        checked(&path, MediaKind::Audio).await?;
        Ok(path)
    }

    /// Image `index` copied or downloaded into `work_dir`.
    pub async fn resolve_image(
        &self,
        reference: &str,
        index: usize,
        topic_id: &str,
        work_dir: &Path,
    ) -> MediaResult<PathBuf> {
        let reference = reference.trim();
        let dest = work_dir.join(format!("image_{}_{}.png", index + 1, topic_id));
        if is_remote(reference) {
            download_to(&self.http, reference, &dest, self.config.download_timeout).await?;
        } else {
            let local = Path::new(reference);
            if !local.is_file() {
                return Err(MediaError::FileNotFound(local.to_path_buf()));
            }
            tokio::fs::copy(local, &dest).await?;
        }
        checked(&dest, MediaKind::Image).await?;
        Ok(dest)
    }

    async fn write_placeholder(&self, request: &AssemblyRequest<'_>) -> MediaResult<PathBuf> {
        tokio::fs::create_dir_all(request.output_dir).await?;
        let path = request.output_dir.join(format!(
            "video_{}_{}_placeholder.txt",
            request.topic_id,
            chrono::Utc::now().timestamp()
        ));
        let body = format!(
            "Video placeholder - FFmpeg required\nTopic: {}\nAudio: {}\nImages: {} images\nInstall FFmpeg to enable video generation\n",
            request.title,
            request.audio,
            request.images.len()
        );
        tokio::fs::write(&path, body).await?;
        Ok(path)
    }
}

async fn checked(path: &Path, kind: MediaKind) -> MediaResult<()> {
    validate_file(path, kind).await.map(|_| ()).inspect_err(|_| {
        record_invalid_input(kind.as_str());
    })
}
