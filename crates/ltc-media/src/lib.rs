#![deny(unreachable_patterns)]
//! Media handling for generated topics.
//!
//! This crate provides:
//! - Content validation of downloaded audio and images
//! - Drive share-link rewriting and streaming downloads
//! - FFmpeg command building with a wall-clock timeout
//! - Slideshow assembly of narration plus still images

pub mod assembler;
pub mod command;
pub mod download;
pub mod drive_url;
pub mod error;
pub mod metrics;
pub mod probe;
pub mod slideshow;
pub mod validate;

pub use assembler::{AssemblerConfig, AssemblyOutput, AssemblyRequest, VideoAssembler, DEFAULT_AUDIO_DURATION_SECS};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use download::download_to;
pub use drive_url::to_direct_download;
pub use error::{MediaError, MediaResult};
pub use probe::probe_duration;
pub use slideshow::{FrameSpec, SlideshowTimeline, CROSSFADE_SECS};
pub use validate::{validate_file, validate_header, MediaFormat, MediaKind, MIN_AUDIO_BYTES, MIN_IMAGE_BYTES};
