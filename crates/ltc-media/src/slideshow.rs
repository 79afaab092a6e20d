//! Slideshow timeline and filter graph for still images over narration.
//!
//! Every image is shown for `audio_duration / image_count` seconds. Inputs
//! except the last are extended by the crossfade so consecutive images can
//! overlap; the `xfade` offsets are placed on the cumulative timeline.

use std::path::{Path, PathBuf};

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};

/// Crossfade between consecutive images, in seconds.
pub const CROSSFADE_SECS: f64 = 0.5;

/// Output frame geometry and rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSpec {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for FrameSpec {
    /// Vertical 1080x1920 at 30 fps.
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideshowTimeline {
    pub audio_duration: f64,
    pub image_count: usize,
    pub per_image: f64,
    pub crossfade: f64,
}

impl SlideshowTimeline {
    pub fn new(audio_duration: f64, image_count: usize) -> MediaResult<Self> {
        if image_count == 0 {
            return Err(MediaError::NoImages);
        }
        let per_image = audio_duration / image_count as f64;
        // Never longer than half an image's span, so offsets stay non-negative.
        let crossfade = if image_count > 1 {
            CROSSFADE_SECS.min(per_image / 2.0)
        } else {
            0.0
        };
        Ok(Self {
            audio_duration,
            image_count,
            per_image,
            crossfade,
        })
    }

    /// Length of the looped input for image `index`.
    pub fn input_duration(&self, index: usize) -> f64 {
        if index + 1 < self.image_count {
            self.per_image + self.crossfade
        } else {
            self.per_image
        }
    }

    /// `xfade` offset for the transition into image `index` (1-based in the chain).
    pub fn transition_offset(&self, index: usize) -> f64 {
        (index as f64 * self.per_image - self.crossfade).max(0.0)
    }

    /// Display span of each image, excluding crossfade overlap.
    pub fn display_spans(&self) -> Vec<f64> {
        vec![self.per_image; self.image_count]
    }

    /// Build the `-filter_complex` graph ending in the `[v]` label.
    pub fn filter_graph(&self, frame: &FrameSpec) -> String {
        let (w, h) = (frame.width, frame.height);
        let mut parts: Vec<String> = (0..self.image_count)
            .map(|i| {
                format!(
                    "[{i}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
                     pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,format=yuv420p[v{i}]"
                )
            })
            .collect();

        if self.image_count == 1 {
            parts[0] = parts[0].replace("[v0]", "[v]");
            return parts.join(";");
        }

        let mut current = "v0".to_string();
        for i in 1..self.image_count {
            let out = if i + 1 == self.image_count {
                "v".to_string()
            } else {
                format!("x{}", i)
            };
            parts.push(format!(
                "[{current}][v{i}]xfade=transition=fade:duration={:.2}:offset={:.2}[{out}]",
                self.crossfade,
                self.transition_offset(i),
            ));
            current = out;
        }
        parts.join(";")
    }
}

/// Full encoder invocation: images, then audio as the last input.
pub fn build_slideshow_command(
    images: &[PathBuf],
    audio: &Path,
    output: &Path,
    timeline: &SlideshowTimeline,
    frame: &FrameSpec,
) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(output);
    for (i, image) in images.iter().enumerate() {
        cmd = cmd.looped_image(image, timeline.input_duration(i));
    }
    cmd = cmd.input(audio, Vec::<String>::new());

    cmd.filter_complex(timeline.filter_graph(frame))
        .map("[v]")
        .map(format!("{}:a", images.len()))
        .video_codec("libx264")
        .output_args(["-pix_fmt", "yuv420p", "-r"])
        .output_arg(frame.fps.to_string())
        .audio_codec("aac")
        .audio_bitrate("192k")
        .output_args(["-ar", "44100", "-shortest"])
}
