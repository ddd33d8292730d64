//! FFmpeg-backed frame sampling.
//!
//! Frames are decoded to raw `gray` or `rgb24` pixels on stdout, with the
//! `fps` filter doing the rate conversion, then split into images using the
//! dimensions reported by ffprobe.

use async_trait::async_trait;
use image::{DynamicImage, GrayImage, RgbImage};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::frame::{Frame, FrameProvider, SampleRequest};
use crate::probe::probe_video;

/// Builder for an FFmpeg invocation that writes raw frames to stdout.
#[derive(Debug, Clone)]
pub struct RawFrameCommand {
    input: PathBuf,
    seek: f64,
    duration: Option<f64>,
    fps: f64,
    grayscale: bool,
    log_level: String,
}

impl RawFrameCommand {
    pub fn from_request(request: &SampleRequest) -> Self {
        Self {
            input: request.path.clone(),
            seek: request.start_second,
            duration: request.window_secs(),
            fps: request.target_fps,
            grayscale: request.grayscale,
            log_level: "error".to_string(),
        }
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Bytes per decoded pixel.
    pub fn channels(&self) -> usize {
        if self.grayscale {
            1
        } else {
            3
        }
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-v".to_string(), self.log_level.clone()];

        if self.seek > 0.0 {
            args.push("-ss".to_string());
            args.push(format!("{:.3}", self.seek));
        }
        if let Some(duration) = self.duration {
            args.push("-t".to_string());
            args.push(format!("{:.3}", duration));
        }

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.push("-vf".to_string());
        args.push(format!("fps={}", self.fps));
        args.push("-f".to_string());
        args.push("rawvideo".to_string());
        args.push("-pix_fmt".to_string());
        args.push(if self.grayscale { "gray" } else { "rgb24" }.to_string());
        args.push("pipe:1".to_string());

        args
    }
}

/// Frame provider that shells out to `ffprobe` and `ffmpeg`.
#[derive(Debug, Clone, Default)]
pub struct FfmpegFrameProvider {
    timeout_secs: Option<u64>,
}

impl FfmpegFrameProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the decoder if it runs longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

#[async_trait]
impl FrameProvider for FfmpegFrameProvider {
    async fn sample(&self, request: &SampleRequest) -> MediaResult<Vec<Frame>> {
        request.validate()?;
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let info = probe_video(&request.path).await?;
        if info.duration > 0.0 && request.start_second >= info.duration {
            warn!(
                path = %request.path.display(),
                start = request.start_second,
                duration = info.duration,
                "Sample window starts after the end of the video"
            );
            return Ok(Vec::new());
        }

        let command = RawFrameCommand::from_request(request);
        let args = command.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match self.timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), child)
                .await
                .map_err(|_| MediaError::Timeout(secs))??,
            None => child.await?,
        };

        if !output.status.success() {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg frame extraction failed",
                Some(String::from_utf8_lossy(&output.stderr).to_string()),
                output.status.code(),
            ));
        }

        let frames = frames_from_raw(&output.stdout, info.width, info.height, request.grayscale)?;
        debug!(
            path = %request.path.display(),
            frames = frames.len(),
            "Sampled frames"
        );
        Ok(frames)
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

/// Split a raw pixel stream into frames. A trailing partial frame is dropped.
fn frames_from_raw(
    bytes: &[u8],
    width: u32,
    height: u32,
    grayscale: bool,
) -> MediaResult<Vec<Frame>> {
    let channels = if grayscale { 1 } else { 3 };
    let frame_len = width as usize * height as usize * channels;
    if frame_len == 0 {
        return Err(MediaError::InvalidVideo("Zero-sized frames".to_string()));
    }

    bytes
        .chunks_exact(frame_len)
        .map(|chunk| {
            let frame = if grayscale {
                GrayImage::from_raw(width, height, chunk.to_vec()).map(DynamicImage::ImageLuma8)
            } else {
                RgbImage::from_raw(width, height, chunk.to_vec()).map(DynamicImage::ImageRgb8)
            };
            frame.ok_or_else(|| MediaError::internal("Raw frame buffer has the wrong size"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder_window() {
        let request = SampleRequest::new("input.mp4")
            .with_fps(2.0)
            .with_grayscale(true)
            .starting_at(10.0)
            .ending_at(40.0);
        let args = RawFrameCommand::from_request(&request).build_args();

        assert!(args.contains(&"-ss".to_string()));
        assert!(args.contains(&"10.000".to_string()));
        assert!(args.contains(&"30.000".to_string()));
        assert!(args.contains(&"fps=2".to_string()));
        assert!(args.contains(&"gray".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }

    #[test]
    fn test_command_builder_whole_video() {
        let request = SampleRequest::new("input.mp4");
        let command = RawFrameCommand::from_request(&request);
        let args = command.build_args();

        assert!(!args.contains(&"-ss".to_string()));
        assert!(!args.contains(&"-t".to_string()));
        assert!(args.contains(&"rgb24".to_string()));
        assert_eq!(command.channels(), 3);
    }

    #[test]
    fn test_frames_from_raw_gray() {
        let bytes = vec![7u8; 4 * 2 * 3 + 5];
        let frames = frames_from_raw(&bytes, 4, 2, true).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].to_luma8().get_pixel(0, 0).0[0], 7);
    }

    #[test]
    fn test_frames_from_raw_rgb() {
        let bytes = vec![1u8; 2 * 2 * 3 * 2];
        let frames = frames_from_raw(&bytes, 2, 2, false).unwrap();
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn test_frames_from_raw_zero_size() {
        assert!(frames_from_raw(&[0u8; 4], 0, 2, true).is_err());
    }
}
