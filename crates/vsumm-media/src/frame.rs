//! Frame model and the frame-sampling contract.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use vsumm_models::VideoSegment;

use crate::error::{MediaError, MediaResult};

/// A decoded video frame.
pub type Frame = image::DynamicImage;

/// Which frames to sample from a video.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRequest {
    /// Video file to decode
    pub path: PathBuf,
    /// Frames per second to keep
    pub target_fps: f64,
    /// Decode as single-channel luma
    pub grayscale: bool,
    /// First second of the window
    pub start_second: f64,
    /// Last second of the window (end of video when `None`)
    pub end_second: Option<f64>,
}

impl SampleRequest {
    /// Sample the whole video at 1 fps in colour.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            target_fps: 1.0,
            grayscale: false,
            start_second: 0.0,
            end_second: None,
        }
    }

    /// Sample the time window of a segment from its owning video.
    pub fn for_segment(segment: &VideoSegment) -> Self {
        Self::new(segment.video_path())
            .starting_at(segment.start())
            .ending_at(segment.end())
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.target_fps = fps;
        self
    }

    pub fn with_grayscale(mut self, grayscale: bool) -> Self {
        self.grayscale = grayscale;
        self
    }

    pub fn starting_at(mut self, second: f64) -> Self {
        self.start_second = second;
        self
    }

    pub fn ending_at(mut self, second: f64) -> Self {
        self.end_second = Some(second);
        self
    }

    /// Window length in seconds, if bounded.
    pub fn window_secs(&self) -> Option<f64> {
        self.end_second.map(|end| end - self.start_second)
    }

    pub fn validate(&self) -> MediaResult<()> {
        if !(self.target_fps > 0.0) {
            return Err(MediaError::InvalidRequest(format!(
                "target fps must be positive, got {}",
                self.target_fps
            )));
        }
        if self.start_second < 0.0 {
            return Err(MediaError::InvalidRequest(format!(
                "start second must not be negative, got {}",
                self.start_second
            )));
        }
        if let Some(end) = self.end_second {
            if end <= self.start_second {
                return Err(MediaError::InvalidRequest(format!(
                    "window [{}, {}] is empty",
                    self.start_second, end
                )));
            }
        }
        Ok(())
    }
}

/// Source of sampled frames.
///
/// Implementations decode `request.path` and return frames evenly spaced at
/// `request.target_fps` inside the requested window, in presentation order.
#[async_trait]
pub trait FrameProvider: Send + Sync {
    async fn sample(&self, request: &SampleRequest) -> MediaResult<Vec<Frame>>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}
