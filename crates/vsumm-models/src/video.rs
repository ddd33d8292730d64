//! Source video model.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::manifest::{SegmentRecord, VideoRecord};
use crate::segment::VideoSegment;

/// A source video with its ordered, already-labelled segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VideoRecord", into = "VideoRecord")]
pub struct Video {
    name: String,
    path: String,
    topics: Vec<String>,
    segments: Vec<VideoSegment>,
}

impl Video {
    /// Create a video. Segments without a video path inherit `path`.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        topics: Vec<String>,
        segments: Vec<VideoSegment>,
    ) -> Self {
        let path = path.into();
        let segments = segments
            .into_iter()
            .map(|segment| {
                if segment.video_path().is_empty() {
                    segment.with_video_path(path.clone())
                } else {
                    segment
                }
            })
            .collect();

        Self {
            name: name.into(),
            path,
            topics,
            segments,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn segments(&self) -> &[VideoSegment] {
        &self.segments
    }

    /// End time of the last segment, if any.
    pub fn last_end(&self) -> Option<f64> {
        self.segments.last().map(VideoSegment::end)
    }

    /// Leading segments whose rounded end time is within `final_second + tolerance`.
    ///
    /// Ends round half to even, so 2.5 rounds to 2. Stops at the first
    /// segment that ends later.
    pub fn segments_until(&self, final_second: f64, tolerance: f64) -> Vec<&VideoSegment> {
        self.segments
            .iter()
            .take_while(|segment| segment.end().round_ties_even() <= final_second + tolerance)
            .collect()
    }
}

impl TryFrom<VideoRecord> for Video {
    type Error = ModelError;

    fn try_from(record: VideoRecord) -> Result<Self, Self::Error> {
        let segments = record
            .segments
            .into_iter()
            .map(VideoSegment::try_from)
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(Video::new(record.name, record.path, record.topics, segments))
    }
}

impl From<Video> for VideoRecord {
    fn from(video: Video) -> Self {
        Self {
            name: video.name,
            path: video.path,
            topics: video.topics,
            segments: video.segments.into_iter().map(SegmentRecord::from).collect(),
        }
    }
}
