//! Video segment value type and redundancy groups.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{ModelError, ModelResult};
use crate::manifest::SegmentRecord;
use crate::timestamp::format_seconds;

/// A contiguous, timestamped span of transcript content from one source video.
///
/// Segments are values: equality and hashing cover every field, so two
/// instances with identical fields are the same segment. Fields are private
/// and every `with_*` method returns a modified copy, which keeps a segment
/// stable once it is held in a set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SegmentRecord", into = "SegmentRecord")]
pub struct VideoSegment {
    content: String,
    start: f64,
    end: f64,
    order: Option<u32>,
    video_topic: String,
    global_topic: String,
    video_path: String,
}

impl VideoSegment {
    /// Create a segment covering `[start, end)` seconds.
    ///
    /// Both bounds must be finite and `end` must be after `start`.
    pub fn new(content: impl Into<String>, start: f64, end: f64) -> ModelResult<Self> {
        if !start.is_finite() || !end.is_finite() || end <= start {
            return Err(ModelError::InvalidSegment { start, end });
        }

        Ok(Self {
            content: content.into(),
            start,
            end,
            order: None,
            video_topic: String::new(),
            global_topic: String::new(),
            video_path: String::new(),
        })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn order(&self) -> Option<u32> {
        self.order
    }

    pub fn video_topic(&self) -> &str {
        &self.video_topic
    }

    pub fn global_topic(&self) -> &str {
        &self.global_topic
    }

    /// Path of the owning video.
    pub fn video_path(&self) -> &str {
        &self.video_path
    }

    pub fn with_order(mut self, order: Option<u32>) -> Self {
        self.order = order;
        self
    }

    pub fn with_video_topic(mut self, topic: impl Into<String>) -> Self {
        self.video_topic = topic.into();
        self
    }

    pub fn with_global_topic(mut self, topic: impl Into<String>) -> Self {
        self.global_topic = topic.into();
        self
    }

    pub fn with_video_path(mut self, path: impl Into<String>) -> Self {
        self.video_path = path.into();
        self
    }

    /// Start time formatted as `H:MM:SS`.
    pub fn formatted_start(&self) -> String {
        format_seconds(self.start)
    }

    /// End time formatted as `H:MM:SS`.
    pub fn formatted_end(&self) -> String {
        format_seconds(self.end)
    }
}

impl PartialEq for VideoSegment {
    fn eq(&self, other: &Self) -> bool {
        self.content == other.content
            && self.start.to_bits() == other.start.to_bits()
            && self.end.to_bits() == other.end.to_bits()
            && self.order == other.order
            && self.video_topic == other.video_topic
            && self.global_topic == other.global_topic
            && self.video_path == other.video_path
    }
}

impl Eq for VideoSegment {}

impl Hash for VideoSegment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.content.hash(state);
        self.start.to_bits().hash(state);
        self.end.to_bits().hash(state);
        self.order.hash(state);
        self.video_topic.hash(state);
        self.global_topic.hash(state);
        self.video_path.hash(state);
    }
}

impl fmt::Display for VideoSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} --> {}\n{}",
            self.formatted_start(),
            self.formatted_end(),
            self.content
        )
    }
}

impl TryFrom<SegmentRecord> for VideoSegment {
    type Error = ModelError;

    fn try_from(record: SegmentRecord) -> Result<Self, Self::Error> {
        Ok(VideoSegment::new(record.content, record.start, record.end)?
            .with_order(record.order)
            .with_video_topic(record.video_topic)
            .with_global_topic(record.global_topic)
            .with_video_path(record.video_path))
    }
}

impl From<VideoSegment> for SegmentRecord {
    fn from(segment: VideoSegment) -> Self {
        Self {
            content: segment.content,
            start: segment.start,
            end: segment.end,
            order: segment.order,
            video_topic: segment.video_topic,
            global_topic: segment.global_topic,
            video_path: segment.video_path,
        }
    }
}

/// Segments from different videos judged to describe the same content.
///
/// Behaves as a set (no duplicates, order-insensitive equality) but keeps
/// insertion order so iteration is deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentGroup {
    members: Vec<VideoSegment>,
}

impl SegmentGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a segment. Returns `false` if it was already a member.
    pub fn insert(&mut self, segment: VideoSegment) -> bool {
        if self.contains(&segment) {
            return false;
        }
        self.members.push(segment);
        true
    }

    pub fn contains(&self, segment: &VideoSegment) -> bool {
        self.members.iter().any(|member| member == segment)
    }

    /// Move every member of `other` into this group.
    pub fn absorb(&mut self, other: SegmentGroup) {
        for segment in other.members {
            self.insert(segment);
        }
    }

    /// First member whose owning video is `video_path`.
    pub fn find_by_video_path(&self, video_path: &str) -> Option<&VideoSegment> {
        self.members.iter().find(|member| member.video_path == video_path)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VideoSegment> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl PartialEq for SegmentGroup {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|member| other.contains(member))
    }
}

impl Eq for SegmentGroup {}

impl FromIterator<VideoSegment> for SegmentGroup {
    fn from_iter<I: IntoIterator<Item = VideoSegment>>(iter: I) -> Self {
        let mut group = SegmentGroup::new();
        for segment in iter {
            group.insert(segment);
        }
        group
    }
}

impl<'a> IntoIterator for &'a SegmentGroup {
    type Item = &'a VideoSegment;
    type IntoIter = std::slice::Iter<'a, VideoSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn segment(content: &str, start: f64, end: f64) -> VideoSegment {
        VideoSegment::new(content, start, end).unwrap()
    }

    #[test]
    fn test_rejects_empty_window() {
        assert!(matches!(
            VideoSegment::new("x", 5.0, 5.0),
            Err(ModelError::InvalidSegment { .. })
        ));
        assert!(VideoSegment::new("x", 6.0, 5.0).is_err());
    }

    #[test]
    fn test_rejects_non_finite_bounds() {
        assert!(matches!(
            VideoSegment::new("x", 0.0, f64::INFINITY),
            Err(ModelError::InvalidSegment { .. })
        ));
        assert!(VideoSegment::new("x", f64::NEG_INFINITY, 1.0).is_err());
        assert!(VideoSegment::new("x", f64::NAN, 1.0).is_err());
        assert!(VideoSegment::new("x", 0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_value_equality_across_instances() {
        let a = segment("hello", 0.0, 4.0).with_video_path("a.mp4");
        let b = segment("hello", 0.0, 4.0).with_video_path("a.mp4");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a.clone());
        assert!(set.contains(&b));

        let c = b.with_video_topic("intro");
        assert_ne!(a, c);
        assert!(!set.contains(&c));
    }

    #[test]
    fn test_display_format() {
        let s = segment("Welcome back", 5.0, 12.5);
        assert_eq!(s.to_string(), "0:00:05 --> 0:00:12.500000\nWelcome back");
    }

    #[test]
    fn test_group_is_a_set() {
        let a = segment("a", 0.0, 1.0).with_video_path("v1");
        let b = segment("b", 0.0, 1.0).with_video_path("v2");

        let mut group = SegmentGroup::new();
        assert!(group.insert(a.clone()));
        assert!(group.insert(b.clone()));
        assert!(!group.insert(a.clone()));
        assert_eq!(group.len(), 2);

        let reversed: SegmentGroup = vec![b, a].into_iter().collect();
        assert_eq!(group, reversed);
    }

    #[test]
    fn test_group_find_by_video_path() {
        let a = segment("a", 0.0, 1.0).with_video_path("v1");
        let b = segment("b", 3.0, 4.0).with_video_path("v2");
        let group: SegmentGroup = vec![a, b.clone()].into_iter().collect();

        assert_eq!(group.find_by_video_path("v2"), Some(&b));
        assert!(group.find_by_video_path("v3").is_none());
    }

    #[test]
    fn test_group_absorb_skips_duplicates() {
        let a = segment("a", 0.0, 1.0).with_video_path("v1");
        let b = segment("b", 0.0, 1.0).with_video_path("v2");
        let c = segment("c", 0.0, 1.0).with_video_path("v3");

        let mut first: SegmentGroup = vec![a.clone(), b.clone()].into_iter().collect();
        let second: SegmentGroup = vec![b, c].into_iter().collect();
        first.absorb(second);

        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_serde_round_trip_validates() {
        let s = segment("text", 1.0, 2.0).with_order(Some(3)).with_video_path("v.mp4");
        let json = serde_json::to_string(&s).unwrap();
        let back: VideoSegment = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);

        let invalid = r#"{"content":"x","start":4.0,"end":1.0}"#;
        assert!(serde_json::from_str::<VideoSegment>(invalid).is_err());
    }
}
