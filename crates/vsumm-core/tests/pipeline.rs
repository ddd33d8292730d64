//! End-to-end runs of the default pipeline against deterministic capabilities.

use async_trait::async_trait;
use image::{DynamicImage, GrayImage, Luma};
use ndarray::Array2;
use std::collections::HashMap;
use std::sync::Arc;

use vsumm_core::{
    DecisionStore, RunLogger, Summarizer, SummarizerConfig, SummaryError, SummaryOptions,
};
use vsumm_media::{
    DescriptorExtractor, Frame, FrameProvider, MediaError, MediaResult, ObjectDetector,
    SampleRequest, SubjectivityClassifier,
};
use vsumm_models::{Video, VideoSegment};

fn frame(value: u8) -> Frame {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([value])))
}

fn frame_value(frame: &Frame) -> u8 {
    frame.to_luma8().get_pixel(0, 0).0[0]
}

/// Frames keyed by (video path, window start).
#[derive(Default)]
struct FrameTable(HashMap<(String, u64), Vec<u8>>);

impl FrameTable {
    fn with(mut self, path: &str, start: f64, values: &[u8]) -> Self {
        self.0
            .insert((path.to_string(), start.to_bits()), values.to_vec());
        self
    }
}

#[async_trait]
impl FrameProvider for FrameTable {
    async fn sample(&self, request: &SampleRequest) -> MediaResult<Vec<Frame>> {
        let key = (
            request.path.to_string_lossy().to_string(),
            request.start_second.to_bits(),
        );
        self.0
            .get(&key)
            .map(|values| values.iter().map(|&v| frame(v)).collect())
            .ok_or_else(|| MediaError::FileNotFound(request.path.clone()))
    }

    fn name(&self) -> &'static str {
        "frame_table"
    }
}

/// Frames of value 9 show a face.
struct FaceOnNine;

#[async_trait]
impl ObjectDetector for FaceOnNine {
    async fn detect(&self, frame: &Frame) -> MediaResult<bool> {
        Ok(frame_value(frame) == 9)
    }

    fn name(&self) -> &'static str {
        "face_on_nine"
    }
}

struct LoveIsSubjective;

#[async_trait]
impl SubjectivityClassifier for LoveIsSubjective {
    async fn classify(&self, content: &str) -> MediaResult<bool> {
        Ok(content.contains("love"))
    }

    fn name(&self) -> &'static str {
        "love_is_subjective"
    }
}

/// Frame value `v` yields `v % 16` distinct one-hot descriptors.
struct OneHotExtractor;

impl DescriptorExtractor for OneHotExtractor {
    fn describe(&self, frame: &Frame) -> Option<Array2<f32>> {
        let count = (frame_value(frame) % 16) as usize;
        if count == 0 {
            return None;
        }
        let mut descriptors = Array2::<f32>::zeros((count, 16));
        for row in 0..count {
            descriptors[[row, row]] = 1.0;
        }
        Some(descriptors)
    }

    fn name(&self) -> &'static str {
        "one_hot"
    }
}

fn segment(content: &str, start: f64, end: f64, path: &str, topic: &str) -> VideoSegment {
    VideoSegment::new(content, start, end)
        .unwrap()
        .with_video_path(path)
        .with_video_topic(topic)
}

struct Fixture {
    videos: Vec<Video>,
    frames: FrameTable,
    a: Vec<VideoSegment>,
    b: Vec<VideoSegment>,
}

fn fixture() -> Fixture {
    let a = vec![
        segment("welcome to my channel", 0.0, 2.0, "a.mp4", "intro"),
        segment("the battery lasts two full days on one charge", 2.0, 10.0, "a.mp4", "battery"),
        segment("I love how this looks", 10.0, 15.0, "a.mp4", "design"),
        segment("night photos come out sharp", 15.0, 25.0, "a.mp4", "camera"),
    ];
    let b = vec![
        segment("hi and welcome back", 0.0, 3.0, "b.mp4", "intro"),
        segment("battery lasts two full days on one charge easily", 3.0, 12.0, "b.mp4", "battery"),
        segment("the screen is bright outdoors", 12.0, 20.0, "b.mp4", "display"),
    ];

    let frames = FrameTable::default()
        // Whole-video samples after the 1s skip: a cuts after one pair, b after two
        .with("a.mp4", 1.0, &[10, 10, 200, 200])
        .with("b.mp4", 1.0, &[10, 10, 10, 200])
        // Segment windows
        .with("a.mp4", 2.0, &[0, 6, 0])
        .with("a.mp4", 10.0, &[9, 9, 9])
        .with("a.mp4", 15.0, &[0, 3, 0])
        .with("b.mp4", 3.0, &[0, 1, 0])
        .with("b.mp4", 12.0, &[0, 2, 0]);

    Fixture {
        videos: vec![
            Video::new("a", "a.mp4", vec![], a.clone()),
            Video::new("b", "b.mp4", vec![], b.clone()),
        ],
        frames,
        a,
        b,
    }
}

fn pipeline(config: &SummarizerConfig, frames: FrameTable) -> Summarizer {
    Summarizer::default_pipeline(
        config,
        Arc::new(frames),
        Arc::new(FaceOnNine),
        Arc::new(LoveIsSubjective),
        Arc::new(OneHotExtractor),
    )
    .unwrap()
}

fn small_vocabulary() -> SummarizerConfig {
    let mut config = SummarizerConfig::default();
    config.quality.vocabulary_size = 4;
    config
}

fn assert_disjoint(store: &DecisionStore) {
    for segment in store.output_segments() {
        assert!(!store.is_included(segment), "{} is output and included", segment);
        assert!(!store.is_discarded(segment), "{} is output and discarded", segment);
    }
    for segment in store.include_set() {
        assert!(!store.is_discarded(segment), "{} is included and discarded", segment);
    }
}

#[test]
fn test_default_pipeline_order() {
    let Fixture { frames, .. } = fixture();
    let summarizer = pipeline(&SummarizerConfig::default(), frames);

    assert_eq!(
        summarizer.criteria_names(),
        vec![
            "Introduction",
            "ObjectContentSubjectivity",
            "ContentBasedRedundancy",
            "QualityPick",
            "ClusterBasedChronology",
        ]
    );
}

#[tokio::test]
async fn test_full_pipeline() {
    let Fixture { videos, frames, a, b } = fixture();
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("store.json");

    let summarizer = pipeline(&small_vocabulary(), frames);
    let options = SummaryOptions::new("phone review")
        .with_video_output_path("review.mp4")
        .with_store_path(&store_path);
    let summary = summarizer.summarize(videos, &options).await.unwrap();
    let store = &summary.store;

    // Shortest introduction first, then the better of the two battery segments
    assert_eq!(store.output_segments(), &[a[0].clone(), a[1].clone()]);
    assert_eq!(summary.video.segments(), store.output_segments());
    assert_eq!(summary.video.name(), "phone review");
    assert_eq!(summary.video.path(), "review.mp4");
    assert_eq!(
        summary.video.topics(),
        &["intro".to_string(), "battery".to_string()]
    );

    assert!(store.is_discarded(&b[0]));
    assert!(store.is_discarded(&a[2]));
    assert!(store.is_discarded(&b[1]));
    assert!(store.include_set().is_empty());
    assert_disjoint(store);

    let groups = store.pick_groups();
    assert_eq!(groups.len(), 1);
    assert!(groups[0].contains(&a[1]));
    assert!(groups[0].contains(&b[1]));

    for name in [
        "Introduction",
        "ObjectContentSubjectivity",
        "ContentBasedRedundancy",
        "QualityPick",
        "ClusterBasedChronology",
    ] {
        assert!(store.is_logged(name), "{} did not log", name);
    }
    assert_eq!(store.log("QualityPick").unwrap().include, vec![a[1].clone()]);
    assert_eq!(
        store.log("ClusterBasedChronology").unwrap().output,
        vec![a[1].clone()]
    );

    let restored = DecisionStore::load(&store_path).await.unwrap();
    assert_eq!(&restored, store);
}

#[tokio::test]
async fn test_vocabulary_larger_than_group_features() {
    let Fixture { videos, frames, .. } = fixture();

    // Default vocabulary of 300 words; the battery group only has 7 descriptors
    let summarizer = pipeline(&SummarizerConfig::default(), frames);
    let result = summarizer
        .summarize(videos, &SummaryOptions::new("phone review"))
        .await;

    assert!(matches!(
        result,
        Err(SummaryError::VocabularyTooLarge {
            requested: 300,
            available: 7
        })
    ));
}

#[tokio::test]
async fn test_missing_frames_abort_the_run() {
    let Fixture { videos, .. } = fixture();
    let frames = FrameTable::default().with("a.mp4", 1.0, &[10, 200]);

    let summarizer = pipeline(&small_vocabulary(), frames);
    let result = summarizer
        .summarize(videos, &SummaryOptions::new("phone review"))
        .await;

    assert!(matches!(result, Err(SummaryError::Media(MediaError::FileNotFound(_)))));
}

#[tokio::test]
async fn test_failed_criterion_is_not_logged() {
    let Fixture { videos, frames, .. } = fixture();
    let mut store = DecisionStore::new();
    store.set_source(videos).unwrap();

    let summarizer = pipeline(&SummarizerConfig::default(), frames);
    let result = summarizer
        .run(&mut store, &RunLogger::new("phone review"))
        .await;

    assert!(matches!(result, Err(SummaryError::VocabularyTooLarge { .. })));
    assert!(store.is_logged("ContentBasedRedundancy"));
    assert!(!store.is_logged("QualityPick"));
    assert!(!store.is_logged("ClusterBasedChronology"));
    assert_eq!(store.pick_groups().len(), 1);
}
