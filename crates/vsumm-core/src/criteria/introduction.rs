//! Introduction detection.
//!
//! A video's introduction ends at the first pair of consecutive sampled
//! frames whose intensity histograms stop overlapping. Every video's intro
//! segments are discarded, except the shortest introduction, which goes to
//! the output.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vsumm_media::{histogram_intersection, intensity_histogram, Frame, FrameProvider, SampleRequest};
use vsumm_models::{Video, VideoSegment};

use super::{CriterionKind, ReadFrom, SelectionCriterion};
use crate::error::SummaryResult;
use crate::store::DecisionStore;

/// Introduction detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntroductionConfig {
    /// Frames per second compared
    pub sample_fps: f64,
    pub grayscale: bool,
    /// Histogram intersection below which consecutive frames count as a cut
    pub similarity_threshold: f64,
    /// Seconds skipped at the start of every video
    pub skip_seconds: f64,
    /// Slack, in seconds, when collecting segments up to the boundary
    pub boundary_tolerance_secs: f64,
}

impl Default for IntroductionConfig {
    fn default() -> Self {
        Self {
            sample_fps: 1.0,
            grayscale: true,
            similarity_threshold: 0.7,
            skip_seconds: 1.0,
            boundary_tolerance_secs: 1.0,
        }
    }
}

impl IntroductionConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_sample_fps(mut self, fps: f64) -> Self {
        self.sample_fps = fps;
        self
    }
}

/// End second of the introduction shown by `frames`.
///
/// The first consecutive pair below `threshold` at pair index `i` ends the
/// introduction at `ceil(i / fps)`. Without such a pair the introduction spans
/// every sampled frame. Fewer than two frames give 0.
pub fn introduction_end(frames: &[Frame], fps: f64, threshold: f64) -> f64 {
    if frames.len() < 2 {
        return 0.0;
    }

    let histograms: Vec<Vec<f32>> = frames.iter().map(intensity_histogram).collect();
    for (index, pair) in histograms.windows(2).enumerate() {
        if histogram_intersection(&pair[0], &pair[1]) < threshold {
            return (index as f64 / fps).ceil();
        }
    }

    ((frames.len() - 1) as f64 / fps).ceil()
}

/// Finds the shortest introduction across the source videos.
pub struct IntroductionDetector {
    config: IntroductionConfig,
    frames: Arc<dyn FrameProvider>,
}

impl IntroductionDetector {
    pub fn new(config: IntroductionConfig, frames: Arc<dyn FrameProvider>) -> Self {
        Self { config, frames }
    }

    pub fn config(&self) -> &IntroductionConfig {
        &self.config
    }

    async fn boundary(&self, video: &Video) -> SummaryResult<f64> {
        let request = SampleRequest::new(video.path())
            .with_fps(self.config.sample_fps)
            .with_grayscale(self.config.grayscale)
            .starting_at(self.config.skip_seconds);
        let frames = self.frames.sample(&request).await?;

        if frames.len() < 2 {
            warn!(
                video = %video.name(),
                frames = frames.len(),
                "Not enough frames to detect an introduction"
            );
        }

        Ok(introduction_end(
            &frames,
            self.config.sample_fps,
            self.config.similarity_threshold,
        ))
    }
}

#[async_trait]
impl SelectionCriterion for IntroductionDetector {
    fn kind(&self) -> CriterionKind {
        CriterionKind::Introduction
    }

    fn read_from(&self) -> ReadFrom {
        ReadFrom::Source
    }

    async fn evaluate(&self, store: &mut DecisionStore) -> SummaryResult<()> {
        let videos = self.input(store)?.into_videos()?;
        info!(videos = videos.len(), criterion = self.name(), "Looking for shortest introduction");

        // Sample everything before touching the store
        let mut intros: Vec<(f64, Vec<VideoSegment>)> = Vec::with_capacity(videos.len());
        for video in &videos {
            let end = self.boundary(video).await?;
            let segments: Vec<VideoSegment> = video
                .segments_until(end, self.config.boundary_tolerance_secs)
                .into_iter()
                .cloned()
                .collect();

            debug!(
                video = %video.name(),
                intro_end = end,
                segments = segments.len(),
                "Introduction boundary"
            );
            intros.push((end, segments));
        }

        let mut shortest: Option<(f64, usize)> = None;
        for (index, (end, segments)) in intros.iter().enumerate() {
            if segments.is_empty() {
                continue;
            }
            if shortest.map_or(true, |(min_end, _)| *end < min_end) {
                shortest = Some((*end, index));
            }
        }

        for (_, segments) in &intros {
            for segment in segments {
                self.discard(store, segment.clone());
            }
        }

        if let Some((end, index)) = shortest {
            info!(
                video = %videos[index].name(),
                intro_end = end,
                "Found shortest introduction, moving its segments to output"
            );
            for segment in intros[index].1.clone() {
                self.output(store, segment);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::testing::{frame, segment, video, ScriptedFrames};

    fn frames(values: &[u8]) -> Vec<Frame> {
        values.iter().map(|&v| frame(v)).collect()
    }

    #[test]
    fn test_boundary_at_first_cut() {
        let sampled = frames(&[10, 10, 10, 200, 200]);
        assert_eq!(introduction_end(&sampled, 1.0, 0.7), 2.0);
        assert_eq!(introduction_end(&sampled, 2.0, 0.7), 1.0);
    }

    #[test]
    fn test_boundary_without_cut_spans_all_frames() {
        let sampled = frames(&[10, 10, 10, 10]);
        assert_eq!(introduction_end(&sampled, 1.0, 0.7), 3.0);
    }

    #[test]
    fn test_boundary_with_too_few_frames() {
        assert_eq!(introduction_end(&frames(&[10]), 1.0, 0.7), 0.0);
        assert_eq!(introduction_end(&[], 1.0, 0.7), 0.0);
    }

    fn store_with(videos: Vec<Video>) -> DecisionStore {
        let mut store = DecisionStore::new();
        store.set_source(videos).unwrap();
        store
    }

    #[tokio::test]
    async fn test_shortest_introduction_goes_to_output() {
        let a0 = segment("welcome to a", 0.0, 3.0, "a.mp4");
        let a1 = segment("a body", 3.0, 10.0, "a.mp4");
        let b0 = segment("welcome to b", 0.0, 2.0, "b.mp4");
        let b1 = segment("b title", 2.0, 6.0, "b.mp4");
        let b2 = segment("b body", 6.0, 20.0, "b.mp4");

        let provider = ScriptedFrames::default()
            .with("a.mp4", 1.0, vec![10, 10, 10, 200, 200])
            .with("b.mp4", 1.0, vec![10, 10, 10, 10, 10, 10, 200]);

        let mut store = store_with(vec![
            video("a.mp4", vec![a0.clone(), a1.clone()]),
            video("b.mp4", vec![b0.clone(), b1.clone(), b2.clone()]),
        ]);

        let detector = IntroductionDetector::new(IntroductionConfig::default(), Arc::new(provider));
        detector.evaluate(&mut store).await.unwrap();

        assert_eq!(store.output_segments(), &[a0.clone()]);
        assert!(!store.is_discarded(&a0));
        assert!(store.is_discarded(&b0));
        assert!(store.is_discarded(&b1));
        assert!(!store.is_discarded(&a1));
        assert!(!store.is_discarded(&b2));

        let log = store.log("Introduction").unwrap();
        assert_eq!(log.discard, vec![a0.clone(), b0, b1]);
        assert_eq!(log.output, vec![a0]);
    }

    #[tokio::test]
    async fn test_tie_goes_to_first_video() {
        let a0 = segment("a intro", 0.0, 2.0, "a.mp4");
        let b0 = segment("b intro", 0.0, 2.0, "b.mp4");

        let provider = ScriptedFrames::default()
            .with("a.mp4", 1.0, vec![10, 10, 200])
            .with("b.mp4", 1.0, vec![10, 10, 200]);

        let mut store = store_with(vec![
            video("a.mp4", vec![a0.clone()]),
            video("b.mp4", vec![b0.clone()]),
        ]);

        let detector = IntroductionDetector::new(IntroductionConfig::default(), Arc::new(provider));
        detector.evaluate(&mut store).await.unwrap();

        assert_eq!(store.output_segments(), &[a0]);
        assert!(store.is_discarded(&b0));
    }

    #[tokio::test]
    async fn test_samples_after_skip_offset() {
        let provider = Arc::new(ScriptedFrames::default().with("a.mp4", 1.0, vec![10, 200]));
        let mut store = store_with(vec![video(
            "a.mp4",
            vec![segment("x", 0.0, 30.0, "a.mp4")],
        )]);

        let detector = IntroductionDetector::new(IntroductionConfig::default(), provider.clone());
        detector.evaluate(&mut store).await.unwrap();

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].start_second, 1.0);
        assert!(requests[0].grayscale);
        assert!(store.output_segments().is_empty());
        assert!(store.discard_set().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_store_untouched() {
        let mut store = store_with(vec![
            video("a.mp4", vec![segment("x", 0.0, 2.0, "a.mp4")]),
            video("missing.mp4", vec![segment("y", 0.0, 2.0, "missing.mp4")]),
        ]);
        let provider = ScriptedFrames::default().with("a.mp4", 1.0, vec![10, 200]);

        let detector = IntroductionDetector::new(IntroductionConfig::default(), Arc::new(provider));
        assert!(detector.evaluate(&mut store).await.is_err());
        assert!(store.discard_set().is_empty());
        assert!(store.output_segments().is_empty());
    }
}
