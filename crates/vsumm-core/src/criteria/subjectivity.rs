//! Object-content subjectivity filter.
//!
//! A segment showing the object of interest (typically a face) while its
//! transcript is subjective gets the configured action.

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use vsumm_media::{FrameProvider, ObjectDetector, SampleRequest, SubjectivityClassifier};
use vsumm_models::VideoSegment;

use super::{CriterionKind, ReadFrom, SelectionCriterion};
use crate::error::SummaryResult;
use crate::store::DecisionStore;

/// What happens to subjective segments showing the object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectivityAction {
    #[default]
    Discard,
    Include,
}

/// Subjectivity filter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectivityConfig {
    /// Frames per second searched for the object
    pub sample_fps: f64,
    pub grayscale: bool,
    pub action: SubjectivityAction,
    /// Segments sampled concurrently
    pub max_parallel: usize,
}

impl Default for SubjectivityConfig {
    fn default() -> Self {
        Self {
            sample_fps: 1.0,
            grayscale: true,
            action: SubjectivityAction::Discard,
            max_parallel: 4,
        }
    }
}

impl SubjectivityConfig {
    pub fn with_action(mut self, action: SubjectivityAction) -> Self {
        self.action = action;
        self
    }
}

pub struct SubjectivityFilter {
    config: SubjectivityConfig,
    frames: Arc<dyn FrameProvider>,
    detector: Arc<dyn ObjectDetector>,
    classifier: Arc<dyn SubjectivityClassifier>,
}

impl SubjectivityFilter {
    pub fn new(
        config: SubjectivityConfig,
        frames: Arc<dyn FrameProvider>,
        detector: Arc<dyn ObjectDetector>,
        classifier: Arc<dyn SubjectivityClassifier>,
    ) -> Self {
        Self {
            config,
            frames,
            detector,
            classifier,
        }
    }

    pub fn config(&self) -> &SubjectivityConfig {
        &self.config
    }

    /// Whether any sampled frame of the segment shows the object.
    async fn contains_object(&self, segment: &VideoSegment) -> SummaryResult<bool> {
        let request = SampleRequest::for_segment(segment)
            .with_fps(self.config.sample_fps)
            .with_grayscale(self.config.grayscale);
        let frames = self.frames.sample(&request).await?;

        for frame in &frames {
            if self.detector.detect(frame).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl SelectionCriterion for SubjectivityFilter {
    fn kind(&self) -> CriterionKind {
        CriterionKind::Subjectivity
    }

    fn read_from(&self) -> ReadFrom {
        ReadFrom::Source
    }

    async fn evaluate(&self, store: &mut DecisionStore) -> SummaryResult<()> {
        let videos = self.input(store)?.into_videos()?;
        info!(
            videos = videos.len(),
            detector = self.detector.name(),
            classifier = self.classifier.name(),
            "Filtering subjective segments"
        );

        let mut candidates = Vec::new();
        for video in &videos {
            let segments = self.remove_discarded(store, video.segments().to_vec());
            candidates.extend(self.remove_outputted(store, segments));
        }

        let presence: Vec<bool> = stream::iter(
            candidates
                .iter()
                .map(|segment| self.contains_object(segment))
                .collect::<Vec<_>>(),
        )
        .buffered(self.config.max_parallel.max(1))
        .try_collect()
        .await?;

        let with_object: Vec<&VideoSegment> = candidates
            .iter()
            .zip(&presence)
            .filter(|(_, present)| **present)
            .map(|(segment, _)| segment)
            .collect();

        let contents: Vec<String> = with_object
            .iter()
            .map(|segment| segment.content().to_string())
            .collect();
        let subjective = if contents.is_empty() {
            Vec::new()
        } else {
            self.classifier.classify_batch(&contents).await?
        };

        debug!(
            candidates = candidates.len(),
            with_object = with_object.len(),
            "Object search finished"
        );

        let mut matched = 0;
        for (segment, is_subjective) in with_object.into_iter().zip(subjective) {
            if !is_subjective {
                continue;
            }
            matched += 1;
            match self.config.action {
                SubjectivityAction::Discard => self.discard(store, segment.clone()),
                SubjectivityAction::Include => self.include(store, segment.clone()),
            }
        }

        info!(matched = matched, action = ?self.config.action, "Subjectivity filter applied");
        Ok(())
    }
}
