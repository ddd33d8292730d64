//! Quality arbitration inside redundancy groups.
//!
//! Every member of a group is described by the local descriptors of its
//! novel keyframes. A visual vocabulary is fitted over the whole group and
//! each member is scored by the idf-weighted mass of its visual-word
//! histogram. The best `top_n` members are kept, the rest discarded.

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use ndarray::{concatenate, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use vsumm_media::{
    collect_keyframe_descriptors, DescriptorExtractor, FrameProvider, KMeansConfig,
    KeyframeFilterConfig, MediaError, SampleRequest, VisualVocabulary, WeightedHistogram,
};
use vsumm_models::{DecisionAction, SegmentGroup, VideoSegment};

use super::{CriterionKind, ReadFrom, SelectionCriterion};
use crate::error::{SummaryError, SummaryResult};
use crate::store::DecisionStore;

/// Quality picker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Members kept per group
    pub top_n: usize,
    /// Visual words fitted per group
    pub vocabulary_size: usize,
    pub sample_fps: f64,
    pub grayscale: bool,
    pub kmeans: KMeansConfig,
    pub keyframes: KeyframeFilterConfig,
    /// Members sampled concurrently
    pub max_parallel: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            top_n: 1,
            vocabulary_size: 300,
            sample_fps: 1.0,
            grayscale: true,
            kmeans: KMeansConfig::default(),
            keyframes: KeyframeFilterConfig::default(),
            max_parallel: 4,
        }
    }
}

impl QualityConfig {
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_vocabulary_size(mut self, size: usize) -> Self {
        self.vocabulary_size = size;
        self
    }
}

/// Score of a group member.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSegment {
    pub segment: VideoSegment,
    pub score: f64,
}

/// Keeps the visually richest members of every redundancy group.
pub struct QualityPicker {
    config: QualityConfig,
    source: CriterionKind,
    frames: Arc<dyn FrameProvider>,
    extractor: Arc<dyn DescriptorExtractor>,
}

impl QualityPicker {
    /// Arbitrate the groups picked by `source`.
    pub fn new(
        config: QualityConfig,
        source: CriterionKind,
        frames: Arc<dyn FrameProvider>,
        extractor: Arc<dyn DescriptorExtractor>,
    ) -> Self {
        Self {
            config,
            source,
            frames,
            extractor,
        }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    async fn describe(&self, segment: &VideoSegment) -> SummaryResult<Option<Array2<f32>>> {
        let request = SampleRequest::for_segment(segment)
            .with_fps(self.config.sample_fps)
            .with_grayscale(self.config.grayscale);
        let frames = self.frames.sample(&request).await?;

        Ok(collect_keyframe_descriptors(
            &frames,
            self.extractor.as_ref(),
            &self.config.keyframes,
        ))
    }

    /// Score every member of `group`, in group order.
    pub async fn score_group(&self, group: &SegmentGroup) -> SummaryResult<Vec<ScoredSegment>> {
        let members: Vec<&VideoSegment> = group.iter().collect();
        let features: Vec<Option<Array2<f32>>> = stream::iter(
            members
                .iter()
                .map(|&segment| self.describe(segment))
                .collect::<Vec<_>>(),
        )
        .buffered(self.config.max_parallel.max(1))
        .try_collect()
        .await?;

        let scores = score_features(&features, self.config.vocabulary_size, &self.config.kmeans)?;
        Ok(members
            .into_iter()
            .zip(scores)
            .map(|(segment, score)| ScoredSegment {
                segment: segment.clone(),
                score,
            })
            .collect())
    }
}

/// Bag-of-visual-words score of each feature set.
///
/// Members without descriptors score 0.
pub fn score_features(
    features: &[Option<Array2<f32>>],
    vocabulary_size: usize,
    kmeans: &KMeansConfig,
) -> SummaryResult<Vec<f64>> {
    let views: Vec<ArrayView2<f32>> = features.iter().flatten().map(|f| f.view()).collect();
    let available: usize = views.iter().map(|v| v.nrows()).sum();
    if vocabulary_size == 0 || vocabulary_size > available {
        return Err(SummaryError::VocabularyTooLarge {
            requested: vocabulary_size,
            available,
        });
    }

    let stacked = concatenate(Axis(0), &views)
        .map_err(|e| SummaryError::Media(MediaError::internal(e.to_string())))?;
    let vocabulary =
        VisualVocabulary::fit(stacked.view(), vocabulary_size, kmeans).map_err(|e| match e {
            MediaError::InsufficientFeatures {
                requested,
                available,
            } => SummaryError::VocabularyTooLarge {
                requested,
                available,
            },
            other => SummaryError::Media(other),
        })?;

    let counts: Vec<Vec<u32>> = features
        .iter()
        .map(|feature| match feature {
            Some(descriptors) => vocabulary.term_counts(descriptors.view()),
            None => vec![0; vocabulary.size()],
        })
        .collect();

    Ok(
        WeightedHistogram::from_term_counts(&counts, vocabulary.size())
            .iter()
            .map(WeightedHistogram::total)
            .collect(),
    )
}

/// Indices of the `top_n` highest scores; ties keep input order.
pub fn top_indices(scores: &[f64], top_n: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order.truncate(top_n);
    order
}

#[async_trait]
impl SelectionCriterion for QualityPicker {
    fn kind(&self) -> CriterionKind {
        CriterionKind::Quality
    }

    fn read_from(&self) -> ReadFrom {
        ReadFrom::Logged(self.source, DecisionAction::Pick)
    }

    async fn evaluate(&self, store: &mut DecisionStore) -> SummaryResult<()> {
        let groups = self.input(store)?.into_groups()?;
        info!(
            groups = groups.len(),
            extractor = self.extractor.name(),
            "Arbitrating redundancy groups by visual quality"
        );

        // Score every group before applying any decision
        let mut rankings = Vec::with_capacity(groups.len());
        for group in &groups {
            let scored = self.score_group(group).await?;
            let scores: Vec<f64> = scored.iter().map(|s| s.score).collect();
            let winners = top_indices(&scores, self.config.top_n);
            debug!(
                members = scored.len(),
                best_score = winners.first().map(|&i| scores[i]),
                "Scored redundancy group"
            );
            rankings.push((scored, winners));
        }

        for (scored, winners) in rankings {
            for member in &scored {
                self.discard(store, member.segment.clone());
            }
            for index in winners {
                self.include(store, scored[index].segment.clone());
            }
        }

        Ok(())
    }
}
