//! Keyframe novelty filtering.
//!
//! Sampled frames of a segment are mostly near-duplicates. A frame's
//! descriptor set is retained only when it differs from every previously
//! retained set, either in keypoint count or in mutual nearest-neighbour
//! matches.

use ndarray::{concatenate, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptor::DescriptorExtractor;
use crate::frame::Frame;

/// Thresholds for the novelty filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyframeFilterConfig {
    /// Minimum descriptor similarity (dot product) for a match
    pub match_threshold: f32,
    /// Keypoint-count difference, relative to the retained frame, that makes a frame novel
    pub min_size_diff_ratio: f32,
    /// A frame is novel when it matches fewer than this share of a retained frame's keypoints
    pub min_match_ratio: f32,
}

impl Default for KeyframeFilterConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.95,
            min_size_diff_ratio: 0.6,
            min_match_ratio: 0.1,
        }
    }
}

/// Count mutual nearest-neighbour matches between two descriptor sets.
///
/// Row `i` of `a` matches row `j` of `b` when `j` is the most similar row of
/// `b` for `i`, `i` is the most similar row of `a` for `j`, and both
/// similarities reach `threshold`.
pub fn mutual_matches(a: ArrayView2<f32>, b: ArrayView2<f32>, threshold: f32) -> usize {
    if a.nrows() == 0 || b.nrows() == 0 || a.ncols() != b.ncols() {
        return 0;
    }

    let similarity = a.dot(&b.t());
    let mut matches = 0;

    for (i, row) in similarity.rows().into_iter().enumerate() {
        let Some((j, &best)) = argmax(row.iter()) else {
            continue;
        };
        if best < threshold {
            continue;
        }

        let column = similarity.column(j);
        if let Some((back, &back_best)) = argmax(column.iter()) {
            if back == i && back_best >= threshold {
                matches += 1;
            }
        }
    }

    matches
}

/// First index of the maximum value.
fn argmax<'a>(values: impl Iterator<Item = &'a f32>) -> Option<(usize, &'a f32)> {
    values
        .enumerate()
        .fold(None, |best, (index, value)| match best {
            Some((_, current)) if value <= current => best,
            _ => Some((index, value)),
        })
}

/// Whether `candidate` differs from every retained descriptor set.
pub fn is_novel(
    candidate: &Array2<f32>,
    retained: &[Array2<f32>],
    config: &KeyframeFilterConfig,
) -> bool {
    retained.iter().all(|kept| {
        let kept_size = kept.nrows() as f32;
        let size_diff = (candidate.nrows() as f32 - kept_size).abs();
        let matches = mutual_matches(candidate.view(), kept.view(), config.match_threshold) as f32;

        size_diff >= kept_size * config.min_size_diff_ratio
            || matches < kept_size * config.min_match_ratio
    })
}

/// Descriptors of a segment's novel interior frames, stacked row-wise.
///
/// The first and last frame are skipped (transition artifacts). Returns
/// `None` when no interior frame yields descriptors.
pub fn collect_keyframe_descriptors(
    frames: &[Frame],
    extractor: &dyn DescriptorExtractor,
    config: &KeyframeFilterConfig,
) -> Option<Array2<f32>> {
    if frames.len() < 3 {
        return None;
    }

    let mut retained: Vec<Array2<f32>> = Vec::new();
    for frame in &frames[1..frames.len() - 1] {
        let Some(descriptors) = extractor.describe(frame) else {
            continue;
        };
        if is_novel(&descriptors, &retained, config) {
            retained.push(descriptors);
        }
    }

    debug!(
        frames = frames.len(),
        keyframes = retained.len(),
        extractor = extractor.name(),
        "Collected keyframe descriptors"
    );

    if retained.is_empty() {
        return None;
    }
    let views: Vec<ArrayView2<f32>> = retained.iter().map(|d| d.view()).collect();
    concatenate(Axis(0), &views).ok()
}
