//! Cross-video redundancy clustering.
//!
//! Segments of different videos whose transcripts are similar enough are
//! grouped, and each group is queued for arbitration.

use async_trait::async_trait;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};
use vsumm_models::{SegmentGroup, Video, VideoSegment};

use super::{CriterionKind, ReadFrom, SelectionCriterion};
use crate::error::{SummaryError, SummaryResult};
use crate::store::DecisionStore;
use crate::text::TfIdf;

/// Redundancy clusterer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedundancyConfig {
    /// Corpus duration, in seconds, at which the threshold equals `base_threshold`
    pub reference_seconds: f64,
    pub base_threshold: f64,
}

impl Default for RedundancyConfig {
    fn default() -> Self {
        Self {
            reference_seconds: 785.0,
            base_threshold: 0.17,
        }
    }
}

impl RedundancyConfig {
    /// The reference duration divides the threshold formula.
    pub fn validate(&self) -> SummaryResult<()> {
        if !self.reference_seconds.is_finite() || self.reference_seconds <= 0.0 {
            return Err(SummaryError::config_error(format!(
                "redundancy.reference_seconds must be positive, got {}",
                self.reference_seconds
            )));
        }
        if !self.base_threshold.is_finite() {
            return Err(SummaryError::config_error(format!(
                "redundancy.base_threshold must be finite, got {}",
                self.base_threshold
            )));
        }
        Ok(())
    }
}

/// Similarity threshold scaled by total corpus duration.
///
/// `base + base * (total - reference) / reference`, where `total` sums the
/// end of every video's last segment. Videos without segments add nothing.
pub fn adaptive_threshold(videos: &[Video], config: &RedundancyConfig) -> f64 {
    let total: f64 = videos.iter().filter_map(Video::last_end).sum();
    let diff = (total - config.reference_seconds) / config.reference_seconds;
    config.base_threshold + config.base_threshold * diff
}

/// A candidate redundancy between two segments (row indices).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub first: usize,
    pub second: usize,
    pub similarity: f64,
}

/// Best match per pair of videos.
///
/// Only pairs `i < j` from different videos with similarity strictly above
/// `threshold` are considered, visited column by column (`j`, then `i`). For
/// each (video of `i`, video of `j`) pair the highest similarity wins; on a
/// tie the first visited match wins. Surviving matches keep visiting order.
pub fn select_matches(
    similarity: &Array2<f64>,
    owners: &[usize],
    threshold: f64,
) -> Vec<Match> {
    let n = owners.len().min(similarity.nrows()).min(similarity.ncols());

    let mut candidates = Vec::new();
    for j in 0..n {
        for i in 0..j {
            let value = similarity[[i, j]];
            if owners[i] != owners[j] && value > threshold {
                candidates.push(Match {
                    first: i,
                    second: j,
                    similarity: value,
                });
            }
        }
    }

    let mut best: HashMap<(usize, usize), usize> = HashMap::new();
    for (index, candidate) in candidates.iter().enumerate() {
        let key = (owners[candidate.first], owners[candidate.second]);
        match best.get(&key) {
            Some(&current) if candidates[current].similarity >= candidate.similarity => {}
            _ => {
                best.insert(key, index);
            }
        }
    }

    let mut winners: Vec<usize> = best.into_values().collect();
    winners.sort_unstable();
    winners.into_iter().map(|index| candidates[index]).collect()
}

/// Connected components over an ordered stream of segment pairs.
///
/// Groups keep creation order. When an edge joins two existing groups the
/// later group is merged into the earlier one.
pub fn cluster_matches(
    edges: impl IntoIterator<Item = (VideoSegment, VideoSegment)>,
) -> Vec<SegmentGroup> {
    let mut groups: Vec<SegmentGroup> = Vec::new();
    let mut locations: HashMap<VideoSegment, usize> = HashMap::new();

    for (a, b) in edges {
        match (locations.get(&a).copied(), locations.get(&b).copied()) {
            (Some(ga), Some(gb)) if ga == gb => {}
            (Some(ga), Some(gb)) => {
                let (keep, merged) = (ga.min(gb), ga.max(gb));
                let moved = std::mem::take(&mut groups[merged]);
                for segment in moved.iter() {
                    locations.insert(segment.clone(), keep);
                }
                groups[keep].absorb(moved);
            }
            (Some(ga), None) => {
                groups[ga].insert(b.clone());
                locations.insert(b, ga);
            }
            (None, Some(gb)) => {
                groups[gb].insert(a.clone());
                locations.insert(a, gb);
            }
            (None, None) => {
                let index = groups.len();
                groups.push(vec![a.clone(), b.clone()].into_iter().collect());
                locations.insert(a, index);
                locations.insert(b, index);
            }
        }
    }

    groups.into_iter().filter(|group| !group.is_empty()).collect()
}

/// Groups redundant segments across videos by transcript similarity.
#[derive(Debug, Clone, Default)]
pub struct RedundancyClusterer {
    config: RedundancyConfig,
}

impl RedundancyClusterer {
    pub fn new(config: RedundancyConfig) -> SummaryResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RedundancyConfig {
        &self.config
    }
}

#[async_trait]
impl SelectionCriterion for RedundancyClusterer {
    fn kind(&self) -> CriterionKind {
        CriterionKind::Redundancy
    }

    fn read_from(&self) -> ReadFrom {
        ReadFrom::Source
    }

    async fn evaluate(&self, store: &mut DecisionStore) -> SummaryResult<()> {
        let videos = self.input(store)?.into_videos()?;

        let mut segments: Vec<&VideoSegment> = Vec::new();
        let mut owners: Vec<usize> = Vec::new();
        for (index, video) in videos.iter().enumerate() {
            for segment in video.segments() {
                segments.push(segment);
                owners.push(index);
            }
        }
        info!(
            videos = videos.len(),
            segments = segments.len(),
            "Finding redundant segments"
        );

        let contents: Vec<&str> = segments.iter().map(|segment| segment.content()).collect();
        let similarity = TfIdf::fit(contents.as_slice()).similarity();
        let threshold = adaptive_threshold(&videos, &self.config);
        let matches = select_matches(&similarity, &owners, threshold);

        debug!(
            threshold = threshold,
            matches = matches.len(),
            "Selected best match per video pair"
        );

        let edges = matches
            .iter()
            .map(|m| (segments[m.first], segments[m.second]))
            .filter(|(a, b)| {
                !(store.is_discarded(a)
                    || store.is_output(a)
                    || store.is_discarded(b)
                    || store.is_output(b))
            })
            .map(|(a, b)| (a.clone(), b.clone()))
            .collect::<Vec<_>>();

        let groups = cluster_matches(edges);
        for group in groups {
            info!(segments = group.len(), "Queueing redundancy group for arbitration");
            self.pick(store, group);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::testing::{segment, video};
    use ndarray::array;

    #[test]
    fn test_adaptive_threshold() {
        let config = RedundancyConfig::default();
        let videos = vec![
            video("a.mp4", vec![segment("x", 0.0, 500.0, "a.mp4")]),
            video("b.mp4", vec![segment("y", 0.0, 285.0, "b.mp4")]),
        ];
        assert!((adaptive_threshold(&videos, &config) - 0.17).abs() < 1e-12);

        let doubled = vec![
            video("a.mp4", vec![segment("x", 0.0, 1570.0, "a.mp4")]),
            video("empty.mp4", vec![]),
        ];
        assert!((adaptive_threshold(&doubled, &config) - 0.34).abs() < 1e-12);
    }

    #[test]
    fn test_new_rejects_unusable_reference_duration() {
        for reference_seconds in [0.0, -10.0, f64::NAN] {
            let config = RedundancyConfig {
                reference_seconds,
                ..Default::default()
            };
            assert!(matches!(
                RedundancyClusterer::new(config),
                Err(SummaryError::Config(_))
            ));
        }
        assert!(RedundancyClusterer::new(RedundancyConfig::default()).is_ok());
    }

    #[test]
    fn test_select_matches_masks_same_video_and_lower_triangle() {
        // rows 0,1 from video 0; row 2 from video 1
        let sim = array![[1.0, 0.9, 0.5], [0.9, 1.0, 0.6], [0.5, 0.6, 1.0]];
        let matches = select_matches(&sim, &[0, 0, 1], 0.17);

        assert_eq!(matches.len(), 1);
        assert_eq!((matches[0].first, matches[0].second), (1, 2));
    }

    #[test]
    fn test_select_matches_threshold_is_strict() {
        let sim = array![[1.0, 0.3], [0.3, 1.0]];
        assert!(select_matches(&sim, &[0, 1], 0.3).is_empty());
        assert_eq!(select_matches(&sim, &[0, 1], 0.29).len(), 1);
    }

    #[test]
    fn test_select_matches_tie_keeps_first_visited() {
        // video 0: rows 0,1; video 1: row 2. (0,2) and (1,2) tie.
        let sim = array![[1.0, 0.0, 0.8], [0.0, 1.0, 0.8], [0.8, 0.8, 1.0]];
        let matches = select_matches(&sim, &[0, 0, 1], 0.17);
        assert_eq!(matches.len(), 1);
        assert_eq!((matches[0].first, matches[0].second), (0, 2));
    }

    #[test]
    fn test_three_way_redundancy_forms_one_group() {
        // A, B, C from three videos
        let sim = array![[1.0, 0.9, 0.85], [0.9, 1.0, 0.1], [0.85, 0.1, 1.0]];
        let matches = select_matches(&sim, &[0, 1, 2], 0.17);
        let pairs: Vec<(usize, usize)> = matches.iter().map(|m| (m.first, m.second)).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 2)]);

        let a = segment("A", 0.0, 1.0, "a.mp4");
        let b = segment("B", 0.0, 1.0, "b.mp4");
        let c = segment("C", 0.0, 1.0, "c.mp4");
        let by_index = [a.clone(), b.clone(), c.clone()];
        let groups = cluster_matches(
            matches
                .iter()
                .map(|m| (by_index[m.first].clone(), by_index[m.second].clone())),
        );

        let expected: SegmentGroup = vec![a, b, c].into_iter().collect();
        assert_eq!(groups, vec![expected]);
    }

    #[test]
    fn test_cluster_merges_bridged_groups() {
        let a = segment("A", 0.0, 1.0, "a.mp4");
        let b = segment("B", 0.0, 1.0, "b.mp4");
        let c = segment("C", 0.0, 1.0, "c.mp4");
        let d = segment("D", 0.0, 1.0, "d.mp4");

        let groups = cluster_matches(vec![
            (a.clone(), b.clone()),
            (c.clone(), d.clone()),
            (b.clone(), d.clone()),
        ]);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 4);
    }

    #[test]
    fn test_cluster_keeps_separate_components() {
        let a = segment("A", 0.0, 1.0, "a.mp4");
        let b = segment("B", 0.0, 1.0, "b.mp4");
        let c = segment("C", 5.0, 6.0, "a.mp4");
        let d = segment("D", 5.0, 6.0, "b.mp4");

        let groups = cluster_matches(vec![(a.clone(), b.clone()), (c.clone(), d.clone())]);
        assert_eq!(groups.len(), 2);
        assert!(groups[0].contains(&a) && groups[0].contains(&b));
        assert!(groups[1].contains(&c) && groups[1].contains(&d));
    }

    #[tokio::test]
    async fn test_evaluate_picks_cross_video_groups() {
        let a0 = segment("the battery lasts two full days", 0.0, 10.0, "a.mp4");
        let a1 = segment("pricing starts at nine hundred dollars", 10.0, 20.0, "a.mp4");
        let b0 = segment("our unboxing of the retail package", 0.0, 10.0, "b.mp4");
        let b1 = segment("battery lasts two full days easily", 10.0, 20.0, "b.mp4");

        let mut store = DecisionStore::new();
        store
            .set_source(vec![
                video("a.mp4", vec![a0.clone(), a1]),
                video("b.mp4", vec![b0, b1.clone()]),
            ])
            .unwrap();

        RedundancyClusterer::default().evaluate(&mut store).await.unwrap();

        let expected: SegmentGroup = vec![a0, b1].into_iter().collect();
        assert_eq!(store.pick_groups(), &[expected.clone()]);
        assert_eq!(store.log("ContentBasedRedundancy").unwrap().pick, vec![expected]);
    }

    #[tokio::test]
    async fn test_evaluate_skips_decided_segments() {
        let a0 = segment("the battery lasts two full days", 0.0, 10.0, "a.mp4");
        let b0 = segment("battery lasts two full days easily", 0.0, 10.0, "b.mp4");

        let mut store = DecisionStore::new();
        store
            .set_source(vec![
                video("a.mp4", vec![a0.clone()]),
                video("b.mp4", vec![b0]),
            ])
            .unwrap();
        store.discard("Introduction", a0);

        RedundancyClusterer::default().evaluate(&mut store).await.unwrap();
        assert!(store.pick_groups().is_empty());
    }
}
