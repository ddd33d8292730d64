//! Cluster-aware chronological ordering.
//!
//! Included segments are insertion-sorted with a comparator relative to
//! their redundancy group: a placed segment is compared against the member
//! of the new segment's group that comes from the placed segment's video,
//! so segments of unrelated videos are ordered through shared groups.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vsumm_models::{DecisionAction, SegmentGroup, VideoSegment};

use super::{CriterionKind, ReadFrom, SelectionCriterion};
use crate::error::{SummaryError, SummaryResult};
use crate::store::DecisionStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChronologyConfig {
    /// Emit to the output instead of the include set
    pub write_output: bool,
}

impl Default for ChronologyConfig {
    fn default() -> Self {
        Self { write_output: true }
    }
}

/// Position at which `segment` enters `placed`.
///
/// Scans `placed` and stops at the first segment the new one is not later
/// than. When `group` holds a member from the placed segment's video, that
/// member's start is compared; otherwise the new segment's own start is.
pub fn find_insert_position(
    segment: &VideoSegment,
    group: Option<&SegmentGroup>,
    placed: &[VideoSegment],
) -> usize {
    placed
        .iter()
        .position(|existing| {
            let counterpart =
                group.and_then(|group| group.find_by_video_path(existing.video_path()));
            let start = counterpart.unwrap_or(segment).start();
            start <= existing.start()
        })
        .unwrap_or(placed.len())
}

/// Order `segments` using the groups they belong to.
///
/// Segments are visited group by group in `groups` order, then the ones
/// outside every group in their given order.
pub fn order_segments(segments: &[VideoSegment], groups: &[SegmentGroup]) -> Vec<VideoSegment> {
    let mut visits: Vec<(&VideoSegment, Option<&SegmentGroup>)> =
        Vec::with_capacity(segments.len());
    for group in groups {
        let members: Vec<&VideoSegment> = segments
            .iter()
            .filter(|segment| group.contains(segment))
            .filter(|segment| !visits.iter().any(|(seen, _)| seen == segment))
            .collect();
        visits.extend(members.into_iter().map(|segment| (segment, Some(group))));
    }
    let ungrouped: Vec<&VideoSegment> = segments
        .iter()
        .filter(|segment| !visits.iter().any(|(seen, _)| seen == segment))
        .collect();
    visits.extend(ungrouped.into_iter().map(|segment| (segment, None)));

    let mut placed: Vec<VideoSegment> = Vec::with_capacity(visits.len());
    for (segment, group) in visits {
        let position = find_insert_position(segment, group, &placed);
        placed.insert(position, segment.clone());
    }
    placed
}

/// Re-orders included segments into one narrative.
pub struct ChronologyOrderer {
    config: ChronologyConfig,
    clusters: CriterionKind,
}

impl ChronologyOrderer {
    /// Order using the groups picked by `clusters`.
    pub fn new(config: ChronologyConfig, clusters: CriterionKind) -> Self {
        Self { config, clusters }
    }

    pub fn config(&self) -> &ChronologyConfig {
        &self.config
    }
}

#[async_trait]
impl SelectionCriterion for ChronologyOrderer {
    fn kind(&self) -> CriterionKind {
        CriterionKind::Chronology
    }

    fn read_from(&self) -> ReadFrom {
        ReadFrom::Store(DecisionAction::Include)
    }

    fn dependencies(&self) -> Vec<CriterionKind> {
        vec![self.clusters]
    }

    async fn evaluate(&self, store: &mut DecisionStore) -> SummaryResult<()> {
        let segments = self.input(store)?.into_segments()?;
        let groups = store
            .log(self.clusters.name())
            .map(|log| log.pick.clone())
            .ok_or_else(|| SummaryError::DependencyNotLogged {
                criterion: self.name().to_string(),
                dependency: self.clusters.name().to_string(),
            })?;

        info!(
            segments = segments.len(),
            groups = groups.len(),
            "Ordering included segments"
        );

        let ordered = order_segments(&segments, &groups);
        debug!(
            first = ordered.first().map(|s| s.start()),
            "Chronology resolved"
        );

        for segment in ordered {
            if self.config.write_output {
                self.output(store, segment);
            } else {
                self.include(store, segment);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::testing::{segment, video};

    #[test]
    fn test_ungrouped_segments_fall_back_to_own_start() {
        let s1 = segment("s1", 10.0, 12.0, "a.mp4");
        let s2 = segment("s2", 5.0, 7.0, "b.mp4");

        let ordered = order_segments(&[s1.clone(), s2.clone()], &[]);
        assert_eq!(ordered, vec![s2, s1]);
    }

    #[test]
    fn test_group_counterpart_sets_position() {
        // `late` sits at 50s in b.mp4 but its group places it at 2s on a.mp4's timeline
        let placed = vec![segment("a mid", 20.0, 25.0, "a.mp4")];
        let late = segment("late", 50.0, 55.0, "b.mp4");
        let group: SegmentGroup = vec![segment("a early", 2.0, 4.0, "a.mp4"), late.clone()]
            .into_iter()
            .collect();

        assert_eq!(find_insert_position(&late, Some(&group), &placed), 0);
        assert_eq!(find_insert_position(&late, None, &placed), 1);
    }

    #[test]
    fn test_groups_visited_in_pick_order() {
        let a_first = segment("a first", 0.0, 5.0, "a.mp4");
        let a_second = segment("a second", 30.0, 35.0, "a.mp4");
        let b_winner = segment("b winner", 3.0, 8.0, "b.mp4");
        let first: SegmentGroup = vec![a_first.clone(), segment("b dup", 60.0, 65.0, "b.mp4")]
            .into_iter()
            .collect();
        let second: SegmentGroup = vec![segment("a dup", 40.0, 45.0, "a.mp4"), b_winner.clone()]
            .into_iter()
            .collect();

        let ordered = order_segments(
            &[a_first.clone(), a_second.clone(), b_winner.clone()],
            &[first, second],
        );

        // b winner lands after a first through its a.mp4 counterpart at 40s,
        // then a second is only compared by its own start
        assert_eq!(ordered, vec![a_first, b_winner, a_second]);
    }

    #[tokio::test]
    async fn test_writes_output_in_order() {
        let s1 = segment("s1", 10.0, 12.0, "a.mp4");
        let s2 = segment("s2", 5.0, 7.0, "b.mp4");

        let mut store = DecisionStore::new();
        store
            .set_source(vec![
                video("a.mp4", vec![s1.clone()]),
                video("b.mp4", vec![s2.clone()]),
            ])
            .unwrap();
        store.mark_logged("ContentBasedRedundancy");
        store.include("QualityPick", s1.clone());
        store.include("QualityPick", s2.clone());

        let orderer =
            ChronologyOrderer::new(ChronologyConfig::default(), CriterionKind::Redundancy);
        orderer.evaluate(&mut store).await.unwrap();

        assert_eq!(store.output_segments(), &[s2.clone(), s1.clone()]);
        assert_eq!(store.log("ClusterBasedChronology").unwrap().output, vec![s2, s1]);
    }

    #[tokio::test]
    async fn test_requires_cluster_log() {
        let mut store = DecisionStore::new();
        let orderer =
            ChronologyOrderer::new(ChronologyConfig::default(), CriterionKind::Redundancy);

        assert_eq!(orderer.dependencies(), vec![CriterionKind::Redundancy]);
        assert!(matches!(
            orderer.evaluate(&mut store).await,
            Err(SummaryError::DependencyNotLogged { .. })
        ));
    }
}
