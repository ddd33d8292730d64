//! Decision store shared by every selection criterion.
//!
//! Holds the source videos, the finalized output sequence, the tentative
//! include/discard sets, the groups pending arbitration and a per-criterion
//! audit log. A segment in `output` is never in `include` or `discard`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, error, info};
use vsumm_models::{CriterionLog, DecisionAction, SegmentGroup, Video, VideoSegment};

use crate::error::{SummaryError, SummaryResult};
use crate::metrics;

/// Shared decision state threaded through the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionStore {
    source: Option<Vec<Video>>,
    output: Vec<VideoSegment>,
    include: HashSet<VideoSegment>,
    discard: HashSet<VideoSegment>,
    pick: Vec<SegmentGroup>,
    agent_logs: BTreeMap<String, CriterionLog>,
}

impl DecisionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source videos. Fails if they were already set.
    pub fn set_source(&mut self, videos: Vec<Video>) -> SummaryResult<()> {
        if self.source.is_some() {
            error!("Source videos cannot change once they are set");
            return Err(SummaryError::SourceAlreadySet);
        }

        info!(videos = videos.len(), "Source videos set");
        self.source = Some(videos);
        Ok(())
    }

    /// Source videos (empty until set).
    pub fn source(&self) -> &[Video] {
        self.source.as_deref().unwrap_or(&[])
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Final output, in emission order.
    pub fn output_segments(&self) -> &[VideoSegment] {
        &self.output
    }

    pub fn include_set(&self) -> &HashSet<VideoSegment> {
        &self.include
    }

    pub fn discard_set(&self) -> &HashSet<VideoSegment> {
        &self.discard
    }

    pub fn pick_groups(&self) -> &[SegmentGroup] {
        &self.pick
    }

    pub fn agent_logs(&self) -> &BTreeMap<String, CriterionLog> {
        &self.agent_logs
    }

    /// Audit log of a criterion, if it ran.
    pub fn log(&self, criterion: &str) -> Option<&CriterionLog> {
        self.agent_logs.get(criterion)
    }

    pub fn is_logged(&self, criterion: &str) -> bool {
        self.agent_logs.contains_key(criterion)
    }

    pub fn is_included(&self, segment: &VideoSegment) -> bool {
        self.include.contains(segment)
    }

    pub fn is_discarded(&self, segment: &VideoSegment) -> bool {
        self.discard.contains(segment)
    }

    pub fn is_output(&self, segment: &VideoSegment) -> bool {
        self.output.contains(segment)
    }

    /// Mark a criterion as finished, opening an empty audit log if it recorded nothing.
    pub fn mark_logged(&mut self, criterion: &str) {
        self.agent_logs.entry(criterion.to_string()).or_default();
    }

    fn log_entry(&mut self, criterion: &str) -> &mut CriterionLog {
        self.agent_logs.entry(criterion.to_string()).or_default()
    }

    /// Tentatively select a segment, overriding an earlier discard.
    ///
    /// Segments already in `output` are left alone.
    pub fn include(&mut self, criterion: &str, segment: VideoSegment) {
        if self.is_output(&segment) {
            info!(criterion = %criterion, "Can't include segment already in output");
            return;
        }

        self.discard.remove(&segment);
        self.include.insert(segment.clone());
        self.log_entry(criterion).include.push(segment);
        metrics::record_decision(criterion, DecisionAction::Include);
        debug!(criterion = %criterion, "Added video segment to include set");
    }

    /// Tentatively reject a segment, overriding an earlier include.
    ///
    /// Segments already in `output` are left alone.
    pub fn discard(&mut self, criterion: &str, segment: VideoSegment) {
        if self.is_output(&segment) {
            info!(criterion = %criterion, "Can't discard segment already in output");
            return;
        }

        self.include.remove(&segment);
        self.discard.insert(segment.clone());
        self.log_entry(criterion).discard.push(segment);
        metrics::record_decision(criterion, DecisionAction::Discard);
        debug!(criterion = %criterion, "Added video segment to discard set");
    }

    /// Append a segment to the final output.
    pub fn output(&mut self, criterion: &str, segment: VideoSegment) {
        if self.is_output(&segment) {
            info!(criterion = %criterion, "Segment is already in output");
            return;
        }

        self.include.remove(&segment);
        self.discard.remove(&segment);
        self.output.push(segment.clone());
        self.log_entry(criterion).output.push(segment);
        metrics::record_decision(criterion, DecisionAction::Output);
        debug!(criterion = %criterion, "Added video segment to output");
    }

    /// Queue a group for arbitration by a downstream criterion.
    pub fn pick(&mut self, criterion: &str, group: SegmentGroup) {
        let size = group.len();
        self.pick.push(group.clone());
        self.log_entry(criterion).pick.push(group);
        metrics::record_decision(criterion, DecisionAction::Pick);
        debug!(criterion = %criterion, segments = size, "Added video segments to pick list");
    }

    /// Segments of `set` ordered by their position among the source videos.
    ///
    /// Segments that are not part of any source video follow, ordered by
    /// video path and start time.
    pub fn in_source_order(&self, set: &HashSet<VideoSegment>) -> Vec<VideoSegment> {
        let positions: HashMap<&VideoSegment, usize> = self
            .source()
            .iter()
            .flat_map(|video| video.segments())
            .enumerate()
            .map(|(index, segment)| (segment, index))
            .collect();

        let mut ordered: Vec<&VideoSegment> = set.iter().collect();
        ordered.sort_by(|a, b| {
            let key_a = positions.get(a).copied().unwrap_or(usize::MAX);
            let key_b = positions.get(b).copied().unwrap_or(usize::MAX);
            key_a
                .cmp(&key_b)
                .then_with(|| a.video_path().cmp(b.video_path()))
                .then_with(|| a.start().total_cmp(&b.start()))
                .then_with(|| a.end().total_cmp(&b.end()))
                .then_with(|| a.content().cmp(b.content()))
        });
        ordered.into_iter().cloned().collect()
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> SummaryResult<String> {
        Ok(serde_json::to_string_pretty(&StoreRecord::from(self))?)
    }

    /// Restore from JSON produced by [`DecisionStore::to_json`].
    pub fn from_json(json: &str) -> SummaryResult<Self> {
        let record: StoreRecord = serde_json::from_str(json)?;
        Ok(record.into())
    }

    /// Persist to a JSON file.
    pub async fn save(&self, path: impl AsRef<Path>) -> SummaryResult<()> {
        let path = path.as_ref();
        tokio::fs::write(path, self.to_json()?).await?;
        info!(path = %path.display(), "Saved decision store");
        Ok(())
    }

    /// Load a store persisted with [`DecisionStore::save`].
    pub async fn load(path: impl AsRef<Path>) -> SummaryResult<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        let store = Self::from_json(&json)?;
        info!(path = %path.display(), "Loaded decision store");
        Ok(store)
    }
}

/// Persisted layout of a store. Sets are written as lists in a stable order.
#[derive(Debug, Serialize, Deserialize)]
struct StoreRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<Vec<Video>>,
    #[serde(default)]
    output: Vec<VideoSegment>,
    #[serde(default)]
    include: Vec<VideoSegment>,
    #[serde(default)]
    discard: Vec<VideoSegment>,
    #[serde(default)]
    pick: Vec<SegmentGroup>,
    #[serde(default)]
    agent_logs: BTreeMap<String, CriterionLog>,
}

impl From<&DecisionStore> for StoreRecord {
    fn from(store: &DecisionStore) -> Self {
        Self {
            source: store.source.clone(),
            output: store.output.clone(),
            include: store.in_source_order(&store.include),
            discard: store.in_source_order(&store.discard),
            pick: store.pick.clone(),
            agent_logs: store.agent_logs.clone(),
        }
    }
}

impl From<StoreRecord> for DecisionStore {
    fn from(record: StoreRecord) -> Self {
        Self {
            source: record.source,
            output: record.output,
            include: record.include.into_iter().collect(),
            discard: record.discard.into_iter().collect(),
            pick: record.pick,
            agent_logs: record.agent_logs,
        }
    }
}
