//! Selection criteria.
//!
//! Each criterion reads one view of the [`DecisionStore`], applies its rule,
//! and writes decisions back through the helpers on [`SelectionCriterion`],
//! which record every mutation in the criterion's audit log.

pub mod chronology;
pub mod introduction;
pub mod quality;
pub mod redundancy;
pub mod subjectivity;

use async_trait::async_trait;
use std::fmt;
use vsumm_models::{DecisionAction, SegmentGroup, Video, VideoSegment};

use crate::error::{SummaryError, SummaryResult};
use crate::store::DecisionStore;

pub use chronology::{ChronologyConfig, ChronologyOrderer};
pub use introduction::{IntroductionConfig, IntroductionDetector};
pub use quality::{QualityConfig, QualityPicker};
pub use redundancy::{RedundancyClusterer, RedundancyConfig};
pub use subjectivity::{SubjectivityAction, SubjectivityConfig, SubjectivityFilter};

/// Identity of a criterion. Its name keys the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CriterionKind {
    Introduction,
    Subjectivity,
    Redundancy,
    Quality,
    Chronology,
}

impl CriterionKind {
    pub fn name(&self) -> &'static str {
        match self {
            CriterionKind::Introduction => "Introduction",
            CriterionKind::Subjectivity => "ObjectContentSubjectivity",
            CriterionKind::Redundancy => "ContentBasedRedundancy",
            CriterionKind::Quality => "QualityPick",
            CriterionKind::Chronology => "ClusterBasedChronology",
        }
    }
}

impl fmt::Display for CriterionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Store view a criterion consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFrom {
    /// The source videos
    Source,
    /// One of the store's own collections
    Store(DecisionAction),
    /// What an upstream criterion logged for an action
    Logged(CriterionKind, DecisionAction),
}

impl ReadFrom {
    /// Resolve the view against `store` on behalf of `criterion`.
    ///
    /// Set-valued views come back in source order.
    pub fn resolve(&self, criterion: &str, store: &DecisionStore) -> SummaryResult<CriterionInput> {
        let input = match *self {
            ReadFrom::Source => CriterionInput::Videos(store.source().to_vec()),
            ReadFrom::Store(action) => match action {
                DecisionAction::Include => {
                    CriterionInput::Segments(store.in_source_order(store.include_set()))
                }
                DecisionAction::Discard => {
                    CriterionInput::Segments(store.in_source_order(store.discard_set()))
                }
                DecisionAction::Output => {
                    CriterionInput::Segments(store.output_segments().to_vec())
                }
                DecisionAction::Pick => CriterionInput::Groups(store.pick_groups().to_vec()),
            },
            ReadFrom::Logged(kind, action) => {
                let log = store.log(kind.name()).ok_or_else(|| {
                    SummaryError::DependencyNotLogged {
                        criterion: criterion.to_string(),
                        dependency: kind.name().to_string(),
                    }
                })?;
                match action {
                    DecisionAction::Include => CriterionInput::Segments(log.include.clone()),
                    DecisionAction::Discard => CriterionInput::Segments(log.discard.clone()),
                    DecisionAction::Output => CriterionInput::Segments(log.output.clone()),
                    DecisionAction::Pick => CriterionInput::Groups(log.pick.clone()),
                }
            }
        };
        Ok(input)
    }
}

/// Resolved criterion input.
#[derive(Debug, Clone, PartialEq)]
pub enum CriterionInput {
    Videos(Vec<Video>),
    Segments(Vec<VideoSegment>),
    Groups(Vec<SegmentGroup>),
}

impl CriterionInput {
    fn shape(&self) -> &'static str {
        match self {
            CriterionInput::Videos(_) => "videos",
            CriterionInput::Segments(_) => "segments",
            CriterionInput::Groups(_) => "groups",
        }
    }

    pub fn into_videos(self) -> SummaryResult<Vec<Video>> {
        match self {
            CriterionInput::Videos(videos) => Ok(videos),
            other => Err(SummaryError::invalid_input(format!(
                "expected videos, got {}",
                other.shape()
            ))),
        }
    }

    pub fn into_segments(self) -> SummaryResult<Vec<VideoSegment>> {
        match self {
            CriterionInput::Segments(segments) => Ok(segments),
            other => Err(SummaryError::invalid_input(format!(
                "expected segments, got {}",
                other.shape()
            ))),
        }
    }

    pub fn into_groups(self) -> SummaryResult<Vec<SegmentGroup>> {
        match self {
            CriterionInput::Groups(groups) => Ok(groups),
            other => Err(SummaryError::invalid_input(format!(
                "expected groups, got {}",
                other.shape()
            ))),
        }
    }
}

/// A pipeline stage.
#[async_trait]
pub trait SelectionCriterion: Send + Sync {
    fn kind(&self) -> CriterionKind;

    /// Audit log key.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    fn read_from(&self) -> ReadFrom;

    /// Upstream criteria whose logged decisions this one needs.
    fn dependencies(&self) -> Vec<CriterionKind> {
        match self.read_from() {
            ReadFrom::Logged(kind, _) => vec![kind],
            _ => Vec::new(),
        }
    }

    /// Apply the criterion to the store.
    async fn evaluate(&self, store: &mut DecisionStore) -> SummaryResult<()>;

    /// Resolve this criterion's input view.
    fn input(&self, store: &DecisionStore) -> SummaryResult<CriterionInput> {
        self.read_from().resolve(self.name(), store)
    }

    fn include(&self, store: &mut DecisionStore, segment: VideoSegment) {
        store.include(self.name(), segment);
    }

    fn discard(&self, store: &mut DecisionStore, segment: VideoSegment) {
        store.discard(self.name(), segment);
    }

    fn output(&self, store: &mut DecisionStore, segment: VideoSegment) {
        store.output(self.name(), segment);
    }

    fn pick(&self, store: &mut DecisionStore, group: SegmentGroup) {
        store.pick(self.name(), group);
    }

    /// Drop segments that are already discarded.
    fn remove_discarded(
        &self,
        store: &DecisionStore,
        segments: Vec<VideoSegment>,
    ) -> Vec<VideoSegment> {
        segments
            .into_iter()
            .filter(|segment| !store.is_discarded(segment))
            .collect()
    }

    /// Drop segments that are already in the output.
    fn remove_outputted(
        &self,
        store: &DecisionStore,
        segments: Vec<VideoSegment>,
    ) -> Vec<VideoSegment> {
        segments
            .into_iter()
            .filter(|segment| !store.is_output(segment))
            .collect()
    }
}
