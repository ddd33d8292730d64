//! Per-criterion audit log.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::segment::{SegmentGroup, VideoSegment};

/// Kind of store mutation recorded in an audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Include,
    Discard,
    Output,
    Pick,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionAction::Include => "include",
            DecisionAction::Discard => "discard",
            DecisionAction::Output => "output",
            DecisionAction::Pick => "pick",
        }
    }
}

impl fmt::Display for DecisionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything a single criterion moved into include, discard, output or pick,
/// in call order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriterionLog {
    #[serde(default)]
    pub include: Vec<VideoSegment>,
    #[serde(default)]
    pub discard: Vec<VideoSegment>,
    #[serde(default)]
    pub output: Vec<VideoSegment>,
    #[serde(default)]
    pub pick: Vec<SegmentGroup>,
}

impl CriterionLog {
    /// Total number of recorded actions.
    pub fn len(&self) -> usize {
        self.include.len() + self.discard.len() + self.output.len() + self.pick.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
