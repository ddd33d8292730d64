//! Shared data models for the video summary pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Source videos and their timestamped, topic-labelled segments
//! - Redundancy groups awaiting arbitration
//! - Per-criterion audit logs
//! - JSON video manifests

pub mod decision_log;
pub mod error;
pub mod manifest;
pub mod segment;
pub mod timestamp;
pub mod video;

// Re-export common types
pub use decision_log::{CriterionLog, DecisionAction};
pub use error::{ModelError, ModelResult};
pub use manifest::{dump_videos, load_videos, manifest_schema, SegmentRecord, VideoRecord};
pub use segment::{SegmentGroup, VideoSegment};
pub use video::Video;
