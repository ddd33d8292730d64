//! Segment selection and consolidation for video summaries.
//!
//! This crate provides:
//! - The decision store shared by every criterion, with per-criterion audit logs
//! - The selection criterion protocol and its five criteria
//! - A sequential pipeline runner with dependency validation
//! - Run logging, metrics, and environment configuration

pub mod config;
pub mod criteria;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod store;
pub mod summarizer;
pub mod text;

pub use config::SummarizerConfig;
pub use criteria::{CriterionKind, ReadFrom, SelectionCriterion};
pub use error::{SummaryError, SummaryResult};
pub use logging::RunLogger;
pub use store::DecisionStore;
pub use summarizer::{Summarizer, Summary, SummaryOptions};
