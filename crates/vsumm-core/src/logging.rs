//! Structured run logging.
//!
//! Gives every summary run an id and consistent lifecycle messages.

use tracing::{error, info, warn, Span};
use uuid::Uuid;

/// Run logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    title: String,
}

impl RunLogger {
    /// Create a logger with a fresh run id.
    pub fn new(title: &str) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            title: title.to_string(),
        }
    }

    /// Create a logger for an existing run id.
    pub fn from_string(run_id: &str, title: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            title: title.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            title = %self.title,
            "Summary started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            title = %self.title,
            "Summary progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            run_id = %self.run_id,
            title = %self.title,
            "Summary warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            run_id = %self.run_id,
            title = %self.title,
            "Summary error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            title = %self.title,
            "Summary completed: {}", message
        );
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Span entered while the run's criteria execute.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "summary_run",
            run_id = %self.run_id,
            title = %self.title
        )
    }
}
