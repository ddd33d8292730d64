//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; installing a recorder is left to
//! the embedding application.

use metrics::{counter, histogram};
use vsumm_models::DecisionAction;

/// Metric names as constants for consistency.
pub mod names {
    pub const DECISIONS_TOTAL: &str = "vsumm_decisions_total";
    pub const CRITERIA_COMPLETED_TOTAL: &str = "vsumm_criteria_completed_total";
    pub const CRITERION_DURATION_SECONDS: &str = "vsumm_criterion_duration_seconds";
}

/// Record a store mutation.
pub fn record_decision(criterion: &str, action: DecisionAction) {
    let labels = [
        ("criterion", criterion.to_string()),
        ("action", action.as_str().to_string()),
    ];
    counter!(names::DECISIONS_TOTAL, &labels).increment(1);
}

/// Record a finished criterion run.
pub fn record_criterion_completed(criterion: &str, duration_secs: f64) {
    let labels = [("criterion", criterion.to_string())];
    counter!(names::CRITERIA_COMPLETED_TOTAL, &labels).increment(1);
    histogram!(names::CRITERION_DURATION_SECONDS, &labels).record(duration_secs);
}
