//! Classifier capabilities consulted by selection criteria.
//!
//! The pipeline holds these as injected strategies; concrete inference
//! backends live behind them (see the ML service client).

use async_trait::async_trait;

use crate::error::MediaResult;
use crate::frame::Frame;

/// Detects whether a frame contains the object of interest (e.g. a face).
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    async fn detect(&self, frame: &Frame) -> MediaResult<bool>;

    /// Detector name for logging.
    fn name(&self) -> &'static str;
}

/// Classifies transcript text as subjective or objective.
#[async_trait]
pub trait SubjectivityClassifier: Send + Sync {
    /// `true` when `content` is subjective.
    async fn classify(&self, content: &str) -> MediaResult<bool>;

    /// Classify several texts; results follow input order.
    async fn classify_batch(&self, contents: &[String]) -> MediaResult<Vec<bool>> {
        let mut labels = Vec::with_capacity(contents.len());
        for content in contents {
            labels.push(self.classify(content).await?);
        }
        Ok(labels)
    }

    /// Classifier name for logging.
    fn name(&self) -> &'static str;
}
