//! Error types for model construction and manifest I/O.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid segment window: [{start}, {end}) must be finite with end after start")]
    InvalidSegment { start: f64, end: f64 },

    #[error("Manifest not found: {0}")]
    ManifestNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
