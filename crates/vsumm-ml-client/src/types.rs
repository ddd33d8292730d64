//! ML service request/response types.

use serde::{Deserialize, Serialize};

/// Object detection request for a single frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectRequest {
    /// PNG-encoded frame, base64 (standard alphabet)
    pub image: String,
    /// Object class to look for
    pub target: String,
}

/// Object detection result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectResponse {
    pub detected: bool,
    /// Number of instances found, when the model reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

/// Subjectivity classification request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectivityRequest {
    pub texts: Vec<String>,
}

/// Subjectivity labels, one per requested text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectivityResponse {
    pub subjective: Vec<bool>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: Option<String>,
}
