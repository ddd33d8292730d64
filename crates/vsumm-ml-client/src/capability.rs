//! `ObjectDetector` and `SubjectivityClassifier` backed by the ML service.

use std::io::Cursor;

use async_trait::async_trait;
use base64::Engine;
use tracing::debug;
use vsumm_media::{Frame, MediaError, MediaResult, ObjectDetector, SubjectivityClassifier};

use crate::client::MlClient;
use crate::error::{MlError, MlResult};

/// Encode a frame as base64 PNG for the detection endpoint.
pub fn encode_frame(frame: &Frame) -> MlResult<String> {
    let mut bytes = Vec::new();
    frame
        .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
        .map_err(|e| MlError::Encoding(e.to_string()))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

#[async_trait]
impl ObjectDetector for MlClient {
    async fn detect(&self, frame: &Frame) -> MediaResult<bool> {
        let image = encode_frame(frame).map_err(|e| MediaError::detection_failed(e.to_string()))?;
        let detected = MlClient::detect(self, image)
            .await
            .map_err(|e| MediaError::detection_failed(e.to_string()))?;

        debug!(
            width = frame.width(),
            height = frame.height(),
            detected = detected,
            "ML object detection"
        );
        Ok(detected)
    }

    fn name(&self) -> &'static str {
        "ml_service_detector"
    }
}

#[async_trait]
impl SubjectivityClassifier for MlClient {
    async fn classify(&self, content: &str) -> MediaResult<bool> {
        let labels = self.classify_batch(&[content.to_string()]).await?;
        labels
            .into_iter()
            .next()
            .ok_or_else(|| MediaError::classification_failed("empty response"))
    }

    async fn classify_batch(&self, contents: &[String]) -> MediaResult<Vec<bool>> {
        self.subjectivity(contents.to_vec())
            .await
            .map_err(|e| MediaError::classification_failed(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "ml_service_subjectivity"
    }
}
