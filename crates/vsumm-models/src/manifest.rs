//! JSON video manifests.
//!
//! A manifest is a JSON array of videos, each carrying its already-segmented,
//! topic-labelled spans as produced by the upstream segmentation step.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{ModelError, ModelResult};
use crate::video::Video;

/// Wire format of a segment.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SegmentRecord {
    /// Transcript text of the span
    pub content: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds (must be greater than `start`)
    pub end: f64,
    /// Position in the final output, if assigned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(default)]
    pub video_topic: String,
    #[serde(default)]
    pub global_topic: String,
    /// Owning video path; inherited from the video when empty
    #[serde(default)]
    pub video_path: String,
}

/// Wire format of a video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoRecord {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub segments: Vec<SegmentRecord>,
}

/// JSON schema of a manifest file.
pub fn manifest_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(Vec<VideoRecord>)
}

/// Load videos from a JSON manifest.
///
/// Relative video paths are resolved against `base_dir`, or against the
/// manifest's directory when `base_dir` is `None`.
pub fn load_videos(manifest: impl AsRef<Path>, base_dir: Option<&Path>) -> ModelResult<Vec<Video>> {
    let manifest = manifest.as_ref();
    if !manifest.exists() {
        return Err(ModelError::ManifestNotFound(manifest.to_path_buf()));
    }

    let base_dir: PathBuf = match base_dir {
        Some(dir) => dir.to_path_buf(),
        None => manifest
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };

    let data = std::fs::read_to_string(manifest)?;
    let mut records: Vec<VideoRecord> = serde_json::from_str(&data)?;

    for record in &mut records {
        let path = Path::new(&record.path);
        if path.is_relative() {
            record.path = base_dir.join(path).to_string_lossy().to_string();
        }
    }

    let videos = records
        .into_iter()
        .map(Video::try_from)
        .collect::<ModelResult<Vec<_>>>()?;

    info!(
        manifest = %manifest.display(),
        videos = videos.len(),
        "Loaded video manifest"
    );
    Ok(videos)
}

/// Write videos to a pretty-printed JSON manifest.
pub fn dump_videos(videos: &[Video], path: impl AsRef<Path>) -> ModelResult<()> {
    let json = serde_json::to_string_pretty(videos)?;
    std::fs::write(path.as_ref(), json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"[
        {
            "name": "keynote",
            "path": "keynote.mp4",
            "topics": ["launch"],
            "segments": [
                {"content": "Welcome", "start": 0.0, "end": 4.0, "video_topic": "intro"},
                {"content": "The product", "start": 4.0, "end": 20.0}
            ]
        },
        {
            "name": "review",
            "path": "/abs/review.mp4",
            "segments": [{"content": "Hi all", "start": 0.0, "end": 3.0}]
        }
    ]"#;

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("videos.json");
        std::fs::write(&manifest, MANIFEST).unwrap();

        let videos = load_videos(&manifest, None).unwrap();
        assert_eq!(videos.len(), 2);

        let expected = dir.path().join("keynote.mp4").to_string_lossy().to_string();
        assert_eq!(videos[0].path(), expected);
        assert_eq!(videos[0].segments()[1].video_path(), expected);
        assert_eq!(videos[1].path(), "/abs/review.mp4");
    }

    #[test]
    fn test_dump_then_load_keeps_segments() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("videos.json");
        std::fs::write(&manifest, MANIFEST).unwrap();
        let videos = load_videos(&manifest, None).unwrap();

        let copy = dir.path().join("copy.json");
        dump_videos(&videos, &copy).unwrap();
        let reloaded = load_videos(&copy, None).unwrap();

        assert_eq!(videos, reloaded);
    }

    #[test]
    fn test_missing_manifest() {
        let result = load_videos("/definitely/not/here.json", None);
        assert!(matches!(result, Err(ModelError::ManifestNotFound(_))));
    }

    #[test]
    fn test_invalid_segment_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("bad.json");
        std::fs::write(
            &manifest,
            r#"[{"name":"v","path":"v.mp4","segments":[{"content":"x","start":3.0,"end":1.0}]}]"#,
        )
        .unwrap();

        assert!(load_videos(&manifest, None).is_err());
    }

    #[test]
    fn test_schema_mentions_segments() {
        let schema = serde_json::to_string(&manifest_schema()).unwrap();
        assert!(schema.contains("segments"));
    }
}
