//! Frame sampling and visual feature extraction for segment selection.
//!
//! This crate provides:
//! - The `FrameProvider` contract and an FFmpeg-backed implementation
//! - Intensity histograms and histogram-intersection similarity
//! - Local descriptor extraction with a keyframe novelty filter
//! - K-means visual vocabularies and bag-of-visual-words weighting
//! - Capability traits for object detection and text subjectivity

pub mod classifier;
pub mod descriptor;
pub mod error;
pub mod ffmpeg;
pub mod frame;
pub mod histogram;
pub mod keyframe;
pub mod probe;
pub mod vocabulary;

pub use classifier::{ObjectDetector, SubjectivityClassifier};
pub use descriptor::{DescriptorExtractor, GradientGridConfig, GradientGridExtractor};
pub use error::{MediaError, MediaResult};
pub use ffmpeg::FfmpegFrameProvider;
pub use frame::{Frame, FrameProvider, SampleRequest};
pub use histogram::{histogram_intersection, intensity_histogram};
pub use keyframe::{collect_keyframe_descriptors, KeyframeFilterConfig};
pub use probe::{probe_video, VideoInfo};
pub use vocabulary::{KMeansConfig, VisualVocabulary, WeightedHistogram};
