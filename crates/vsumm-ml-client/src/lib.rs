//! Client for the external ML inference service.
//!
//! The service hosts the concrete object-detection and text-subjectivity
//! models. This crate talks to it over HTTP and exposes it through the
//! `ObjectDetector` and `SubjectivityClassifier` capabilities, so the
//! pipeline never depends on an inference framework directly.

pub mod capability;
pub mod client;
pub mod error;
pub mod types;

pub use client::{MlClient, MlClientConfig};
pub use error::{MlError, MlResult};
pub use types::{DetectRequest, DetectResponse, SubjectivityRequest, SubjectivityResponse};
