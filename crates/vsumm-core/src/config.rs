//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use vsumm_media::GradientGridConfig;

use crate::criteria::{
    ChronologyConfig, IntroductionConfig, QualityConfig, RedundancyConfig, SubjectivityAction,
    SubjectivityConfig,
};
use crate::error::{SummaryError, SummaryResult};

/// Configuration of the default five-criterion pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummarizerConfig {
    pub introduction: IntroductionConfig,
    pub subjectivity: SubjectivityConfig,
    pub redundancy: RedundancyConfig,
    pub quality: QualityConfig,
    pub chronology: ChronologyConfig,
    /// Local descriptor extraction used by the quality picker
    pub descriptors: GradientGridConfig,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl SummarizerConfig {
    /// Create config from `VSUMM_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_parallel = env_or("VSUMM_MAX_PARALLEL", defaults.quality.max_parallel);

        let introduction = IntroductionConfig {
            sample_fps: env_or("VSUMM_INTRO_SAMPLE_FPS", defaults.introduction.sample_fps),
            grayscale: env_or("VSUMM_GRAYSCALE", defaults.introduction.grayscale),
            similarity_threshold: env_or(
                "VSUMM_INTRO_THRESHOLD",
                defaults.introduction.similarity_threshold,
            ),
            skip_seconds: env_or("VSUMM_INTRO_SKIP_SECONDS", defaults.introduction.skip_seconds),
            boundary_tolerance_secs: env_or(
                "VSUMM_INTRO_TOLERANCE_SECS",
                defaults.introduction.boundary_tolerance_secs,
            ),
        };

        let subjectivity = SubjectivityConfig {
            sample_fps: env_or("VSUMM_SUBJECTIVITY_SAMPLE_FPS", defaults.subjectivity.sample_fps),
            grayscale: env_or("VSUMM_GRAYSCALE", defaults.subjectivity.grayscale),
            action: std::env::var("VSUMM_SUBJECTIVITY_ACTION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.subjectivity.action),
            max_parallel,
        };

        let redundancy = RedundancyConfig {
            reference_seconds: env_or(
                "VSUMM_REDUNDANCY_REFERENCE_SECS",
                defaults.redundancy.reference_seconds,
            ),
            base_threshold: env_or(
                "VSUMM_REDUNDANCY_BASE_THRESHOLD",
                defaults.redundancy.base_threshold,
            ),
        };

        let mut quality = defaults.quality.clone();
        quality.top_n = env_or("VSUMM_QUALITY_TOP_N", quality.top_n);
        quality.vocabulary_size = env_or("VSUMM_QUALITY_VOCABULARY_SIZE", quality.vocabulary_size);
        quality.sample_fps = env_or("VSUMM_QUALITY_SAMPLE_FPS", quality.sample_fps);
        quality.grayscale = env_or("VSUMM_GRAYSCALE", quality.grayscale);
        quality.kmeans.seed = env_or("VSUMM_KMEANS_SEED", quality.kmeans.seed);
        quality.kmeans.max_iterations =
            env_or("VSUMM_KMEANS_MAX_ITERATIONS", quality.kmeans.max_iterations);
        quality.max_parallel = max_parallel;

        let chronology = ChronologyConfig {
            write_output: env_or(
                "VSUMM_CHRONOLOGY_WRITE_OUTPUT",
                defaults.chronology.write_output,
            ),
        };

        Self {
            introduction,
            subjectivity,
            redundancy,
            quality,
            chronology,
            descriptors: defaults.descriptors,
        }
    }

    /// Reject values the criteria cannot work with.
    pub fn validate(&self) -> SummaryResult<()> {
        let rates = [
            ("introduction.sample_fps", self.introduction.sample_fps),
            ("subjectivity.sample_fps", self.subjectivity.sample_fps),
            ("quality.sample_fps", self.quality.sample_fps),
        ];
        for (field, fps) in rates {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(SummaryError::config_error(format!(
                    "{} must be positive, got {}",
                    field, fps
                )));
            }
        }
        self.redundancy.validate()?;
        if self.quality.top_n == 0 {
            return Err(SummaryError::config_error("quality.top_n must be at least 1"));
        }
        if self.quality.vocabulary_size == 0 {
            return Err(SummaryError::config_error(
                "quality.vocabulary_size must be at least 1",
            ));
        }
        Ok(())
    }
}

impl FromStr for SubjectivityAction {
    type Err = SummaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "discard" => Ok(SubjectivityAction::Discard),
            "include" => Ok(SubjectivityAction::Include),
            other => Err(SummaryError::config_error(format!(
                "unknown subjectivity action: {}",
                other
            ))),
        }
    }
}
