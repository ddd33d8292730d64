//! Pipeline runner.
//!
//! Criteria run strictly in sequence against one [`DecisionStore`]; each one
//! sees every mutation of the criteria before it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, Instrument};
use vsumm_media::{
    DescriptorExtractor, FrameProvider, GradientGridExtractor, ObjectDetector,
    SubjectivityClassifier,
};
use vsumm_models::Video;

use crate::config::SummarizerConfig;
use crate::criteria::{
    ChronologyOrderer, CriterionKind, IntroductionDetector, QualityPicker, RedundancyClusterer,
    SelectionCriterion, SubjectivityFilter,
};
use crate::error::{SummaryError, SummaryResult};
use crate::logging::RunLogger;
use crate::metrics;
use crate::store::DecisionStore;

/// Options of a single summary run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryOptions {
    /// Name of the summary video
    pub title: String,
    /// Path the summary video will be rendered to
    pub video_output_path: String,
    pub store_path: PathBuf,
    /// Persist the final store to `store_path`
    pub save_store: bool,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            title: "summary".to_string(),
            video_output_path: "summary.mp4".to_string(),
            store_path: PathBuf::from("store.json"),
            save_store: false,
        }
    }
}

impl SummaryOptions {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_video_output_path(mut self, path: impl Into<String>) -> Self {
        self.video_output_path = path.into();
        self
    }

    /// Persist the final store to `path`.
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self.save_store = true;
        self
    }
}

/// Result of a summary run.
#[derive(Debug, Clone)]
pub struct Summary {
    /// Summary video: the output segments in order
    pub video: Video,
    pub store: DecisionStore,
}

/// Ordered chain of selection criteria.
pub struct Summarizer {
    criteria: Vec<Box<dyn SelectionCriterion>>,
}

impl Summarizer {
    /// Assemble a pipeline, checking that every dependency runs earlier.
    pub fn new(criteria: Vec<Box<dyn SelectionCriterion>>) -> SummaryResult<Self> {
        Self::validate(&criteria)?;
        Ok(Self { criteria })
    }

    /// Introduction, subjectivity, redundancy, quality, chronology.
    pub fn default_pipeline(
        config: &SummarizerConfig,
        frames: Arc<dyn FrameProvider>,
        detector: Arc<dyn ObjectDetector>,
        classifier: Arc<dyn SubjectivityClassifier>,
        extractor: Arc<dyn DescriptorExtractor>,
    ) -> SummaryResult<Self> {
        config.validate()?;

        let criteria: Vec<Box<dyn SelectionCriterion>> = vec![
            Box::new(IntroductionDetector::new(
                config.introduction.clone(),
                frames.clone(),
            )),
            Box::new(SubjectivityFilter::new(
                config.subjectivity.clone(),
                frames.clone(),
                detector,
                classifier,
            )),
            Box::new(RedundancyClusterer::new(config.redundancy.clone())?),
            Box::new(QualityPicker::new(
                config.quality.clone(),
                CriterionKind::Redundancy,
                frames,
                extractor,
            )),
            Box::new(ChronologyOrderer::new(
                config.chronology.clone(),
                CriterionKind::Redundancy,
            )),
        ];
        Self::new(criteria)
    }

    /// Default pipeline with the gradient-grid extractor.
    pub fn with_default_extractor(
        config: &SummarizerConfig,
        frames: Arc<dyn FrameProvider>,
        detector: Arc<dyn ObjectDetector>,
        classifier: Arc<dyn SubjectivityClassifier>,
    ) -> SummaryResult<Self> {
        let extractor = Arc::new(GradientGridExtractor::new(config.descriptors.clone()));
        Self::default_pipeline(config, frames, detector, classifier, extractor)
    }

    /// Every dependency must name a criterion placed earlier in the chain.
    pub fn validate(criteria: &[Box<dyn SelectionCriterion>]) -> SummaryResult<()> {
        for (index, criterion) in criteria.iter().enumerate() {
            for dependency in criterion.dependencies() {
                let runs_before = criteria[..index]
                    .iter()
                    .any(|earlier| earlier.kind() == dependency);
                if !runs_before {
                    error!(
                        criterion = criterion.name(),
                        dependency = dependency.name(),
                        "Criterion depends on a criterion that does not run before it"
                    );
                    return Err(SummaryError::DependencyOrder {
                        criterion: criterion.name().to_string(),
                        dependency: dependency.name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Criterion names in execution order.
    pub fn criteria_names(&self) -> Vec<&'static str> {
        self.criteria.iter().map(|c| c.name()).collect()
    }

    /// Run every criterion in order against `store`.
    pub async fn run(&self, store: &mut DecisionStore, logger: &RunLogger) -> SummaryResult<()> {
        let run_span = logger.create_span();

        for criterion in &self.criteria {
            let name = criterion.name();
            for dependency in criterion.dependencies() {
                if !store.is_logged(dependency.name()) {
                    error!(
                        criterion = name,
                        dependency = dependency.name(),
                        "Dependency has not run"
                    );
                    return Err(SummaryError::DependencyNotLogged {
                        criterion: name.to_string(),
                        dependency: dependency.name().to_string(),
                    });
                }
            }

            logger.log_progress(&format!("running {}", name));

            let started = Instant::now();
            let span = tracing::info_span!(parent: &run_span, "criterion", criterion = name);
            criterion.evaluate(store).instrument(span).await?;
            // Only a criterion that finished counts as logged
            store.mark_logged(name);

            let elapsed = started.elapsed().as_secs_f64();
            metrics::record_criterion_completed(name, elapsed);
            info!(
                criterion = name,
                duration_secs = elapsed,
                output = store.output_segments().len(),
                included = store.include_set().len(),
                discarded = store.discard_set().len(),
                "Criterion finished"
            );
        }

        Ok(())
    }

    /// Run the pipeline over `videos` and assemble the summary video.
    pub async fn summarize(
        &self,
        videos: Vec<Video>,
        options: &SummaryOptions,
    ) -> SummaryResult<Summary> {
        let logger = RunLogger::new(&options.title);
        logger.log_start(&format!(
            "{} videos through {} criteria",
            videos.len(),
            self.criteria.len()
        ));

        let mut store = DecisionStore::new();
        store.set_source(videos)?;

        if let Err(e) = self.run(&mut store, &logger).await {
            logger.log_error(&e.to_string());
            return Err(e);
        }

        if store.output_segments().is_empty() {
            logger.log_warning("no segment reached the output");
        }

        let video = Video::new(
            options.title.clone(),
            options.video_output_path.clone(),
            output_topics(&store),
            store.output_segments().to_vec(),
        );

        if options.save_store {
            store.save(&options.store_path).await?;
        }

        logger.log_completion(&format!("{} segments in summary", video.segments().len()));
        Ok(Summary { video, store })
    }
}

/// Distinct, non-empty video topics of the output in first-seen order.
fn output_topics(store: &DecisionStore) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();
    for segment in store.output_segments() {
        let topic = segment.video_topic();
        if !topic.is_empty() && !topics.iter().any(|t| t == topic) {
            topics.push(topic.to_string());
        }
    }
    topics
}
