//! Pipeline error types.

use thiserror::Error;

pub type SummaryResult<T> = Result<T, SummaryError>;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Source videos cannot change once they are set")]
    SourceAlreadySet,

    #[error("{criterion} depends on {dependency}, which has not logged any decision")]
    DependencyNotLogged {
        criterion: String,
        dependency: String,
    },

    #[error("{criterion} depends on {dependency}, which does not run before it")]
    DependencyOrder {
        criterion: String,
        dependency: String,
    },

    #[error("Invalid criterion input: {0}")]
    InvalidInput(String),

    #[error("Vocabulary of {requested} visual words exceeds the {available} descriptors available")]
    VocabularyTooLarge { requested: usize, available: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Media error: {0}")]
    Media(#[from] vsumm_media::MediaError),

    #[error("Model error: {0}")]
    Model(#[from] vsumm_models::ModelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SummaryError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the error comes from how the pipeline was assembled rather
    /// than from the data or an external capability.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            SummaryError::SourceAlreadySet
                | SummaryError::DependencyNotLogged { .. }
                | SummaryError::DependencyOrder { .. }
                | SummaryError::InvalidInput(_)
                | SummaryError::Config(_)
        )
    }
}
