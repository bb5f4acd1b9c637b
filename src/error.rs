//! Error types for the fairtune pipeline

use thiserror::Error;

/// Result type alias for fairtune operations
pub type Result<T> = std::result::Result<T, FairtuneError>;

/// Main error type for the fairtune pipeline
#[derive(Error, Debug)]
pub enum FairtuneError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Missing required columns: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("Cohort '{group}' is empty after filtering")]
    EmptyCohort { group: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("No artifact stored under key '{key}'")]
    ArtifactNotFound { key: String },

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<polars::error::PolarsError> for FairtuneError {
    fn from(err: polars::error::PolarsError) -> Self {
        FairtuneError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for FairtuneError {
    fn from(err: serde_json::Error) -> Self {
        FairtuneError::SerializationError(err.to_string())
    }
}
