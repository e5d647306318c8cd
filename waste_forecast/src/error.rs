//! Error types for the waste_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the waste_forecast crate
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or invalid input data; fatal to a batch run
    #[error("Data error: {0}")]
    DataError(String),

    /// The assembler could not satisfy the registered feature schema.
    /// Fatal to the single request that raised it.
    #[error("Schema mismatch: missing features [{}]", missing.join(", "))]
    SchemaMismatch {
        /// Schema columns absent from the feature record
        missing: Vec<String>,
    },

    /// Error from invalid parameters or configuration
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error raised inside a regressor
    #[error("Training error: {0}")]
    TrainingError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV operations
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from artifact serialization
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<PolarsError> for PipelineError {
    fn from(err: PolarsError) -> Self {
        PipelineError::PolarsError(err.to_string())
    }
}
