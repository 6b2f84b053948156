//! Count tables, rank and metadata loaders, and input preparation

pub mod config;
pub mod count_store;
pub mod prep;
pub mod schema;
pub mod sources;

use arrow::error::ArrowError;
use thiserror::Error;

// Re-exports
pub use config::{InputConfig, NullConfig};
pub use count_store::CountStore;
pub use prep::{load_inputs, prepare, validate_shape, PreparedInputs};
pub use schema::{ColumnStats, SchemaDetector, SchemaInfo};
pub use sources::{load_counts, FeatureMetadata, FeatureRanks, MetadataValue, SampleMetadata};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(ArrowError),

    #[error("CSV parsing error: {0}")]
    Csv(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema detection error: {0}")]
    SchemaDetection(String),

    #[error("Duplicate {kind} ID: {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("Feature {feature} does not have counts for the same samples as {first}")]
    InconsistentSamples { feature: String, first: String },

    #[error("Invalid count for feature {feature} in sample {sample}: {value}")]
    InvalidCount {
        feature: String,
        sample: String,
        value: String,
    },

    #[error("Column name {0:?} is reserved")]
    ReservedColumn(String),

    #[error("Invalid table: {0}")]
    InvalidTable(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<csv::Error> for DataError {
    fn from(error: csv::Error) -> Self {
        match error.kind() {
            csv::ErrorKind::Io(io_err) => {
                DataError::Io(std::io::Error::new(io_err.kind(), error.to_string()))
            }
            _ => DataError::Csv(error.to_string()),
        }
    }
}

impl From<ArrowError> for DataError {
    fn from(error: ArrowError) -> Self {
        DataError::Arrow(error)
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
