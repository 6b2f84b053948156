use thiserror::Error;

/// Errors raised by the views and exporters
#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Unknown field {field:?}; expected one of: {}", available.join(", "))]
    UnknownField {
        field: String,
        available: Vec<String>,
    },

    #[error("No sample metadata columns available")]
    NoMetadataColumns,

    #[error("Invalid view configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
