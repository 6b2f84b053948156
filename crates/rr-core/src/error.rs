use thiserror::Error;

use crate::{FeatureId, SampleId};

/// Which half of a log ratio an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatioSide {
    Numerator,
    Denominator,
}

impl std::fmt::Display for RatioSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RatioSide::Numerator => f.write_str("numerator"),
            RatioSide::Denominator => f.write_str("denominator"),
        }
    }
}

/// Errors raised while resolving a selection or recomputing the linked views.
///
/// Every variant is scoped to a single user action: the session leaves its
/// selection and the views exactly as they were before the failed action.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error("Invalid sample ID: {0}")]
    InvalidSample(SampleId),

    #[error("Unknown feature ID: {0}")]
    UnknownFeature(FeatureId),

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("No {0} features selected")]
    EmptySelection(RatioSide),

    #[error("Another selection is still being applied to the views")]
    Busy,
}

pub type Result<T> = std::result::Result<T, SelectionError>;
