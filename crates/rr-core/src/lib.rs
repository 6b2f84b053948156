//! Core functionality for rank/log-ratio exploration
//!
//! This crate owns the linked-selection engine: it tracks numerator and
//! denominator features, turns them into per-sample balances and per-feature
//! classifications, and pushes both into the linked views as one patch.

pub mod balance;
pub mod classify;
pub mod error;
pub mod events;
pub mod filter;
pub mod selection;
pub mod state;
pub mod sync;

// Re-export commonly used types
pub use balance::{log_ratio, sample_balance, summed_abundance};
pub use classify::{classify, Classification};
pub use data::AbundanceSource;
pub use error::{RatioSide, Result, SelectionError};
pub use filter::{filter_features, MatchMode};
pub use selection::{
    ClickOutcome, ClickPhase, MultiPhase, MultiQuery, MultiSelection, Selection,
    SelectionEvent, SelectionMachine, SingleSelection,
};
pub use state::{Session, SessionOutcome};
pub use sync::{
    BalancePatch, ClassificationPatch, PatchSummary, RankSurface, SampleSurface, SyncManager,
    ViewPatch,
};

/// Opaque feature identifier (e.g. a taxon ID)
pub type FeatureId = String;

/// Opaque sample identifier
pub type SampleId = String;

/// Name of the balance column in the sample view's materialized data
pub const BALANCE_FIELD: &str = "rankratio_balance";

/// Name of the classification column in the rank view's materialized data
pub const CLASSIFICATION_FIELD: &str = "rankratio_classification";

/// Name of the sample ID column in the sample view's materialized data
pub const SAMPLE_ID_FIELD: &str = "Sample ID";

/// Name of the feature ID column in the rank view's materialized data
pub const FEATURE_ID_FIELD: &str = "Feature ID";

pub mod data {
    use crate::error::Result;

    /// Read-only abundance lookup shared by every component of a session
    pub trait AbundanceSource: Send + Sync {
        /// Abundance of `feature` in `sample`.
        ///
        /// Fails with `InvalidSample` when the sample is not part of the
        /// table and with `UnknownFeature` when the feature is not.
        fn abundance(&self, feature: &str, sample: &str) -> Result<f64>;

        /// Check that a sample ID is known without looking up any feature
        fn validate_sample(&self, sample: &str) -> Result<()>;

        /// Every feature ID in the table, in table order
        fn feature_ids(&self) -> &[String];

        /// Whether the table has a row for `feature`
        fn contains_feature(&self, feature: &str) -> bool {
            self.feature_ids().iter().any(|f| f == feature)
        }

        /// Every sample ID in the table, in table order
        fn sample_ids(&self) -> &[String];

        /// Get the source name/path
        fn source_name(&self) -> &str;
    }
}
