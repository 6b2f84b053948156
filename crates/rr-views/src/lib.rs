//! Linked views for rank/log-ratio exploration
//!
//! The rank plot and the sample plot hold materialized rows that the
//! synchronizer in `rr-core` patches together; the feature list panel and
//! the exporters read from them.

mod error;
pub mod export;
mod feature_list;
mod rank_plot;
mod sample_plot;
mod space_view;

pub use error::ViewError;
pub use export::{
    export_rows, format_number, quote_tsv_field, ExportConfig, ExportFormat, ExportRow, ExportedFile,
    FEATURE_EXPORT_FILE, SAMPLE_EXPORT_FILE,
};
pub use feature_list::FeatureListPanel;
pub use rank_plot::{RankPlotView, RankRow};
pub use sample_plot::{SamplePlotView, SampleRow};
pub use space_view::{SpaceView, SpaceViewId};

use std::sync::Arc;

use parking_lot::RwLock;
use rr_core::SyncManager;
use rr_data::PreparedInputs;

/// The linked views of one session
#[derive(Clone)]
pub struct LinkedViews {
    pub rank_plot: Arc<RwLock<RankPlotView>>,
    pub sample_plot: Arc<RwLock<SamplePlotView>>,
    pub feature_list: Arc<RwLock<FeatureListPanel>>,
}

impl LinkedViews {
    /// Build the rank and sample views from prepared inputs
    pub fn new(inputs: &PreparedInputs) -> Self {
        Self {
            rank_plot: Arc::new(RwLock::new(RankPlotView::new(
                "Feature ranks",
                &inputs.ranks,
                &inputs.feature_metadata,
            ))),
            sample_plot: Arc::new(RwLock::new(SamplePlotView::new(
                "Sample log-ratios",
                &inputs.metadata,
            ))),
            feature_list: Arc::new(RwLock::new(FeatureListPanel::new())),
        }
    }

    /// Synchronizer that patches the rank and sample views together
    pub fn sync_manager(&self) -> SyncManager {
        SyncManager::new(self.sample_plot.clone(), self.rank_plot.clone())
    }
}
