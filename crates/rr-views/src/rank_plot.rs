//! Rank plot: one bar per feature, colored by its classification

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use rr_core::{Classification, ClassificationPatch, FeatureId, RankSurface};
use rr_data::{FeatureMetadata, FeatureRanks, MetadataValue};

use crate::{SpaceView, SpaceViewId, ViewError};

/// One materialized feature row
#[derive(Debug, Clone, PartialEq)]
pub struct RankRow {
    /// Rank values, one per ranking
    pub ranks: Vec<f64>,
    /// Feature metadata values, one per metadata column; `Missing` for
    /// features the metadata does not list
    pub metadata: Vec<MetadataValue>,
    pub classification: Classification,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RankPlotConfig {
    rank_field: String,
}

/// Rank plot view
pub struct RankPlotView {
    id: SpaceViewId,
    title: String,
    rank_fields: Vec<String>,
    current_rank: usize,
    metadata_columns: Vec<String>,
    rows: IndexMap<FeatureId, RankRow>,
}

impl RankPlotView {
    /// One row per ranked feature, with its feature metadata joined in
    pub fn new(
        title: impl Into<String>,
        ranks: &FeatureRanks,
        feature_metadata: &FeatureMetadata,
    ) -> Self {
        let metadata_columns = feature_metadata.columns();
        let rows = ranks
            .feature_ids()
            .iter()
            .map(|feature| {
                let metadata = match feature_metadata.row(feature) {
                    Some(values) => values.into_iter().map(|(_, value)| value).collect(),
                    None => vec![MetadataValue::Missing; metadata_columns.len()],
                };
                let row = RankRow {
                    ranks: ranks.ranks_of(feature).unwrap_or_default().to_vec(),
                    metadata,
                    classification: Classification::None,
                };
                (feature.clone(), row)
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            rank_fields: ranks.rank_names().to_vec(),
            current_rank: 0,
            metadata_columns,
            rows,
        }
    }

    /// Feature metadata columns shown next to the rankings
    pub fn metadata_columns(&self) -> &[String] {
        &self.metadata_columns
    }

    pub fn metadata_value(&self, feature: &str, field: &str) -> Option<&MetadataValue> {
        let idx = self.metadata_columns.iter().position(|c| c == field)?;
        self.rows.get(feature)?.metadata.get(idx)
    }

    /// Names of the rankings that can be plotted
    pub fn rank_fields(&self) -> &[String] {
        &self.rank_fields
    }

    pub fn current_rank(&self) -> &str {
        self.rank_fields
            .get(self.current_rank)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn set_current_rank(&mut self, field: &str) -> Result<(), ViewError> {
        let idx = self
            .rank_fields
            .iter()
            .position(|f| f == field)
            .ok_or_else(|| ViewError::UnknownField {
                field: field.to_string(),
                available: self.rank_fields.clone(),
            })?;
        self.current_rank = idx;
        tracing::debug!(field, "Changed rank field");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, feature: &str) -> Option<&RankRow> {
        self.rows.get(feature)
    }

    pub fn classification(&self, feature: &str) -> Option<Classification> {
        self.rows.get(feature).map(|row| row.classification)
    }

    /// Rows ordered by the current ranking, lowest first. Ties keep table
    /// order.
    pub fn ordered_rows(&self) -> Vec<(&FeatureId, f64, Classification)> {
        let mut rows: Vec<_> = self
            .rows
            .iter()
            .map(|(feature, row)| {
                let rank = row.ranks.get(self.current_rank).copied().unwrap_or(f64::NAN);
                (feature, rank, row.classification)
            })
            .collect();
        rows.sort_by(|a, b| a.1.total_cmp(&b.1));
        rows
    }

    /// Number of rows with each classification
    pub fn classification_counts(&self) -> IndexMap<Classification, usize> {
        let mut counts: IndexMap<Classification, usize> = [
            Classification::Numerator,
            Classification::Denominator,
            Classification::Both,
            Classification::None,
        ]
        .into_iter()
        .map(|c| (c, 0))
        .collect();
        for row in self.rows.values() {
            *counts.entry(row.classification).or_default() += 1;
        }
        counts
    }
}

impl RankSurface for RankPlotView {
    fn feature_ids(&self) -> Vec<FeatureId> {
        self.rows.keys().cloned().collect()
    }

    fn apply_classifications(&mut self, patch: &[ClassificationPatch]) {
        for entry in patch {
            if let Some(row) = self.rows.get_mut(&entry.feature_id) {
                row.classification = entry.classification;
            }
        }
    }

    fn clear_classifications(&mut self) {
        for row in self.rows.values_mut() {
            row.classification = Classification::None;
        }
    }
}

impl SpaceView for RankPlotView {
    fn id(&self) -> SpaceViewId {
        self.id
    }

    fn view_type(&self) -> &str {
        "RankPlotView"
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn save_config(&self) -> Value {
        json!({ "rank_field": self.current_rank() })
    }

    fn load_config(&mut self, config: Value) -> Result<(), ViewError> {
        let config: RankPlotConfig = serde_json::from_value(config)?;
        self.set_current_rank(&config.rank_field)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
