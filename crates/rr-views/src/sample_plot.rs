//! Sample plot: one point per sample, placed by its log-ratio

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use rr_core::{BalancePatch, SampleId, SampleSurface, SAMPLE_ID_FIELD};
use rr_data::{MetadataValue, SampleMetadata};

use crate::export::{export_rows, ExportFormat, ExportRow, ExportedFile, SAMPLE_EXPORT_FILE};
use crate::{SpaceView, SpaceViewId, ViewError};

/// One materialized sample row
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    /// `None` until a selection is applied, and again after a clear
    pub balance: Option<f64>,
    /// Metadata values, aligned with the view's metadata columns
    pub metadata: Vec<MetadataValue>,
}

impl SampleRow {
    /// Whether the point has a defined position on the balance axis
    pub fn is_drawn(&self) -> bool {
        self.balance.is_some_and(|b| !b.is_nan())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SamplePlotConfig {
    x_field: String,
    color_field: String,
}

/// Sample plot view
pub struct SamplePlotView {
    id: SpaceViewId,
    title: String,
    metadata_columns: Vec<String>,
    x_field: String,
    color_field: String,
    rows: IndexMap<SampleId, SampleRow>,
}

impl SamplePlotView {
    /// Build one row per sample in `metadata`. The x-axis and color fields
    /// start on the first metadata column.
    pub fn new(title: impl Into<String>, metadata: &SampleMetadata) -> Self {
        let metadata_columns = metadata.columns();
        let rows = metadata
            .ids()
            .iter()
            .map(|sample| {
                let values = metadata
                    .row(sample)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(_, value)| value)
                    .collect();
                let row = SampleRow {
                    balance: None,
                    metadata: values,
                };
                (sample.clone(), row)
            })
            .collect();

        let default_field = metadata_columns
            .first()
            .cloned()
            .unwrap_or_else(|| SAMPLE_ID_FIELD.to_string());

        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            metadata_columns,
            x_field: default_field.clone(),
            color_field: default_field,
            rows,
        }
    }

    /// Metadata columns that can be placed on the x axis or used for color
    pub fn metadata_columns(&self) -> Result<&[String], ViewError> {
        if self.metadata_columns.is_empty() {
            return Err(ViewError::NoMetadataColumns);
        }
        Ok(&self.metadata_columns)
    }

    pub fn x_field(&self) -> &str {
        &self.x_field
    }

    pub fn color_field(&self) -> &str {
        &self.color_field
    }

    pub fn set_x_field(&mut self, field: &str) -> Result<(), ViewError> {
        self.check_field(field)?;
        self.x_field = field.to_string();
        tracing::debug!(field, "Changed x-axis field");
        Ok(())
    }

    pub fn set_color_field(&mut self, field: &str) -> Result<(), ViewError> {
        self.check_field(field)?;
        self.color_field = field.to_string();
        tracing::debug!(field, "Changed color field");
        Ok(())
    }

    fn check_field(&self, field: &str) -> Result<(), ViewError> {
        if self.metadata_columns.iter().any(|c| c == field) {
            Ok(())
        } else {
            Err(ViewError::UnknownField {
                field: field.to_string(),
                available: self.metadata_columns.clone(),
            })
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, sample: &str) -> Option<&SampleRow> {
        self.rows.get(sample)
    }

    pub fn balance(&self, sample: &str) -> Option<f64> {
        self.rows.get(sample).and_then(|row| row.balance)
    }

    /// Value of a metadata field for one sample; `Sample ID` yields the ID
    pub fn metadata_value(&self, sample: &str, field: &str) -> Option<MetadataValue> {
        if field == SAMPLE_ID_FIELD {
            return self
                .rows
                .contains_key(sample)
                .then(|| MetadataValue::Text(sample.to_string()));
        }
        let column = self.metadata_columns.iter().position(|c| c == field)?;
        self.rows.get(sample).map(|row| row.metadata[column].clone())
    }

    /// Points that currently have a defined balance, as
    /// `(sample, balance, x value)`
    pub fn drawn_points(&self) -> Vec<(&SampleId, f64, MetadataValue)> {
        self.rows
            .iter()
            .filter_map(|(sample, row)| {
                let balance = row.balance.filter(|b| !b.is_nan())?;
                let x = self
                    .metadata_value(sample, &self.x_field)
                    .unwrap_or(MetadataValue::Missing);
                Some((sample, balance, x))
            })
            .collect()
    }

    /// Rows in export form, carrying the values of `metadata_field`
    pub fn export_rows(&self, metadata_field: &str) -> Vec<ExportRow> {
        self.rows
            .iter()
            .map(|(sample, row)| ExportRow {
                sample_id: sample.clone(),
                balance: row.balance,
                metadata: self
                    .metadata_value(sample, metadata_field)
                    .unwrap_or(MetadataValue::Missing),
            })
            .collect()
    }

    /// Export the drawn points with the current x-axis field, or with
    /// `metadata_field` when given
    pub fn export(&self, metadata_field: Option<&str>) -> ExportedFile {
        let field = metadata_field.unwrap_or(self.x_field.as_str());
        let contents = export_rows(&self.export_rows(field), field);
        tracing::info!(
            field,
            bytes = contents.len(),
            "Exported sample plot data"
        );
        ExportedFile {
            file_name: SAMPLE_EXPORT_FILE.to_string(),
            format: ExportFormat::Tsv,
            contents,
        }
    }
}

impl SampleSurface for SamplePlotView {
    fn sample_ids(&self) -> Vec<SampleId> {
        self.rows.keys().cloned().collect()
    }

    fn apply_balances(&mut self, patch: &[BalancePatch]) {
        for entry in patch {
            if let Some(row) = self.rows.get_mut(&entry.sample_id) {
                row.balance = Some(entry.balance);
            }
        }
    }

    fn clear_balances(&mut self) {
        for row in self.rows.values_mut() {
            row.balance = None;
        }
    }
}

impl SpaceView for SamplePlotView {
    fn id(&self) -> SpaceViewId {
        self.id
    }

    fn view_type(&self) -> &str {
        "SamplePlotView"
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn save_config(&self) -> Value {
        json!({
            "x_field": self.x_field,
            "color_field": self.color_field,
        })
    }

    fn load_config(&mut self, config: Value) -> Result<(), ViewError> {
        let config: SamplePlotConfig = serde_json::from_value(config)?;
        self.check_field(&config.x_field)?;
        self.check_field(&config.color_field)?;
        self.x_field = config.x_field;
        self.color_field = config.color_field;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
