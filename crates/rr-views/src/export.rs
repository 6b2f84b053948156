//! Sample plot and feature list export

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use rr_core::{SampleId, BALANCE_FIELD, SAMPLE_ID_FIELD};
use rr_data::MetadataValue;

use crate::ViewError;

/// Suggested file name for exported sample plot data
pub const SAMPLE_EXPORT_FILE: &str = "rankratio_sample_plot_data.tsv";

/// Suggested file name for exported feature lists
pub const FEATURE_EXPORT_FILE: &str = "rankratio_selected_features.txt";

/// Export format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Tsv,
    Text,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Tsv => "tsv",
            ExportFormat::Text => "txt",
        }
    }

    pub fn filter_name(&self) -> &'static str {
        match self {
            ExportFormat::Tsv => "Tab-separated values",
            ExportFormat::Text => "Plain text",
        }
    }
}

/// Where exports are written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    pub sample_file: String,
    pub feature_file: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            sample_file: SAMPLE_EXPORT_FILE.to_string(),
            feature_file: FEATURE_EXPORT_FILE.to_string(),
        }
    }
}

/// Exported text together with the name it should be saved under
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    pub file_name: String,
    pub format: ExportFormat,
    pub contents: String,
}

impl ExportedFile {
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Write the contents into `dir` under `file_name`, or under the
    /// suggested name when `file_name` is `None`
    pub fn write_to(&self, dir: &Path, file_name: Option<&str>) -> Result<PathBuf, ViewError> {
        let path = dir.join(file_name.unwrap_or(&self.file_name));
        std::fs::write(&path, &self.contents)?;
        tracing::info!("Exported {} to: {:?}", self.format.filter_name(), path);
        Ok(path)
    }
}

/// One sample plot row as the exporter sees it
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub sample_id: SampleId,
    pub balance: Option<f64>,
    /// Value of the exported metadata field
    pub metadata: MetadataValue,
}

/// Serialize the rows with a defined balance as TSV.
///
/// The metadata column is left out when `metadata_field` is the sample ID
/// or the balance itself. Returns an empty string when no row has a
/// defined balance.
pub fn export_rows(rows: &[ExportRow], metadata_field: &str) -> String {
    let with_metadata = metadata_field != SAMPLE_ID_FIELD && metadata_field != BALANCE_FIELD;

    let mut lines = vec![if with_metadata {
        format!("Sample_ID\tLog_Ratio\t{}", quote_tsv_field(metadata_field))
    } else {
        "Sample_ID\tLog_Ratio".to_string()
    }];

    for row in rows {
        let Some(balance) = row.balance.filter(|b| !b.is_nan()) else {
            continue;
        };
        let mut line = format!(
            "{}\t{}",
            quote_tsv_field(&row.sample_id),
            format_number(balance)
        );
        if with_metadata {
            let value = match &row.metadata {
                MetadataValue::Float(v) => format_number(*v),
                other => other.to_string(),
            };
            line.push('\t');
            line.push_str(&quote_tsv_field(&value));
        }
        lines.push(line);
    }

    if lines.len() == 1 {
        return String::new();
    }
    lines.join("\n")
}

/// Format a number the way a browser prints it: shortest round-trip digits,
/// switching to exponent notation below 1e-6 and from 1e21 up
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let abs = value.abs();
    if (1e-6..1e21).contains(&abs) {
        return format!("{value}");
    }
    let text = format!("{value:e}");
    match text.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => text,
    }
}

/// Wrap a field in double quotes when it contains whitespace or a double
/// quote, doubling any inner quotes
pub fn quote_tsv_field(field: &str) -> Cow<'_, str> {
    if field.chars().any(|c| c.is_whitespace() || c == '"') {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
