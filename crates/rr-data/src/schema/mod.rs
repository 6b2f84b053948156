use ahash::{AHashMap, AHashSet};
use arrow::datatypes::{DataType, Field, Schema};

use crate::config::NullConfig;

/// Schema detector for metadata columns read as text
pub struct SchemaDetector {
    sample_size: usize,
    nulls: NullConfig,
}

/// Information about a detected schema
#[derive(Debug, Clone)]
pub struct SchemaInfo {
    pub schema: Schema,
    pub column_stats: AHashMap<String, ColumnStats>,
}

/// Statistics about a column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub null_count: usize,
    pub distinct_count: usize,
    pub is_unique: bool,
}

impl SchemaDetector {
    /// Create a new schema detector
    pub fn new() -> Self {
        Self {
            sample_size: 1000,
            nulls: NullConfig::default(),
        }
    }

    /// Set the sample size for detection
    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size = size.max(1);
        self
    }

    /// Set which cell values count as missing
    pub fn with_nulls(mut self, nulls: NullConfig) -> Self {
        self.nulls = nulls;
        self
    }

    pub fn nulls(&self) -> &NullConfig {
        &self.nulls
    }

    /// Detect a schema from the first `sample_size` rows. Every field is
    /// nullable since later rows may hold missing values. Rows past the
    /// sample are not inspected here; the metadata loader widens a column to
    /// text when one of them does not fit.
    pub fn detect_from_samples(&self, headers: &[String], rows: &[Vec<String>]) -> SchemaInfo {
        let rows = &rows[..rows.len().min(self.sample_size)];
        let mut fields = Vec::with_capacity(headers.len());
        let mut column_stats = AHashMap::with_capacity(headers.len());

        for (col_idx, header) in headers.iter().enumerate() {
            let (data_type, stats) = self.analyze_column(rows, col_idx);
            fields.push(Field::new(header, data_type, true));
            column_stats.insert(header.clone(), stats);
        }

        SchemaInfo {
            schema: Schema::new(fields),
            column_stats,
        }
    }

    /// Analyze a single column
    fn analyze_column(&self, rows: &[Vec<String>], col_idx: usize) -> (DataType, ColumnStats) {
        let mut null_count = 0;
        let mut values = Vec::new();
        let mut is_int = true;
        let mut is_float = true;
        let mut is_bool = true;

        for row in rows {
            match row.get(col_idx).map(String::as_str) {
                Some(value) if !self.nulls.is_null(value) => {
                    let value = value.trim();
                    if is_int && value.parse::<i64>().is_err() {
                        is_int = false;
                    }
                    if is_float && parse_float(value).is_none() {
                        is_float = false;
                    }
                    if is_bool && parse_bool(value).is_none() {
                        is_bool = false;
                    }
                    values.push(value);
                }
                _ => null_count += 1,
            }
        }

        // An all-missing column stays textual
        let data_type = if values.is_empty() {
            DataType::Utf8
        } else if is_bool {
            DataType::Boolean
        } else if is_int {
            DataType::Int64
        } else if is_float {
            DataType::Float64
        } else {
            DataType::Utf8
        };

        let distinct_count = values.iter().collect::<AHashSet<_>>().len();
        let stats = ColumnStats {
            null_count,
            distinct_count,
            is_unique: distinct_count == values.len(),
        };

        (data_type, stats)
    }
}

impl Default for SchemaDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a finite float. Spellings such as "inf" or "NaN" stay text.
pub(crate) fn parse_float(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
