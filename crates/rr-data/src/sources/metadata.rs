use std::fmt;
use std::io::Read;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use ahash::AHashMap;
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use rr_core::{FEATURE_ID_FIELD, SAMPLE_ID_FIELD};

use super::{file_name, open, tsv_reader};
use crate::config::NullConfig;
use crate::count_store::index_ids;
use crate::schema::{parse_bool, parse_float, SchemaDetector};
use crate::{DataError, Result};

/// One metadata cell
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Missing,
}

impl MetadataValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, MetadataValue::Missing)
    }

    /// Numeric value, for axis placement
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Integer(v) => Some(*v as f64),
            MetadataValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Text(v) => f.write_str(v),
            MetadataValue::Integer(v) => write!(f, "{v}"),
            MetadataValue::Float(v) => write!(f, "{v}"),
            MetadataValue::Boolean(v) => write!(f, "{v}"),
            MetadataValue::Missing => Ok(()),
        }
    }
}

/// Which ID column a metadata table is keyed by
pub trait MetadataKey: Clone + fmt::Debug + Send + Sync + 'static {
    /// Name given to the first column
    const ID_FIELD: &'static str;
    /// What the IDs identify, for messages
    const KIND: &'static str;
}

/// Keyed by sample ID
#[derive(Debug, Clone, Copy)]
pub struct SampleKey;

impl MetadataKey for SampleKey {
    const ID_FIELD: &'static str = SAMPLE_ID_FIELD;
    const KIND: &'static str = "sample";
}

/// Keyed by feature ID
#[derive(Debug, Clone, Copy)]
pub struct FeatureKey;

impl MetadataKey for FeatureKey {
    const ID_FIELD: &'static str = FEATURE_ID_FIELD;
    const KIND: &'static str = "feature";
}

/// Metadata held as one Arrow batch. Column 0 is the ID; the remaining
/// columns are typed by sampling and widened to text when a later row does
/// not fit.
#[derive(Debug, Clone)]
pub struct MetadataTable<K: MetadataKey> {
    batch: RecordBatch,
    ids: Vec<String>,
    index: AHashMap<String, usize>,
    _key: PhantomData<K>,
}

pub type SampleMetadata = MetadataTable<SampleKey>;
pub type FeatureMetadata = MetadataTable<FeatureKey>;

impl<K: MetadataKey> MetadataTable<K> {
    /// Load a metadata table; the first column holds the IDs
    pub fn load(path: &Path, detector: &SchemaDetector) -> Result<Self> {
        let metadata = Self::read(open(path)?, detector)?;
        tracing::info!(
            source = %file_name(path),
            rows = metadata.len(),
            columns = metadata.columns().len(),
            "Loaded {} metadata",
            K::KIND
        );
        Ok(metadata)
    }

    pub fn read<R: Read>(reader: R, detector: &SchemaDetector) -> Result<Self> {
        let mut tsv = tsv_reader(reader, true);
        let headers: Vec<String> = tsv.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in tsv.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        Self::from_rows(headers, rows, detector)
    }

    /// Build from raw text rows. The first header is replaced by the ID
    /// field name.
    pub fn from_rows(
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        detector: &SchemaDetector,
    ) -> Result<Self> {
        if headers.is_empty() {
            return Err(DataError::InvalidTable(format!(
                "{} metadata has no ID column",
                K::KIND
            )));
        }
        let columns = &headers[1..];
        index_ids(columns, "metadata column")?;

        let ids: Vec<String> = rows
            .iter()
            .map(|row| row.first().cloned().unwrap_or_default())
            .collect();
        let index = index_ids(&ids, K::KIND)?;

        let values: Vec<Vec<String>> = rows
            .iter()
            .map(|row| row.iter().skip(1).cloned().collect())
            .collect();
        let detected = detector.detect_from_samples(columns, &values);

        let mut fields = vec![Field::new(K::ID_FIELD, DataType::Utf8, false)];
        let mut arrays: Vec<ArrayRef> = vec![Arc::new(StringArray::from(ids.clone()))];
        for (col_idx, field) in detected.schema.fields().iter().enumerate() {
            let (field, array) = build_column(field, &values, col_idx, detector.nulls());
            fields.push(field);
            arrays.push(array);
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
        Ok(Self {
            batch,
            ids,
            index,
            _key: PhantomData,
        })
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// IDs in row order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Metadata column names, without the ID column
    pub fn columns(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .skip(1)
            .map(|f| f.name().clone())
            .collect()
    }

    /// Value of `column` for `id`; `None` when either is unknown
    pub fn value(&self, id: &str, column: &str) -> Option<MetadataValue> {
        let row = *self.index.get(id)?;
        let col_idx = self.batch.schema().index_of(column).ok()?;
        if col_idx == 0 {
            return Some(MetadataValue::Text(id.to_string()));
        }
        Some(cell(self.batch.column(col_idx).as_ref(), row))
    }

    /// Every metadata value of one row, in column order
    pub fn row(&self, id: &str) -> Option<Vec<(String, MetadataValue)>> {
        let row = *self.index.get(id)?;
        let schema = self.batch.schema();
        Some(
            schema
                .fields()
                .iter()
                .enumerate()
                .skip(1)
                .map(|(idx, field)| {
                    (field.name().clone(), cell(self.batch.column(idx).as_ref(), row))
                })
                .collect(),
        )
    }

    /// Fail if a column is named after the ID field or another field the
    /// views add themselves
    pub fn check_column_names(&self, reserved: &[&str]) -> Result<()> {
        match self
            .columns()
            .into_iter()
            .find(|name| name == K::ID_FIELD || reserved.contains(&name.as_str()))
        {
            Some(name) => Err(DataError::ReservedColumn(name)),
            None => Ok(()),
        }
    }

    /// Keep only the listed IDs, in the listed order. Unknown IDs are
    /// ignored.
    pub fn subset(&self, ids: &[String]) -> Result<Self> {
        let rows: Vec<u32> = ids
            .iter()
            .filter_map(|id| self.index.get(id).map(|&r| r as u32))
            .collect();
        let indices = UInt32Array::from(rows);
        let columns = self
            .batch
            .columns()
            .iter()
            .map(|column| arrow::compute::take(column.as_ref(), &indices, None))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let batch = RecordBatch::try_new(self.batch.schema(), columns)?;
        Self::from_batch(batch)
    }

    /// Rename every metadata column with `escape(..)`, failing if two names
    /// collide
    pub fn escape_columns(&self, escape: impl Fn(&str) -> String) -> Result<Self> {
        let schema = self.batch.schema();
        let fields: Vec<Field> = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(idx, f)| {
                let name = if idx == 0 { f.name().clone() } else { escape(f.name()) };
                f.as_ref().clone().with_name(name)
            })
            .collect();
        let names: Vec<String> = fields.iter().skip(1).map(|f| f.name().clone()).collect();
        index_ids(&names, "metadata column")?;

        let batch = RecordBatch::try_new(
            Arc::new(Schema::new(fields)),
            self.batch.columns().to_vec(),
        )?;
        Ok(Self {
            batch,
            ids: self.ids.clone(),
            index: self.index.clone(),
            _key: PhantomData,
        })
    }

    /// Metadata with an ID column and nothing else
    pub fn ids_only(ids: &[String]) -> Result<Self> {
        let schema = Schema::new(vec![Field::new(K::ID_FIELD, DataType::Utf8, false)]);
        let ids: ArrayRef = Arc::new(StringArray::from(ids.to_vec()));
        Self::from_batch(RecordBatch::try_new(Arc::new(schema), vec![ids])?)
    }

    fn from_batch(batch: RecordBatch) -> Result<Self> {
        let column = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| {
                DataError::SchemaDetection(format!("{} ID column is not text", K::KIND))
            })?;
        let ids: Vec<String> = (0..column.len()).map(|i| column.value(i).to_string()).collect();
        let index = index_ids(&ids, K::KIND)?;
        Ok(Self {
            batch,
            ids,
            index,
            _key: PhantomData,
        })
    }
}

/// Build one typed column. Cells matching the null patterns and cells past
/// the end of a short row become nulls. When any other cell does not parse
/// as the detected type, the whole column is read as text instead.
fn build_column(
    field: &Field,
    rows: &[Vec<String>],
    col_idx: usize,
    nulls: &NullConfig,
) -> (Field, ArrayRef) {
    let cells: Vec<Option<&str>> = rows
        .iter()
        .map(|row| {
            row.get(col_idx)
                .map(String::as_str)
                .filter(|v| !nulls.is_null(v))
        })
        .collect();
    let mut present = cells.iter().flatten().map(|v| v.trim());

    let fits = match field.data_type() {
        DataType::Boolean => present.all(|v| parse_bool(v).is_some()),
        DataType::Int64 => present.all(|v| v.parse::<i64>().is_ok()),
        DataType::Float64 => present.all(|v| parse_float(v).is_some()),
        _ => true,
    };
    let data_type = if fits {
        field.data_type().clone()
    } else {
        tracing::warn!(
            column = %field.name(),
            detected = %field.data_type(),
            "Values past the sampled rows do not fit the detected type; reading column as text"
        );
        DataType::Utf8
    };

    let array: ArrayRef = match data_type {
        DataType::Boolean => {
            let mut builder = BooleanBuilder::new();
            for value in &cells {
                builder.append_option(value.and_then(|v| parse_bool(v.trim())));
            }
            Arc::new(builder.finish())
        }
        DataType::Int64 => {
            let mut builder = Int64Builder::new();
            for value in &cells {
                builder.append_option(value.and_then(|v| v.trim().parse::<i64>().ok()));
            }
            Arc::new(builder.finish())
        }
        DataType::Float64 => {
            let mut builder = Float64Builder::new();
            for value in &cells {
                builder.append_option(value.and_then(|v| parse_float(v.trim())));
            }
            Arc::new(builder.finish())
        }
        _ => {
            let mut builder = StringBuilder::new();
            for value in &cells {
                builder.append_option(*value);
            }
            Arc::new(builder.finish())
        }
    };

    (field.clone().with_data_type(data_type), array)
}

fn cell(array: &dyn Array, row: usize) -> MetadataValue {
    if array.is_null(row) {
        return MetadataValue::Missing;
    }
    let any = array.as_any();
    if let Some(values) = any.downcast_ref::<StringArray>() {
        MetadataValue::Text(values.value(row).to_string())
    } else if let Some(values) = any.downcast_ref::<Int64Array>() {
        MetadataValue::Integer(values.value(row))
    } else if let Some(values) = any.downcast_ref::<Float64Array>() {
        MetadataValue::Float(values.value(row))
    } else if let Some(values) = any.downcast_ref::<BooleanArray>() {
        MetadataValue::Boolean(values.value(row))
    } else {
        MetadataValue::Missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rr_core::{BALANCE_FIELD, CLASSIFICATION_FIELD};

    const METADATA: &str = "\
sample-id\tph\tsite\tdepth\tcontrol
S1\t6.5\tgut\t10\tfalse
S2\tN/A\tskin\t\ttrue
S3\t7.25\tgut feces\t30
";

    fn metadata() -> SampleMetadata {
        SampleMetadata::read(METADATA.as_bytes(), &SchemaDetector::new()).unwrap()
    }

    #[test]
    fn test_read_typed_metadata() {
        let md = metadata();
        assert_eq!(md.ids(), ["S1", "S2", "S3"]);
        assert_eq!(md.columns(), ["ph", "site", "depth", "control"]);

        let schema = md.batch().schema();
        assert_eq!(schema.field(0).name(), SAMPLE_ID_FIELD);
        assert_eq!(schema.field(1).data_type(), &DataType::Float64);
        assert_eq!(schema.field(2).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(3).data_type(), &DataType::Int64);
        assert_eq!(schema.field(4).data_type(), &DataType::Boolean);

        assert_eq!(md.value("S1", "ph"), Some(MetadataValue::Float(6.5)));
        assert_eq!(md.value("S2", "ph"), Some(MetadataValue::Missing));
        assert_eq!(md.value("S2", "depth"), Some(MetadataValue::Missing));
        assert_eq!(md.value("S3", "control"), Some(MetadataValue::Missing));
        assert_eq!(md.value("S3", "site"), Some(MetadataValue::Text("gut feces".into())));
        assert_eq!(md.value("S1", SAMPLE_ID_FIELD), Some(MetadataValue::Text("S1".into())));
        assert_eq!(md.value("S9", "ph"), None);
        assert_eq!(md.value("S1", "nope"), None);
    }

    #[test]
    fn test_display_values() {
        assert_eq!(MetadataValue::Float(2.5).to_string(), "2.5");
        assert_eq!(MetadataValue::Integer(3).to_string(), "3");
        assert_eq!(MetadataValue::Boolean(true).to_string(), "true");
        assert_eq!(MetadataValue::Missing.to_string(), "");
    }

    #[test]
    fn test_subset_reorders_and_drops() {
        let md = metadata()
            .subset(&["S3".to_string(), "S9".to_string(), "S1".to_string()])
            .unwrap();
        assert_eq!(md.ids(), ["S3", "S1"]);
        assert_eq!(md.value("S3", "depth"), Some(MetadataValue::Integer(30)));
        assert_eq!(md.batch().num_rows(), 2);
    }

    #[test]
    fn test_reserved_columns() {
        let text = format!("id\t{BALANCE_FIELD}\nS1\t1\n");
        let md = SampleMetadata::read(text.as_bytes(), &SchemaDetector::new()).unwrap();
        assert!(matches!(
            md.check_column_names(&[BALANCE_FIELD]),
            Err(DataError::ReservedColumn(name)) if name == BALANCE_FIELD
        ));

        let text = format!("id\t{SAMPLE_ID_FIELD}\nS1\tx\n");
        let md = SampleMetadata::read(text.as_bytes(), &SchemaDetector::new()).unwrap();
        assert!(md.check_column_names(&[]).is_err());
    }

    #[test]
    fn test_duplicate_samples_are_rejected() {
        let err = SampleMetadata::read("id\tx\nS1\t1\nS1\t2\n".as_bytes(), &SchemaDetector::new())
            .unwrap_err();
        assert!(matches!(err, DataError::DuplicateId { kind: "sample", .. }));
    }

    #[test]
    fn test_column_widens_when_later_rows_do_not_fit() {
        let detector = SchemaDetector::new().with_sample_size(2);
        let md = SampleMetadata::read(
            "id\tdepth\tph\nS1\t1\t6.5\nS2\t2\t7\nS3\tdeep\t7.5\n".as_bytes(),
            &detector,
        )
        .unwrap();

        let schema = md.batch().schema();
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(2).data_type(), &DataType::Float64);
        assert_eq!(md.value("S1", "depth"), Some(MetadataValue::Text("1".into())));
        assert_eq!(md.value("S3", "depth"), Some(MetadataValue::Text("deep".into())));
        assert_eq!(md.value("S3", "ph"), Some(MetadataValue::Float(7.5)));
    }

    #[test]
    fn test_nulls_past_the_sampled_rows_keep_the_type() {
        let detector = SchemaDetector::new().with_sample_size(1);
        let md = SampleMetadata::read("id\tdepth\nS1\t1\nS2\tNA\nS3\t3\n".as_bytes(), &detector)
            .unwrap();
        assert_eq!(md.batch().schema().field(1).data_type(), &DataType::Int64);
        assert_eq!(md.value("S2", "depth"), Some(MetadataValue::Missing));
        assert_eq!(md.value("S3", "depth"), Some(MetadataValue::Integer(3)));
    }

    #[test]
    fn test_feature_metadata_is_keyed_by_feature_id() {
        let md = FeatureMetadata::read(
            "taxon\tTaxonomy\tConfidence\nA\tk__Bacteria\t0.9\nB\tk__Archaea\t0.75\n".as_bytes(),
            &SchemaDetector::new(),
        )
        .unwrap();
        assert_eq!(md.batch().schema().field(0).name(), FEATURE_ID_FIELD);
        assert_eq!(md.ids(), ["A", "B"]);
        assert_eq!(md.value("B", "Confidence"), Some(MetadataValue::Float(0.75)));
        assert_eq!(md.value("A", FEATURE_ID_FIELD), Some(MetadataValue::Text("A".into())));

        let text = format!("taxon\t{FEATURE_ID_FIELD}\t{CLASSIFICATION_FIELD}\nA\tx\ty\n");
        let md = FeatureMetadata::read(text.as_bytes(), &SchemaDetector::new()).unwrap();
        assert!(matches!(
            md.check_column_names(&[]),
            Err(DataError::ReservedColumn(name)) if name == FEATURE_ID_FIELD
        ));

        let err = FeatureMetadata::read("taxon\tx\nA\t1\nA\t2\n".as_bytes(), &SchemaDetector::new())
            .unwrap_err();
        assert!(matches!(err, DataError::DuplicateId { kind: "feature", .. }));
    }
}
