use std::io::Read;

use rr_core::SampleId;

use super::{open, tsv_reader};
use crate::config::{CountsFormat, InputConfig};
use crate::count_store::{CountStore, NestedCounts};
use crate::{DataError, Result};

/// Load the count table named by `config`
pub fn load_counts(config: &InputConfig) -> Result<CountStore> {
    let name = config.counts_name();
    let reader = open(&config.counts)?;

    let store = match config.counts_format() {
        CountsFormat::Json => read_counts_json(&name, reader, config.sparse_samples.clone())?,
        CountsFormat::Tsv => read_counts_tsv(&name, reader)?,
    };

    tracing::info!(
        source = %name,
        features = store.feature_count(),
        samples = store.sample_count(),
        "Loaded count table"
    );
    Ok(store)
}

/// Read a nested `{feature: {sample: count}}` mapping. With `sparse_samples`
/// the mapping may omit zero counts.
pub fn read_counts_json<R: Read>(
    name: &str,
    reader: R,
    sparse_samples: Option<Vec<SampleId>>,
) -> Result<CountStore> {
    let nested: NestedCounts = serde_json::from_reader(reader)?;
    match sparse_samples {
        Some(samples) => CountStore::from_sparse(name, nested, samples),
        None => CountStore::from_nested(name, nested),
    }
}

/// Read a feature-by-sample table. The header names the samples after a
/// label for the feature ID column; each row starts with its feature ID.
pub fn read_counts_tsv<R: Read>(name: &str, reader: R) -> Result<CountStore> {
    let mut tsv = tsv_reader(reader, false);

    let headers = tsv.headers()?.clone();
    let sample_ids: Vec<SampleId> = headers.iter().skip(1).map(str::to_string).collect();
    if sample_ids.is_empty() {
        return Err(DataError::InvalidTable(format!(
            "{name} has no sample columns"
        )));
    }

    let mut rows = Vec::new();
    for record in tsv.records() {
        let record = record?;
        let mut fields = record.iter();
        let feature = fields.next().unwrap_or_default().to_string();

        let counts = fields
            .zip(&sample_ids)
            .map(|(value, sample)| {
                value.trim().parse::<f64>().map_err(|_| DataError::InvalidCount {
                    feature: feature.clone(),
                    sample: sample.clone(),
                    value: value.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push((feature, counts));
    }

    CountStore::from_rows(name, sample_ids, rows)
}
