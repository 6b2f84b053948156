//! Dense feature-by-sample count table

use ahash::{AHashMap, AHashSet};
use indexmap::IndexMap;
use rr_core::{AbundanceSource, FeatureId, SampleId, SelectionError};

use crate::{DataError, Result};

/// Nested count mapping: feature ID -> sample ID -> count
pub type NestedCounts = IndexMap<FeatureId, IndexMap<SampleId, f64>>;

/// Immutable count table shared by a whole session.
///
/// Every feature row has one value per sample in the shared sample index;
/// this is enforced when the store is built, so lookups only need to check
/// that the sample is known.
#[derive(Debug, Clone)]
pub struct CountStore {
    name: String,
    feature_ids: Vec<FeatureId>,
    sample_ids: Vec<SampleId>,
    feature_index: AHashMap<FeatureId, usize>,
    sample_index: AHashMap<SampleId, usize>,
    /// One row per feature, one column per sample
    rows: Vec<Vec<f64>>,
}

impl CountStore {
    /// Build a store from rows that are already aligned to `sample_ids`
    pub fn from_rows(
        name: impl Into<String>,
        sample_ids: Vec<SampleId>,
        rows: Vec<(FeatureId, Vec<f64>)>,
    ) -> Result<Self> {
        let sample_index = index_ids(&sample_ids, "sample")?;

        let mut feature_ids = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len());
        for (feature, row) in rows {
            if row.len() != sample_ids.len() {
                return Err(DataError::InvalidTable(format!(
                    "feature {} has {} counts but the table has {} samples",
                    feature,
                    row.len(),
                    sample_ids.len()
                )));
            }
            if let Some((column, value)) = row
                .iter()
                .enumerate()
                .find(|(_, v)| !v.is_finite() || **v < 0.0)
            {
                return Err(DataError::InvalidCount {
                    feature,
                    sample: sample_ids[column].clone(),
                    value: value.to_string(),
                });
            }
            feature_ids.push(feature);
            values.push(row);
        }
        let feature_index = index_ids(&feature_ids, "feature")?;

        tracing::debug!(
            features = feature_ids.len(),
            samples = sample_ids.len(),
            "Built count store"
        );

        Ok(Self {
            name: name.into(),
            feature_ids,
            sample_ids,
            feature_index,
            sample_index,
            rows: values,
        })
    }

    /// Build a store from a nested mapping in which every feature lists the
    /// same samples. The sample order is taken from the first feature.
    pub fn from_nested(name: impl Into<String>, counts: NestedCounts) -> Result<Self> {
        let Some((first, first_samples)) = counts.first() else {
            return Self::from_rows(name, Vec::new(), Vec::new());
        };
        let first = first.clone();
        let sample_ids: Vec<SampleId> = first_samples.keys().cloned().collect();
        let expected: AHashSet<&SampleId> = sample_ids.iter().collect();

        let mut rows = Vec::with_capacity(counts.len());
        for (feature, samples) in &counts {
            if samples.len() != expected.len() || !samples.keys().all(|s| expected.contains(s)) {
                return Err(DataError::InconsistentSamples {
                    feature: feature.clone(),
                    first,
                });
            }
            let row = sample_ids.iter().map(|s| samples[s]).collect();
            rows.push((feature.clone(), row));
        }

        Self::from_rows(name, sample_ids, rows)
    }

    /// Build a store from a sparse nested mapping where zero counts are
    /// omitted. Missing entries become zero; samples outside `sample_ids`
    /// are an error.
    pub fn from_sparse(
        name: impl Into<String>,
        counts: NestedCounts,
        sample_ids: Vec<SampleId>,
    ) -> Result<Self> {
        let sample_index = index_ids(&sample_ids, "sample")?;

        let mut rows = Vec::with_capacity(counts.len());
        for (feature, samples) in counts {
            let mut row = vec![0.0; sample_ids.len()];
            for (sample, value) in samples {
                let column = *sample_index.get(&sample).ok_or_else(|| {
                    DataError::InvalidTable(format!(
                        "feature {feature} has a count for unlisted sample {sample}"
                    ))
                })?;
                row[column] = value;
            }
            rows.push((feature, row));
        }

        Self::from_rows(name, sample_ids, rows)
    }

    pub fn feature_count(&self) -> usize {
        self.feature_ids.len()
    }

    pub fn sample_count(&self) -> usize {
        self.sample_ids.len()
    }

    /// Counts of one feature across all samples, in sample order
    pub fn row(&self, feature: &str) -> Option<&[f64]> {
        self.feature_index
            .get(feature)
            .map(|&idx| self.rows[idx].as_slice())
    }

    /// Whether every feature has a zero count in `sample`
    pub fn sample_is_empty(&self, sample: &str) -> bool {
        match self.sample_index.get(sample) {
            Some(&column) => self.rows.iter().all(|row| row[column] == 0.0),
            None => true,
        }
    }

    /// Keep only the listed features and samples, in the listed order.
    /// IDs that are not in the table are ignored.
    pub fn subset(&self, features: &[FeatureId], samples: &[SampleId]) -> Result<Self> {
        let columns: Vec<(SampleId, usize)> = samples
            .iter()
            .filter_map(|s| self.sample_index.get(s).map(|&c| (s.clone(), c)))
            .collect();

        let rows = features
            .iter()
            .filter_map(|f| {
                self.feature_index.get(f).map(|&idx| {
                    let row = columns.iter().map(|(_, c)| self.rows[idx][*c]).collect();
                    (f.clone(), row)
                })
            })
            .collect();

        Self::from_rows(
            self.name.clone(),
            columns.into_iter().map(|(s, _)| s).collect(),
            rows,
        )
    }

    /// Drop samples and features whose counts are all zero.
    ///
    /// Fails when nothing would be left.
    pub fn without_empty(&self) -> Result<Self> {
        let samples: Vec<SampleId> = self
            .sample_ids
            .iter()
            .filter(|s| !self.sample_is_empty(s))
            .cloned()
            .collect();
        let features: Vec<FeatureId> = self
            .feature_ids
            .iter()
            .zip(&self.rows)
            .filter(|(_, row)| row.iter().any(|v| *v != 0.0))
            .map(|(f, _)| f.clone())
            .collect();

        if samples.is_empty() || features.is_empty() {
            return Err(DataError::InvalidTable("The table is empty.".to_string()));
        }

        let dropped_samples = self.sample_count() - samples.len();
        let dropped_features = self.feature_count() - features.len();
        if dropped_samples > 0 {
            tracing::info!("Removed {} empty sample(s).", dropped_samples);
        }
        if dropped_features > 0 {
            tracing::info!("Removed {} empty feature(s).", dropped_features);
        }

        self.subset(&features, &samples)
    }
}

impl AbundanceSource for CountStore {
    fn abundance(&self, feature: &str, sample: &str) -> rr_core::Result<f64> {
        let column = *self
            .sample_index
            .get(sample)
            .ok_or_else(|| SelectionError::InvalidSample(sample.to_string()))?;
        let row = self
            .feature_index
            .get(feature)
            .ok_or_else(|| SelectionError::UnknownFeature(feature.to_string()))?;
        Ok(self.rows[*row][column])
    }

    fn validate_sample(&self, sample: &str) -> rr_core::Result<()> {
        if self.sample_index.contains_key(sample) {
            Ok(())
        } else {
            Err(SelectionError::InvalidSample(sample.to_string()))
        }
    }

    fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    fn contains_feature(&self, feature: &str) -> bool {
        self.feature_index.contains_key(feature)
    }

    fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

/// Position of every ID, rejecting duplicates
pub(crate) fn index_ids(ids: &[String], kind: &'static str) -> Result<AHashMap<String, usize>> {
    let mut index = AHashMap::with_capacity(ids.len());
    for (idx, id) in ids.iter().enumerate() {
        if index.insert(id.clone(), idx).is_some() {
            return Err(DataError::DuplicateId {
                kind,
                id: id.clone(),
            });
        }
    }
    Ok(index)
}
