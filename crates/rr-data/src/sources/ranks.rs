use std::io::Read;
use std::path::Path;

use ahash::AHashMap;
use rr_core::{FeatureId, FEATURE_ID_FIELD};

use super::{file_name, open, tsv_reader};
use crate::count_store::index_ids;
use crate::schema::parse_float;
use crate::{DataError, Result};

/// Per-feature rank values, one column per ranking
#[derive(Debug, Clone, Default)]
pub struct FeatureRanks {
    rank_names: Vec<String>,
    feature_ids: Vec<FeatureId>,
    feature_index: AHashMap<FeatureId, usize>,
    /// One row per feature, one value per ranking
    values: Vec<Vec<f64>>,
}

impl FeatureRanks {
    pub fn new(rank_names: Vec<String>, rows: Vec<(FeatureId, Vec<f64>)>) -> Result<Self> {
        index_ids(&rank_names, "ranking")?;
        if rank_names.is_empty() {
            return Err(DataError::InvalidTable("no rankings found".to_string()));
        }

        let mut feature_ids = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len());
        for (feature, row) in rows {
            if row.len() != rank_names.len() {
                return Err(DataError::InvalidTable(format!(
                    "feature {} has {} ranks but there are {} rankings",
                    feature,
                    row.len(),
                    rank_names.len()
                )));
            }
            feature_ids.push(feature);
            values.push(row);
        }
        let feature_index = index_ids(&feature_ids, "feature")?;

        Ok(Self {
            rank_names,
            feature_ids,
            feature_index,
            values,
        })
    }

    /// Load a ranks table; the first column holds feature IDs
    pub fn load(path: &Path) -> Result<Self> {
        let ranks = Self::read(open(path)?)?;
        tracing::info!(
            source = %file_name(path),
            features = ranks.feature_count(),
            rankings = ranks.rank_names.len(),
            "Loaded feature ranks"
        );
        Ok(ranks)
    }

    pub fn read<R: Read>(reader: R) -> Result<Self> {
        let mut tsv = tsv_reader(reader, false);
        let headers = tsv.headers()?.clone();
        let rank_names: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in tsv.records() {
            let record = record?;
            let mut fields = record.iter();
            let feature = fields.next().unwrap_or_default().to_string();
            let ranks = fields
                .zip(&rank_names)
                .map(|(value, ranking)| {
                    parse_float(value.trim()).ok_or_else(|| {
                        DataError::InvalidTable(format!(
                            "rank {value:?} of feature {feature} in {ranking} is not a number"
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            rows.push((feature, ranks));
        }

        Self::new(rank_names, rows)
    }

    /// Names of the rankings, in column order
    pub fn rank_names(&self) -> &[String] {
        &self.rank_names
    }

    pub fn feature_ids(&self) -> &[FeatureId] {
        &self.feature_ids
    }

    pub fn feature_count(&self) -> usize {
        self.feature_ids.len()
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.feature_index.contains_key(feature)
    }

    /// Every rank of one feature, in ranking order
    pub fn ranks_of(&self, feature: &str) -> Option<&[f64]> {
        self.feature_index
            .get(feature)
            .map(|&idx| self.values[idx].as_slice())
    }

    pub fn rank(&self, feature: &str, ranking: &str) -> Option<f64> {
        let column = self.rank_names.iter().position(|r| r == ranking)?;
        self.ranks_of(feature).map(|row| row[column])
    }

    /// Fail if a ranking is named after the feature ID column or another
    /// field the rank view adds itself
    pub fn check_column_names(&self, reserved: &[&str]) -> Result<()> {
        match self
            .rank_names
            .iter()
            .find(|name| name.as_str() == FEATURE_ID_FIELD || reserved.contains(&name.as_str()))
        {
            Some(name) => Err(DataError::ReservedColumn(name.clone())),
            None => Ok(()),
        }
    }

    /// Keep only the listed features, in the listed order
    pub fn subset(&self, features: &[FeatureId]) -> Result<Self> {
        let rows = features
            .iter()
            .filter_map(|f| self.ranks_of(f).map(|row| (f.clone(), row.to_vec())))
            .collect();
        Self::new(self.rank_names.clone(), rows)
    }

    /// Rename every ranking with `escape(..)`, failing if two names collide
    pub fn escape_columns(&self, escape: impl Fn(&str) -> String) -> Result<Self> {
        let rank_names = self.rank_names.iter().map(|r| escape(r)).collect();
        let rows = self
            .feature_ids
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect();
        Self::new(rank_names, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rr_core::CLASSIFICATION_FIELD;

    const RANKS: &str = "Feature ID\tIntercept\tTreatment\nA\t0.5\t-1.25\nB\t1\t2\n";

    #[test]
    fn test_read_ranks() {
        let ranks = FeatureRanks::read(RANKS.as_bytes()).unwrap();
        assert_eq!(ranks.rank_names(), ["Intercept", "Treatment"]);
        assert_eq!(ranks.rank("A", "Treatment"), Some(-1.25));
        assert_eq!(ranks.rank("B", "Intercept"), Some(1.0));
        assert_eq!(ranks.rank("C", "Intercept"), None);
        assert_eq!(ranks.rank("A", "Nope"), None);
    }

    #[test]
    fn test_non_numeric_rank_is_rejected() {
        let err = FeatureRanks::read("id\tr\nA\thigh\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::InvalidTable(_)));
    }

    #[test]
    fn test_duplicate_features_are_rejected() {
        let err = FeatureRanks::read("id\tr\nA\t1\nA\t2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::DuplicateId { kind: "feature", .. }));
    }

    #[test]
    fn test_reserved_rank_names() {
        let ranks = FeatureRanks::read(
            format!("id\t{CLASSIFICATION_FIELD}\nA\t1\n").as_bytes(),
        )
        .unwrap();
        let err = ranks.check_column_names(&[CLASSIFICATION_FIELD]).unwrap_err();
        assert!(matches!(err, DataError::ReservedColumn(name) if name == CLASSIFICATION_FIELD));

        let ok = FeatureRanks::read(RANKS.as_bytes()).unwrap();
        assert!(ok.check_column_names(&[CLASSIFICATION_FIELD]).is_ok());
    }

    #[test]
    fn test_subset_keeps_requested_order() {
        let ranks = FeatureRanks::read(RANKS.as_bytes()).unwrap();
        let subset = ranks
            .subset(&["B".to_string(), "Z".to_string(), "A".to_string()])
            .unwrap();
        assert_eq!(subset.feature_ids(), ["B", "A"]);
    }
}
