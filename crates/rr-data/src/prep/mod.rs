//! Validation and alignment of the count table, ranks and metadata

use rr_core::{AbundanceSource, FeatureId, SampleId, BALANCE_FIELD, CLASSIFICATION_FIELD};

use crate::config::InputConfig;
use crate::count_store::CountStore;
use crate::schema::SchemaDetector;
use crate::sources::{load_counts, FeatureMetadata, FeatureRanks, SampleMetadata};
use crate::{DataError, Result};

/// Inputs that agree with each other and are ready to drive a session
#[derive(Debug, Clone)]
pub struct PreparedInputs {
    pub counts: CountStore,
    pub ranks: FeatureRanks,
    pub metadata: SampleMetadata,
    /// Feature metadata for the ranked features; no columns when none was
    /// given
    pub feature_metadata: FeatureMetadata,
}

/// Load every input named by `config` and prepare them
pub fn load_inputs(config: &InputConfig) -> Result<PreparedInputs> {
    let counts = load_counts(config)?;
    let ranks = config
        .ranks
        .as_deref()
        .map(FeatureRanks::load)
        .transpose()?;
    let detector = SchemaDetector::new()
        .with_sample_size(config.sample_size)
        .with_nulls(config.null_config.clone());
    let metadata = config
        .metadata
        .as_deref()
        .map(|path| SampleMetadata::load(path, &detector))
        .transpose()?;
    let feature_metadata = config
        .feature_metadata
        .as_deref()
        .map(|path| FeatureMetadata::load(path, &detector))
        .transpose()?;

    prepare(counts, ranks, metadata, feature_metadata, config)
}

/// Check, align and clean the inputs.
///
/// Without a ranks table the features are ranked by table order; without
/// metadata every sample of the table is kept with no metadata columns.
/// Feature metadata is optional and need not cover every feature.
pub fn prepare(
    counts: CountStore,
    ranks: Option<FeatureRanks>,
    metadata: Option<SampleMetadata>,
    feature_metadata: Option<FeatureMetadata>,
    config: &InputConfig,
) -> Result<PreparedInputs> {
    validate_shape(&counts, "count table", 2, 1)?;

    let ranks = match ranks {
        Some(ranks) => ranks,
        None => table_order_ranks(counts.feature_ids())?,
    };
    let metadata = match metadata {
        Some(metadata) => metadata,
        None => SampleMetadata::ids_only(counts.sample_ids())?,
    };
    let feature_metadata = match feature_metadata {
        Some(feature_metadata) => feature_metadata,
        None => FeatureMetadata::ids_only(&[])?,
    };

    ranks.check_column_names(&[CLASSIFICATION_FIELD])?;
    metadata.check_column_names(&[BALANCE_FIELD])?;
    feature_metadata.check_column_names(&[CLASSIFICATION_FIELD])?;
    let ranks = ranks.escape_columns(fix_id)?;
    let metadata = metadata.escape_columns(fix_id)?;
    let feature_metadata = feature_metadata.escape_columns(fix_id)?;
    check_distinct_feature_columns(&ranks, &feature_metadata)?;

    let (mut counts, mut metadata) = match_table_and_data(&counts, &ranks, &metadata)?;
    let mut ranks = ranks.subset(counts.feature_ids())?;

    if config.remove_empty {
        counts = counts.without_empty()?;
        ranks = ranks.subset(counts.feature_ids())?;
        metadata = metadata.subset(counts.sample_ids())?;
    }
    let feature_metadata = feature_metadata.subset(counts.feature_ids())?;

    tracing::info!(
        features = counts.feature_count(),
        samples = counts.sample_count(),
        rankings = ranks.rank_names().len(),
        metadata_columns = metadata.columns().len(),
        feature_metadata_columns = feature_metadata.columns().len(),
        "Prepared inputs"
    );

    Ok(PreparedInputs {
        counts,
        ranks,
        metadata,
        feature_metadata,
    })
}

/// Fail when the table has fewer than `min_rows` features or fewer than
/// `min_cols` samples
pub fn validate_shape(
    counts: &CountStore,
    name: &str,
    min_rows: usize,
    min_cols: usize,
) -> Result<()> {
    if counts.feature_count() < min_rows {
        return Err(DataError::InvalidTable(format!(
            "Less than {min_rows} rows found in the {name}."
        )));
    }
    if counts.sample_count() < min_cols {
        return Err(DataError::InvalidTable(format!(
            "Less than {min_cols} columns found in the {name}."
        )));
    }
    Ok(())
}

/// Rank and feature metadata columns end up side by side in the rank plot,
/// so their names must not overlap
fn check_distinct_feature_columns(
    ranks: &FeatureRanks,
    feature_metadata: &FeatureMetadata,
) -> Result<()> {
    let shared: Vec<String> = feature_metadata
        .columns()
        .into_iter()
        .filter(|name| ranks.rank_names().contains(name))
        .collect();
    if shared.is_empty() {
        return Ok(());
    }
    Err(DataError::InvalidTable(format!(
        "Column names for the feature metadata and feature ranks must be distinct: {}",
        shared.join(", ")
    )))
}

/// Restrict the table to the ranked features and to the samples shared with
/// the metadata, and the metadata to the samples in the table.
///
/// Every ranked feature must be in the table, and at least one sample must
/// be shared.
pub fn match_table_and_data(
    counts: &CountStore,
    ranks: &FeatureRanks,
    metadata: &SampleMetadata,
) -> Result<(CountStore, SampleMetadata)> {
    let missing = ranks
        .feature_ids()
        .iter()
        .filter(|f| !counts.contains_feature(f))
        .count();
    if missing > 0 {
        let verb = if missing == 1 { "was" } else { "were" };
        return Err(DataError::InvalidTable(format!(
            "Of the {} ranked features, {} {} not present in the input table.",
            ranks.feature_count(),
            missing,
            verb
        )));
    }

    let features: Vec<FeatureId> = counts
        .feature_ids()
        .iter()
        .filter(|f| ranks.contains(f))
        .cloned()
        .collect();
    report_dropped(
        counts.feature_count() - features.len(),
        "feature",
        "count table",
        "feature ranks",
    );

    let samples: Vec<SampleId> = counts
        .sample_ids()
        .iter()
        .filter(|s| metadata.contains(s))
        .cloned()
        .collect();
    if samples.is_empty() {
        return Err(DataError::InvalidTable(
            "No samples are shared between the sample metadata and the count table.".to_string(),
        ));
    }
    report_dropped(
        metadata.len() - samples.len(),
        "sample",
        "sample metadata",
        "count table",
    );
    report_dropped(
        counts.sample_count() - samples.len(),
        "sample",
        "count table",
        "sample metadata",
    );

    Ok((counts.subset(&features, &samples)?, metadata.subset(&samples)?))
}

fn report_dropped(count: usize, item: &str, source: &str, basis: &str) {
    if count > 0 {
        tracing::warn!(
            "{} {}(s) in the {} were not present in the {} and have been removed.",
            count,
            item,
            source,
            basis
        );
    }
}

/// Escape characters that rendering collaborators treat as field-path syntax
pub fn fix_id(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            '.' => ':',
            '[' => '(',
            ']' => ')',
            '\'' | '"' | '\\' => '|',
            other => other,
        })
        .collect()
}

/// One ranking that follows the table's feature order
fn table_order_ranks(features: &[FeatureId]) -> Result<FeatureRanks> {
    let rows = features
        .iter()
        .enumerate()
        .map(|(idx, f)| (f.clone(), vec![idx as f64]))
        .collect();
    FeatureRanks::new(vec!["Table order".to_string()], rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn counts() -> CountStore {
        CountStore::from_rows(
            "counts",
            vec!["S1".into(), "S2".into(), "S3".into()],
            vec![
                ("A".into(), vec![1.0, 0.0, 2.0]),
                ("B".into(), vec![3.0, 0.0, 0.0]),
                ("C".into(), vec![0.0, 0.0, 0.0]),
                ("D".into(), vec![5.0, 0.0, 1.0]),
            ],
        )
        .unwrap()
    }

    fn ranks(text: &str) -> FeatureRanks {
        FeatureRanks::read(text.as_bytes()).unwrap()
    }

    fn metadata(text: &str) -> SampleMetadata {
        SampleMetadata::read(text.as_bytes(), &SchemaDetector::new()).unwrap()
    }

    #[test]
    fn test_fix_id() {
        assert_eq!(fix_id("a.b[0]"), "a:b(0)");
        assert_eq!(fix_id(r#"it's "x"\y"#), "it|s |x||y");
        assert_eq!(fix_id("plain"), "plain");
    }

    proptest! {
        #[test]
        fn test_fix_id_leaves_no_path_syntax(id in ".*") {
            let fixed = fix_id(&id);
            prop_assert!(!fixed.contains(['.', '[', ']', '\'', '"', '\\']));
            prop_assert_eq!(fixed.chars().count(), id.chars().count());
        }
    }

    #[test]
    fn test_unranked_table_features_are_dropped() {
        let (table, md) = match_table_and_data(
            &counts(),
            &ranks("id\tr\nA\t1\nD\t2\n"),
            &metadata("id\tx\nS1\ta\nS3\tb\nS9\tc\n"),
        )
        .unwrap();
        assert_eq!(table.feature_ids(), ["A", "D"]);
        assert_eq!(table.sample_ids(), ["S1", "S3"]);
        assert_eq!(md.ids(), ["S1", "S3"]);
    }

    #[test]
    fn test_ranked_features_missing_from_table() {
        let err = match_table_and_data(
            &counts(),
            &ranks("id\tr\nA\t1\nX\t2\nY\t3\n"),
            &metadata("id\tx\nS1\ta\n"),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid table: Of the 3 ranked features, 2 were not present in the input table."
        );

        let err = match_table_and_data(
            &counts(),
            &ranks("id\tr\nA\t1\nX\t2\n"),
            &metadata("id\tx\nS1\ta\n"),
        )
        .unwrap_err();
        assert!(err.to_string().ends_with("1 was not present in the input table."));
    }

    #[test]
    fn test_no_shared_samples() {
        let err = match_table_and_data(
            &counts(),
            &ranks("id\tr\nA\t1\n"),
            &metadata("id\tx\nS8\ta\nS9\tb\n"),
        )
        .unwrap_err();
        assert!(matches!(err, DataError::InvalidTable(msg) if msg.starts_with("No samples")));
    }

    #[test]
    fn test_prepare_removes_empty_samples_and_features() {
        let prepared = prepare(
            counts(),
            Some(ranks("id\tr.1\nA\t1\nB\t2\nC\t3\nD\t4\n")),
            Some(metadata("id\tph\nS1\t6\nS2\t7\nS3\t8\n")),
            None,
            &InputConfig::default(),
        )
        .unwrap();

        assert_eq!(prepared.counts.feature_ids(), ["A", "B", "D"]);
        assert_eq!(prepared.counts.sample_ids(), ["S1", "S3"]);
        assert_eq!(prepared.ranks.feature_ids(), ["A", "B", "D"]);
        assert_eq!(prepared.ranks.rank_names(), ["r:1"]);
        assert_eq!(prepared.metadata.ids(), ["S1", "S3"]);
    }

    #[test]
    fn test_prepare_can_keep_empty_samples() {
        let config = InputConfig {
            remove_empty: false,
            ..InputConfig::default()
        };
        let prepared = prepare(counts(), None, None, None, &config).unwrap();
        assert_eq!(prepared.counts.feature_ids(), ["A", "B", "C", "D"]);
        assert_eq!(prepared.counts.sample_ids(), ["S1", "S2", "S3"]);
        assert_eq!(prepared.ranks.rank("C", "Table order"), Some(2.0));
        assert!(prepared.metadata.columns().is_empty());
    }

    #[test]
    fn test_prepare_rejects_reserved_columns() {
        let err = prepare(
            counts(),
            Some(ranks("id\tFeature ID\nA\t1\n")),
            None,
            None,
            &InputConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DataError::ReservedColumn(_)));
    }

    #[test]
    fn test_escaping_collision_is_rejected() {
        let err = prepare(
            counts(),
            Some(ranks("id\ta.b\ta:b\nA\t1\t2\n")),
            None,
            None,
            &InputConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DataError::DuplicateId { .. }));
    }

    #[test]
    fn test_load_inputs_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, text: &str| {
            let path = dir.path().join(name);
            std::fs::write(&path, text).unwrap();
            path
        };
        let config = InputConfig {
            ranks: Some(write("ranks.tsv", "Feature ID\tr\nA\t0.5\nD\t-1\n")),
            metadata: Some(write("md.tsv", "id\tph\nS1\tN/A\nS3\t7.5\n")),
            feature_metadata: Some(write("fm.tsv", "Feature ID\tTaxon\nA\tk__Bacteria\n")),
            ..InputConfig::new(write("counts.tsv", "id\tS1\tS2\tS3\nA\t1\t0\t2\nD\t5\t0\t1\n"))
        };

        let prepared = load_inputs(&config).unwrap();
        assert_eq!(prepared.counts.sample_ids(), ["S1", "S3"]);
        assert_eq!(prepared.ranks.rank("D", "r"), Some(-1.0));
        assert_eq!(
            prepared.metadata.value("S1", "ph"),
            Some(crate::sources::MetadataValue::Missing)
        );
        assert_eq!(prepared.feature_metadata.ids(), ["A"]);
    }

    fn feature_metadata(text: &str) -> FeatureMetadata {
        FeatureMetadata::read(text.as_bytes(), &SchemaDetector::new()).unwrap()
    }

    #[test]
    fn test_count_table_needs_two_features_and_a_sample() {
        let one_feature =
            CountStore::from_rows("counts", vec!["S1".into()], vec![("A".into(), vec![1.0])])
                .unwrap();
        let err = prepare(one_feature, None, None, None, &InputConfig::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid table: Less than 2 rows found in the count table."
        );

        let no_samples = CountStore::from_rows(
            "counts",
            vec![],
            vec![("A".into(), vec![]), ("B".into(), vec![])],
        )
        .unwrap();
        let err = validate_shape(&no_samples, "count table", 2, 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid table: Less than 1 columns found in the count table."
        );

        assert!(validate_shape(&counts(), "count table", 2, 1).is_ok());
    }

    #[test]
    fn test_feature_metadata_follows_the_final_features() {
        let prepared = prepare(
            counts(),
            Some(ranks("id\tr\nA\t1\nB\t2\nC\t3\nD\t4\n")),
            None,
            Some(feature_metadata(
                "id\tTaxon.name\nD\tk__Archaea\nA\tk__Bacteria\nZ\tk__Fungi\n",
            )),
            &InputConfig::default(),
        )
        .unwrap();

        assert_eq!(prepared.feature_metadata.columns(), ["Taxon:name"]);
        assert_eq!(prepared.feature_metadata.ids(), ["A", "D"]);
        assert_eq!(
            prepared.feature_metadata.value("D", "Taxon:name"),
            Some(crate::sources::MetadataValue::Text("k__Archaea".into()))
        );
        assert!(!prepared.feature_metadata.contains("Z"));

        let none = prepare(counts(), None, None, None, &InputConfig::default()).unwrap();
        assert!(none.feature_metadata.is_empty());
        assert!(none.feature_metadata.columns().is_empty());
    }

    #[test]
    fn test_feature_metadata_columns_must_differ_from_rankings() {
        let err = prepare(
            counts(),
            Some(ranks("id\tr.1\tIntercept\nA\t1\t2\n")),
            None,
            Some(feature_metadata("id\tr:1\tTaxon\nA\tx\ty\n")),
            &InputConfig::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid table: Column names for the feature metadata and feature ranks must be distinct: r:1"
        );

        let reserved = format!("id\t{CLASSIFICATION_FIELD}\nA\tx\n");
        let err = prepare(
            counts(),
            None,
            None,
            Some(feature_metadata(&reserved)),
            &InputConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DataError::ReservedColumn(name) if name == CLASSIFICATION_FIELD));
    }
}
