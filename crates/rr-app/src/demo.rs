//! Demo mode
//! Builds a small synthetic dataset and a scripted session over it

use anyhow::Result;

use rr_data::{
    prepare, CountStore, FeatureMetadata, FeatureRanks, InputConfig, PreparedInputs,
    SampleMetadata, SchemaDetector,
};

const FEATURES: usize = 12;
const SAMPLES: usize = 8;

/// Commands the demo feeds through the driver
pub const DEMO_SCRIPT: &str = r#"
{"kind":"singleClick","feature":"Taxon_03"}
{"kind":"singleClick","feature":"Taxon_07"}
{"kind":"export"}
{"kind":"multiApply","topQuery":"Taxon_0","topMode":"partial","botQuery":"1[0-9]$","botMode":"pattern"}
{"kind":"xField","field":"ph"}
{"kind":"rankField","field":"Treatment"}
{"kind":"export"}
{"kind":"exportFeatures"}
{"kind":"clear"}
"#;

/// Synthetic counts, ranks and metadata. The last sample has no reads and
/// is dropped during preparation. Only every other feature has a taxonomy
/// entry.
pub fn demo_inputs() -> Result<PreparedInputs> {
    let sample_ids: Vec<String> = (1..=SAMPLES).map(|s| format!("S{s:02}")).collect();

    let rows = (0..FEATURES)
        .map(|f| {
            let counts = (0..SAMPLES)
                .map(|s| {
                    if s == SAMPLES - 1 || (f + s) % 5 == 0 {
                        0.0
                    } else {
                        ((f * 7 + s * 13) % 40 + 1) as f64
                    }
                })
                .collect();
            (format!("Taxon_{:02}", f + 1), counts)
        })
        .collect();
    let counts = CountStore::from_rows("demo", sample_ids.clone(), rows)?;

    let ranks = FeatureRanks::new(
        vec!["Intercept".to_string(), "Treatment".to_string()],
        (0..FEATURES)
            .map(|f| {
                let x = f as f64;
                (
                    format!("Taxon_{:02}", f + 1),
                    vec![(x * 0.7).sin() * 2.0, x - FEATURES as f64 / 2.0],
                )
            })
            .collect(),
    )?;

    let headers = ["sample", "body_site", "ph", "treated"]
        .into_iter()
        .map(String::from)
        .collect();
    let metadata_rows = sample_ids
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            let site = if i % 2 == 0 { "gut" } else { "left palm" };
            let ph = if i == 3 {
                "NA".to_string()
            } else {
                format!("{:.1}", 5.5 + i as f64 * 0.25)
            };
            vec![sample.clone(), site.to_string(), ph, (i < SAMPLES / 2).to_string()]
        })
        .collect();
    let metadata = SampleMetadata::from_rows(headers, metadata_rows, &SchemaDetector::new())?;

    let taxonomy_rows = (0..FEATURES)
        .step_by(2)
        .map(|f| {
            let phylum = if f % 4 == 0 { "p__Firmicutes" } else { "p__Bacteroidetes" };
            vec![format!("Taxon_{:02}", f + 1), format!("k__Bacteria;{phylum}")]
        })
        .collect();
    let taxonomy = FeatureMetadata::from_rows(
        vec!["feature".to_string(), "Taxonomy".to_string()],
        taxonomy_rows,
        &SchemaDetector::new(),
    )?;

    Ok(prepare(
        counts,
        Some(ranks),
        Some(metadata),
        Some(taxonomy),
        &InputConfig::default(),
    )?)
}
