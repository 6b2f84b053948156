use std::path::Path;

use pretty_assertions::assert_eq;
use rr_app::{AppConfig, CommandOutcome, Driver, Line};
use rr_core::{Classification, SessionOutcome};
use rr_data::MetadataValue;

fn write(dir: &Path, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).unwrap();
}

fn driver(dir: &Path) -> Driver {
    write(
        dir,
        "table.tsv",
        "Feature ID\tS1\tS2\tS3\nA\t4\t0\t2\nB\t2\t2\t2\nC\t1\t3\t0\n",
    );
    write(
        dir,
        "ranks.tsv",
        "Feature ID\tIntercept\tTreatment\nA\t1.5\t-2\nB\t-0.5\t1\nC\t0.25\t0\n",
    );
    write(
        dir,
        "metadata.tsv",
        "sample\tsite\tph\nS1\tgut\t6.5\nS2\tleft palm\t7\nS3\tgut\tNA\n",
    );
    write(
        dir,
        "rankratio.json",
        r#"{
            "inputs": { "counts": "table.tsv", "ranks": "ranks.tsv", "metadata": "metadata.tsv" },
            "export": { "output_dir": "out" }
        }"#,
    );

    let config = AppConfig::load(&dir.join("rankratio.json")).unwrap();
    let inputs = rr_data::load_inputs(&config.inputs).unwrap();
    Driver::new(inputs, config.export)
}

fn exec(driver: &mut Driver, line: &str) -> CommandOutcome {
    driver.execute(&Line::parse(line).unwrap()).unwrap()
}

#[test]
fn test_click_pair_then_export() {
    let dir = tempfile::tempdir().unwrap();
    let mut driver = driver(dir.path());

    assert_eq!(
        exec(&mut driver, r#"{"kind":"export"}"#),
        CommandOutcome::NothingToExport
    );
    assert_eq!(
        exec(&mut driver, r#"{"kind":"singleClick","feature":"A"}"#),
        CommandOutcome::Session(SessionOutcome::AwaitingLow)
    );
    assert!(matches!(
        exec(&mut driver, r#"{"kind":"singleClick","feature":"B"}"#),
        CommandOutcome::Session(SessionOutcome::Applied(_))
    ));

    let rank_plot = driver.views().rank_plot.read();
    assert_eq!(rank_plot.classification("A"), Some(Classification::Numerator));
    assert_eq!(rank_plot.classification("B"), Some(Classification::Denominator));
    assert_eq!(rank_plot.classification("C"), Some(Classification::None));
    drop(rank_plot);

    let CommandOutcome::Exported(path) = exec(&mut driver, r#"{"kind":"export"}"#) else {
        panic!("sample plot data was not exported");
    };
    assert_eq!(path, dir.path().join("out").join("rankratio_sample_plot_data.tsv"));
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        format!(
            "Sample_ID\tLog_Ratio\tsite\nS1\t{}\tgut\nS3\t0\tgut",
            4f64.ln() - 2f64.ln()
        )
    );

    exec(&mut driver, r#"{"kind":"xField","field":"ph"}"#);
    exec(&mut driver, r#"{"kind":"export"}"#);
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        format!("Sample_ID\tLog_Ratio\tph\nS1\t{}\t6.5\nS3\t0\t", 4f64.ln() - 2f64.ln())
    );

    let CommandOutcome::Exported(features) = exec(&mut driver, r#"{"kind":"exportFeatures"}"#)
    else {
        panic!("feature lists were not exported");
    };
    assert_eq!(
        std::fs::read_to_string(features).unwrap(),
        "A\nDENOMINATOR FEATURES\nB"
    );
}

#[test]
fn test_run_continues_after_failures() {
    let dir = tempfile::tempdir().unwrap();
    let mut driver = driver(dir.path());

    let script = r#"
{"kind":"multiApply","topQuery":"A","topMode":"exact","botQuery":"[","botMode":"pattern"}
{"kind":"singleClick","feature":"Z"}
not json
{"kind":"rankField","field":"Nope"}

{"kind":"multiApply","topQuery":"^[AB]$","topMode":"pattern","botQuery":"^[BC]$","botMode":"pattern"}
{"kind":"rankField","field":"Treatment"}
"#;
    let summary = driver.run(script.as_bytes()).unwrap();
    assert_eq!(summary.handled, 6);
    assert_eq!(summary.failed, 4);

    let views = driver.views();
    assert_eq!(views.rank_plot.read().current_rank(), "Treatment");
    assert_eq!(
        views.rank_plot.read().classification("B"),
        Some(Classification::Both)
    );
    assert_eq!(
        views.feature_list.read().numerator_header(),
        "Numerator Features (2 selected)"
    );
    // S2: (0 + 2) / (2 + 3)
    let balance = views.sample_plot.read().balance("S2").unwrap();
    assert!((balance - (2f64 / 5.0).ln()).abs() < 1e-12);

    driver.run(r#"{"kind":"clear"}"#.as_bytes()).unwrap();
    assert_eq!(driver.views().sample_plot.read().balance("S2"), None);
    assert!(driver.views().feature_list.read().numerator().is_empty());
    assert!(driver.session().active_selection().is_none());
}

#[test]
fn test_feature_metadata_reaches_the_rank_plot() {
    let dir = tempfile::tempdir().unwrap();
    let _ = driver(dir.path());
    write(
        dir.path(),
        "taxonomy.tsv",
        "Feature ID\tTaxon\nC\tk__Archaea\nA\tk__Bacteria\n",
    );

    let mut config = AppConfig::load(&dir.path().join("rankratio.json")).unwrap();
    config.inputs.feature_metadata = Some(dir.path().join("taxonomy.tsv"));
    let driver = Driver::new(rr_data::load_inputs(&config.inputs).unwrap(), config.export);

    let rank_plot = driver.views().rank_plot.read();
    assert_eq!(rank_plot.metadata_columns(), ["Taxon"]);
    assert_eq!(
        rank_plot.metadata_value("C", "Taxon"),
        Some(&MetadataValue::Text("k__Archaea".into()))
    );
    assert_eq!(rank_plot.metadata_value("B", "Taxon"), Some(&MetadataValue::Missing));
}

#[test]
fn test_single_feature_table_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "table.tsv", "Feature ID\tS1\tS2\nA\t4\t1\n");
    let config = rr_data::InputConfig::new(dir.path().join("table.tsv"));
    let err = rr_data::load_inputs(&config).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid table: Less than 2 rows found in the count table."
    );
}
