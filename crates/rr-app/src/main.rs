//! Main application entry point

use std::io::{BufReader, Read};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rr_app::demo::{demo_inputs, DEMO_SCRIPT};
use rr_app::{AppConfig, Driver};

const USAGE: &str = "Usage: rankratio <config.json> [events.jsonl]\n       rankratio --demo";

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.first().map(String::as_str) == Some("--demo") {
        let config = AppConfig::default();
        init_tracing(&config.log_level);
        info!("Starting rankratio demo");

        let mut export = config.export;
        export.output_dir = std::env::temp_dir().join("rankratio-demo");
        let mut driver = Driver::new(demo_inputs()?, export);
        let summary = driver.run(DEMO_SCRIPT.as_bytes())?;
        info!(handled = summary.handled, failed = summary.failed, "Demo finished");
        return Ok(());
    }

    let (config_path, events_path) = match args.as_slice() {
        [config] => (PathBuf::from(config), None),
        [config, events] => (PathBuf::from(config), Some(PathBuf::from(events))),
        _ => bail!("{USAGE}"),
    };

    let config = AppConfig::load(&config_path)?;
    init_tracing(&config.log_level);
    info!("Starting rankratio with {}", config_path.display());

    let inputs = rr_data::load_inputs(&config.inputs).context("Failed to load inputs")?;
    let mut driver = Driver::new(inputs, config.export);

    let reader: Box<dyn Read> = match events_path {
        Some(path) => Box::new(
            std::fs::File::open(&path)
                .with_context(|| format!("Failed to open events file {}", path.display()))?,
        ),
        None => Box::new(std::io::stdin()),
    };
    let summary = driver.run(BufReader::new(reader))?;
    info!(handled = summary.handled, failed = summary.failed, "Session finished");
    Ok(())
}
