//! Session driver: one JSON command per input line

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use rr_core::events::events::CountsLoaded;
use rr_core::events::EventBus;
use rr_core::{AbundanceSource, SelectionEvent, Session, SessionOutcome};
use rr_data::PreparedInputs;
use rr_views::{ExportConfig, ExportedFile, FeatureListPanel, LinkedViews};

/// Commands that act on the views rather than on the selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Command {
    /// Write the sample plot data as TSV
    Export,
    /// Write the selected feature lists as text
    ExportFeatures,
    /// Put another metadata field on the sample plot's x axis
    XField { field: String },
    /// Order the rank plot by another ranking
    RankField { field: String },
}

/// One parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Selection(SelectionEvent),
    Command(Command),
}

impl Line {
    pub fn parse(text: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(text).context("Input line is not valid JSON")?;
        if let Ok(event) = serde_json::from_value::<SelectionEvent>(value.clone()) {
            return Ok(Line::Selection(event));
        }
        let command = serde_json::from_value::<Command>(value)
            .with_context(|| format!("Unrecognized command: {text}"))?;
        Ok(Line::Command(command))
    }
}

/// Result of one executed line
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Session(SessionOutcome),
    Exported(PathBuf),
    /// The export would have been empty, so nothing was written
    NothingToExport,
    FieldChanged,
}

/// Counts of executed and failed lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub handled: usize,
    pub failed: usize,
}

/// Owns a session and its linked views
pub struct Driver {
    session: Session,
    views: LinkedViews,
    export: ExportConfig,
}

impl Driver {
    pub fn new(inputs: PreparedInputs, export: ExportConfig) -> Self {
        let views = LinkedViews::new(&inputs);
        let sync_manager = Arc::new(views.sync_manager());

        let event_bus = Arc::new(EventBus::new());
        FeatureListPanel::attach(views.feature_list.clone(), &event_bus);

        let source: Arc<dyn AbundanceSource> = Arc::new(inputs.counts);
        event_bus.publish(CountsLoaded {
            source_name: source.source_name().to_string(),
            feature_count: source.feature_ids().len(),
            sample_count: source.sample_ids().len(),
        });
        info!(
            features = source.feature_ids().len(),
            samples = source.sample_ids().len(),
            rankings = inputs.ranks.rank_names().len(),
            "Session ready"
        );

        let session = Session::new(source, sync_manager).with_event_bus(event_bus);
        Self {
            session,
            views,
            export,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn views(&self) -> &LinkedViews {
        &self.views
    }

    pub fn execute(&mut self, line: &Line) -> Result<CommandOutcome> {
        match line {
            Line::Selection(event) => {
                let outcome = self.session.handle(event)?;
                Ok(CommandOutcome::Session(outcome))
            }
            Line::Command(Command::Export) => {
                let file = self.views.sample_plot.read().export(None);
                self.write(file, &self.export.sample_file)
            }
            Line::Command(Command::ExportFeatures) => {
                let file = self.views.feature_list.read().export_text();
                self.write(file, &self.export.feature_file)
            }
            Line::Command(Command::XField { field }) => {
                self.views.sample_plot.write().set_x_field(field)?;
                Ok(CommandOutcome::FieldChanged)
            }
            Line::Command(Command::RankField { field }) => {
                self.views.rank_plot.write().set_current_rank(field)?;
                Ok(CommandOutcome::FieldChanged)
            }
        }
    }

    fn write(&self, file: ExportedFile, file_name: &str) -> Result<CommandOutcome> {
        if file.is_empty() {
            warn!("Nothing to export yet");
            return Ok(CommandOutcome::NothingToExport);
        }
        std::fs::create_dir_all(&self.export.output_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                self.export.output_dir.display()
            )
        })?;
        let path = file.write_to(&self.export.output_dir, Some(file_name))?;
        Ok(CommandOutcome::Exported(path))
    }

    /// Execute every non-blank line of `reader`. A failing line is logged
    /// and skipped.
    pub fn run<R: BufRead>(&mut self, reader: R) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for (number, line) in reader.lines().enumerate() {
            let line = line.context("Failed to read input line")?;
            let text = line.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }

            summary.handled += 1;
            match Line::parse(text).and_then(|parsed| self.execute(&parsed)) {
                Ok(outcome) => info!(line = number + 1, ?outcome, "Handled"),
                Err(err) => {
                    summary.failed += 1;
                    error!(line = number + 1, "{err:#}");
                }
            }
        }
        Ok(summary)
    }
}
