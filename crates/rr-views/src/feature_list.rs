//! Text panel listing the features of the current selection

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{json, Value};
use uuid::Uuid;

use rr_core::events::events::{SelectionApplied, SelectionCleared};
use rr_core::events::{handler_from_fn, EventBus};
use rr_core::{FeatureId, Selection};

use crate::export::{ExportFormat, ExportedFile, FEATURE_EXPORT_FILE};
use crate::{SpaceView, SpaceViewId, ViewError};

/// Numerator and denominator feature lists with their headers
pub struct FeatureListPanel {
    id: SpaceViewId,
    numerator: Vec<FeatureId>,
    denominator: Vec<FeatureId>,
}

impl FeatureListPanel {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            numerator: Vec::new(),
            denominator: Vec::new(),
        }
    }

    /// Show the features of `selection`
    pub fn show_selection(&mut self, selection: &Selection) {
        self.set_lists(
            selection.numerator().iter().map(|f| f.to_string()).collect(),
            selection.denominator().iter().map(|f| f.to_string()).collect(),
        );
    }

    fn set_lists(&mut self, numerator: Vec<FeatureId>, denominator: Vec<FeatureId>) {
        self.numerator = numerator;
        self.denominator = denominator;
        tracing::debug!(
            numerator = self.numerator.len(),
            denominator = self.denominator.len(),
            "Updated feature lists"
        );
    }

    pub fn clear(&mut self) {
        self.numerator.clear();
        self.denominator.clear();
    }

    pub fn numerator(&self) -> &[FeatureId] {
        &self.numerator
    }

    pub fn denominator(&self) -> &[FeatureId] {
        &self.denominator
    }

    pub fn numerator_header(&self) -> String {
        format!("Numerator Features ({} selected)", group_thousands(self.numerator.len()))
    }

    pub fn denominator_header(&self) -> String {
        format!(
            "Denominator Features ({} selected)",
            group_thousands(self.denominator.len())
        )
    }

    /// One feature per line: the numerator list, a `DENOMINATOR FEATURES`
    /// line, then the denominator list
    pub fn export_text(&self) -> ExportedFile {
        let mut lines: Vec<&str> = self.numerator.iter().map(String::as_str).collect();
        lines.push("DENOMINATOR FEATURES");
        lines.extend(self.denominator.iter().map(String::as_str));

        ExportedFile {
            file_name: FEATURE_EXPORT_FILE.to_string(),
            format: ExportFormat::Text,
            contents: lines.join("\n"),
        }
    }

    /// Keep `panel` in step with the selections published on `bus`
    pub fn attach(panel: Arc<RwLock<Self>>, bus: &EventBus) {
        let on_applied = panel.clone();
        bus.subscribe::<SelectionApplied>(handler_from_fn(move |event| {
            if let Some(applied) = event.as_any().downcast_ref::<SelectionApplied>() {
                on_applied
                    .write()
                    .set_lists(applied.numerator.clone(), applied.denominator.clone());
            }
        }));

        bus.subscribe::<SelectionCleared>(handler_from_fn(move |_| {
            panel.write().clear();
        }));
    }
}

impl Default for FeatureListPanel {
    fn default() -> Self {
        Self::new()
    }
}

fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

impl SpaceView for FeatureListPanel {
    fn id(&self) -> SpaceViewId {
        self.id
    }

    fn view_type(&self) -> &str {
        "FeatureListPanel"
    }

    fn title(&self) -> &str {
        "Selected features"
    }

    fn save_config(&self) -> Value {
        json!({})
    }

    fn load_config(&mut self, _config: Value) -> Result<(), ViewError> {
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
