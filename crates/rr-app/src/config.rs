//! Application configuration

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use rr_data::InputConfig;
use rr_views::ExportConfig;

/// Everything the binary reads from its JSON config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub inputs: InputConfig,
    pub export: ExportConfig,
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            inputs: InputConfig::default(),
            export: ExportConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Read a config file. Relative paths inside it are taken relative to
    /// the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.resolve_paths(base))
    }

    pub fn resolve_paths(mut self, base: &Path) -> Self {
        self.inputs = self.inputs.resolve_paths(base);
        if self.export.output_dir.is_relative() {
            self.export.output_dir = base.join(&self.export.output_dir);
        }
        self
    }
}
