//! Where the count table, feature ranks and metadata come from

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::null_handling::NullConfig;
use rr_core::SampleId;

/// On-disk format of the count table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountsFormat {
    /// Nested mapping `{feature: {sample: count}}`
    Json,
    /// Feature-by-sample table; first column holds feature IDs
    Tsv,
}

/// Input files for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Path to the count table
    pub counts: PathBuf,

    /// Format of the count table; inferred from the extension when unset
    pub counts_format: Option<CountsFormat>,

    /// When set, the JSON count mapping is sparse (zero counts omitted) and
    /// is densified against these samples
    pub sparse_samples: Option<Vec<SampleId>>,

    /// Optional feature ranks table
    pub ranks: Option<PathBuf>,

    /// Optional sample metadata table
    pub metadata: Option<PathBuf>,

    /// Optional feature metadata table, keyed by feature ID
    pub feature_metadata: Option<PathBuf>,

    /// Missing-value patterns for the metadata table
    pub null_config: NullConfig,

    /// Drop samples and features whose counts are all zero
    pub remove_empty: bool,

    /// Rows sampled for metadata type detection
    pub sample_size: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            counts: PathBuf::new(),
            counts_format: None,
            sparse_samples: None,
            ranks: None,
            metadata: None,
            feature_metadata: None,
            null_config: NullConfig::default(),
            remove_empty: true,
            sample_size: 1000,
        }
    }
}

impl InputConfig {
    pub fn new(counts: impl Into<PathBuf>) -> Self {
        Self {
            counts: counts.into(),
            ..Self::default()
        }
    }

    /// Format of the count table, falling back to the file extension
    pub fn counts_format(&self) -> CountsFormat {
        self.counts_format.unwrap_or_else(|| {
            match self.counts.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("json") => CountsFormat::Json,
                _ => CountsFormat::Tsv,
            }
        })
    }

    /// Name shown for the count table
    pub fn counts_name(&self) -> String {
        self.counts
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string()
    }

    /// Resolve relative paths against `base`, usually the directory holding
    /// the config file
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.counts);
        for path in [self.ranks.as_mut(), self.metadata.as_mut(), self.feature_metadata.as_mut()]
            .into_iter()
            .flatten()
        {
            resolve(path);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(InputConfig::new("counts.json").counts_format(), CountsFormat::Json);
        assert_eq!(InputConfig::new("counts.tsv").counts_format(), CountsFormat::Tsv);

        let forced = InputConfig {
            counts_format: Some(CountsFormat::Json),
            ..InputConfig::new("counts.txt")
        };
        assert_eq!(forced.counts_format(), CountsFormat::Json);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: InputConfig = serde_json::from_str(
            r#"{"counts": "table.tsv", "metadata": "samples.tsv", "remove_empty": false}"#,
        )
        .unwrap();
        assert_eq!(config.counts, PathBuf::from("table.tsv"));
        assert_eq!(config.metadata, Some(PathBuf::from("samples.tsv")));
        assert!(config.ranks.is_none());
        assert!(!config.remove_empty);
        assert_eq!(config.null_config, NullConfig::default());
    }

    #[test]
    fn test_relative_paths_are_resolved() {
        let config = InputConfig {
            ranks: Some(PathBuf::from("ranks.tsv")),
            feature_metadata: Some(PathBuf::from("taxonomy.tsv")),
            ..InputConfig::new("/abs/counts.json")
        }
        .resolve_paths(Path::new("/data"));
        assert_eq!(config.counts, PathBuf::from("/abs/counts.json"));
        assert_eq!(config.ranks, Some(PathBuf::from("/data/ranks.tsv")));
        assert_eq!(config.feature_metadata, Some(PathBuf::from("/data/taxonomy.tsv")));
        assert!(config.metadata.is_none());
    }
}
