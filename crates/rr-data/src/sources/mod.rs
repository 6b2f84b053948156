//! Loaders for the count table, feature ranks and metadata

pub mod counts;
pub mod metadata;
pub mod ranks;

pub use counts::{load_counts, read_counts_json, read_counts_tsv};
pub use metadata::{
    FeatureKey, FeatureMetadata, MetadataKey, MetadataTable, MetadataValue, SampleKey,
    SampleMetadata,
};
pub use ranks::FeatureRanks;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::ReaderBuilder;

use crate::Result;

/// Tab-separated reader with a header row
pub(crate) fn tsv_reader<R: Read>(reader: R, flexible: bool) -> csv::Reader<R> {
    ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(flexible)
        .from_reader(reader)
}

pub(crate) fn open(path: &Path) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}
