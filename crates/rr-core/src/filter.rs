//! Text-query feature filtering for multi-feature selections

use std::str::FromStr;

use ahash::AHashSet;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SelectionError};
use crate::FeatureId;

/// How a query string is matched against feature IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Whole-ID string equality
    Exact,
    /// Case-sensitive substring containment
    Partial,
    /// Regular-expression search anywhere in the ID
    Pattern,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Exact => "exact",
            MatchMode::Partial => "partial",
            MatchMode::Pattern => "pattern",
        }
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "exact" => Ok(MatchMode::Exact),
            "partial" | "text" => Ok(MatchMode::Partial),
            "pattern" | "regex" => Ok(MatchMode::Pattern),
            other => Err(format!("Unknown match mode '{}'", other)),
        }
    }
}

/// Resolve a query against the full feature universe.
///
/// A blank query is a deliberate "nothing selected" and yields an empty set
/// in every mode. A pattern that fails to compile is an error.
pub fn filter_features<'a, I>(universe: I, query: &str, mode: MatchMode) -> Result<AHashSet<FeatureId>>
where
    I: IntoIterator<Item = &'a FeatureId>,
{
    if query.trim().is_empty() {
        return Ok(AHashSet::new());
    }

    let matched = match mode {
        MatchMode::Exact => universe
            .into_iter()
            .filter(|id| id.as_str() == query)
            .cloned()
            .collect(),
        MatchMode::Partial => universe
            .into_iter()
            .filter(|id| id.contains(query))
            .cloned()
            .collect(),
        MatchMode::Pattern => {
            let re = Regex::new(query).map_err(|e| SelectionError::InvalidPattern {
                pattern: query.to_string(),
                reason: e.to_string(),
            })?;
            universe
                .into_iter()
                .filter(|id| re.is_match(id))
                .cloned()
                .collect()
        }
    };

    tracing::debug!(query, mode = mode.as_str(), "Resolved feature query");
    Ok(matched)
}
