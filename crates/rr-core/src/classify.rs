//! Feature classification for the rank view

use serde::{Deserialize, Serialize};

use crate::selection::Selection;

/// Role of a feature in the current log ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Classification {
    Numerator,
    Denominator,
    Both,
    #[default]
    None,
}

impl Classification {
    /// Combine the two independent membership checks
    pub fn from_membership(in_numerator: bool, in_denominator: bool) -> Self {
        match (in_numerator, in_denominator) {
            (true, true) => Classification::Both,
            (true, false) => Classification::Numerator,
            (false, true) => Classification::Denominator,
            (false, false) => Classification::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Numerator => "Numerator",
            Classification::Denominator => "Denominator",
            Classification::Both => "Both",
            Classification::None => "None",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a feature against a selection snapshot
pub fn classify(feature: &str, selection: &Selection) -> Classification {
    match selection {
        Selection::Single { high, low } => {
            Classification::from_membership(feature == high, feature == low)
        }
        Selection::Multi(multi) => Classification::from_membership(
            multi.numerator.contains(feature),
            multi.denominator.contains(feature),
        ),
    }
}
