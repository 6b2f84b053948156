use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::balance::sample_balance;
use crate::classify::{classify, Classification};
use crate::data::AbundanceSource;
use crate::error::Result;
use crate::FeatureId;

mod event;
mod machine;

pub use event::{MultiQuery, SelectionEvent};
pub use machine::{ClickOutcome, SelectionMachine};

/// Which slot the next click on a rank fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClickPhase {
    /// The next click picks the numerator feature
    #[default]
    AwaitingHigh,
    /// The next click picks the denominator feature
    AwaitingLow,
}

/// Whether a text-query selection has been applied since the last clear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultiPhase {
    #[default]
    Pending,
    Resolved,
}

/// Two-click selection of one numerator and one denominator feature
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SingleSelection {
    pub high: Option<FeatureId>,
    pub low: Option<FeatureId>,
    pub previous_high: Option<FeatureId>,
    pub previous_low: Option<FeatureId>,
    pub phase: ClickPhase,
}

impl SingleSelection {
    /// Both slots, if both are filled
    pub fn pair(&self) -> Option<(&FeatureId, &FeatureId)> {
        match (&self.high, &self.low) {
            (Some(high), Some(low)) => Some((high, low)),
            _ => None,
        }
    }

    /// Whether the current pair differs from the one before the last clicks
    pub fn pair_changed(&self) -> bool {
        self.high != self.previous_high || self.low != self.previous_low
    }
}

/// Numerator and denominator feature sets resolved from text queries
#[derive(Debug, Clone, Default)]
pub struct MultiSelection {
    pub numerator: AHashSet<FeatureId>,
    pub denominator: AHashSet<FeatureId>,
}

/// Immutable snapshot of the selection a recomputation runs against
#[derive(Debug, Clone)]
pub enum Selection {
    Single { high: FeatureId, low: FeatureId },
    Multi(MultiSelection),
}

impl Selection {
    /// Numerator features, sorted for display
    pub fn numerator(&self) -> Vec<&str> {
        match self {
            Selection::Single { high, .. } => vec![high.as_str()],
            Selection::Multi(multi) => sorted(&multi.numerator),
        }
    }

    /// Denominator features, sorted for display
    pub fn denominator(&self) -> Vec<&str> {
        match self {
            Selection::Single { low, .. } => vec![low.as_str()],
            Selection::Multi(multi) => sorted(&multi.denominator),
        }
    }

    /// Balance of one sample under this selection
    pub fn balance(&self, source: &dyn AbundanceSource, sample: &str) -> Result<f64> {
        match self {
            Selection::Single { high, low } => {
                sample_balance(source, [high.as_str()], [low.as_str()], sample)
            }
            Selection::Multi(multi) => sample_balance(
                source,
                multi.numerator.iter().map(String::as_str),
                multi.denominator.iter().map(String::as_str),
                sample,
            ),
        }
    }

    pub fn classify(&self, feature: &str) -> Classification {
        classify(feature, self)
    }

    pub fn is_single(&self) -> bool {
        matches!(self, Selection::Single { .. })
    }
}

fn sorted(set: &AHashSet<FeatureId>) -> Vec<&str> {
    let mut ids: Vec<&str> = set.iter().map(String::as_str).collect();
    ids.sort_unstable();
    ids
}
