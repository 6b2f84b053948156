use serde::{Deserialize, Serialize};

use crate::filter::MatchMode;
use crate::FeatureId;

/// A discrete user action coming from the rendering side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SelectionEvent {
    /// A click on a rank bar
    SingleClick { feature: FeatureId },
    /// Submission of the numerator/denominator query form
    MultiApply(MultiQuery),
    /// Reset every selection and clear the views
    Clear,
}

/// The two text queries of a multi-feature selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiQuery {
    pub top_query: String,
    pub top_mode: MatchMode,
    pub bot_query: String,
    pub bot_mode: MatchMode,
}

impl MultiQuery {
    pub fn new(
        top_query: impl Into<String>,
        top_mode: MatchMode,
        bot_query: impl Into<String>,
        bot_mode: MatchMode,
    ) -> Self {
        Self {
            top_query: top_query.into(),
            top_mode,
            bot_query: bot_query.into(),
            bot_mode,
        }
    }
}
