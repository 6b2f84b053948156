//! Selection state machine
//!
//! Every action is proposed against a copy of the current state. The caller
//! commits the returned machine only once the linked views have accepted the
//! resulting patch, so a failed action never leaves a half-updated selection.

use super::{ClickPhase, MultiPhase, MultiQuery, MultiSelection, Selection, SingleSelection};
use crate::error::{RatioSide, Result, SelectionError};
use crate::filter::filter_features;
use crate::FeatureId;

/// What a click asks of the views
#[derive(Debug, Clone)]
pub enum ClickOutcome {
    /// The numerator slot was filled; waiting for the denominator click
    HighSet,
    /// The denominator slot was filled but the pair is the same as before
    Unchanged,
    /// The pair is new and the views must be recomputed
    Recompute(Selection),
}

/// Owner of the single- and multi-feature selection state
#[derive(Debug, Clone, Default)]
pub struct SelectionMachine {
    single: SingleSelection,
    multi: MultiSelection,
    multi_phase: MultiPhase,
    /// Selection the views currently reflect
    active: Option<Selection>,
}

impl SelectionMachine {
    /// Create a machine in its initial, empty state
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(&self) -> &SingleSelection {
        &self.single
    }

    pub fn multi(&self) -> &MultiSelection {
        &self.multi
    }

    pub fn click_phase(&self) -> ClickPhase {
        self.single.phase
    }

    pub fn multi_phase(&self) -> MultiPhase {
        self.multi_phase
    }

    /// Selection the views were last patched with, if any
    pub fn active(&self) -> Option<&Selection> {
        self.active.as_ref()
    }

    /// Propose the state after a click on `feature`.
    ///
    /// A denominator click always follows a numerator click, so the second
    /// click of a pair always has both features to work with.
    pub fn propose_click(&self, feature: &str) -> (SelectionMachine, ClickOutcome) {
        let mut next = self.clone();
        let single = &mut next.single;

        let outcome = match (single.phase, single.high.clone()) {
            (ClickPhase::AwaitingLow, Some(high)) => {
                single.previous_low = single.low.replace(feature.to_string());
                single.phase = ClickPhase::AwaitingHigh;
                tracing::debug!(feature, "Set denominator feature");

                let views_show_multi = matches!(self.active, Some(Selection::Multi(_)));
                if !single.pair_changed() && !views_show_multi {
                    ClickOutcome::Unchanged
                } else {
                    ClickOutcome::Recompute(Selection::Single {
                        high,
                        low: feature.to_string(),
                    })
                }
            }
            _ => {
                single.previous_high = single.high.replace(feature.to_string());
                single.phase = ClickPhase::AwaitingLow;
                tracing::debug!(feature, "Set numerator feature");
                ClickOutcome::HighSet
            }
        };

        (next, outcome)
    }

    /// Propose the state after a multi-feature apply.
    ///
    /// Both queries are resolved before anything changes, so an invalid
    /// pattern on either side leaves the current selection untouched.
    pub fn propose_multi(
        &self,
        universe: &[FeatureId],
        query: &MultiQuery,
    ) -> Result<(SelectionMachine, Selection)> {
        let numerator = filter_features(universe, &query.top_query, query.top_mode)?;
        let denominator = filter_features(universe, &query.bot_query, query.bot_mode)?;

        if numerator.is_empty() && denominator.is_empty() {
            return Err(SelectionError::EmptySelection(RatioSide::Numerator));
        }

        tracing::debug!(
            numerator = numerator.len(),
            denominator = denominator.len(),
            "Resolved multi-feature selection"
        );

        let mut next = self.clone();
        next.multi = MultiSelection {
            numerator,
            denominator,
        };
        next.multi_phase = MultiPhase::Resolved;
        let selection = Selection::Multi(next.multi.clone());
        Ok((next, selection))
    }

    /// Record that the views now reflect `selection`
    pub fn commit(mut self, selection: Selection) -> Self {
        self.active = Some(selection);
        self
    }

    /// Back to the initial state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
