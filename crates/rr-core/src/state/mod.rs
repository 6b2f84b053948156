use std::sync::Arc;

use crate::data::AbundanceSource;
use crate::error::{Result, SelectionError};
use crate::events::events::{SelectionApplied, SelectionCleared, SelectionFailed};
use crate::events::EventBus;
use crate::selection::{ClickOutcome, MultiQuery, Selection, SelectionEvent, SelectionMachine};
use crate::sync::{PatchSummary, SyncManager};

/// What a handled event did to the views
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Numerator picked; the views wait for the denominator click
    AwaitingLow,
    /// Same pair as before; nothing recomputed
    Unchanged,
    /// Both views were patched
    Applied(PatchSummary),
    /// Selections reset and views cleared
    Cleared,
}

/// One exploration session: the count data, the selection state and the
/// linked views it drives
pub struct Session {
    /// The count data every balance is computed from
    source: Arc<dyn AbundanceSource>,

    /// Current selection state; replaced only after a successful action
    machine: SelectionMachine,

    /// The synchronization manager
    sync_manager: Arc<SyncManager>,

    /// The event bus
    event_bus: Arc<EventBus>,
}

impl Session {
    /// Create a new session
    pub fn new(source: Arc<dyn AbundanceSource>, sync_manager: Arc<SyncManager>) -> Self {
        Self {
            source,
            machine: SelectionMachine::new(),
            sync_manager,
            event_bus: Arc::new(EventBus::new()),
        }
    }

    /// Publish session events on a shared bus instead of a private one
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn source(&self) -> &Arc<dyn AbundanceSource> {
        &self.source
    }

    pub fn machine(&self) -> &SelectionMachine {
        &self.machine
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Selection the views currently reflect
    pub fn active_selection(&self) -> Option<&Selection> {
        self.machine.active()
    }

    /// Handle one event from the rendering side.
    ///
    /// On error the selection state and both views are exactly as before and
    /// a `SelectionFailed` event is published.
    pub fn handle(&mut self, event: &SelectionEvent) -> Result<SessionOutcome> {
        let result = match event {
            SelectionEvent::SingleClick { feature } => self.click(feature),
            SelectionEvent::MultiApply(query) => self.apply_multi(query),
            SelectionEvent::Clear => self.clear(),
        };

        if let Err(error) = &result {
            tracing::warn!(%error, "Selection action failed");
            self.event_bus.publish(SelectionFailed {
                error: error.to_string(),
            });
        }
        result
    }

    fn click(&mut self, feature: &str) -> Result<SessionOutcome> {
        if !self.source.contains_feature(feature) {
            return Err(SelectionError::UnknownFeature(feature.to_string()));
        }

        let (next, outcome) = self.machine.propose_click(feature);
        match outcome {
            ClickOutcome::HighSet => {
                self.machine = next;
                Ok(SessionOutcome::AwaitingLow)
            }
            ClickOutcome::Unchanged => {
                self.machine = next;
                Ok(SessionOutcome::Unchanged)
            }
            ClickOutcome::Recompute(selection) => {
                let summary = self.sync_manager.apply_selection(&*self.source, &selection)?;
                self.publish_applied(&selection, &summary);
                self.machine = next.commit(selection);
                Ok(SessionOutcome::Applied(summary))
            }
        }
    }

    fn apply_multi(&mut self, query: &MultiQuery) -> Result<SessionOutcome> {
        let (next, selection) = self
            .machine
            .propose_multi(self.source.feature_ids(), query)?;
        let summary = self.sync_manager.apply_selection(&*self.source, &selection)?;
        self.publish_applied(&selection, &summary);
        self.machine = next.commit(selection);
        Ok(SessionOutcome::Applied(summary))
    }

    fn clear(&mut self) -> Result<SessionOutcome> {
        self.sync_manager.clear()?;
        self.machine.reset();
        tracing::info!("Cleared selections");
        self.event_bus.publish(SelectionCleared);
        Ok(SessionOutcome::Cleared)
    }

    fn publish_applied(&self, selection: &Selection, summary: &PatchSummary) {
        self.event_bus.publish(SelectionApplied {
            numerator: selection.numerator().iter().map(|s| s.to_string()).collect(),
            denominator: selection.denominator().iter().map(|s| s.to_string()).collect(),
            defined_balances: summary.defined_balances,
            undefined_balances: summary.samples - summary.defined_balances,
        });
    }
}
