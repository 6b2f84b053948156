use std::sync::Arc;
use parking_lot::{Mutex, RwLock};

use crate::classify::Classification;
use crate::data::AbundanceSource;
use crate::error::{Result, SelectionError};
use crate::selection::Selection;
use crate::{FeatureId, SampleId};

/// The sample-plot side of the link: one balance per sample row
pub trait SampleSurface: Send + Sync {
    /// Sample IDs of every materialized row, in row order
    fn sample_ids(&self) -> Vec<SampleId>;

    /// Overwrite the balance of every listed sample
    fn apply_balances(&mut self, patch: &[BalancePatch]);

    /// Mark every row as having no balance
    fn clear_balances(&mut self);
}

/// The rank-plot side of the link: one classification per feature row
pub trait RankSurface: Send + Sync {
    /// Feature IDs of every materialized row, in row order
    fn feature_ids(&self) -> Vec<FeatureId>;

    /// Overwrite the classification of every listed feature
    fn apply_classifications(&mut self, patch: &[ClassificationPatch]);

    /// Reset every row to `Classification::None`
    fn clear_classifications(&mut self);
}

/// New balance for one sample
#[derive(Debug, Clone, PartialEq)]
pub struct BalancePatch {
    pub sample_id: SampleId,
    pub balance: f64,
}

/// New classification for one feature
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationPatch {
    pub feature_id: FeatureId,
    pub classification: Classification,
}

/// Both halves of one recomputation, computed in full before either is applied
#[derive(Debug, Clone, Default)]
pub struct ViewPatch {
    pub balances: Vec<BalancePatch>,
    pub classifications: Vec<ClassificationPatch>,
}

/// Counts describing an applied patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatchSummary {
    pub samples: usize,
    pub defined_balances: usize,
    pub features: usize,
    pub numerator_features: usize,
    pub denominator_features: usize,
    pub both_features: usize,
}

impl ViewPatch {
    /// Compute balances for `sample_ids` and classifications for `feature_ids`.
    ///
    /// The first sample that cannot be computed aborts the whole patch.
    pub fn compute(
        source: &dyn AbundanceSource,
        selection: &Selection,
        sample_ids: &[SampleId],
        feature_ids: &[FeatureId],
    ) -> Result<Self> {
        let balances = sample_ids
            .iter()
            .map(|sample_id| {
                Ok(BalancePatch {
                    sample_id: sample_id.clone(),
                    balance: selection.balance(source, sample_id)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let classifications = feature_ids
            .iter()
            .map(|feature_id| ClassificationPatch {
                feature_id: feature_id.clone(),
                classification: selection.classify(feature_id),
            })
            .collect();

        Ok(Self {
            balances,
            classifications,
        })
    }

    pub fn summary(&self) -> PatchSummary {
        let mut summary = PatchSummary {
            samples: self.balances.len(),
            defined_balances: self.balances.iter().filter(|b| !b.balance.is_nan()).count(),
            features: self.classifications.len(),
            ..PatchSummary::default()
        };
        for patch in &self.classifications {
            match patch.classification {
                Classification::Numerator => summary.numerator_features += 1,
                Classification::Denominator => summary.denominator_features += 1,
                Classification::Both => summary.both_features += 1,
                Classification::None => {}
            }
        }
        summary
    }
}

/// Synchronization manager keeping the sample and rank views consistent
pub struct SyncManager {
    sample_view: Arc<RwLock<dyn SampleSurface>>,
    rank_view: Arc<RwLock<dyn RankSurface>>,

    /// Held for the whole compute-and-apply pass; contention means a patch
    /// is already in flight
    apply_guard: Mutex<()>,
}

impl SyncManager {
    /// Create a new synchronization manager over two linked views
    pub fn new(
        sample_view: Arc<RwLock<dyn SampleSurface>>,
        rank_view: Arc<RwLock<dyn RankSurface>>,
    ) -> Self {
        Self {
            sample_view,
            rank_view,
            apply_guard: Mutex::new(()),
        }
    }

    /// Recompute both views for `selection` and apply the result as one patch
    pub fn apply_selection(
        &self,
        source: &dyn AbundanceSource,
        selection: &Selection,
    ) -> Result<PatchSummary> {
        let _guard = self.apply_guard.try_lock().ok_or(SelectionError::Busy)?;

        let sample_ids = self.sample_view.read().sample_ids();
        let feature_ids = self.rank_view.read().feature_ids();
        let patch = ViewPatch::compute(source, selection, &sample_ids, &feature_ids)?;

        self.apply_patch(&patch);
        let summary = patch.summary();
        tracing::info!(
            samples = summary.samples,
            defined = summary.defined_balances,
            features = summary.features,
            "Applied selection patch"
        );
        Ok(summary)
    }

    /// Clear both views together without recomputing anything
    pub fn clear(&self) -> Result<()> {
        let _guard = self.apply_guard.try_lock().ok_or(SelectionError::Busy)?;

        let mut rank_view = self.rank_view.write();
        let mut sample_view = self.sample_view.write();
        rank_view.clear_classifications();
        sample_view.clear_balances();
        tracing::debug!("Cleared linked views");
        Ok(())
    }

    /// Whether a patch is currently being computed or applied
    pub fn is_applying(&self) -> bool {
        self.apply_guard.is_locked()
    }

    // Both write locks are taken before either half is written, always in
    // rank-then-sample order.
    fn apply_patch(&self, patch: &ViewPatch) {
        let mut rank_view = self.rank_view.write();
        let mut sample_view = self.sample_view.write();
        rank_view.apply_classifications(&patch.classifications);
        sample_view.apply_balances(&patch.balances);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::tests::TestCounts;

    #[derive(Default)]
    struct Samples {
        rows: Vec<(String, Option<f64>)>,
    }

    impl SampleSurface for Samples {
        fn sample_ids(&self) -> Vec<SampleId> {
            self.rows.iter().map(|(id, _)| id.clone()).collect()
        }

        fn apply_balances(&mut self, patch: &[BalancePatch]) {
            for p in patch {
                if let Some(row) = self.rows.iter_mut().find(|(id, _)| *id == p.sample_id) {
                    row.1 = Some(p.balance);
                }
            }
        }

        fn clear_balances(&mut self) {
            for row in &mut self.rows {
                row.1 = None;
            }
        }
    }

    #[derive(Default)]
    struct Ranks {
        rows: Vec<(String, Classification)>,
    }

    impl RankSurface for Ranks {
        fn feature_ids(&self) -> Vec<FeatureId> {
            self.rows.iter().map(|(id, _)| id.clone()).collect()
        }

        fn apply_classifications(&mut self, patch: &[ClassificationPatch]) {
            for p in patch {
                if let Some(row) = self.rows.iter_mut().find(|(id, _)| *id == p.feature_id) {
                    row.1 = p.classification;
                }
            }
        }

        fn clear_classifications(&mut self) {
            for row in &mut self.rows {
                row.1 = Classification::None;
            }
        }
    }

    fn views(samples: &[&str]) -> (Arc<RwLock<Samples>>, Arc<RwLock<Ranks>>) {
        let samples = Samples {
            rows: samples.iter().map(|s| (s.to_string(), None)).collect(),
        };
        let ranks = Ranks {
            rows: ["A", "B", "C"]
                .iter()
                .map(|f| (f.to_string(), Classification::None))
                .collect(),
        };
        (Arc::new(RwLock::new(samples)), Arc::new(RwLock::new(ranks)))
    }

    fn counts() -> TestCounts {
        TestCounts::new(
            &[("A", &[10.0, 0.0]), ("B", &[5.0, 2.0]), ("C", &[1.0, 1.0])],
            &["S1", "S2"],
        )
    }

    fn single(high: &str, low: &str) -> Selection {
        Selection::Single {
            high: high.to_string(),
            low: low.to_string(),
        }
    }

    #[test]
    fn test_patch_updates_both_views() {
        let (samples, ranks) = views(&["S1", "S2"]);
        let sync = SyncManager::new(samples.clone(), ranks.clone());

        let summary = sync.apply_selection(&counts(), &single("A", "B")).unwrap();
        assert_eq!(summary.samples, 2);
        assert_eq!(summary.defined_balances, 1);
        assert_eq!(summary.numerator_features, 1);
        assert_eq!(summary.denominator_features, 1);

        let samples = samples.read();
        let s1 = samples.rows[0].1.unwrap();
        assert!((s1 - 2.0_f64.ln()).abs() < 1e-12);
        assert!(samples.rows[1].1.unwrap().is_nan());

        let ranks = ranks.read();
        assert_eq!(ranks.rows[0].1, Classification::Numerator);
        assert_eq!(ranks.rows[1].1, Classification::Denominator);
        assert_eq!(ranks.rows[2].1, Classification::None);
    }

    #[test]
    fn test_unknown_sample_aborts_whole_patch() {
        let (samples, ranks) = views(&["S1", "S9"]);
        let sync = SyncManager::new(samples.clone(), ranks.clone());

        let err = sync.apply_selection(&counts(), &single("A", "B")).unwrap_err();
        assert_eq!(err, SelectionError::InvalidSample("S9".to_string()));

        // Neither view was touched, not even the valid S1 row
        assert!(samples.read().rows.iter().all(|(_, b)| b.is_none()));
        assert!(ranks
            .read()
            .rows
            .iter()
            .all(|(_, c)| *c == Classification::None));
    }

    #[test]
    fn test_patch_in_flight_is_rejected() {
        let (samples, ranks) = views(&["S1"]);
        let sync = SyncManager::new(samples, ranks);

        let _in_flight = sync.apply_guard.lock();
        assert!(sync.is_applying());
        assert_eq!(
            sync.apply_selection(&counts(), &single("A", "B")).unwrap_err(),
            SelectionError::Busy
        );
        assert_eq!(sync.clear().unwrap_err(), SelectionError::Busy);
    }

    #[test]
    fn test_clear_resets_both_views() {
        let (samples, ranks) = views(&["S1", "S2"]);
        let sync = SyncManager::new(samples.clone(), ranks.clone());
        sync.apply_selection(&counts(), &single("B", "B")).unwrap();

        sync.clear().unwrap();
        assert!(samples.read().rows.iter().all(|(_, b)| b.is_none()));
        assert!(ranks
            .read()
            .rows
            .iter()
            .all(|(_, c)| *c == Classification::None));
    }
}
