//! One packing run's view of the lookahead machinery.
//!
//! A [`PackingSession`] owns the lookahead cache and, optionally, an accelerator. The
//! first accelerator failure switches the session to its in-process evaluator for the
//! rest of its lifetime; the accelerator is never consulted again.

use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use rayon::prelude::*;

use crate::accelerator::{InProcessEvaluator, LookaheadAccelerator};
use crate::cache::CacheStats;
use crate::comparator::{
    LookaheadContext, LookaheadScorer, OrientationComparator, best_orientation,
};
use crate::config::LookaheadConfig;
use crate::error::AcceleratorError;
use crate::geometry::{Orientation, PlacementSite, RemainingSpace};
use crate::model::Item;
use crate::types::Dimensions;

pub struct PackingSession {
    config: LookaheadConfig,
    local: Arc<InProcessEvaluator>,
    accelerator: Option<Box<dyn LookaheadAccelerator>>,
    degraded: AtomicBool,
}

impl PackingSession {
    /// Session evaluating everything in-process.
    pub fn new(config: LookaheadConfig) -> Self {
        Self {
            local: Arc::new(InProcessEvaluator::from_config(&config)),
            config,
            accelerator: None,
            degraded: AtomicBool::new(false),
        }
    }

    /// Session delegating to `accelerator` until it fails.
    pub fn with_accelerator(
        config: LookaheadConfig,
        accelerator: Box<dyn LookaheadAccelerator>,
    ) -> Self {
        Self {
            accelerator: Some(accelerator),
            ..Self::new(config)
        }
    }

    pub fn config(&self) -> &LookaheadConfig {
        &self.config
    }

    /// Whether an accelerator failure has switched this session to the in-process path.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(AtomicOrdering::Acquire)
    }

    fn active_accelerator(&self) -> Option<&dyn LookaheadAccelerator> {
        if self.is_degraded() {
            return None;
        }
        self.accelerator.as_deref()
    }

    /// Switches to the in-process evaluator; only the first failure is logged.
    fn degrade(&self, err: &AcceleratorError) {
        if self
            .degraded
            .compare_exchange(false, true, AtomicOrdering::AcqRel, AtomicOrdering::Acquire)
            .is_ok()
        {
            log::warn!(
                "Lookahead accelerator failed ({}); using in-process evaluation from now on",
                err
            );
        }
    }

    /// Runs `remote` on the accelerator, or `local` if there is none or it fails.
    fn dispatch<T>(
        &self,
        remote: impl FnOnce(&dyn LookaheadAccelerator) -> Result<T, AcceleratorError>,
        local: impl FnOnce(&InProcessEvaluator) -> T,
    ) -> T {
        if let Some(accelerator) = self.active_accelerator() {
            match remote(accelerator) {
                Ok(value) => return value,
                Err(err) => self.degrade(&err),
            }
        }
        local(&self.local)
    }

    /// Lookahead count for one orientation.
    pub fn lookahead_count(
        &self,
        orientation: Dimensions,
        space: &RemainingSpace,
        sample: &[Item],
    ) -> usize {
        let limit = self.config.limit;
        self.dispatch(
            |acc| acc.compute_lookahead_count(orientation, sample, space, limit),
            |local| local.evaluate(orientation, space, sample, limit),
        )
    }

    /// Comparator for one placement decision, using this session for lookahead.
    pub fn comparator<'a>(
        &'a self,
        space: RemainingSpace,
        next_items: &'a [Item],
    ) -> OrientationComparator<'a> {
        let context = LookaheadContext::new(space, next_items);
        if self.config.enabled {
            OrientationComparator::new(context, self, self.config.limit, self.config.parallel)
        } else {
            OrientationComparator::without_lookahead(context)
        }
    }

    /// Compares two candidates at the given cursor; `Less` means `a` is preferred.
    pub fn compare(
        &self,
        a: &Orientation,
        b: &Orientation,
        space: RemainingSpace,
        next_items: &[Item],
    ) -> Ordering {
        self.comparator(space, next_items).compare(a, b)
    }

    /// Sorts candidates best first.
    pub fn sort_orientations(
        &self,
        orientations: &mut Vec<Orientation>,
        space: RemainingSpace,
        next_items: &[Item],
    ) {
        self.comparator(space, next_items).sort(orientations);
    }

    /// Orientation to pack `item` in at `site`, or `None` if it cannot be packed there.
    pub fn best_orientation(
        &self,
        item: &Arc<Item>,
        prev: Option<&Orientation>,
        next_items: &[Item],
        space: &RemainingSpace,
        site: &PlacementSite<'_>,
        packed_weight: u64,
    ) -> Option<Orientation> {
        let local = |local: &InProcessEvaluator| {
            let comparator = self.comparator(*space, next_items);
            best_orientation(&comparator, item, prev, site, packed_weight, local.stability())
        };
        if !self.config.enabled {
            return local(&self.local);
        }
        self.dispatch(
            |acc| acc.compute_best_orientation(item, prev, next_items, space, site, packed_weight),
            local,
        )
    }

    /// Empties the lookahead caches before the session is reused for an unrelated run.
    pub fn clear_cache(&self) {
        self.local.cache().clear();
        self.local.stability().clear();
        if let Some(accelerator) = self.active_accelerator() {
            if let Err(err) = accelerator.clear_cache() {
                self.degrade(&err);
            }
        }
    }

    /// Number of cached lookahead entries on the active evaluation path.
    pub fn cache_size(&self) -> usize {
        self.dispatch(|acc| acc.cache_size(), |local| local.cache().len())
    }

    /// Counters of the in-process cache.
    pub fn cache_stats(&self) -> CacheStats {
        self.local.cache_stats()
    }
}

impl Default for PackingSession {
    fn default() -> Self {
        Self::new(LookaheadConfig::default())
    }
}

impl std::fmt::Debug for PackingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackingSession")
            .field("config", &self.config)
            .field("accelerated", &self.accelerator.is_some())
            .field("degraded", &self.is_degraded())
            .finish()
    }
}

impl LookaheadScorer for PackingSession {
    fn score(
        &self,
        orientation: Dimensions,
        space: &RemainingSpace,
        sample: &[Item],
        limit: usize,
    ) -> Option<usize> {
        Some(self.dispatch(
            |acc| acc.compute_lookahead_count(orientation, sample, space, limit),
            |local| local.evaluate(orientation, space, sample, limit),
        ))
    }

    fn score_many(
        &self,
        orientations: &[Dimensions],
        space: &RemainingSpace,
        sample: &[Item],
        limit: usize,
    ) -> Vec<Option<usize>> {
        let counts = self.dispatch(
            |acc| acc.compute_lookahead_counts(orientations, sample, space, limit),
            |local| {
                orientations
                    .par_iter()
                    .map(|dims| local.evaluate(*dims, space, sample, limit))
                    .collect()
            },
        );
        counts.into_iter().map(Some).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use crate::geometry::{PlacementConstraint, all_orientations};
    use crate::model::Container;
    use crate::packed::{PackedBox, PackedItem};
    use crate::types::Rotation;

    /// Accelerator failing every call, counting attempts.
    #[derive(Default)]
    struct FailingAccelerator {
        calls: Arc<AtomicUsize>,
    }

    impl FailingAccelerator {
        fn fail(&self) -> AcceleratorError {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            AcceleratorError::Unavailable("offline".to_string())
        }
    }

    impl LookaheadAccelerator for FailingAccelerator {
        fn compute_lookahead_count(
            &self,
            _: Dimensions,
            _: &[Item],
            _: &RemainingSpace,
            _: usize,
        ) -> Result<usize, AcceleratorError> {
            Err(self.fail())
        }

        fn compute_best_orientation(
            &self,
            _: &Arc<Item>,
            _: Option<&Orientation>,
            _: &[Item],
            _: &RemainingSpace,
            _: &PlacementSite<'_>,
            _: u64,
        ) -> Result<Option<Orientation>, AcceleratorError> {
            Err(self.fail())
        }

        fn clear_cache(&self) -> Result<(), AcceleratorError> {
            Err(self.fail())
        }

        fn cache_size(&self) -> Result<usize, AcceleratorError> {
            Err(self.fail())
        }
    }

    fn sample() -> Vec<Item> {
        vec![Item::new("Next", Dimensions::new(5, 5, 5), 5, Rotation::BestFit).unwrap(); 3]
    }

    fn space() -> RemainingSpace {
        RemainingSpace::new(100, 100, 100, 10)
    }

    fn item(dims: (u32, u32, u32)) -> Arc<Item> {
        Arc::new(Item::new("Item", dims.into(), 10, Rotation::BestFit).unwrap())
    }

    fn empty_box() -> PackedBox {
        let container =
            Container::new("Box", (20, 20, 20).into(), 0, (20, 20, 20).into(), 100).unwrap();
        PackedBox::empty(container)
    }

    #[test]
    fn repeated_evaluation_is_idempotent() {
        let session = PackingSession::default();
        let dims = Dimensions::new(10, 10, 10);

        let first = session.lookahead_count(dims, &space(), &sample());
        let size = session.cache_size();
        let second = session.lookahead_count(dims, &space(), &sample());

        assert_eq!(first, second);
        assert_eq!(session.cache_size(), size);

        session.clear_cache();
        assert_eq!(session.cache_size(), 0);
    }

    #[test]
    fn failing_accelerator_degrades_once() {
        let accelerator = FailingAccelerator::default();
        let calls = Arc::clone(&accelerator.calls);
        let session =
            PackingSession::with_accelerator(LookaheadConfig::default(), Box::new(accelerator));
        let dims = Dimensions::new(10, 10, 10);

        assert!(!session.is_degraded());
        assert_eq!(session.lookahead_count(dims, &space(), &sample()), 3);
        assert!(session.is_degraded());

        session.lookahead_count(dims, &space(), &sample());
        session.clear_cache();
        session.cache_size();
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn degraded_session_matches_local_session() {
        let item = item((4, 6, 5));
        let packed = empty_box();
        let site = PlacementSite::new(&packed, (0, 0, 0));
        let room = RemainingSpace::of_container(packed.container());

        let local = PackingSession::default();
        let failing = PackingSession::with_accelerator(
            LookaheadConfig::default(),
            Box::new(FailingAccelerator::default()),
        );

        assert_eq!(
            failing.best_orientation(&item, None, &sample(), &room, &site, 0),
            local.best_orientation(&item, None, &sample(), &room, &site, 0)
        );
        assert!(failing.is_degraded());
    }

    /// Allows nothing to be stacked on top of existing contents.
    struct GroundFloorOnly;

    impl PlacementConstraint for GroundFloorOnly {
        fn can_be_packed(
            &self,
            packed: &PackedBox,
            position: (u32, u32, u32),
            _: Dimensions,
        ) -> bool {
            position.2 == 0 || packed.items().is_empty()
        }
    }

    #[test]
    fn session_respects_placement_constraint() {
        let session = PackingSession::default();
        let subject = item((4, 6, 5));
        let packed = empty_box();
        let room = RemainingSpace::new(20, 20, 15, 0);

        let ground =
            PlacementSite::new(&packed, (0, 0, 0)).with_constraint(Arc::new(GroundFloorOnly));
        assert!(session.best_orientation(&subject, None, &[], &room, &ground, 0).is_some());

        let floor = PackedItem::new(item((20, 20, 5)), (0, 0, 0), (20, 20, 5).into()).unwrap();
        let occupied =
            PackedBox::new(packed.container().clone(), std::iter::once(floor).collect()).unwrap();
        let stacked =
            PlacementSite::new(&occupied, (0, 0, 5)).with_constraint(Arc::new(GroundFloorOnly));
        assert_eq!(session.best_orientation(&subject, None, &[], &room, &stacked, 0), None);
    }

    #[test]
    fn sorting_is_the_same_with_and_without_parallel_scoring() {
        let item = item((3, 7, 5));
        let next = sample();
        let cursor = RemainingSpace::new(15, 15, 15, 2);

        let sequential = PackingSession::default();
        let parallel = PackingSession::new(LookaheadConfig::builder().parallel(true).build());

        let mut a = all_orientations(&item, None);
        let mut b: Vec<_> = a.iter().rev().cloned().collect();
        sequential.sort_orientations(&mut a, cursor, &next);
        parallel.sort_orientations(&mut b, cursor, &next);
        assert_eq!(a, b);
    }

    #[test]
    fn disabled_lookahead_never_touches_the_cache() {
        let session = PackingSession::new(LookaheadConfig::builder().enabled(false).build());
        let item = item((3, 7, 5));
        let mut candidates = all_orientations(&item, None);

        let cursor = RemainingSpace::new(15, 15, 15, 0);
        session.sort_orientations(&mut candidates, cursor, &sample());
        assert_eq!(session.cache_size(), 0);
    }

    #[test]
    fn comparison_prefers_exact_fit() {
        let session = PackingSession::default();
        let item = item((4, 10, 7));
        let exact = Orientation::new(Arc::clone(&item), Dimensions::new(10, 4, 7)).unwrap();
        let loose = Orientation::new(item, Dimensions::new(4, 10, 7)).unwrap();
        let cursor = RemainingSpace::new(10, 30, 30, 0);

        assert_eq!(session.compare(&exact, &loose, cursor, &sample()), Ordering::Less);
        assert_eq!(session.compare(&loose, &exact, cursor, &sample()), Ordering::Greater);
    }
}
