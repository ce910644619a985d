//! Evaluation backends for the lookahead tie-break.
//!
//! [`LookaheadAccelerator`] is the capability boundary a session is built with.
//! [`InProcessEvaluator`] computes everything on the calling thread and is always
//! available; [`ThreadPoolAccelerator`] moves the work to a dedicated pool and gives up
//! after a per-call timeout.

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::cache::{CacheStats, LookaheadCache, LookaheadKey};
use crate::comparator::{LookaheadContext, LookaheadScorer, OrientationComparator, best_orientation};
use crate::config::LookaheadConfig;
use crate::error::AcceleratorError;
use crate::geometry::{EmptyBoxStability, Orientation, PlacementSite, RemainingSpace};
use crate::lookahead::simulate;
use crate::model::Item;
use crate::types::Dimensions;

/// Backend computing lookahead counts and orientation choices.
///
/// Every operation may fail; callers are expected to fall back to an
/// [`InProcessEvaluator`] when they do.
pub trait LookaheadAccelerator: Send + Sync {
    /// Counts the sampled items that would still fit after placing `orientation`.
    fn compute_lookahead_count(
        &self,
        orientation: Dimensions,
        sample: &[Item],
        space: &RemainingSpace,
        limit: usize,
    ) -> Result<usize, AcceleratorError>;

    /// Counts for several orientations sharing one context.
    fn compute_lookahead_counts(
        &self,
        orientations: &[Dimensions],
        sample: &[Item],
        space: &RemainingSpace,
        limit: usize,
    ) -> Result<Vec<usize>, AcceleratorError> {
        orientations
            .iter()
            .map(|dims| self.compute_lookahead_count(*dims, sample, space, limit))
            .collect()
    }

    /// Chooses the orientation to pack `item` in, or `None` if it cannot be packed here.
    fn compute_best_orientation(
        &self,
        item: &Arc<Item>,
        prev: Option<&Orientation>,
        next_items: &[Item],
        space: &RemainingSpace,
        site: &PlacementSite<'_>,
        packed_weight: u64,
    ) -> Result<Option<Orientation>, AcceleratorError>;

    fn clear_cache(&self) -> Result<(), AcceleratorError>;

    fn cache_size(&self) -> Result<usize, AcceleratorError>;
}

/// Pure evaluator backed by a session-owned cache.
#[derive(Debug)]
pub struct InProcessEvaluator {
    cache: LookaheadCache,
    stability: EmptyBoxStability,
    limit: usize,
    verify_cache_hits: bool,
}

impl InProcessEvaluator {
    pub fn new(limit: usize, verify_cache_hits: bool) -> Self {
        Self {
            cache: LookaheadCache::new(),
            stability: EmptyBoxStability::new(),
            limit: limit.max(1),
            verify_cache_hits,
        }
    }

    pub fn from_config(config: &LookaheadConfig) -> Self {
        Self::new(config.limit, config.verify_cache_hits)
    }

    /// Cached lookahead count.
    pub fn evaluate(
        &self,
        orientation: Dimensions,
        space: &RemainingSpace,
        sample: &[Item],
        limit: usize,
    ) -> usize {
        let key = LookaheadKey::new(orientation, space, sample, limit);
        let compute = || simulate(orientation, space, sample, limit);
        if self.verify_cache_hits {
            self.cache.get_or_compute_verified(key, compute)
        } else {
            self.cache.get_or_compute(key, compute)
        }
    }

    /// Orientation choice with lookahead served by this evaluator.
    pub fn best_orientation(
        &self,
        item: &Arc<Item>,
        prev: Option<&Orientation>,
        next_items: &[Item],
        space: &RemainingSpace,
        site: &PlacementSite<'_>,
        packed_weight: u64,
    ) -> Option<Orientation> {
        let context = LookaheadContext::new(*space, next_items);
        let comparator = OrientationComparator::new(context, self, self.limit, false);
        best_orientation(&comparator, item, prev, site, packed_weight, &self.stability)
    }

    /// Memo of empty-container stability used by the orientation filter.
    pub fn stability(&self) -> &EmptyBoxStability {
        &self.stability
    }

    pub fn cache(&self) -> &LookaheadCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl Default for InProcessEvaluator {
    fn default() -> Self {
        Self::from_config(&LookaheadConfig::default())
    }
}

impl LookaheadScorer for InProcessEvaluator {
    fn score(
        &self,
        orientation: Dimensions,
        space: &RemainingSpace,
        sample: &[Item],
        limit: usize,
    ) -> Option<usize> {
        Some(self.evaluate(orientation, space, sample, limit))
    }
}

impl LookaheadAccelerator for InProcessEvaluator {
    fn compute_lookahead_count(
        &self,
        orientation: Dimensions,
        sample: &[Item],
        space: &RemainingSpace,
        limit: usize,
    ) -> Result<usize, AcceleratorError> {
        Ok(self.evaluate(orientation, space, sample, limit))
    }

    fn compute_best_orientation(
        &self,
        item: &Arc<Item>,
        prev: Option<&Orientation>,
        next_items: &[Item],
        space: &RemainingSpace,
        site: &PlacementSite<'_>,
        packed_weight: u64,
    ) -> Result<Option<Orientation>, AcceleratorError> {
        Ok(self.best_orientation(item, prev, next_items, space, site, packed_weight))
    }

    fn clear_cache(&self) -> Result<(), AcceleratorError> {
        self.cache.clear();
        self.stability.clear();
        Ok(())
    }

    fn cache_size(&self) -> Result<usize, AcceleratorError> {
        Ok(self.cache.len())
    }
}

/// Accelerator running evaluations on a dedicated rayon pool.
///
/// Each call waits at most `timeout` for its answer. A call that times out keeps running
/// in the pool; its result is dropped.
pub struct ThreadPoolAccelerator {
    pool: ThreadPool,
    evaluator: Arc<InProcessEvaluator>,
    timeout: Duration,
}

impl ThreadPoolAccelerator {
    /// Builds a pool with `threads` workers (0 lets rayon decide).
    pub fn new(threads: usize, config: &LookaheadConfig) -> Result<Self, AcceleratorError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|idx| format!("lookahead-{idx}"))
            .build()
            .map_err(|err| AcceleratorError::Unavailable(err.to_string()))?;

        log::debug!(
            "Started lookahead pool with {} threads (timeout {:?})",
            pool.current_num_threads(),
            config.accelerator_timeout
        );

        Ok(Self {
            pool,
            evaluator: Arc::new(InProcessEvaluator::from_config(config)),
            timeout: config.accelerator_timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `job` on the pool and waits for its result.
    fn run<T, F>(&self, job: F) -> Result<T, AcceleratorError>
    where
        T: Send + 'static,
        F: FnOnce(&InProcessEvaluator) -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let evaluator = Arc::clone(&self.evaluator);
        self.pool.spawn(move || {
            // The receiver is gone if the caller timed out.
            let _ = tx.send(job(&evaluator));
        });

        rx.recv_timeout(self.timeout).map_err(|err| match err {
            mpsc::RecvTimeoutError::Timeout => AcceleratorError::Timeout(self.timeout),
            mpsc::RecvTimeoutError::Disconnected => {
                AcceleratorError::Unavailable("lookahead worker terminated".to_string())
            }
        })
    }
}

impl std::fmt::Debug for ThreadPoolAccelerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPoolAccelerator")
            .field("threads", &self.pool.current_num_threads())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LookaheadAccelerator for ThreadPoolAccelerator {
    fn compute_lookahead_count(
        &self,
        orientation: Dimensions,
        sample: &[Item],
        space: &RemainingSpace,
        limit: usize,
    ) -> Result<usize, AcceleratorError> {
        let sample = sample.to_vec();
        let space = *space;
        self.run(move |evaluator| evaluator.evaluate(orientation, &space, &sample, limit))
    }

    fn compute_lookahead_counts(
        &self,
        orientations: &[Dimensions],
        sample: &[Item],
        space: &RemainingSpace,
        limit: usize,
    ) -> Result<Vec<usize>, AcceleratorError> {
        let orientations = orientations.to_vec();
        let sample = sample.to_vec();
        let space = *space;
        self.run(move |evaluator| {
            orientations
                .par_iter()
                .map(|dims| evaluator.evaluate(*dims, &space, &sample, limit))
                .collect()
        })
    }

    fn compute_best_orientation(
        &self,
        item: &Arc<Item>,
        prev: Option<&Orientation>,
        next_items: &[Item],
        space: &RemainingSpace,
        site: &PlacementSite<'_>,
        packed_weight: u64,
    ) -> Result<Option<Orientation>, AcceleratorError> {
        let item = Arc::clone(item);
        let prev = prev.cloned();
        let next_items = next_items.to_vec();
        let space = *space;
        let packed = site.packed.clone();
        let position = site.position;
        let constraint = site.constraint.clone();
        self.run(move |evaluator| {
            let site = PlacementSite {
                packed: &packed,
                position,
                constraint,
            };
            evaluator.best_orientation(
                &item,
                prev.as_ref(),
                &next_items,
                &space,
                &site,
                packed_weight,
            )
        })
    }

    fn clear_cache(&self) -> Result<(), AcceleratorError> {
        self.evaluator.cache().clear();
        self.evaluator.stability().clear();
        Ok(())
    }

    fn cache_size(&self) -> Result<usize, AcceleratorError> {
        Ok(self.evaluator.cache().len())
    }
}
