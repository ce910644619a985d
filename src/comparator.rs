//! Ordering of candidate orientations at a placement cursor.
//!
//! Candidates are ranked by, in order:
//! 1. exact fit on width, then length, then depth (filling a dimension completely wins)
//! 2. lookahead score (more upcoming items still packable wins), when a queue exists
//! 3. the tighter horizontal gap, then the smaller footprint
//! 4. the orientation dimensions themselves, so that distinct candidates never tie
//!
//! Every criterion is a property of one orientation in a fixed context, so the ordering
//! is a lexicographic comparison of per-candidate ranks: total, antisymmetric and
//! transitive.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::geometry::{
    EmptyBoxStability, Leftover, Orientation, PlacementSite, RemainingSpace,
    possible_orientations, usable_orientations,
};
use crate::lookahead::DEFAULT_LOOKAHEAD_LIMIT;
use crate::model::Item;
use crate::types::{Dimensional, Dimensions};

/// Source of lookahead scores for the comparator.
///
/// `None` means lookahead is unavailable and the tie-break is skipped.
pub trait LookaheadScorer: Sync {
    fn score(
        &self,
        orientation: Dimensions,
        space: &RemainingSpace,
        sample: &[Item],
        limit: usize,
    ) -> Option<usize>;

    /// Scores several orientations against the same context.
    fn score_many(
        &self,
        orientations: &[Dimensions],
        space: &RemainingSpace,
        sample: &[Item],
        limit: usize,
    ) -> Vec<Option<usize>> {
        orientations
            .iter()
            .map(|dims| self.score(*dims, space, sample, limit))
            .collect()
    }
}

/// Placement context shared by all comparisons of one decision.
#[derive(Clone, Copy, Debug)]
pub struct LookaheadContext<'a> {
    pub space: RemainingSpace,
    /// Upcoming items, highest priority first.
    pub next_items: &'a [Item],
}

impl<'a> LookaheadContext<'a> {
    pub fn new(space: RemainingSpace, next_items: &'a [Item]) -> Self {
        Self { space, next_items }
    }
}

/// Per-candidate ranking key. Smaller ranks are preferred.
#[derive(Clone, Copy, Debug)]
struct Rank {
    leftover: Leftover,
    score: Option<usize>,
    footprint: u64,
    dims: Dimensions,
}

impl Rank {
    fn new(orientation: &Orientation, space: &RemainingSpace, score: Option<usize>) -> Self {
        Self {
            leftover: space.leftover(orientation.dimensions()),
            score,
            footprint: orientation.surface_footprint(),
            dims: orientation.dimensions(),
        }
    }

    fn cmp_exact_fit(&self, other: &Self) -> Ordering {
        exact_fit(self.leftover.width, other.leftover.width)
            .then_with(|| exact_fit(self.leftover.length, other.leftover.length))
            .then_with(|| exact_fit(self.leftover.depth, other.leftover.depth))
    }
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_exact_fit(other)
            .then_with(|| match (self.score, other.score) {
                (Some(a), Some(b)) => b.cmp(&a),
                _ => Ordering::Equal,
            })
            .then_with(|| self.leftover.min_gap().cmp(&other.leftover.min_gap()))
            .then_with(|| self.footprint.cmp(&other.footprint))
            .then_with(|| self.dims.cmp(&other.dims))
    }
}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Rank {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Rank {}

/// Exactly filling a dimension beats leaving a gap in it.
fn exact_fit(a_left: i64, b_left: i64) -> Ordering {
    match (a_left == 0, b_left == 0) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Compares orientations for one placement decision.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use boxpack_lookahead::comparator::{LookaheadContext, OrientationComparator};
/// use boxpack_lookahead::geometry::{Orientation, RemainingSpace};
/// use boxpack_lookahead::model::Item;
/// use boxpack_lookahead::types::{Dimensions, Rotation};
///
/// let item = Item::new("Item", Dimensions::new(4, 10, 10), 10, Rotation::KeepFlat).unwrap();
/// let item = Arc::new(item);
/// let along = Orientation::new(item.clone(), Dimensions::new(4, 10, 10)).unwrap();
/// let across = Orientation::new(item, Dimensions::new(10, 4, 10)).unwrap();
///
/// let context = LookaheadContext::new(RemainingSpace::new(10, 20, 20, 0), &[]);
/// let comparator = OrientationComparator::without_lookahead(context);
/// // `across` fills the width exactly.
/// assert_eq!(comparator.compare(&across, &along), std::cmp::Ordering::Less);
/// ```
pub struct OrientationComparator<'a> {
    context: LookaheadContext<'a>,
    scorer: Option<&'a dyn LookaheadScorer>,
    limit: usize,
    parallel: bool,
}

impl<'a> OrientationComparator<'a> {
    /// Comparator that consults `scorer` for the lookahead tie-break.
    pub fn new(
        context: LookaheadContext<'a>,
        scorer: &'a dyn LookaheadScorer,
        limit: usize,
        parallel: bool,
    ) -> Self {
        Self {
            context,
            scorer: Some(scorer),
            limit,
            parallel,
        }
    }

    /// Comparator using only exact-fit and geometric criteria.
    pub fn without_lookahead(context: LookaheadContext<'a>) -> Self {
        Self {
            context,
            scorer: None,
            limit: DEFAULT_LOOKAHEAD_LIMIT,
            parallel: false,
        }
    }

    pub fn context(&self) -> &LookaheadContext<'a> {
        &self.context
    }

    fn lookahead_active(&self) -> Option<&'a dyn LookaheadScorer> {
        self.scorer
            .filter(|_| !self.context.next_items.is_empty() && self.limit > 0)
    }

    fn score(&self, scorer: &dyn LookaheadScorer, dims: Dimensions) -> Option<usize> {
        scorer.score(dims, &self.context.space, self.context.next_items, self.limit)
    }

    /// Compares two candidates; `Less` means `a` is preferred.
    pub fn compare(&self, a: &Orientation, b: &Orientation) -> Ordering {
        let space = &self.context.space;
        let rank_a = Rank::new(a, space, None);
        let rank_b = Rank::new(b, space, None);

        let Some(scorer) = self.lookahead_active() else {
            return rank_a.cmp(&rank_b);
        };

        // Exact fits decide before any lookahead is spent.
        let exact = rank_a.cmp_exact_fit(&rank_b);
        if exact != Ordering::Equal {
            return exact;
        }

        let (score_a, score_b) = if self.parallel {
            rayon::join(
                || self.score(scorer, a.dimensions()),
                || self.score(scorer, b.dimensions()),
            )
        } else {
            (
                self.score(scorer, a.dimensions()),
                self.score(scorer, b.dimensions()),
            )
        };

        Rank::new(a, space, score_a).cmp(&Rank::new(b, space, score_b))
    }

    /// Sorts candidates best first.
    ///
    /// Every candidate is scored once up front; with `parallel` enabled the scores are
    /// requested as one batch.
    pub fn sort(&self, orientations: &mut Vec<Orientation>) {
        let space = self.context.space;
        let scores: Vec<Option<usize>> = match self.lookahead_active() {
            Some(scorer) => {
                let dims: Vec<Dimensions> =
                    orientations.iter().map(Dimensional::dimensions).collect();
                if self.parallel {
                    scorer.score_many(&dims, &space, self.context.next_items, self.limit)
                } else {
                    dims.iter().map(|d| self.score(scorer, *d)).collect()
                }
            }
            None => vec![None; orientations.len()],
        };

        let mut ranked: Vec<(Rank, Orientation)> = orientations
            .drain(..)
            .zip(scores)
            .map(|(orientation, score)| (Rank::new(&orientation, &space, score), orientation))
            .collect();
        ranked.sort_by(|a, b| a.0.cmp(&b.0));
        orientations.extend(ranked.into_iter().map(|(_, orientation)| orientation));
    }

    /// Returns the preferred candidate, if any.
    pub fn best(&self, mut orientations: Vec<Orientation>) -> Option<Orientation> {
        self.sort(&mut orientations);
        orientations.into_iter().next()
    }
}

/// Picks the orientation to pack `item` in at the cursor described by the comparator's
/// context, placed at `site`.
///
/// Returns `None` if the item is too heavy for what is left of the container, or if no
/// orientation fits, satisfies the site's constraint and passes the stability filter.
pub fn best_orientation(
    comparator: &OrientationComparator<'_>,
    item: &Arc<Item>,
    prev: Option<&Orientation>,
    site: &PlacementSite<'_>,
    packed_weight: u64,
    stability: &EmptyBoxStability,
) -> Option<Orientation> {
    let container = site.container();
    let capacity = u64::from(container.max_weight).saturating_sub(packed_weight);
    if u64::from(item.weight) > capacity {
        return None;
    }

    let possible = possible_orientations(item, prev, &comparator.context().space, Some(site));
    comparator.best(usable_orientations(item, possible, container, stability))
}
