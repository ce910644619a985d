//! Forward-looking estimate used to break ties between orientations.
//!
//! The simulation answers "how many of the next queued items would still fit if this
//! orientation were placed now?". It is an approximation, not a packing: each region
//! is filled in one pass along a width cursor, rows never wrap and items are never
//! rearranged.

use crate::geometry::RemainingSpace;
use crate::model::Item;
use crate::types::Dimensions;

/// Number of upcoming items sampled when nothing else is configured.
pub const DEFAULT_LOOKAHEAD_LIMIT: usize = 8;

/// Counts how many of the first `limit` sampled items could additionally be packed after
/// placing `orientation` at the cursor described by `space`.
///
/// Two regions are considered: the rest of the current row (beside the orientation) and
/// the space beyond the current row. Each item takes its most space-efficient rotation in
/// the first region that has room for it; items fitting nowhere are skipped.
///
/// The function is pure: identical inputs always produce identical counts.
///
/// # Examples
/// ```
/// use boxpack_lookahead::geometry::RemainingSpace;
/// use boxpack_lookahead::lookahead::simulate;
/// use boxpack_lookahead::model::Item;
/// use boxpack_lookahead::types::{Dimensions, Rotation};
///
/// let cube = Item::new("Cube", Dimensions::new(5, 5, 5), 5, Rotation::BestFit).unwrap();
/// let next = vec![cube.clone(), cube.clone(), cube];
/// let space = RemainingSpace::new(100, 100, 100, 10);
/// assert_eq!(simulate(Dimensions::new(10, 10, 10), &space, &next, 8), 3);
/// ```
pub fn simulate(
    orientation: Dimensions,
    space: &RemainingSpace,
    sample: &[Item],
    limit: usize,
) -> usize {
    let current_row_length = orientation.length.max(space.row_length);

    let mut regions = [
        Strip::new(
            space.width_left.saturating_sub(orientation.width),
            current_row_length,
            space.depth_left,
        ),
        Strip::new(
            space.width_left,
            space.length_left.saturating_sub(current_row_length),
            space.depth_left,
        ),
    ];

    sample
        .iter()
        .take(limit)
        .filter(|item| regions.iter_mut().any(|region| region.place(item)))
        .count()
}

/// One rectangular region filled left to right along its width.
#[derive(Debug)]
struct Strip {
    width: u32,
    length: u32,
    depth: u32,
    cursor: u32,
}

impl Strip {
    fn new(width: u32, length: u32, depth: u32) -> Self {
        Self {
            width,
            length,
            depth,
            cursor: 0,
        }
    }

    /// Places the item in its most space-efficient rotation, advancing the cursor.
    fn place(&mut self, item: &Item) -> bool {
        let free_width = self.width - self.cursor;
        let best = item
            .allowed_rotation
            .permutations(item.dims)
            .into_iter()
            .filter(|d| d.width <= free_width && d.length <= self.length && d.depth <= self.depth)
            .min_by(|a, b| {
                a.width
                    .cmp(&b.width)
                    .then_with(|| b.footprint().cmp(&a.footprint()))
                    .then_with(|| a.cmp(b))
            });

        match best {
            Some(dims) => {
                self.cursor += dims.width;
                true
            }
            None => false,
        }
    }
}
