//! Orientations, remaining space and the geometric checks around them.
//!
//! An [`Orientation`] is an item turned into one of the axis permutations its
//! rotation mode allows. The functions in this module generate candidate
//! orientations for a placement cursor and filter them by fit and stability
//! before they reach the comparator.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::ValidationError;
use crate::model::{Container, Item};
use crate::packed::{PackedBox, PackedItem};
use crate::types::{Dimensional, Dimensions, Rotation, Weighted};

/// Minimum tipping angle (radians, ~15°) for an orientation to count as stable.
const STABILITY_ANGLE: f64 = 0.261;

/// An item in one specific rotation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Orientation {
    item: Arc<Item>,
    dims: Dimensions,
    surface_footprint: u64,
}

impl Orientation {
    /// Creates an orientation after checking that `dims` is a permutation of the item's
    /// raw dimensions.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use boxpack_lookahead::geometry::Orientation;
    /// use boxpack_lookahead::model::Item;
    /// use boxpack_lookahead::types::{Dimensions, Rotation};
    ///
    /// let item = Item::new("Item", Dimensions::new(4, 10, 10), 10, Rotation::KeepFlat).unwrap();
    /// let item = Arc::new(item);
    /// let turned = Orientation::new(item.clone(), Dimensions::new(10, 4, 10)).unwrap();
    /// assert_eq!(turned.surface_footprint(), 40);
    /// assert!(Orientation::new(item, Dimensions::new(4, 4, 10)).is_err());
    /// ```
    pub fn new(item: Arc<Item>, dims: Dimensions) -> Result<Self, ValidationError> {
        if !dims.is_permutation_of(&item.dims) {
            return Err(ValidationError::InvalidOrientation(format!(
                "{dims} is not a rotation of '{}' ({})",
                item.description, item.dims
            )));
        }
        Ok(Self::from_permutation(item, dims))
    }

    fn from_permutation(item: Arc<Item>, dims: Dimensions) -> Self {
        Self {
            item,
            surface_footprint: dims.footprint(),
            dims,
        }
    }

    /// The item being oriented.
    pub fn item(&self) -> &Arc<Item> {
        &self.item
    }

    /// Width × length of the rotated item.
    pub fn surface_footprint(&self) -> u64 {
        self.surface_footprint
    }

    /// Is this orientation stable (low centre of gravity)?
    ///
    /// Calculated as if the tipping point is above 15 degrees, assuming equal weight
    /// distribution.
    pub fn is_stable(&self) -> bool {
        is_stable(self.dims)
    }
}

impl Dimensional for Orientation {
    fn dimensions(&self) -> Dimensions {
        self.dims
    }
}

impl Weighted for Orientation {
    fn weight(&self) -> u32 {
        self.item.weight
    }
}

/// Stability test shared by orientations and the lookahead simulation.
pub fn is_stable(dims: Dimensions) -> bool {
    let depth = dims.depth.max(1);
    let min_side = dims.width.min(dims.length);
    (f64::from(min_side) / f64::from(depth)).atan() > STABILITY_ANGLE
}

/// Space available at the current placement cursor.
///
/// `row_length` is the length already claimed by the active row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RemainingSpace {
    pub width_left: u32,
    pub length_left: u32,
    pub depth_left: u32,
    pub row_length: u32,
}

impl RemainingSpace {
    /// Creates a new remaining-space description.
    pub const fn new(width_left: u32, length_left: u32, depth_left: u32, row_length: u32) -> Self {
        Self {
            width_left,
            length_left,
            depth_left,
            row_length,
        }
    }

    /// Space of an empty container.
    pub const fn of_container(container: &Container) -> Self {
        Self::new(
            container.inner.width,
            container.inner.length,
            container.inner.depth,
            0,
        )
    }

    /// Checks if `dims` can be placed without driving any field negative.
    #[inline]
    pub fn admits(&self, dims: Dimensions) -> bool {
        dims.width <= self.width_left
            && dims.length <= self.length_left
            && dims.depth <= self.depth_left
    }

    /// Space left over in each direction after placing `dims`.
    #[inline]
    pub fn leftover(&self, dims: Dimensions) -> Leftover {
        Leftover {
            width: i64::from(self.width_left) - i64::from(dims.width),
            length: i64::from(self.length_left) - i64::from(dims.length),
            depth: i64::from(self.depth_left) - i64::from(dims.depth),
        }
    }
}

/// Leftover space per axis; negative only for orientations that do not fit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Leftover {
    pub width: i64,
    pub length: i64,
    pub depth: i64,
}

impl Leftover {
    /// The tighter of the two horizontal gaps.
    #[inline]
    pub fn min_gap(&self) -> i64 {
        self.width.min(self.length)
    }
}

/// Item-specific placement rule, such as "at most two batteries per box".
///
/// Consulted for every candidate that fits the remaining space. `packed_box` holds the
/// items already placed; `position` is where the candidate would go.
pub trait PlacementConstraint: Send + Sync {
    fn can_be_packed(
        &self,
        packed_box: &PackedBox,
        position: (u32, u32, u32),
        dims: Dimensions,
    ) -> bool;
}

/// Where the next item goes: the box packed so far, the cursor position and an optional
/// constraint of the item being placed.
#[derive(Clone)]
pub struct PlacementSite<'a> {
    pub packed: &'a PackedBox,
    pub position: (u32, u32, u32),
    pub constraint: Option<Arc<dyn PlacementConstraint>>,
}

impl<'a> PlacementSite<'a> {
    pub fn new(packed: &'a PackedBox, position: (u32, u32, u32)) -> Self {
        Self {
            packed,
            position,
            constraint: None,
        }
    }

    pub fn with_constraint(mut self, constraint: Arc<dyn PlacementConstraint>) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn container(&self) -> &'a Container {
        self.packed.container()
    }

    /// Checks the constraint, if any, for a candidate at this site.
    pub fn permits(&self, dims: Dimensions) -> bool {
        self.constraint
            .as_ref()
            .is_none_or(|constraint| constraint.can_be_packed(self.packed, self.position, dims))
    }
}

impl fmt::Debug for PlacementSite<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlacementSite")
            .field("container", &self.packed.container().reference)
            .field("packed_items", &self.packed.items().count())
            .field("position", &self.position)
            .field("constrained", &self.constraint.is_some())
            .finish()
    }
}

/// Generates every orientation the item's rotation mode allows.
///
/// If the previously packed orientation belongs to an item of the same size and is also
/// allowed for this item, only that orientation is offered so that runs of identical
/// items stay aligned.
pub fn all_orientations(item: &Arc<Item>, prev: Option<&Orientation>) -> Vec<Orientation> {
    let permutations = item.allowed_rotation.permutations(item.dims);

    if let Some(prev) = prev {
        if prev.item().is_same_dimensions(item) && permutations.contains(&prev.dimensions()) {
            return vec![Orientation::from_permutation(
                Arc::clone(item),
                prev.dimensions(),
            )];
        }
    }

    permutations
        .into_iter()
        .map(|dims| Orientation::from_permutation(Arc::clone(item), dims))
        .collect()
}

/// Orientations that fit into the remaining space and satisfy the site's constraint.
pub fn possible_orientations(
    item: &Arc<Item>,
    prev: Option<&Orientation>,
    space: &RemainingSpace,
    site: Option<&PlacementSite<'_>>,
) -> Vec<Orientation> {
    all_orientations(item, prev)
        .into_iter()
        .filter(|orientation| space.admits(orientation.dimensions()))
        .filter(|orientation| site.is_none_or(|site| site.permits(orientation.dimensions())))
        .collect()
}

/// Memo of whether an item type can stand stably in an empty container.
///
/// Keyed by raw item dimensions, rotation mode and container inner dimensions.
#[derive(Debug, Default)]
pub struct EmptyBoxStability {
    known: DashMap<(Dimensions, Rotation, Dimensions), bool>,
}

impl EmptyBoxStability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Does `item` have a stable orientation that fits the empty `container`?
    pub fn has_stable_orientation(&self, item: &Item, container: &Container) -> bool {
        let key = (item.dims, item.allowed_rotation, container.inner);
        if let Some(known) = self.known.get(&key) {
            return *known;
        }

        let stable = item
            .allowed_rotation
            .permutations(item.dims)
            .into_iter()
            .any(|dims| dims.fits_within(&container.inner) && is_stable(dims));
        self.known.insert(key, stable);
        stable
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    pub fn clear(&self) {
        self.known.clear();
    }
}

/// Filters orientations by stability.
///
/// Stable orientations (or ones that exactly fill the container depth) are preferred.
/// Unstable ones are only returned if the item could not stand stably even in the empty
/// container; otherwise nothing is usable here and the item waits for a better spot.
pub fn usable_orientations(
    item: &Item,
    possible: Vec<Orientation>,
    container: &Container,
    stability: &EmptyBoxStability,
) -> Vec<Orientation> {
    let (stable, unstable): (Vec<_>, Vec<_>) = possible
        .into_iter()
        .partition(|o| o.is_stable() || o.dimensions().depth == container.inner.depth);

    if !stable.is_empty() {
        return stable;
    }
    if !unstable.is_empty() && !stability.has_stable_orientation(item, container) {
        return unstable;
    }
    Vec::new()
}

/// Calculates the overlap of two intervals in one dimension.
///
/// # Returns
/// Length of the overlap, at least 0
pub fn overlap_1d(a_start: u32, a_len: u32, b_start: u32, b_len: u32) -> u32 {
    let a_end = a_start.saturating_add(a_len);
    let b_end = b_start.saturating_add(b_len);
    a_end.min(b_end).saturating_sub(a_start.max(b_start))
}

/// Checks whether two packed items occupy the same space.
///
/// Items touching on a face do not intersect.
pub fn intersects(a: &PackedItem, b: &PackedItem) -> bool {
    let (ax, ay, az) = a.position();
    let (bx, by, bz) = b.position();
    let ad = a.dimensions();
    let bd = b.dimensions();

    overlap_1d(ax, ad.width, bx, bd.width) > 0
        && overlap_1d(ay, ad.length, by, bd.length) > 0
        && overlap_1d(az, ad.depth, bz, bd.depth) > 0
}

/// Checks whether a packed item lies completely inside the container.
pub fn inside_container(item: &PackedItem, container: &Container) -> bool {
    let (x, y, z) = item.position();
    let dims = item.dimensions();
    u64::from(x) + u64::from(dims.width) <= u64::from(container.inner.width)
        && u64::from(y) + u64::from(dims.length) <= u64::from(container.inner.length)
        && u64::from(z) + u64::from(dims.depth) <= u64::from(container.inner.depth)
}
