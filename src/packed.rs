//! Packed results: placed items and the boxes holding them.
//!
//! All derived quantities (weights, volumes, utilisation) are recomputed from the
//! current contents on every call.

use std::slice;
use std::sync::Arc;

use crate::error::{Error, Result, ValidationError};
use crate::geometry::{Orientation, inside_container, intersects};
use crate::model::{Container, Item};
use crate::types::{Dimensional, Dimensions, Weighted};

/// An item placed at a position in a specific orientation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PackedItem {
    orientation: Orientation,
    position: (u32, u32, u32),
}

impl PackedItem {
    /// Creates a packed item from explicit rotated dimensions.
    ///
    /// # Returns
    /// `Err(ValidationError::InvalidOrientation)` if `dims` is not a rotation of the item
    pub fn new(
        item: Arc<Item>,
        position: (u32, u32, u32),
        dims: Dimensions,
    ) -> std::result::Result<Self, ValidationError> {
        Ok(Self::from_orientation(Orientation::new(item, dims)?, position))
    }

    /// Places an orientation at `position`.
    pub fn from_orientation(orientation: Orientation, position: (u32, u32, u32)) -> Self {
        Self {
            orientation,
            position,
        }
    }

    /// The packed item as supplied.
    pub fn item(&self) -> &Arc<Item> {
        self.orientation.item()
    }

    /// The orientation the item was packed in.
    pub fn orientation(&self) -> &Orientation {
        &self.orientation
    }

    /// Position (x, y, z) of the lower left front corner.
    pub fn position(&self) -> (u32, u32, u32) {
        self.position
    }

    pub fn x(&self) -> u32 {
        self.position.0
    }

    pub fn y(&self) -> u32 {
        self.position.1
    }

    pub fn z(&self) -> u32 {
        self.position.2
    }
}

impl Dimensional for PackedItem {
    fn dimensions(&self) -> Dimensions {
        self.orientation.dimensions()
    }
}

impl Weighted for PackedItem {
    fn weight(&self) -> u32 {
        self.orientation.weight()
    }
}

/// Packed items in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackedItemList {
    items: Vec<PackedItem>,
}

impl PackedItemList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a packed item.
    pub fn insert(&mut self, item: PackedItem) {
        self.items.push(item);
    }

    /// Number of packed items.
    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, PackedItem> {
        self.items.iter()
    }

    /// Read-only view of the first `k` items (fewer if the list is shorter).
    pub fn top_n(&self, k: usize) -> &[PackedItem] {
        &self.items[..k.min(self.items.len())]
    }

    /// Total volume of the packed orientations.
    pub fn volume(&self) -> u64 {
        self.items.iter().map(|i| i.volume()).sum()
    }

    /// Total weight of the packed items.
    pub fn weight(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.weight())).sum()
    }
}

impl FromIterator<PackedItem> for PackedItemList {
    fn from_iter<T: IntoIterator<Item = PackedItem>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PackedItemList {
    type Item = &'a PackedItem;
    type IntoIter = slice::Iter<'a, PackedItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// A container together with the items packed into it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedBox {
    container: Container,
    items: PackedItemList,
}

impl PackedBox {
    /// Creates a packed box after checking that every item lies inside the container and
    /// that no two items share space.
    ///
    /// Weight limits are not checked here; they are a concern of the placement engine.
    pub fn new(container: Container, items: PackedItemList) -> Result<Self> {
        let packed = Self { container, items };
        packed.assert_packing_complies_with_real_world()?;
        Ok(packed)
    }

    /// Creates a packed box holding no items.
    pub fn empty(container: Container) -> Self {
        Self {
            container,
            items: PackedItemList::new(),
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn items(&self) -> &PackedItemList {
        &self.items
    }

    /// Adds an item, rejecting placements outside the box or overlapping other items.
    pub fn insert(&mut self, item: PackedItem) -> Result<()> {
        self.check_bounds(&item)?;
        if let Some(other) = self.items.iter().find(|other| intersects(other, &item)) {
            return Err(overlap_error(other, &item));
        }
        self.items.insert(item);
        Ok(())
    }

    /// Packed weight: empty container plus items.
    pub fn total_weight(&self) -> u64 {
        u64::from(self.container.empty_weight) + self.item_weight()
    }

    /// Weight of the items only.
    pub fn item_weight(&self) -> u64 {
        self.items.weight()
    }

    /// Weight that can still be added before reaching the container's limit.
    ///
    /// Negative if the box is already overweight.
    pub fn remaining_weight(&self) -> i64 {
        i64::from(self.container.max_weight) - self.total_weight() as i64
    }

    /// Furthest extent of the items along the width axis.
    pub fn used_width(&self) -> u32 {
        self.items
            .iter()
            .map(|i| i.x() + i.dimensions().width)
            .max()
            .unwrap_or(0)
    }

    /// Furthest extent of the items along the length axis.
    pub fn used_length(&self) -> u32 {
        self.items
            .iter()
            .map(|i| i.y() + i.dimensions().length)
            .max()
            .unwrap_or(0)
    }

    /// Furthest extent of the items along the depth axis.
    pub fn used_depth(&self) -> u32 {
        self.items
            .iter()
            .map(|i| i.z() + i.dimensions().depth)
            .max()
            .unwrap_or(0)
    }

    pub fn remaining_width(&self) -> u32 {
        self.container.inner.width.saturating_sub(self.used_width())
    }

    pub fn remaining_length(&self) -> u32 {
        self.container.inner.length.saturating_sub(self.used_length())
    }

    pub fn remaining_depth(&self) -> u32 {
        self.container.inner.depth.saturating_sub(self.used_depth())
    }

    pub fn inner_volume(&self) -> u64 {
        self.container.inner_volume()
    }

    /// Sum of the volumes of the packed orientations.
    pub fn used_volume(&self) -> u64 {
        self.items.volume()
    }

    pub fn unused_volume(&self) -> u64 {
        self.inner_volume().saturating_sub(self.used_volume())
    }

    /// Percentage of the inner volume occupied by items, rounded to one decimal.
    pub fn volume_utilisation(&self) -> f64 {
        let inner = self.inner_volume().max(1);
        round_one_decimal(self.used_volume() as f64 / inner as f64 * 100.0)
    }

    fn check_bounds(&self, item: &PackedItem) -> Result<()> {
        if inside_container(item, &self.container) {
            return Ok(());
        }
        let (x, y, z) = item.position();
        Err(Error::InvalidPlacement(format!(
            "'{}' ({}) at ({x}, {y}, {z}) exceeds the inner dimensions {} of '{}'",
            item.item().description,
            item.dimensions(),
            self.container.inner,
            self.container.reference
        )))
    }

    fn assert_packing_complies_with_real_world(&self) -> Result<()> {
        let items: Vec<&PackedItem> = self.items.iter().collect();
        for (idx, item) in items.iter().enumerate() {
            self.check_bounds(item)?;
            if let Some(other) = items[idx + 1..].iter().find(|other| intersects(other, item)) {
                return Err(overlap_error(other, item));
            }
        }
        Ok(())
    }
}

fn overlap_error(a: &PackedItem, b: &PackedItem) -> Error {
    Error::InvalidPlacement(format!(
        "'{}' at {:?} overlaps '{}' at {:?}",
        a.item().description,
        a.position(),
        b.item().description,
        b.position()
    ))
}

pub(crate) fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rotation;

    fn item(description: &str, dims: (u32, u32, u32), weight: u32) -> Arc<Item> {
        Arc::new(Item::new(description, dims.into(), weight, Rotation::BestFit).unwrap())
    }

    fn container(
        outer: (u32, u32, u32),
        empty_weight: u32,
        inner: (u32, u32, u32),
        max_weight: u32,
    ) -> Container {
        Container::new("Box", outer.into(), empty_weight, inner.into(), max_weight).unwrap()
    }

    fn single_item_box() -> PackedBox {
        let packed = PackedItem::new(
            item("Item", (4, 10, 10), 10),
            (0, 0, 0),
            Dimensions::new(4, 10, 10),
        )
        .unwrap();
        PackedBox::new(
            container((10, 10, 20), 10, (10, 10, 20), 10),
            std::iter::once(packed).collect(),
        )
        .unwrap()
    }

    #[test]
    fn packed_box_getters() {
        let packed = PackedItem::new(
            item("Item", (230, 330, 6), 320),
            (0, 0, 0),
            Dimensions::new(230, 330, 6),
        )
        .unwrap();
        let packed_box = PackedBox::new(
            container((370, 375, 60), 140, (364, 374, 40), 3000),
            std::iter::once(packed).collect(),
        )
        .unwrap();

        assert_eq!(packed_box.total_weight(), 460);
        assert_eq!(packed_box.remaining_width(), 134);
        assert_eq!(packed_box.remaining_length(), 44);
        assert_eq!(packed_box.remaining_depth(), 34);
        assert_eq!(packed_box.remaining_weight(), 2540);
        assert_eq!(packed_box.inner_volume(), 5_445_440);
    }

    #[test]
    fn volume_utilisation_of_single_item() {
        let packed_box = single_item_box();
        assert_eq!(packed_box.used_volume(), 400);
        assert_eq!(packed_box.unused_volume(), 1600);
        assert_eq!(packed_box.volume_utilisation(), 20.0);
    }

    #[test]
    fn item_weight_excludes_container() {
        let packed_box = single_item_box();
        assert_eq!(packed_box.item_weight(), 10);
        assert_eq!(packed_box.total_weight(), 20);
        assert_eq!(packed_box.remaining_weight(), -10);
    }

    #[test]
    fn derived_values_follow_inserts() {
        let mut packed_box = single_item_box();
        let second = PackedItem::new(
            item("Second", (6, 10, 10), 5),
            (4, 0, 0),
            Dimensions::new(6, 10, 10),
        )
        .unwrap();
        packed_box.insert(second).unwrap();

        assert_eq!(packed_box.used_volume(), 1000);
        assert_eq!(packed_box.volume_utilisation(), 50.0);
        assert_eq!(packed_box.used_width(), 10);
        assert_eq!(packed_box.total_weight(), 25);
    }

    #[test]
    fn rejects_item_outside_container() {
        let packed = PackedItem::new(
            item("Item", (4, 10, 10), 10),
            (7, 0, 0),
            Dimensions::new(4, 10, 10),
        )
        .unwrap();
        let result = PackedBox::new(
            container((10, 10, 20), 0, (10, 10, 20), 100),
            std::iter::once(packed).collect(),
        );
        assert!(matches!(result, Err(Error::InvalidPlacement(_))));
    }

    #[test]
    fn rejects_overlapping_items() {
        let mut packed_box = single_item_box();
        let overlapping = PackedItem::new(
            item("Other", (4, 10, 10), 10),
            (2, 0, 5),
            Dimensions::new(4, 10, 10),
        )
        .unwrap();
        assert!(matches!(
            packed_box.insert(overlapping),
            Err(Error::InvalidPlacement(_))
        ));
        assert_eq!(packed_box.items().count(), 1);
    }

    #[test]
    fn packed_item_rejects_foreign_dimensions() {
        let result = PackedItem::new(item("Item", (4, 10, 10), 1), (0, 0, 0), (4, 4, 10).into());
        assert!(matches!(result, Err(ValidationError::InvalidOrientation(_))));
    }

    #[test]
    fn top_n_is_a_view_in_insertion_order() {
        let list: PackedItemList = (0..5u32)
            .map(|i| {
                PackedItem::new(
                    item(&format!("Item {i}"), (1, 1, 1), i),
                    (i, 0, 0),
                    Dimensions::new(1, 1, 1),
                )
                .unwrap()
            })
            .collect();

        let top = list.top_n(3);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].item().description, "Item 0");
        assert_eq!(top[2].item().description, "Item 2");
        assert_eq!(list.top_n(10).len(), 5);
        assert_eq!(list.count(), 5);
        assert_eq!(list.weight(), 10);
    }
}
