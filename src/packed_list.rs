//! Ordered collection of packed boxes and the statistics over it.

use std::cmp::Ordering;
use std::fmt::Debug;
use std::slice;

use crate::error::{Error, Result};
use crate::packed::{PackedBox, round_one_decimal};

/// Priority order of packed boxes. `Less` means `a` ranks before `b`.
pub trait PackedBoxSorter: Debug + Send + Sync {
    fn compare(&self, a: &PackedBox, b: &PackedBox) -> Ordering;
}

/// Heaviest box first.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeaviestFirst;

impl PackedBoxSorter for HeaviestFirst {
    fn compare(&self, a: &PackedBox, b: &PackedBox) -> Ordering {
        b.total_weight().cmp(&a.total_weight())
    }
}

/// Box with the most items first, then the better utilised one, then the fuller one.
#[derive(Clone, Copy, Debug, Default)]
pub struct MostItemsFirst;

impl PackedBoxSorter for MostItemsFirst {
    fn compare(&self, a: &PackedBox, b: &PackedBox) -> Ordering {
        b.items()
            .count()
            .cmp(&a.items().count())
            .then_with(|| b.volume_utilisation().total_cmp(&a.volume_utilisation()))
            .then_with(|| b.used_volume().cmp(&a.used_volume()))
    }
}

/// Packed boxes kept in descending priority.
///
/// Boxes of equal priority stay in insertion order.
///
/// # Examples
/// ```
/// use boxpack_lookahead::model::Container;
/// use boxpack_lookahead::packed::PackedBox;
/// use boxpack_lookahead::packed_list::PackedBoxList;
/// use boxpack_lookahead::types::Dimensions;
///
/// let cube = Dimensions::new(10, 10, 10);
/// let light = Container::new("Light", cube, 1, cube, 50).unwrap();
/// let heavy = Container::new("Heavy", cube, 9, cube, 50).unwrap();
///
/// let mut list = PackedBoxList::new();
/// list.insert(PackedBox::empty(light));
/// list.insert(PackedBox::empty(heavy));
/// assert_eq!(list.top().unwrap().container().reference, "Heavy");
/// ```
#[derive(Debug)]
pub struct PackedBoxList {
    boxes: Vec<PackedBox>,
    sorter: Box<dyn PackedBoxSorter>,
}

impl PackedBoxList {
    /// Empty list ordered by [`HeaviestFirst`].
    pub fn new() -> Self {
        Self::with_sorter(Box::new(HeaviestFirst))
    }

    pub fn with_sorter(sorter: Box<dyn PackedBoxSorter>) -> Self {
        Self {
            boxes: Vec::new(),
            sorter,
        }
    }

    /// Inserts a box at its priority position, after any boxes of equal priority.
    pub fn insert(&mut self, packed_box: PackedBox) {
        let idx = self
            .boxes
            .partition_point(|existing| {
                self.sorter.compare(existing, &packed_box) != Ordering::Greater
            });
        self.boxes.insert(idx, packed_box);
    }

    /// Inserts every box in turn.
    pub fn insert_from_array(&mut self, boxes: impl IntoIterator<Item = PackedBox>) {
        for packed_box in boxes {
            self.insert(packed_box);
        }
    }

    /// The highest-priority box.
    pub fn top(&self) -> Result<&PackedBox> {
        self.boxes.first().ok_or(Error::EmptyBoxList)
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, PackedBox> {
        self.boxes.iter()
    }

    /// Percentage of the combined inner volume used by items, rounded to one decimal.
    ///
    /// 0 for an empty list.
    pub fn volume_utilisation(&self) -> f64 {
        let (used, inner) = self
            .boxes
            .iter()
            .fold((0u64, 0u64), |(used, inner), b| {
                (used + b.used_volume(), inner + b.inner_volume())
            });
        if inner == 0 {
            return 0.0;
        }
        round_one_decimal(used as f64 / inner as f64 * 100.0)
    }

    /// Average total weight per box.
    pub fn mean_weight(&self) -> Result<f64> {
        self.mean_of(PackedBox::total_weight)
    }

    /// Average item weight per box, excluding the containers themselves.
    pub fn mean_item_weight(&self) -> Result<f64> {
        self.mean_of(PackedBox::item_weight)
    }

    /// Population variance of the box weights, rounded to one decimal.
    ///
    /// 0 for an empty list.
    pub fn weight_variance(&self) -> f64 {
        let Ok(mean) = self.mean_weight() else {
            return 0.0;
        };
        let sum: f64 = self
            .boxes
            .iter()
            .map(|b| (b.total_weight() as f64 - mean).powi(2))
            .sum();
        round_one_decimal(sum / self.boxes.len() as f64)
    }

    fn mean_of(&self, weight: impl Fn(&PackedBox) -> u64) -> Result<f64> {
        if self.boxes.is_empty() {
            return Err(Error::EmptyBoxList);
        }
        let total: u64 = self.boxes.iter().map(weight).sum();
        Ok(total as f64 / self.boxes.len() as f64)
    }
}

impl Default for PackedBoxList {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a PackedBoxList {
    type Item = &'a PackedBox;
    type IntoIter = slice::Iter<'a, PackedBox>;

    fn into_iter(self) -> Self::IntoIter {
        self.boxes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::model::{Container, Item};
    use crate::packed::PackedItem;
    use crate::types::{Dimensions, Rotation};

    fn container(reference: &str, empty_weight: u32) -> Container {
        Container::new(
            reference,
            Dimensions::new(10, 10, 10),
            empty_weight,
            Dimensions::new(10, 10, 10),
            1000,
        )
        .unwrap()
    }

    type Placement = ((u32, u32, u32), (u32, u32, u32), u32);

    fn packed_box(reference: &str, empty_weight: u32, items: &[Placement]) -> PackedBox {
        let items = items
            .iter()
            .map(|&(position, dims, weight)| {
                let item =
                    Arc::new(Item::new("Item", dims.into(), weight, Rotation::Fixed).unwrap());
                PackedItem::new(item, position, dims.into()).unwrap()
            })
            .collect();
        PackedBox::new(container(reference, empty_weight), items).unwrap()
    }

    fn references(list: &PackedBoxList) -> Vec<&str> {
        list.iter().map(|b| b.container().reference.as_str()).collect()
    }

    #[test]
    fn count_and_iteration() {
        let mut list = PackedBoxList::new();
        assert!(list.is_empty());

        list.insert(packed_box("A", 0, &[]));
        list.insert(packed_box("B", 0, &[]));
        assert_eq!(list.len(), 2);
        assert_eq!((&list).into_iter().count(), 2);
    }

    #[test]
    fn heaviest_box_is_on_top() {
        let mut list = PackedBoxList::new();
        list.insert(packed_box("Light", 0, &[((0, 0, 0), (5, 5, 5), 3)]));
        list.insert(packed_box(
            "Heavy",
            0,
            &[((0, 0, 0), (5, 5, 5), 3), ((5, 0, 0), (5, 5, 5), 4)],
        ));

        assert_eq!(list.top().unwrap().container().reference, "Heavy");
        assert_eq!(references(&list), vec!["Heavy", "Light"]);
    }

    #[test]
    fn equal_weights_keep_insertion_order() {
        let mut list = PackedBoxList::new();
        list.insert(packed_box("First", 5, &[]));
        list.insert(packed_box("Second", 5, &[]));
        list.insert(packed_box("Heavier", 6, &[]));
        list.insert(packed_box("Third", 5, &[]));

        assert_eq!(references(&list), vec!["Heavier", "First", "Second", "Third"]);
    }

    #[test]
    fn bulk_insert_matches_sequential_inserts() {
        let boxes = || {
            vec![
                packed_box("A", 3, &[]),
                packed_box("B", 7, &[]),
                packed_box("C", 3, &[]),
                packed_box("D", 5, &[]),
            ]
        };

        let mut bulk = PackedBoxList::new();
        bulk.insert_from_array(boxes());

        let mut sequential = PackedBoxList::new();
        for b in boxes() {
            sequential.insert(b);
        }

        assert_eq!(references(&bulk), references(&sequential));
        assert_eq!(references(&bulk), vec!["B", "D", "A", "C"]);
    }

    #[test]
    fn most_items_sorter_prefers_item_count() {
        let mut list = PackedBoxList::with_sorter(Box::new(MostItemsFirst));
        list.insert(packed_box("Heavy", 0, &[((0, 0, 0), (5, 5, 5), 50)]));
        list.insert(packed_box(
            "Busy",
            0,
            &[((0, 0, 0), (5, 5, 5), 1), ((5, 0, 0), (5, 5, 5), 1)],
        ));

        assert_eq!(list.top().unwrap().container().reference, "Busy");
    }

    #[test]
    fn volume_utilisation_across_boxes() {
        let mut list = PackedBoxList::new();
        list.insert(packed_box("Half", 0, &[((0, 0, 0), (5, 10, 10), 10)]));
        assert_eq!(list.volume_utilisation(), 50.0);

        list.insert(packed_box("Empty", 0, &[]));
        assert_eq!(list.volume_utilisation(), 25.0);
    }

    #[test]
    fn weight_statistics() {
        let mut list = PackedBoxList::new();
        list.insert(packed_box("A", 0, &[((0, 0, 0), (5, 5, 5), 10)]));
        list.insert(packed_box("B", 0, &[((0, 0, 0), (5, 5, 5), 20)]));

        assert_eq!(list.mean_weight().unwrap(), 15.0);
        assert_eq!(list.weight_variance(), 25.0);
    }

    #[test]
    fn mean_item_weight_ignores_containers() {
        let mut list = PackedBoxList::new();
        list.insert(packed_box("A", 100, &[((0, 0, 0), (5, 5, 5), 10)]));
        list.insert(packed_box("B", 100, &[((0, 0, 0), (5, 5, 5), 20)]));

        assert_eq!(list.mean_weight().unwrap(), 115.0);
        assert_eq!(list.mean_item_weight().unwrap(), 15.0);
    }

    #[test]
    fn empty_list_queries() {
        let list = PackedBoxList::default();
        assert!(matches!(list.top(), Err(Error::EmptyBoxList)));
        assert!(matches!(list.mean_weight(), Err(Error::EmptyBoxList)));
        assert!(matches!(list.mean_item_weight(), Err(Error::EmptyBoxList)));
        assert_eq!(list.weight_variance(), 0.0);
        assert_eq!(list.volume_utilisation(), 0.0);
    }
}
