//! Data models for items and containers.
//!
//! This module defines the input data of a packing run:
//! - `Item`: an object to be packed with raw dimensions, weight and allowed rotation
//! - `Container`: a box type with inner/outer dimensions and weight limits
//!
//! Both implement the traits from the `types` module.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::validation::validate_dimensions;
use crate::types::{Dimensional, Dimensions, Rotation, Weighted};

/// An object to be packed.
///
/// # Fields
/// * `description` - Identifier of the item (SKU, name, ...)
/// * `dims` - Raw dimensions as supplied, before any rotation
/// * `weight` - Weight of the item, typically in grams
/// * `allowed_rotation` - Rotations the item tolerates
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub description: String,
    pub dims: Dimensions,
    pub weight: u32,
    pub allowed_rotation: Rotation,
}

impl Item {
    /// Creates a new item with validation.
    ///
    /// # Returns
    /// `Ok(Item)` for positive dimensions, otherwise `Err(ValidationError)`
    ///
    /// # Examples
    /// ```
    /// use boxpack_lookahead::model::Item;
    /// use boxpack_lookahead::types::{Dimensions, Rotation};
    ///
    /// let item = Item::new("Item", Dimensions::new(4, 10, 10), 10, Rotation::KeepFlat);
    /// assert!(item.is_ok());
    ///
    /// let invalid = Item::new("Item", Dimensions::new(0, 10, 10), 10, Rotation::KeepFlat);
    /// assert!(invalid.is_err());
    /// ```
    pub fn new(
        description: impl Into<String>,
        dims: Dimensions,
        weight: u32,
        allowed_rotation: Rotation,
    ) -> Result<Self, ValidationError> {
        validate_dimensions(dims, "Item")?;
        Ok(Self {
            description: description.into(),
            dims,
            weight,
            allowed_rotation,
        })
    }

    /// Checks whether `other` has the same dimensions, in any order.
    pub fn is_same_dimensions(&self, other: &Item) -> bool {
        self.dims.is_permutation_of(&other.dims)
    }
}

impl Dimensional for Item {
    fn dimensions(&self) -> Dimensions {
        self.dims
    }
}

impl Weighted for Item {
    fn weight(&self) -> u32 {
        self.weight
    }
}

/// A container type items are packed into.
///
/// Only the inner dimensions take part in packing; the outer dimensions are
/// carried for callers that need them (shipping rates, visualisation).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Container {
    pub reference: String,
    pub outer: Dimensions,
    pub empty_weight: u32,
    pub inner: Dimensions,
    pub max_weight: u32,
}

impl Container {
    /// Creates a new container type with validation.
    ///
    /// The inner dimensions must be positive and may not exceed the outer ones.
    pub fn new(
        reference: impl Into<String>,
        outer: Dimensions,
        empty_weight: u32,
        inner: Dimensions,
        max_weight: u32,
    ) -> Result<Self, ValidationError> {
        let reference = reference.into();
        validate_dimensions(inner, "Container inner")?;
        if !inner.fits_within(&outer) {
            return Err(ValidationError::InvalidContainer(format!(
                "inner dimensions {inner} of '{reference}' exceed outer dimensions {outer}"
            )));
        }

        Ok(Self {
            reference,
            outer,
            empty_weight,
            inner,
            max_weight,
        })
    }

    /// Volume available for items.
    pub fn inner_volume(&self) -> u64 {
        self.inner.volume()
    }

    /// Maximum weight of items that fit on top of the empty weight.
    pub fn item_capacity(&self) -> u32 {
        self.max_weight.saturating_sub(self.empty_weight)
    }
}

impl Dimensional for Container {
    fn dimensions(&self) -> Dimensions {
        self.inner
    }
}
