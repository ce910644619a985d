//! Common types and traits for box geometry.
//!
//! This module defines the integer dimension triple used throughout the crate,
//! the rotation modes an item may allow, and small trait abstractions shared by
//! items, orientations, containers and packed results.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// Width, length and depth of an item, orientation or container interior.
///
/// Units are not interpreted by the crate; callers typically use millimetres.
///
/// # Examples
/// ```
/// use boxpack_lookahead::types::Dimensions;
///
/// let dims = Dimensions::new(4, 10, 10);
/// assert_eq!(dims.volume(), 400);
/// assert_eq!(dims.footprint(), 40);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub length: u32,
    pub depth: u32,
}

impl Dimensions {
    /// Creates a new dimension triple.
    #[inline]
    pub const fn new(width: u32, length: u32, depth: u32) -> Self {
        Self {
            width,
            length,
            depth,
        }
    }

    /// Converts to tuple format.
    #[inline]
    pub const fn as_tuple(&self) -> (u32, u32, u32) {
        (self.width, self.length, self.depth)
    }

    /// Calculates the volume (product of all components).
    #[inline]
    pub fn volume(&self) -> u64 {
        u64::from(self.width) * u64::from(self.length) * u64::from(self.depth)
    }

    /// Calculates the footprint (width × length).
    #[inline]
    pub fn footprint(&self) -> u64 {
        u64::from(self.width) * u64::from(self.length)
    }

    /// Returns the components in ascending order.
    #[inline]
    pub fn sorted(&self) -> [u32; 3] {
        let mut dims = [self.width, self.length, self.depth];
        dims.sort_unstable();
        dims
    }

    /// Checks whether `other` uses the same three values in any order.
    #[inline]
    pub fn is_permutation_of(&self, other: &Self) -> bool {
        self.sorted() == other.sorted()
    }

    /// Checks if all components are non-zero.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.length > 0 && self.depth > 0
    }

    /// Checks if these dimensions fit within another triple (component-wise <=).
    #[inline]
    pub fn fits_within(&self, container: &Self) -> bool {
        self.width <= container.width
            && self.length <= container.length
            && self.depth <= container.depth
    }
}

impl From<(u32, u32, u32)> for Dimensions {
    #[inline]
    fn from(tuple: (u32, u32, u32)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.length, self.depth)
    }
}

/// Rotations an item tolerates while being packed.
///
/// The numeric codes are part of the serialized output and must stay stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rotation {
    /// Must be placed in its defined orientation only.
    Fixed,
    /// Can be turned sideways 90°, but never placed on its side ("this way up").
    KeepFlat,
    /// No handling restrictions; all six axis permutations are allowed.
    BestFit,
}

impl Rotation {
    /// Serialized code of the rotation mode.
    pub const fn code(self) -> u8 {
        match self {
            Rotation::Fixed => 1,
            Rotation::KeepFlat => 2,
            Rotation::BestFit => 6,
        }
    }

    /// Parses a serialized rotation code.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Rotation::Fixed),
            2 => Some(Rotation::KeepFlat),
            6 => Some(Rotation::BestFit),
            _ => None,
        }
    }

    /// Returns the distinct dimension permutations this mode allows for `dims`.
    ///
    /// The unrotated triple always comes first; duplicates (e.g. for cubes) are dropped
    /// while keeping the first occurrence, so the order is deterministic.
    pub fn permutations(self, dims: Dimensions) -> Vec<Dimensions> {
        let Dimensions {
            width: w,
            length: l,
            depth: d,
        } = dims;

        let mut candidates = vec![Dimensions::new(w, l, d)];
        if self != Rotation::Fixed {
            candidates.push(Dimensions::new(l, w, d));
        }
        if self == Rotation::BestFit {
            candidates.extend([
                Dimensions::new(w, d, l),
                Dimensions::new(l, d, w),
                Dimensions::new(d, w, l),
                Dimensions::new(d, l, w),
            ]);
        }

        let mut unique: Vec<Dimensions> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !unique.contains(&candidate) {
                unique.push(candidate);
            }
        }
        unique
    }
}

impl Serialize for Rotation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for Rotation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RotationVisitor;

        impl Visitor<'_> for RotationVisitor {
            type Value = Rotation;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a rotation code (1, 2 or 6)")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Rotation, E> {
                u8::try_from(value)
                    .ok()
                    .and_then(Rotation::from_code)
                    .ok_or_else(|| E::custom(format!("unknown rotation code {value}")))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Rotation, E> {
                u64::try_from(value)
                    .map_err(|_| E::custom(format!("unknown rotation code {value}")))
                    .and_then(|v| self.visit_u64(v))
            }
        }

        deserializer.deserialize_u8(RotationVisitor)
    }
}

/// Trait for objects with box dimensions.
pub trait Dimensional {
    /// Returns the dimensions of the object.
    fn dimensions(&self) -> Dimensions;

    /// Calculates the volume.
    fn volume(&self) -> u64 {
        self.dimensions().volume()
    }

    /// Calculates the footprint (width × length).
    fn footprint(&self) -> u64 {
        self.dimensions().footprint()
    }
}

/// Trait for objects with weight.
pub trait Weighted {
    /// Returns the weight, typically in grams.
    fn weight(&self) -> u32;
}

/// Validation helpers shared by the model constructors.
pub mod validation {
    use super::Dimensions;
    use crate::error::ValidationError;

    /// Validates a single dimension.
    ///
    /// # Parameters
    /// * `value` - The value to validate
    /// * `name` - Name of the dimension for error messages
    pub fn validate_dimension(value: u32, name: &str) -> Result<(), ValidationError> {
        if value == 0 {
            return Err(ValidationError::InvalidDimension(format!(
                "{name} must be positive, got: {value}"
            )));
        }
        Ok(())
    }

    /// Validates all three components of a dimension triple.
    pub fn validate_dimensions(dims: Dimensions, subject: &str) -> Result<(), ValidationError> {
        validate_dimension(dims.width, &format!("{subject} width"))?;
        validate_dimension(dims.length, &format!("{subject} length"))?;
        validate_dimension(dims.depth, &format!("{subject} depth"))?;
        Ok(())
    }
}
