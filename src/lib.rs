//! Orientation choice with lookahead for 3D box packing, plus the packed-result
//! containers, statistics and serialized forms built around it.
//!
//! The placement engine asks a [`PackingSession`] which orientation to use at its
//! cursor. Candidates are ranked by exact fit first; remaining ties are broken by a
//! cached estimate of how many upcoming items would still fit, falling back to purely
//! geometric criteria.

pub mod accelerator;
pub mod cache;
pub mod comparator;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod lookahead;
pub mod model;
pub mod packed;
pub mod packed_list;
pub mod session;
pub mod types;

pub use accelerator::{InProcessEvaluator, LookaheadAccelerator, ThreadPoolAccelerator};
pub use config::{AppConfig, ExportConfig, LookaheadConfig};
pub use error::{AcceleratorError, Error, Result, ValidationError};
pub use geometry::{
    EmptyBoxStability, Orientation, PlacementConstraint, PlacementSite, RemainingSpace,
};
pub use model::{Container, Item};
pub use packed::{PackedBox, PackedItem, PackedItemList};
pub use packed_list::{HeaviestFirst, MostItemsFirst, PackedBoxList, PackedBoxSorter};
pub use session::PackingSession;
pub use types::{Dimensions, Rotation};
