//! # maskmatch index
//!
//! A read-only bounding-box index over the mask set (building footprints,
//! task boundaries, ...). Every mask is bulk-loaded into an `rstar` R-tree
//! keyed by its axis-aligned box; queries hand back the masks whose box
//! overlaps the query box so the matcher only runs exact geometry tests on a
//! handful of candidates.
//!
//! ## Key Concepts
//!
//! - [`BoundingBox`]: `(min_x, min_y, max_x, max_y)` derived from a geometry.
//! - [`MaskIndex`]: the bulk-loaded tree plus the owned mask features.
//! - [`MaskSlot`]: a mask's position in load order. Query results are always
//!   sorted by slot, so candidate order is deterministic and independent of
//!   tree layout.
//! - [`MaskRef`]: a borrowed `(slot, bbox, feature)` triple.
//!
//! The index never changes after [`MaskIndex::build`]. It is `Sync`, so any
//! number of threads may query it while a single writer owns the per-mask
//! bookkeeping kept elsewhere.
//!
//! ## Example Usage
//!
//! ```
//! use geo::polygon;
//! use index::{BoundingBox, MaskIndex};
//! use ingest::{Feature, FeatureId};
//!
//! let footprint = Feature::new(
//!     FeatureId::new(0),
//!     polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
//! );
//! let index = MaskIndex::build(vec![footprint]).unwrap();
//!
//! let candidates = index.query(&BoundingBox::new(5.0, 5.0, 5.0, 5.0));
//! assert_eq!(candidates.len(), 1);
//! assert!(index.query(&BoundingBox::new(20.0, 20.0, 21.0, 21.0)).is_empty());
//! ```

mod bbox;
mod mask;

pub use crate::bbox::BoundingBox;
pub use crate::mask::{MaskIndex, MaskRef, MaskSlot};

use thiserror::Error;

/// Errors raised while building the index.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// A mask geometry is empty or has non-finite coordinates.
    #[error("feature {feature} has no usable bounding box")]
    Data { feature: String },
}
