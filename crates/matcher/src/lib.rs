//! # maskmatch matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` decides, for each target feature, which mask feature (if any)
//! it belongs to. It sits on top of the ingest layer (`ingest`) for the
//! feature model and the index layer (`index`) for bounding-box candidates,
//! and runs exact geometry tests only on those candidates.
//!
//! A typical split run:
//! - Build a [`MaskIndex`](index::MaskIndex) from the mask set and a matching
//!   [`HitRegistry`].
//! - Feed every target through [`MatchRegistrar::register`], one at a time.
//! - Call [`resolve`] exactly once after the stream has ended.
//! - Pull [`HitRegistry::uniques`] and [`HitRegistry::nonuniques`].
//!
//! ## Core Types
//!
//! - [`MatchRegistrar`]: classifies a target as a hit, near-hit, or miss.
//!   Candidates are tried in index order and the first success wins.
//! - [`HitRegistry`]: per-mask hit and near-hit lists plus the miss set.
//! - [`resolve`]: the near-miss pass. Lone near-hit points are snapped onto
//!   their mask; a sole hit competing with near-hits is sent back to the miss
//!   set.
//! - [`FuzzyAreaMatcher`]: convex-hull area comparison for polygons that were
//!   digitized independently.
//! - [`SpatialJoiner`] / [`SpatialFilter`]: property join and disjointness
//!   filter over the same index.
//! - [`RunReport`]: counters for one run.
//!
//! ## Errors
//!
//! [`MatchError::Topology`] is never folded into "no intersection": a
//! self-intersecting mask or target stops the current registration and
//! leaves the registry untouched. [`MatchError::Data`] marks a target that
//! can be skipped.
//!
//! ## Example Usage
//!
//! ```
//! use geo::{point, polygon};
//! use index::MaskIndex;
//! use ingest::{Feature, FeatureId};
//! use matcher::{resolve, HitRegistry, MatchRegistrar, RegistrarConfig};
//!
//! let footprint = Feature::new(
//!     FeatureId::new(0),
//!     polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
//! );
//! let index = MaskIndex::build(vec![footprint]).unwrap();
//! let mut registry = HitRegistry::for_index(&index);
//! let registrar = MatchRegistrar::new(RegistrarConfig::planar(3.0)).unwrap();
//!
//! // Half a unit outside the footprint: a near hit.
//! let address = Feature::new(FeatureId::new(1), point!(x: 10.5, y: 5.0));
//! registrar.register(&index, &mut registry, address).unwrap();
//!
//! let resolution = resolve(&index, &mut registry).unwrap();
//! assert_eq!(resolution.promoted, 1);
//! assert_eq!(registry.uniques().len(), 1);
//! ```
//!
//! ## Concurrency
//!
//! Registration is single-writer. With the `parallel` feature the candidate
//! tests for one target run on rayon, and the result is still the first
//! success in index order.

mod buffer;
mod fuzzy;
mod intersect;
mod join;
mod registrar;
mod registry;
mod report;
mod resolver;
pub mod types;

pub use crate::buffer::Buffered;
pub use crate::fuzzy::FuzzyAreaMatcher;
pub use crate::intersect::{check_topology, intersection, intersects};
pub use crate::join::{SpatialFilter, SpatialJoiner};
pub use crate::registrar::MatchRegistrar;
pub use crate::registry::{HitRegistry, MaskState};
pub use crate::report::RunReport;
pub use crate::resolver::{resolve, Resolution};
pub use crate::types::{CoordinateSpace, FuzzyConfig, MatchError, Placement, RegistrarConfig};
