//! maskmatch ingest layer
//!
//! This is where feature records enter and leave the engine. We read GeoJSON
//! Features off a byte stream, give each one a run-local [`FeatureId`], and
//! convert its geometry into `geo_types` so the index and matcher can work
//! on it. On the way out we write features back as GeoJSON.
//!
//! ## What we do here
//!
//! - **Stream features** - [`FeatureReader`] pulls one top-level JSON value at
//!   a time, so a long target stream never sits in memory at once.
//! - **Assign identity** - [`FeatureIds`] hands out ids that stay stable for
//!   the run; the upstream GeoJSON `id` is kept for output and logs.
//! - **Validate positions** - short or non-finite positions and unsupported
//!   geometry types are rejected per record, without killing the stream.
//! - **Write results** - [`FeatureWriter`] emits line-delimited Features or a
//!   single FeatureCollection.
//!
//! Property edits (renames, unit conversion, attribute filters) are left to
//! upstream and downstream tools; records pass through untouched.
//!
//! ## Example
//!
//! ```
//! use std::io::Cursor;
//! use ingest::{FeatureIds, FeatureReader, FeatureWriter};
//!
//! let input = r#"{"type":"Feature","id":"n1","geometry":{"type":"Point","coordinates":[5,5]},"properties":{"addr:housenumber":"12"}}"#;
//! let reader = FeatureReader::new(Cursor::new(input), FeatureIds::new());
//!
//! let mut writer = FeatureWriter::new(Vec::new());
//! for feature in reader {
//!     let feature = feature.unwrap();
//!     assert!(feature.is_point());
//!     writer.write_feature(&feature).unwrap();
//! }
//! assert_eq!(writer.written(), 1);
//! ```

mod error;
mod geojson;
mod reader;
mod types;
mod writer;

pub use crate::error::IngestError;
pub use crate::geojson::GeoJsonGeometry;
pub use crate::reader::{open_features, read_collection, FeatureReader};
pub use crate::types::{geometry_kind, Feature, FeatureId, FeatureIds, Properties};
pub use crate::writer::FeatureWriter;

pub use geo_types;
