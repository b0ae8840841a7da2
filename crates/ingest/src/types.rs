use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Property bag attached to every feature.
pub type Properties = Map<String, Value>;

/// Run-local feature identity.
///
/// Assigned by [`FeatureIds`] when a record enters the engine and never
/// reused within a run. The GeoJSON `id` member, if any, is kept separately
/// in [`Feature::source_id`] because upstream ids are neither guaranteed to
/// be present nor unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId(u64);

impl FeatureId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared allocator for [`FeatureId`]s.
///
/// Clones share one counter, so a mask reader and a target reader handed
/// clones of the same allocator never hand out the same id.
#[derive(Debug, Clone, Default)]
pub struct FeatureIds {
    next: Arc<AtomicU64>,
}

impl FeatureIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> FeatureId {
        FeatureId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// A geographic feature: geometry plus properties.
///
/// The geometry is treated as immutable once the feature has been read;
/// algorithms that need to move a feature build a new one (see
/// [`Feature::relocated`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    /// The GeoJSON `id` member, preserved for output and diagnostics.
    pub source_id: Option<Value>,
    pub geometry: Geometry<f64>,
    pub properties: Properties,
}

impl Feature {
    pub fn new(id: FeatureId, geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            id,
            source_id: None,
            geometry: geometry.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_source_id(mut self, source_id: impl Into<Value>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Copy of this feature (same identity and properties) at a new geometry.
    pub fn relocated(&self, geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            id: self.id,
            source_id: self.source_id.clone(),
            geometry: geometry.into(),
            properties: self.properties.clone(),
        }
    }

    pub fn is_point(&self) -> bool {
        matches!(self.geometry, Geometry::Point(_))
    }

    /// Human-readable identifier for logs and errors: the source id when the
    /// record had one, the run-local id otherwise.
    pub fn label(&self) -> String {
        match &self.source_id {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => self.id.to_string(),
        }
    }
}

/// Short name of a geometry's type, as it would appear in GeoJSON.
pub fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
