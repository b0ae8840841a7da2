//! GeoJSON wire model.
//!
//! Only the members the engine reads or writes are modelled; `bbox` and
//! foreign members on input are ignored.

use geo_types::{
    Coord, Geometry, LineString, MultiPoint, MultiPolygon, Point, Polygon, Rect, Triangle,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::IngestError;
use crate::types::{geometry_kind, Feature, FeatureIds, Properties};

type Position = Vec<f64>;

/// GeoJSON geometry object for the supported geometry types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
}

/// Top-level objects accepted on a feature stream.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum GeoJsonObject {
    Feature(RawFeature),
    FeatureCollection { features: Vec<RawFeature> },
}

/// A feature before geometry conversion. The geometry stays a raw JSON value
/// so an unsupported geometry fails only its own record, not the stream.
#[derive(Debug, Deserialize)]
pub(crate) struct RawFeature {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    geometry: Option<Value>,
    #[serde(default)]
    properties: Option<Properties>,
}

impl RawFeature {
    pub(crate) fn into_feature(self, ids: &FeatureIds) -> Result<Feature, IngestError> {
        let id = ids.next_id();
        let label = match &self.id {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => id.to_string(),
        };

        let raw = match self.geometry {
            Some(Value::Null) | None => {
                return Err(IngestError::MissingGeometry { feature: label });
            }
            Some(raw) => raw,
        };
        let kind = raw
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("<untyped>")
            .to_string();
        let wire: GeoJsonGeometry =
            serde_json::from_value(raw).map_err(|_| IngestError::UnsupportedGeometry {
                feature: label.clone(),
                kind,
            })?;
        let geometry = wire.into_geometry().map_err(|reason| {
            IngestError::InvalidCoordinates {
                feature: label,
                reason,
            }
        })?;

        Ok(Feature {
            id,
            source_id: self.id,
            geometry,
            properties: self.properties.unwrap_or_default(),
        })
    }
}

fn coord(position: &[f64]) -> Result<Coord<f64>, String> {
    match position {
        [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
        [_, _, ..] => Err("non-finite coordinate".to_string()),
        _ => Err(format!("position has {} values, need at least 2", position.len())),
    }
}

fn line_string(positions: &[Position]) -> Result<LineString<f64>, String> {
    positions
        .iter()
        .map(|p| coord(p))
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>, String> {
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| "polygon has no rings".to_string())?;
    let exterior = line_string(exterior)?;
    if exterior.0.len() < 4 {
        return Err(format!(
            "polygon ring has {} positions, need at least 4",
            exterior.0.len()
        ));
    }
    let interiors = interiors
        .iter()
        .map(|ring| line_string(ring))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn positions(line: &LineString<f64>) -> Vec<Position> {
    line.0.iter().map(|c| vec![c.x, c.y]).collect()
}

fn rings(polygon: &Polygon<f64>) -> Vec<Vec<Position>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(positions)
        .collect()
}

impl GeoJsonGeometry {
    /// Convert into a `geo_types` geometry, validating positions.
    pub fn into_geometry(self) -> Result<Geometry<f64>, String> {
        Ok(match self {
            GeoJsonGeometry::Point { coordinates } => Point::from(coord(&coordinates)?).into(),
            GeoJsonGeometry::MultiPoint { coordinates } => coordinates
                .iter()
                .map(|p| coord(p).map(Point::from))
                .collect::<Result<Vec<_>, _>>()
                .map(MultiPoint::new)?
                .into(),
            GeoJsonGeometry::LineString { coordinates } => line_string(&coordinates)?.into(),
            GeoJsonGeometry::Polygon { coordinates } => polygon(&coordinates)?.into(),
            GeoJsonGeometry::MultiPolygon { coordinates } => coordinates
                .iter()
                .map(|p| polygon(p))
                .collect::<Result<Vec<_>, _>>()
                .map(MultiPolygon::new)?
                .into(),
        })
    }

    /// Convert from a `geo_types` geometry. Rects and triangles are written
    /// as polygons; other types without a wire form are rejected.
    pub fn from_geometry(geometry: &Geometry<f64>) -> Result<Self, String> {
        Ok(match geometry {
            Geometry::Point(p) => GeoJsonGeometry::Point {
                coordinates: vec![p.x(), p.y()],
            },
            Geometry::MultiPoint(mp) => GeoJsonGeometry::MultiPoint {
                coordinates: mp.0.iter().map(|p| vec![p.x(), p.y()]).collect(),
            },
            Geometry::LineString(ls) => GeoJsonGeometry::LineString {
                coordinates: positions(ls),
            },
            Geometry::Polygon(p) => GeoJsonGeometry::Polygon {
                coordinates: rings(p),
            },
            Geometry::MultiPolygon(mp) => GeoJsonGeometry::MultiPolygon {
                coordinates: mp.0.iter().map(rings).collect(),
            },
            Geometry::Rect(r) => GeoJsonGeometry::Polygon {
                coordinates: rings(&Rect::to_polygon(*r)),
            },
            Geometry::Triangle(t) => GeoJsonGeometry::Polygon {
                coordinates: rings(&Triangle::to_polygon(*t)),
            },
            other => return Err(format!("no wire form for {}", geometry_kind(other))),
        })
    }
}

/// Outbound Feature object.
#[derive(Debug, Serialize)]
pub(crate) struct FeatureOut<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a Value>,
    geometry: GeoJsonGeometry,
    properties: &'a Properties,
}

impl<'a> FeatureOut<'a> {
    pub(crate) fn new(feature: &'a Feature) -> Result<Self, IngestError> {
        let geometry = GeoJsonGeometry::from_geometry(&feature.geometry).map_err(|_| {
            IngestError::UnsupportedGeometry {
                feature: feature.label(),
                kind: geometry_kind(&feature.geometry).to_string(),
            }
        })?;
        Ok(Self {
            kind: "Feature",
            id: feature.source_id.as_ref(),
            geometry,
            properties: &feature.properties,
        })
    }
}

/// Outbound FeatureCollection object.
#[derive(Debug, Serialize)]
pub(crate) struct CollectionOut<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    features: Vec<FeatureOut<'a>>,
}

impl<'a> CollectionOut<'a> {
    pub(crate) fn new<I>(features: I) -> Result<Self, IngestError>
    where
        I: IntoIterator<Item = &'a Feature>,
    {
        Ok(Self {
            kind: "FeatureCollection",
            features: features
                .into_iter()
                .map(FeatureOut::new)
                .collect::<Result<Vec<_>, _>>()?,
        })
    }
}
