//! Buffered near-hit test.
//!
//! Expanding a target outward by `d` and intersecting the result with a mask
//! is the same as asking whether the two geometries are within distance `d`
//! of each other. We answer the distance question with `geo`'s Euclidean
//! metric, which is exact where a polygonal buffer approximation would not
//! be, and widen the bounding box by `d` for the index query.

use geo::{Coord, Distance, Euclidean, Intersects, MapCoords};
use index::BoundingBox;
use ingest::Feature;

use crate::intersect::check_topology;
use crate::types::{CoordinateSpace, MatchError};

/// Mean metres per degree of latitude.
const METRES_PER_DEGREE: f64 = 111_320.0;

/// Keeps the longitude scale finite near the poles.
const MAX_LATITUDE: f64 = 89.0;

/// A target expanded outward by a buffer distance.
#[derive(Debug, Clone, Copy)]
pub struct Buffered<'a> {
    target: &'a Feature,
    distance: f64,
    space: CoordinateSpace,
    bbox: BoundingBox,
    envelope: BoundingBox,
}

impl<'a> Buffered<'a> {
    pub fn new(
        target: &'a Feature,
        distance: f64,
        space: CoordinateSpace,
    ) -> Result<Self, MatchError> {
        let bbox = BoundingBox::of(&target.geometry).ok_or_else(|| MatchError::data(target))?;
        let envelope = match space {
            CoordinateSpace::Planar => bbox.expand(distance, distance),
            CoordinateSpace::Geographic => {
                let (dx, dy) = degrees_for(distance, &bbox);
                bbox.expand(dx, dy)
            }
        };
        Ok(Self {
            target,
            distance,
            space,
            bbox,
            envelope,
        })
    }

    pub fn target(&self) -> &'a Feature {
        self.target
    }

    /// Bounding box of the buffered geometry.
    pub fn envelope(&self) -> BoundingBox {
        self.envelope
    }

    /// Whether the buffered target reaches `mask`.
    pub fn reaches(&self, mask: &Feature) -> Result<bool, MatchError> {
        check_topology(self.target)?;
        check_topology(mask)?;
        if self.target.geometry.intersects(&mask.geometry) {
            return Ok(true);
        }
        let gap = match self.space {
            CoordinateSpace::Planar => Euclidean.distance(&self.target.geometry, &mask.geometry),
            CoordinateSpace::Geographic => {
                let (lon0, lat0) = self.bbox.center();
                let scale_x = METRES_PER_DEGREE * lat0.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians().cos();
                let project = |c: Coord<f64>| Coord {
                    x: (c.x - lon0) * scale_x,
                    y: (c.y - lat0) * METRES_PER_DEGREE,
                };
                Euclidean.distance(
                    &self.target.geometry.map_coords(project),
                    &mask.geometry.map_coords(project),
                )
            }
        };
        Ok(gap <= self.distance)
    }
}

/// Degree offsets `(dx, dy)` covering `metres` everywhere inside `bbox`.
fn degrees_for(metres: f64, bbox: &BoundingBox) -> (f64, f64) {
    let lat = bbox
        .min_y
        .abs()
        .max(bbox.max_y.abs())
        .min(MAX_LATITUDE);
    let dy = metres / METRES_PER_DEGREE;
    let dx = metres / (METRES_PER_DEGREE * lat.to_radians().cos());
    (dx, dy)
}
