//! Exact intersection test.
//!
//! Any contact counts, including footprints that only share a wall or a
//! corner. Overlapping areal pairs return their overlap; touching ones return
//! the boundary vertices they share. A pair with a point or line operand
//! returns the non-areal operand as the witness geometry.

use geo::{
    Area, BooleanOps, CoordsIter, Geometry, Intersects, MultiPoint, MultiPolygon, Point,
    Validation,
};
use ingest::Feature;

use crate::types::MatchError;

/// Fail with [`MatchError::Topology`] unless `feature` is valid input for
/// exact geometry computation.
pub fn check_topology(feature: &Feature) -> Result<(), MatchError> {
    if feature.geometry.is_valid() {
        Ok(())
    } else {
        Err(MatchError::topology(feature))
    }
}

/// Intersection of two features' geometries.
///
/// `Ok(None)` means the geometries do not intersect. An invalid geometry is
/// an error naming the offending feature, never a silent `None`; `a` is
/// checked first.
pub fn intersection(a: &Feature, b: &Feature) -> Result<Option<Geometry<f64>>, MatchError> {
    check_topology(a)?;
    check_topology(b)?;
    Ok(intersect_geometries(&a.geometry, &b.geometry))
}

/// Whether [`intersection`] would return a geometry.
pub fn intersects(a: &Feature, b: &Feature) -> Result<bool, MatchError> {
    intersection(a, b).map(|overlap| overlap.is_some())
}

pub(crate) fn areal(geometry: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
        Geometry::MultiPolygon(mp) => Some(mp.clone()),
        Geometry::Rect(r) => Some(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Some(MultiPolygon::new(vec![t.to_polygon()])),
        _ => None,
    }
}

fn intersect_geometries(a: &Geometry<f64>, b: &Geometry<f64>) -> Option<Geometry<f64>> {
    if !a.intersects(b) {
        return None;
    }
    match (areal(a), areal(b)) {
        (Some(pa), Some(pb)) => {
            let overlap = pa.intersection(&pb);
            if overlap.unsigned_area() > 0.0 {
                Some(Geometry::MultiPolygon(overlap))
            } else {
                Some(Geometry::MultiPoint(contact(&pa, &pb)))
            }
        }
        (None, Some(_)) => Some(a.clone()),
        (Some(_), None) | (None, None) => Some(b.clone()),
    }
}

/// Vertices of either operand that lie on the other.
fn contact(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPoint<f64> {
    let mut points: Vec<Point<f64>> = Vec::new();
    let on_b = a.coords_iter().map(Point::from).filter(|p| b.intersects(p));
    let on_a = b.coords_iter().map(Point::from).filter(|p| a.intersects(p));
    for p in on_b.chain(on_a) {
        if !points.contains(&p) {
            points.push(p);
        }
    }
    MultiPoint::new(points)
}
