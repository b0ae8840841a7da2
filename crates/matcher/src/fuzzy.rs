//! Tolerance-based area matching for independently digitized polygons.
//!
//! Both features are reduced to the convex hull of their vertices and
//! compared by how much of the hulls' union each hull leaves uncovered.

use std::cmp::Ordering;

use geo::{Area, BooleanOps, ConvexHull, MultiPolygon, Polygon};
use index::{BoundingBox, MaskIndex, MaskRef};
use ingest::Feature;
use tracing::{debug, trace};

use crate::types::{FuzzyConfig, MatchError};

/// Finds the mask that covers (nearly) the same area as a target.
#[derive(Debug, Clone)]
pub struct FuzzyAreaMatcher {
    config: FuzzyConfig,
}

impl FuzzyAreaMatcher {
    pub fn new(config: FuzzyConfig) -> Result<Self, MatchError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FuzzyConfig {
        &self.config
    }

    /// First candidate mask, in index order, that [`is_match`](Self::is_match)es
    /// `target`.
    ///
    /// With `assume_full_coverage` set, a lone bounding-box candidate is
    /// returned without an area test. That is only correct when the masks
    /// cover every target; a target outside all masks but inside one mask's
    /// box would then be matched wrongly.
    pub fn find<'a>(
        &self,
        index: &'a MaskIndex,
        target: &Feature,
    ) -> Result<Option<MaskRef<'a>>, MatchError> {
        let bbox = BoundingBox::of(&target.geometry).ok_or_else(|| MatchError::data(target))?;
        let candidates = index.query(&bbox);

        if self.config.assume_full_coverage {
            if let [only] = candidates.as_slice() {
                trace!(feature = %target.label(), slot = %only.slot, "single candidate");
                return Ok(Some(*only));
            }
        }

        let found = candidates
            .into_iter()
            .find(|candidate| self.is_match(target, candidate.feature));
        match &found {
            Some(mask) => debug!(feature = %target.label(), slot = %mask.slot, "area match"),
            None => debug!(feature = %target.label(), "no area match"),
        }
        Ok(found)
    }

    /// Whether `a` and `b` cover the same area within the configured
    /// tolerance. Symmetric in its arguments.
    pub fn is_match(&self, a: &Feature, b: &Feature) -> bool {
        let (first, second) = canonical_pair(a.geometry.convex_hull(), b.geometry.convex_hull());
        if first == second {
            return true;
        }
        if first.unsigned_area() == 0.0 || second.unsigned_area() == 0.0 {
            trace!("degenerate hull");
            return false;
        }

        let first = MultiPolygon::new(vec![first]);
        let second = MultiPolygon::new(vec![second]);
        let union = first.union(&second);
        let [outline] = union.0.as_slice() else {
            trace!(parts = union.0.len(), "hull union is not a single polygon");
            return false;
        };

        let union_area = outline.unsigned_area();
        let outline = MultiPolygon::new(vec![outline.clone()]);
        let uncovered_by_first = outline.difference(&first).unsigned_area();
        let uncovered_by_second = outline.difference(&second).unsigned_area();
        uncovered_by_first + uncovered_by_second <= self.config.tolerance * union_area
    }
}

/// Order two hulls by their exterior coordinates so the boolean operations
/// see the same operand order whichever way round the caller passed them.
fn canonical_pair(a: Polygon<f64>, b: Polygon<f64>) -> (Polygon<f64>, Polygon<f64>) {
    let order = a
        .exterior()
        .coords()
        .zip(b.exterior().coords())
        .map(|(p, q)| p.x.total_cmp(&q.x).then(p.y.total_cmp(&q.y)))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or_else(|| a.exterior().0.len().cmp(&b.exterior().0.len()));
    match order {
        Ordering::Greater => (b, a),
        _ => (a, b),
    }
}
