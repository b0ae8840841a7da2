use index::{BoundingBox, MaskIndex, MaskRef, MaskSlot};
use ingest::Feature;
use tracing::{debug, trace};

use crate::buffer::Buffered;
use crate::intersect;
use crate::registry::HitRegistry;
use crate::types::{MatchError, Placement, RegistrarConfig};

/// Classifies targets against the mask index and files them in a
/// [`HitRegistry`].
///
/// Candidate masks are tried in index order and the first one that passes
/// wins. There is no best-overlap scoring: a target straddling two masks is
/// a hit on whichever was loaded first.
#[derive(Debug, Clone)]
pub struct MatchRegistrar {
    config: RegistrarConfig,
}

impl MatchRegistrar {
    pub fn new(config: RegistrarConfig) -> Result<Self, MatchError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RegistrarConfig {
        &self.config
    }

    /// Decide where `target` belongs without touching any registry.
    pub fn classify(&self, index: &MaskIndex, target: &Feature) -> Result<Placement, MatchError> {
        if let Some(slot) = self.find_hit(index, target)? {
            trace!(feature = %target.label(), %slot, "hit");
            return Ok(Placement::Hit(slot));
        }
        if let Some(slot) = self.find_near_hit(index, target)? {
            trace!(feature = %target.label(), %slot, "near hit");
            return Ok(Placement::NearHit(slot));
        }
        trace!(feature = %target.label(), "miss");
        Ok(Placement::Miss)
    }

    /// Classify `target` and file it. On error nothing is filed.
    pub fn register(
        &self,
        index: &MaskIndex,
        registry: &mut HitRegistry,
        target: Feature,
    ) -> Result<Placement, MatchError> {
        if registry.is_resolved() {
            return Err(MatchError::AlreadyResolved);
        }
        if registry.mask_count() != index.len() {
            return Err(MatchError::RegistryMismatch {
                registry: registry.mask_count(),
                index: index.len(),
            });
        }
        let placement = self.classify(index, &target)?;
        registry.place(placement, target)?;
        Ok(placement)
    }

    /// First mask, in index order, that `target` exactly intersects.
    pub fn find_hit(&self, index: &MaskIndex, target: &Feature) -> Result<Option<MaskSlot>, MatchError> {
        let bbox = BoundingBox::of(&target.geometry).ok_or_else(|| MatchError::data(target))?;
        let candidates = index.query(&bbox);
        first_match(&candidates, |mask| intersect::intersects(target, mask))
    }

    /// First mask, in index order, within the buffer distance of `target`.
    pub fn find_near_hit(
        &self,
        index: &MaskIndex,
        target: &Feature,
    ) -> Result<Option<MaskSlot>, MatchError> {
        let buffered = Buffered::new(
            target,
            self.config.buffer_distance,
            self.config.coordinate_space,
        )?;
        let candidates = index.query(&buffered.envelope());
        first_match(&candidates, |mask| buffered.reaches(mask))
    }
}

/// Slot of the first candidate for which `test` holds. An error on an
/// earlier candidate wins over a match on a later one.
#[cfg(not(feature = "parallel"))]
fn first_match<F>(candidates: &[MaskRef<'_>], test: F) -> Result<Option<MaskSlot>, MatchError>
where
    F: Fn(&Feature) -> Result<bool, MatchError> + Sync,
{
    for candidate in candidates {
        if test(candidate.feature)? {
            return Ok(Some(candidate.slot));
        }
    }
    debug!(candidates = candidates.len(), "no candidate matched");
    Ok(None)
}

#[cfg(feature = "parallel")]
fn first_match<F>(candidates: &[MaskRef<'_>], test: F) -> Result<Option<MaskSlot>, MatchError>
where
    F: Fn(&Feature) -> Result<bool, MatchError> + Sync,
{
    use rayon::prelude::*;

    let found = candidates
        .par_iter()
        .find_map_first(|candidate| match test(candidate.feature) {
            Ok(true) => Some(Ok(candidate.slot)),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        })
        .transpose()?;
    if found.is_none() {
        debug!(candidates = candidates.len(), "no candidate matched");
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{point, polygon, Polygon};
    use ingest::FeatureId;

    fn square(id: u64, x: f64, y: f64, size: f64) -> Feature {
        Feature::new(
            FeatureId::new(id),
            polygon![
                (x: x, y: y),
                (x: x + size, y: y),
                (x: x + size, y: y + size),
                (x: x, y: y + size),
            ],
        )
    }

    fn pt(id: u64, x: f64, y: f64) -> Feature {
        Feature::new(FeatureId::new(id), point!(x: x, y: y))
    }

    fn registrar() -> MatchRegistrar {
        MatchRegistrar::new(RegistrarConfig::planar(3.0)).expect("registrar")
    }

    #[test]
    fn inside_point_is_a_hit() {
        let index = MaskIndex::build(vec![square(0, 0.0, 0.0, 10.0)]).expect("index");
        let placement = registrar().classify(&index, &pt(1, 5.0, 5.0)).expect("classify");
        assert_eq!(placement, Placement::Hit(MaskSlot::new(0)));
    }

    #[test]
    fn nearby_point_is_a_near_hit() {
        let index = MaskIndex::build(vec![square(0, 0.0, 0.0, 10.0)]).expect("index");
        let placement = registrar().classify(&index, &pt(1, 10.5, 5.0)).expect("classify");
        assert_eq!(placement, Placement::NearHit(MaskSlot::new(0)));
    }

    #[test]
    fn distant_point_is_a_miss() {
        let index = MaskIndex::build(vec![square(0, 0.0, 0.0, 10.0)]).expect("index");
        let placement = registrar().classify(&index, &pt(1, 50.0, 50.0)).expect("classify");
        assert_eq!(placement, Placement::Miss);
    }

    #[test]
    fn first_mask_in_index_order_wins() {
        // Both masks contain the point; the second one has the larger overlap
        // area but load order decides.
        let index = MaskIndex::build(vec![
            square(0, 4.0, 4.0, 2.0),
            square(1, 0.0, 0.0, 10.0),
        ])
        .expect("index");
        let placement = registrar().classify(&index, &pt(1, 5.0, 5.0)).expect("classify");
        assert_eq!(placement, Placement::Hit(MaskSlot::new(0)));
    }

    #[test]
    fn hit_takes_priority_over_an_earlier_near_hit() {
        // The triangle's box covers the point and its hypotenuse is 1.4 away,
        // so it would be a near hit, but the square actually contains it.
        let triangle: Polygon<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 0.0, y: 10.0),
        ];
        let index = MaskIndex::build(vec![
            Feature::new(FeatureId::new(0), triangle),
            square(1, 5.0, 5.0, 2.0),
        ])
        .expect("index");
        let placement = registrar().classify(&index, &pt(1, 6.0, 6.0)).expect("classify");
        assert_eq!(placement, Placement::Hit(MaskSlot::new(1)));
    }

    #[test]
    fn default_buffer_is_metres_over_lon_lat() {
        // A ~10 m footprint in Portland and addresses ~2 m and ~780 m east.
        let deg_lat = 1.0 / 111_320.0;
        let deg_lon = deg_lat / 45.52_f64.to_radians().cos();
        let building = Feature::new(
            FeatureId::new(0),
            polygon![
                (x: -122.68, y: 45.52),
                (x: -122.68 + 10.0 * deg_lon, y: 45.52),
                (x: -122.68 + 10.0 * deg_lon, y: 45.52 + 10.0 * deg_lat),
                (x: -122.68, y: 45.52 + 10.0 * deg_lat),
            ],
        );
        let index = MaskIndex::build(vec![building]).expect("index");
        let registrar = MatchRegistrar::new(RegistrarConfig::default()).expect("registrar");

        let close = pt(1, -122.68 + 12.0 * deg_lon, 45.52 + 5.0 * deg_lat);
        let across_town = pt(2, -122.67, 45.52 + 5.0 * deg_lat);
        assert_eq!(
            registrar.classify(&index, &close).expect("classify"),
            Placement::NearHit(MaskSlot::new(0))
        );
        assert_eq!(
            registrar.classify(&index, &across_town).expect("classify"),
            Placement::Miss
        );
    }

    #[test]
    fn footprint_sharing_a_wall_is_a_hit() {
        let index = MaskIndex::build(vec![square(0, 0.0, 0.0, 10.0)]).expect("index");
        let neighbour = square(1, 10.0, 0.0, 10.0);
        let placement = registrar().classify(&index, &neighbour).expect("classify");
        assert_eq!(placement, Placement::Hit(MaskSlot::new(0)));
    }

    #[test]
    fn register_mutates_one_container() {
        let index = MaskIndex::build(vec![square(0, 0.0, 0.0, 10.0)]).expect("index");
        let mut registry = HitRegistry::for_index(&index);
        let r = registrar();
        r.register(&index, &mut registry, pt(1, 5.0, 5.0)).expect("hit");
        r.register(&index, &mut registry, pt(2, 11.0, 5.0)).expect("near");
        r.register(&index, &mut registry, pt(3, 90.0, 5.0)).expect("miss");
        let state = registry.state(MaskSlot::new(0)).expect("state");
        assert_eq!(state.hits().len(), 1);
        assert_eq!(state.near_hits().len(), 1);
        assert_eq!(registry.miss_set().len(), 1);
        assert_eq!(registry.tracked(), 3);
    }

    #[test]
    fn topology_error_leaves_registry_untouched() {
        let bowtie: Polygon<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 10.0, y: 0.0),
            (x: 0.0, y: 10.0),
        ];
        let index = MaskIndex::build(vec![Feature::new(FeatureId::new(0), bowtie)])
            .expect("index");
        let mut registry = HitRegistry::for_index(&index);
        let err = registrar()
            .register(&index, &mut registry, pt(1, 5.0, 2.0))
            .expect_err("invalid mask");
        assert!(matches!(err, MatchError::Topology { .. }));
        assert_eq!(registry.tracked(), 0);
    }

    #[test]
    fn empty_target_is_a_data_error() {
        let index = MaskIndex::build(vec![square(0, 0.0, 0.0, 10.0)]).expect("index");
        let empty = Feature::new(FeatureId::new(1), geo::MultiPolygon::<f64>::new(vec![]));
        let err = registrar().classify(&index, &empty).expect_err("empty target");
        assert!(err.is_recoverable());
    }

    #[test]
    fn mismatched_registry_is_rejected() {
        let index = MaskIndex::build(vec![square(0, 0.0, 0.0, 10.0)]).expect("index");
        let mut registry = HitRegistry::with_masks(3);
        let err = registrar()
            .register(&index, &mut registry, pt(1, 5.0, 5.0))
            .expect_err("mismatch");
        assert_eq!(
            err,
            MatchError::RegistryMismatch {
                registry: 3,
                index: 1
            }
        );
    }
}
