//! Spatial join and spatial filter over a [`MaskIndex`].

use index::{BoundingBox, MaskIndex, MaskRef};
use ingest::Feature;
use serde_json::Value;
use tracing::{debug, trace};

use crate::intersect;
use crate::types::MatchError;

/// Copies selected properties from the mask a target falls in.
#[derive(Debug, Clone, Default)]
pub struct SpatialJoiner {
    properties: Vec<String>,
}

impl SpatialJoiner {
    pub fn new<I, S>(properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            properties: properties.into_iter().map(Into::into).collect(),
        }
    }

    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    /// The mask `target` falls in.
    ///
    /// A lone bounding-box candidate is taken as is; the join masks are
    /// expected to tile the target area. Otherwise the first candidate in
    /// index order that exactly intersects wins.
    pub fn find<'a>(
        &self,
        index: &'a MaskIndex,
        target: &Feature,
    ) -> Result<Option<MaskRef<'a>>, MatchError> {
        let bbox = BoundingBox::of(&target.geometry).ok_or_else(|| MatchError::data(target))?;
        let candidates = index.query(&bbox);
        if let [only] = candidates.as_slice() {
            return Ok(Some(*only));
        }
        for candidate in candidates {
            if intersect::intersects(target, candidate.feature)? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// `target` with the configured properties copied from its mask.
    ///
    /// A property the mask lacks is written as `null`. Without a mask the
    /// target is returned untouched.
    pub fn join(&self, index: &MaskIndex, mut target: Feature) -> Result<Feature, MatchError> {
        let Some(mask) = self.find(index, &target)? else {
            debug!(feature = %target.label(), "no join mask");
            return Ok(target);
        };
        trace!(feature = %target.label(), slot = %mask.slot, "joined");
        for name in &self.properties {
            let value = mask
                .feature
                .properties
                .get(name)
                .cloned()
                .unwrap_or(Value::Null);
            target.properties.insert(name.clone(), value);
        }
        Ok(target)
    }
}

/// Drops targets that intersect any mask.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialFilter;

impl SpatialFilter {
    /// Whether `target` exactly intersects any mask.
    pub fn intersects_any(&self, index: &MaskIndex, target: &Feature) -> Result<bool, MatchError> {
        let bbox = BoundingBox::of(&target.geometry).ok_or_else(|| MatchError::data(target))?;
        for candidate in index.query(&bbox) {
            if intersect::intersects(target, candidate.feature)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// `Some(target)` when it intersects no mask, `None` otherwise.
    pub fn retain_disjoint(
        &self,
        index: &MaskIndex,
        target: Feature,
    ) -> Result<Option<Feature>, MatchError> {
        if self.intersects_any(index, &target)? {
            trace!(feature = %target.label(), "filtered out");
            Ok(None)
        } else {
            Ok(Some(target))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{point, polygon, Polygon};
    use ingest::FeatureId;
    use serde_json::json;

    fn square(id: u64, x: f64, y: f64, size: f64) -> Feature {
        let p: Polygon<f64> = polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
        ];
        Feature::new(FeatureId::new(id), p)
    }

    fn pt(id: u64, x: f64, y: f64) -> Feature {
        Feature::new(FeatureId::new(id), point!(x: x, y: y))
    }

    fn districts() -> MaskIndex {
        MaskIndex::build(vec![
            square(0, 0.0, 0.0, 10.0).with_property("district", json!("north")),
            square(1, 10.0, 0.0, 10.0)
                .with_property("district", json!("south"))
                .with_property("ward", json!(4)),
        ])
        .expect("index")
    }

    #[test]
    fn join_copies_listed_properties() {
        let index = districts();
        let joiner = SpatialJoiner::new(["district", "ward"]);
        let joined = joiner.join(&index, pt(5, 15.0, 5.0)).expect("join");
        assert_eq!(joined.properties.get("district"), Some(&json!("south")));
        assert_eq!(joined.properties.get("ward"), Some(&json!(4)));
    }

    #[test]
    fn missing_mask_property_becomes_null() {
        let index = districts();
        let joiner = SpatialJoiner::new(["ward"]);
        let joined = joiner.join(&index, pt(5, 2.0, 5.0)).expect("join");
        assert_eq!(joined.properties.get("ward"), Some(&Value::Null));
    }

    #[test]
    fn target_outside_every_mask_is_unchanged() {
        let index = districts();
        let joiner = SpatialJoiner::new(["district"]);
        let target = pt(5, 50.0, 50.0).with_property("name", json!("x"));
        let joined = joiner.join(&index, target.clone()).expect("join");
        assert_eq!(joined, target);
    }

    #[test]
    fn find_scans_past_box_only_candidates() {
        // Point on the right half of mask 0's box but only inside mask 1.
        let index = MaskIndex::build(vec![
            Feature::new(
                FeatureId::new(0),
                polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 0.0, y: 10.0)],
            ),
            square(1, 5.0, 5.0, 5.0),
        ])
        .expect("index");
        let found = SpatialJoiner::default()
            .find(&index, &pt(1, 8.0, 8.0))
            .expect("find");
        assert_eq!(found.map(|m| m.slot.get()), Some(1));
    }

    #[test]
    fn filter_keeps_only_disjoint_targets() {
        let index = districts();
        let filter = SpatialFilter;
        assert!(filter.intersects_any(&index, &pt(1, 5.0, 5.0)).expect("test"));
        assert_eq!(filter.retain_disjoint(&index, pt(1, 5.0, 5.0)).expect("filter"), None);
        let outside = pt(2, 30.0, 5.0);
        assert_eq!(
            filter.retain_disjoint(&index, outside.clone()).expect("filter"),
            Some(outside)
        );
    }

    #[test]
    fn adjoining_footprint_is_filtered() {
        let index = districts();
        let neighbour = square(9, 20.0, 0.0, 5.0);
        assert!(SpatialFilter.intersects_any(&index, &neighbour).expect("test"));
        assert_eq!(SpatialFilter.retain_disjoint(&index, neighbour).expect("filter"), None);
        let detached = square(10, 20.5, 0.0, 5.0);
        assert!(!SpatialFilter.intersects_any(&index, &detached).expect("test"));
    }
}
