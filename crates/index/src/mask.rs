use std::fmt;

use ingest::Feature;
use rstar::{RStarInsertionStrategy, RTree, RTreeObject, RTreeParams, AABB};
use tracing::{debug, info};

use crate::bbox::BoundingBox;
use crate::IndexError;

/// Position of a mask in load order.
///
/// Slots are dense (`0..len`) and double as the key of any per-mask side
/// table a caller keeps alongside the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaskSlot(usize);

impl MaskSlot {
    pub const fn new(slot: usize) -> Self {
        Self(slot)
    }

    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for MaskSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mask[{}]", self.0)
    }
}

/// Node fan-out of 16, the same as the rbush trees these indexes replace.
struct MaskParams;

impl RTreeParams for MaskParams {
    const MIN_SIZE: usize = 4;
    const MAX_SIZE: usize = 16;
    const REINSERTION_COUNT: usize = 4;
    type DefaultInsertionStrategy = RStarInsertionStrategy;
}

#[derive(Debug, Clone)]
struct IndexEntry {
    bbox: BoundingBox,
    slot: MaskSlot,
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.bbox.to_aabb()
    }
}

/// Borrowed view of one indexed mask.
#[derive(Debug, Clone, Copy)]
pub struct MaskRef<'a> {
    pub slot: MaskSlot,
    pub bbox: BoundingBox,
    pub feature: &'a Feature,
}

/// Read-only bounding-box index over a fully materialised mask set.
///
/// Built once with [`MaskIndex::build`]; there is no insert or remove.
/// Queries return masks in load order, which is the tie-break order every
/// first-match scan in the matcher relies on.
pub struct MaskIndex {
    tree: RTree<IndexEntry, MaskParams>,
    masks: Vec<Feature>,
    boxes: Vec<BoundingBox>,
}

impl MaskIndex {
    /// Bulk-load `masks`.
    ///
    /// Fails with [`IndexError::Data`] on the first mask whose geometry has
    /// no usable bounding box.
    pub fn build(masks: Vec<Feature>) -> Result<Self, IndexError> {
        let boxes = masks
            .iter()
            .map(|mask| {
                BoundingBox::of(&mask.geometry).ok_or_else(|| IndexError::Data {
                    feature: mask.label(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let entries = boxes
            .iter()
            .enumerate()
            .map(|(slot, bbox)| IndexEntry {
                bbox: *bbox,
                slot: MaskSlot(slot),
            })
            .collect();
        let tree = RTree::bulk_load_with_params(entries);
        info!(masks = masks.len(), "mask index built");

        Ok(Self { tree, masks, boxes })
    }

    /// All masks whose box overlaps `bbox`, in load order.
    pub fn query(&self, bbox: &BoundingBox) -> Vec<MaskRef<'_>> {
        let mut slots: Vec<MaskSlot> = self
            .tree
            .locate_in_envelope_intersecting(&bbox.to_aabb())
            .map(|entry| entry.slot)
            .collect();
        slots.sort_unstable();
        debug!(candidates = slots.len(), "bbox query");
        slots.into_iter().map(|slot| self.mask_ref(slot)).collect()
    }

    /// Every mask, in load order.
    pub fn query_all(&self) -> impl Iterator<Item = MaskRef<'_>> + '_ {
        (0..self.masks.len()).map(|slot| self.mask_ref(MaskSlot(slot)))
    }

    pub fn get(&self, slot: MaskSlot) -> Option<MaskRef<'_>> {
        (slot.0 < self.masks.len()).then(|| self.mask_ref(slot))
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    fn mask_ref(&self, slot: MaskSlot) -> MaskRef<'_> {
        MaskRef {
            slot,
            bbox: self.boxes[slot.0],
            feature: &self.masks[slot.0],
        }
    }
}

impl fmt::Debug for MaskIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaskIndex")
            .field("masks", &self.masks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{point, polygon, MultiPolygon};
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

    #[test]
    fn query_returns_overlapping_masks_in_load_order() {
        // Load order deliberately differs from spatial order.
        let masks = vec![
            square(0, 20.0, 0.0, 10.0),
            square(1, 0.0, 0.0, 10.0),
            square(2, 5.0, 0.0, 10.0),
        ];
        let index = MaskIndex::build(masks).expect("index");
        let hits = index.query(&BoundingBox::new(6.0, 1.0, 9.0, 2.0));
        let slots: Vec<usize> = hits.iter().map(|m| m.slot.get()).collect();
        assert_eq!(slots, vec![1, 2]);
        assert_eq!(hits[0].feature.id, FeatureId::new(1));
    }

    #[test]
    fn query_all_covers_every_mask() {
        let masks: Vec<Feature> = (0..40)
            .map(|i| square(i, i as f64 * 3.0, 0.0, 2.0))
            .collect();
        let index = MaskIndex::build(masks).expect("index");
        assert_eq!(index.len(), 40);
        let slots: Vec<usize> = index.query_all().map(|m| m.slot.get()).collect();
        assert_eq!(slots, (0..40).collect::<Vec<_>>());
    }

    #[test]
    fn point_query_on_shared_edge_finds_both() {
        let index = MaskIndex::build(vec![square(0, 0.0, 0.0, 1.0), square(1, 1.0, 0.0, 1.0)])
            .expect("index");
        let hits = index.query(&BoundingBox::new(1.0, 0.5, 1.0, 0.5));
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn empty_geometry_is_a_data_error() {
        let masks = vec![
            square(0, 0.0, 0.0, 1.0),
            Feature::new(FeatureId::new(9), MultiPolygon::<f64>::new(vec![]))
                .with_source_id("way/9"),
        ];
        match MaskIndex::build(masks) {
            Err(IndexError::Data { feature }) => assert_eq!(feature, "way/9"),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn empty_index_answers_nothing() {
        let index = MaskIndex::build(Vec::new()).expect("index");
        assert!(index.is_empty());
        assert!(index.query(&BoundingBox::new(0.0, 0.0, 1.0, 1.0)).is_empty());
        assert!(index.get(MaskSlot::new(0)).is_none());
    }

    #[test]
    fn point_masks_are_indexable() {
        let index = MaskIndex::build(vec![Feature::new(
            FeatureId::new(0),
            point!(x: 1.0, y: 1.0),
        )])
        .expect("index");
        assert_eq!(index.query(&BoundingBox::new(0.0, 0.0, 2.0, 2.0)).len(), 1);
    }
}
