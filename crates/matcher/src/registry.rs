use index::{MaskIndex, MaskSlot};
use ingest::Feature;

use crate::types::{MatchError, Placement};

/// Bookkeeping for one mask.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaskState {
    pub(crate) hits: Vec<Feature>,
    pub(crate) near_hits: Vec<Feature>,
    pub(crate) invalidated: bool,
}

impl MaskState {
    /// Targets that exactly intersect the mask, in registration order.
    pub fn hits(&self) -> &[Feature] {
        &self.hits
    }

    /// Targets within the buffer distance but outside the mask.
    pub fn near_hits(&self) -> &[Feature] {
        &self.near_hits
    }

    /// Whether the near-miss pass took this mask's only hit away.
    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    /// Exactly one hit: the mask uniquely claims it.
    pub fn is_unique(&self) -> bool {
        self.hits.len() == 1
    }
}

/// Per-run registration state.
///
/// A side table of [`MaskState`] indexed by [`MaskSlot`], plus the miss set.
/// Mask features themselves are never touched, so they can be written out
/// unchanged while the registry is live.
///
/// Each tracked target sits in exactly one place: a mask's hits, a mask's
/// near-hits, or the miss set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitRegistry {
    pub(crate) masks: Vec<MaskState>,
    pub(crate) misses: Vec<Feature>,
    pub(crate) resolved: bool,
}

impl HitRegistry {
    /// Empty state for every mask in `index`.
    pub fn for_index(index: &MaskIndex) -> Self {
        Self::with_masks(index.len())
    }

    pub fn with_masks(count: usize) -> Self {
        Self {
            masks: vec![MaskState::default(); count],
            misses: Vec::new(),
            resolved: false,
        }
    }

    pub fn mask_count(&self) -> usize {
        self.masks.len()
    }

    pub fn state(&self, slot: MaskSlot) -> Option<&MaskState> {
        self.masks.get(slot.get())
    }

    pub fn states(&self) -> impl Iterator<Item = (MaskSlot, &MaskState)> + '_ {
        self.masks
            .iter()
            .enumerate()
            .map(|(slot, state)| (MaskSlot::new(slot), state))
    }

    /// Whether the near-miss pass has run.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// File `target` under `placement`.
    pub fn place(&mut self, placement: Placement, target: Feature) -> Result<(), MatchError> {
        if self.resolved {
            return Err(MatchError::AlreadyResolved);
        }
        match placement {
            Placement::Hit(slot) => self.state_mut(slot)?.hits.push(target),
            Placement::NearHit(slot) => self.state_mut(slot)?.near_hits.push(target),
            Placement::Miss => self.misses.push(target),
        }
        Ok(())
    }

    fn state_mut(&mut self, slot: MaskSlot) -> Result<&mut MaskState, MatchError> {
        let count = self.masks.len();
        self.masks
            .get_mut(slot.get())
            .ok_or(MatchError::RegistryMismatch {
                registry: count,
                index: slot.get() + 1,
            })
    }

    /// The miss set proper: targets that reached no mask, plus hits the
    /// near-miss pass invalidated.
    pub fn miss_set(&self) -> &[Feature] {
        &self.misses
    }

    /// Every target that is neither uniquely nor multiply claimed: the miss
    /// set followed by each mask's remaining near-hits in mask order.
    pub fn misses(&self) -> Vec<&Feature> {
        self.misses
            .iter()
            .chain(self.masks.iter().flat_map(|m| m.near_hits.iter()))
            .collect()
    }

    /// The sole hit of every mask with exactly one hit, in mask order.
    pub fn uniques(&self) -> Vec<&Feature> {
        self.masks
            .iter()
            .filter(|m| m.is_unique())
            .flat_map(|m| m.hits.iter())
            .collect()
    }

    /// [`misses`](Self::misses) followed by all hits of masks with more than
    /// one hit.
    pub fn nonuniques(&self) -> Vec<&Feature> {
        let mut out = self.misses();
        out.extend(
            self.masks
                .iter()
                .filter(|m| m.hits.len() > 1)
                .flat_map(|m| m.hits.iter()),
        );
        out
    }

    /// Number of targets currently tracked anywhere in the registry.
    pub fn tracked(&self) -> usize {
        self.misses.len()
            + self
                .masks
                .iter()
                .map(|m| m.hits.len() + m.near_hits.len())
                .sum::<usize>()
    }

    /// Split into owned `(uniques, nonuniques)` in the same order the
    /// borrowing accessors use.
    pub fn into_results(self) -> (Vec<Feature>, Vec<Feature>) {
        let mut uniques = Vec::new();
        let mut nonuniques = self.misses;
        let mut multi = Vec::new();
        for state in self.masks {
            nonuniques.extend(state.near_hits);
            match state.hits.len() {
                0 => {}
                1 => uniques.extend(state.hits),
                _ => multi.extend(state.hits),
            }
        }
        nonuniques.extend(multi);
        (uniques, nonuniques)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::point;
    use ingest::FeatureId;

    fn pt(id: u64) -> Feature {
        Feature::new(FeatureId::new(id), point!(x: id as f64, y: 0.0))
    }

    fn ids(features: &[&Feature]) -> Vec<u64> {
        features.iter().map(|f| f.id.get()).collect()
    }

    #[test]
    fn placement_fills_exactly_one_container() {
        let mut registry = HitRegistry::with_masks(2);
        registry
            .place(Placement::Hit(MaskSlot::new(0)), pt(1))
            .expect("hit");
        registry
            .place(Placement::NearHit(MaskSlot::new(1)), pt(2))
            .expect("near");
        registry.place(Placement::Miss, pt(3)).expect("miss");

        assert_eq!(registry.tracked(), 3);
        assert_eq!(ids(&registry.uniques()), vec![1]);
        assert_eq!(ids(&registry.misses()), vec![3, 2]);
        assert_eq!(registry.miss_set().len(), 1);
    }

    #[test]
    fn multi_hit_masks_are_nonunique() {
        let mut registry = HitRegistry::with_masks(2);
        for id in [1, 2] {
            registry
                .place(Placement::Hit(MaskSlot::new(0)), pt(id))
                .expect("hit");
        }
        registry
            .place(Placement::Hit(MaskSlot::new(1)), pt(3))
            .expect("hit");
        registry.place(Placement::Miss, pt(4)).expect("miss");

        assert_eq!(ids(&registry.uniques()), vec![3]);
        assert_eq!(ids(&registry.nonuniques()), vec![4, 1, 2]);
    }

    #[test]
    fn into_results_matches_borrowed_views() {
        let mut registry = HitRegistry::with_masks(3);
        registry.place(Placement::Hit(MaskSlot::new(0)), pt(1)).expect("hit");
        registry.place(Placement::Hit(MaskSlot::new(0)), pt(2)).expect("hit");
        registry.place(Placement::Hit(MaskSlot::new(1)), pt(3)).expect("hit");
        registry.place(Placement::NearHit(MaskSlot::new(2)), pt(4)).expect("near");
        registry.place(Placement::Miss, pt(5)).expect("miss");

        let uniques = ids(&registry.uniques());
        let nonuniques = ids(&registry.nonuniques());
        let (owned_u, owned_n) = registry.into_results();
        assert_eq!(owned_u.iter().map(|f| f.id.get()).collect::<Vec<_>>(), uniques);
        assert_eq!(owned_n.iter().map(|f| f.id.get()).collect::<Vec<_>>(), nonuniques);
    }

    #[test]
    fn unknown_slot_is_rejected() {
        let mut registry = HitRegistry::with_masks(1);
        let err = registry
            .place(Placement::Hit(MaskSlot::new(4)), pt(1))
            .expect_err("slot out of range");
        assert!(matches!(err, MatchError::RegistryMismatch { .. }));
        assert_eq!(registry.tracked(), 0);
    }

    #[test]
    fn resolved_registry_rejects_new_targets() {
        let mut registry = HitRegistry::with_masks(1);
        registry.resolved = true;
        assert_eq!(
            registry.place(Placement::Miss, pt(1)),
            Err(MatchError::AlreadyResolved)
        );
    }
}
