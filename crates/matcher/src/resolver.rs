//! Near-miss reconciliation.
//!
//! Runs once, after every target has been registered. Per mask:
//!
//! | hits  | near-hits          | action                                   |
//! |-------|--------------------|------------------------------------------|
//! | 0     | exactly 1, a Point | promote: snap the point onto the mask    |
//! | 1     | 1 or more          | invalidate: move the hit to the miss set |
//! | other | other              | untouched                                |
//!
//! A second run finds no triggering state and changes nothing.

use geo::InteriorPoint;
use index::{MaskIndex, MaskSlot};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::registry::HitRegistry;
use crate::types::MatchError;

/// What a resolution pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Near-hit points relocated onto their mask.
    pub promoted: usize,
    /// Sole hits moved back to the miss set.
    pub invalidated: usize,
}

/// Apply the promotion and invalidation rules to every mask in `registry`.
///
/// After this call the registry rejects further registration. Calling it
/// again is allowed and is a no-op.
pub fn resolve(index: &MaskIndex, registry: &mut HitRegistry) -> Result<Resolution, MatchError> {
    if registry.mask_count() != index.len() {
        return Err(MatchError::RegistryMismatch {
            registry: registry.mask_count(),
            index: index.len(),
        });
    }

    let HitRegistry {
        masks,
        misses,
        resolved,
    } = registry;
    let mut outcome = Resolution::default();

    for (slot, state) in masks.iter_mut().enumerate() {
        let slot = MaskSlot::new(slot);

        if state.hits.is_empty()
            && state.near_hits.len() == 1
            && !state.invalidated
            && state.near_hits[0].is_point()
        {
            let Some(mask) = index.get(slot) else {
                continue;
            };
            let Some(anchor) = mask.feature.geometry.interior_point() else {
                warn!(%slot, mask = %mask.feature.label(), "mask has no interior point; near hit left in place");
                continue;
            };
            let near = state.near_hits.remove(0);
            misses.retain(|m| m.id != near.id);
            debug!(%slot, feature = %near.label(), "promoted near hit");
            state.hits.push(near.relocated(anchor));
            outcome.promoted += 1;
            continue;
        }

        if state.hits.len() == 1 && !state.near_hits.is_empty() {
            let hit = state.hits.remove(0);
            debug!(
                %slot,
                feature = %hit.label(),
                near_hits = state.near_hits.len(),
                "invalidated hit"
            );
            misses.push(hit);
            state.invalidated = true;
            outcome.invalidated += 1;
        }
    }

    if !*resolved {
        info!(
            promoted = outcome.promoted,
            invalidated = outcome.invalidated,
            "near-miss resolution complete"
        );
    }
    *resolved = true;
    Ok(outcome)
}
