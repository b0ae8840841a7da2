use index::{IndexError, MaskSlot};
use ingest::Feature;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How coordinates and the buffer distance relate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSpace {
    /// Projected coordinates; the buffer distance is in coordinate units.
    Planar,
    /// Longitude/latitude degrees, as GeoJSON carries them; the buffer
    /// distance is in metres.
    #[default]
    Geographic,
}

/// Configuration for [`MatchRegistrar`](crate::MatchRegistrar).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RegistrarConfig {
    /// How far outside a mask a target may sit and still count as a near-hit.
    #[serde(default = "RegistrarConfig::default_buffer_distance")]
    pub buffer_distance: f64,
    #[serde(default)]
    pub coordinate_space: CoordinateSpace,
}

impl RegistrarConfig {
    pub(crate) fn default_buffer_distance() -> f64 {
        3.0
    }

    /// Geographic input with a buffer in metres.
    pub fn geographic(buffer_metres: f64) -> Self {
        Self {
            buffer_distance: buffer_metres,
            coordinate_space: CoordinateSpace::Geographic,
        }
    }

    /// Projected input with a buffer in coordinate units.
    pub fn planar(buffer_distance: f64) -> Self {
        Self {
            buffer_distance,
            coordinate_space: CoordinateSpace::Planar,
        }
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if !self.buffer_distance.is_finite() || self.buffer_distance < 0.0 {
            return Err(MatchError::InvalidConfig(
                "buffer_distance must be a finite value >= 0".into(),
            ));
        }
        Ok(())
    }
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            buffer_distance: Self::default_buffer_distance(),
            coordinate_space: CoordinateSpace::default(),
        }
    }
}

/// Configuration for [`FuzzyAreaMatcher`](crate::FuzzyAreaMatcher).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FuzzyConfig {
    /// Largest accepted `(diff1 + diff2) / union_area`.
    #[serde(default = "FuzzyConfig::default_tolerance")]
    pub tolerance: f64,
    /// Trust a lone bounding-box candidate without an area test.
    ///
    /// Only correct when the mask set covers every target; with this off the
    /// lone candidate must pass the area test like any other.
    #[serde(default = "FuzzyConfig::default_assume_full_coverage")]
    pub assume_full_coverage: bool,
}

impl FuzzyConfig {
    pub(crate) fn default_tolerance() -> f64 {
        0.01
    }

    pub(crate) fn default_assume_full_coverage() -> bool {
        true
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if !(0.0..=1.0).contains(&self.tolerance) {
            return Err(MatchError::InvalidConfig(
                "tolerance must be between 0.0 and 1.0".into(),
            ));
        }
        Ok(())
    }
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            tolerance: Self::default_tolerance(),
            assume_full_coverage: Self::default_assume_full_coverage(),
        }
    }
}

/// Where a registered target ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Exactly intersects the mask in this slot.
    Hit(MaskSlot),
    /// Within the buffer distance of the mask in this slot.
    NearHit(MaskSlot),
    /// Neither.
    Miss,
}

/// Errors produced by the matching layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchError {
    /// Invalid configuration.
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
    /// The feature's geometry has no usable bounding box.
    #[error("feature {feature} has no usable bounding box")]
    Data { feature: String },
    /// Exact geometry computation is impossible on this feature's topology.
    #[error("invalid topology found: {feature}")]
    Topology { feature: String },
    /// The registry was not built for this index.
    #[error("registry tracks {registry} masks but the index holds {index}")]
    RegistryMismatch { registry: usize, index: usize },
    /// Registration after the near-miss pass.
    #[error("registry already resolved; no further targets may be registered")]
    AlreadyResolved,
    #[error("index error: {0}")]
    Index(#[from] IndexError),
}

impl MatchError {
    pub(crate) fn data(feature: &Feature) -> Self {
        MatchError::Data {
            feature: feature.label(),
        }
    }

    pub(crate) fn topology(feature: &Feature) -> Self {
        MatchError::Topology {
            feature: feature.label(),
        }
    }

    /// Per-feature problems a stream can skip past.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MatchError::Data { .. })
    }
}
