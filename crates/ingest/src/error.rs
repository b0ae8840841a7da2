//! Error types produced by the ingest crate.
//!
//! Two classes of failure come out of a feature stream, and callers must
//! treat them differently:
//!
//! | Error | Fatal | Description |
//! |-------|-------|-------------|
//! | [`Io`](IngestError::Io) | yes | The underlying reader or writer failed |
//! | [`Json`](IngestError::Json) | yes | The stream is not well-formed JSON |
//! | [`NotAFeature`](IngestError::NotAFeature) | no | A JSON value is not a Feature or FeatureCollection |
//! | [`MissingGeometry`](IngestError::MissingGeometry) | no | Feature has a `null` geometry |
//! | [`UnsupportedGeometry`](IngestError::UnsupportedGeometry) | no | Geometry type the engine does not handle |
//! | [`InvalidCoordinates`](IngestError::InvalidCoordinates) | no | Positions too short or non-finite |
//!
//! Fatal errors end the stream; a pipeline seeing one must stop without
//! acting on partial results. The rest describe a single record and the
//! stream can continue past them.
//!
//! ```rust
//! use ingest::IngestError;
//!
//! let err = IngestError::MissingGeometry { feature: "#4".into() };
//! assert!(!err.is_fatal());
//! assert_eq!(err.to_string(), "feature #4 has no geometry");
//! ```

use thiserror::Error;

/// Errors raised while reading or writing feature records.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IngestError {
    /// Reader or writer failure.
    #[error("feature stream i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// The stream could not be parsed as JSON.
    #[error("malformed feature stream: {0}")]
    Json(#[from] serde_json::Error),

    /// A top-level JSON value that is neither a Feature nor a FeatureCollection.
    #[error("expected a GeoJSON Feature or FeatureCollection: {0}")]
    NotAFeature(String),

    /// Feature carries a `null` or absent geometry.
    #[error("feature {feature} has no geometry")]
    MissingGeometry { feature: String },

    /// Geometry type outside the supported set.
    #[error("feature {feature} has unsupported geometry type {kind}")]
    UnsupportedGeometry { feature: String, kind: String },

    /// Malformed position data.
    #[error("feature {feature} has invalid coordinates: {reason}")]
    InvalidCoordinates { feature: String, reason: String },
}

impl IngestError {
    /// Whether this error terminates the stream it came from.
    pub fn is_fatal(&self) -> bool {
        matches!(self, IngestError::Io(_) | IngestError::Json(_))
    }
}
