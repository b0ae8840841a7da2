//! Workspace umbrella crate for maskmatch.
//!
//! This crate stitches together feature ingest, the mask index and the
//! matcher so callers can run a whole split, join, filter or area-match pass
//! from a single API entry point.
//!
//! ```
//! use std::io::Cursor;
//! use maskmatch::{load_index, FeatureIds, FeatureReader, RegistrarConfig, Splitter, TopologyPolicy};
//!
//! let masks = r#"{"type":"FeatureCollection","features":[
//!   {"type":"Feature","id":"way/1","properties":{},
//!    "geometry":{"type":"Polygon","coordinates":[[[0,0],[10,0],[10,10],[0,10],[0,0]]]}}]}"#;
//! let targets = r#"{"type":"Feature","id":"node/7","properties":{},"geometry":{"type":"Point","coordinates":[5,5]}}"#;
//!
//! let index = load_index(FeatureReader::new(Cursor::new(masks), FeatureIds::new())).unwrap();
//! let splitter = Splitter::new(&index, RegistrarConfig::default(), TopologyPolicy::Abort).unwrap();
//! let outcome = splitter
//!     .run(FeatureReader::new(Cursor::new(targets), FeatureIds::new()))
//!     .unwrap();
//! assert_eq!(outcome.uniques.len(), 1);
//! ```

pub mod config;
pub mod pipeline;

pub use config::{ConfigLoadError, MaskmatchConfig};
pub use index::{BoundingBox, IndexError, MaskIndex, MaskRef, MaskSlot};
pub use ingest::{
    open_features, read_collection, Feature, FeatureId, FeatureIds, FeatureReader, FeatureWriter,
    IngestError, Properties,
};
pub use matcher::{
    resolve, CoordinateSpace, FuzzyAreaMatcher, FuzzyConfig, HitRegistry, MatchError,
    MatchRegistrar, Placement, RegistrarConfig, Resolution, RunReport, SpatialFilter,
    SpatialJoiner,
};
pub use pipeline::{
    filter_features, join_features, load_masks, match_areas, write_split, SplitOutcome, Splitter,
    TopologyPolicy,
};

use std::error::Error;
use std::fmt;

/// Errors that can occur while running a pass end to end.
#[derive(Debug)]
pub enum PipelineError {
    Ingest(IngestError),
    Index(IndexError),
    Match(MatchError),
    Config(ConfigLoadError),
    /// Neither the command line nor the config names a mask collection.
    MissingMaskSource,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Ingest(err) => write!(f, "ingest failure: {err}"),
            PipelineError::Index(err) => write!(f, "mask index failure: {err}"),
            PipelineError::Match(err) => write!(f, "matching failure: {err}"),
            PipelineError::Config(err) => write!(f, "configuration failure: {err}"),
            PipelineError::MissingMaskSource => write!(f, "no mask source configured"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Ingest(err) => Some(err),
            PipelineError::Index(err) => Some(err),
            PipelineError::Match(err) => Some(err),
            PipelineError::Config(err) => Some(err),
            PipelineError::MissingMaskSource => None,
        }
    }
}

impl From<IngestError> for PipelineError {
    fn from(value: IngestError) -> Self {
        PipelineError::Ingest(value)
    }
}

impl From<IndexError> for PipelineError {
    fn from(value: IndexError) -> Self {
        PipelineError::Index(value)
    }
}

impl From<MatchError> for PipelineError {
    fn from(value: MatchError) -> Self {
        PipelineError::Match(value)
    }
}

impl From<ConfigLoadError> for PipelineError {
    fn from(value: ConfigLoadError) -> Self {
        PipelineError::Config(value)
    }
}

/// Build a mask index from any feature source. Every read must succeed.
pub fn load_index<I>(masks: I) -> Result<MaskIndex, PipelineError>
where
    I: IntoIterator<Item = Result<Feature, IngestError>>,
{
    let masks = masks.into_iter().collect::<Result<Vec<_>, _>>()?;
    Ok(MaskIndex::build(masks)?)
}

/// Pick the mask source: an explicit path wins over the configured one.
pub fn mask_source<'a>(
    explicit: Option<&'a str>,
    config: &'a MaskmatchConfig,
) -> Result<&'a str, PipelineError> {
    explicit
        .or(config.pipeline.mask_source.as_deref())
        .ok_or(PipelineError::MissingMaskSource)
}
