//! End-to-end runs over feature streams.
//!
//! Each run takes an already-built [`MaskIndex`] and an iterator of target
//! reads (usually a [`FeatureReader`](ingest::FeatureReader)), and either
//! returns its results or writes them through a [`FeatureWriter`].

use std::io::Write;
use std::path::Path;

use index::MaskIndex;
use ingest::{read_collection, Feature, FeatureIds, FeatureWriter, IngestError};
use matcher::{
    resolve, FuzzyAreaMatcher, HitRegistry, MatchError, MatchRegistrar, RegistrarConfig,
    RunReport, SpatialFilter, SpatialJoiner,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::PipelineError;

/// Property set on each feature by [`match_areas`].
pub const MATCH_ID_PROPERTY: &str = "match_id";

/// What a split run does when a target cannot be tested because of invalid
/// topology.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopologyPolicy {
    /// Stop the run with the error. Nothing is resolved or returned.
    #[default]
    Abort,
    /// Set the target aside as unresolvable and keep going.
    Report,
}

/// Results of a completed split run.
#[derive(Debug, Clone, Default)]
pub struct SplitOutcome {
    /// Sole hits of single-hit masks, in mask order.
    pub uniques: Vec<Feature>,
    /// Misses, residual near-hits, and hits of multi-hit masks.
    pub nonuniques: Vec<Feature>,
    /// Targets set aside under [`TopologyPolicy::Report`].
    pub unresolvable: Vec<Feature>,
    pub report: RunReport,
}

/// Load a mask collection from `path` and index it.
pub fn load_masks(path: impl AsRef<Path>) -> Result<MaskIndex, PipelineError> {
    let path = path.as_ref();
    let masks = read_collection(path, &FeatureIds::new())?;
    info!(path = %path.display(), masks = masks.len(), "masks loaded");
    Ok(MaskIndex::build(masks)?)
}

/// Splits a target stream into uniquely and non-uniquely claimed features.
#[derive(Debug)]
pub struct Splitter<'a> {
    index: &'a MaskIndex,
    registrar: MatchRegistrar,
    policy: TopologyPolicy,
}

impl<'a> Splitter<'a> {
    pub fn new(
        index: &'a MaskIndex,
        config: RegistrarConfig,
        policy: TopologyPolicy,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            index,
            registrar: MatchRegistrar::new(config)?,
            policy,
        })
    }

    /// Register every target, resolve near misses, and extract results.
    ///
    /// A fatal read error is a hard stop: the error is returned and the
    /// partially filled registry is dropped without resolution. Unreadable
    /// records and targets without a bounding box are skipped and counted.
    pub fn run<I>(&self, targets: I) -> Result<SplitOutcome, PipelineError>
    where
        I: IntoIterator<Item = Result<Feature, IngestError>>,
    {
        let mut registry = HitRegistry::for_index(self.index);
        let mut report = RunReport::new();
        let mut unresolvable = Vec::new();

        for read in targets {
            let target = match read {
                Ok(target) => target,
                Err(err) if err.is_fatal() => {
                    error!(%err, registered = registry.tracked(), "target stream failed; run abandoned");
                    return Err(err.into());
                }
                Err(err) => {
                    warn!(%err, "skipping unreadable target");
                    report.record_skipped(err.to_string());
                    continue;
                }
            };

            let label = target.label();
            match self.registrar.classify(self.index, &target) {
                Ok(placement) => {
                    debug!(feature = %label, ?placement, "registered");
                    registry.place(placement, target)?;
                    report.record_placement(placement);
                }
                Err(err @ MatchError::Data { .. }) => {
                    warn!(%err, "skipping target");
                    report.record_skipped(err.to_string());
                }
                Err(MatchError::Topology { feature }) => {
                    error!(feature = %label, offender = %feature, "invalid topology");
                    match self.policy {
                        TopologyPolicy::Abort => {
                            return Err(MatchError::Topology { feature }.into());
                        }
                        TopologyPolicy::Report => {
                            report.record_topology(feature);
                            unresolvable.push(target);
                        }
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }

        let resolution = resolve(self.index, &mut registry)?;
        report.record_resolution(resolution);
        let (uniques, nonuniques) = registry.into_results();
        report.record_results(uniques.len(), nonuniques.len());
        report.log_summary();

        Ok(SplitOutcome {
            uniques,
            nonuniques,
            unresolvable,
            report,
        })
    }
}

/// Write a split's nonuniques one Feature per line to `nonuniques_out` and
/// its uniques as a single FeatureCollection to `uniques_out`.
pub fn write_split<A, B>(
    outcome: &SplitOutcome,
    nonuniques_out: A,
    uniques_out: B,
) -> Result<(), PipelineError>
where
    A: Write,
    B: Write,
{
    let mut nonuniques = FeatureWriter::new(nonuniques_out);
    nonuniques.write_features(&outcome.nonuniques)?;
    nonuniques.flush()?;

    let mut uniques = FeatureWriter::new(uniques_out);
    uniques.write_collection(&outcome.uniques)?;
    uniques.flush()?;
    Ok(())
}

/// Pass each target through `f`, writing whatever it returns. Unreadable
/// records are skipped; a fatal read error stops the run. Returns the number
/// of features written.
fn stream_through<I, W, F>(targets: I, out: W, mut f: F) -> Result<usize, PipelineError>
where
    I: IntoIterator<Item = Result<Feature, IngestError>>,
    W: Write,
    F: FnMut(Feature) -> Result<Option<Feature>, MatchError>,
{
    let mut writer = FeatureWriter::new(out);
    for read in targets {
        let target = match read {
            Ok(target) => target,
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => {
                warn!(%err, "skipping unreadable feature");
                continue;
            }
        };
        match f(target) {
            Ok(Some(feature)) => writer.write_feature(&feature)?,
            Ok(None) => {}
            Err(err) if err.is_recoverable() => warn!(%err, "skipping feature"),
            Err(err) => return Err(err.into()),
        }
    }
    writer.flush()?;
    Ok(writer.written())
}

/// Copy `joiner`'s properties from each target's mask onto the target.
pub fn join_features<I, W>(
    index: &MaskIndex,
    joiner: &SpatialJoiner,
    targets: I,
    out: W,
) -> Result<usize, PipelineError>
where
    I: IntoIterator<Item = Result<Feature, IngestError>>,
    W: Write,
{
    let written = stream_through(targets, out, |target| joiner.join(index, target).map(Some))?;
    info!(written, properties = ?joiner.properties(), "join complete");
    Ok(written)
}

/// Write only the targets that intersect no mask.
pub fn filter_features<I, W>(index: &MaskIndex, targets: I, out: W) -> Result<usize, PipelineError>
where
    I: IntoIterator<Item = Result<Feature, IngestError>>,
    W: Write,
{
    let filter = SpatialFilter;
    let written = stream_through(targets, out, |target| filter.retain_disjoint(index, target))?;
    info!(written, "filter complete");
    Ok(written)
}

/// Tag each feature with the source id of the task area it matches under
/// `matcher`, or `null` when none does.
pub fn match_areas<I, W>(
    index: &MaskIndex,
    matcher: &FuzzyAreaMatcher,
    features: I,
    out: W,
) -> Result<usize, PipelineError>
where
    I: IntoIterator<Item = Result<Feature, IngestError>>,
    W: Write,
{
    let mut unmatched = 0usize;
    let written = stream_through(features, out, |mut feature| {
        let match_id = match matcher.find(index, &feature)? {
            Some(task) => task
                .feature
                .source_id
                .clone()
                .unwrap_or_else(|| Value::from(task.feature.id.get())),
            None => {
                unmatched += 1;
                Value::Null
            }
        };
        feature.properties.insert(MATCH_ID_PROPERTY.to_string(), match_id);
        Ok(Some(feature))
    })?;
    info!(written, unmatched, "area matching complete");
    Ok(written)
}
