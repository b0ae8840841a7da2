use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde_json::de::IoRead;
use serde_json::{Deserializer, StreamDeserializer};
use tracing::debug;

use crate::error::IngestError;
use crate::geojson::{GeoJsonObject, RawFeature};
use crate::types::{Feature, FeatureIds};

/// Pull-based reader over a stream of GeoJSON values.
///
/// Accepts concatenated or newline-delimited Features and FeatureCollections;
/// collections are flattened into their member features. Only one top-level
/// value is buffered at a time, so an unbounded target stream of individual
/// features is read in constant memory.
///
/// A malformed stream yields one fatal [`IngestError`] and then ends.
/// Per-record problems (missing geometry, bad coordinates) are yielded as
/// non-fatal errors and reading continues with the next record.
pub struct FeatureReader<R: Read> {
    stream: StreamDeserializer<'static, IoRead<R>, serde_json::Value>,
    pending: VecDeque<RawFeature>,
    ids: FeatureIds,
    finished: bool,
}

impl<R: Read> FeatureReader<R> {
    pub fn new(reader: R, ids: FeatureIds) -> Self {
        Self {
            stream: Deserializer::from_reader(reader).into_iter(),
            pending: VecDeque::new(),
            ids,
            finished: false,
        }
    }

    fn fill(&mut self) -> Option<Result<(), IngestError>> {
        let value = match self.stream.next()? {
            Ok(value) => value,
            Err(err) => {
                self.finished = true;
                return Some(Err(if err.is_io() {
                    IngestError::Io(err.into())
                } else {
                    IngestError::Json(err)
                }));
            }
        };
        match serde_json::from_value::<GeoJsonObject>(value) {
            Ok(GeoJsonObject::Feature(raw)) => self.pending.push_back(raw),
            Ok(GeoJsonObject::FeatureCollection { features }) => {
                debug!(count = features.len(), "flattening feature collection");
                self.pending.extend(features);
            }
            Err(err) => return Some(Err(IngestError::NotAFeature(err.to_string()))),
        }
        Some(Ok(()))
    }
}

impl<R: Read> Iterator for FeatureReader<R> {
    type Item = Result<Feature, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(raw) = self.pending.pop_front() {
                return Some(raw.into_feature(&self.ids));
            }
            if self.finished {
                return None;
            }
            match self.fill() {
                None => {
                    self.finished = true;
                    return None;
                }
                Some(Err(err)) => return Some(Err(err)),
                Some(Ok(())) => {}
            }
        }
    }
}

/// Open a file as a [`FeatureReader`].
pub fn open_features<P: AsRef<Path>>(
    path: P,
    ids: FeatureIds,
) -> Result<FeatureReader<BufReader<File>>, IngestError> {
    let file = File::open(path)?;
    Ok(FeatureReader::new(BufReader::new(file), ids))
}

/// Load a whole collection into memory.
///
/// Used for the mask set, which must be fully materialised before matching.
/// Any error, fatal or per-record, fails the load: a mask set with holes in
/// it would silently turn hits into misses.
pub fn read_collection<P: AsRef<Path>>(
    path: P,
    ids: &FeatureIds,
) -> Result<Vec<Feature>, IngestError> {
    open_features(path, ids.clone())?.collect()
}
