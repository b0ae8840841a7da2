use std::io::Write;

use crate::error::IngestError;
use crate::geojson::{CollectionOut, FeatureOut};
use crate::types::Feature;

/// Writes features as GeoJSON, one object per line.
pub struct FeatureWriter<W: Write> {
    out: W,
    written: usize,
}

impl<W: Write> FeatureWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    /// Write a single Feature followed by a newline.
    pub fn write_feature(&mut self, feature: &Feature) -> Result<(), IngestError> {
        serde_json::to_writer(&mut self.out, &FeatureOut::new(feature)?)?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    pub fn write_features<'a, I>(&mut self, features: I) -> Result<(), IngestError>
    where
        I: IntoIterator<Item = &'a Feature>,
    {
        for feature in features {
            self.write_feature(feature)?;
        }
        Ok(())
    }

    /// Write all `features` as one FeatureCollection followed by a newline.
    pub fn write_collection<'a, I>(&mut self, features: I) -> Result<(), IngestError>
    where
        I: IntoIterator<Item = &'a Feature>,
    {
        let collection = CollectionOut::new(features)?;
        serde_json::to_writer(&mut self.out, &collection)?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Number of top-level objects written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> Result<(), IngestError> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
