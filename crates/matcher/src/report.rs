use serde::Serialize;
use tracing::info;

use crate::resolver::Resolution;
use crate::types::Placement;

/// Counters for one split run. Threaded through the run by value; nothing
/// global is accumulated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Targets read from the stream, including skipped ones.
    pub targets: usize,
    pub hits: usize,
    pub near_hits: usize,
    pub misses: usize,
    pub promoted: usize,
    pub invalidated: usize,
    /// One line per target skipped as unreadable or unboxable.
    pub skipped: Vec<String>,
    /// Labels of features whose topology made exact matching impossible.
    pub topology_errors: Vec<String>,
    pub uniques: usize,
    pub nonuniques: usize,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_placement(&mut self, placement: Placement) {
        self.targets += 1;
        match placement {
            Placement::Hit(_) => self.hits += 1,
            Placement::NearHit(_) => self.near_hits += 1,
            Placement::Miss => self.misses += 1,
        }
    }

    pub fn record_skipped(&mut self, reason: impl Into<String>) {
        self.targets += 1;
        self.skipped.push(reason.into());
    }

    /// `feature` is the label carried by the topology error, which may name
    /// the mask rather than the target.
    pub fn record_topology(&mut self, feature: impl Into<String>) {
        self.targets += 1;
        self.topology_errors.push(feature.into());
    }

    pub fn record_resolution(&mut self, resolution: Resolution) {
        self.promoted += resolution.promoted;
        self.invalidated += resolution.invalidated;
    }

    pub fn record_results(&mut self, uniques: usize, nonuniques: usize) {
        self.uniques = uniques;
        self.nonuniques = nonuniques;
    }

    pub fn log_summary(&self) {
        info!(
            targets = self.targets,
            hits = self.hits,
            near_hits = self.near_hits,
            misses = self.misses,
            promoted = self.promoted,
            invalidated = self.invalidated,
            skipped = self.skipped.len(),
            topology_errors = self.topology_errors.len(),
            uniques = self.uniques,
            nonuniques = self.nonuniques,
            "split complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use index::MaskSlot;

    #[test]
    fn counters_track_every_target() {
        let mut report = RunReport::new();
        report.record_placement(Placement::Hit(MaskSlot::new(0)));
        report.record_placement(Placement::NearHit(MaskSlot::new(0)));
        report.record_placement(Placement::Miss);
        report.record_skipped("feature node/4 has no geometry");
        report.record_topology("way/9");
        report.record_resolution(Resolution {
            promoted: 0,
            invalidated: 1,
        });

        assert_eq!(report.targets, 5);
        assert_eq!((report.hits, report.near_hits, report.misses), (1, 1, 1));
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.topology_errors, vec!["way/9".to_string()]);
        assert_eq!(report.invalidated, 1);
    }

    #[test]
    fn report_serializes_for_machine_consumers() {
        let mut report = RunReport::new();
        report.record_results(2, 3);
        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json["uniques"], 2);
        assert_eq!(json["nonuniques"], 3);
        assert_eq!(json["skipped"], serde_json::json!([]));
    }
}
