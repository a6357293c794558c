//! Intent ownship against a polygon path.

use crate::conflict_list::{ConflictInterval, ConflictList, ConflictReport};
use crate::detection::DetectionPolygon;
use crate::error_log::ErrorLog;
use crate::plan::Plan;
use crate::poly_path::PolyPath;
use crate::rules::SeparationRules;

use super::{merge_filtered, sequence_plan, CdsiPolygon};

/// Conflicts between an ownship [`Plan`] and a [`PolyPath`], one ownship
/// leg at a time through [`CdsiPolygon`]. `b` and `t` are absolute times.
#[derive(Debug, Clone)]
pub struct CdiiPolygon {
    cdsi: CdsiPolygon,
    conflicts: ConflictList,
    error: ErrorLog,
}

impl Default for CdiiPolygon {
    fn default() -> Self {
        Self::with_sequencer(CdsiPolygon::default())
    }
}

impl CdiiPolygon {
    pub fn new(cd: Box<dyn DetectionPolygon>) -> Self {
        Self::with_sequencer(CdsiPolygon::new(cd))
    }

    pub fn from_rules(rules: &SeparationRules) -> Self {
        Self::with_sequencer(CdsiPolygon::from_rules(rules))
    }

    fn with_sequencer(cdsi: CdsiPolygon) -> Self {
        Self {
            cdsi,
            conflicts: ConflictList::new(),
            error: ErrorLog::new("CdiiPolygon"),
        }
    }

    pub fn detector(&self) -> &dyn DetectionPolygon {
        self.cdsi.detector()
    }

    pub fn set_detector(&mut self, cd: Box<dyn DetectionPolygon>) {
        self.cdsi.set_detector(cd);
    }

    pub fn into_conflicts(self) -> ConflictList {
        self.conflicts
    }

    /// One-shot detection with an explicit detector.
    pub fn detect_once(cd: &dyn DetectionPolygon, ownship: &Plan, traffic: &PolyPath, b: f64, t: f64) -> ConflictList {
        let mut cdii = Self::new(cd.clone_box());
        cdii.detection(ownship, traffic, b, t);
        cdii.into_conflicts()
    }

    pub fn detection(&mut self, ownship: &Plan, traffic: &PolyPath, b: f64, t: f64) -> bool {
        self.conflicts.clear();
        if !self.check_inputs(ownship, traffic, b, t) {
            return false;
        }
        let raw = self.sequence(ownship, traffic, b, t, false);
        self.conflicts = merge_filtered(&raw, self.cdsi.detector().min_duration());
        tracing::debug!(
            ownship = ownship.name(),
            path = traffic.name(),
            conflicts = self.conflicts.len(),
            "intent/polygon detection complete"
        );
        !self.conflicts.is_empty()
    }

    /// Detection over the whole overlap of the plan and the path, keeping
    /// the conflicts that overlap `[b, t]`.
    pub fn detection_extended(&mut self, ownship: &Plan, traffic: &PolyPath, b: f64, t: f64) -> bool {
        let start = ownship.first_time().max(traffic.first_time());
        let end = ownship.last_time().min(traffic.last_time());
        if !self.detection(ownship, traffic, start, end) {
            return false;
        }
        self.conflicts.retain_overlapping(b, t);
        !self.conflicts.is_empty()
    }

    pub fn conflict_only(&mut self, ownship: &Plan, traffic: &PolyPath, b: f64, t: f64) -> bool {
        self.conflicts.clear();
        if !self.check_inputs(ownship, traffic, b, t) {
            return false;
        }
        let raw = self.sequence(ownship, traffic, b, t, true);
        !merge_filtered(&raw, self.cdsi.detector().min_duration()).is_empty()
    }

    /// Whether the ownship is inside the path's volume at `tm`.
    pub fn violation(&self, ownship: &Plan, traffic: &PolyPath, tm: f64) -> bool {
        if ownship.is_empty() || tm < ownship.first_time() || tm > ownship.last_time() {
            return false;
        }
        self.cdsi
            .violation(&ownship.position(tm), ownship.velocity(tm), traffic, tm)
    }

    fn check_inputs(&self, ownship: &Plan, traffic: &PolyPath, b: f64, t: f64) -> bool {
        if b > t {
            self.error
                .add_warning(format!("lookahead start {b} is after its end {t}"));
            return false;
        }
        if ownship.size() < 2 || traffic.is_empty() {
            self.error.add_warning(format!(
                "plan {} or path {} is too short to compare",
                ownship.name(),
                traffic.name()
            ));
            return false;
        }
        if ownship.is_lat_lon() != traffic.is_lat_lon() {
            self.error.add_error(format!(
                "plan {} and path {} use different coordinate frames",
                ownship.name(),
                traffic.name()
            ));
            return false;
        }
        true
    }

    fn sequence(&mut self, ownship: &Plan, traffic: &PolyPath, b: f64, t: f64, first_only: bool) -> Vec<ConflictInterval> {
        let min = self.cdsi.detector().min_duration();
        let (cdsi, error) = (&mut self.cdsi, &self.error);
        sequence_plan(ownship, b, t, first_only.then_some(min), |so, vo, t_base, w| {
            let pieces = cdsi.pieces(so, vo, t_base, w.ht, traffic, w.bt, w.nt, false);
            error.absorb(cdsi.error_log());
            pieces
        })
    }
}

impl_conflict_report!(CdiiPolygon);
