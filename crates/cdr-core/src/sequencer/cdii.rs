//! Intent ownship against intent traffic.

use crate::conflict_list::{ConflictInterval, ConflictList, ConflictReport};
use crate::detection::{CdssCore, Detection3D};
use crate::error_log::ErrorLog;
use crate::plan::Plan;
use crate::rules::SeparationRules;

use super::{sequence_plan, Cdsi};

/// Conflicts between two [`Plan`]s.
///
/// Each ownship leg is treated as a state, valid for the duration of the
/// leg, and run against the traffic plan with [`Cdsi`]. `b` and `t` are
/// absolute times; no conflict information is returned from before the
/// ownship leg containing `b`.
#[derive(Debug, Clone)]
pub struct Cdii {
    cdsi: Cdsi,
    conflicts: ConflictList,
    error: ErrorLog,
}

impl Default for Cdii {
    fn default() -> Self {
        Self::with_core(CdssCore::default())
    }
}

impl Cdii {
    pub fn new(cd: Box<dyn Detection3D>, filter: f64) -> Self {
        Self::with_core(CdssCore::new(cd, filter))
    }

    pub fn with_core(core: CdssCore) -> Self {
        Self {
            cdsi: Cdsi::with_core(core),
            conflicts: ConflictList::new(),
            error: ErrorLog::new("Cdii"),
        }
    }

    pub fn from_rules(rules: &SeparationRules) -> Self {
        Self {
            cdsi: Cdsi::from_rules(rules),
            conflicts: ConflictList::new(),
            error: ErrorLog::new("Cdii"),
        }
    }

    pub fn detector(&self) -> &dyn Detection3D {
        self.cdsi.detector()
    }

    pub fn set_detector(&mut self, cd: Box<dyn Detection3D>) {
        self.cdsi.set_detector(cd);
    }

    pub fn into_conflicts(self) -> ConflictList {
        self.conflicts
    }

    /// One-shot detection with an explicit detector.
    pub fn detect_once(cd: &dyn Detection3D, ownship: &Plan, traffic: &Plan, b: f64, t: f64) -> ConflictList {
        let mut cdii = Self::new(cd.clone_box(), 0.0);
        cdii.detection(ownship, traffic, b, t);
        cdii.into_conflicts()
    }

    pub fn detection(&mut self, ownship: &Plan, traffic: &Plan, b: f64, t: f64) -> bool {
        self.conflicts.clear();
        if !self.check_inputs(ownship, traffic, b, t) {
            return false;
        }
        let raw = self.sequence(ownship, traffic, b, t, false);
        self.conflicts = ConflictList::merged(&raw);
        tracing::debug!(
            ownship = ownship.name(),
            traffic = traffic.name(),
            conflicts = self.conflicts.len(),
            "intent/intent detection complete"
        );
        !self.conflicts.is_empty()
    }

    /// Detection over the whole overlap of the two plans, keeping only the
    /// conflicts that overlap `[b, t]`. Entry and exit times are therefore
    /// the true ones even when `b` falls inside a loss of separation.
    pub fn detection_extended(&mut self, ownship: &Plan, traffic: &Plan, b: f64, t: f64) -> bool {
        let start = ownship.first_time().max(traffic.first_time());
        let end = ownship.last_time().min(traffic.last_time());
        if !self.detection(ownship, traffic, start, end) {
            return false;
        }
        self.conflicts.retain_overlapping(b, t);
        !self.conflicts.is_empty()
    }

    /// Whether any conflict exists, stopping at the first one found.
    pub fn conflict_only(&mut self, ownship: &Plan, traffic: &Plan, b: f64, t: f64) -> bool {
        self.conflicts.clear();
        if !self.check_inputs(ownship, traffic, b, t) {
            return false;
        }
        !self.sequence(ownship, traffic, b, t, true).is_empty()
    }

    /// Loss of separation at `tm`. False outside the ownship plan.
    pub fn violation(&self, ownship: &Plan, traffic: &Plan, tm: f64) -> bool {
        if ownship.is_empty() || tm < ownship.first_time() || tm > ownship.last_time() {
            return false;
        }
        self.cdsi
            .violation(&ownship.position(tm), ownship.velocity(tm), traffic, tm)
    }

    fn check_inputs(&self, ownship: &Plan, traffic: &Plan, b: f64, t: f64) -> bool {
        if b > t {
            self.error
                .add_warning(format!("lookahead start {b} is after its end {t}"));
            return false;
        }
        if ownship.size() < 2 || traffic.is_empty() {
            self.error.add_warning(format!(
                "plans {} and {} are too short to compare",
                ownship.name(),
                traffic.name()
            ));
            return false;
        }
        if ownship.is_lat_lon() != traffic.is_lat_lon() {
            self.error.add_error(format!(
                "plans {} and {} use different coordinate frames",
                ownship.name(),
                traffic.name()
            ));
            return false;
        }
        true
    }

    fn sequence(&mut self, ownship: &Plan, traffic: &Plan, b: f64, t: f64, first_only: bool) -> Vec<ConflictInterval> {
        let (cdsi, error) = (&mut self.cdsi, &self.error);
        sequence_plan(ownship, b, t, first_only.then_some(0.0), |so, vo, t_base, w| {
            cdsi.detection(so, vo, t_base, w.ht, traffic, w.bt, w.nt);
            error.absorb(cdsi.error_log());
            cdsi.conflicts().as_slice().to_vec()
        })
    }
}

impl_conflict_report!(Cdii);
