//! Picks the sequencer for each ownship/traffic pairing and runs it.

use serde::Serialize;

use cdr_core::{
    CdCylinder, CdPolyIter, CdssCore, Cdii, CdiiPolygon, Cdsi, CdsiPolygon, ConflictInterval,
    ConflictReport, Detection3D, DetectionPolygon, DetectorSet, Position, SeparationRules,
    TargetUrgency, TrafficState,
};

use crate::scenario::{Ownship, Traffic};

#[derive(Debug, Clone, Serialize)]
pub struct TrafficResult {
    pub id: String,
    pub kind: &'static str,
    pub conflicts: Vec<ConflictInterval>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

/// Lookahead window relative to the ownship start time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub begin: f64,
    pub end: f64,
    /// Report true entry/exit times of conflicts overlapping the window
    pub extended: bool,
}

#[derive(Debug, Clone)]
pub struct Engine {
    rules: SeparationRules,
    state_cd: Box<dyn Detection3D>,
    polygon_cd: Box<dyn DetectionPolygon>,
}

fn drain_report<R: ConflictReport>(r: &R) -> (Vec<ConflictInterval>, Vec<String>) {
    let messages = r
        .get_message()
        .lines()
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    (r.conflicts().as_slice().to_vec(), messages)
}

impl Engine {
    /// Detectors from `detectors` where given, otherwise sized from `rules`.
    pub fn new(rules: SeparationRules, detectors: DetectorSet) -> Self {
        let DetectorSet { state, polygon } = detectors;
        let state_cd = state
            .into_iter()
            .next()
            .unwrap_or_else(|| Box::new(CdCylinder::from_rules(&rules)));
        let polygon_cd = polygon
            .into_iter()
            .next()
            .unwrap_or_else(|| Box::new(CdPolyIter::from_rules(&rules)));
        tracing::debug!(
            state = state_cd.class_name(),
            polygon = polygon_cd.class_name(),
            "detectors selected"
        );
        Self {
            rules,
            state_cd,
            polygon_cd,
        }
    }

    pub fn rules(&self) -> &SeparationRules {
        &self.rules
    }

    pub fn urgency(&self) -> TargetUrgency {
        TargetUrgency::new(
            self.state_cd.clone(),
            self.rules.lookahead_begin_s,
            self.rules.lookahead_end_s,
        )
    }

    pub fn detect(&self, own: &Ownship, traffic: &Traffic, w: Window) -> TrafficResult {
        let (conflicts, messages) = match (own, traffic) {
            (Ownship::State(s, t0), Traffic::State(i)) => self.state_vs_state(s, i, *t0, w),
            (Ownship::State(s, t0), Traffic::Plan(plan)) => {
                let mut cdsi = Cdsi::new(self.state_cd.clone(), self.rules.filter_time_s);
                cdsi.detection(&s.position, s.velocity, *t0, self.rules.state_horizon_s, plan, w.begin, w.end);
                drain_report(&cdsi)
            }
            (Ownship::State(s, t0), Traffic::PolygonPath(path)) => {
                let mut cdsi = CdsiPolygon::new(self.polygon_cd.clone());
                cdsi.detection(&s.position, s.velocity, *t0, self.rules.state_horizon_s, path, w.begin, w.end);
                drain_report(&cdsi)
            }
            (Ownship::Plan(plan), Traffic::State(i)) => {
                // Run with the roles swapped; the intervals are the same
                let t0 = plan.first_time();
                let mut cdsi = Cdsi::new(self.state_cd.clone(), self.rules.filter_time_s);
                cdsi.detection(&i.position, i.velocity, t0, f64::MAX, plan, w.begin, w.end);
                drain_report(&cdsi)
            }
            (Ownship::Plan(plan), Traffic::Plan(other)) => {
                let (b, t) = (plan.first_time() + w.begin, plan.first_time() + w.end);
                let mut cdii = Cdii::new(self.state_cd.clone(), self.rules.filter_time_s);
                if w.extended {
                    cdii.detection_extended(plan, other, b, t);
                } else {
                    cdii.detection(plan, other, b, t);
                }
                drain_report(&cdii)
            }
            (Ownship::Plan(plan), Traffic::PolygonPath(path)) => {
                let (b, t) = (plan.first_time() + w.begin, plan.first_time() + w.end);
                let mut cdii = CdiiPolygon::new(self.polygon_cd.clone());
                if w.extended {
                    cdii.detection_extended(plan, path, b, t);
                } else {
                    cdii.detection(plan, path, b, t);
                }
                drain_report(&cdii)
            }
        };
        TrafficResult {
            id: traffic.id().to_string(),
            kind: traffic.kind(),
            conflicts,
            messages,
        }
    }

    fn state_vs_state(
        &self,
        own: &TrafficState,
        traffic: &TrafficState,
        t0: f64,
        w: Window,
    ) -> (Vec<ConflictInterval>, Vec<String>) {
        let mut core = CdssCore::new(self.state_cd.clone(), self.rules.filter_time_s);
        let found = match (own.position, traffic.position) {
            (Position::Xyz(so), Position::Xyz(si)) => {
                core.detection_between(so, own.velocity, si, traffic.velocity, w.begin, w.end)
            }
            (Position::LatLon(so), Position::LatLon(si)) => {
                core.detection_ll(so, own.velocity, si, traffic.velocity, w.begin, w.end)
            }
            _ => {
                return (
                    Vec::new(),
                    vec![format!("{} and {} use different coordinate frames", own.id, traffic.id)],
                )
            }
        };
        if !found {
            return (Vec::new(), Vec::new());
        }
        let c = ConflictInterval::new(
            core.time_in(),
            core.time_out(),
            core.time_of_closest_approach(),
            core.distance_at_critical_time(),
        )
        .shifted(t0);
        (vec![c], Vec::new())
    }
}
