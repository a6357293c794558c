//! State ownship against an intent trajectory.

use crate::conflict_list::{ConflictInterval, ConflictList};
use crate::detection::{CdCylinder, CdssCore, Detection3D};
use crate::error_log::ErrorLog;
use crate::plan::Plan;
use crate::position::{LatLonAlt, Position};
use crate::projection::EuclideanProjection;
use crate::rules::SeparationRules;
use crate::vect::{Vect3, Velocity};

use super::{already_exited, continues, LegWindow};

/// Ownship and intruder states (projected) for one intruder leg.
type LegStates = (Vect3, Velocity, Vect3, Velocity);

/// Conflicts between an ownship flying a constant velocity from a known
/// state and traffic flying a [`Plan`].
///
/// Times returned are absolute, in the plan's clock. `b` and `t` are given
/// relative to `t0`, the time of the ownship state.
#[derive(Debug, Clone)]
pub struct Cdsi {
    core: CdssCore,
    conflicts: ConflictList,
    error: ErrorLog,
}

impl Default for Cdsi {
    fn default() -> Self {
        Self::with_core(CdssCore::default())
    }
}

impl Cdsi {
    pub fn new(cd: Box<dyn Detection3D>, filter: f64) -> Self {
        Self::with_core(CdssCore::new(cd, filter))
    }

    pub fn with_core(core: CdssCore) -> Self {
        Self {
            core,
            conflicts: ConflictList::new(),
            error: ErrorLog::new("Cdsi"),
        }
    }

    /// Cylinder detector sized from `rules`.
    pub fn from_rules(rules: &SeparationRules) -> Self {
        Self::new(Box::new(CdCylinder::from_rules(rules)), rules.filter_time_s)
    }

    pub fn detector(&self) -> &dyn Detection3D {
        self.core.detector()
    }

    pub fn set_detector(&mut self, cd: Box<dyn Detection3D>) {
        self.core.set_detector(cd);
    }

    pub fn core(&self) -> &CdssCore {
        &self.core
    }

    pub fn into_conflicts(self) -> ConflictList {
        self.conflicts
    }

    /// One-shot detection with an explicit detector.
    #[allow(clippy::too_many_arguments)]
    pub fn detect_once(
        cd: &dyn Detection3D,
        so: &Position,
        vo: Velocity,
        t0: f64,
        state_horizon: f64,
        intent: &Plan,
        b: f64,
        t: f64,
    ) -> ConflictList {
        let mut cdsi = Self::new(cd.clone_box(), 0.0);
        cdsi.detection(so, vo, t0, state_horizon, intent, b, t);
        cdsi.into_conflicts()
    }

    /// Detection in whichever frame the inputs use.
    ///
    /// `state_horizon` bounds how far past `t0` the ownship state is
    /// trusted. Returns whether any conflict was found; the intervals are
    /// read through [`ConflictReport`](crate::ConflictReport).
    #[allow(clippy::too_many_arguments)]
    pub fn detection(
        &mut self,
        so: &Position,
        vo: Velocity,
        t0: f64,
        state_horizon: f64,
        intent: &Plan,
        b: f64,
        t: f64,
    ) -> bool {
        match so {
            Position::LatLon(lla) => self.detection_ll(*lla, vo, t0, state_horizon, intent, b, t),
            Position::Xyz(p) => self.detection_xyz(*p, vo, t0, state_horizon, intent, b, t),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn detection_xyz(
        &mut self,
        so: Vect3,
        vo: Velocity,
        t0: f64,
        state_horizon: f64,
        intent: &Plan,
        b: f64,
        t: f64,
    ) -> bool {
        self.conflicts.clear();
        if !self.check_inputs(false, intent, b, t) {
            return false;
        }
        let raw = self.sequence(intent, t0, state_horizon, b, t, false, |j, t_base| {
            euclidean_leg(so, vo, t0, intent, j, t_base)
        });
        self.conflicts = ConflictList::merged(&raw);
        self.finish(intent)
    }

    /// Geodetic detection. Each leg is solved in a tangent plane anchored
    /// where the ownship is at the start of that leg.
    #[allow(clippy::too_many_arguments)]
    pub fn detection_ll(
        &mut self,
        so: LatLonAlt,
        vo: Velocity,
        t0: f64,
        state_horizon: f64,
        intent: &Plan,
        b: f64,
        t: f64,
    ) -> bool {
        self.conflicts.clear();
        if !self.check_inputs(true, intent, b, t) {
            return false;
        }
        let raw = self.sequence(intent, t0, state_horizon, b, t, false, |_, t_base| {
            geodetic_leg(so, vo, t0, intent, t_base)
        });
        self.conflicts = ConflictList::merged(&raw);
        self.finish(intent)
    }

    /// Whether any conflict exists, stopping at the first one found. The
    /// stored conflict list is cleared and left empty.
    #[allow(clippy::too_many_arguments)]
    pub fn conflict_only(
        &mut self,
        so: &Position,
        vo: Velocity,
        t0: f64,
        state_horizon: f64,
        intent: &Plan,
        b: f64,
        t: f64,
    ) -> bool {
        self.conflicts.clear();
        if !self.check_inputs(so.is_lat_lon(), intent, b, t) {
            return false;
        }
        let found = match *so {
            Position::LatLon(lla) => self.sequence(intent, t0, state_horizon, b, t, true, |_, t_base| {
                geodetic_leg(lla, vo, t0, intent, t_base)
            }),
            Position::Xyz(p) => self.sequence(intent, t0, state_horizon, b, t, true, |j, t_base| {
                euclidean_leg(p, vo, t0, intent, j, t_base)
            }),
        };
        !found.is_empty()
    }

    /// Loss of separation at time `tm`, with `so`/`vo` the ownship state at
    /// that time. False outside the plan.
    pub fn violation(&self, so: &Position, vo: Velocity, intent: &Plan, tm: f64) -> bool {
        if intent.is_empty() || tm < intent.first_time() || tm > intent.last_time() {
            return false;
        }
        let si = intent.position(tm);
        let vi = intent.velocity(tm);
        match (so, si) {
            (Position::LatLon(o), Position::LatLon(i)) => {
                let proj = EuclideanProjection::new(o.zero_alt());
                self.core.violation(
                    proj.project(*o),
                    proj.project_velocity(*o, vo),
                    proj.project(i),
                    proj.project_velocity(i, vi),
                )
            }
            (Position::Xyz(o), Position::Xyz(i)) => self.core.violation(*o, vo, i, vi),
            _ => {
                self.error.add_error("violation: ownship and intent use different frames");
                false
            }
        }
    }

    fn check_inputs(&self, lat_lon: bool, intent: &Plan, b: f64, t: f64) -> bool {
        if b > t {
            self.error
                .add_warning(format!("lookahead start {b} is after its end {t}"));
            return false;
        }
        if intent.is_empty() {
            self.error.add_warning(format!("intent {} has no points", intent.name()));
            return false;
        }
        if intent.is_lat_lon() != lat_lon {
            self.error.add_error(format!(
                "ownship and intent {} use different coordinate frames",
                intent.name()
            ));
            return false;
        }
        true
    }

    /// Walk the legs of `intent` from the one containing `t0`, returning the
    /// raw captures. With `first_only` the walk stops at the first capture.
    #[allow(clippy::too_many_arguments)]
    fn sequence<F>(
        &mut self,
        intent: &Plan,
        t0: f64,
        state_horizon: f64,
        b: f64,
        t: f64,
        first_only: bool,
        mut leg_states: F,
    ) -> Vec<ConflictInterval>
    where
        F: FnMut(usize, f64) -> LegStates,
    {
        let mut raw = Vec::new();
        let (mut t_base, start) = if t0 < intent.first_time() {
            (intent.first_time(), 0)
        } else {
            match intent.get_segment(t0) {
                Some(j) => (t0, j),
                None => return raw,
            }
        };

        let mut cont = false;
        for j in start..intent.size().saturating_sub(1) {
            let next = intent.time(j + 1);
            let w = LegWindow::new(b, t, t_base - t0, state_horizon, next - t_base, cont);
            if w.is_open() {
                w.check_duration(&self.error, j, t_base);
                let (so, vo, si, vi) = leg_states(j, t_base);
                if self.core.detection_within(so, vo, si, vi, w.bt, w.nt, w.ht) {
                    let c = ConflictInterval::new(
                        self.core.time_in(),
                        self.core.time_out(),
                        self.core.time_of_closest_approach(),
                        self.core.distance_at_critical_time(),
                    )
                    .shifted(t_base)
                    .with_segments(j, j);
                    if !already_exited(c.time_out, t0 + b) {
                        raw.push(c);
                        if first_only {
                            return raw;
                        }
                    }
                }
            }
            cont = continues(raw.last(), w.ht + t_base);
            t_base = next;
        }
        raw
    }

    fn finish(&self, intent: &Plan) -> bool {
        tracing::debug!(
            intent = intent.name(),
            conflicts = self.conflicts.len(),
            "state/intent detection complete"
        );
        !self.conflicts.is_empty()
    }
}

fn euclidean_leg(so: Vect3, vo: Velocity, t0: f64, intent: &Plan, j: usize, t_base: f64) -> LegStates {
    let sop = so.linear(vo.vect3(), t_base - t0);
    let sip = intent.position(t_base).as_vect3().unwrap_or_default();
    (sop, vo, sip, intent.initial_velocity(j))
}

fn geodetic_leg(so: LatLonAlt, vo: Velocity, t0: f64, intent: &Plan, t_base: f64) -> LegStates {
    let so2p = so.linear_initial(vo, t_base - t0);
    let proj = EuclideanProjection::new(so2p.zero_alt());
    let vi = intent.velocity(t_base);
    let sip = intent.position(t_base);
    let vip = match sip.as_lat_lon() {
        Some(p) => proj.project_velocity(p, vi),
        None => vi,
    };
    (
        proj.project(so2p),
        proj.project_velocity(so2p, vo),
        proj.project_position(&sip),
        vip,
    )
}

impl_conflict_report!(Cdsi);
