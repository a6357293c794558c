//! State ownship against a polygon path.

use crate::conflict_list::{ConflictInterval, ConflictList};
use crate::detection::{CdPolyIter, DetectionPolygon};
use crate::error_log::ErrorLog;
use crate::moving_polygon::MovingPolygon3D;
use crate::poly_path::PolyPath;
use crate::position::{LatLonAlt, Position};
use crate::projection::EuclideanProjection;
use crate::rules::SeparationRules;
use crate::vect::{Vect3, Velocity};

use super::{already_exited, continues, merge_filtered, LegWindow};

/// Conflicts between an ownship flying a constant velocity from a known
/// state and a moving or morphing [`PolyPath`].
///
/// A continuing path (single polygon or user velocity) is searched past its
/// last step. Times returned are absolute.
#[derive(Debug, Clone)]
pub struct CdsiPolygon {
    cd: Box<dyn DetectionPolygon>,
    conflicts: ConflictList,
    error: ErrorLog,
}

impl Default for CdsiPolygon {
    fn default() -> Self {
        Self::new(Box::new(CdPolyIter::default()))
    }
}

impl CdsiPolygon {
    pub fn new(cd: Box<dyn DetectionPolygon>) -> Self {
        Self {
            cd,
            conflicts: ConflictList::new(),
            error: ErrorLog::new("CdsiPolygon"),
        }
    }

    pub fn from_rules(rules: &SeparationRules) -> Self {
        Self::new(Box::new(CdPolyIter::from_rules(rules)))
    }

    pub fn detector(&self) -> &dyn DetectionPolygon {
        self.cd.as_ref()
    }

    pub fn set_detector(&mut self, cd: Box<dyn DetectionPolygon>) {
        self.cd = cd;
    }

    pub fn into_conflicts(self) -> ConflictList {
        self.conflicts
    }

    /// One-shot detection with an explicit detector.
    #[allow(clippy::too_many_arguments)]
    pub fn detect_once(
        cd: &dyn DetectionPolygon,
        so: &Position,
        vo: Velocity,
        t0: f64,
        state_horizon: f64,
        intent: &PolyPath,
        b: f64,
        t: f64,
    ) -> ConflictList {
        let mut cdsi = Self::new(cd.clone_box());
        cdsi.detection(so, vo, t0, state_horizon, intent, b, t);
        cdsi.into_conflicts()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn detection(
        &mut self,
        so: &Position,
        vo: Velocity,
        t0: f64,
        state_horizon: f64,
        intent: &PolyPath,
        b: f64,
        t: f64,
    ) -> bool {
        let raw = self.pieces(so, vo, t0, state_horizon, intent, b, t, false);
        self.conflicts = merge_filtered(&raw, self.cd.min_duration());
        tracing::debug!(
            path = intent.name(),
            conflicts = self.conflicts.len(),
            "state/polygon detection complete"
        );
        !self.conflicts.is_empty()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn detection_xyz(
        &mut self,
        so: Vect3,
        vo: Velocity,
        t0: f64,
        state_horizon: f64,
        intent: &PolyPath,
        b: f64,
        t: f64,
    ) -> bool {
        self.detection(&Position::Xyz(so), vo, t0, state_horizon, intent, b, t)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn detection_ll(
        &mut self,
        so: LatLonAlt,
        vo: Velocity,
        t0: f64,
        state_horizon: f64,
        intent: &PolyPath,
        b: f64,
        t: f64,
    ) -> bool {
        self.detection(&Position::LatLon(so), vo, t0, state_horizon, intent, b, t)
    }

    /// Whether any conflict exists, stopping at the first one found.
    #[allow(clippy::too_many_arguments)]
    pub fn conflict_only(
        &mut self,
        so: &Position,
        vo: Velocity,
        t0: f64,
        state_horizon: f64,
        intent: &PolyPath,
        b: f64,
        t: f64,
    ) -> bool {
        let raw = self.pieces(so, vo, t0, state_horizon, intent, b, t, true);
        !merge_filtered(&raw, self.cd.min_duration()).is_empty()
    }

    /// Unmerged per-step captures, short pieces included. Leaves the stored
    /// conflicts empty.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn pieces(
        &mut self,
        so: &Position,
        vo: Velocity,
        t0: f64,
        state_horizon: f64,
        intent: &PolyPath,
        b: f64,
        t: f64,
        first_only: bool,
    ) -> Vec<ConflictInterval> {
        self.conflicts.clear();
        if !self.check_inputs(so.is_lat_lon(), intent, b, t) {
            return Vec::new();
        }
        match *so {
            Position::LatLon(lla) => self.sequence(intent, t0, state_horizon, b, t, first_only, |t_base| {
                geodetic_leg(lla, vo, t0, intent, t_base)
            }),
            Position::Xyz(p) => self.sequence(intent, t0, state_horizon, b, t, first_only, |t_base| {
                euclidean_leg(p, vo, t0, intent, t_base)
            }),
        }
    }

    /// Whether `so` is inside the path's volume at `tm`. False outside the
    /// path's time span.
    pub fn violation(&self, so: &Position, vo: Velocity, intent: &PolyPath, tm: f64) -> bool {
        if intent.is_empty() || tm < intent.first_time() || tm > intent.last_time() {
            return false;
        }
        if so.is_lat_lon() != intent.is_lat_lon() {
            self.error.add_error("violation: ownship and path use different frames");
            return false;
        }
        let Some(poly) = intent.position(tm) else {
            return false;
        };
        match so {
            Position::LatLon(lla) => {
                let proj = EuclideanProjection::new(lla.zero_alt());
                self.cd.violation(
                    proj.project(*lla),
                    proj.project_velocity(*lla, vo),
                    &poly.poly3d(&proj),
                )
            }
            Position::Xyz(p) => {
                let proj = EuclideanProjection::new(LatLonAlt::new(0.0, 0.0, 0.0));
                self.cd.violation(*p, vo, &poly.poly3d(&proj))
            }
        }
    }

    fn check_inputs(&self, lat_lon: bool, intent: &PolyPath, b: f64, t: f64) -> bool {
        if b > t {
            self.error
                .add_warning(format!("lookahead start {b} is after its end {t}"));
            return false;
        }
        if intent.is_empty() {
            self.error.add_warning(format!("path {} has no polygons", intent.name()));
            return false;
        }
        if intent.is_lat_lon() != lat_lon {
            self.error.add_error(format!(
                "ownship and path {} use different coordinate frames",
                intent.name()
            ));
            return false;
        }
        true
    }

    #[allow(clippy::too_many_arguments)]
    fn sequence<F>(
        &mut self,
        intent: &PolyPath,
        t0: f64,
        state_horizon: f64,
        b: f64,
        t: f64,
        first_only: bool,
        mut leg_states: F,
    ) -> Vec<ConflictInterval>
    where
        F: FnMut(f64) -> Option<(Vect3, Velocity, MovingPolygon3D)>,
    {
        let min = self.cd.min_duration();
        let mut raw = Vec::new();
        let (mut t_base, start) = if t0 < intent.first_time() {
            (intent.first_time(), 0)
        } else {
            match intent.get_segment(t0) {
                Some(j) => (t0, j),
                None => return raw,
            }
        };

        let n = intent.size();
        let end = if intent.is_continuing() { n } else { n.saturating_sub(1) };
        let mut cont = false;
        for j in start..end {
            let leg_remaining = if j + 1 < n {
                intent.get_time(j + 1) - t_base
            } else {
                f64::MAX
            };
            let w = LegWindow::new(b, t, t_base - t0, state_horizon, leg_remaining, cont);
            if w.is_open() {
                w.check_duration(&self.error, j, t_base);
                match leg_states(t_base) {
                    Some((sop, vop, mp)) => {
                        for c in self.cd.conflict_detection(sop, vop, &mp, w.bt, w.nt.min(w.ht)) {
                            let c = c.shifted(t_base).with_segments(j, j);
                            if already_exited(c.time_out, t0 + b) {
                                continue;
                            }
                            raw.push(c);
                            if first_only && c.duration() >= min {
                                return raw;
                            }
                        }
                    }
                    None => self
                        .error
                        .add_error(format!("no polygon for step {j} at time {t_base}")),
                }
            }
            cont = continues(raw.last(), w.ht + t_base);
            if j + 1 < n {
                t_base = intent.get_time(j + 1);
            }
        }
        raw
    }
}

fn euclidean_leg(
    so: Vect3,
    vo: Velocity,
    t0: f64,
    intent: &PolyPath,
    t_base: f64,
) -> Option<(Vect3, Velocity, MovingPolygon3D)> {
    let mp = intent.get_moving_polygon(t_base, None)?;
    Some((so.linear(vo.vect3(), t_base - t0), vo, mp))
}

fn geodetic_leg(
    so: LatLonAlt,
    vo: Velocity,
    t0: f64,
    intent: &PolyPath,
    t_base: f64,
) -> Option<(Vect3, Velocity, MovingPolygon3D)> {
    let so2p = so.linear_initial(vo, t_base - t0);
    let proj = EuclideanProjection::new(so2p.zero_alt());
    let mp = intent.get_moving_polygon(t_base, Some(&proj))?;
    Some((proj.project(so2p), proj.project_velocity(so2p, vo), mp))
}

impl_conflict_report!(CdsiPolygon);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict_list::ConflictReport;
    use crate::error_log::ErrorReporter;
    use crate::poly_path::SimplePoly;

    fn square(cx: f64, cy: f64, half: f64, bottom: f64, top: f64) -> SimplePoly {
        SimplePoly::new(
            vec![
                Position::xyz(cx - half, cy - half, 0.0),
                Position::xyz(cx + half, cy - half, 0.0),
                Position::xyz(cx + half, cy + half, 0.0),
                Position::xyz(cx - half, cy + half, 0.0),
            ],
            bottom,
            top,
        )
    }

    #[test]
    fn test_fly_into_static_cell() {
        let mut path = PolyPath::new("cell");
        path.add_polygon(square(2000.0, 0.0, 500.0, 0.0, 1000.0), 0.0).unwrap();
        let mut cdsi = CdsiPolygon::default();
        let so = Position::xyz(0.0, 0.0, 500.0);
        let vo = Velocity::new(50.0, 0.0, 0.0);
        assert!(cdsi.detection(&so, vo, 0.0, f64::MAX, &path, 0.0, 100.0));
        assert_eq!(cdsi.size(), 1);
        assert!(cdsi.time_in(0) <= 30.0 && cdsi.time_in(0) > 29.8);
        assert!(cdsi.time_out(0) >= 50.0 && cdsi.time_out(0) < 50.2);
    }

    #[test]
    fn test_morphing_path_across_steps_merges() {
        // Cell drifts east 10 m/s over two steps; ownship sits still inside
        // its track.
        let mut path = PolyPath::new("drift");
        path.add_polygon(square(-300.0, 0.0, 100.0, 0.0, 1000.0), 0.0).unwrap();
        path.add_polygon(square(0.0, 0.0, 100.0, 0.0, 1000.0), 30.0).unwrap();
        path.add_polygon(square(300.0, 0.0, 100.0, 0.0, 1000.0), 60.0).unwrap();
        let mut cdsi = CdsiPolygon::default();
        let so = Position::xyz(0.0, 0.0, 500.0);
        assert!(cdsi.detection(&so, Velocity::ZERO, 0.0, f64::MAX, &path, 0.0, 60.0));
        assert_eq!(cdsi.size(), 1);
        assert!((cdsi.time_in(0) - 20.0).abs() < 0.2);
        assert!((cdsi.time_out(0) - 40.0).abs() < 0.2);
        assert_eq!(cdsi.segment_in(0), 0);
        assert_eq!(cdsi.segment_out(0), 1);
    }

    #[test]
    fn test_user_velocity_path_continues() {
        let path = PolyPath::from_state(
            "moving",
            square(-1000.0, 0.0, 100.0, 0.0, 1000.0),
            Velocity::new(20.0, 0.0, 0.0),
            0.0,
        );
        let mut cdsi = CdsiPolygon::default();
        let so = Position::xyz(0.0, 0.0, 500.0);
        assert!(cdsi.detection(&so, Velocity::ZERO, 0.0, f64::MAX, &path, 0.0, 100.0));
        assert!((cdsi.time_in(0) - 45.0).abs() < 0.2);
        assert!((cdsi.time_out(0) - 55.0).abs() < 0.2);
    }

    #[test]
    fn test_reversed_window_warns() {
        let mut path = PolyPath::new("cell");
        path.add_polygon(square(0.0, 0.0, 100.0, 0.0, 1000.0), 0.0).unwrap();
        let mut cdsi = CdsiPolygon::default();
        let so = Position::xyz(0.0, 0.0, 500.0);
        assert!(!cdsi.detection(&so, Velocity::ZERO, 0.0, f64::MAX, &path, 10.0, 5.0));
        assert!(cdsi.has_message());
    }

    #[test]
    fn test_violation_inside_cell() {
        let mut path = PolyPath::new("cell");
        path.add_polygon(square(0.0, 0.0, 100.0, 0.0, 1000.0), 0.0).unwrap();
        let cdsi = CdsiPolygon::default();
        assert!(cdsi.violation(&Position::xyz(10.0, 10.0, 500.0), Velocity::ZERO, &path, 5.0));
        assert!(!cdsi.violation(&Position::xyz(10.0, 10.0, 1500.0), Velocity::ZERO, &path, 5.0));
        assert!(!cdsi.violation(&Position::xyz(10.0, 10.0, 500.0), Velocity::ZERO, &path, -5.0));
    }

    #[test]
    fn test_conflict_only() {
        let mut path = PolyPath::new("cell");
        path.add_polygon(square(2000.0, 0.0, 500.0, 0.0, 1000.0), 0.0).unwrap();
        let mut cdsi = CdsiPolygon::default();
        let so = Position::xyz(0.0, 0.0, 500.0);
        let vo = Velocity::new(50.0, 0.0, 0.0);
        assert!(cdsi.conflict_only(&so, vo, 0.0, f64::MAX, &path, 0.0, 100.0));
        assert!(!cdsi.conflict_only(&so, vo, 0.0, f64::MAX, &path, 0.0, 20.0));
    }
}
