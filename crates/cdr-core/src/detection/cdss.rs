//! State-vs-state detection with a filter and a lookahead horizon.

use crate::position::LatLonAlt;
use crate::projection::EuclideanProjection;
use crate::vect::{Vect3, Velocity};

use super::{CdCylinder, Detection3D};

/// Wraps a [`Detection3D`] and keeps the result of the last detection call.
#[derive(Debug, Clone)]
pub struct CdssCore {
    cd: Box<dyn Detection3D>,
    filter: f64,
    t_in: f64,
    t_out: f64,
    tca: f64,
    dtca: f64,
    stca: Vect3,
}

impl Default for CdssCore {
    fn default() -> Self {
        Self::new(Box::new(CdCylinder::default()), 0.0)
    }
}

impl CdssCore {
    /// `filter` is the shortest conflict, in seconds, that is reported.
    pub fn new(cd: Box<dyn Detection3D>, filter: f64) -> Self {
        Self {
            cd,
            filter: filter.max(0.0),
            t_in: f64::INFINITY,
            t_out: f64::NEG_INFINITY,
            tca: 0.0,
            dtca: f64::INFINITY,
            stca: Vect3::ZERO,
        }
    }

    pub fn detector(&self) -> &dyn Detection3D {
        self.cd.as_ref()
    }

    pub fn set_detector(&mut self, cd: Box<dyn Detection3D>) {
        self.cd = cd;
    }

    pub fn filter_time(&self) -> f64 {
        self.filter
    }

    pub fn set_filter_time(&mut self, filter: f64) {
        if filter >= 0.0 {
            self.filter = filter;
        }
    }

    pub fn violation(&self, so: Vect3, vo: Velocity, si: Vect3, vi: Velocity) -> bool {
        self.cd.violation(so, vo, si, vi)
    }

    /// Whether a conflict exists in `[b, t]`; does not touch the stored result.
    pub fn conflict(&self, so: Vect3, vo: Velocity, si: Vect3, vi: Velocity, b: f64, t: f64) -> bool {
        self.cd
            .conflict_detection(so, vo, si, vi, b, t)
            .conflict_filtered(self.filter)
    }

    /// Detection over `[b, t]` with no horizon on the motion model.
    pub fn detection_between(
        &mut self,
        so: Vect3,
        vo: Velocity,
        si: Vect3,
        vi: Velocity,
        b: f64,
        t: f64,
    ) -> bool {
        self.detection_within(so, vo, si, vi, b, t, f64::INFINITY)
    }

    /// Detection where the states are only trusted up to `horizon`.
    ///
    /// The loss interval is computed over `[0, horizon]`, so `time_out` can
    /// extend past `t`. A conflict is reported when it starts before `t`
    /// and ends at or after `b`.
    #[allow(clippy::too_many_arguments)]
    pub fn detection_within(
        &mut self,
        so: Vect3,
        vo: Velocity,
        si: Vect3,
        vi: Velocity,
        b: f64,
        t: f64,
        horizon: f64,
    ) -> bool {
        let det = self.cd.conflict_detection(so, vo, si, vi, 0.0, horizon);
        self.t_in = det.time_in();
        self.t_out = det.time_out();
        self.tca = b.max(det.time_crit).min(horizon);
        self.stca = det.relative_position(self.tca);
        self.dtca = det.dist_crit;
        det.conflict_filtered(self.filter) && self.t_in < t && self.t_out >= b
    }

    /// Geodetic entry point: both states are projected onto a tangent plane
    /// anchored at the ownship.
    #[allow(clippy::too_many_arguments)]
    pub fn detection_ll(
        &mut self,
        so: LatLonAlt,
        vo: Velocity,
        si: LatLonAlt,
        vi: Velocity,
        b: f64,
        t: f64,
    ) -> bool {
        let proj = EuclideanProjection::new(so.zero_alt());
        let so3 = proj.project(so);
        let si3 = proj.project(si);
        let vo3 = proj.project_velocity(so, vo);
        let vi3 = proj.project_velocity(si, vi);
        self.detection_between(so3, vo3, si3, vi3, b, t)
    }

    /// Whether the last detection found a loss interval.
    pub fn conflict_found(&self) -> bool {
        self.t_in < self.t_out
    }

    pub fn time_in(&self) -> f64 {
        self.t_in
    }

    pub fn time_out(&self) -> f64 {
        self.t_out
    }

    pub fn conflict_duration(&self) -> f64 {
        if self.conflict_found() {
            self.t_out - self.t_in
        } else {
            0.0
        }
    }

    pub fn time_of_closest_approach(&self) -> f64 {
        self.tca
    }

    /// Cylindrical distance at closest approach.
    pub fn distance_at_critical_time(&self) -> f64 {
        self.dtca
    }

    /// Relative position (ownship minus intruder) at closest approach.
    pub fn relative_position_at_tca(&self) -> Vect3 {
        self.stca
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units;

    fn head_on() -> (Vect3, Velocity, Vect3, Velocity) {
        (
            Vect3::new(0.0, 0.0, 1000.0),
            Velocity::new(100.0, 0.0, 0.0),
            Vect3::new(20_000.0, 0.0, 1000.0),
            Velocity::new(-100.0, 0.0, 0.0),
        )
    }

    #[test]
    fn test_detection_between_reports_times() {
        let mut cdss = CdssCore::new(Box::new(CdCylinder::new(1000.0, 100.0)), 0.0);
        let (so, vo, si, vi) = head_on();
        assert!(cdss.detection_between(so, vo, si, vi, 0.0, 200.0));
        assert!((cdss.time_in() - 95.0).abs() < 1e-9);
        assert!((cdss.time_out() - 105.0).abs() < 1e-9);
        assert!((cdss.time_of_closest_approach() - 100.0).abs() < 1e-9);
        assert!(cdss.distance_at_critical_time() < 1e-9);
    }

    #[test]
    fn test_horizon_limits_exit_time() {
        let mut cdss = CdssCore::new(Box::new(CdCylinder::new(1000.0, 100.0)), 0.0);
        let (so, vo, si, vi) = head_on();
        assert!(cdss.detection_within(so, vo, si, vi, 0.0, 200.0, 100.0));
        assert!((cdss.time_out() - 100.0).abs() < 1e-9);
        assert!(!cdss.detection_within(so, vo, si, vi, 0.0, 200.0, 90.0));
    }

    #[test]
    fn test_conflict_after_window_end_not_reported() {
        let mut cdss = CdssCore::new(Box::new(CdCylinder::new(1000.0, 100.0)), 0.0);
        let (so, vo, si, vi) = head_on();
        assert!(!cdss.detection_between(so, vo, si, vi, 0.0, 90.0));
        assert!(!cdss.detection_between(so, vo, si, vi, 110.0, 200.0));
        assert!(cdss.detection_between(so, vo, si, vi, 100.0, 200.0));
        assert_eq!(cdss.time_of_closest_approach(), 100.0);
    }

    #[test]
    fn test_filter_drops_short_conflicts() {
        let mut cdss = CdssCore::new(Box::new(CdCylinder::new(1000.0, 100.0)), 30.0);
        let (so, vo, si, vi) = head_on();
        assert!(!cdss.detection_between(so, vo, si, vi, 0.0, 200.0));
        assert!(!cdss.conflict(so, vo, si, vi, 0.0, 200.0));
    }

    #[test]
    fn test_geodetic_head_on() {
        let mut cdss = CdssCore::default();
        let speed = units::from("kn", 400.0);
        let so = LatLonAlt::new(0.0, 0.0, 3000.0);
        let si = LatLonAlt::new(0.0, 1.0, 3000.0);
        let vo = Velocity::from_trk_gs_vs(90f64.to_radians(), speed, 0.0);
        let vi = Velocity::from_trk_gs_vs(270f64.to_radians(), speed, 0.0);
        assert!(cdss.detection_ll(so, vo, si, vi, 0.0, 3600.0));
        let gap = so.distance_h(si);
        let expected_tca = gap / (2.0 * speed);
        assert!((cdss.time_of_closest_approach() - expected_tca).abs() < 1.0);
    }
}
