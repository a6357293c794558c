//! Ranking of traffic by how urgently it needs attention.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::detection::{CdCylinder, Detection3D};
use crate::position::Position;
use crate::projection::EuclideanProjection;
use crate::rules::SeparationRules;
use crate::util::almost_equals;
use crate::vect::{Vect3, Velocity};

/// Position and velocity of one aircraft at the current time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficState {
    pub id: String,
    pub position: Position,
    pub velocity: Velocity,
}

impl TrafficState {
    pub fn new(id: impl Into<String>, position: Position, velocity: Velocity) -> Self {
        Self {
            id: id.into(),
            position,
            velocity,
        }
    }
}

/// Scores an intruder against the ownship; lower is more urgent.
///
/// * no conflict in `[b, t]`: horizontal distance plus `t`
/// * conflict ahead: time to loss of separation
/// * already in conflict and converging: `-1 / distance at closest approach`
/// * already in conflict and diverging: `-1 / current horizontal distance`
///
/// So every conflict outranks every non-conflict, and every ongoing
/// conflict outranks every future one.
#[derive(Debug, Clone)]
pub struct TargetUrgency {
    cd: Box<dyn Detection3D>,
    b: f64,
    t: f64,
}

impl Default for TargetUrgency {
    fn default() -> Self {
        Self::from_rules(&SeparationRules::default())
    }
}

impl TargetUrgency {
    pub fn new(cd: Box<dyn Detection3D>, b: f64, t: f64) -> Self {
        Self { cd, b, t }
    }

    pub fn from_rules(rules: &SeparationRules) -> Self {
        Self::new(
            Box::new(CdCylinder::from_rules(rules)),
            rules.lookahead_begin_s,
            rules.lookahead_end_s,
        )
    }

    pub fn detector(&self) -> &dyn Detection3D {
        self.cd.as_ref()
    }

    pub fn window(&self) -> (f64, f64) {
        (self.b, self.t)
    }

    /// Urgency of `traffic` for `own`. `f64::MAX` when the lookahead window
    /// is unusable or the two states are in different frames.
    pub fn urgency(&self, own: &TrafficState, traffic: &TrafficState) -> f64 {
        if self.t <= 0.0 || self.t < self.b {
            return f64::MAX;
        }
        let Some((so, vo, si, vi)) = project_pair(own, traffic) else {
            tracing::warn!(own = %own.id, traffic = %traffic.id, "urgency across coordinate frames");
            return f64::MAX;
        };

        let det = self.cd.conflict_detection(so, vo, si, vi, self.b, self.t);
        let dist_now = (so - si).vect2().norm();
        if !det.conflict() {
            return dist_now + self.t;
        }
        let tin = det.time_in();
        if tin > 0.0 && !almost_equals(tin, 0.0) {
            return tin;
        }
        // Converging when the unclamped closest approach is still ahead
        let vv = det.v.sqv();
        let tca = if vv > 0.0 { -det.s.dot(det.v) / vv } else { 0.0 };
        if tca > 0.0 && !almost_equals(tca, 0.0) {
            -1.0 / det.dist_crit.max(f64::MIN_POSITIVE)
        } else {
            -1.0 / dist_now.max(f64::MIN_POSITIVE)
        }
    }

    pub fn compare(&self, own: &TrafficState, a: &TrafficState, b: &TrafficState) -> Ordering {
        self.urgency(own, a).total_cmp(&self.urgency(own, b))
    }

    /// Index of the most urgent intruder with usable data.
    pub fn most_urgent(&self, own: &TrafficState, traffic: &[TrafficState]) -> Option<usize> {
        self.ranking(own, traffic).first().map(|(i, _)| *i)
    }

    /// `(index, urgency)` of every intruder with usable data, most urgent
    /// first. Ties keep input order.
    pub fn ranking(&self, own: &TrafficState, traffic: &[TrafficState]) -> Vec<(usize, f64)> {
        let mut ranked: Vec<(usize, f64)> = traffic
            .iter()
            .enumerate()
            .map(|(i, ac)| (i, self.urgency(own, ac)))
            .filter(|(_, u)| *u < f64::MAX)
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        ranked
    }
}

/// Both states in one Euclidean frame, anchored at the ownship for
/// geodetic input.
fn project_pair(own: &TrafficState, traffic: &TrafficState) -> Option<(Vect3, Velocity, Vect3, Velocity)> {
    match (own.position, traffic.position) {
        (Position::Xyz(so), Position::Xyz(si)) => Some((so, own.velocity, si, traffic.velocity)),
        (Position::LatLon(so), Position::LatLon(si)) => {
            let proj = EuclideanProjection::new(so.zero_alt());
            Some((
                proj.project(so),
                proj.project_velocity(so, own.velocity),
                proj.project(si),
                proj.project_velocity(si, traffic.velocity),
            ))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> TargetUrgency {
        TargetUrgency::new(Box::new(CdCylinder::new(1000.0, 100.0)), 0.0, 300.0)
    }

    fn own() -> TrafficState {
        TrafficState::new("own", Position::xyz(0.0, 0.0, 1000.0), Velocity::new(100.0, 0.0, 0.0))
    }

    fn head_on(range: f64) -> TrafficState {
        TrafficState::new("t", Position::xyz(range, 0.0, 1000.0), Velocity::new(-100.0, 0.0, 0.0))
    }

    #[test]
    fn test_future_conflict_scores_entry_time() {
        // Closing at 200 m/s from 20 km, cylinder 1 km: entry at 95 s
        let u = scorer().urgency(&own(), &head_on(20_000.0));
        assert!((u - 95.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_conflict_scores_distance_plus_horizon() {
        let far = TrafficState::new("far", Position::xyz(0.0, 50_000.0, 1000.0), Velocity::new(100.0, 0.0, 0.0));
        let u = scorer().urgency(&own(), &far);
        assert!((u - 50_300.0).abs() < 1e-6);
    }

    #[test]
    fn test_ongoing_conflicts_rank_first() {
        let s = scorer();
        let converging = head_on(500.0);
        let diverging = TrafficState::new("div", Position::xyz(-500.0, 0.0, 1000.0), Velocity::new(-100.0, 0.0, 0.0));
        let uc = s.urgency(&own(), &converging);
        let ud = s.urgency(&own(), &diverging);
        assert!(uc < 0.0);
        assert!(ud < 0.0);
        assert!(uc < ud);
        assert!(ud < s.urgency(&own(), &head_on(20_000.0)));
    }

    #[test]
    fn test_diverging_scored_by_current_distance_at_any_window_start() {
        // Inside the 1 km cylinder, 500 m behind and opening at 200 m/s
        let diverging = TrafficState::new("div", Position::xyz(-500.0, 0.0, 1000.0), Velocity::new(-100.0, 0.0, 0.0));
        for b in [0.0, 1e-14, -60.0] {
            let s = TargetUrgency::new(Box::new(CdCylinder::new(1000.0, 100.0)), b, 300.0);
            let u = s.urgency(&own(), &diverging);
            assert!((u + 1.0 / 500.0).abs() < 1e-12, "b {b}: {u}");
        }
        // Closing pair in the same window scores by distance at closest approach
        let s = TargetUrgency::new(Box::new(CdCylinder::new(1000.0, 100.0)), 1e-14, 300.0);
        assert!(s.urgency(&own(), &head_on(500.0)) < -1.0 / 500.0);
    }

    #[test]
    fn test_degenerate_window() {
        let s = TargetUrgency::new(Box::new(CdCylinder::default()), 10.0, 5.0);
        assert_eq!(s.urgency(&own(), &head_on(1000.0)), f64::MAX);
        let s = TargetUrgency::new(Box::new(CdCylinder::default()), 0.0, 0.0);
        assert_eq!(s.urgency(&own(), &head_on(1000.0)), f64::MAX);
    }

    #[test]
    fn test_most_urgent_and_ranking() {
        let s = scorer();
        let traffic = vec![
            head_on(40_000.0),
            TrafficState::new("ll", Position::lat_lon(0.0, 0.0, 0.0), Velocity::ZERO),
            head_on(20_000.0),
        ];
        assert_eq!(s.most_urgent(&own(), &traffic), Some(2));
        let ranked = s.ranking(&own(), &traffic);
        assert_eq!(ranked.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![2, 0]);
        assert_eq!(s.compare(&own(), &traffic[2], &traffic[0]), Ordering::Less);
        assert_eq!(s.most_urgent(&own(), &[]), None);
    }
}
