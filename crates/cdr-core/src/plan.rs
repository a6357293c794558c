//! Piecewise-linear intent trajectories.

use serde::{Deserialize, Serialize};

use crate::error_log::{ErrorLog, ErrorReporter};
use crate::geodesy;
use crate::position::Position;
use crate::vect::Velocity;

/// Remaining leg time below which the arrival course is used directly.
const MIN_LEG_REMAINING_S: f64 = 1e-6;

/// A timed point of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavPoint {
    pub position: Position,
    /// Seconds, in the same clock as the detection windows
    pub time: f64,
}

impl NavPoint {
    pub fn new(position: Position, time: f64) -> Self {
        Self { position, time }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PlanData {
    #[serde(default)]
    name: String,
    points: Vec<NavPoint>,
}

/// Ordered sequence of [`NavPoint`]s flown at constant velocity between
/// consecutive points (straight lines, or great circles for geodetic
/// points).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "PlanData", into = "PlanData")]
pub struct Plan {
    name: String,
    points: Vec<NavPoint>,
    error: ErrorLog,
}

impl From<PlanData> for Plan {
    fn from(data: PlanData) -> Self {
        let mut plan = Plan::new(data.name);
        for p in data.points {
            plan.add_point(p);
        }
        plan
    }
}

impl From<Plan> for PlanData {
    fn from(plan: Plan) -> Self {
        PlanData {
            name: plan.name,
            points: plan.points,
        }
    }
}

impl Plan {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            error: ErrorLog::new(format!("Plan({name})")),
            name,
            points: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert a point in time order. A point at an existing time replaces the
    /// old one. Points in a different frame than the plan, or with a
    /// non-finite time, are rejected.
    ///
    /// Returns the index of the stored point.
    pub fn add_point(&mut self, p: NavPoint) -> Option<usize> {
        if !p.time.is_finite() {
            self.error.add_error(format!("invalid time {} in add_point", p.time));
            return None;
        }
        if let Some(first) = self.points.first() {
            if first.position.is_lat_lon() != p.position.is_lat_lon() {
                self.error
                    .add_error("cannot mix Euclidean and geodetic points in one plan");
                return None;
            }
        }
        let idx = self.points.partition_point(|q| q.time < p.time);
        if self.points.get(idx).is_some_and(|q| q.time == p.time) {
            self.points[idx] = p;
        } else {
            self.points.insert(idx, p);
        }
        Some(idx)
    }

    /// Shorthand for adding a point from its position and time.
    pub fn add(&mut self, position: Position, time: f64) -> Option<usize> {
        self.add_point(NavPoint::new(position, time))
    }

    pub fn size(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[NavPoint] {
        &self.points
    }

    pub fn point(&self, i: usize) -> Option<&NavPoint> {
        self.points.get(i)
    }

    /// Time of point `i`. Out-of-range indices log an error and give 0.
    pub fn time(&self, i: usize) -> f64 {
        match self.points.get(i) {
            Some(p) => p.time,
            None => {
                self.error.add_error(format!(
                    "time: index {i} out of range for plan of size {}",
                    self.points.len()
                ));
                0.0
            }
        }
    }

    pub fn first_time(&self) -> f64 {
        self.points.first().map_or(0.0, |p| p.time)
    }

    pub fn last_time(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.time)
    }

    pub fn is_lat_lon(&self) -> bool {
        self.points.first().is_some_and(|p| p.position.is_lat_lon())
    }

    /// Index of the segment containing `t`.
    ///
    /// A time equal to a point's time returns that point's index (the last
    /// point included). Times before the first or after the last point have
    /// no segment.
    pub fn get_segment(&self, t: f64) -> Option<usize> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        if t < first.time || t > last.time {
            return None;
        }
        let k = self.points.partition_point(|p| p.time < t);
        if self.points.get(k).is_some_and(|p| p.time == t) {
            Some(k)
        } else {
            Some(k - 1)
        }
    }

    /// Segment used to evaluate motion at `t`, extrapolating the first and
    /// last legs outside the plan.
    fn leg_for(&self, t: f64) -> usize {
        let n = self.points.len();
        if n < 2 {
            return 0;
        }
        if t <= self.first_time() {
            return 0;
        }
        match self.get_segment(t) {
            Some(i) => i.min(n - 2),
            None => n - 2,
        }
    }

    /// Constant velocity flown from point `i` toward point `i + 1`.
    ///
    /// For the last point this is the arrival velocity of the last leg. A
    /// single-point plan has zero velocity. Out-of-range indices log a
    /// warning and give zero.
    pub fn initial_velocity(&self, i: usize) -> Velocity {
        let n = self.points.len();
        if i >= n {
            self.error.add_warning(format!(
                "initial_velocity: index {i} out of range for plan of size {n}"
            ));
            return Velocity::ZERO;
        }
        if n == 1 {
            return Velocity::ZERO;
        }
        if i + 1 < n {
            let a = &self.points[i];
            let b = &self.points[i + 1];
            return a.position.velocity_to(&b.position, b.time - a.time);
        }
        self.arrival_velocity(n - 2)
    }

    /// Velocity when reaching the end of leg `i`.
    fn arrival_velocity(&self, i: usize) -> Velocity {
        let a = &self.points[i];
        let b = &self.points[i + 1];
        let v = a.position.velocity_to(&b.position, b.time - a.time);
        match (a.position.as_lat_lon(), b.position.as_lat_lon()) {
            (Some(pa), Some(pb)) if v.gs() > 0.0 => {
                let trk = geodesy::final_course(pa.lat, pa.lon, pb.lat, pb.lon);
                Velocity::from_trk_gs_vs(trk, v.gs(), v.vs())
            }
            _ => v,
        }
    }

    /// Position at time `t`. Outside the plan the first or last leg is
    /// extended.
    pub fn position(&self, t: f64) -> Position {
        let Some(first) = self.points.first() else {
            self.error.add_error("position: empty plan");
            return Position::xyz(0.0, 0.0, 0.0);
        };
        if self.points.len() == 1 {
            return first.position;
        }
        let i = self.leg_for(t);
        let p = &self.points[i];
        p.position.linear(self.initial_velocity(i), t - p.time)
    }

    /// Velocity at time `t`. On geodetic legs the track follows the great
    /// circle, so it differs from the leg's initial track.
    pub fn velocity(&self, t: f64) -> Velocity {
        let n = self.points.len();
        if n < 2 {
            return Velocity::ZERO;
        }
        let i = self.leg_for(t);
        if !self.is_lat_lon() {
            return self.initial_velocity(i);
        }
        let next = &self.points[i + 1];
        let remaining = next.time - t;
        if remaining <= MIN_LEG_REMAINING_S {
            return self.arrival_velocity(i);
        }
        self.position(t).velocity_to(&next.position, remaining)
    }
}

impl ErrorReporter for Plan {
    fn has_error(&self) -> bool {
        self.error.has_error()
    }

    fn has_message(&self) -> bool {
        self.error.has_message()
    }

    fn get_message(&self) -> String {
        self.error.get_message()
    }

    fn get_message_no_clear(&self) -> String {
        self.error.get_message_no_clear()
    }
}
