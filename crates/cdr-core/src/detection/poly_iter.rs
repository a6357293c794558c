//! Point against moving polygon, by stepping through time.
//!
//! Vertical entry and exit have a closed form. Horizontally the polygon is
//! first bounded by a moving circle to get a coarse candidate window, which
//! is then walked at a fixed time step testing exact containment. Each change
//! of containment status is located by bisection.

use serde::{Deserialize, Serialize};

use crate::conflict_list::ConflictInterval;
use crate::moving_polygon::{MovingPolygon2D, MovingPolygon3D};
use crate::parameters::ParameterData;
use crate::poly::Poly3D;
use crate::rules::SeparationRules;
use crate::util::almost_equals;
use crate::vect::{Vect2, Vect3, Velocity};

use super::cd3d;
use super::DetectionPolygon;

pub const DEFAULT_TIME_STEP: f64 = 1.0;

/// Bisection stops once the bracket is this fraction of the time step.
const MICRO_STEP_FRACTION: f64 = 0.1;

/// Length of the search (seconds) when the window has no usable end.
const MAX_SEARCH_S: f64 = 36_000.0;

/// Relative padding of the bounding circle.
const ENVELOPE_PAD: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdPolyIter {
    id: String,
    time_step: f64,
}

impl Default for CdPolyIter {
    fn default() -> Self {
        Self {
            id: String::new(),
            time_step: DEFAULT_TIME_STEP,
        }
    }
}

impl CdPolyIter {
    pub fn new(time_step: f64) -> Self {
        let mut cd = Self::default();
        cd.set_time_step(time_step);
        cd
    }

    pub fn from_rules(rules: &SeparationRules) -> Self {
        Self::new(rules.polygon_time_step_s)
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Non-positive steps are ignored.
    pub fn set_time_step(&mut self, time_step: f64) {
        if time_step > 0.0 {
            self.time_step = time_step;
        }
    }

    /// Conflict intervals of point `s` moving with `v` against `mp`, within
    /// `[b, t]`.
    ///
    /// Intervals shorter than the time step are dropped unless they touch an
    /// end of the search window. A negative or unbounded `t` searches 10
    /// hours past `b`.
    pub fn poly_iter_detection(
        &self,
        b: f64,
        t: f64,
        mp: &MovingPolygon3D,
        s: Vect3,
        v: Velocity,
    ) -> Vec<ConflictInterval> {
        let t = if t < 0.0 || t >= f64::MAX {
            b.max(0.0) + MAX_SEARCH_S
        } else {
            t
        };
        if !(b < t) {
            return Vec::new();
        }
        let Some((tin, tout)) =
            polygon_alt_inside_time(b, t, mp.vspeed, mp.minalt, mp.maxalt, s.z, v.z)
        else {
            return Vec::new();
        };

        let start = mp.horizpoly.advanced(tin);
        let s2 = s.vect2().linear(v.vect2(), tin);
        let raw = poly2d_detection(tout - tin, &start, s2, v.vect2(), self.time_step);

        raw.into_iter()
            .filter_map(|(a, z)| {
                let (ain, aout) = polygon_alt_inside_time(
                    a + tin,
                    z + tin,
                    mp.vspeed,
                    mp.minalt,
                    mp.maxalt,
                    s.z,
                    v.z,
                )?;
                if ain >= aout {
                    return None;
                }
                let (tca, dist) = self.closest_approach(&mp.horizpoly, s.vect2(), v.vect2(), ain, aout);
                Some(ConflictInterval::new(ain, aout, tca, dist))
            })
            .collect()
    }

    /// Sampled time of minimum horizontal distance to the polygon centroid.
    fn closest_approach(&self, mp: &MovingPolygon2D, s: Vect2, v: Vect2, a: f64, z: f64) -> (f64, f64) {
        let dist_at = |t: f64| mp.position(t).centroid().distance(s.linear(v, t));
        let mut best = (a, dist_at(a));
        let mut t = a + self.time_step;
        while t < z {
            let d = dist_at(t);
            if d < best.1 {
                best = (t, d);
            }
            t += self.time_step;
        }
        let d = dist_at(z);
        if d < best.1 {
            best = (z, d);
        }
        best
    }
}

/// Times within `[b, t]` at which altitude `sz + vz*t` is strictly inside
/// the band `[minalt, maxalt]` moving at `vspeed`.
pub fn polygon_alt_inside_time(
    b: f64,
    t: f64,
    vspeed: f64,
    minalt: f64,
    maxalt: f64,
    sz: f64,
    vz: f64,
) -> Option<(f64, f64)> {
    if b > t || minalt >= maxalt {
        return None;
    }
    let rel_vz = vz - vspeed;
    if almost_equals(rel_vz, 0.0) || almost_equals(b, t) {
        let z = sz + vz * b;
        let inside = z > minalt + vspeed * b && z < maxalt + vspeed * b;
        return inside.then_some((b, t));
    }
    let half = (maxalt - minalt) / 2.0;
    let mid = (maxalt + minalt) / 2.0;
    let thin = cd3d::theta_h(sz - mid, rel_vz, -1, half);
    let thout = cd3d::theta_h(sz - mid, rel_vz, 1, half);
    if thout < b || thin > t {
        return None;
    }
    Some((thin.max(b), thout.min(t)))
}

/// Horizontal-only iterative detection over `[0, t]`.
///
/// Returns (entry, exit) pairs relative to the polygon start. Entries and
/// exits are reported at the outside end of their final bisection bracket.
/// Pieces shorter than `step` are dropped unless they start at 0 or end at
/// the horizon.
pub fn poly2d_detection(t: f64, mp: &MovingPolygon2D, s: Vect2, v: Vect2, step: f64) -> Vec<(f64, f64)> {
    let horizon = t.min(mp.tend());
    if !(horizon > 0.0) || !(step > 0.0) {
        return Vec::new();
    }
    let inside = |tm: f64| mp.position(tm).contains(s.linear(v, tm));

    if mp.is_static() && v.is_zero() {
        return if inside(0.0) {
            vec![(0.0, horizon)]
        } else {
            Vec::new()
        };
    }

    let Some((c_in, c_out)) = envelope_window(mp, s, v, horizon) else {
        return Vec::new();
    };

    let min_step = step * MICRO_STEP_FRACTION;
    let mut found = Vec::new();
    let mut t_prev = c_in;
    let mut in_prev = inside(c_in);
    let mut entry = in_prev.then_some(c_in);

    while t_prev < c_out {
        let t_next = (t_prev + step).min(c_out);
        let in_next = inside(t_next);
        if in_next != in_prev {
            let (lo, hi) = micro_step(&inside, t_prev, t_next, in_prev, min_step);
            if in_next {
                entry = Some(lo);
            } else if let Some(e) = entry.take() {
                found.push((e, hi));
            }
        }
        t_prev = t_next;
        in_prev = in_next;
    }
    if let Some(e) = entry {
        found.push((e, c_out));
    }

    found.retain(|(a, z)| z - a >= step || *a <= 0.0 || *z >= horizon);
    found
}

/// Narrow `[lo, hi]`, whose ends differ in containment, down to `min_step`.
fn micro_step(inside: &impl Fn(f64) -> bool, lo: f64, hi: f64, status_lo: bool, min_step: f64) -> (f64, f64) {
    if hi - lo <= min_step {
        return (lo, hi);
    }
    let mid = 0.5 * (lo + hi);
    if inside(mid) == status_lo {
        micro_step(inside, mid, hi, status_lo, min_step)
    } else {
        micro_step(inside, lo, mid, status_lo, min_step)
    }
}

/// Coarse window from a circle that contains the polygon throughout
/// `[0, horizon]`.
///
/// Vertices move linearly, so each vertex's distance from the (linearly
/// moving) average point is convex in time, and the largest radius over the
/// window occurs at one of its ends.
fn envelope_window(mp: &MovingPolygon2D, s: Vect2, v: Vect2, horizon: f64) -> Option<(f64, f64)> {
    let c0 = mp.polystart().average_point();
    let vc = mp.average_velocity();
    let r0 = mp.polystart().bounding_radius();
    let r1 = mp.position(horizon).bounding_radius();
    let r = r0.max(r1) * (1.0 + ENVELOPE_PAD) + ENVELOPE_PAD;

    let (a, z) = cd3d::horizontal_window(s - c0, v - vc, r)?;
    let a = a.max(0.0);
    let z = z.min(horizon);
    (a < z).then_some((a, z))
}

impl DetectionPolygon for CdPolyIter {
    fn violation(&self, so: Vect3, _vo: Velocity, si: &Poly3D) -> bool {
        si.contains(so)
    }

    fn conflict_detection(
        &self,
        so: Vect3,
        vo: Velocity,
        si: &MovingPolygon3D,
        b: f64,
        t: f64,
    ) -> Vec<ConflictInterval> {
        self.poly_iter_detection(b, t, si, so, vo)
    }

    fn min_duration(&self) -> f64 {
        self.time_step
    }

    fn parameters(&self) -> ParameterData {
        let mut p = ParameterData::new();
        p.set_string("class", self.class_name());
        p.set_string("id", self.id.clone());
        p.set_internal("timeStep", self.time_step, "s");
        p
    }

    fn set_parameters(&mut self, p: &ParameterData) {
        if let Some(ts) = p.get_value("timeStep") {
            self.set_time_step(ts);
        }
        if let Some(id) = p.get_string("id") {
            self.id = id.to_string();
        }
    }

    fn identifier(&self) -> &str {
        &self.id
    }

    fn set_identifier(&mut self, id: &str) {
        self.id = id.to_string();
    }

    fn class_name(&self) -> &'static str {
        "CdPolyIter"
    }

    fn clone_box(&self) -> Box<dyn DetectionPolygon> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poly::Poly2D;

    fn box_poly(x0: f64, x1: f64, y0: f64, y1: f64) -> Poly2D {
        Poly2D::new(vec![
            Vect2::new(x0, y0),
            Vect2::new(x1, y0),
            Vect2::new(x1, y1),
            Vect2::new(x0, y1),
        ])
    }

    fn static_box(bottom: f64, top: f64) -> MovingPolygon3D {
        MovingPolygon3D::new(
            MovingPolygon2D::translating(box_poly(1000.0, 2000.0, -500.0, 500.0), Vect2::ZERO, f64::MAX),
            0.0,
            bottom,
            top,
        )
    }

    #[test]
    fn test_alt_window_level_inside() {
        assert_eq!(
            polygon_alt_inside_time(0.0, 100.0, 0.0, 0.0, 500.0, 200.0, 0.0),
            Some((0.0, 100.0))
        );
        assert_eq!(polygon_alt_inside_time(0.0, 100.0, 0.0, 0.0, 500.0, 600.0, 0.0), None);
        assert_eq!(polygon_alt_inside_time(0.0, 100.0, 0.0, 500.0, 500.0, 500.0, 0.0), None);
    }

    #[test]
    fn test_alt_window_climbing() {
        // Climbing from 0 at 10 m/s into a band 200..400
        let (tin, tout) = polygon_alt_inside_time(0.0, 100.0, 0.0, 200.0, 400.0, 0.0, 10.0).unwrap();
        assert!((tin - 20.0).abs() < 1e-9);
        assert!((tout - 40.0).abs() < 1e-9);
        assert_eq!(polygon_alt_inside_time(0.0, 10.0, 0.0, 200.0, 400.0, 0.0, 10.0), None);
    }

    #[test]
    fn test_fly_through_static_box() {
        let cd = CdPolyIter::default();
        let found = cd.poly_iter_detection(
            0.0,
            100.0,
            &static_box(0.0, 1000.0),
            Vect3::new(0.0, 0.0, 300.0),
            Velocity::new(50.0, 0.0, 0.0),
        );
        assert_eq!(found.len(), 1);
        let c = found[0];
        assert!(c.time_in <= 20.0 && c.time_in > 19.8, "time_in {}", c.time_in);
        assert!(c.time_out >= 40.0 && c.time_out < 40.2, "time_out {}", c.time_out);
        assert!((c.time_closest - 30.0).abs() < 1e-9);
        assert!(c.dist_closest < 1e-9);
    }

    #[test]
    fn test_above_box_no_conflict() {
        let cd = CdPolyIter::default();
        let found = cd.poly_iter_detection(
            0.0,
            100.0,
            &static_box(0.0, 200.0),
            Vect3::new(0.0, 0.0, 300.0),
            Velocity::new(50.0, 0.0, 0.0),
        );
        assert!(found.is_empty());
    }

    #[test]
    fn test_reversed_window_is_empty() {
        let cd = CdPolyIter::default();
        let mp = static_box(0.0, 1000.0);
        assert!(cd
            .poly_iter_detection(50.0, 10.0, &mp, Vect3::new(1500.0, 0.0, 10.0), Velocity::ZERO)
            .is_empty());
    }

    #[test]
    fn test_blip_shorter_than_step_is_dropped() {
        // Thin 10 m sliver crossed at 20 m/s: inside for half a second
        let sliver = MovingPolygon3D::new(
            MovingPolygon2D::translating(box_poly(-5.0, 5.0, -100.0, 100.0), Vect2::new(-20.0, 0.0), f64::MAX),
            0.0,
            0.0,
            1000.0,
        );
        let own = Vect3::new(-200.0, 0.0, 100.0);
        assert!(CdPolyIter::new(1.0)
            .poly_iter_detection(0.0, 30.0, &sliver, own, Velocity::ZERO)
            .is_empty());
        let fine = CdPolyIter::new(0.05).poly_iter_detection(0.0, 30.0, &sliver, own, Velocity::ZERO);
        assert_eq!(fine.len(), 1);
        assert!((fine[0].time_in - 9.75).abs() < 0.01);
    }

    #[test]
    fn test_static_point_static_box_covers_window() {
        let cd = CdPolyIter::default();
        let found = cd.poly_iter_detection(
            5.0,
            60.0,
            &static_box(0.0, 1000.0),
            Vect3::new(1500.0, 0.0, 100.0),
            Velocity::ZERO,
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].time_in, 5.0);
        assert_eq!(found[0].time_out, 60.0);
    }

    #[test]
    fn test_late_and_long_windows_are_searched() {
        let cd = CdPolyIter::default();
        let mp = static_box(0.0, 1000.0);
        let inside = Vect3::new(1500.0, 0.0, 100.0);

        let late = cd.poly_iter_detection(40_000.0, 41_000.0, &mp, inside, Velocity::ZERO);
        assert_eq!(late.len(), 1);
        assert_eq!((late[0].time_in, late[0].time_out), (40_000.0, 41_000.0));

        let long = cd.poly_iter_detection(0.0, 50_000.0, &mp, inside, Velocity::ZERO);
        assert_eq!(long[0].time_out, 50_000.0);

        // No usable end: search a fixed span past the start
        let open = cd.poly_iter_detection(100.0, f64::MAX, &mp, inside, Velocity::ZERO);
        assert_eq!(open[0].time_out, 100.0 + MAX_SEARCH_S);
        let negative = cd.poly_iter_detection(0.0, -1.0, &mp, inside, Velocity::ZERO);
        assert_eq!(negative[0].time_out, MAX_SEARCH_S);
    }

    #[test]
    fn test_short_piece_at_window_end_is_kept() {
        // Enters the box at 20 s; window closes half a second later
        let cd = CdPolyIter::default();
        let found = cd.poly_iter_detection(
            0.0,
            20.5,
            &static_box(0.0, 1000.0),
            Vect3::new(0.0, 0.0, 300.0),
            Velocity::new(50.0, 0.0, 0.0),
        );
        assert_eq!(found.len(), 1);
        assert!(found[0].time_in > 19.8 && found[0].time_in <= 20.0);
        assert_eq!(found[0].time_out, 20.5);
        assert_eq!(cd.min_duration(), cd.time_step());
    }

    #[test]
    fn test_parameters() {
        let mut cd = CdPolyIter::default();
        let mut p = ParameterData::new();
        p.set_internal("timeStep", 0.25, "s");
        cd.set_parameters(&p);
        assert_eq!(cd.time_step(), 0.25);
        p.set_internal("timeStep", -1.0, "s");
        cd.set_parameters(&p);
        assert_eq!(cd.time_step(), 0.25);
        assert!(cd.equals(&CdPolyIter::new(0.25)));
    }
}
