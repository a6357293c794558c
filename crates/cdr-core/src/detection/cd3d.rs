//! Closed-form loss-of-separation geometry for a cylindrical protected zone.
//!
//! `s` is the relative position (ownship minus intruder) and `v` the relative
//! velocity. The zone is a cylinder of radius `d` and half-height `h`.

use crate::util::{almost_equals, root2b, sign, sq};
use crate::vect::{Vect2, Vect3, Velocity};

use super::LossData;

/// Time at which the horizontal distance equals `d`; `eps = -1` entry,
/// `eps = 1` exit. NaN if the circle is never reached.
pub fn theta_d(s: Vect2, v: Vect2, eps: i32, d: f64) -> f64 {
    root2b(v.sqv(), s.dot(v), s.sqv() - sq(d), eps)
}

/// Positive when the relative trajectory actually enters the circle.
pub fn delta(s: Vect2, v: Vect2, d: f64) -> f64 {
    sq(d) * v.sqv() - sq(s.det(v))
}

/// Time at which the vertical distance equals `h` (`eps = -1` entry,
/// `eps = 1` exit). Requires `vz != 0`.
pub fn theta_h(sz: f64, vz: f64, eps: i32, h: f64) -> f64 {
    (f64::from(eps) * sign(vz) * h - sz) / vz
}

pub fn horizontal_los(s: Vect2, d: f64) -> bool {
    let dist2 = s.sqv();
    dist2 < sq(d) && !almost_equals(dist2, sq(d))
}

pub fn vertical_los(sz: f64, h: f64) -> bool {
    sz.abs() < h && !almost_equals(sz.abs(), h)
}

/// Unbounded times during which the horizontal distance is below `d`.
pub fn horizontal_window(s: Vect2, v: Vect2, d: f64) -> Option<(f64, f64)> {
    if almost_equals(v.sqv(), 0.0) {
        return horizontal_los(s, d).then_some((f64::NEG_INFINITY, f64::INFINITY));
    }
    if delta(s, v, d) > 0.0 {
        Some((theta_d(s, v, -1, d), theta_d(s, v, 1, d)))
    } else {
        None
    }
}

/// Unbounded times during which the vertical distance is below `h`.
pub fn vertical_window(sz: f64, vz: f64, h: f64) -> Option<(f64, f64)> {
    if almost_equals(vz, 0.0) {
        return vertical_los(sz, h).then_some((f64::NEG_INFINITY, f64::INFINITY));
    }
    Some((theta_h(sz, vz, -1, h), theta_h(sz, vz, 1, h)))
}

/// Loss interval clipped to `[b, t]`.
pub fn detection(s: Vect3, vo: Velocity, vi: Velocity, d: f64, h: f64, b: f64, t: f64) -> LossData {
    let v = vo - vi;
    match (
        horizontal_window(s.vect2(), v.vect2(), d),
        vertical_window(s.z, v.z, h),
    ) {
        (Some((h_in, h_out)), Some((v_in, v_out))) => {
            LossData::new(h_in.max(v_in).max(b), h_out.min(v_out).min(t))
        }
        _ => LossData::EMPTY,
    }
}

/// Time of closest approach in the `d`/`h` weighted norm, clamped to `[b, t]`.
///
/// Vertical offsets are scaled by `d / h` so a metre of altitude counts as
/// much as `d / h` metres of horizontal distance.
pub fn tccpa(s: Vect3, vo: Velocity, vi: Velocity, d: f64, h: f64, b: f64, t: f64) -> f64 {
    let v = vo - vi;
    let k = if h > 0.0 { d / h } else { 1.0 };
    let ws = s.with_z(s.z * k);
    let wv = v.with_z(v.z * k);
    let tau = if almost_equals(wv.sqv(), 0.0) {
        b
    } else {
        -ws.dot(wv) / wv.sqv()
    };
    b.max(t.min(tau))
}

#[cfg(test)]
mod tests {
    use super::*;

    const D: f64 = 1000.0;
    const H: f64 = 100.0;

    #[test]
    fn test_head_on_entry_exit() {
        // 10 km apart, closing at 100 m/s
        let s = Vect3::new(-10_000.0, 0.0, 0.0);
        let vo = Velocity::new(50.0, 0.0, 0.0);
        let vi = Velocity::new(-50.0, 0.0, 0.0);
        let ld = detection(s, vo, vi, D, H, 0.0, 300.0);
        assert!(ld.conflict());
        assert!((ld.time_in - 90.0).abs() < 1e-9);
        assert!((ld.time_out - 110.0).abs() < 1e-9);
        assert!((tccpa(s, vo, vi, D, H, 0.0, 300.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_clips() {
        let s = Vect3::new(-10_000.0, 0.0, 0.0);
        let vo = Velocity::new(100.0, 0.0, 0.0);
        let ld = detection(s, vo, Velocity::ZERO, D, H, 0.0, 95.0);
        assert!((ld.time_out - 95.0).abs() < 1e-12);
        assert!(!detection(s, vo, Velocity::ZERO, D, H, 0.0, 80.0).conflict());
    }

    #[test]
    fn test_vertical_separation_prevents_conflict() {
        let s = Vect3::new(-10_000.0, 0.0, 500.0);
        let vo = Velocity::new(100.0, 0.0, 0.0);
        assert!(!detection(s, vo, Velocity::ZERO, D, H, 0.0, 300.0).conflict());
    }

    #[test]
    fn test_level_off_descent_into_zone() {
        // Horizontally co-located, descending 5 m/s from 300 m above
        let s = Vect3::new(0.0, 0.0, 300.0);
        let vo = Velocity::new(10.0, 0.0, -5.0);
        let vi = Velocity::new(10.0, 0.0, 0.0);
        let ld = detection(s, vo, vi, D, H, 0.0, 1000.0);
        assert!((ld.time_in - 40.0).abs() < 1e-9);
        assert!((ld.time_out - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_parallel_outside_never_conflicts() {
        let s = Vect3::new(0.0, 5000.0, 0.0);
        let v = Velocity::new(100.0, 0.0, 0.0);
        assert!(!detection(s, v, v, D, H, 0.0, 1e6).conflict());
    }

    #[test]
    fn test_tangent_path_is_not_a_conflict() {
        let s = Vect3::new(-10_000.0, D, 0.0);
        let vo = Velocity::new(100.0, 0.0, 0.0);
        assert!(!detection(s, vo, Velocity::ZERO, D, H, 0.0, 1000.0).conflict());
    }

    #[test]
    fn test_tccpa_weights_vertical() {
        // Stationary relative position, tca is the window start
        let s = Vect3::new(500.0, 0.0, 0.0);
        assert_eq!(tccpa(s, Velocity::ZERO, Velocity::ZERO, D, H, 3.0, 10.0), 3.0);
    }
}
