//! Positions in either a local Euclidean frame or on the earth's surface.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geodesy;
use crate::vect::{Vect3, Velocity};

/// Geodetic position: latitude and longitude in degrees, altitude in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLonAlt {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

impl LatLonAlt {
    pub const fn new(lat: f64, lon: f64, alt: f64) -> Self {
        Self { lat, lon, alt }
    }

    pub fn zero_alt(self) -> Self {
        Self { alt: 0.0, ..self }
    }

    pub fn distance_h(self, other: LatLonAlt) -> f64 {
        geodesy::haversine_distance(self.lat, self.lon, other.lat, other.lon)
    }

    pub fn bearing_to(self, other: LatLonAlt) -> f64 {
        geodesy::bearing(self.lat, self.lon, other.lat, other.lon)
    }

    /// Position after `t` seconds flying the great circle that leaves this
    /// point with velocity `v` (track and ground speed taken at departure).
    pub fn linear_initial(self, v: Velocity, t: f64) -> LatLonAlt {
        let (lat, lon) = geodesy::offset_by_bearing(self.lat, self.lon, v.gs() * t, v.trk());
        LatLonAlt::new(lat, lon, self.alt + v.vs() * t)
    }

    /// Great-circle interpolation with linear altitude.
    pub fn interpolate(self, other: LatLonAlt, f: f64) -> LatLonAlt {
        let (lat, lon) = geodesy::interpolate(self.lat, self.lon, other.lat, other.lon, f);
        LatLonAlt::new(lat, lon, self.alt + (other.alt - self.alt) * f)
    }

    /// Constant great-circle velocity that reaches `other` after `dt` seconds.
    pub fn velocity_to(self, other: LatLonAlt, dt: f64) -> Velocity {
        let gs = self.distance_h(other) / dt;
        let trk = if gs == 0.0 { 0.0 } else { self.bearing_to(other) };
        Velocity::from_trk_gs_vs(trk, gs, (other.alt - self.alt) / dt)
    }
}

impl fmt::Display for LatLonAlt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6}, {:.1} m)", self.lat, self.lon, self.alt)
    }
}

/// Either a Euclidean point or a geodetic point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Position {
    LatLon(LatLonAlt),
    Xyz(Vect3),
}

impl Position {
    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Position::Xyz(Vect3::new(x, y, z))
    }

    pub fn lat_lon(lat: f64, lon: f64, alt: f64) -> Self {
        Position::LatLon(LatLonAlt::new(lat, lon, alt))
    }

    pub fn is_lat_lon(&self) -> bool {
        matches!(self, Position::LatLon(_))
    }

    pub fn alt(&self) -> f64 {
        match self {
            Position::LatLon(p) => p.alt,
            Position::Xyz(p) => p.z,
        }
    }

    pub fn as_vect3(&self) -> Option<Vect3> {
        match self {
            Position::Xyz(p) => Some(*p),
            Position::LatLon(_) => None,
        }
    }

    pub fn as_lat_lon(&self) -> Option<LatLonAlt> {
        match self {
            Position::LatLon(p) => Some(*p),
            Position::Xyz(_) => None,
        }
    }

    pub fn zero_alt(&self) -> Position {
        match self {
            Position::LatLon(p) => Position::LatLon(p.zero_alt()),
            Position::Xyz(p) => Position::Xyz(p.with_z(0.0)),
        }
    }

    /// Position after `t` seconds at velocity `v`.
    pub fn linear(&self, v: Velocity, t: f64) -> Position {
        match self {
            Position::LatLon(p) => Position::LatLon(p.linear_initial(v, t)),
            Position::Xyz(p) => Position::Xyz(p.linear(v.vect3(), t)),
        }
    }

    /// Interpolate toward `other`. Positions in different frames do not
    /// interpolate; `self` is returned unchanged.
    pub fn interpolate(&self, other: &Position, f: f64) -> Position {
        match (self, other) {
            (Position::LatLon(a), Position::LatLon(b)) => Position::LatLon(a.interpolate(*b, f)),
            (Position::Xyz(a), Position::Xyz(b)) => Position::Xyz(a.add_scal(f, *b - *a)),
            _ => *self,
        }
    }

    /// Horizontal distance, NaN for mixed frames.
    pub fn distance_h(&self, other: &Position) -> f64 {
        match (self, other) {
            (Position::LatLon(a), Position::LatLon(b)) => a.distance_h(*b),
            (Position::Xyz(a), Position::Xyz(b)) => (a.vect2() - b.vect2()).norm(),
            _ => f64::NAN,
        }
    }

    /// Constant velocity that moves this position onto `other` in `dt`
    /// seconds. Invalid for mixed frames or a non-positive `dt`.
    pub fn velocity_to(&self, other: &Position, dt: f64) -> Velocity {
        if dt <= 0.0 {
            return Velocity::INVALID;
        }
        match (self, other) {
            (Position::LatLon(a), Position::LatLon(b)) => a.velocity_to(*b, dt),
            (Position::Xyz(a), Position::Xyz(b)) => Velocity::from((*b - *a).scal(1.0 / dt)),
            _ => Velocity::INVALID,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::LatLon(p) => p.fmt(f),
            Position::Xyz(p) => p.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_initial_matches_velocity_to() {
        let a = LatLonAlt::new(35.0, -100.0, 1000.0);
        let b = LatLonAlt::new(35.5, -99.0, 3000.0);
        let v = a.velocity_to(b, 600.0);
        let reached = a.linear_initial(v, 600.0);
        assert!(reached.distance_h(b) < 1e-3);
        assert!((reached.alt - 3000.0).abs() < 1e-9);
    }

    #[test]
    fn test_untagged_position_serde() {
        let p: Position = serde_json::from_str(r#"{"lat": 1.0, "lon": 2.0, "alt": 3.0}"#).unwrap();
        assert!(p.is_lat_lon());
        let q: Position = serde_json::from_str(r#"{"x": 1.0, "y": 2.0, "z": 3.0}"#).unwrap();
        assert_eq!(q, Position::xyz(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_mixed_frames() {
        let a = Position::xyz(0.0, 0.0, 0.0);
        let b = Position::lat_lon(0.0, 0.0, 0.0);
        assert!(a.distance_h(&b).is_nan());
        assert!(a.velocity_to(&b, 1.0).is_invalid());
        assert_eq!(a.interpolate(&b, 0.5), a);
    }

    #[test]
    fn test_xyz_velocity_to() {
        let a = Position::xyz(0.0, 0.0, 0.0);
        let b = Position::xyz(100.0, -50.0, 10.0);
        let v = a.velocity_to(&b, 10.0);
        assert_eq!(v, Velocity::new(10.0, -5.0, 1.0));
        assert_eq!(a.linear(v, 10.0), b);
    }
}
