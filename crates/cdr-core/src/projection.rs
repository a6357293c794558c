//! Local tangent-plane projection used to run the Euclidean kernels on
//! geodetic inputs.
//!
//! The projection is azimuthal equidistant about its origin: distances and
//! bearings from the origin are preserved exactly, so geometry close to the
//! origin is faithful and errors grow slowly with range.

use crate::position::{LatLonAlt, Position};
use crate::vect::{Vect3, Velocity};

/// Time offset used to carry velocities through the projection.
const VELOCITY_PROBE_S: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EuclideanProjection {
    origin: LatLonAlt,
}

impl EuclideanProjection {
    pub fn new(origin: LatLonAlt) -> Self {
        Self { origin }
    }

    pub fn origin(&self) -> LatLonAlt {
        self.origin
    }

    /// East/north offset from the origin in metres; `z` is the altitude
    /// above the origin's altitude.
    pub fn project(&self, p: LatLonAlt) -> Vect3 {
        let d = self.origin.distance_h(p);
        let z = p.alt - self.origin.alt;
        if d == 0.0 {
            return Vect3::new(0.0, 0.0, z);
        }
        let brg = self.origin.bearing_to(p);
        Vect3::new(d * brg.sin(), d * brg.cos(), z)
    }

    /// Euclidean positions pass through untouched.
    pub fn project_position(&self, p: &Position) -> Vect3 {
        match p {
            Position::LatLon(lla) => self.project(*lla),
            Position::Xyz(v) => *v,
        }
    }

    pub fn inverse(&self, p: Vect3) -> LatLonAlt {
        let d = p.vect2().norm();
        let alt = p.z + self.origin.alt;
        if d == 0.0 {
            return LatLonAlt::new(self.origin.lat, self.origin.lon, alt);
        }
        let brg = p.x.atan2(p.y);
        let (lat, lon) =
            crate::geodesy::offset_by_bearing(self.origin.lat, self.origin.lon, d, brg);
        LatLonAlt::new(lat, lon, alt)
    }

    /// Velocity at geodetic point `p` expressed in the projected frame.
    pub fn project_velocity(&self, p: LatLonAlt, v: Velocity) -> Velocity {
        if v.is_invalid() {
            return Velocity::INVALID;
        }
        let start = self.project(p);
        let end = self.project(p.linear_initial(v, VELOCITY_PROBE_S));
        let horiz = (end - start).scal(1.0 / VELOCITY_PROBE_S);
        Velocity::new(horiz.x, horiz.y, v.vs())
    }

    /// Velocity at projected point `p` expressed as geodetic track/speed.
    pub fn inverse_velocity(&self, p: Vect3, v: Velocity) -> Velocity {
        if v.is_invalid() {
            return Velocity::INVALID;
        }
        let start = self.inverse(p);
        let end = self.inverse(p.linear(v.vect3(), VELOCITY_PROBE_S));
        let gs = start.distance_h(end) / VELOCITY_PROBE_S;
        let trk = if gs == 0.0 { 0.0 } else { start.bearing_to(end) };
        Velocity::from_trk_gs_vs(trk, gs, v.vs())
    }
}
