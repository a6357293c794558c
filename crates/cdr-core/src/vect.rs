//! Euclidean vectors and velocities.
//!
//! All types are small `Copy` values. Axes follow the east/north/up
//! convention: `x` east, `y` north, `z` up, in metres (or metres per second).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use crate::util::{almost_equals, sq};

/// Horizontal vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vect2 {
    pub x: f64,
    pub y: f64,
}

impl Vect2 {
    pub const ZERO: Vect2 = Vect2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Vect2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Determinant (z component of the cross product).
    pub fn det(self, other: Vect2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Squared norm.
    pub fn sqv(self) -> f64 {
        self.dot(self)
    }

    pub fn norm(self) -> f64 {
        self.sqv().sqrt()
    }

    pub fn scal(self, k: f64) -> Vect2 {
        Vect2::new(self.x * k, self.y * k)
    }

    /// `self + k * v`
    pub fn add_scal(self, k: f64, v: Vect2) -> Vect2 {
        Vect2::new(self.x + k * v.x, self.y + k * v.y)
    }

    /// Position after moving with velocity `v` for `t` seconds.
    pub fn linear(self, v: Vect2, t: f64) -> Vect2 {
        self.add_scal(t, v)
    }

    pub fn distance(self, other: Vect2) -> f64 {
        (self - other).norm()
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    pub fn almost_equals(self, other: Vect2) -> bool {
        almost_equals(self.x, other.x) && almost_equals(self.y, other.y)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vect2 {
    type Output = Vect2;
    fn add(self, rhs: Vect2) -> Vect2 {
        Vect2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vect2 {
    type Output = Vect2;
    fn sub(self, rhs: Vect2) -> Vect2 {
        Vect2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vect2 {
    type Output = Vect2;
    fn neg(self) -> Vect2 {
        Vect2::new(-self.x, -self.y)
    }
}

impl Mul<f64> for Vect2 {
    type Output = Vect2;
    fn mul(self, k: f64) -> Vect2 {
        self.scal(k)
    }
}

impl fmt::Display for Vect2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.x, self.y)
    }
}

/// Three dimensional vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vect3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vect3 {
    pub const ZERO: Vect3 = Vect3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Horizontal component.
    pub fn vect2(self) -> Vect2 {
        Vect2::new(self.x, self.y)
    }

    pub fn dot(self, other: Vect3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn sqv(self) -> f64 {
        self.dot(self)
    }

    pub fn norm(self) -> f64 {
        self.sqv().sqrt()
    }

    pub fn scal(self, k: f64) -> Vect3 {
        Vect3::new(self.x * k, self.y * k, self.z * k)
    }

    /// `self + k * v`
    pub fn add_scal(self, k: f64, v: Vect3) -> Vect3 {
        Vect3::new(self.x + k * v.x, self.y + k * v.y, self.z + k * v.z)
    }

    pub fn linear(self, v: Vect3, t: f64) -> Vect3 {
        self.add_scal(t, v)
    }

    /// Cylindrical norm against a `d` by `h` cylinder.
    ///
    /// Values below 1 are inside the cylinder, 1 is on its boundary.
    pub fn cyl_norm(self, d: f64, h: f64) -> f64 {
        let horiz = self.vect2().sqv() / sq(d);
        let vert = sq(self.z / h);
        horiz.max(vert).sqrt()
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    pub fn almost_equals(self, other: Vect3) -> bool {
        self.vect2().almost_equals(other.vect2()) && almost_equals(self.z, other.z)
    }

    /// Same horizontal components with `z` replaced.
    pub fn with_z(self, z: f64) -> Vect3 {
        Vect3::new(self.x, self.y, z)
    }
}

impl Add for Vect3 {
    type Output = Vect3;
    fn add(self, rhs: Vect3) -> Vect3 {
        Vect3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vect3 {
    type Output = Vect3;
    fn sub(self, rhs: Vect3) -> Vect3 {
        Vect3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vect3 {
    type Output = Vect3;
    fn neg(self) -> Vect3 {
        Vect3::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f64> for Vect3 {
    type Output = Vect3;
    fn mul(self, k: f64) -> Vect3 {
        self.scal(k)
    }
}

impl fmt::Display for Vect3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4}, {:.4})", self.x, self.y, self.z)
    }
}

/// Velocity in east/north/up components (m/s).
///
/// [`Velocity::INVALID`] marks "no data"; it is never zero and never
/// almost-equal to anything.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Velocity {
    pub const ZERO: Velocity = Velocity { x: 0.0, y: 0.0, z: 0.0 };
    pub const INVALID: Velocity = Velocity {
        x: f64::NAN,
        y: f64::NAN,
        z: f64::NAN,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Build from track (radians clockwise from north), ground speed and
    /// vertical speed.
    pub fn from_trk_gs_vs(trk: f64, gs: f64, vs: f64) -> Self {
        Self::new(gs * trk.sin(), gs * trk.cos(), vs)
    }

    /// Track angle in radians, clockwise from true north.
    pub fn trk(self) -> f64 {
        self.x.atan2(self.y)
    }

    /// Ground speed.
    pub fn gs(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Vertical speed.
    pub fn vs(self) -> f64 {
        self.z
    }

    pub fn is_invalid(self) -> bool {
        self.x.is_nan() || self.y.is_nan() || self.z.is_nan()
    }

    pub fn is_zero(self) -> bool {
        !self.is_invalid() && self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    pub fn vect2(self) -> Vect2 {
        Vect2::new(self.x, self.y)
    }

    pub fn vect3(self) -> Vect3 {
        Vect3::new(self.x, self.y, self.z)
    }

    pub fn almost_equals(self, other: Velocity) -> bool {
        self.vect3().almost_equals(other.vect3())
    }
}

impl From<Vect3> for Velocity {
    fn from(v: Vect3) -> Self {
        Velocity::new(v.x, v.y, v.z)
    }
}

impl Sub for Velocity {
    type Output = Vect3;
    fn sub(self, rhs: Velocity) -> Vect3 {
        self.vect3() - rhs.vect3()
    }
}

impl fmt::Display for Velocity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[trk {:.2} deg, gs {:.2} m/s, vs {:.2} m/s]",
            self.trk().to_degrees(),
            self.gs(),
            self.vs()
        )
    }
}
