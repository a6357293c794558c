//! Time-varying polygon trajectories (weather cells, restricted volumes).
//!
//! A [`PolyPath`] is either a morphing sequence of timed polygons whose
//! vertices move linearly between steps, or a single polygon translated at a
//! user-supplied velocity forever.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::error_log::{ErrorLog, ErrorReporter};
use crate::moving_polygon::{MovingPolygon2D, MovingPolygon3D};
use crate::poly::{Poly2D, Poly3D};
use crate::position::Position;
use crate::projection::EuclideanProjection;
use crate::vect::{Vect2, Velocity};

/// Polygon with vertices in a single coordinate frame plus an altitude band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplePoly {
    pub vertices: Vec<Position>,
    pub bottom: f64,
    pub top: f64,
}

impl SimplePoly {
    pub fn new(vertices: Vec<Position>, bottom: f64, top: f64) -> Self {
        Self {
            vertices,
            bottom,
            top,
        }
    }

    pub fn size(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_lat_lon(&self) -> bool {
        self.vertices.first().is_some_and(|p| p.is_lat_lon())
    }

    /// Horizontal polygon in the projected frame. Euclidean vertices are
    /// used as-is.
    pub fn poly3d(&self, proj: &EuclideanProjection) -> Poly3D {
        let poly = Poly2D::new(
            self.vertices
                .iter()
                .map(|p| proj.project_position(p).vect2())
                .collect(),
        );
        Poly3D::new(poly, self.bottom, self.top)
    }

    /// Every vertex moved by `v` for `t` seconds; the band moves with `v.z`.
    pub fn linear(&self, v: Velocity, t: f64) -> SimplePoly {
        let horiz = Velocity::new(v.x, v.y, 0.0);
        SimplePoly {
            vertices: self.vertices.iter().map(|p| p.linear(horiz, t)).collect(),
            bottom: self.bottom + v.vs() * t,
            top: self.top + v.vs() * t,
        }
    }

    /// Vertex-wise interpolation toward `other` (same vertex count).
    pub fn interpolate(&self, other: &SimplePoly, f: f64) -> SimplePoly {
        SimplePoly {
            vertices: self
                .vertices
                .iter()
                .zip(&other.vertices)
                .map(|(a, b)| a.interpolate(b, f))
                .collect(),
            bottom: self.bottom + (other.bottom - self.bottom) * f,
            top: self.top + (other.top - self.top) * f,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathMode {
    /// Timed polygons, vertices interpolated between consecutive steps.
    Morphing,
    /// One polygon moving at a constant user velocity, with no end time.
    UserVel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolyPath {
    name: String,
    mode: PathMode,
    polys: Vec<SimplePoly>,
    times: Vec<f64>,
    #[serde(default)]
    velocity: Option<Velocity>,
    #[serde(skip)]
    error: ErrorLog,
}

impl PolyPath {
    /// Empty morphing path.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            error: ErrorLog::new(format!("PolyPath({name})")),
            name,
            mode: PathMode::Morphing,
            polys: Vec::new(),
            times: Vec::new(),
            velocity: None,
        }
    }

    /// Single polygon starting at `time` and moving with `v` indefinitely.
    pub fn from_state(name: impl Into<String>, poly: SimplePoly, v: Velocity, time: f64) -> Self {
        let mut path = Self::new(name);
        path.mode = PathMode::UserVel;
        path.polys.push(poly);
        path.times.push(time);
        path.velocity = Some(v);
        path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> PathMode {
        self.mode
    }

    /// Add a timed step to a morphing path.
    pub fn add_polygon(&mut self, poly: SimplePoly, time: f64) -> Result<usize, GeometryError> {
        if !time.is_finite() {
            return Err(GeometryError::InvalidTime(time));
        }
        if let Some(first) = self.polys.first() {
            if first.size() != poly.size() {
                return Err(GeometryError::VertexCountChanged {
                    expected: first.size(),
                    actual: poly.size(),
                });
            }
            if first.is_lat_lon() != poly.is_lat_lon() {
                return Err(GeometryError::MixedFrames(self.name.clone()));
            }
        }
        let idx = self.times.partition_point(|t| *t < time);
        if self.times.get(idx) == Some(&time) {
            self.polys[idx] = poly;
        } else {
            self.times.insert(idx, time);
            self.polys.insert(idx, poly);
        }
        Ok(idx)
    }

    pub fn size(&self) -> usize {
        self.polys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polys.is_empty()
    }

    /// Time of step `i`. Out-of-range indices log an error and give 0.
    pub fn get_time(&self, i: usize) -> f64 {
        match self.times.get(i) {
            Some(t) => *t,
            None => {
                self.error.add_error(format!(
                    "get_time: index {i} out of range for path of size {}",
                    self.times.len()
                ));
                0.0
            }
        }
    }

    pub fn first_time(&self) -> f64 {
        self.times.first().copied().unwrap_or(0.0)
    }

    /// Time of the last step, or `f64::MAX` for a path that continues past it.
    pub fn last_time(&self) -> f64 {
        if self.is_continuing() {
            f64::MAX
        } else {
            self.times.last().copied().unwrap_or(0.0)
        }
    }

    /// The last step extends without end.
    pub fn is_continuing(&self) -> bool {
        self.polys.len() == 1 || self.mode == PathMode::UserVel
    }

    pub fn is_lat_lon(&self) -> bool {
        self.polys.first().is_some_and(|p| p.is_lat_lon())
    }

    /// Index of the step whose interval contains `t`.
    pub fn get_segment(&self, t: f64) -> Option<usize> {
        let first = *self.times.first()?;
        let last = *self.times.last()?;
        if t < first {
            return None;
        }
        if t >= last {
            if self.is_continuing() || t == last {
                return Some(self.times.len() - 1);
            }
            return None;
        }
        let k = self.times.partition_point(|x| *x < t);
        if self.times.get(k) == Some(&t) {
            Some(k)
        } else {
            Some(k - 1)
        }
    }

    /// Step index used for `t`, clamping to the ends of the path.
    fn step_for(&self, t: f64) -> usize {
        match self.get_segment(t) {
            Some(i) => i,
            None if t < self.first_time() => 0,
            None => self.size().saturating_sub(1),
        }
    }

    /// Polygon at time `t`.
    pub fn position(&self, t: f64) -> Option<SimplePoly> {
        let i = self.step_for(t);
        let base = self.polys.get(i)?;
        if self.mode == PathMode::UserVel {
            let v = self.velocity.unwrap_or(Velocity::ZERO);
            return Some(base.linear(v, t - self.times[i]));
        }
        match self.polys.get(i + 1) {
            Some(next) if t > self.times[i] => {
                let f = ((t - self.times[i]) / (self.times[i + 1] - self.times[i])).min(1.0);
                Some(base.interpolate(next, f))
            }
            _ => Some(base.clone()),
        }
    }

    /// Moving polygon starting at time `t`, in the frame of `proj`.
    ///
    /// Geodetic paths need a projection; if none is given one is anchored at
    /// the first vertex. The horizon `tend` runs to the next step (or is
    /// unbounded on a continuing last step).
    pub fn get_moving_polygon(&self, t: f64, proj: Option<&EuclideanProjection>) -> Option<MovingPolygon3D> {
        let start = self.position(t)?;
        let fallback;
        let proj = match proj {
            Some(p) => p,
            None => {
                let origin = start
                    .vertices
                    .first()
                    .and_then(|p| p.as_lat_lon())
                    .map(|p| p.zero_alt())
                    .unwrap_or(crate::position::LatLonAlt::new(0.0, 0.0, 0.0));
                fallback = EuclideanProjection::new(origin);
                &fallback
            }
        };
        let start3 = start.poly3d(proj);

        let i = self.step_for(t);
        if self.mode == PathMode::UserVel {
            let v = self.velocity.unwrap_or(Velocity::ZERO);
            let polyvel = start
                .vertices
                .iter()
                .map(|p| match p.as_lat_lon() {
                    Some(lla) => proj.project_velocity(lla, v).vect2(),
                    None => v.vect2(),
                })
                .collect();
            let horiz = MovingPolygon2D::new(start3.poly, polyvel, f64::MAX).ok()?;
            return Some(MovingPolygon3D::new(horiz, v.vs(), start3.bottom, start3.top));
        }

        match (self.polys.get(i + 1), self.times.get(i + 1)) {
            (Some(next), Some(t_next)) if *t_next > t => {
                let dt = t_next - t;
                let end3 = next.poly3d(proj);
                let polyvel: Vec<Vect2> = start3
                    .poly
                    .vertices()
                    .iter()
                    .zip(end3.poly.vertices())
                    .map(|(a, b)| (*b - *a).scal(1.0 / dt))
                    .collect();
                let vspeed = (end3.bottom - start3.bottom) / dt;
                let horiz = MovingPolygon2D::new(start3.poly, polyvel, dt).ok()?;
                Some(MovingPolygon3D::new(horiz, vspeed, start3.bottom, start3.top))
            }
            _ => {
                let horiz = MovingPolygon2D::translating(start3.poly, Vect2::ZERO, f64::MAX);
                Some(MovingPolygon3D::new(horiz, 0.0, start3.bottom, start3.top))
            }
        }
    }

    /// Whether `p` is inside the path's volume at time `t`.
    pub fn contains(&self, p: &Position, t: f64) -> bool {
        if t < self.first_time() || t > self.last_time() {
            return false;
        }
        let proj = p
            .as_lat_lon()
            .map(|lla| EuclideanProjection::new(lla.zero_alt()));
        match self.get_moving_polygon(t, proj.as_ref()) {
            Some(mp) => {
                let here = match &proj {
                    Some(pr) => pr.project_position(p),
                    None => p.as_vect3().unwrap_or_default(),
                };
                mp.position(0.0).contains(here)
            }
            None => false,
        }
    }

    /// Check structural consistency, logging every problem found.
    pub fn validate(&self) -> bool {
        let mut ok = true;
        if self.polys.is_empty() {
            self.error.add_error("path has no polygons");
            return false;
        }
        if self.polys.len() != self.times.len() {
            self.error.add_error("polygon and time counts differ");
            ok = false;
        }
        let n = self.polys[0].size();
        for (i, p) in self.polys.iter().enumerate() {
            if p.size() < 3 {
                self.error.add_error(format!("step {i} has fewer than 3 vertices"));
                ok = false;
            }
            if p.size() != n {
                self.error
                    .add_error(format!("step {i} has {} vertices, expected {n}", p.size()));
                ok = false;
            }
            if p.bottom > p.top {
                self.error.add_error(format!("step {i} has bottom above top"));
                ok = false;
            }
            if p.vertices.iter().any(|v| v.is_lat_lon() != self.is_lat_lon()) {
                self.error.add_error(format!("step {i} mixes coordinate frames"));
                ok = false;
            }
        }
        let has_velocity = matches!(self.velocity, Some(v) if !v.is_invalid());
        if self.mode == PathMode::UserVel && !has_velocity {
            self.error.add_error("user velocity path without a valid velocity");
            ok = false;
        }
        ok
    }
}

impl ErrorReporter for PolyPath {
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
