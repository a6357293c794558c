//! Static polygons in the horizontal plane, with optional altitude band.

use serde::{Deserialize, Serialize};

use crate::util::almost_equals;
use crate::vect::{Vect2, Vect3};

/// Simple polygon given by its vertices in order. The closing edge from the
/// last vertex back to the first is implicit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Poly2D {
    vertices: Vec<Vect2>,
}

impl Poly2D {
    pub fn new(vertices: Vec<Vect2>) -> Self {
        Self { vertices }
    }

    pub fn size(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertex(&self, i: usize) -> Option<Vect2> {
        self.vertices.get(i).copied()
    }

    pub fn vertices(&self) -> &[Vect2] {
        &self.vertices
    }

    pub fn add_vertex(&mut self, v: Vect2) {
        self.vertices.push(v);
    }

    /// Point-in-polygon test by ray casting.
    ///
    /// Polygons with fewer than three vertices contain nothing.
    pub fn contains(&self, p: Vect2) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let vi = self.vertices[i];
            let vj = self.vertices[j];
            if ((vi.y > p.y) != (vj.y > p.y))
                && (p.x < (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x)
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// Signed area, positive for counter-clockwise vertex order.
    pub fn signed_area(&self) -> f64 {
        let n = self.vertices.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            sum += a.det(b);
        }
        sum / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Arithmetic mean of the vertices.
    pub fn average_point(&self) -> Vect2 {
        if self.vertices.is_empty() {
            return Vect2::ZERO;
        }
        let sum = self.vertices.iter().fold(Vect2::ZERO, |acc, v| acc + *v);
        sum.scal(1.0 / self.vertices.len() as f64)
    }

    /// Area-weighted centroid, falling back to the average point when the
    /// polygon has no area.
    pub fn centroid(&self) -> Vect2 {
        let n = self.vertices.len();
        let area = self.signed_area();
        if n < 3 || almost_equals(area, 0.0) {
            return self.average_point();
        }
        // Shift to the first vertex to limit cancellation on large coordinates.
        let origin = self.vertices[0];
        let mut cx = 0.0;
        let mut cy = 0.0;
        for i in 0..n {
            let a = self.vertices[i] - origin;
            let b = self.vertices[(i + 1) % n] - origin;
            let cross = a.det(b);
            cx += (a.x + b.x) * cross;
            cy += (a.y + b.y) * cross;
        }
        origin + Vect2::new(cx, cy).scal(1.0 / (6.0 * area))
    }

    /// Largest distance from the average point to any vertex.
    pub fn bounding_radius(&self) -> f64 {
        let center = self.average_point();
        self.vertices
            .iter()
            .map(|v| v.distance(center))
            .fold(0.0, f64::max)
    }

    /// Interior angle at vertex `i` in radians. NaN when one of the adjacent
    /// sides has zero length or the index is out of range.
    pub fn vertex_angle(&self, i: usize) -> f64 {
        let n = self.vertices.len();
        if i >= n || n < 3 {
            return f64::NAN;
        }
        let here = self.vertices[i];
        let prev = self.vertices[(i + n - 1) % n] - here;
        let next = self.vertices[(i + 1) % n] - here;
        let denom = prev.norm() * next.norm();
        if denom == 0.0 {
            return f64::NAN;
        }
        (prev.dot(next) / denom).clamp(-1.0, 1.0).acos()
    }

    /// Unit normal of the edge from vertex `i` to vertex `i + 1`, pointing to
    /// the right of the edge direction. NaN components for a zero-length edge.
    pub fn edge_normal(&self, i: usize) -> Vect2 {
        let n = self.vertices.len();
        if i >= n || n < 2 {
            return Vect2::new(f64::NAN, f64::NAN);
        }
        let edge = self.vertices[(i + 1) % n] - self.vertices[i];
        let len = edge.norm();
        if len == 0.0 {
            return Vect2::new(f64::NAN, f64::NAN);
        }
        Vect2::new(edge.y / len, -edge.x / len)
    }

    /// Polygon translated by `v * t`.
    pub fn linear(&self, v: Vect2, t: f64) -> Poly2D {
        Poly2D::new(self.vertices.iter().map(|p| p.linear(v, t)).collect())
    }
}

/// Polygon with an altitude band `[bottom, top]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Poly3D {
    pub poly: Poly2D,
    pub bottom: f64,
    pub top: f64,
}

impl Poly3D {
    pub fn new(poly: Poly2D, bottom: f64, top: f64) -> Self {
        Self { poly, bottom, top }
    }

    pub fn size(&self) -> usize {
        self.poly.size()
    }

    pub fn contains(&self, p: Vect3) -> bool {
        if p.z < self.bottom || p.z > self.top {
            return false;
        }
        self.poly.contains(p.vect2())
    }

    /// Centroid at mid altitude.
    pub fn centroid(&self) -> Vect3 {
        let c = self.poly.centroid();
        Vect3::new(c.x, c.y, (self.bottom + self.top) / 2.0)
    }
}
