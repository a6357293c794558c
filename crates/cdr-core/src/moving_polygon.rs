//! Polygons whose vertices move with individual constant velocities.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::poly::{Poly2D, Poly3D};
use crate::vect::Vect2;

/// Horizontal polygon with one velocity per vertex, valid up to `tend`
/// seconds after its start.
///
/// Deserialization goes through [`MovingPolygon2D::new`], so a document with
/// a velocity count that differs from the vertex count is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MovingPolygon2DDoc")]
pub struct MovingPolygon2D {
    polystart: Poly2D,
    polyvel: Vec<Vect2>,
    tend: f64,
}

#[derive(Deserialize)]
struct MovingPolygon2DDoc {
    polystart: Poly2D,
    polyvel: Vec<Vect2>,
    tend: f64,
}

impl TryFrom<MovingPolygon2DDoc> for MovingPolygon2D {
    type Error = GeometryError;

    fn try_from(doc: MovingPolygon2DDoc) -> Result<Self, Self::Error> {
        Self::new(doc.polystart, doc.polyvel, doc.tend)
    }
}

impl MovingPolygon2D {
    pub fn new(polystart: Poly2D, polyvel: Vec<Vect2>, tend: f64) -> Result<Self, GeometryError> {
        if polystart.size() != polyvel.len() {
            return Err(GeometryError::VertexVelocityMismatch {
                vertices: polystart.size(),
                velocities: polyvel.len(),
            });
        }
        Ok(Self {
            polystart,
            polyvel,
            tend,
        })
    }

    /// Every vertex moves with the same velocity.
    pub fn translating(polystart: Poly2D, v: Vect2, tend: f64) -> Self {
        let polyvel = vec![v; polystart.size()];
        Self {
            polystart,
            polyvel,
            tend,
        }
    }

    pub fn size(&self) -> usize {
        self.polystart.size()
    }

    pub fn polystart(&self) -> &Poly2D {
        &self.polystart
    }

    pub fn polyvel(&self) -> &[Vect2] {
        &self.polyvel
    }

    pub fn tend(&self) -> f64 {
        self.tend
    }

    /// Polygon at `t` seconds after the start.
    pub fn position(&self, t: f64) -> Poly2D {
        Poly2D::new(
            self.polystart
                .vertices()
                .iter()
                .zip(&self.polyvel)
                .map(|(p, v)| p.linear(*v, t))
                .collect(),
        )
    }

    /// Velocity of the average point.
    pub fn average_velocity(&self) -> Vect2 {
        if self.polyvel.is_empty() {
            return Vect2::ZERO;
        }
        let sum = self.polyvel.iter().fold(Vect2::ZERO, |acc, v| acc + *v);
        sum.scal(1.0 / self.polyvel.len() as f64)
    }

    pub fn is_static(&self) -> bool {
        self.polyvel.iter().all(|v| v.is_zero())
    }

    /// Same motion restarted `t` seconds later, with the horizon shortened
    /// accordingly.
    pub fn advanced(&self, t: f64) -> MovingPolygon2D {
        Self {
            polystart: self.position(t),
            polyvel: self.polyvel.clone(),
            tend: self.tend - t,
        }
    }
}

/// Moving horizontal polygon plus a vertically moving altitude band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingPolygon3D {
    pub horizpoly: MovingPolygon2D,
    pub vspeed: f64,
    pub minalt: f64,
    pub maxalt: f64,
}

impl MovingPolygon3D {
    pub fn new(horizpoly: MovingPolygon2D, vspeed: f64, minalt: f64, maxalt: f64) -> Self {
        Self {
            horizpoly,
            vspeed,
            minalt,
            maxalt,
        }
    }

    pub fn size(&self) -> usize {
        self.horizpoly.size()
    }

    pub fn tend(&self) -> f64 {
        self.horizpoly.tend()
    }

    pub fn position(&self, t: f64) -> Poly3D {
        Poly3D::new(
            self.horizpoly.position(t),
            self.minalt + self.vspeed * t,
            self.maxalt + self.vspeed * t,
        )
    }
}
