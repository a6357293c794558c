//! Cylindrical separation detector (horizontal radius D, half-height H).

use serde::{Deserialize, Serialize};

use crate::parameters::ParameterData;
use crate::rules::SeparationRules;
use crate::units;
use crate::vect::{Vect3, Velocity};

use super::cd3d;
use super::{ConflictData, Detection3D};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdCylinder {
    id: String,
    d: f64,
    h: f64,
}

impl Default for CdCylinder {
    /// 5 nmi by 1000 ft, the en-route standard.
    fn default() -> Self {
        Self {
            id: String::new(),
            d: units::from("nmi", 5.0),
            h: units::from("ft", 1000.0),
        }
    }
}

impl CdCylinder {
    pub fn new(d: f64, h: f64) -> Self {
        Self {
            id: String::new(),
            d,
            h,
        }
    }

    /// Cylinder sized from configured separation minima.
    pub fn from_rules(rules: &SeparationRules) -> Self {
        Self::new(
            rules.horizontal_separation_m,
            rules.vertical_separation_m,
        )
    }

    /// Horizontal radius in metres.
    pub fn horizontal_separation(&self) -> f64 {
        self.d
    }

    /// Vertical half-height in metres.
    pub fn vertical_separation(&self) -> f64 {
        self.h
    }

    pub fn set_horizontal_separation(&mut self, d: f64) {
        if d > 0.0 {
            self.d = d;
        }
    }

    pub fn set_vertical_separation(&mut self, h: f64) {
        if h > 0.0 {
            self.h = h;
        }
    }
}

impl Detection3D for CdCylinder {
    fn violation(&self, so: Vect3, _vo: Velocity, si: Vect3, _vi: Velocity) -> bool {
        let s = so - si;
        cd3d::horizontal_los(s.vect2(), self.d) && cd3d::vertical_los(s.z, self.h)
    }

    fn conflict_detection(
        &self,
        so: Vect3,
        vo: Velocity,
        si: Vect3,
        vi: Velocity,
        b: f64,
        t: f64,
    ) -> ConflictData {
        let s = so - si;
        let loss = cd3d::detection(s, vo, vi, self.d, self.h, b, t);
        let tca = cd3d::tccpa(s, vo, vi, self.d, self.h, b, t);
        let v = vo - vi;
        ConflictData {
            loss,
            time_crit: tca,
            dist_crit: s.linear(v, tca).cyl_norm(self.d, self.h),
            s,
            v,
        }
    }

    fn parameters(&self) -> ParameterData {
        let mut p = ParameterData::new();
        p.set_string("class", self.class_name());
        p.set_string("id", self.id.clone());
        p.set_internal("D", self.d, "nmi");
        p.set_internal("H", self.h, "ft");
        p
    }

    fn set_parameters(&mut self, p: &ParameterData) {
        if let Some(d) = p.get_value("D") {
            self.set_horizontal_separation(d);
        }
        if let Some(h) = p.get_value("H") {
            self.set_vertical_separation(h);
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
        "CdCylinder"
    }

    fn clone_box(&self) -> Box<dyn Detection3D> {
        Box::new(self.clone())
    }
}
