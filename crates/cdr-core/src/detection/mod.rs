//! Pairwise conflict detection kernels.
//!
//! [`Detection3D`] is the seam for point-vs-point detectors (state against
//! state), [`DetectionPolygon`] for point-vs-moving-polygon detectors. Both
//! are object safe so sequencers can hold any configured detector.

pub mod cd3d;
pub mod cdss;
pub mod cylinder;
pub mod poly_iter;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::conflict_list::ConflictInterval;
use crate::moving_polygon::MovingPolygon3D;
use crate::parameters::ParameterData;
use crate::poly::Poly3D;
use crate::util::almost_equals;
use crate::vect::{Vect3, Velocity};

pub use cdss::CdssCore;
pub use cylinder::CdCylinder;
pub use poly_iter::CdPolyIter;

/// Entry/exit times of a loss of separation. Empty when `time_in >= time_out`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossData {
    pub time_in: f64,
    pub time_out: f64,
}

impl LossData {
    pub const EMPTY: LossData = LossData {
        time_in: f64::INFINITY,
        time_out: f64::NEG_INFINITY,
    };

    pub fn new(time_in: f64, time_out: f64) -> Self {
        Self { time_in, time_out }
    }

    pub fn conflict(&self) -> bool {
        self.time_in < self.time_out
    }

    /// Conflict lasting at least `filter` seconds.
    pub fn conflict_filtered(&self, filter: f64) -> bool {
        self.conflict()
            && !almost_equals(self.time_in, self.time_out)
            && self.time_out - self.time_in >= filter
    }

    pub fn duration(&self) -> f64 {
        if self.conflict() {
            self.time_out - self.time_in
        } else {
            0.0
        }
    }
}

/// Loss interval plus closest approach and the relative state it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConflictData {
    pub loss: LossData,
    /// Time of (weighted) closest approach within the window
    pub time_crit: f64,
    /// Normalised cylindrical distance at `time_crit`
    pub dist_crit: f64,
    /// Relative position, ownship minus intruder
    pub s: Vect3,
    /// Relative velocity, ownship minus intruder
    pub v: Vect3,
}

impl ConflictData {
    pub fn conflict(&self) -> bool {
        self.loss.conflict()
    }

    pub fn conflict_filtered(&self, filter: f64) -> bool {
        self.loss.conflict_filtered(filter)
    }

    pub fn time_in(&self) -> f64 {
        self.loss.time_in
    }

    pub fn time_out(&self) -> f64 {
        self.loss.time_out
    }

    /// Relative position at `t`.
    pub fn relative_position(&self, t: f64) -> Vect3 {
        self.s.linear(self.v, t)
    }
}

/// Point-vs-point detector.
pub trait Detection3D: fmt::Debug + Send + Sync {
    /// Whether the two aircraft are in loss of separation now.
    fn violation(&self, so: Vect3, vo: Velocity, si: Vect3, vi: Velocity) -> bool;

    /// Loss interval within `[b, t]` with closest approach.
    fn conflict_detection(
        &self,
        so: Vect3,
        vo: Velocity,
        si: Vect3,
        vi: Velocity,
        b: f64,
        t: f64,
    ) -> ConflictData;

    fn conflict(&self, so: Vect3, vo: Velocity, si: Vect3, vi: Velocity, b: f64, t: f64) -> bool {
        self.conflict_detection(so, vo, si, vi, b, t).conflict()
    }

    /// Current configuration, including `class` and `id` entries.
    fn parameters(&self) -> ParameterData;

    /// Apply any recognised keys of `p`; unknown keys are ignored.
    fn set_parameters(&mut self, p: &ParameterData);

    fn identifier(&self) -> &str;

    fn set_identifier(&mut self, id: &str);

    fn class_name(&self) -> &'static str;

    fn clone_box(&self) -> Box<dyn Detection3D>;

    /// Same detector type with the same configuration.
    fn equals(&self, other: &dyn Detection3D) -> bool {
        self.class_name() == other.class_name()
            && self.parameters().almost_equals(&other.parameters())
    }
}

impl Clone for Box<dyn Detection3D> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Point-vs-moving-polygon detector.
pub trait DetectionPolygon: fmt::Debug + Send + Sync {
    fn violation(&self, so: Vect3, vo: Velocity, si: &Poly3D) -> bool;

    /// Conflict intervals within `[b, t]`, relative to the polygon's start
    /// time, in increasing time order.
    ///
    /// A piece touching either end of the search window is kept whatever its
    /// length, since it may continue in a neighbouring window. Sequencers
    /// drop merged conflicts shorter than [`min_duration`](Self::min_duration).
    fn conflict_detection(
        &self,
        so: Vect3,
        vo: Velocity,
        si: &MovingPolygon3D,
        b: f64,
        t: f64,
    ) -> Vec<ConflictInterval>;

    fn conflict(&self, so: Vect3, vo: Velocity, si: &MovingPolygon3D, b: f64, t: f64) -> bool {
        !self.conflict_detection(so, vo, si, b, t).is_empty()
    }

    /// Shortest conflict this detector resolves reliably (seconds).
    fn min_duration(&self) -> f64 {
        0.0
    }

    fn parameters(&self) -> ParameterData;

    fn set_parameters(&mut self, p: &ParameterData);

    fn identifier(&self) -> &str;

    fn set_identifier(&mut self, id: &str);

    fn class_name(&self) -> &'static str;

    fn clone_box(&self) -> Box<dyn DetectionPolygon>;

    fn equals(&self, other: &dyn DetectionPolygon) -> bool {
        self.class_name() == other.class_name()
            && self.parameters().almost_equals(&other.parameters())
    }
}

impl Clone for Box<dyn DetectionPolygon> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_loss_data() {
        assert!(!LossData::EMPTY.conflict());
        assert_eq!(LossData::EMPTY.duration(), 0.0);
    }

    #[test]
    fn test_filtered_conflict() {
        let ld = LossData::new(10.0, 12.0);
        assert!(ld.conflict_filtered(1.0));
        assert!(!ld.conflict_filtered(5.0));
        assert!(!LossData::new(3.0, 3.0).conflict_filtered(0.0));
    }
}
