//! Separation standards and lookahead configuration.

use serde::{Deserialize, Serialize};

use crate::units;

/// Configuration for separation rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparationRules {
    /// Minimum horizontal separation in meters
    pub horizontal_separation_m: f64,
    /// Minimum vertical separation in meters
    pub vertical_separation_m: f64,
    /// Start of the lookahead window, seconds from now
    pub lookahead_begin_s: f64,
    /// End of the lookahead window, seconds from now
    pub lookahead_end_s: f64,
    /// How far ownship state is projected before it is considered stale (seconds)
    pub state_horizon_s: f64,
    /// Sampling step for polygon detection in seconds
    pub polygon_time_step_s: f64,
    /// Minimum conflict duration reported by point detectors (seconds)
    pub filter_time_s: f64,
}

impl Default for SeparationRules {
    fn default() -> Self {
        Self {
            horizontal_separation_m: units::from("nmi", 5.0),
            vertical_separation_m: units::from("ft", 1000.0),
            lookahead_begin_s: 0.0,
            lookahead_end_s: 300.0,
            state_horizon_s: f64::MAX,
            polygon_time_step_s: 1.0,
            filter_time_s: 0.0,
        }
    }
}

impl SeparationRules {
    /// Problems that would make detection meaningless.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.horizontal_separation_m <= 0.0 {
            errors.push("horizontal_separation_m must be positive".to_string());
        }
        if self.vertical_separation_m <= 0.0 {
            errors.push("vertical_separation_m must be positive".to_string());
        }
        if self.lookahead_end_s < self.lookahead_begin_s {
            errors.push("lookahead_end_s is before lookahead_begin_s".to_string());
        }
        if self.polygon_time_step_s <= 0.0 {
            errors.push("polygon_time_step_s must be positive".to_string());
        }
        if self.filter_time_s < 0.0 {
            errors.push("filter_time_s must not be negative".to_string());
        }
        errors
    }
}
