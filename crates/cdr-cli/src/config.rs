//! Run configuration from environment.

use std::env;
use std::path::PathBuf;

use cdr_core::SeparationRules;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub lookahead_begin_s: Option<f64>,
    pub lookahead_end_s: Option<f64>,
    pub polygon_time_step_s: Option<f64>,
    pub filter_time_s: Option<f64>,
    /// JSON file of detector parameters used instead of the defaults
    pub detectors_path: Option<PathBuf>,
}

fn env_f64(key: &str) -> Option<f64> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            lookahead_begin_s: env_f64("CDR_LOOKAHEAD_BEGIN_S"),
            lookahead_end_s: env_f64("CDR_LOOKAHEAD_END_S"),
            polygon_time_step_s: env_f64("CDR_TIME_STEP_S"),
            filter_time_s: env_f64("CDR_FILTER_TIME_S"),
            detectors_path: env::var("CDR_DETECTORS").ok().map(PathBuf::from),
        }
    }

    /// Overwrite the rules with every value set here.
    pub fn apply(&self, rules: &mut SeparationRules) {
        if let Some(b) = self.lookahead_begin_s {
            rules.lookahead_begin_s = b;
        }
        if let Some(t) = self.lookahead_end_s {
            rules.lookahead_end_s = t;
        }
        if let Some(step) = self.polygon_time_step_s {
            rules.polygon_time_step_s = step;
        }
        if let Some(f) = self.filter_time_s {
            rules.filter_time_s = f;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_only_overrides_set_values() {
        let mut rules = SeparationRules::default();
        let config = Config {
            lookahead_end_s: Some(900.0),
            ..Config::default()
        };
        config.apply(&mut rules);
        assert_eq!(rules.lookahead_end_s, 900.0);
        assert_eq!(rules.lookahead_begin_s, 0.0);
        assert_eq!(rules.polygon_time_step_s, 1.0);
    }
}
