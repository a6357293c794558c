//! Unit conversion between display units and the internal SI units
//! (metres, seconds, radians, metres per second).

pub const NMI: f64 = 1852.0;
pub const FT: f64 = 0.3048;
pub const KNOT: f64 = NMI / 3600.0;
pub const FPM: f64 = FT / 60.0;

/// Internal value of one `unit`, or `None` if the unit is unknown.
pub fn factor(unit: &str) -> Option<f64> {
    let f = match unit {
        "m" | "s" | "rad" | "m/s" | "unitless" | "unspecified" | "" => 1.0,
        "km" => 1000.0,
        "nmi" | "NM" => NMI,
        "ft" => FT,
        "kn" | "knot" | "kts" => KNOT,
        "fpm" | "ft/min" => FPM,
        "min" => 60.0,
        "hr" | "h" => 3600.0,
        "deg" => std::f64::consts::PI / 180.0,
        _ => return None,
    };
    Some(f)
}

/// Convert `value` expressed in `unit` into internal units.
///
/// Unknown units leave the value untouched.
pub fn from(unit: &str, value: f64) -> f64 {
    match factor(unit) {
        Some(f) => value * f,
        None => {
            tracing::warn!(unit, "unknown unit, value used as-is");
            value
        }
    }
}

/// Convert an internal `value` into `unit`.
pub fn to(unit: &str, value: f64) -> f64 {
    match factor(unit) {
        Some(f) => value / f,
        None => {
            tracing::warn!(unit, "unknown unit, value used as-is");
            value
        }
    }
}

pub fn is_known(unit: &str) -> bool {
    factor(unit).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nautical_miles_and_feet() {
        assert_eq!(from("nmi", 5.0), 9260.0);
        assert!((from("ft", 1000.0) - 304.8).abs() < 1e-9);
        assert!((to("kn", from("kn", 480.0)) - 480.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_unit_passes_through() {
        assert!(!is_known("furlong"));
        assert_eq!(from("furlong", 3.0), 3.0);
    }
}
