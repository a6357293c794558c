//! Spherical-earth great circle math on latitude/longitude in degrees.

use std::f64::consts::PI;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters (haversine formula).
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Initial course from point 1 to point 2 in radians, 0 = north, π/2 = east.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    x.atan2(y)
}

/// Point reached by following the great circle leaving (`lat`, `lon`) on
/// `bearing_rad` for `distance_m` meters. Negative distances travel backwards.
///
/// # Returns
/// (new_lat, new_lon) in degrees, longitude wrapped to [-180, 180)
pub fn offset_by_bearing(lat: f64, lon: f64, distance_m: f64, bearing_rad: f64) -> (f64, f64) {
    if distance_m.abs() <= f64::EPSILON {
        return (lat, lon);
    }

    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let angular_distance = distance_m / EARTH_RADIUS_M;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let lon2 = (lon1 + y.atan2(x) + PI).rem_euclid(2.0 * PI) - PI;

    (lat2.to_degrees(), lon2.to_degrees())
}

/// Fraction `f` of the way along the great circle from point 1 to point 2.
pub fn interpolate(lat1: f64, lon1: f64, lat2: f64, lon2: f64, f: f64) -> (f64, f64) {
    let d = haversine_distance(lat1, lon1, lat2, lon2);
    if d <= f64::EPSILON {
        return (lat1, lon1);
    }
    offset_by_bearing(lat1, lon1, d * f, bearing(lat1, lon1, lat2, lon2))
}

/// Course on arrival at point 2 when flying the great circle from point 1.
pub fn final_course(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    (bearing(lat2, lon2, lat1, lon1) + PI).rem_euclid(2.0 * PI)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let dist = haversine_distance(33.6846, -117.8265, 33.6846, -117.8265);
        assert!(dist < 0.001);
    }

    #[test]
    fn test_offset_then_measure() {
        let (lat, lon) = offset_by_bearing(40.0, -75.0, 10_000.0, 1.0);
        let back = haversine_distance(40.0, -75.0, lat, lon);
        assert!((back - 10_000.0).abs() < 1e-6);
        assert!((bearing(40.0, -75.0, lat, lon) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_offset_wraps_dateline() {
        let (_, lon) = offset_by_bearing(0.0, 179.99, 5_000.0, PI / 2.0);
        assert!(lon < -179.9);
    }

    #[test]
    fn test_interpolate_midpoint_on_equator() {
        let (lat, lon) = interpolate(0.0, 0.0, 0.0, 10.0, 0.5);
        assert!(lat.abs() < 1e-9);
        assert!((lon - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_final_course_along_meridian() {
        let c = final_course(10.0, 20.0, 30.0, 20.0);
        assert!(c.abs() < 1e-9 || (c - 2.0 * PI).abs() < 1e-9);
    }
}
