//! Great-circle distance between location fixes.

use crate::models::trip::GpsFix;

/// Mean Earth radius used for mileage, in miles.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Meters in one statute mile.
pub const METERS_PER_MILE: f64 = 1609.344;

/// Haversine distance in miles between two `(latitude, longitude)` points in degrees.
pub fn haversine_miles(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1 for antipodal points.
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_MILES * c
}

/// Distance in miles between two fixes.
pub fn distance_miles(from: &GpsFix, to: &GpsFix) -> f64 {
    haversine_miles((from.latitude, from.longitude), (to.latitude, to.longitude))
}

/// Distance in meters between two fixes.
pub fn distance_meters(from: &GpsFix, to: &GpsFix) -> f64 {
    distance_miles(from, to) * METERS_PER_MILE
}

/// Average speed between two fixes in meters per second.
///
/// `None` when the second fix is not strictly later than the first.
pub fn average_speed_mps(from: &GpsFix, to: &GpsFix) -> Option<f64> {
    let elapsed_ms = to.timestamp_ms.checked_sub(from.timestamp_ms)?;
    if elapsed_ms <= 0 {
        return None;
    }
    Some(distance_meters(from, to) / (elapsed_ms as f64 / 1000.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected} ± {tolerance}, got {actual}"
        );
    }

    #[test]
    fn test_same_point_is_zero() {
        assert_eq!(haversine_miles((47.6062, -122.3321), (47.6062, -122.3321)), 0.0);
    }

    #[test]
    fn test_known_distance() {
        // Seattle to Portland, roughly 145 miles as the crow flies
        let miles = haversine_miles((47.6062, -122.3321), (45.5152, -122.6784));
        assert_close(miles, 145.0, 2.0);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let miles = haversine_miles((0.0, 0.0), (1.0, 0.0));
        assert_close(miles, EARTH_RADIUS_MILES * std::f64::consts::PI / 180.0, 1e-9);
    }

    #[test]
    fn test_antipodal_points() {
        let miles = haversine_miles((0.0, 0.0), (0.0, 180.0));
        assert_close(miles, EARTH_RADIUS_MILES * std::f64::consts::PI, 1e-6);
    }

    #[test]
    fn test_average_speed() {
        let a = GpsFix::new(0.0, 0.0, 0);
        // ~111 m north
        let b = GpsFix::new(0.001, 0.0, 10_000);
        let speed = average_speed_mps(&a, &b).unwrap();
        assert_close(speed, 11.1, 0.2);

        assert_eq!(average_speed_mps(&b, &a), None);
        assert_eq!(average_speed_mps(&a, &a), None);
    }

    #[test]
    fn test_average_speed_extreme_timestamps() {
        let a = GpsFix::new(0.0, 0.0, i64::MIN);
        let b = GpsFix::new(0.001, 0.0, i64::MAX);
        assert_eq!(average_speed_mps(&a, &b), None);
        assert_eq!(average_speed_mps(&b, &a), None);
    }
}
