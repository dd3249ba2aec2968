//! Great-circle distance and route waypoint geometry

use crate::Coordinate;
use std::f64::consts::PI;

/// Mean Earth radius in km
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Perpendicular offset (degrees) applied to the alternative-route waypoint
pub const WAYPOINT_OFFSET_DEG: f64 = 0.002;

/// Below this straight-line separation (degrees) no waypoint is inserted
pub const MIN_WAYPOINT_SEPARATION_DEG: f64 = 0.01;

/// Haversine distance between two coordinates in km
pub fn distance_km(a: &Coordinate, b: &Coordinate) -> f64 {
    haversine_km(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Haversine distance between two lat/lon pairs in km
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1 * PI / 180.0;
    let lat2_rad = lat2 * PI / 180.0;
    let dlat = (lat2 - lat1) * PI / 180.0;
    let dlon = (lon2 - lon1) * PI / 180.0;

    let a = (dlat / 2.0).sin().powi(2) + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Waypoint for the alternative evacuation route.
///
/// Midpoint of the straight origin→destination segment, pushed sideways by
/// [`WAYPOINT_OFFSET_DEG`] along the left-hand perpendicular. Returns `None`
/// when the two points are closer than [`MIN_WAYPOINT_SEPARATION_DEG`].
pub fn alternative_waypoint(origin: &Coordinate, destination: &Coordinate) -> Option<Coordinate> {
    let dx = destination.longitude - origin.longitude;
    let dy = destination.latitude - origin.latitude;
    let separation = (dx * dx + dy * dy).sqrt();

    if separation < MIN_WAYPOINT_SEPARATION_DEG {
        return None;
    }

    let mid_lon = (origin.longitude + destination.longitude) / 2.0;
    let mid_lat = (origin.latitude + destination.latitude) / 2.0;

    let perp_lon = (-dy / separation) * WAYPOINT_OFFSET_DEG;
    let perp_lat = (dx / separation) * WAYPOINT_OFFSET_DEG;

    Some(Coordinate::new(mid_lat + perp_lat, mid_lon + perp_lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine() {
        // NYC to London: ~5,570 km
        let nyc = Coordinate::new(40.7128, -74.0060);
        let london = Coordinate::new(51.5074, -0.1278);
        assert!((distance_km(&nyc, &london) - 5570.0).abs() < 50.0);

        // Same point: 0 km
        assert!(distance_km(&nyc, &nyc).abs() < 1e-9);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = Coordinate::new(12.9165, 79.1325);
        let b = Coordinate::new(12.9701, 79.1560);
        assert!((distance_km(&a, &b) - distance_km(&b, &a)).abs() < 1e-9);
        // VIT to Vellore town centre is ~6.5 km
        assert!((distance_km(&a, &b) - 6.5).abs() < 0.5);
    }

    #[test]
    fn test_waypoint_skipped_for_short_hops() {
        let a = Coordinate::new(12.0, 79.0);
        let b = Coordinate::new(12.005, 79.005);
        assert!(alternative_waypoint(&a, &b).is_none());
    }

    #[test]
    fn test_waypoint_is_offset_from_midpoint() {
        // Due east: perpendicular offset points north
        let a = Coordinate::new(10.0, 10.0);
        let b = Coordinate::new(10.0, 10.1);
        let w = alternative_waypoint(&a, &b).unwrap();

        assert!((w.longitude - 10.05).abs() < 1e-9);
        assert!((w.latitude - (10.0 + WAYPOINT_OFFSET_DEG)).abs() < 1e-9);
    }

    #[test]
    fn test_waypoint_does_not_materially_lengthen_route() {
        let a = Coordinate::new(12.90, 79.10);
        let b = Coordinate::new(12.97, 79.16);
        let w = alternative_waypoint(&a, &b).unwrap();

        let direct = distance_km(&a, &b);
        let via = distance_km(&a, &w) + distance_km(&w, &b);
        assert!(via >= direct);
        assert!(via - direct < 0.1);
    }
}
