//! GeoJSON map layers
//!
//! Flood-prone areas have no surveyed boundaries, so each one is drawn as an
//! irregular ring around the query point for the map to shade by risk.

use flood_engine::occupancy::TelemetryRng;
use flood_engine::{Coordinate, EvacuationCenter, FloodProneArea};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;
use std::f64::consts::TAU;

pub const RING_VERTICES: usize = 64;
pub const MIN_RADIUS_DEG: f64 = 0.005;
pub const MAX_RADIUS_DEG: f64 = 0.015;
pub const JITTER_MIN: f64 = 0.8;
pub const JITTER_MAX: f64 = 1.2;

/// One closed Polygon per area with `name`, `risk` (lowercase) and `reason`
pub fn risk_overlay(
    location: &Coordinate,
    areas: &[FloodProneArea],
    rng: &mut TelemetryRng,
) -> FeatureCollection {
    let features = areas
        .iter()
        .map(|area| {
            let ring = irregular_ring(location, rng);

            let mut properties = JsonObject::new();
            properties.insert("name".to_string(), json!(area.name));
            properties.insert("risk".to_string(), json!(area.risk_level.as_str().to_lowercase()));
            properties.insert("reason".to_string(), json!(area.reason));

            feature(Value::Polygon(vec![ring]), properties)
        })
        .collect();

    collection(features)
}

/// Point features for evacuation centers
pub fn centers_overlay(centers: &[EvacuationCenter]) -> FeatureCollection {
    let features = centers
        .iter()
        .map(|center| {
            let mut properties = JsonObject::new();
            properties.insert("id".to_string(), json!(center.id));
            properties.insert("name".to_string(), json!(center.name));
            properties.insert("status".to_string(), json!(center.status));
            properties.insert("capacity".to_string(), json!(center.capacity));
            properties.insert("currentOccupancy".to_string(), json!(center.current_occupancy));
            properties.insert("distance".to_string(), json!(center.distance));

            feature(Value::Point(center.coordinate().lon_lat().to_vec()), properties)
        })
        .collect();

    collection(features)
}

fn irregular_ring(center: &Coordinate, rng: &mut TelemetryRng) -> Vec<Vec<f64>> {
    let radius = rng.uniform(MIN_RADIUS_DEG, MAX_RADIUS_DEG);

    let mut ring: Vec<Vec<f64>> = (0..RING_VERTICES)
        .map(|i| {
            let angle = i as f64 / RING_VERTICES as f64 * TAU;
            let r = radius * rng.uniform(JITTER_MIN, JITTER_MAX);
            vec![center.longitude + r * angle.cos(), center.latitude + r * angle.sin()]
        })
        .collect();

    if let Some(first) = ring.first().cloned() {
        ring.push(first);
    }
    ring
}

fn feature(value: Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
