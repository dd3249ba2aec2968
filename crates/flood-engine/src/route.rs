//! Evacuation route scoring
//!
//! The safety score is a heuristic, not a physical model:
//!
//! ```text
//! safety = clamp(1, 10, 5 + ΔE + D + R)
//!   ΔE = +2 if the center sits higher than the origin, else -2
//!   D  = +1 if the center is under 5 km away, else -1
//!   R  = -2 if the location's risk score exceeds 70, else 0
//! ```
//!
//! Routes built from live directions keep the service's steps. When the
//! service answers without a usable route a direct-line route is
//! synthesized; when every routing attempt fails outright a fixed cautionary
//! route with safety 7 is returned.

use crate::centers::EvacuationCenter;
use crate::provider::DrivingRoute;
use crate::risk::{FloodRiskAssessment, IMMINENT_RISK_SCORE};
use crate::Coordinate;
use serde::{Deserialize, Serialize};

pub const MIN_SAFETY_SCORE: i32 = 1;
pub const MAX_SAFETY_SCORE: i32 = 10;

/// Safety score reported when routing failed entirely
pub const UNREACHABLE_SAFETY_SCORE: u8 = 7;

/// Centers nearer than this earn the proximity bonus (km)
pub const NEAR_CENTER_KM: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub center: EvacuationCenter,
    /// km
    pub distance: f64,
    /// minutes
    pub estimated_time: u32,
    /// 1-10
    pub safety_score: u8,
    pub directions: Vec<String>,
    /// `[lon, lat]` pairs for the map layer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub geometry: Vec<[f64; 2]>,
}

/// Direct route plus the offset-waypoint alternative for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlan {
    pub primary: Route,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative: Option<Route>,
}

pub fn safety_score(origin: &Coordinate, center: &EvacuationCenter, risk_score: f64) -> u8 {
    let elevation_delta = center.elevation - origin.elevation;

    let mut score = 5;
    score += if elevation_delta > 0.0 { 2 } else { -2 };
    score += if center.distance < NEAR_CENTER_KM { 1 } else { -1 };
    if risk_score > IMMINENT_RISK_SCORE {
        score -= 2;
    }

    score.clamp(MIN_SAFETY_SCORE, MAX_SAFETY_SCORE) as u8
}

/// Warning naming every High/Severe area, if any
pub fn hazard_warning(risk: &FloodRiskAssessment) -> Option<String> {
    let names = risk.hazard_area_names();
    if names.is_empty() {
        return None;
    }
    Some(format!(
        "IMPORTANT: Avoid {} areas which have high flood risk",
        names.join(", ")
    ))
}

/// Live steps are usable only if there is at least one and none is blank
pub fn navigable(route: &DrivingRoute) -> bool {
    !route.step_instructions.is_empty() && route.step_instructions.iter().all(|s| !s.trim().is_empty())
}

/// Build a route from a directions answer.
///
/// `None` or un-navigable steps fall back to [`direct_line`].
pub fn from_driving_route(
    origin: &Coordinate,
    center: &EvacuationCenter,
    risk: &FloodRiskAssessment,
    driving: Option<DrivingRoute>,
) -> Route {
    let driving = match driving {
        Some(d) if navigable(&d) => d,
        _ => return direct_line(origin, center, risk),
    };

    let mut directions = driving.step_instructions;
    directions.extend(hazard_warning(risk));

    Route {
        center: center.clone(),
        distance: driving.distance_meters / 1000.0,
        estimated_time: (driving.duration_seconds / 60.0).round().max(0.0) as u32,
        safety_score: safety_score(origin, center, risk.risk_score),
        directions,
        geometry: driving.geometry,
    }
}

/// Straight-line route synthesized from the center's precomputed distance and time
pub fn direct_line(origin: &Coordinate, center: &EvacuationCenter, risk: &FloodRiskAssessment) -> Route {
    let mut directions = vec![
        format!("Head towards {}", center.name),
        format!("Continue for approximately {:.1} km", center.distance),
        format!("Arrive at {}", center.name),
    ];
    directions.extend(hazard_warning(risk));

    Route {
        center: center.clone(),
        distance: center.distance,
        estimated_time: center.estimated_time,
        safety_score: safety_score(origin, center, risk.risk_score),
        directions,
        geometry: vec![origin.lon_lat(), center.coordinate().lon_lat()],
    }
}

/// Cautionary route used when no routing attempt could be made
pub fn unreachable_route(center: &EvacuationCenter) -> Route {
    Route {
        center: center.clone(),
        distance: center.distance,
        estimated_time: center.estimated_time,
        safety_score: UNREACHABLE_SAFETY_SCORE,
        directions: vec![
            "Head north from your location".to_string(),
            format!("Continue on main roads for approximately {:.1} km", center.distance),
            "Avoid low-lying areas and water crossings".to_string(),
            format!("{} will be on your right", center.name),
        ],
        geometry: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::centers::CenterStatus;
    use crate::risk::{assess, fallback_assessment, RiskInputs};

    fn center(elevation: f64, distance: f64) -> EvacuationCenter {
        EvacuationCenter {
            id: "ec-test".to_string(),
            name: "Hilltop College".to_string(),
            address: "1 Ridge Rd".to_string(),
            latitude: 12.97,
            longitude: 79.16,
            elevation,
            distance,
            estimated_time: 12,
            capacity: 500,
            current_occupancy: 100,
            status: CenterStatus::Open,
        }
    }

    fn risky() -> FloodRiskAssessment {
        assess(&RiskInputs {
            recent_rainfall: 55.0,
            forecast_rainfall: 10.5,
            last_7_days_rainfall: 120.0,
            elevation: 40.0,
            water_proximity: 0.3,
        })
        .unwrap()
    }

    fn origin() -> Coordinate {
        Coordinate::new(12.92, 79.13).with_elevation(40.0)
    }

    #[test]
    fn test_safety_score_formula() {
        let calm = fallback_assessment(0.0);
        // 5 + 2 + 1 + 0
        assert_eq!(safety_score(&origin(), &center(200.0, 3.0), calm.risk_score), 8);
        // 5 - 2 - 1 - 2
        assert_eq!(safety_score(&origin(), &center(10.0, 9.0), 75.0), 1);
        // Equal elevation counts as no gain: 5 - 2 + 1
        assert_eq!(safety_score(&origin(), &center(40.0, 1.0), 70.0), 4);
    }

    #[test]
    fn test_live_route_keeps_steps_and_appends_hazard() {
        let driving = DrivingRoute {
            distance_meters: 6400.0,
            duration_seconds: 750.0,
            step_instructions: vec![
                "Head east on Arcot Rd".to_string(),
                "Turn left onto Katpadi Rd".to_string(),
                "You have arrived".to_string(),
            ],
            geometry: vec![[79.13, 12.92], [79.16, 12.97]],
        };

        let route = from_driving_route(&origin(), &center(220.0, 6.0), &risky(), Some(driving));
        assert_eq!(route.distance, 6.4);
        assert_eq!(route.estimated_time, 13);
        assert_eq!(route.directions.len(), 4);
        assert_eq!(route.directions[0], "Head east on Arcot Rd");
        assert!(route.directions[3].starts_with("IMPORTANT: Avoid Heavy Rainfall Zone, Lowland Area"));
        // 5 + 2 - 1 - 2
        assert_eq!(route.safety_score, 4);
        assert_eq!(route.geometry.len(), 2);
    }

    #[test]
    fn test_no_route_synthesizes_direct_line() {
        let calm = fallback_assessment(0.0);
        let route = from_driving_route(&origin(), &center(220.0, 6.04), &calm, None);

        assert_eq!(
            route.directions,
            vec![
                "Head towards Hilltop College",
                "Continue for approximately 6.0 km",
                "Arrive at Hilltop College",
            ]
        );
        assert_eq!(route.distance, 6.04);
        assert_eq!(route.estimated_time, 12);
        // Heuristic, not the fixed fallback: 5 + 2 - 1
        assert_eq!(route.safety_score, 6);
        assert_eq!(route.geometry, vec![[79.13, 12.92], [79.16, 12.97]]);
    }

    #[test]
    fn test_blank_step_is_unnavigable() {
        let driving = DrivingRoute {
            distance_meters: 1000.0,
            duration_seconds: 60.0,
            step_instructions: vec!["Go".to_string(), "  ".to_string()],
            geometry: Vec::new(),
        };
        let route = from_driving_route(&origin(), &center(220.0, 2.0), &risky(), Some(driving));
        assert_eq!(route.directions.len(), 4);
        assert_eq!(route.directions[0], "Head towards Hilltop College");
        assert!(route.directions[3].starts_with("IMPORTANT"));
    }

    #[test]
    fn test_unreachable_route() {
        let route = unreachable_route(&center(220.0, 6.04));
        assert_eq!(route.safety_score, UNREACHABLE_SAFETY_SCORE);
        assert_eq!(route.directions.len(), 4);
        assert_eq!(route.directions[1], "Continue on main roads for approximately 6.0 km");
        assert_eq!(route.directions[3], "Hilltop College will be on your right");
    }

    #[test]
    fn test_hazard_warning_absent_for_calm_areas() {
        assert!(hazard_warning(&fallback_assessment(0.0)).is_none());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::centers::CenterStatus;
    use crate::risk::{assess, RiskInputs};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn fuzz_route_invariants(
            origin_elevation in -100.0f64..3000.0,
            center_elevation in -100.0f64..3000.0,
            distance in 0.0f64..100.0,
            rain in 0.0f64..200.0,
            has_route in any::<bool>(),
        ) {
            let origin = Coordinate::new(12.9, 79.1).with_elevation(origin_elevation);
            let center = EvacuationCenter {
                id: "c".to_string(),
                name: "C".to_string(),
                address: String::new(),
                latitude: 12.95,
                longitude: 79.15,
                elevation: center_elevation,
                distance,
                estimated_time: 10,
                capacity: 400,
                current_occupancy: 0,
                status: CenterStatus::Open,
            };
            let risk = assess(&RiskInputs {
                recent_rainfall: rain,
                forecast_rainfall: rain,
                last_7_days_rainfall: rain,
                elevation: origin_elevation,
                water_proximity: 1.0,
            }).unwrap();

            let driving = has_route.then(|| DrivingRoute {
                distance_meters: distance * 1000.0,
                duration_seconds: distance * 90.0,
                step_instructions: vec!["Drive".to_string()],
                geometry: Vec::new(),
            });

            let route = from_driving_route(&origin, &center, &risk, driving);
            prop_assert!((1..=10).contains(&route.safety_score));
            prop_assert!(!route.directions.is_empty());
        }
    }
}
