//! Flood risk scoring
//!
//! ```text
//! risk = min(100, R_recent + R_forecast + E + W)
//! ```
//!
//! | Factor     | Range | Source                          |
//! |------------|-------|---------------------------------|
//! | R_recent   | 0-35  | rainfall, last 24h              |
//! | R_forecast | 0-35  | rainfall, next 24h              |
//! | E          | 0-20  | elevation of the query point    |
//! | W          | 0-10  | distance to nearest water body  |
//!
//! Probability, soil saturation, expected water rise and time-to-flood are
//! simple derivations of the score and its inputs, not hydrological models.

use crate::weather::WeatherData;
use crate::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Elevation used when the terrain lookup fails (m)
pub const DEFAULT_ELEVATION_M: f64 = 0.0;

/// Water proximity used when the water lookup fails or finds nothing (km)
pub const DEFAULT_WATER_PROXIMITY_KM: f64 = 3.0;

/// Scores above this carry a time-to-flood estimate
pub const IMMINENT_RISK_SCORE: f64 = 70.0;

/// Soil saturation ceiling (%)
pub const MAX_SOIL_SATURATION: f64 = 95.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Severe,
}

impl Severity {
    /// High and Severe areas are called out in route directions
    pub fn is_hazard(&self) -> bool {
        matches!(self, Severity::High | Severity::Severe)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Severe => "Severe",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloodProneArea {
    pub name: String,
    pub risk_level: Severity,
    pub reason: String,
}

impl FloodProneArea {
    fn new(name: &str, risk_level: Severity, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            risk_level,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloodRiskAssessment {
    /// 0-100
    pub risk_score: f64,
    /// 0-90, `0.9 * risk_score`
    pub flood_probability: f64,
    /// mm in the last 24h
    pub recent_rainfall: f64,
    /// 60-95 %
    pub soil_saturation: f64,
    /// m
    pub elevation: f64,
    /// km
    pub water_proximity: f64,
    /// cm, signed
    pub expected_water_rise: f64,
    /// hours, present only when the score exceeds 70
    pub time_to_flood: Option<f64>,
    pub flood_prone_areas: Vec<FloodProneArea>,
}

impl FloodRiskAssessment {
    /// Areas whose severity warrants a route warning
    pub fn hazard_area_names(&self) -> Vec<&str> {
        self.flood_prone_areas
            .iter()
            .filter(|a| a.risk_level.is_hazard())
            .map(|a| a.name.as_str())
            .collect()
    }
}

/// Everything the scorer needs, already resolved from collaborators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskInputs {
    pub recent_rainfall: f64,
    pub forecast_rainfall: f64,
    pub last_7_days_rainfall: f64,
    pub elevation: f64,
    pub water_proximity: f64,
}

impl RiskInputs {
    pub fn from_weather(weather: &WeatherData, elevation: f64, water_proximity: f64) -> Self {
        Self {
            recent_rainfall: weather.historical.summary.last_24_hours,
            forecast_rainfall: weather.forecast.summary.next_24_hours,
            last_7_days_rainfall: weather.historical.summary.last_7_days,
            elevation,
            water_proximity,
        }
    }

    fn check_finite(&self) -> Result<()> {
        let fields = [
            ("recent_rainfall", self.recent_rainfall),
            ("forecast_rainfall", self.forecast_rainfall),
            ("last_7_days_rainfall", self.last_7_days_rainfall),
            ("elevation", self.elevation),
            ("water_proximity", self.water_proximity),
        ];
        match fields.iter().find(|(_, v)| !v.is_finite()) {
            Some((name, _)) => Err(EngineError::NonFiniteInput(*name)),
            None => Ok(()),
        }
    }
}

/// Rainfall step function shared by the recent and forecast halves (0-35)
pub fn rainfall_points(mm: f64) -> f64 {
    if mm > 50.0 {
        35.0
    } else if mm > 30.0 {
        30.0
    } else if mm > 20.0 {
        25.0
    } else if mm > 10.0 {
        15.0
    } else {
        mm / 3.0
    }
}

/// Elevation contribution (0-20)
pub fn elevation_points(elevation_m: f64) -> f64 {
    if elevation_m < 30.0 {
        20.0
    } else if elevation_m < 60.0 {
        15.0
    } else if elevation_m < 100.0 {
        10.0
    } else if elevation_m < 150.0 {
        5.0
    } else {
        0.0
    }
}

/// Water proximity contribution (0-10)
pub fn water_points(distance_km: f64) -> f64 {
    if distance_km < 0.5 {
        10.0
    } else if distance_km < 1.0 {
        8.0
    } else if distance_km < 2.0 {
        5.0
    } else if distance_km < 5.0 {
        2.0
    } else {
        0.0
    }
}

/// Score a location.
///
/// Fails only on non-finite inputs; callers substitute
/// [`fallback_assessment`] in that case.
pub fn assess(inputs: &RiskInputs) -> Result<FloodRiskAssessment> {
    inputs.check_finite()?;

    let recent = inputs.recent_rainfall;
    let forecast = inputs.forecast_rainfall;
    let elevation = inputs.elevation;

    let rainfall = rainfall_points(recent) + rainfall_points(forecast);
    let risk_score = (rainfall + elevation_points(elevation) + water_points(inputs.water_proximity)).min(100.0);

    let soil_saturation = (60.0 + (inputs.last_7_days_rainfall / 50.0) * 40.0).min(MAX_SOIL_SATURATION);

    // Signed on purpose: high ground with a dry forecast yields a negative rise
    let expected_water_rise = forecast * 1.2 * (1.0 + (100.0 - elevation) / 100.0);

    let time_to_flood = if risk_score > IMMINENT_RISK_SCORE {
        Some((12.0 - forecast / 10.0).max(1.0))
    } else {
        None
    };

    Ok(FloodRiskAssessment {
        risk_score,
        flood_probability: risk_score * 0.9,
        recent_rainfall: recent,
        soil_saturation,
        elevation,
        water_proximity: inputs.water_proximity,
        expected_water_rise,
        time_to_flood,
        flood_prone_areas: classify_areas(elevation, inputs.water_proximity, recent, forecast),
    })
}

/// Rule-based flood-prone area list; order is fixed and never empty
pub fn classify_areas(
    elevation: f64,
    water_proximity: f64,
    recent_rainfall: f64,
    forecast_rainfall: f64,
) -> Vec<FloodProneArea> {
    let either_above = |mm: f64| recent_rainfall > mm || forecast_rainfall > mm;
    let mut areas = Vec::new();

    if either_above(30.0) {
        areas.push(FloodProneArea::new(
            "Heavy Rainfall Zone",
            Severity::High,
            "Significant precipitation expected",
        ));
    }

    if elevation < 50.0 {
        let level = if either_above(20.0) { Severity::Severe } else { Severity::High };
        areas.push(FloodProneArea::new("Lowland Area", level, "Low elevation with rainfall"));
    }

    if water_proximity < 1.0 {
        let level = if either_above(20.0) { Severity::Severe } else { Severity::High };
        areas.push(FloodProneArea::new(
            "Riverside",
            level,
            "Very close to water body with rainfall",
        ));
    } else if water_proximity < 2.0 {
        areas.push(FloodProneArea::new("Near Water", Severity::High, "Proximity to water body"));
    }

    if elevation < 100.0 && water_proximity < 3.0 {
        let level = if either_above(15.0) { Severity::High } else { Severity::Medium };
        areas.push(FloodProneArea::new(
            "Valley Basin",
            level,
            "Moderate elevation near water with rainfall",
        ));
    }

    if elevation > 100.0 {
        if either_above(40.0) {
            areas.push(FloodProneArea::new(
                "Highland Area",
                Severity::Medium,
                "High elevation but extreme rainfall",
            ));
        } else {
            areas.push(FloodProneArea::new("Highland Area", Severity::Low, "High elevation terrain"));
        }
    }

    if areas.is_empty() {
        areas.push(FloodProneArea::new(
            "General Area",
            Severity::Low,
            "No specific risk factors identified",
        ));
    }

    areas
}

/// Static assessment used when scoring itself cannot proceed
pub fn fallback_assessment(recent_rainfall: f64) -> FloodRiskAssessment {
    FloodRiskAssessment {
        risk_score: 50.0,
        flood_probability: 45.0,
        recent_rainfall,
        soil_saturation: 70.0,
        elevation: 50.0,
        water_proximity: 2.0,
        expected_water_rise: 25.0,
        time_to_flood: None,
        flood_prone_areas: vec![
            FloodProneArea::new("River Valley", Severity::Medium, "Low elevation area"),
            FloodProneArea::new("Central District", Severity::Low, "Moderate elevation with drainage"),
        ],
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(2000))]

        #[test]
        fn fuzz_score_bounds(
            recent in 0.0f64..500.0,
            forecast in 0.0f64..500.0,
            week in 0.0f64..2000.0,
            elevation in -50.0f64..3000.0,
            water in 0.0f64..50.0,
        ) {
            let risk = assess(&RiskInputs {
                recent_rainfall: recent,
                forecast_rainfall: forecast,
                last_7_days_rainfall: week,
                elevation,
                water_proximity: water,
            }).unwrap();

            prop_assert!((0.0..=100.0).contains(&risk.risk_score));
            prop_assert!((0.0..=90.0).contains(&risk.flood_probability));
            prop_assert!((60.0..=MAX_SOIL_SATURATION).contains(&risk.soil_saturation));
            prop_assert!(!risk.flood_prone_areas.is_empty());

            match risk.time_to_flood {
                Some(hours) => {
                    prop_assert!(risk.risk_score > IMMINENT_RISK_SCORE);
                    prop_assert!(hours >= 1.0);
                }
                None => prop_assert!(risk.risk_score <= IMMINENT_RISK_SCORE),
            }
        }

        #[test]
        fn fuzz_assess_is_idempotent(
            recent in 0.0f64..100.0,
            forecast in 0.0f64..100.0,
            elevation in 0.0f64..300.0,
            water in 0.0f64..10.0,
        ) {
            let i = RiskInputs {
                recent_rainfall: recent,
                forecast_rainfall: forecast,
                last_7_days_rainfall: recent * 3.0,
                elevation,
                water_proximity: water,
            };
            prop_assert_eq!(assess(&i).unwrap(), assess(&i).unwrap());
        }
    }
}
