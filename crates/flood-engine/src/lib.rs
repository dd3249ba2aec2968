//! Flood Risk Decision Engine
//!
//! Turns raw weather observations, elevation samples and water-proximity
//! measurements into a flood risk assessment, a ranked list of evacuation
//! centers and a safety-scored evacuation route.
//!
//! # Pipeline
//!
//! ```text
//! location ──► weather::summarize ──► WeatherData
//!          └─► risk::assess (+ elevation, water) ──► FloodRiskAssessment
//!          └─► centers::rank (+ discovery, elevation) ──► [EvacuationCenter; ≤5]
//!          └─► route::from_driving_route (+ directions) ──► Route
//! ```
//!
//! | Stage    | Module      | Collaborators                          |
//! |----------|-------------|----------------------------------------|
//! | Weather  | [`weather`] | [`provider::WeatherSource`]            |
//! | Risk     | [`risk`]    | elevation, nearest water               |
//! | Centers  | [`centers`] | place discovery, elevation             |
//! | Route    | [`route`]   | [`provider::RoutingService`]           |
//!
//! Every stage degrades to a documented fallback when a collaborator is
//! unavailable; [`FloodEngine`] never surfaces an upstream failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod centers;
pub mod config;
pub mod engine;
pub mod geo;
pub mod occupancy;
pub mod provider;
pub mod risk;
pub mod route;
pub mod weather;

#[cfg(feature = "live-api")]
pub mod providers;

pub use centers::{CenterStatus, EvacuationCenter};
pub use config::EngineConfig;
pub use engine::{Collaborators, FloodEngine};
pub use geo::distance_km;
pub use provider::ProviderError;
pub use risk::{FloodProneArea, FloodRiskAssessment, Severity};
pub use route::{Route, RoutePlan};
pub use weather::{DataSource, WeatherData};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Non-finite input: {0}")]
    NonFiniteInput(&'static str),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// A point on the Earth's surface.
///
/// `elevation` is in meters and is `0.0` when unknown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: 0.0,
        }
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = elevation;
        self
    }

    /// True when both angles are finite and inside their valid ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// `[lon, lat]` pair, the axis order GeoJSON and Mapbox expect
    pub fn lon_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(12.97, 79.15).is_valid());
        assert!(Coordinate::new(-90.0, 180.0).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.5).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_coordinate_json_defaults_elevation() {
        let c: Coordinate = serde_json::from_str(r#"{"latitude": 1.5, "longitude": 2.5}"#).unwrap();
        assert_eq!(c.elevation, 0.0);
        assert_eq!(c.lon_lat(), [2.5, 1.5]);
    }
}
