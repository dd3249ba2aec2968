//! External data collaborators
//!
//! The engine never talks to the network itself. Weather, elevation, water
//! proximity, place discovery and driving directions arrive through these
//! traits so tests can inject fixed answers and the gateway can swap in the
//! live HTTP clients from [`crate::providers`] (feature `live-api`).

use crate::Coordinate;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Collaborator failure. Always recovered by the engine, never surfaced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Upstream returned status {0}")]
    Status(u16),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("No access token configured for {0}")]
    MissingToken(&'static str),
    #[error("Collaborator unavailable")]
    Unavailable,
}

/// Daily precipitation totals, oldest first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailySeries {
    pub time: Vec<NaiveDate>,
    /// mm per day
    pub precipitation_sum: Vec<f64>,
}

/// Hourly precipitation with probability of precipitation, oldest first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HourlySeries {
    pub time: Vec<NaiveDateTime>,
    /// mm per hour
    pub precipitation: Vec<f64>,
    /// Percent, 0-100
    pub precipitation_probability: Vec<f64>,
}

/// Raw series covering ≥30 trailing days and ≥7 leading days
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrecipitationSeries {
    /// Offset of the series' local clock from UTC
    #[serde(default)]
    pub utc_offset_seconds: i32,
    pub daily: DailySeries,
    pub hourly: HourlySeries,
}

impl PrecipitationSeries {
    /// Parallel vectors must line up; anything else is a malformed payload
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.daily.time.len() != self.daily.precipitation_sum.len() {
            return Err(ProviderError::Parse(format!(
                "daily series length mismatch: {} times, {} values",
                self.daily.time.len(),
                self.daily.precipitation_sum.len()
            )));
        }
        if self.hourly.time.len() != self.hourly.precipitation.len() {
            return Err(ProviderError::Parse(format!(
                "hourly series length mismatch: {} times, {} values",
                self.hourly.time.len(),
                self.hourly.precipitation.len()
            )));
        }
        if self.daily.time.is_empty() && self.hourly.time.is_empty() {
            return Err(ProviderError::Parse("empty precipitation series".to_string()));
        }
        Ok(())
    }
}

/// A nearby facility that could serve as an evacuation center
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Institution {
    pub id: String,
    pub name: String,
    pub address: String,
    pub coordinate: Coordinate,
}

/// A driving route as returned by the directions collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrivingRoute {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    /// Maneuver instructions in travel order; a blank entry is un-navigable
    pub step_instructions: Vec<String>,
    /// `[lon, lat]` pairs
    #[serde(default)]
    pub geometry: Vec<[f64; 2]>,
}

#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch_precipitation_series(
        &self,
        location: &Coordinate,
    ) -> Result<PrecipitationSeries, ProviderError>;
}

#[async_trait]
pub trait ElevationSource: Send + Sync {
    /// Meters above sea level, `None` when the terrain source has no sample
    async fn fetch_elevation(&self, coordinate: &Coordinate) -> Result<Option<f64>, ProviderError>;
}

#[async_trait]
pub trait WaterProximitySource: Send + Sync {
    /// Kilometers to the nearest water body, `None` when nothing was found
    async fn fetch_nearest_water_distance(
        &self,
        location: &Coordinate,
    ) -> Result<Option<f64>, ProviderError>;
}

#[async_trait]
pub trait PlaceDiscovery: Send + Sync {
    async fn discover_nearby_institutions(
        &self,
        location: &Coordinate,
        limit: usize,
    ) -> Result<Vec<Institution>, ProviderError>;
}

#[async_trait]
pub trait RoutingService: Send + Sync {
    /// Route visiting `waypoints` in order (origin first, destination last).
    /// `Ok(None)` means the service answered but found no route.
    async fn fetch_driving_route(
        &self,
        waypoints: &[Coordinate],
    ) -> Result<Option<DrivingRoute>, ProviderError>;
}

/// Collaborator set that is never reachable.
///
/// Drives every stage through its fallback path; used for offline mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

#[async_trait]
impl WeatherSource for Offline {
    async fn fetch_precipitation_series(
        &self,
        _location: &Coordinate,
    ) -> Result<PrecipitationSeries, ProviderError> {
        Err(ProviderError::Unavailable)
    }
}

#[async_trait]
impl ElevationSource for Offline {
    async fn fetch_elevation(&self, _coordinate: &Coordinate) -> Result<Option<f64>, ProviderError> {
        Err(ProviderError::Unavailable)
    }
}

#[async_trait]
impl WaterProximitySource for Offline {
    async fn fetch_nearest_water_distance(
        &self,
        _location: &Coordinate,
    ) -> Result<Option<f64>, ProviderError> {
        Err(ProviderError::Unavailable)
    }
}

#[async_trait]
impl PlaceDiscovery for Offline {
    async fn discover_nearby_institutions(
        &self,
        _location: &Coordinate,
        _limit: usize,
    ) -> Result<Vec<Institution>, ProviderError> {
        Err(ProviderError::Unavailable)
    }
}

#[async_trait]
impl RoutingService for Offline {
    async fn fetch_driving_route(
        &self,
        _waypoints: &[Coordinate],
    ) -> Result<Option<DrivingRoute>, ProviderError> {
        Err(ProviderError::Unavailable)
    }
}
