//! Flood engine facade
//!
//! Wires the pure stages in [`crate::weather`], [`crate::risk`],
//! [`crate::centers`] and [`crate::route`] to their collaborators. Every
//! operation returns a value: collaborator failures are logged and replaced
//! by the stage's fallback.

use crate::centers::{self, EvacuationCenter, SurveyedSite};
use crate::config::EngineConfig;
use crate::geo;
use crate::occupancy::TelemetryRng;
use crate::provider::{
    DrivingRoute, ElevationSource, Offline, PlaceDiscovery, ProviderError, RoutingService,
    WaterProximitySource, WeatherSource,
};
use crate::risk::{self, FloodRiskAssessment, RiskInputs, DEFAULT_ELEVATION_M, DEFAULT_WATER_PROXIMITY_KM};
use crate::route::{self, Route, RoutePlan};
use crate::weather::{self, WeatherData};
use crate::{Coordinate, Result};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The external data sources the engine consults
#[derive(Clone)]
pub struct Collaborators {
    pub weather: Arc<dyn WeatherSource>,
    pub elevation: Arc<dyn ElevationSource>,
    pub water: Arc<dyn WaterProximitySource>,
    pub places: Arc<dyn PlaceDiscovery>,
    pub routing: Arc<dyn RoutingService>,
}

impl Collaborators {
    /// Every collaborator unreachable
    pub fn offline() -> Self {
        let offline = Arc::new(Offline);
        Self {
            weather: offline.clone(),
            elevation: offline.clone(),
            water: offline.clone(),
            places: offline.clone(),
            routing: offline,
        }
    }
}

/// Stateless, reentrant flood decision engine.
///
/// Cheap to clone; concurrent requests share the collaborators.
#[derive(Clone)]
pub struct FloodEngine {
    config: EngineConfig,
    sources: Collaborators,
}

impl FloodEngine {
    pub fn new(config: EngineConfig, sources: Collaborators) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, sources })
    }

    /// Engine that answers everything from fallbacks
    pub fn offline(config: EngineConfig) -> Result<Self> {
        Self::new(config, Collaborators::offline())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn compute_weather_summary(&self, location: &Coordinate) -> WeatherData {
        self.compute_weather_summary_at(location, Utc::now()).await
    }

    /// Weather summary relative to an explicit clock
    pub async fn compute_weather_summary_at(&self, location: &Coordinate, now: DateTime<Utc>) -> WeatherData {
        let series = self
            .sources
            .weather
            .fetch_precipitation_series(location)
            .await
            .and_then(|series| series.validate().map(|()| series));

        match series {
            Ok(series) => weather::summarize(&series, now, self.config.baseline_fraction),
            Err(e) => {
                warn!(
                    "Weather unavailable for ({:.4}, {:.4}), using fallback data: {}",
                    location.latitude, location.longitude, e
                );
                weather::fallback_weather(now)
            }
        }
    }

    pub async fn compute_flood_risk(&self, location: &Coordinate, weather: &WeatherData) -> FloodRiskAssessment {
        let (elevation, water) = futures::join!(
            self.sources.elevation.fetch_elevation(location),
            self.sources.water.fetch_nearest_water_distance(location)
        );

        let elevation = resolve(elevation, DEFAULT_ELEVATION_M, "elevation");
        let water_proximity = resolve(water, DEFAULT_WATER_PROXIMITY_KM, "water proximity");

        let inputs = RiskInputs::from_weather(weather, elevation, water_proximity);
        match risk::assess(&inputs) {
            Ok(assessment) => {
                debug!(
                    "Risk {:.0} at ({:.4}, {:.4}) from elevation {:.0} m, water {:.2} km",
                    assessment.risk_score, location.latitude, location.longitude, elevation, water_proximity
                );
                assessment
            }
            Err(e) => {
                warn!("Risk scoring failed, using static assessment: {}", e);
                risk::fallback_assessment(inputs.recent_rainfall)
            }
        }
    }

    pub async fn rank_evacuation_centers(&self, location: &Coordinate) -> Vec<EvacuationCenter> {
        let mut rng = TelemetryRng::new(self.config.occupancy_seed);

        let institutions = match self
            .sources
            .places
            .discover_nearby_institutions(location, self.config.discovery_limit)
            .await
        {
            Ok(found) if !found.is_empty() => found,
            Ok(_) => {
                info!("No institutions discovered nearby, using curated shelters");
                return centers::fallback_centers(location, self.config.max_centers, &mut rng);
            }
            Err(e) => {
                warn!("Place discovery failed, using curated shelters: {}", e);
                return centers::fallback_centers(location, self.config.max_centers, &mut rng);
            }
        };

        let elevation = &self.sources.elevation;
        let sites: Vec<SurveyedSite> = stream::iter(institutions)
            .map(|institution| async move {
                let sample = elevation.fetch_elevation(&institution.coordinate).await;
                let elevation = match sample {
                    Ok(Some(meters)) => meters,
                    Ok(None) => DEFAULT_ELEVATION_M,
                    Err(e) => {
                        debug!("Elevation unavailable for {}: {}", institution.name, e);
                        DEFAULT_ELEVATION_M
                    }
                };
                SurveyedSite { institution, elevation }
            })
            .buffered(self.config.max_concurrent_lookups)
            .collect()
            .await;

        centers::rank(location, sites, self.config.max_centers, &mut rng)
    }

    /// Single scored route from `location` to `center`
    pub async fn score_route(
        &self,
        location: &Coordinate,
        center: &EvacuationCenter,
        risk: &FloodRiskAssessment,
    ) -> Route {
        let destination = center.coordinate();
        match self.sources.routing.fetch_driving_route(&[*location, destination]).await {
            Ok(driving) => route::from_driving_route(location, center, risk, driving),
            Err(e) => {
                warn!("Directions to {} failed: {}", center.name, e);
                let detour = match geo::alternative_waypoint(location, &destination) {
                    Some(waypoint) => Some(
                        self.sources
                            .routing
                            .fetch_driving_route(&[*location, waypoint, destination])
                            .await,
                    ),
                    None => None,
                };
                primary_from_detour(location, center, risk, detour)
            }
        }
    }

    /// Direct route plus an offset-waypoint alternative, requested concurrently
    pub async fn plan_routes(
        &self,
        location: &Coordinate,
        center: &EvacuationCenter,
        risk: &FloodRiskAssessment,
    ) -> RoutePlan {
        let destination = center.coordinate();
        let waypoint = geo::alternative_waypoint(location, &destination);

        let direct_waypoints = [*location, destination];
        let direct = self.sources.routing.fetch_driving_route(&direct_waypoints);
        let detour = async {
            match waypoint {
                Some(waypoint) => Some(
                    self.sources
                        .routing
                        .fetch_driving_route(&[*location, waypoint, destination])
                        .await,
                ),
                None => None,
            }
        };
        let (direct, detour) = futures::join!(direct, detour);

        match direct {
            Ok(driving) => {
                let primary = route::from_driving_route(location, center, risk, driving);
                let alternative = match detour {
                    Some(Ok(Some(driving))) if route::navigable(&driving) => {
                        Some(route::from_driving_route(location, center, risk, Some(driving)))
                    }
                    Some(Err(e)) => {
                        debug!("Alternative route to {} unavailable: {}", center.name, e);
                        None
                    }
                    _ => None,
                };
                RoutePlan { primary, alternative }
            }
            Err(e) => {
                warn!("Directions to {} failed: {}", center.name, e);
                RoutePlan {
                    primary: primary_from_detour(location, center, risk, detour),
                    alternative: None,
                }
            }
        }
    }
}

fn resolve(sample: std::result::Result<Option<f64>, ProviderError>, default: f64, what: &str) -> f64 {
    match sample {
        Ok(Some(value)) => value,
        Ok(None) => {
            debug!("No {} sample, defaulting to {}", what, default);
            default
        }
        Err(e) => {
            warn!("{} lookup failed, defaulting to {}: {}", what, default, e);
            default
        }
    }
}

/// Primary route once the direct request has failed outright
fn primary_from_detour(
    location: &Coordinate,
    center: &EvacuationCenter,
    risk: &FloodRiskAssessment,
    detour: Option<std::result::Result<Option<DrivingRoute>, ProviderError>>,
) -> Route {
    match detour {
        Some(Ok(driving)) => {
            info!("Routing to {} via offset waypoint", center.name);
            route::from_driving_route(location, center, risk, driving)
        }
        Some(Err(e)) => {
            warn!("All routing to {} failed, using cautionary route: {}", center.name, e);
            route::unreachable_route(center)
        }
        None => {
            warn!("Routing to {} failed, using cautionary route", center.name);
            route::unreachable_route(center)
        }
    }
}
