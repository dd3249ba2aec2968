//! Live HTTP collaborators
//!
//! Open-Meteo supplies precipitation (free, no key). Mapbox supplies terrain
//! elevation, water features, nearby institutions and driving directions and
//! needs an access token; without one every Mapbox call reports
//! [`ProviderError::MissingToken`] and the engine falls back.
//!
//! # Usage
//!
//! ```rust,ignore
//! let providers = ProviderConfig::from_env();
//! let engine = FloodEngine::new(EngineConfig::from_env(), live_collaborators(&providers)?)?;
//! ```

mod mapbox;
mod open_meteo;

pub use mapbox::MapboxClient;
pub use open_meteo::OpenMeteo;

use crate::config::{env_opt, env_or};
use crate::engine::Collaborators;
use crate::provider::ProviderError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub mapbox_token: Option<String>,
    /// Cache TTL for precipitation series (default: 300 = 5 minutes)
    pub weather_cache_ttl_sec: u64,
    /// Per-request timeout in seconds
    pub timeout_sec: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            mapbox_token: None,
            weather_cache_ttl_sec: 300,
            timeout_sec: 10,
        }
    }
}

impl ProviderConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            mapbox_token: env_opt::<String>("MAPBOX_TOKEN").filter(|token| !token.trim().is_empty()),
            weather_cache_ttl_sec: env_or("FLOOD_WEATHER_CACHE_TTL_SEC", defaults.weather_cache_ttl_sec),
            timeout_sec: env_or("FLOOD_TIMEOUT_SEC", defaults.timeout_sec),
        }
    }
}

/// Open-Meteo for weather, Mapbox for everything else
pub fn live_collaborators(config: &ProviderConfig) -> Result<Collaborators, ProviderError> {
    let client = http_client(config.timeout_sec)?;
    let mapbox = Arc::new(MapboxClient::new(client.clone(), config.mapbox_token.clone()));

    Ok(Collaborators {
        weather: Arc::new(OpenMeteo::new(
            client,
            Duration::from_secs(config.weather_cache_ttl_sec),
        )),
        elevation: mapbox.clone(),
        water: mapbox.clone(),
        places: mapbox.clone(),
        routing: mapbox,
    })
}

pub fn http_client(timeout_sec: u64) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_sec))
        .build()
        .map_err(|e| ProviderError::RequestFailed(format!("HTTP client: {}", e)))
}

/// GET and decode a JSON body
async fn get_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    upstream: &str,
) -> Result<T, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::RequestFailed(format!("{}: {}", upstream, e)))?;

    let status = response.status();
    if !status.is_success() {
        debug!("{} returned status {}", upstream, status);
        return Err(ProviderError::Status(status.as_u16()));
    }

    response
        .json()
        .await
        .map_err(|e| ProviderError::Parse(format!("{}: {}", upstream, e)))
}
