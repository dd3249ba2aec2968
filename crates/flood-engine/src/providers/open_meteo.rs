use super::get_json;
use crate::provider::{DailySeries, HourlySeries, PrecipitationSeries, ProviderError, WeatherSource};
use crate::Coordinate;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    utc_offset_seconds: i32,
    daily: DailyBlock,
    hourly: HourlyBlock,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<String>,
    precipitation_sum: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    time: Vec<String>,
    precipitation: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_probability: Vec<Option<f64>>,
}

struct CacheEntry {
    series: PrecipitationSeries,
    expires_at: Instant,
}

/// Open-Meteo precipitation client: 30 past days, 7 forecast days
pub struct OpenMeteo {
    client: reqwest::Client,
    cache_ttl: Duration,
    cache: RwLock<HashMap<String, CacheEntry>>,
}

impl OpenMeteo {
    pub fn new(client: reqwest::Client, cache_ttl: Duration) -> Self {
        Self {
            client,
            cache_ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Coordinates rounded to 2 decimal places (~1 km)
    fn cache_key(location: &Coordinate) -> String {
        format!("{:.2},{:.2}", location.latitude, location.longitude)
    }
}

#[async_trait]
impl WeatherSource for OpenMeteo {
    async fn fetch_precipitation_series(
        &self,
        location: &Coordinate,
    ) -> Result<PrecipitationSeries, ProviderError> {
        let key = Self::cache_key(location);

        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(&key) {
                if entry.expires_at > Instant::now() {
                    debug!("Open-Meteo cache hit for {}", key);
                    return Ok(entry.series.clone());
                }
            }
        }

        let request = self.client.get(FORECAST_URL).query(&[
            ("latitude", format!("{:.6}", location.latitude)),
            ("longitude", format!("{:.6}", location.longitude)),
            ("hourly", "precipitation,precipitation_probability".to_string()),
            ("daily", "precipitation_sum".to_string()),
            ("past_days", "30".to_string()),
            ("forecast_days", "7".to_string()),
            ("timezone", "auto".to_string()),
        ]);
        let response: ForecastResponse = get_json(request, "Open-Meteo").await?;
        let series = into_series(response)?;

        {
            let mut cache = self.cache.write().await;
            cache.retain(|_, entry| entry.expires_at > Instant::now());
            cache.insert(
                key,
                CacheEntry {
                    series: series.clone(),
                    expires_at: Instant::now() + self.cache_ttl,
                },
            );
        }

        Ok(series)
    }
}

/// Missing samples (`null`) count as no rain
fn into_series(response: ForecastResponse) -> Result<PrecipitationSeries, ProviderError> {
    let daily_time = response
        .daily
        .time
        .iter()
        .map(|t| {
            NaiveDate::parse_from_str(t, "%Y-%m-%d")
                .map_err(|e| ProviderError::Parse(format!("daily time {:?}: {}", t, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let hourly_time = response
        .hourly
        .time
        .iter()
        .map(|t| {
            NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M")
                .map_err(|e| ProviderError::Parse(format!("hourly time {:?}: {}", t, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let series = PrecipitationSeries {
        utc_offset_seconds: response.utc_offset_seconds,
        daily: DailySeries {
            time: daily_time,
            precipitation_sum: response
                .daily
                .precipitation_sum
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect(),
        },
        hourly: HourlySeries {
            time: hourly_time,
            precipitation: response
                .hourly
                .precipitation
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect(),
            precipitation_probability: response
                .hourly
                .precipitation_probability
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect(),
        },
    };

    series.validate()?;
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "latitude": 12.92,
        "longitude": 79.13,
        "utc_offset_seconds": 19800,
        "timezone": "Asia/Kolkata",
        "daily": {
            "time": ["2026-10-17", "2026-10-18"],
            "precipitation_sum": [4.2, null]
        },
        "hourly": {
            "time": ["2026-10-18T00:00", "2026-10-18T01:00", "2026-10-18T02:00"],
            "precipitation": [0.0, 1.5, null],
            "precipitation_probability": [null, 60, 85]
        }
    }"#;

    #[test]
    fn test_parses_forecast_payload() {
        let response: ForecastResponse = serde_json::from_str(SAMPLE).unwrap();
        let series = into_series(response).unwrap();

        assert_eq!(series.utc_offset_seconds, 19800);
        assert_eq!(series.daily.precipitation_sum, vec![4.2, 0.0]);
        assert_eq!(series.hourly.time.len(), 3);
        assert_eq!(series.hourly.precipitation, vec![0.0, 1.5, 0.0]);
        assert_eq!(series.hourly.precipitation_probability, vec![0.0, 60.0, 85.0]);
    }

    #[test]
    fn test_rejects_bad_timestamps() {
        let bad = SAMPLE.replace("2026-10-18T01:00", "yesterday");
        let response: ForecastResponse = serde_json::from_str(&bad).unwrap();
        assert!(matches!(into_series(response), Err(ProviderError::Parse(_))));
    }

    #[test]
    fn test_cache_key_rounds_to_two_decimals() {
        let a = Coordinate::new(12.9165, 79.1325);
        let b = Coordinate::new(12.9249, 79.1349);
        assert_eq!(OpenMeteo::cache_key(&a), "12.92,79.13");
        assert_eq!(OpenMeteo::cache_key(&a), OpenMeteo::cache_key(&b));
    }
}
