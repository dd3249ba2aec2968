//! Engine configuration

use crate::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

/// Candidates requested from place discovery
pub const DEFAULT_DISCOVERY_LIMIT: usize = 10;

/// Upper bound on concurrent per-candidate lookups
pub const DEFAULT_MAX_CONCURRENT: usize = 10;

/// Centers returned by a ranking
pub const DEFAULT_MAX_CENTERS: usize = 5;

/// Baseline rainfall as a fraction of the observed total, in absence of climatology
pub const DEFAULT_BASELINE_FRACTION: f64 = 0.7;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub discovery_limit: usize,
    pub max_concurrent_lookups: usize,
    pub max_centers: usize,
    pub baseline_fraction: f64,
    /// Seed for synthetic occupancy; `None` draws from entropy per call
    pub occupancy_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            discovery_limit: DEFAULT_DISCOVERY_LIMIT,
            max_concurrent_lookups: DEFAULT_MAX_CONCURRENT,
            max_centers: DEFAULT_MAX_CENTERS,
            baseline_fraction: DEFAULT_BASELINE_FRACTION,
            occupancy_seed: None,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `FLOOD_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            discovery_limit: env_or("FLOOD_DISCOVERY_LIMIT", defaults.discovery_limit),
            max_concurrent_lookups: env_or("FLOOD_MAX_CONCURRENT", defaults.max_concurrent_lookups)
                .max(1),
            max_centers: defaults.max_centers,
            baseline_fraction: defaults.baseline_fraction,
            occupancy_seed: env_opt("FLOOD_OCCUPANCY_SEED"),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_lookups == 0 {
            return Err(EngineError::Config("max_concurrent_lookups must be at least 1".into()));
        }
        if self.max_centers == 0 {
            return Err(EngineError::Config("max_centers must be at least 1".into()));
        }
        if !(self.baseline_fraction.is_finite() && self.baseline_fraction >= 0.0) {
            return Err(EngineError::Config(format!(
                "baseline_fraction must be a non-negative number, got {}",
                self.baseline_fraction
            )));
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.occupancy_seed = Some(seed);
        self
    }
}

/// Parse an environment variable, keeping `default` when unset or malformed
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env_opt(key).unwrap_or(default)
}

/// Parse an optional environment variable; malformed values are logged and ignored
pub fn env_opt<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring unparseable {}={:?}", key, raw);
            None
        }
    }
}
