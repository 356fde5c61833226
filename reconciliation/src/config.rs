//! Reconciliation timing and bounds

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Error, Result};

/// Reconciliation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Delay before each confirmation check; the last value repeats
    pub retry_delays_secs: Vec<u64>,

    /// Confirmation checks before giving up
    pub max_retries: u32,

    /// Age after which a dispense lock is considered abandoned
    pub lock_timeout_secs: u64,

    /// Interval between background sweeps
    pub sweep_interval_secs: u64,

    /// Upper bound on tracked confirmation records
    pub max_tracked_topics: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            retry_delays_secs: vec![2, 5, 10, 20, 30],
            max_retries: 5,
            lock_timeout_secs: 30,
            sweep_interval_secs: 60,
            max_tracked_topics: 10_000,
        }
    }
}

impl ReconcileConfig {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ReconcileConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = ReconcileConfig::default();

        if let Ok(secs) = std::env::var("ATLAS_LOCK_TIMEOUT_SECS") {
            config.lock_timeout_secs = parse_env("ATLAS_LOCK_TIMEOUT_SECS", &secs)?;
        }

        if let Ok(secs) = std::env::var("ATLAS_SWEEP_INTERVAL_SECS") {
            config.sweep_interval_secs = parse_env("ATLAS_SWEEP_INTERVAL_SECS", &secs)?;
        }

        if let Ok(n) = std::env::var("ATLAS_MAX_TRACKED_TOPICS") {
            config.max_tracked_topics = parse_env("ATLAS_MAX_TRACKED_TOPICS", &n)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.retry_delays_secs.is_empty() {
            return Err(Error::Config("retry_delays_secs must not be empty".to_string()));
        }
        if self.max_retries == 0 {
            return Err(Error::Config("max_retries must be > 0".to_string()));
        }
        if self.sweep_interval_secs == 0 {
            return Err(Error::Config("sweep_interval_secs must be > 0".to_string()));
        }
        if self.max_tracked_topics == 0 {
            return Err(Error::Config("max_tracked_topics must be > 0".to_string()));
        }
        Ok(())
    }

    /// Lock timeout
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    /// Sweep interval
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid {}='{}': {}", name, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReconcileConfig::default();
        assert_eq!(config.retry_delays_secs, vec![2, 5, 10, 20, 30]);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.lock_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_schedule_rejected() {
        let config = ReconcileConfig {
            retry_delays_secs: vec![],
            ..ReconcileConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_retries_rejected() {
        let config = ReconcileConfig {
            max_retries: 0,
            ..ReconcileConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
