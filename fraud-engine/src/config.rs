//! Distance thresholds

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Fraud evaluation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FraudConfig {
    /// Suspicious above this distance when both sides are city codes
    pub city_threshold_km: f64,

    /// Suspicious above this distance when both sides are coordinates
    pub coordinate_threshold_km: f64,
}

impl Default for FraudConfig {
    fn default() -> Self {
        Self {
            city_threshold_km: 100.0,
            coordinate_threshold_km: 50.0,
        }
    }
}

impl FraudConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FraudConfig = toml::from_str(&content)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = FraudConfig::default();

        if let Ok(km) = std::env::var("ATLAS_FRAUD_CITY_KM") {
            config.city_threshold_km = parse_km("ATLAS_FRAUD_CITY_KM", &km)?;
        }

        if let Ok(km) = std::env::var("ATLAS_FRAUD_COORD_KM") {
            config.coordinate_threshold_km = parse_km("ATLAS_FRAUD_COORD_KM", &km)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Thresholds must be finite and positive
    pub fn validate(&self) -> Result<()> {
        for (name, km) in [
            ("city_threshold_km", self.city_threshold_km),
            ("coordinate_threshold_km", self.coordinate_threshold_km),
        ] {
            if !km.is_finite() || km <= 0.0 {
                return Err(Error::InvalidConfig(format!("{} must be > 0, got {}", name, km)));
            }
        }
        Ok(())
    }
}

fn parse_km(name: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse()
        .map_err(|e| Error::InvalidConfig(format!("Invalid {}='{}': {}", name, value, e)))
}
