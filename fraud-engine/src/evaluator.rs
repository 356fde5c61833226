//! Impossible-travel evaluation
//!
//! City codes are compared by the distance between catalogue centers against
//! a loose threshold; raw coordinates by direct distance against a tighter
//! one. An unknown city or a city/coordinate mix is reported as "cannot
//! determine" and never flagged.

use atlas_codec::geotag::distance_between_cities;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::FraudConfig;
use crate::types::{ComparisonMode, FraudReport, GeoInput};
use crate::Result;

/// Full-form geotag key
const GEO_TAG: &str = "geoTag";
/// Wire-form geotag key
const GEO_TAG_SHORT: &str = "g";

/// Fraud evaluator
#[derive(Debug, Clone, Default)]
pub struct FraudEvaluator {
    config: FraudConfig,
}

impl FraudEvaluator {
    /// Create new evaluator
    pub fn new(config: FraudConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active thresholds
    pub fn config(&self) -> &FraudConfig {
        &self.config
    }

    /// Compare two geotag strings (city codes or `"lat,lng"`)
    pub fn check_fraud(&self, issue_geotag: &str, verify_geotag: &str) -> FraudReport {
        self.check(GeoInput::parse(issue_geotag), GeoInput::parse(verify_geotag))
    }

    /// Compare two parsed locations
    pub fn check(&self, issue: GeoInput, verify: GeoInput) -> FraudReport {
        let (mode, distance_km, suspicious, reason) = match (&issue, &verify) {
            (GeoInput::City { code: a }, GeoInput::City { code: b }) => {
                match distance_between_cities(a, b) {
                    Some(d) if d == 0.0 => (ComparisonMode::City, Some(d), false, "Same city".to_string()),
                    Some(d) if d > self.config.city_threshold_km => (
                        ComparisonMode::City,
                        Some(d),
                        true,
                        format!(
                            "{} to {} is {:.0} km, above the {:.0} km city threshold",
                            a, b, d, self.config.city_threshold_km
                        ),
                    ),
                    Some(d) => (
                        ComparisonMode::City,
                        Some(d),
                        false,
                        format!("{} to {} is {:.0} km, within threshold", a, b, d),
                    ),
                    None => (
                        ComparisonMode::City,
                        None,
                        false,
                        format!("Cannot determine distance: unrecognized city code in {}/{}", a, b),
                    ),
                }
            }
            (GeoInput::Coordinates(a), GeoInput::Coordinates(b)) => {
                let d = a.distance_km(b);
                if d > self.config.coordinate_threshold_km {
                    (
                        ComparisonMode::Coordinates,
                        Some(d),
                        true,
                        format!(
                            "Locations are {:.1} km apart, above the {:.0} km coordinate threshold",
                            d, self.config.coordinate_threshold_km
                        ),
                    )
                } else {
                    (
                        ComparisonMode::Coordinates,
                        Some(d),
                        false,
                        format!("Locations are {:.1} km apart, within threshold", d),
                    )
                }
            }
            (GeoInput::City { .. }, GeoInput::Coordinates(_))
            | (GeoInput::Coordinates(_), GeoInput::City { .. }) => (
                ComparisonMode::Mixed,
                None,
                false,
                "Cannot determine: city code compared with raw coordinates".to_string(),
            ),
            (GeoInput::Unparsed { .. }, _) | (_, GeoInput::Unparsed { .. }) => (
                ComparisonMode::Unresolved,
                None,
                false,
                "Cannot determine: missing or malformed geotag".to_string(),
            ),
        };

        if suspicious {
            warn!("Impossible travel flagged: {}", reason);
        } else {
            debug!("Travel check passed: {}", reason);
        }

        FraudReport {
            suspicious,
            distance_km,
            reason,
            mode,
            issue_location: issue,
            verify_location: verify,
            evaluated_at: chrono::Utc::now(),
        }
    }

    /// Compare the geotags of an issuance event and a later event
    ///
    /// Accepts full-form (`geoTag`) or wire-form (`g`) payloads.
    pub fn evaluate_events(&self, issued: &Value, later: &Value) -> FraudReport {
        self.check(geotag_of(issued), geotag_of(later))
    }
}

fn geotag_of(event: &Value) -> GeoInput {
    event
        .get(GEO_TAG)
        .or_else(|| event.get(GEO_TAG_SHORT))
        .map_or_else(|| GeoInput::from_value(&Value::Null), GeoInput::from_value)
}
