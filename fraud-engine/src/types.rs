//! Core types for fraud engine

use atlas_codec::geotag::Coordinates;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A location as found on an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeoInput {
    /// City code (may be outside the catalogue)
    City {
        /// The code
        code: String,
    },
    /// Precise coordinates
    Coordinates(Coordinates),
    /// Missing or unparseable
    Unparsed {
        /// Raw JSON text
        raw: String,
    },
}

impl GeoInput {
    /// Parse a geotag string: `"lat,lng"` or a city code
    pub fn parse(s: &str) -> Self {
        match Coordinates::parse(s) {
            Some(point) => GeoInput::Coordinates(point),
            None if !s.trim().is_empty() => GeoInput::City {
                code: s.trim().to_string(),
            },
            None => GeoInput::Unparsed { raw: s.to_string() },
        }
    }

    /// Read a geotag JSON value: string or `{lat, lng}`
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::parse(s),
            other => match Coordinates::from_value(other) {
                Some(point) => GeoInput::Coordinates(point),
                None => GeoInput::Unparsed {
                    raw: other.to_string(),
                },
            },
        }
    }
}

impl From<&str> for GeoInput {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

/// How the two locations were compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    /// Both city codes
    City,
    /// Both coordinates
    Coordinates,
    /// One city code, one coordinate pair
    Mixed,
    /// At least one side unparsed
    Unresolved,
}

/// Impossible-travel report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudReport {
    /// Travel looks implausible
    pub suspicious: bool,

    /// Distance in km, `None` when it cannot be determined
    pub distance_km: Option<f64>,

    /// Human-readable explanation
    pub reason: String,

    /// Comparison mode used
    pub mode: ComparisonMode,

    /// Parsed issuance location
    pub issue_location: GeoInput,

    /// Parsed verification location
    pub verify_location: GeoInput,

    /// Evaluation timestamp
    pub evaluated_at: DateTime<Utc>,
}

impl FraudReport {
    /// Whether a distance could be computed
    pub fn is_determined(&self) -> bool {
        self.distance_km.is_some()
    }
}
