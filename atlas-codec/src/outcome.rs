//! Best-effort results
//!
//! The codec never returns an error for malformed input. Instead it hands
//! back a usable value together with every degradation it applied, so the
//! caller decides whether degraded output is worth an alert.

use serde::Serialize;
use std::fmt;

use crate::types::EventType;

/// A lossy or fallback step taken while transforming a payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// Input was not a JSON object; returned unchanged
    NotAnObject,
    /// No `eventType` key; returned unchanged
    MissingEventType,
    /// `eventType` not recognised; returned unchanged
    UnknownEventType {
        /// Raw value found
        value: String,
    },
    /// Event type has no compressor; returned unchanged
    NoCompressor {
        /// The event type
        event_type: EventType,
    },
    /// Timestamp field could not be parsed and was omitted or kept raw
    InvalidTimestamp {
        /// Full-form field name
        field: &'static str,
    },
    /// Count field was not a non-negative integer; default used
    InvalidCount {
        /// Full-form field name
        field: &'static str,
    },
    /// Hash was not hex; best-effort prefix used
    NonHexHash {
        /// Full-form field name
        field: &'static str,
    },
    /// Truncated hash missing from the lookup table (purged or unavailable)
    LookupMiss {
        /// Full-form field name
        field: &'static str,
        /// Truncated value kept
        truncated: String,
    },
    /// Payment method not recognised; omitted or kept raw
    UnknownPaymentMethod {
        /// Raw value found
        value: String,
    },
    /// Amount was not numeric; omitted
    InvalidAmount,
    /// Geotag could not be parsed; fallback city code used
    MalformedGeotag,
    /// `validUntil` precedes `timestamp`
    ValidUntilBeforeTimestamp,
    /// `dispenseCount` exceeds `maxDispenses`
    DispenseCountExceedsMax {
        /// Dispenses performed
        dispense_count: u32,
        /// Dispenses allowed
        max_dispenses: u32,
    },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::NotAnObject => write!(f, "payload is not a JSON object"),
            Degradation::MissingEventType => write!(f, "payload has no eventType"),
            Degradation::UnknownEventType { value } => write!(f, "unknown event type '{}'", value),
            Degradation::NoCompressor { event_type } => {
                write!(f, "no compressor for event type '{}'", event_type)
            }
            Degradation::InvalidTimestamp { field } => write!(f, "invalid timestamp in {}", field),
            Degradation::InvalidCount { field } => write!(f, "invalid count in {}", field),
            Degradation::NonHexHash { field } => write!(f, "non-hex hash in {}", field),
            Degradation::LookupMiss { field, truncated } => {
                write!(f, "no lookup entry for {} '{}'", field, truncated)
            }
            Degradation::UnknownPaymentMethod { value } => {
                write!(f, "unknown payment method '{}'", value)
            }
            Degradation::InvalidAmount => write!(f, "amountMAD is not numeric"),
            Degradation::MalformedGeotag => write!(f, "malformed geoTag"),
            Degradation::ValidUntilBeforeTimestamp => write!(f, "validUntil precedes timestamp"),
            Degradation::DispenseCountExceedsMax {
                dispense_count,
                max_dispenses,
            } => write!(
                f,
                "dispenseCount {} exceeds maxDispenses {}",
                dispense_count, max_dispenses
            ),
        }
    }
}

/// Value produced by a best-effort transform
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    /// Usable output
    pub value: T,

    /// Degradations applied, empty for a clean transform
    pub degradations: Vec<Degradation>,
}

impl<T> Outcome<T> {
    /// Clean result
    pub fn clean(value: T) -> Self {
        Self {
            value,
            degradations: Vec::new(),
        }
    }

    /// Result with degradations
    pub fn degraded(value: T, degradations: Vec<Degradation>) -> Self {
        Self {
            value,
            degradations,
        }
    }

    /// Whether any degradation was applied
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    /// Drop the degradation list
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Transform the value, keeping degradations
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            degradations: self.degradations,
        }
    }
}
