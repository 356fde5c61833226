//! Core types for prescription lifecycle events
//!
//! Full-form events are built by the application layer as JSON; the codec
//! reads them into these types before reducing them to the wire form.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// Prescription issued by a prescriber
    Issued,
    /// Prescription verified by a pharmacist
    Verified,
    /// Prescription paid
    Paid,
    /// Medication dispensed
    Dispensed,
    /// Prescription cancelled (no wire compressor)
    Cancelled,
}

impl EventType {
    /// All event types
    pub const ALL: [EventType; 5] = [
        EventType::Issued,
        EventType::Verified,
        EventType::Paid,
        EventType::Dispensed,
        EventType::Cancelled,
    ];

    /// Long-form name
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Issued => "issued",
            EventType::Verified => "verified",
            EventType::Paid => "paid",
            EventType::Dispensed => "dispensed",
            EventType::Cancelled => "cancelled",
        }
    }

    /// Single-character wire code
    pub fn wire_code(&self) -> char {
        match self {
            EventType::Issued => 'i',
            EventType::Verified => 'v',
            EventType::Paid => 'p',
            EventType::Dispensed => 'd',
            EventType::Cancelled => 'c',
        }
    }

    /// Parse the long form
    pub fn from_long(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Parse the wire code
    pub fn from_wire_code(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::ALL.into_iter().find(|t| t.wire_code() == c),
            _ => None,
        }
    }

    /// Parse either the long form or the wire code
    pub fn parse(s: &str) -> Option<Self> {
        Self::from_long(s).or_else(|| Self::from_wire_code(s))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PaymentMethod {
    /// Cash at the counter
    Cash = 1,
    /// Card payment
    Card = 2,
    /// Ledger-native token payment
    Hbar = 3,
}

impl PaymentMethod {
    /// All payment methods
    pub const ALL: [PaymentMethod; 3] = [PaymentMethod::Cash, PaymentMethod::Card, PaymentMethod::Hbar];

    /// Long-form name
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Hbar => "hbar",
        }
    }

    /// Integer wire code
    pub fn wire_code(&self) -> u8 {
        *self as u8
    }

    /// Parse the long form
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == s)
    }

    /// Parse the wire code
    pub fn from_wire_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|m| i64::from(m.wire_code()) == code)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fields shared by every event variant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    /// Ledger topic (one per prescription)
    pub topic_id: Option<String>,

    /// When the event was recorded
    pub timestamp: Option<DateTime<Utc>>,

    /// Replay-prevention token
    pub nonce: Option<String>,

    /// Hex signature, possibly `hex:` prefixed
    pub signature: Option<String>,
}

/// Prescription issued
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedEvent {
    /// Common envelope
    pub envelope: Envelope,
    /// Expiry of the prescription
    pub valid_until: Option<DateTime<Utc>>,
    /// City code of the issuing location
    pub geo_tag: &'static str,
    /// sha256 of the patient identifier
    pub hashed_patient_id: Option<String>,
    /// Dispenses allowed
    pub max_dispenses: u32,
    /// Dispenses performed
    pub dispense_count: u32,
}

/// Prescription verified
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedEvent {
    /// Common envelope
    pub envelope: Envelope,
    /// Hash of the verifying actor
    pub actor_id_hash: Option<String>,
    /// Hash of the preceding event
    pub prev_event_hash: Option<String>,
    /// Dispenses performed
    pub dispense_count: u32,
    /// Dispenses allowed
    pub max_dispenses: u32,
    /// Impossible-travel alert raised at verification
    pub fraud_alert: bool,
}

/// Prescription paid
#[derive(Debug, Clone, PartialEq)]
pub struct PaidEvent {
    /// Common envelope
    pub envelope: Envelope,
    /// Hash of the collecting actor
    pub actor_id_hash: Option<String>,
    /// Hash of the preceding event
    pub prev_event_hash: Option<String>,
    /// Amount in dirhams
    pub amount_mad: Option<Decimal>,
    /// Payment method
    pub method: Option<PaymentMethod>,
}

/// Medication dispensed
#[derive(Debug, Clone, PartialEq)]
pub struct DispensedEvent {
    /// Common envelope
    pub envelope: Envelope,
    /// Hash of the dispensing actor
    pub actor_id_hash: Option<String>,
    /// Hash of the preceding event
    pub prev_event_hash: Option<String>,
    /// Dispenses performed, including this one
    pub dispense_count: u32,
    /// Dispenses allowed
    pub max_dispenses: u32,
}

/// A compressible lifecycle event
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Issued variant
    Issued(IssuedEvent),
    /// Verified variant
    Verified(VerifiedEvent),
    /// Paid variant
    Paid(PaidEvent),
    /// Dispensed variant
    Dispensed(DispensedEvent),
}

impl Event {
    /// Event type of this variant
    pub fn event_type(&self) -> EventType {
        match self {
            Event::Issued(_) => EventType::Issued,
            Event::Verified(_) => EventType::Verified,
            Event::Paid(_) => EventType::Paid,
            Event::Dispensed(_) => EventType::Dispensed,
        }
    }

    /// Common envelope
    pub fn envelope(&self) -> &Envelope {
        match self {
            Event::Issued(e) => &e.envelope,
            Event::Verified(e) => &e.envelope,
            Event::Paid(e) => &e.envelope,
            Event::Dispensed(e) => &e.envelope,
        }
    }
}
