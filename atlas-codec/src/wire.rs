//! Wire form: short-keyed JSON submitted to the ledger
//!
//! The key table is fixed. Previously emitted messages are decoded with it,
//! so a key must never be renamed or reused.

use serde::{Deserialize, Serialize};

/// A field of the wire form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireField {
    /// `eventType` → `e`
    EventType,
    /// `topicID` → `t`
    TopicId,
    /// `timestamp` → `ts`
    Timestamp,
    /// `nonce` → `n`
    Nonce,
    /// `signature` → `s`
    Signature,
    /// `validUntil` → `u`
    ValidUntil,
    /// `geoTag` → `g`
    GeoTag,
    /// `hashedPatientId` → `h`
    HashedPatientId,
    /// `amountMAD` → `amt`
    AmountMad,
    /// `method` → `m`
    Method,
    /// `prevEventHash` → `p`
    PrevEventHash,
    /// `actorIdHash` → `a`
    ActorIdHash,
    /// `maxDispenses` → `md`
    MaxDispenses,
    /// `dispenseCount` → `dc`
    DispenseCount,
    /// `fraudAlert` → `f`
    FraudAlert,
}

impl WireField {
    /// All fields in table order
    pub const ALL: [WireField; 15] = [
        WireField::EventType,
        WireField::TopicId,
        WireField::Timestamp,
        WireField::Nonce,
        WireField::Signature,
        WireField::ValidUntil,
        WireField::GeoTag,
        WireField::HashedPatientId,
        WireField::AmountMad,
        WireField::Method,
        WireField::PrevEventHash,
        WireField::ActorIdHash,
        WireField::MaxDispenses,
        WireField::DispenseCount,
        WireField::FraudAlert,
    ];

    /// Full-form key
    pub fn long_name(&self) -> &'static str {
        match self {
            WireField::EventType => "eventType",
            WireField::TopicId => "topicID",
            WireField::Timestamp => "timestamp",
            WireField::Nonce => "nonce",
            WireField::Signature => "signature",
            WireField::ValidUntil => "validUntil",
            WireField::GeoTag => "geoTag",
            WireField::HashedPatientId => "hashedPatientId",
            WireField::AmountMad => "amountMAD",
            WireField::Method => "method",
            WireField::PrevEventHash => "prevEventHash",
            WireField::ActorIdHash => "actorIdHash",
            WireField::MaxDispenses => "maxDispenses",
            WireField::DispenseCount => "dispenseCount",
            WireField::FraudAlert => "fraudAlert",
        }
    }

    /// Wire key
    pub fn short_key(&self) -> &'static str {
        match self {
            WireField::EventType => "e",
            WireField::TopicId => "t",
            WireField::Timestamp => "ts",
            WireField::Nonce => "n",
            WireField::Signature => "s",
            WireField::ValidUntil => "u",
            WireField::GeoTag => "g",
            WireField::HashedPatientId => "h",
            WireField::AmountMad => "amt",
            WireField::Method => "m",
            WireField::PrevEventHash => "p",
            WireField::ActorIdHash => "a",
            WireField::MaxDispenses => "md",
            WireField::DispenseCount => "dc",
            WireField::FraudAlert => "f",
        }
    }

    /// Look up a field by wire key
    pub fn from_short_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.short_key() == key)
    }

    /// Look up a field by full-form key
    pub fn from_long_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.long_name() == name)
    }

    /// Whether the value is a truncated hash needing lookup on decode
    pub fn is_hashed(&self) -> bool {
        matches!(
            self,
            WireField::HashedPatientId | WireField::ActorIdHash | WireField::PrevEventHash
        )
    }
}

/// Compressed event as submitted to the ledger
///
/// Absent fields are omitted from the serialized form, never emitted as null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    /// Event type code
    #[serde(rename = "e")]
    pub event_code: char,

    /// Topic identifier
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,

    /// Unix seconds
    #[serde(rename = "ts", default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    /// Nonce prefix
    #[serde(rename = "n", default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Signature hex without prefix
    #[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// Unix seconds
    #[serde(rename = "u", default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<i64>,

    /// City code
    #[serde(rename = "g", default, skip_serializing_if = "Option::is_none")]
    pub geo_tag: Option<String>,

    /// Truncated patient hash
    #[serde(rename = "h", default, skip_serializing_if = "Option::is_none")]
    pub hashed_patient_id: Option<String>,

    /// Whole dirhams
    #[serde(rename = "amt", default, skip_serializing_if = "Option::is_none")]
    pub amount_mad: Option<i64>,

    /// Payment method code
    #[serde(rename = "m", default, skip_serializing_if = "Option::is_none")]
    pub method: Option<u8>,

    /// Truncated previous-event hash
    #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
    pub prev_event_hash: Option<String>,

    /// Truncated actor hash
    #[serde(rename = "a", default, skip_serializing_if = "Option::is_none")]
    pub actor_id_hash: Option<String>,

    /// Dispenses allowed
    #[serde(rename = "md", default, skip_serializing_if = "Option::is_none")]
    pub max_dispenses: Option<u32>,

    /// Dispenses performed
    #[serde(rename = "dc", default, skip_serializing_if = "Option::is_none")]
    pub dispense_count: Option<u32>,

    /// Present (as 1) only when an alert was raised
    #[serde(rename = "f", default, skip_serializing_if = "Option::is_none")]
    pub fraud_alert: Option<u8>,
}
