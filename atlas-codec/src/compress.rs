//! Full form → wire form
//!
//! The input is read into a typed [`Event`], then each variant is reduced by
//! its own compressor. Everything not named by the wire table (drug lists,
//! instructions, line items, protocol metadata, key ids, token serials) is
//! dropped here and cannot be recovered from the ledger.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;
use tracing::{debug, error, warn};

use crate::config::CodecConfig;
use crate::geotag::{resolve_geotag, UNKNOWN_CITY};
use crate::hashing::{is_hex, store_full_hash, strip_hash_prefix, truncate_hash, HEX_PREFIX};
use crate::lookup::HashLookup;
use crate::outcome::{Degradation, Outcome};
use crate::types::{
    DispensedEvent, Envelope, Event, EventType, IssuedEvent, PaidEvent, PaymentMethod,
    VerifiedEvent,
};
use crate::wire::{WireEvent, WireField};

/// Compress a full-form payload with default settings
pub fn compress(input: &Value, lookup: Option<&dyn HashLookup>) -> Outcome<Value> {
    compress_with(input, lookup, &CodecConfig::default())
}

/// Compress a full-form payload
///
/// Payloads that cannot be compressed (not an object, missing or unknown
/// `eventType`, `cancelled`) are returned unchanged with a degradation.
pub fn compress_with(
    input: &Value,
    lookup: Option<&dyn HashLookup>,
    config: &CodecConfig,
) -> Outcome<Value> {
    let Some(map) = input.as_object() else {
        warn!("Refusing to compress non-object payload");
        return Outcome::degraded(input.clone(), vec![Degradation::NotAnObject]);
    };

    let event_type = match map.get(WireField::EventType.long_name()) {
        Some(Value::String(raw)) => match EventType::parse(raw) {
            Some(event_type) => event_type,
            None => {
                warn!("Unknown event type '{}', passing payload through", raw);
                return Outcome::degraded(
                    input.clone(),
                    vec![Degradation::UnknownEventType { value: raw.clone() }],
                );
            }
        },
        Some(other) => {
            warn!("Non-string event type {}, passing payload through", other);
            return Outcome::degraded(
                input.clone(),
                vec![Degradation::UnknownEventType {
                    value: other.to_string(),
                }],
            );
        }
        None => {
            warn!("Payload has no eventType, passing through");
            return Outcome::degraded(input.clone(), vec![Degradation::MissingEventType]);
        }
    };

    let mut reader = FieldReader::new(map);
    let event = match event_type {
        EventType::Issued => Event::Issued(reader.issued()),
        EventType::Verified => Event::Verified(reader.verified()),
        EventType::Paid => Event::Paid(reader.paid()),
        EventType::Dispensed => Event::Dispensed(reader.dispensed()),
        EventType::Cancelled => {
            warn!("No compressor for '{}' events, passing payload through", event_type);
            return Outcome::degraded(input.clone(), vec![Degradation::NoCompressor { event_type }]);
        }
    };

    let mut degradations = reader.degradations;
    let wire = compress_event(&event, lookup, config);
    degradations.extend(wire.degradations);

    match serde_json::to_value(&wire.value) {
        Ok(value) => {
            debug!(
                "Compressed {} event with {} degradation(s)",
                event_type,
                degradations.len()
            );
            Outcome::degraded(value, degradations)
        }
        Err(e) => {
            error!("Failed to encode wire event: {}", e);
            Outcome::degraded(input.clone(), degradations)
        }
    }
}

/// Compress a typed event
///
/// Hashed identifiers are truncated; when a lookup table is given, the full
/// digest is recorded under the (collision-free) truncated key.
pub fn compress_event(
    event: &Event,
    lookup: Option<&dyn HashLookup>,
    config: &CodecConfig,
) -> Outcome<WireEvent> {
    let mut compactor = Compactor {
        lookup,
        config,
        degradations: Vec::new(),
    };

    let wire = match event {
        Event::Issued(ev) => compactor.issued(ev),
        Event::Verified(ev) => compactor.verified(ev),
        Event::Paid(ev) => compactor.paid(ev),
        Event::Dispensed(ev) => compactor.dispensed(ev),
    };

    Outcome::degraded(wire, compactor.degradations)
}

struct Compactor<'a> {
    lookup: Option<&'a dyn HashLookup>,
    config: &'a CodecConfig,
    degradations: Vec<Degradation>,
}

impl Compactor<'_> {
    fn envelope(&self, event_type: EventType, envelope: &Envelope) -> WireEvent {
        WireEvent {
            event_code: event_type.wire_code(),
            topic_id: envelope.topic_id.clone(),
            timestamp: envelope.timestamp.map(|t| t.timestamp()),
            nonce: envelope
                .nonce
                .as_deref()
                .map(|n| n.chars().take(self.config.nonce_len).collect()),
            signature: envelope
                .signature
                .as_deref()
                .map(|s| s.strip_prefix(HEX_PREFIX).unwrap_or(s).to_string()),
            ..WireEvent::default()
        }
    }

    fn hash(&mut self, field: WireField, raw: Option<&str>) -> Option<String> {
        let raw = raw?;
        if !is_hex(strip_hash_prefix(raw)) {
            self.degradations.push(Degradation::NonHexHash {
                field: field.long_name(),
            });
        }

        Some(match self.lookup {
            Some(lookup) => store_full_hash(
                raw,
                lookup,
                self.config.hash_prefix_len,
                self.config.collision_step,
            ),
            None => truncate_hash(raw, self.config.hash_prefix_len),
        })
    }

    fn issued(&mut self, ev: &IssuedEvent) -> WireEvent {
        let mut wire = self.envelope(EventType::Issued, &ev.envelope);
        wire.valid_until = ev.valid_until.map(|t| t.timestamp());
        wire.geo_tag = Some(ev.geo_tag.to_string());
        wire.hashed_patient_id = self.hash(WireField::HashedPatientId, ev.hashed_patient_id.as_deref());
        wire.max_dispenses = Some(ev.max_dispenses);
        wire.dispense_count = Some(ev.dispense_count);
        wire
    }

    fn verified(&mut self, ev: &VerifiedEvent) -> WireEvent {
        let mut wire = self.envelope(EventType::Verified, &ev.envelope);
        wire.actor_id_hash = self.hash(WireField::ActorIdHash, ev.actor_id_hash.as_deref());
        wire.prev_event_hash = self.hash(WireField::PrevEventHash, ev.prev_event_hash.as_deref());
        wire.dispense_count = Some(ev.dispense_count);
        wire.max_dispenses = Some(ev.max_dispenses);
        wire.fraud_alert = ev.fraud_alert.then_some(1);
        wire
    }

    fn paid(&mut self, ev: &PaidEvent) -> WireEvent {
        let mut wire = self.envelope(EventType::Paid, &ev.envelope);
        wire.actor_id_hash = self.hash(WireField::ActorIdHash, ev.actor_id_hash.as_deref());
        wire.prev_event_hash = self.hash(WireField::PrevEventHash, ev.prev_event_hash.as_deref());
        wire.amount_mad = ev.amount_mad.and_then(|amount| {
            let rounded = round_half_up(amount);
            if rounded.is_none() {
                warn!("amountMAD {} does not fit the wire amount, dropping it", amount);
                self.degradations.push(Degradation::InvalidAmount);
            }
            rounded
        });
        wire.method = ev.method.map(|m| m.wire_code());
        wire
    }

    fn dispensed(&mut self, ev: &DispensedEvent) -> WireEvent {
        let mut wire = self.envelope(EventType::Dispensed, &ev.envelope);
        wire.actor_id_hash = self.hash(WireField::ActorIdHash, ev.actor_id_hash.as_deref());
        wire.prev_event_hash = self.hash(WireField::PrevEventHash, ev.prev_event_hash.as_deref());
        wire.dispense_count = Some(ev.dispense_count);
        wire.max_dispenses = Some(ev.max_dispenses);
        wire
    }
}

/// Nearest whole unit, halves rounded up
fn round_half_up(amount: Decimal) -> Option<i64> {
    amount.checked_add(Decimal::new(5, 1))?.floor().to_i64()
}

/// Reads full-form fields leniently, recording what it had to repair
struct FieldReader<'a> {
    map: &'a Map<String, Value>,
    degradations: Vec<Degradation>,
}

impl<'a> FieldReader<'a> {
    fn new(map: &'a Map<String, Value>) -> Self {
        Self {
            map,
            degradations: Vec::new(),
        }
    }

    fn get(&self, field: WireField) -> Option<&'a Value> {
        self.map.get(field.long_name()).filter(|v| !v.is_null())
    }

    fn string(&self, field: WireField) -> Option<String> {
        self.get(field).and_then(Value::as_str).map(str::to_string)
    }

    fn envelope(&mut self) -> Envelope {
        // `topicId` is accepted as an alias for the table's `topicID`.
        let topic_id = self
            .string(WireField::TopicId)
            .or_else(|| self.map.get("topicId").and_then(Value::as_str).map(str::to_string));

        Envelope {
            topic_id,
            timestamp: self.time(WireField::Timestamp),
            nonce: self.string(WireField::Nonce),
            signature: self.string(WireField::Signature),
        }
    }

    fn time(&mut self, field: WireField) -> Option<DateTime<Utc>> {
        let value = self.get(field)?;
        let parsed = parse_time(value);
        if parsed.is_none() {
            self.degradations.push(Degradation::InvalidTimestamp {
                field: field.long_name(),
            });
        }
        parsed
    }

    fn count(&mut self, field: WireField, default: u32) -> u32 {
        let Some(value) = self.get(field) else {
            return default;
        };

        let parsed = value
            .as_u64()
            .or_else(|| value.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok());

        parsed.unwrap_or_else(|| {
            self.degradations.push(Degradation::InvalidCount {
                field: field.long_name(),
            });
            default
        })
    }

    fn dispense_counts(&mut self) -> (u32, u32) {
        let max_dispenses = self.count(WireField::MaxDispenses, 1);
        let dispense_count = self.count(WireField::DispenseCount, 0);
        if dispense_count > max_dispenses {
            warn!(
                "dispenseCount {} exceeds maxDispenses {}",
                dispense_count, max_dispenses
            );
            self.degradations.push(Degradation::DispenseCountExceedsMax {
                dispense_count,
                max_dispenses,
            });
        }
        (dispense_count, max_dispenses)
    }

    fn geo_tag(&mut self) -> &'static str {
        let Some(value) = self.get(WireField::GeoTag) else {
            return UNKNOWN_CITY;
        };
        resolve_geotag(value).unwrap_or_else(|| {
            self.degradations.push(Degradation::MalformedGeotag);
            UNKNOWN_CITY
        })
    }

    fn amount(&mut self) -> Option<Decimal> {
        let value = self.get(WireField::AmountMad)?;
        let parsed = match value {
            Value::Number(n) => Decimal::from_str(&n.to_string())
                .ok()
                .or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok())),
            Value::String(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        };
        if parsed.is_none() {
            self.degradations.push(Degradation::InvalidAmount);
        }
        parsed
    }

    fn method(&mut self) -> Option<PaymentMethod> {
        let value = self.get(WireField::Method)?;
        let parsed = value.as_str().and_then(PaymentMethod::parse);
        if parsed.is_none() {
            let raw = value.as_str().map_or_else(|| value.to_string(), str::to_string);
            self.degradations.push(Degradation::UnknownPaymentMethod { value: raw });
        }
        parsed
    }

    fn issued(&mut self) -> IssuedEvent {
        let envelope = self.envelope();
        let valid_until = self.time(WireField::ValidUntil);
        if let (Some(until), Some(at)) = (valid_until, envelope.timestamp) {
            if until < at {
                self.degradations.push(Degradation::ValidUntilBeforeTimestamp);
            }
        }
        let (dispense_count, max_dispenses) = self.dispense_counts();

        IssuedEvent {
            valid_until,
            geo_tag: self.geo_tag(),
            hashed_patient_id: self.string(WireField::HashedPatientId),
            max_dispenses,
            dispense_count,
            envelope,
        }
    }

    fn verified(&mut self) -> VerifiedEvent {
        let envelope = self.envelope();
        let (dispense_count, max_dispenses) = self.dispense_counts();

        VerifiedEvent {
            actor_id_hash: self.string(WireField::ActorIdHash),
            prev_event_hash: self.string(WireField::PrevEventHash),
            dispense_count,
            max_dispenses,
            fraud_alert: self.get(WireField::FraudAlert).map_or(false, is_truthy),
            envelope,
        }
    }

    fn paid(&mut self) -> PaidEvent {
        PaidEvent {
            envelope: self.envelope(),
            actor_id_hash: self.string(WireField::ActorIdHash),
            prev_event_hash: self.string(WireField::PrevEventHash),
            amount_mad: self.amount(),
            method: self.method(),
        }
    }

    fn dispensed(&mut self) -> DispensedEvent {
        let envelope = self.envelope();
        let (dispense_count, max_dispenses) = self.dispense_counts();

        DispensedEvent {
            actor_id_hash: self.string(WireField::ActorIdHash),
            prev_event_hash: self.string(WireField::PrevEventHash),
            dispense_count,
            max_dispenses,
            envelope,
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Parse an RFC 3339 string, a zone-less ISO string (taken as UTC) or
/// integer epoch milliseconds
pub(crate) fn parse_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|t| t.and_utc())
            }),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}
