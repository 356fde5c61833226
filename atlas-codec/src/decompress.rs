//! Wire form → full form
//!
//! Every key of the wire object is renamed through the key table. Event type,
//! timestamps, payment method, hashed identifiers and the signature are also
//! expanded. Keys outside the table are carried over untouched.

use chrono::{DateTime, SecondsFormat};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::hashing::{HEX_PREFIX, SHA256_PREFIX};
use crate::lookup::HashLookup;
use crate::outcome::{Degradation, Outcome};
use crate::types::{EventType, PaymentMethod};
use crate::wire::WireField;

/// Decompress a wire payload
///
/// A payload that already carries a full-form `eventType` is returned
/// unchanged. A truncated hash missing from `lookup` (erased, or no table
/// given) is kept in its short form with the `sha256:` prefix.
pub fn decompress(input: &Value, lookup: Option<&dyn HashLookup>) -> Outcome<Value> {
    let Some(map) = input.as_object() else {
        warn!("Refusing to decompress non-object payload");
        return Outcome::degraded(input.clone(), vec![Degradation::NotAnObject]);
    };

    if map.contains_key(WireField::EventType.long_name()) {
        return Outcome::clean(input.clone());
    }

    let mut expander = Expander {
        lookup,
        degradations: Vec::new(),
    };
    let mut full = Map::new();

    for (key, value) in map {
        match WireField::from_short_key(key) {
            Some(field) => {
                let expanded = expander.expand(field, value);
                full.insert(field.long_name().to_string(), expanded);
            }
            None => {
                full.insert(key.clone(), value.clone());
            }
        }
    }

    Outcome::degraded(Value::Object(full), expander.degradations)
}

struct Expander<'a> {
    lookup: Option<&'a dyn HashLookup>,
    degradations: Vec<Degradation>,
}

impl Expander<'_> {
    fn expand(&mut self, field: WireField, value: &Value) -> Value {
        if field.is_hashed() {
            return self.hash(field, value);
        }

        match field {
            WireField::EventType => self.event_type(value),
            WireField::Timestamp | WireField::ValidUntil => self.time(field, value),
            WireField::Method => self.method(value),
            WireField::Signature => signature(value),
            _ => value.clone(),
        }
    }

    fn event_type(&mut self, value: &Value) -> Value {
        match value.as_str().and_then(EventType::parse) {
            Some(event_type) => Value::String(event_type.as_str().to_string()),
            None => {
                warn!("Unknown event type code {}", value);
                self.degradations.push(Degradation::UnknownEventType {
                    value: value.as_str().map_or_else(|| value.to_string(), str::to_string),
                });
                value.clone()
            }
        }
    }

    fn time(&mut self, field: WireField, value: &Value) -> Value {
        match value.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)) {
            Some(t) => Value::String(t.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => {
                self.degradations.push(Degradation::InvalidTimestamp {
                    field: field.long_name(),
                });
                value.clone()
            }
        }
    }

    fn method(&mut self, value: &Value) -> Value {
        match value.as_i64().and_then(PaymentMethod::from_wire_code) {
            Some(method) => Value::String(method.as_str().to_string()),
            None => {
                self.degradations.push(Degradation::UnknownPaymentMethod {
                    value: value.to_string(),
                });
                value.clone()
            }
        }
    }

    fn hash(&mut self, field: WireField, value: &Value) -> Value {
        let Some(raw) = value.as_str() else {
            return value.clone();
        };
        let truncated = raw.strip_prefix(SHA256_PREFIX).unwrap_or(raw);

        match self.lookup.and_then(|lookup| lookup.get(truncated)) {
            Some(full) => Value::String(format!("{}{}", SHA256_PREFIX, full)),
            None => {
                debug!("No lookup entry for {} {}, keeping truncated form", field.long_name(), truncated);
                self.degradations.push(Degradation::LookupMiss {
                    field: field.long_name(),
                    truncated: truncated.to_string(),
                });
                Value::String(format!("{}{}", SHA256_PREFIX, truncated))
            }
        }
    }
}

fn signature(value: &Value) -> Value {
    match value.as_str() {
        Some(s) if !s.starts_with(HEX_PREFIX) => Value::String(format!("{}{}", HEX_PREFIX, s)),
        _ => value.clone(),
    }
}
