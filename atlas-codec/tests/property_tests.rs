//! Property-based tests for codec invariants
//!
//! These tests use proptest to verify:
//! - Round trip: type, topic, counts and hashes survive compress → decompress
//! - Idempotence: decompressing a full-form payload is a no-op
//! - Truncation: valid hex always yields the requested lowercase prefix
//! - Timestamps: whole-second epoch, restored within one second
//! - Payment method codes are a bijection

use atlas_codec::hashing::truncate_hash;
use atlas_codec::{compress, decompress, MemoryHashLookup, PaymentMethod};
use chrono::{DateTime, SecondsFormat, Utc};
use proptest::prelude::*;
use serde_json::{json, Value};

/// Strategy for generating compressible event types
fn event_type_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("issued"), Just("verified"), Just("paid"), Just("dispensed")]
}

/// Strategy for generating prefixed sha256 values
fn hash_strategy() -> impl Strategy<Value = String> {
    "[0-9a-f]{64}".prop_map(|hex| format!("sha256:{}", hex))
}

/// Strategy for instants between 2001-09-09 and 2286-11-20 with millisecond precision
fn instant_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (1_000_000_000_000i64..9_999_999_999_000i64)
        .prop_map(|ms| DateTime::from_timestamp_millis(ms).unwrap())
}

fn method_strategy() -> impl Strategy<Value = PaymentMethod> {
    prop_oneof![
        Just(PaymentMethod::Cash),
        Just(PaymentMethod::Card),
        Just(PaymentMethod::Hbar),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: envelope, counts and hashes survive a round trip through the same table
    #[test]
    fn prop_round_trip(
        event_type in event_type_strategy(),
        topic in "0\\.0\\.[0-9]{1,8}",
        max_dispenses in 1u32..10,
        used in 0u32..10,
        patient in hash_strategy(),
        actor in hash_strategy(),
        prev in hash_strategy(),
    ) {
        let dispense_count = used.min(max_dispenses);
        let original = json!({
            "eventType": event_type,
            "topicID": topic,
            "maxDispenses": max_dispenses,
            "dispenseCount": dispense_count,
            "hashedPatientId": patient,
            "actorIdHash": actor,
            "prevEventHash": prev,
        });

        let lookup = MemoryHashLookup::new();
        let wire = compress(&original, Some(&lookup)).into_inner();
        let full = decompress(&wire, Some(&lookup)).into_inner();

        prop_assert_eq!(&full["eventType"], &original["eventType"]);
        prop_assert_eq!(&full["topicID"], &original["topicID"]);

        match event_type {
            "issued" => {
                prop_assert_eq!(&full["hashedPatientId"], &original["hashedPatientId"]);
                prop_assert_eq!(&full["maxDispenses"], &original["maxDispenses"]);
                prop_assert_eq!(&full["dispenseCount"], &original["dispenseCount"]);
            }
            "verified" | "dispensed" => {
                prop_assert_eq!(&full["actorIdHash"], &original["actorIdHash"]);
                prop_assert_eq!(&full["prevEventHash"], &original["prevEventHash"]);
                prop_assert_eq!(&full["maxDispenses"], &original["maxDispenses"]);
                prop_assert_eq!(&full["dispenseCount"], &original["dispenseCount"]);
            }
            _ => {
                prop_assert_eq!(&full["actorIdHash"], &original["actorIdHash"]);
                prop_assert_eq!(&full["prevEventHash"], &original["prevEventHash"]);
            }
        }
    }

    /// Property: decompressing a full-form payload returns it unchanged
    #[test]
    fn prop_decompress_idempotent(
        event_type in event_type_strategy(),
        extra in "[a-z]{1,12}",
        n in any::<i64>(),
    ) {
        let full = json!({"eventType": event_type, "e": "x", extra: n});
        let out = decompress(&full, None);
        prop_assert!(!out.is_degraded());
        prop_assert_eq!(out.value, full);
    }

    /// Property: truncation of valid hex is deterministic and exact length
    #[test]
    fn prop_truncate_length(hex in "[0-9a-fA-F]{8,64}", prefixed in any::<bool>()) {
        let input = if prefixed { format!("sha256:{}", hex) } else { hex.clone() };
        let truncated = truncate_hash(&input, 8);

        prop_assert_eq!(truncated.len(), 8);
        prop_assert!(truncated.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        prop_assert_eq!(truncated, truncate_hash(&input, 8));
    }

    /// Property: timestamps compress to 10-digit seconds and restore within one second
    #[test]
    fn prop_timestamp_bound(at in instant_strategy()) {
        let iso = at.to_rfc3339_opts(SecondsFormat::Millis, true);
        let wire = compress(&json!({"eventType": "dispensed", "timestamp": iso}), None).into_inner();

        let secs = wire["ts"].as_i64().unwrap();
        prop_assert_eq!(secs.to_string().len(), 10);

        let full = decompress(&wire, None).into_inner();
        let restored = DateTime::parse_from_rfc3339(full["timestamp"].as_str().unwrap())
            .unwrap()
            .with_timezone(&Utc);
        let drift = (at - restored).num_milliseconds();
        prop_assert!((0..1000).contains(&drift), "drift {}ms", drift);
    }

    /// Property: payment method codes map both ways
    #[test]
    fn prop_method_bijection(method in method_strategy(), amount in 0u32..100_000) {
        let wire = compress(&json!({"eventType": "paid", "method": method.as_str(), "amountMAD": amount}), None)
            .into_inner();
        prop_assert_eq!(&wire["m"], &json!(method.wire_code()));
        prop_assert_eq!(&wire["amt"], &json!(amount));

        let full = decompress(&json!({"e": "p", "m": method.wire_code()}), None).into_inner();
        prop_assert_eq!(&full["method"], &Value::String(method.as_str().to_string()));
    }
}

#[test]
fn test_method_codes_fixed() {
    for (name, code) in [("cash", 1), ("card", 2), ("hbar", 3)] {
        let wire = compress(&json!({"eventType": "paid", "method": name}), None).into_inner();
        assert_eq!(wire["m"], code);
        let full = decompress(&json!({"e": "p", "m": code}), None).into_inner();
        assert_eq!(full["method"], name);
    }
}
