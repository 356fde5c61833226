//! Codec facade and size accounting

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::canonical::canonical_json;
use crate::compress::compress_with;
use crate::config::CodecConfig;
use crate::decompress::decompress;
use crate::lookup::{HashLookup, MemoryHashLookup};
use crate::outcome::{Degradation, Outcome};

/// Serialized-size comparison of a payload before and after compression
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeReport {
    /// Canonical JSON bytes of the original
    pub original_size: usize,
    /// Canonical JSON bytes of the compressed form
    pub compressed_size: usize,
    /// Percentage reduction, one decimal place
    pub reduction_percent: f64,
    /// Bytes saved (negative if the payload grew)
    pub saved_bytes: i64,
}

/// Percentage reduction in canonical JSON byte length
pub fn measure_savings(original: &Value, compressed: &Value) -> SizeReport {
    let original_size = canonical_json(original).len();
    let compressed_size = canonical_json(compressed).len();
    let saved_bytes = original_size as i64 - compressed_size as i64;

    let reduction_percent = if original_size == 0 {
        0.0
    } else {
        (saved_bytes as f64 / original_size as f64 * 1000.0).round() / 10.0
    };

    SizeReport {
        original_size,
        compressed_size,
        reduction_percent,
        saved_bytes,
    }
}

/// Codec bound to a shared lookup table and configuration
#[derive(Debug, Clone)]
pub struct PayloadCodec {
    lookup: Arc<dyn HashLookup>,
    config: CodecConfig,
}

impl PayloadCodec {
    /// Create a codec over an existing lookup table
    pub fn new(lookup: Arc<dyn HashLookup>, config: CodecConfig) -> Self {
        Self { lookup, config }
    }

    /// Codec with a fresh in-memory table and default settings
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryHashLookup::new()), CodecConfig::default())
    }

    /// Shared lookup table
    pub fn lookup(&self) -> &Arc<dyn HashLookup> {
        &self.lookup
    }

    /// Active configuration
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Compress a full-form payload, recording hashes in the table
    pub fn compress(&self, event: &Value) -> Outcome<Value> {
        compress_with(event, Some(self.lookup.as_ref()), &self.config)
    }

    /// Decompress a wire payload using the table
    pub fn decompress(&self, wire: &Value) -> Outcome<Value> {
        decompress(wire, Some(self.lookup.as_ref()))
    }

    /// Compress and serialize for submission to the ledger
    pub fn compress_to_bytes(&self, event: &Value) -> Outcome<Vec<u8>> {
        self.compress(event)
            .map(|wire| serde_json::to_vec(&wire).unwrap_or_default())
    }

    /// Decode a message body retrieved from the ledger and decompress it
    ///
    /// Bodies that are not JSON decode to `null` with [`Degradation::NotAnObject`].
    pub fn decompress_bytes(&self, body: &[u8]) -> Outcome<Value> {
        match serde_json::from_slice::<Value>(body) {
            Ok(wire) => self.decompress(&wire),
            Err(e) => {
                warn!("Ledger message is not JSON ({} bytes): {}", body.len(), e);
                Outcome::degraded(Value::Null, vec![Degradation::NotAnObject])
            }
        }
    }

    /// Compress and report the size reduction
    pub fn compress_measured(&self, event: &Value) -> (Outcome<Value>, SizeReport) {
        let outcome = self.compress(event);
        let report = measure_savings(event, &outcome.value);
        (outcome, report)
    }
}
