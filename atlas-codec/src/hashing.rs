//! Hash truncation and collision handling
//!
//! Identifiers travel on the wire as short hex prefixes of their sha256
//! digest. A prefix that already maps to a different digest is never
//! overwritten; the prefix is lengthened until it is free.

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::lookup::HashLookup;

/// Default truncated length in hex characters
pub const DEFAULT_PREFIX_LEN: usize = 8;

/// Characters added per collision escalation
pub const COLLISION_STEP: usize = 4;

/// Prefix carried by full hashes in full-form payloads
pub const SHA256_PREFIX: &str = "sha256:";

/// Prefix carried by hex-encoded values
pub const HEX_PREFIX: &str = "hex:";

/// Digest and the key it was stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredHash {
    /// Full lowercase hex digest
    pub full: String,
    /// Truncated key written to the lookup table
    pub truncated: String,
}

/// Strip a recognised `sha256:` or `hex:` prefix
pub fn strip_hash_prefix(value: &str) -> &str {
    value
        .strip_prefix(SHA256_PREFIX)
        .or_else(|| value.strip_prefix(HEX_PREFIX))
        .unwrap_or(value)
}

/// Prefix-free lowercase form used as lookup value
pub fn normalize_hash(value: &str) -> String {
    strip_hash_prefix(value.trim()).to_ascii_lowercase()
}

/// Whether the string is non-empty hex
pub fn is_hex(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// Truncate a (possibly prefixed) hash to `length` lowercase hex characters
///
/// Non-hex input is logged and truncated anyway.
pub fn truncate_hash(full: &str, length: usize) -> String {
    let normalized = normalize_hash(full);
    if !is_hex(&normalized) {
        warn!("Truncating non-hex hash value (len {})", normalized.len());
    }
    normalized.chars().take(length).collect()
}

/// Lowercase hex sha256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Store a full hash under its shortest free truncation
///
/// Starts at `length` and grows by `step` while the key maps to a different
/// digest. Returns the key used.
pub fn store_full_hash(full: &str, lookup: &dyn HashLookup, length: usize, step: usize) -> String {
    let normalized = normalize_hash(full);
    let step = step.max(1);
    let mut length = length.max(1);

    loop {
        let truncated: String = normalized.chars().take(length).collect();

        match lookup.get(&truncated) {
            None => {
                lookup.set(&truncated, &normalized);
                return truncated;
            }
            Some(existing) if existing == normalized => return truncated,
            Some(_) if truncated.len() >= normalized.len() => {
                // Key is the whole digest yet maps elsewhere: table is corrupt.
                warn!("Lookup entry {} maps to a different digest; leaving it untouched", truncated);
                return truncated;
            }
            Some(_) => {
                warn!(
                    "Hash collision on {}-char prefix {}, escalating to {}",
                    length,
                    truncated,
                    length + step
                );
                length += step;
            }
        }
    }
}

/// Hash `data`, store it and return digest and key
pub fn hash_and_store(data: &[u8], lookup: &dyn HashLookup, length: usize) -> StoredHash {
    let full = sha256_hex(data);
    let truncated = store_full_hash(&full, lookup, length, COLLISION_STEP);
    StoredHash { full, truncated }
}

/// Birthday-bound probability of any collision among `n` hashes truncated
/// to `length` hex characters
pub fn collision_probability(length: usize, n: u64) -> f64 {
    let space = 16f64.powi(length.min(i32::MAX as usize) as i32);
    let n = n as f64;
    (1.0 - (-(n * n) / (2.0 * space)).exp()).clamp(0.0, 1.0)
}
