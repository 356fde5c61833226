//! Payload signatures
//!
//! A full-form payload is signed over its canonical JSON with the
//! `signature` key removed. Signatures travel hex encoded with a `hex:`
//! prefix in full form; the wire form drops the prefix.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde_json::Value;

use crate::canonical::canonical_bytes;
use crate::hashing::HEX_PREFIX;
use crate::wire::WireField;
use crate::{Error, Result};

/// Bytes covered by a payload signature
pub fn signing_bytes(payload: &Value) -> Vec<u8> {
    match payload {
        Value::Object(map) => {
            let mut unsigned = map.clone();
            unsigned.remove(WireField::Signature.long_name());
            canonical_bytes(&Value::Object(unsigned))
        }
        other => canonical_bytes(other),
    }
}

/// Ed25519 key pair for signing payloads
#[derive(Debug)]
pub struct SigningKeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl SigningKeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self::from_seed(&rand::random::<[u8; 32]>())
    }

    /// Create from seed (32 bytes) - deterministic generation
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Get public key bytes
    pub fn public_key(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// `hex:`-prefixed signature over the payload's signing bytes
    pub fn sign_payload(&self, payload: &Value) -> String {
        let signature = self.signing_key.sign(&signing_bytes(payload));
        format!("{}{}", HEX_PREFIX, hex::encode(signature.to_bytes()))
    }

    /// Return a copy of the payload with its `signature` field set
    pub fn signed(&self, payload: &Value) -> Value {
        let signature = self.sign_payload(payload);
        let mut signed = payload.clone();
        if let Value::Object(map) = &mut signed {
            map.insert(WireField::Signature.long_name().to_string(), Value::String(signature));
        }
        signed
    }
}

/// Verify the `signature` field of a full-form payload
pub fn verify_payload(payload: &Value, public_key: &[u8; 32]) -> Result<()> {
    let encoded = payload
        .get(WireField::Signature.long_name())
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Signature("Payload has no signature".to_string()))?;

    let raw = encoded.strip_prefix(HEX_PREFIX).unwrap_or(encoded);
    let bytes: [u8; 64] = hex::decode(raw)
        .map_err(|e| Error::Signature(format!("Signature is not hex: {}", e)))?
        .try_into()
        .map_err(|_| Error::Signature("Signature must be 64 bytes".to_string()))?;

    let verifying_key = VerifyingKey::from_bytes(public_key)
        .map_err(|e| Error::Signature(format!("Invalid public key: {}", e)))?;

    verifying_key
        .verify(&signing_bytes(payload), &Signature::from_bytes(&bytes))
        .map_err(|e| Error::Signature(format!("Verification failed: {}", e)))
}
