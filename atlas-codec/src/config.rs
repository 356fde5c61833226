//! Configuration for the payload codec

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::hashing::{COLLISION_STEP, DEFAULT_PREFIX_LEN};

/// Codec configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Hex characters kept when truncating hashed identifiers
    pub hash_prefix_len: usize,

    /// Extra hex characters added on each collision escalation
    pub collision_step: usize,

    /// Characters of the nonce kept on the wire
    pub nonce_len: usize,

    /// JSON snapshot of the hash lookup table (CLI only)
    pub lookup_path: Option<PathBuf>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            hash_prefix_len: DEFAULT_PREFIX_LEN,
            collision_step: COLLISION_STEP,
            nonce_len: 6,
            lookup_path: None,
        }
    }
}

impl CodecConfig {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CodecConfig = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = CodecConfig::default();

        if let Ok(len) = std::env::var("ATLAS_HASH_PREFIX_LEN") {
            config.hash_prefix_len = parse_env("ATLAS_HASH_PREFIX_LEN", &len)?;
        }

        if let Ok(len) = std::env::var("ATLAS_NONCE_LEN") {
            config.nonce_len = parse_env("ATLAS_NONCE_LEN", &len)?;
        }

        if let Ok(path) = std::env::var("ATLAS_LOOKUP_PATH") {
            config.lookup_path = Some(PathBuf::from(path));
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make truncation meaningless
    pub fn validate(&self) -> crate::Result<()> {
        if self.hash_prefix_len == 0 {
            return Err(crate::Error::Config("hash_prefix_len must be > 0".to_string()));
        }
        if self.collision_step == 0 {
            return Err(crate::Error::Config("collision_step must be > 0".to_string()));
        }
        Ok(())
    }
}

fn parse_env(name: &str, value: &str) -> crate::Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|e| crate::Error::Config(format!("Invalid {}='{}': {}", name, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CodecConfig::default();
        assert_eq!(config.hash_prefix_len, 8);
        assert_eq!(config.collision_step, 4);
        assert_eq!(config.nonce_len, 6);
        assert!(config.lookup_path.is_none());
    }

    #[test]
    fn test_from_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codec.toml");
        std::fs::write(&path, "hash_prefix_len = 10\n").unwrap();

        let config = CodecConfig::from_file(&path).unwrap();
        assert_eq!(config.hash_prefix_len, 10);
        assert_eq!(config.nonce_len, 6);
    }

    #[test]
    fn test_zero_prefix_rejected() {
        let config = CodecConfig {
            hash_prefix_len: 0,
            ..CodecConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
