//! Error types for the codec crate
//!
//! The codec itself never fails; these cover configuration, lookup-table
//! persistence and signature handling.

use thiserror::Error;

/// Result type for codec support operations
pub type Result<T> = std::result::Result<T, Error>;

/// Codec errors
#[derive(Error, Debug)]
pub enum Error {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Signature creation or verification failed
    #[error("Signature error: {0}")]
    Signature(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
