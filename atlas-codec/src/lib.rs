//! AtlasCare payload codec
//!
//! Compact wire format for prescription lifecycle events anchored to an
//! append-only ledger topic.
//!
//! # Architecture
//!
//! - **Geotag**: coordinates reduced to a closed catalogue of city codes
//! - **Hashing**: truncated digests with collision escalation
//! - **Codec**: variant-dispatched compress/decompress over short-keyed JSON
//! - **Lookup**: injectable truncated-hash → full-hash side table
//!
//! # Invariants
//!
//! - Never fails on malformed input: every call yields a usable value plus
//!   the list of degradations applied
//! - Decompressing a full-form object is a no-op
//! - Every truncated hash emitted with a lookup table has a matching entry
//!   until it is purged

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod canonical;
pub mod codec;
pub mod compress;
pub mod config;
pub mod decompress;
pub mod error;
pub mod geotag;
pub mod hashing;
pub mod lookup;
pub mod outcome;
pub mod signing;
pub mod types;
pub mod wire;

// Re-exports
pub use codec::{measure_savings, PayloadCodec, SizeReport};
pub use compress::{compress, compress_event, compress_with};
pub use config::CodecConfig;
pub use decompress::decompress;
pub use error::{Error, Result};
pub use lookup::{HashLookup, MemoryHashLookup};
pub use outcome::{Degradation, Outcome};
pub use types::{
    DispensedEvent, Envelope, Event, EventType, IssuedEvent, PaidEvent, PaymentMethod,
    VerifiedEvent,
};
pub use wire::{WireEvent, WireField};
