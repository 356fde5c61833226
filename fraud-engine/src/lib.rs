//! Fraud Engine for AtlasCare
//!
//! Impossible-travel detection between where a prescription was issued and
//! where it is verified or dispensed.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod evaluator;
pub mod types;

pub use config::FraudConfig;
pub use error::{Error, Result};
pub use evaluator::FraudEvaluator;
pub use types::*;
