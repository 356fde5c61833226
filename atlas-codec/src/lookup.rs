//! Hash lookup table
//!
//! Maps truncated hashes back to full digests so decompression can restore
//! identifiers. Deleting an entry is how erasure is honoured: the ledger copy
//! stays immutable but can no longer be linked to the full identifier.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::Path;
use tracing::{debug, info};

use crate::Result;

/// Truncated-hash → full-hash store
///
/// Full values are stored without the `sha256:` prefix.
pub trait HashLookup: Send + Sync + Debug {
    /// Full hash for a truncated key
    fn get(&self, truncated: &str) -> Option<String>;

    /// Insert or replace an entry
    fn set(&self, truncated: &str, full: &str);

    /// Remove an entry, returning whether it existed
    fn delete(&self, truncated: &str) -> bool;

    /// Number of entries
    fn len(&self) -> usize;

    /// Whether an entry exists
    fn has(&self, truncated: &str) -> bool {
        self.get(truncated).is_some()
    }

    /// Whether the table is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory lookup table
#[derive(Debug, Default)]
pub struct MemoryHashLookup {
    entries: DashMap<String, String>,
}

impl MemoryHashLookup {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every key pointing at `full`, returning how many were removed
    pub fn purge_full_hash(&self, full: &str) -> usize {
        let full = crate::hashing::normalize_hash(full);
        let before = self.entries.len();
        self.entries.retain(|_, value| *value != full);
        let removed = before - self.entries.len();

        info!("Purged {} lookup entr{} for erased identifier", removed, if removed == 1 { "y" } else { "ies" });
        removed
    }

    /// Sorted copy of all entries
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Write the table as a JSON object
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(path.as_ref(), json)?;
        debug!("Saved {} lookup entries to {}", self.entries.len(), path.as_ref().display());
        Ok(())
    }

    /// Read a table written by [`MemoryHashLookup::save_to`]
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let entries: BTreeMap<String, String> = serde_json::from_str(&content)?;
        let lookup = Self::new();
        for (truncated, full) in entries {
            lookup.entries.insert(truncated, full);
        }
        debug!("Loaded {} lookup entries from {}", lookup.entries.len(), path.as_ref().display());
        Ok(lookup)
    }
}

impl HashLookup for MemoryHashLookup {
    fn get(&self, truncated: &str) -> Option<String> {
        self.entries.get(truncated).map(|entry| entry.value().clone())
    }

    fn set(&self, truncated: &str, full: &str) {
        self.entries.insert(truncated.to_string(), full.to_string());
    }

    fn delete(&self, truncated: &str) -> bool {
        self.entries.remove(truncated).is_some()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
