//! Persistence boundary for the cache and the district registry.
//!
//! The pipeline never assumes a storage engine: anything implementing
//! [`CacheStore`] and [`DistrictRegistry`] works. Two backends ship here:
//!
//! - [`FileStore`]: flat-file JSON documents with atomic replacement
//! - [`MemoryStore`]: in-process maps, used by tests and embedders
//!
//! Store failures are the one error class the pipeline propagates hard -
//! without a working store there is no meaningful cached answer.

pub mod file;
pub mod memory;

use thiserror::Error;

use crate::models::CacheEntry;

pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt store document: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Normalized lookup key for a (state, fiscal year) slice.
pub fn cache_key(state: &str, fin_year: &str) -> String {
    format!(
        "{}||{}",
        state.trim().to_uppercase(),
        fin_year.trim()
    )
}

/// Persisted cache of fetched (state, fiscal year) slices.
///
/// `put` replaces the whole entry atomically; a concurrent reader sees
/// either the old or the new entry, never a mix. Freshness is decided by
/// callers via [`CacheEntry::is_fresh`] - stale entries stay retrievable.
pub trait CacheStore: Send + Sync {
    fn get(&self, state: &str, fin_year: &str) -> Result<Option<CacheEntry>, StoreError>;

    fn put(&self, entry: CacheEntry) -> Result<(), StoreError>;
}

/// Per-state directory of district names discovered during fetches.
///
/// Names only grow; nothing removes them. State matching is
/// case-insensitive with the first-seen casing preserved for display, and
/// district names deduplicate case-insensitively (first-seen casing wins).
pub trait DistrictRegistry: Send + Sync {
    /// Record a district name for a state. Returns `true` if the name was
    /// newly added, `false` for an already-known name.
    fn record_seen(&self, state: &str, district: &str) -> Result<bool, StoreError>;

    /// District names for a state, sorted case-insensitively. Unknown
    /// states yield an empty list.
    fn list(&self, state: &str) -> Result<Vec<String>, StoreError>;

    /// All known state names, in first-seen casing.
    fn states(&self) -> Result<Vec<String>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_normalizes() {
        assert_eq!(cache_key(" Odisha ", " 2024-2025 "), "ODISHA||2024-2025");
        assert_eq!(cache_key("ODISHA", "2024-2025"), "ODISHA||2024-2025");
    }
}
