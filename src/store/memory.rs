//! In-memory backend.
//!
//! Same contracts as [`super::FileStore`] without persistence. Tests use it
//! to exercise the pipeline hermetically; embedders can use it when disk
//! state is unwanted.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::CacheEntry;

use super::{cache_key, CacheStore, DistrictRegistry, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
    // state key (uppercased) -> (display casing, sorted district names)
    districts: Mutex<HashMap<String, (String, Vec<String>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, state: &str, fin_year: &str) -> Result<Option<CacheEntry>, StoreError> {
        let entries = self.entries.lock().expect("entries lock poisoned");
        Ok(entries.get(&cache_key(state, fin_year)).cloned())
    }

    fn put(&self, entry: CacheEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("entries lock poisoned");
        entries.insert(cache_key(&entry.state, &entry.fin_year), entry);
        Ok(())
    }
}

impl DistrictRegistry for MemoryStore {
    fn record_seen(&self, state: &str, district: &str) -> Result<bool, StoreError> {
        let state = state.trim();
        let district = district.trim();
        if district.is_empty() {
            return Ok(false);
        }

        let mut districts = self.districts.lock().expect("districts lock poisoned");
        let (_, names) = districts
            .entry(state.to_uppercase())
            .or_insert_with(|| (state.to_string(), Vec::new()));

        let district_u = district.to_uppercase();
        if names.iter().any(|d| d.to_uppercase() == district_u) {
            return Ok(false);
        }
        names.push(district.to_string());
        names.sort_by_key(|d| d.to_uppercase());
        Ok(true)
    }

    fn list(&self, state: &str) -> Result<Vec<String>, StoreError> {
        let districts = self.districts.lock().expect("districts lock poisoned");
        Ok(districts
            .get(&state.trim().to_uppercase())
            .map(|(_, names)| names.clone())
            .unwrap_or_default())
    }

    fn states(&self) -> Result<Vec<String>, StoreError> {
        let districts = self.districts.lock().expect("districts lock poisoned");
        let mut states: Vec<String> = districts.values().map(|(name, _)| name.clone()).collect();
        states.sort_by_key(|s| s.to_uppercase());
        Ok(states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_monotonicity() {
        let store = MemoryStore::new();
        assert!(store.record_seen("Odisha", "Puri").expect("add"));
        assert!(store.record_seen("Odisha", "Cuttack").expect("add"));
        assert!(!store.record_seen("Odisha", "Puri").expect("dup"));

        let before = store.list("Odisha").expect("list");
        assert!(!store.record_seen("odisha", "PURI").expect("case dup"));
        let after = store.list("Odisha").expect("list");
        assert_eq!(before.len(), after.len());
        assert_eq!(after, vec!["Cuttack", "Puri"]);
    }

    #[test]
    fn test_cache_store_round_trip() {
        use std::collections::BTreeMap;

        let store = MemoryStore::new();
        assert!(store.get("ODISHA", "2024-2025").expect("get").is_none());

        let entry = CacheEntry::new("Odisha", "2024-2025", 0, BTreeMap::new());
        store.put(entry).expect("put");
        assert!(store.get(" odisha ", "2024-2025").expect("get").is_some());
    }

    #[test]
    fn test_states_sorted() {
        let store = MemoryStore::new();
        store.record_seen("Odisha", "Puri").expect("add");
        store.record_seen("Assam", "Cachar").expect("add");
        assert_eq!(store.states().expect("states"), vec!["Assam", "Odisha"]);
    }
}
