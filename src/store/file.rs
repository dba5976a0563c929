//! Flat-file JSON backend.
//!
//! Two documents live in the data directory: `cache.json` (cache key ->
//! entry) and `districts.json` (per-state district lists). Every mutation
//! re-reads the document, applies the change, writes a sibling temp file and
//! renames it over the original, so a reader always sees a complete
//! document. Writers serialize on a per-file mutex; concurrent writers to
//! the same cache key degrade to last-writer-wins.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::CacheEntry;

use super::{cache_key, CacheStore, DistrictRegistry, StoreError};

const CACHE_FILE: &str = "cache.json";
const DISTRICTS_FILE: &str = "districts.json";

type CacheDoc = BTreeMap<String, CacheEntry>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct DistrictDoc {
    #[serde(default)]
    states: Vec<StateEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateEntry {
    state: String,
    #[serde(default)]
    districts: Vec<String>,
}

pub struct FileStore {
    cache_path: PathBuf,
    districts_path: PathBuf,
    cache_lock: Mutex<()>,
    districts_lock: Mutex<()>,
}

impl FileStore {
    /// Open (and create if needed) the data directory.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(data_dir)?;
        Ok(Self {
            cache_path: data_dir.join(CACHE_FILE),
            districts_path: data_dir.join(DISTRICTS_FILE),
            cache_lock: Mutex::new(()),
            districts_lock: Mutex::new(()),
        })
    }

    fn read_doc<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
        if !path.exists() {
            return Ok(T::default());
        }
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write-new-then-rename so no reader ever observes a torn document.
    fn write_doc<T: Serialize>(path: &Path, doc: &T) -> Result<(), StoreError> {
        let tmp = path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(doc)?;
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "wrote store document");
        Ok(())
    }
}

impl CacheStore for FileStore {
    fn get(&self, state: &str, fin_year: &str) -> Result<Option<CacheEntry>, StoreError> {
        let doc: CacheDoc = Self::read_doc(&self.cache_path)?;
        Ok(doc.get(&cache_key(state, fin_year)).cloned())
    }

    fn put(&self, entry: CacheEntry) -> Result<(), StoreError> {
        let _guard = self.cache_lock.lock().expect("cache lock poisoned");
        let mut doc: CacheDoc = Self::read_doc(&self.cache_path)?;
        doc.insert(cache_key(&entry.state, &entry.fin_year), entry);
        Self::write_doc(&self.cache_path, &doc)
    }
}

impl DistrictRegistry for FileStore {
    fn record_seen(&self, state: &str, district: &str) -> Result<bool, StoreError> {
        let state = state.trim();
        let district = district.trim();
        if district.is_empty() {
            return Ok(false);
        }

        let _guard = self.districts_lock.lock().expect("districts lock poisoned");
        let mut doc: DistrictDoc = Self::read_doc(&self.districts_path)?;

        let state_u = state.to_uppercase();
        let index = match doc
            .states
            .iter()
            .position(|s| s.state.trim().to_uppercase() == state_u)
        {
            Some(index) => index,
            None => {
                doc.states.push(StateEntry {
                    state: state.to_string(),
                    districts: Vec::new(),
                });
                doc.states.len() - 1
            }
        };
        let entry = &mut doc.states[index];

        let district_u = district.to_uppercase();
        if entry
            .districts
            .iter()
            .any(|d| d.to_uppercase() == district_u)
        {
            return Ok(false);
        }

        entry.districts.push(district.to_string());
        entry.districts.sort_by_key(|d| d.to_uppercase());
        Self::write_doc(&self.districts_path, &doc)?;
        Ok(true)
    }

    fn list(&self, state: &str) -> Result<Vec<String>, StoreError> {
        let doc: DistrictDoc = Self::read_doc(&self.districts_path)?;
        let state_u = state.trim().to_uppercase();
        Ok(doc
            .states
            .into_iter()
            .find(|s| s.state.trim().to_uppercase() == state_u)
            .map(|s| s.districts)
            .unwrap_or_default())
    }

    fn states(&self) -> Result<Vec<String>, StoreError> {
        let doc: DistrictDoc = Self::read_doc(&self.districts_path)?;
        Ok(doc.states.into_iter().map(|s| s.state).collect())
    }
}
