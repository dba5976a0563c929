//! Cached (state, fiscal year) slices of the upstream dataset.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::Record;

/// A full fetch of one (state, fiscal year) slice, grouped by district.
///
/// An entry always represents a complete pass over the upstream pages; it is
/// replaced wholesale on refresh and never merged incrementally. Stale
/// entries stay readable - freshness is the caller's decision via
/// [`CacheEntry::is_fresh`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// State name as stored (trimmed, original casing).
    pub state: String,
    /// Fiscal year partition key, e.g. "2024-2025".
    pub fin_year: String,
    /// Timestamp of the last successful full fetch.
    pub fetched_at: DateTime<Utc>,
    /// Record count before grouping (includes records later dropped for a
    /// missing district).
    pub total_records: usize,
    /// Records keyed by uppercased, trimmed district name.
    pub by_district: BTreeMap<String, Vec<Record>>,
}

impl CacheEntry {
    pub fn new(
        state: &str,
        fin_year: &str,
        total_records: usize,
        by_district: BTreeMap<String, Vec<Record>>,
    ) -> Self {
        Self {
            state: state.trim().to_string(),
            fin_year: fin_year.trim().to_string(),
            fetched_at: Utc::now(),
            total_records,
            by_district,
        }
    }

    /// True while the entry is younger than `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        Utc::now() - self.fetched_at < ttl
    }

    /// Human-readable age for status output.
    pub fn age_display(&self) -> String {
        let minutes = (Utc::now() - self.fetched_at).num_minutes();
        if minutes < 1 {
            // Covers clock skew too
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}
