//! Orchestration of the fetch-cache-aggregate pipeline.
//!
//! `CacheBuilder` is the only component that triggers network I/O. Callers
//! must treat [`CacheBuilder::get_or_build`] as a potentially slow blocking
//! operation: a cache miss pulls every upstream page for the slice before
//! returning.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::{self, MonthlyRow};
use crate::api::{FetchStatus, RecordSource};
use crate::models::{CacheEntry, Record};
use crate::store::{CacheStore, DistrictRegistry};

/// Group records by uppercased, trimmed district name.
///
/// Records without a district identifier are dropped silently. The map is
/// ordered, so regrouping the same record set always yields the same
/// result.
pub fn group_by_district(records: Vec<Record>) -> BTreeMap<String, Vec<Record>> {
    let mut grouped: BTreeMap<String, Vec<Record>> = BTreeMap::new();
    for record in records {
        let Some(district) = record.district_name() else {
            continue;
        };
        let key = district.to_uppercase();
        grouped.entry(key).or_default().push(record);
    }
    grouped
}

/// Result of a district lookup: the resolved cache key (if any) and its
/// records. An unmatched district is an empty result, not an error.
#[derive(Debug, Default)]
pub struct DistrictMatch {
    pub matched: Option<String>,
    pub records: Vec<Record>,
}

/// What the serving layer receives for one district query.
#[derive(Debug, Serialize)]
pub struct DistrictSummary {
    pub state: String,
    pub fin_year: String,
    pub query: String,
    /// The `by_district` key the query resolved to, `None` when not found.
    pub matched_district: Option<String>,
    /// Calendar-ordered monthly averages.
    pub monthly: Vec<MonthlyRow>,
    /// The latest calendar month with data.
    pub headline: Option<MonthlyRow>,
    /// Raw records backing the summary, for detail rendering.
    pub records: Vec<Record>,
    /// Every district name known for the state, for "did you mean" output.
    pub districts_known: Vec<String>,
}

/// Orchestrates the record source, the district registry and the cache
/// store for (state, fiscal year) slices.
pub struct CacheBuilder {
    source: Arc<dyn RecordSource>,
    cache: Arc<dyn CacheStore>,
    registry: Arc<dyn DistrictRegistry>,
    ttl: Duration,
}

impl CacheBuilder {
    pub fn new(
        source: Arc<dyn RecordSource>,
        cache: Arc<dyn CacheStore>,
        registry: Arc<dyn DistrictRegistry>,
        ttl: Duration,
    ) -> Self {
        Self {
            source,
            cache,
            registry,
            ttl,
        }
    }

    /// Return the cached slice when fresh, otherwise fetch and replace it.
    ///
    /// This is the only path that reaches the upstream API.
    pub async fn get_or_build(&self, state: &str, fin_year: &str) -> Result<CacheEntry> {
        if let Some(entry) = self
            .cache
            .get(state, fin_year)
            .context("cache lookup failed")?
        {
            if entry.is_fresh(self.ttl) {
                debug!(state, fin_year, age = %entry.age_display(), "cache hit");
                return Ok(entry);
            }
            debug!(state, fin_year, age = %entry.age_display(), "cache entry stale");
        }
        self.rebuild(state, fin_year).await
    }

    /// Fetch the slice from upstream and replace the cache entry wholesale,
    /// ignoring freshness. Partial fetches are still cached; the outcome is
    /// logged so degraded entries can be traced.
    pub async fn rebuild(&self, state: &str, fin_year: &str) -> Result<CacheEntry> {
        info!(state, fin_year, "fetching slice from upstream");
        let outcome = self
            .source
            .fetch_all(state, fin_year, self.registry.as_ref())
            .await;

        match &outcome.status {
            FetchStatus::Complete => {
                debug!(records = outcome.records.len(), "fetch complete")
            }
            FetchStatus::Truncated { expected } => {
                warn!(records = outcome.records.len(), expected = *expected, "fetch truncated")
            }
            FetchStatus::Failed(e) => {
                warn!(error = %e, records = outcome.records.len(), "fetch failed, caching partial result")
            }
        }

        let total_records = outcome.records.len();
        let entry = CacheEntry::new(
            state,
            fin_year,
            total_records,
            group_by_district(outcome.records),
        );
        self.cache
            .put(entry.clone())
            .context("failed to persist cache entry")?;
        Ok(entry)
    }

    /// Resolve a user-supplied district string against the cached slice.
    ///
    /// Exact match first; on a miss the slice is rebuilt once (a naming
    /// mismatch often means the snapshot predates the district) and retried;
    /// finally the first key containing the query as a substring wins. The
    /// substring step is best-effort, not ranked: an ambiguous query (say
    /// "ABAD" against both "ADILABAD" and "ABAD") resolves to the first key
    /// in map order.
    pub async fn lookup_district(
        &self,
        state: &str,
        fin_year: &str,
        district: &str,
    ) -> Result<DistrictMatch> {
        let query = district.trim().to_uppercase();
        if query.is_empty() {
            return Ok(DistrictMatch::default());
        }

        let entry = self.get_or_build(state, fin_year).await?;
        if let Some(records) = entry.by_district.get(&query) {
            return Ok(DistrictMatch {
                matched: Some(query),
                records: records.clone(),
            });
        }

        debug!(state, fin_year, district = %query, "no exact match, forcing rebuild");
        let entry = self.rebuild(state, fin_year).await?;
        if let Some(records) = entry.by_district.get(&query) {
            return Ok(DistrictMatch {
                matched: Some(query),
                records: records.clone(),
            });
        }

        if let Some((key, records)) = entry.by_district.iter().find(|(k, _)| k.contains(&query)) {
            debug!(query = %query, matched = %key, "substring fallback match");
            return Ok(DistrictMatch {
                matched: Some(key.clone()),
                records: records.clone(),
            });
        }

        Ok(DistrictMatch::default())
    }

    /// Full answer for one (state, fiscal year, district) query.
    pub async fn get_summary(
        &self,
        state: &str,
        fin_year: &str,
        district: &str,
    ) -> Result<DistrictSummary> {
        let found = self.lookup_district(state, fin_year, district).await?;
        let summary = aggregate::summarize(&found.records);
        let headline = summary.headline().cloned();
        let districts_known = self
            .registry
            .list(state)
            .context("district registry lookup failed")?;

        Ok(DistrictSummary {
            state: state.trim().to_string(),
            fin_year: fin_year.trim().to_string(),
            query: district.trim().to_string(),
            matched_district: found.matched,
            monthly: summary.rows,
            headline,
            records: found.records,
            districts_known,
        })
    }

    /// Known state names, for index-style listings.
    pub fn known_states(&self) -> Result<Vec<String>> {
        Ok(self.registry.states()?)
    }

    /// Known district names for a state.
    pub fn known_districts(&self, state: &str) -> Result<Vec<String>> {
        Ok(self.registry.list(state)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;

    use crate::api::{client::note_districts, FetchOutcome};
    use crate::store::MemoryStore;

    fn record(v: serde_json::Value) -> Record {
        serde_json::from_value(v).expect("test record")
    }

    /// Scripted record source: returns the same records every call and
    /// counts invocations.
    struct FakeSource {
        records: Vec<Record>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(records: Vec<Record>) -> Self {
            Self {
                records,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RecordSource for FakeSource {
        async fn fetch_all(
            &self,
            state: &str,
            _fin_year: &str,
            registry: &dyn DistrictRegistry,
        ) -> FetchOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            note_districts(registry, state, &self.records);
            FetchOutcome {
                records: self.records.clone(),
                status: FetchStatus::Complete,
            }
        }
    }

    fn odisha_records() -> Vec<Record> {
        vec![
            record(json!({"district_name": "Puri", "month": "Jan", "Wages": "10"})),
            record(json!({"district_name": "Puri", "month": "Jan", "Wages": "20"})),
            record(json!({"district_name": "Cuttack", "month": "Feb", "Wages": "5"})),
        ]
    }

    fn builder(records: Vec<Record>) -> (Arc<FakeSource>, Arc<MemoryStore>, CacheBuilder) {
        let source = Arc::new(FakeSource::new(records));
        let store = Arc::new(MemoryStore::new());
        let builder = CacheBuilder::new(
            source.clone(),
            store.clone(),
            store.clone(),
            Duration::hours(24),
        );
        (source, store, builder)
    }

    #[test]
    fn test_grouping_uppercases_and_drops_missing() {
        let records = vec![
            record(json!({"district_name": "Puri", "month": "Jan"})),
            record(json!({"district_name": " puri ", "month": "Feb"})),
            record(json!({"district": "Cuttack", "month": "Jan"})),
            record(json!({"month": "Jan"})),
        ];

        let grouped = group_by_district(records);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["PURI"].len(), 2);
        assert_eq!(grouped["CUTTACK"].len(), 1);
    }

    #[test]
    fn test_grouping_is_idempotent() {
        let forward = odisha_records();
        let mut reversed = odisha_records();
        reversed.reverse();

        let a = group_by_district(forward.clone());
        let b = group_by_district(forward);
        assert_eq!(
            serde_json::to_string(&a).expect("a"),
            serde_json::to_string(&b).expect("b"),
        );

        let c = group_by_district(reversed);
        let keys_a: Vec<&String> = a.keys().collect();
        let keys_c: Vec<&String> = c.keys().collect();
        assert_eq!(keys_a, keys_c);
    }

    #[tokio::test]
    async fn test_fresh_cache_hit_skips_fetch() {
        let (source, _store, builder) = builder(odisha_records());

        let first = builder.get_or_build("Odisha", "2024-2025").await.expect("build");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.total_records, 3);

        let second = builder.get_or_build("Odisha", "2024-2025").await.expect("hit");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.fetched_at, first.fetched_at);
    }

    #[tokio::test]
    async fn test_stale_entry_triggers_refetch() {
        let (source, store, builder) = builder(odisha_records());

        let mut stale = CacheEntry::new("Odisha", "2024-2025", 0, BTreeMap::new());
        stale.fetched_at = Utc::now() - Duration::hours(25);
        store.put(stale).expect("seed");

        let entry = builder.get_or_build("Odisha", "2024-2025").await.expect("rebuild");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(entry.is_fresh(Duration::hours(24)));
        assert_eq!(entry.total_records, 3);
    }

    #[tokio::test]
    async fn test_exact_lookup_does_not_force_rebuild() {
        let (source, _store, builder) = builder(odisha_records());

        let found = builder
            .lookup_district("Odisha", "2024-2025", " puri ")
            .await
            .expect("lookup");
        assert_eq!(found.matched.as_deref(), Some("PURI"));
        assert_eq!(found.records.len(), 2);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fuzzy_fallback_after_forced_rebuild() {
        let (source, _store, builder) = builder(odisha_records());

        let found = builder
            .lookup_district("Odisha", "2024-2025", "PUR")
            .await
            .expect("lookup");
        assert_eq!(found.matched.as_deref(), Some("PURI"));
        assert_eq!(found.records.len(), 2);
        // Initial build plus the forced rebuild before the substring pass.
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unmatched_district_is_empty_not_error() {
        let (_source, _store, builder) = builder(odisha_records());

        let found = builder
            .lookup_district("Odisha", "2024-2025", "NOWHERE")
            .await
            .expect("lookup");
        assert!(found.matched.is_none());
        assert!(found.records.is_empty());
    }

    #[tokio::test]
    async fn test_blank_query_matches_nothing() {
        let (source, _store, builder) = builder(odisha_records());

        let found = builder
            .lookup_district("Odisha", "2024-2025", "   ")
            .await
            .expect("lookup");
        assert!(found.matched.is_none());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_summary_includes_registry_names() {
        let (_source, _store, builder) = builder(odisha_records());

        let summary = builder
            .get_summary("Odisha", "2024-2025", "Puri")
            .await
            .expect("summary");
        assert_eq!(summary.matched_district.as_deref(), Some("PURI"));
        assert_eq!(summary.monthly.len(), 1);
        let headline = summary.headline.as_ref().expect("headline");
        assert_eq!(headline.month, "Jan");
        assert_eq!(headline.wages, 15.0);
        assert_eq!(summary.districts_known, vec!["Cuttack", "Puri"]);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_entry_wholesale() {
        let (_source, store, builder) = builder(odisha_records());

        let mut old = CacheEntry::new("Odisha", "2024-2025", 1, BTreeMap::new());
        old.by_district
            .insert("GHOST".to_string(), vec![record(json!({"month": "Jan"}))]);
        old.fetched_at = Utc::now() - Duration::hours(25);
        store.put(old).expect("seed");

        let entry = builder.get_or_build("Odisha", "2024-2025").await.expect("rebuild");
        assert!(!entry.by_district.contains_key("GHOST"));
    }
}
