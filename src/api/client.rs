//! Paginated client for the data.gov.in MGNREGA resource.
//!
//! The upstream caps `limit` below 1000 and rate-limits aggressively, so
//! pages are pulled sequentially with a short politeness delay. Fetch
//! failures are absorbed: the client logs, stops paging, and hands back
//! whatever accumulated, tagged with a [`FetchStatus`].

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::Record;
use crate::store::DistrictRegistry;

use super::{ApiError, FetchOutcome, FetchStatus, RecordSource};

/// One page of the upstream response.
///
/// `total` arrives as a JSON number in some fiscal years and as a string in
/// others; when it is missing entirely the page's own record count stands in
/// for it, which ends the fetch after that page.
#[derive(Debug, Deserialize)]
pub(crate) struct Page {
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total: Option<u64>,
}

fn lenient_u64<'de, D: Deserializer<'de>>(de: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }))
}

/// Drive offset pagination to exhaustion.
///
/// Stops when the accumulated count reaches the reported total, when a page
/// comes back empty (a total miscount must not loop forever), or when a
/// request fails. Sleeps `delay` between successful pages, never after the
/// last one.
pub(crate) async fn collect_pages<F, Fut>(delay: Duration, mut next_page: F) -> (Vec<Record>, FetchStatus)
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<Page, ApiError>>,
{
    let mut records: Vec<Record> = Vec::new();
    let mut offset: u64 = 0;

    loop {
        let page = match next_page(offset).await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, offset, "page request failed, returning partial results");
                return (records, FetchStatus::Failed(e));
            }
        };

        let count = page.records.len() as u64;
        let total = page.total.unwrap_or(count);
        records.extend(page.records);
        debug!(offset, count, total, accumulated = records.len(), "fetched page");

        if records.len() as u64 >= total {
            return (records, FetchStatus::Complete);
        }
        if count == 0 {
            warn!(expected = total, got = records.len(), "empty page before reported total");
            return (records, FetchStatus::Truncated { expected: total });
        }

        offset += count;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Forward district names found on a page to the registry.
///
/// Registry write failures must not abort a fetch in progress; they are
/// logged and the page is still returned to the caller.
pub(crate) fn note_districts(registry: &dyn DistrictRegistry, state: &str, records: &[Record]) {
    for record in records {
        let Some(district) = record.district_name() else {
            continue;
        };
        match registry.record_seen(state, district) {
            Ok(true) => debug!(state, district, "discovered district"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, state, district, "failed to record district name"),
        }
    }
}

/// Client for the upstream dataset endpoint.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    api_key: String,
    page_limit: u64,
    page_delay: Duration,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        let base_url = Url::parse(&config.api_base_url)
            .with_context(|| format!("invalid API base URL: {}", config.api_base_url))?;

        let api_key = config
            .api_key
            .clone()
            .context("no API key configured (set MGNREGA_API_KEY)")?;

        Ok(Self {
            client,
            base_url,
            api_key,
            page_limit: config.page_limit,
            page_delay: Duration::from_millis(config.page_delay_ms),
        })
    }

    fn build_url(&self, api_key: &str, state_u: &str, fin_year: &str, offset: u64) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("api-key", api_key)
            .append_pair("format", "json")
            .append_pair("limit", &self.page_limit.to_string())
            .append_pair("offset", &offset.to_string())
            .append_pair("filters[state_name]", state_u)
            .append_pair("filters[fin_year]", fin_year);
        url
    }

    /// The exact URL a page request would hit, for debugging/preview.
    pub fn page_url(&self, state: &str, fin_year: &str, offset: u64) -> String {
        self.build_url(
            &self.api_key,
            &state.trim().to_uppercase(),
            fin_year.trim(),
            offset,
        )
        .to_string()
    }

    /// Same as [`Self::page_url`] with the credential masked, for logs.
    fn redacted_url(&self, state_u: &str, fin_year: &str, offset: u64) -> String {
        self.build_url("REDACTED", state_u, fin_year, offset).to_string()
    }

    async fn request_page(&self, state_u: &str, fin_year: &str, offset: u64) -> Result<Page, ApiError> {
        let url = self.build_url(&self.api_key, state_u, fin_year, offset);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::upstream(status, &body));
        }

        Ok(response.json::<Page>().await?)
    }
}

#[async_trait]
impl RecordSource for ApiClient {
    async fn fetch_all(
        &self,
        state: &str,
        fin_year: &str,
        registry: &dyn DistrictRegistry,
    ) -> FetchOutcome {
        let state_u = state.trim().to_uppercase();
        let fin_year = fin_year.trim().to_string();
        debug!(url = %self.redacted_url(&state_u, &fin_year, 0), "starting paginated fetch");

        let (records, status) = collect_pages(self.page_delay, |offset| {
            let state_u = &state_u;
            let fin_year = &fin_year;
            async move {
                let page = self.request_page(state_u, fin_year, offset).await?;
                note_districts(registry, state, &page.records);
                Ok(page)
            }
        })
        .await;

        FetchOutcome { records, status }
    }
}
