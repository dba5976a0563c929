//! nregacache - cached district summaries for the MGNREGA public dataset.
//!
//! The data.gov.in MGNREGA resource is paginated, slow, and rate-limited, so
//! this crate fetches a full (state, fiscal year) slice once, groups it by
//! district, and persists it with a 24-hour freshness rule. Summaries are
//! derived on demand from the cached raw records.
//!
//! The pipeline: [`cache::CacheBuilder`] orchestrates the
//! [`api::ApiClient`] (paginated fetch), the [`store::DistrictRegistry`]
//! (district name discovery) and the [`store::CacheStore`] (persistence),
//! then [`aggregate::summarize`] turns a district's records into per-month
//! averages.

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod store;
pub mod utils;

pub use api::{ApiClient, ApiError, FetchOutcome, FetchStatus, RecordSource};
pub use cache::{CacheBuilder, DistrictSummary};
pub use config::Config;
pub use models::{CacheEntry, Record};
pub use store::{CacheStore, DistrictRegistry, FileStore, MemoryStore, StoreError};
