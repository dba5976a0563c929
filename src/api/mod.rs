//! Upstream API access for the MGNREGA dataset.
//!
//! [`ApiClient`] pages through the data.gov.in resource for one
//! (state, fiscal year) slice. The [`RecordSource`] trait is the seam the
//! cache builder depends on, so tests can script a fake source instead of
//! touching the network.

pub mod client;
pub mod error;

use async_trait::async_trait;

use crate::models::Record;
use crate::store::DistrictRegistry;

pub use client::ApiClient;
pub use error::ApiError;

/// How a paginated fetch ended.
#[derive(Debug)]
pub enum FetchStatus {
    /// Every page arrived and the accumulated count reached the reported
    /// total.
    Complete,
    /// The upstream stopped returning records before the reported total was
    /// reached.
    Truncated { expected: u64 },
    /// A transport or upstream error ended the fetch early.
    Failed(ApiError),
}

/// Result of a paginated fetch: the accumulated records plus how the fetch
/// ended. Failures never surface as `Err` - callers always get whatever was
/// fetched before the problem.
#[derive(Debug)]
pub struct FetchOutcome {
    pub records: Vec<Record>,
    pub status: FetchStatus,
}

impl FetchOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self.status, FetchStatus::Complete)
    }
}

/// A source of raw records for a (state, fiscal year) slice.
///
/// Implementations forward newly seen district names to the registry as
/// records arrive, and absorb all fetch-time failures into the returned
/// [`FetchOutcome`].
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_all(
        &self,
        state: &str,
        fin_year: &str,
        registry: &dyn DistrictRegistry,
    ) -> FetchOutcome;
}
