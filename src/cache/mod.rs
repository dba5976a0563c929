//! Cache orchestration.
//!
//! [`CacheBuilder`] decides when to serve a cached (state, fiscal year)
//! slice and when to refetch it, and resolves district queries against the
//! grouped records.

pub mod builder;

pub use builder::{group_by_district, CacheBuilder, DistrictMatch, DistrictSummary};
