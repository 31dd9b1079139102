//! Per-repository snapshot of fetched pull requests.
//!
//! A [`RepositoryCache`] covers every pull request created on or after its
//! `since_date`, as GitHub reported them at `fetched_at`. Whether it can be
//! reused is decided by two checks: the requested window must lie inside
//! the covered one, and the repository's current `pushed_at` must equal the
//! one observed when the snapshot was taken. Unknown push times on either
//! side make the snapshot stale, never fresh.

mod store;


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::github::models::FetchedPR;

pub use store::{CacheStore, DEFAULT_CACHE_DIR};

/// Format version written by this build.
pub const CURRENT_CACHE_VERSION: u32 = 2;

/// Version assumed for documents that predate versioning.
///
/// These documents never carry `repo_pushed_at`.
pub const LEGACY_CACHE_VERSION: u32 = 1;

const fn legacy_version() -> u32 {
    LEGACY_CACHE_VERSION
}

/// How a cached snapshot relates to a new request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheFreshness {
    /// The snapshot covers the window and the repository is unchanged.
    Fresh,
    /// The snapshot covers the window but the repository may have changed.
    Stale,
    /// The snapshot starts after the requested window; it cannot be topped up.
    Uncovered,
}

/// Last known fetch state for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryCache {
    /// Document format version.
    #[serde(default = "legacy_version")]
    pub version: u32,
    /// Repository in `owner/name` form.
    pub repo: String,
    /// When the fetch that produced this snapshot started.
    pub fetched_at: DateTime<Utc>,
    /// Lower bound on `created_at` of the cached pull requests.
    pub since_date: DateTime<Utc>,
    /// Repository `pushed_at` observed at fetch time.
    #[serde(default)]
    pub repo_pushed_at: Option<DateTime<Utc>>,
    /// Cached pull requests, most recently updated first.
    #[serde(default)]
    pub prs: Vec<FetchedPR>,
}

impl RepositoryCache {
    /// Builds a snapshot in the current format.
    #[must_use]
    pub fn new(
        repo: impl Into<String>,
        fetched_at: DateTime<Utc>,
        since_date: DateTime<Utc>,
        repo_pushed_at: Option<DateTime<Utc>>,
        prs: Vec<FetchedPR>,
    ) -> Self {
        Self {
            version: CURRENT_CACHE_VERSION,
            repo: repo.into(),
            fetched_at,
            since_date,
            repo_pushed_at,
            prs,
        }
    }

    /// Whether the snapshot's window includes `requested_since`.
    #[must_use]
    pub fn covers(&self, requested_since: DateTime<Utc>) -> bool {
        self.since_date <= requested_since
    }

    /// Whether the snapshot can be returned as-is for a request.
    ///
    /// Requires coverage of `requested_since` and a known, unchanged push
    /// time. A missing `pushed_at` on either side fails closed.
    #[must_use]
    pub fn is_valid(
        &self,
        requested_since: DateTime<Utc>,
        current_pushed_at: Option<DateTime<Utc>>,
    ) -> bool {
        if !self.covers(requested_since) {
            return false;
        }
        match (self.repo_pushed_at, current_pushed_at) {
            (Some(cached), Some(current)) => cached == current,
            _ => false,
        }
    }

    /// Classifies the snapshot for a request.
    #[must_use]
    pub fn assess(
        &self,
        requested_since: DateTime<Utc>,
        current_pushed_at: Option<DateTime<Utc>>,
    ) -> CacheFreshness {
        if !self.covers(requested_since) {
            CacheFreshness::Uncovered
        } else if self.is_valid(requested_since, current_pushed_at) {
            CacheFreshness::Fresh
        } else {
            CacheFreshness::Stale
        }
    }

    /// Cached pull requests created at or after `since`.
    #[must_use]
    pub fn prs_since(&self, since: DateTime<Utc>) -> Vec<FetchedPR> {
        self.prs
            .iter()
            .filter(|pr| pr.created_at >= since)
            .cloned()
            .collect()
    }
}
