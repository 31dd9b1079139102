//! Rate limit information from GitHub API responses.
//!
//! GitHub reports quota through `X-RateLimit-*` response headers on both the
//! REST and GraphQL endpoints, and through the `rateLimit` field that GraphQL
//! queries may select. [`RateLimitInfo`] is the common snapshot the token
//! pool and the check-run quota gate consume.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use http::HeaderMap;

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

/// Rate limit information extracted from GitHub API responses.
///
/// # Example
///
/// ```
/// use prseed::github::rate_limit::RateLimitInfo;
///
/// let info = RateLimitInfo::new(5000, 4999, 1700000000);
/// assert!(!info.is_exhausted());
/// assert_eq!(info.remaining(), 4999);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Maximum points allowed in the current window.
    limit: u32,
    /// Remaining points in the current window.
    remaining: u32,
    /// Unix timestamp when the rate limit resets.
    reset_at: u64,
}

impl RateLimitInfo {
    /// Creates a new rate limit info instance.
    #[must_use]
    pub const fn new(limit: u32, remaining: u32, reset_at: u64) -> Self {
        Self {
            limit,
            remaining,
            reset_at,
        }
    }

    /// Creates a snapshot from a reset instant rather than a Unix timestamp.
    #[must_use]
    pub fn with_reset_time(limit: u32, remaining: u32, reset: DateTime<Utc>) -> Self {
        let reset_at = u64::try_from(reset.timestamp()).unwrap_or(0);
        Self::new(limit, remaining, reset_at)
    }

    /// Parses the `X-RateLimit-*` headers of a response.
    ///
    /// Returns `None` unless both the remaining count and the reset time are
    /// present and numeric. A missing limit header is reported as zero.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let remaining = numeric_header::<u32>(headers, REMAINING_HEADER)?;
        let reset_at = numeric_header::<u64>(headers, RESET_HEADER)?;
        let limit = numeric_header::<u32>(headers, LIMIT_HEADER).unwrap_or(0);
        Some(Self::new(limit, remaining, reset_at))
    }

    /// Returns the maximum points allowed in the current window.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Returns the remaining points in the current window.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Returns the Unix timestamp when the rate limit resets.
    #[must_use]
    pub const fn reset_at(&self) -> u64 {
        self.reset_at
    }

    /// Returns the reset instant, or `None` when the timestamp is out of range.
    #[must_use]
    pub fn reset_time(&self) -> Option<DateTime<Utc>> {
        let seconds = i64::try_from(self.reset_at).ok()?;
        DateTime::from_timestamp(seconds, 0)
    }

    /// Returns true if the rate limit has been exhausted.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Calculates seconds until the rate limit resets.
    ///
    /// Returns 0 if the reset time has already passed or if the system time
    /// cannot be determined.
    #[must_use]
    pub fn seconds_until_reset(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_secs())
            .unwrap_or(0);

        self.reset_at.saturating_sub(now)
    }
}

fn numeric_header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<T>().ok())
}
