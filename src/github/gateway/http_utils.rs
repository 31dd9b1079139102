//! Shared HTTP utilities for the gateway implementation.

use chrono::{Duration as ChronoDuration, Utc};
use http::HeaderMap;
use http::header::RETRY_AFTER;

use crate::github::rate_limit::RateLimitInfo;

pub(super) fn extract_github_message(body: &str) -> Option<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return None;
    };
    value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
}

/// Reads `retry-after` as whole seconds.
pub(super) fn retry_after_seconds(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
}

/// Rate limit snapshot for a rejected response.
///
/// Quota headers win; a secondary limit that only sends `retry-after` is
/// reported as an exhausted window resetting after that delay.
pub(super) fn rate_limit_from_response(headers: &HeaderMap) -> Option<RateLimitInfo> {
    RateLimitInfo::from_headers(headers).or_else(|| {
        let delay = retry_after_seconds(headers)?;
        let reset = Utc::now() + ChronoDuration::seconds(delay);
        Some(RateLimitInfo::with_reset_time(0, 0, reset))
    })
}
