//! Error mapping helpers for the GitHub gateway implementation.

use http::{HeaderMap, StatusCode};

use crate::github::error::FetchError;
use crate::github::rate_limit::RateLimitInfo;

use super::http_utils::{extract_github_message, rate_limit_from_response};

/// GraphQL error `type` GitHub reports when the query budget is spent.
pub(super) const GRAPHQL_RATE_LIMITED: &str = "RATE_LIMITED";

/// Checks if a GitHub error status indicates an authentication failure.
pub(super) const fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

/// Checks if an octocrab error represents a network/transport issue.
pub(super) const fn is_network_error(error: &octocrab::Error) -> bool {
    matches!(
        error,
        octocrab::Error::Http { .. }
            | octocrab::Error::Hyper { .. }
            | octocrab::Error::Service { .. }
    )
}

/// Checks whether a response is a primary or secondary rate limit rejection.
///
/// GitHub answers exhausted quota with 403 or 429; the body message, the
/// `x-ratelimit-remaining: 0` header, or a `retry-after` header distinguishes
/// it from a permissions failure.
pub(super) fn is_rate_limit_response(
    status: StatusCode,
    headers: &HeaderMap,
    message: Option<&str>,
) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    if status != StatusCode::FORBIDDEN {
        return false;
    }

    let message_indicates_rate_limit =
        message.is_some_and(|text| text.to_lowercase().contains("rate limit"));
    let quota_spent = RateLimitInfo::from_headers(headers).is_some_and(|info| info.is_exhausted());

    message_indicates_rate_limit || quota_spent || headers.contains_key(http::header::RETRY_AFTER)
}

/// Translates a non-success HTTP response into the fetch error taxonomy.
pub(super) fn map_status_error(
    operation: &str,
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
) -> FetchError {
    let message = extract_github_message(body).unwrap_or_else(|| "unknown error".to_owned());

    if is_rate_limit_response(status, headers, Some(&message)) {
        return FetchError::RateLimitExceeded {
            rate_limit: rate_limit_from_response(headers),
            message: format!("{operation}: {message}"),
        };
    }

    if is_auth_failure(status) {
        return FetchError::Authentication {
            message: format!("{operation} failed: GitHub returned {status} {message}"),
        };
    }

    if status.is_server_error() {
        return FetchError::Server {
            status: status.as_u16(),
            message: format!("{operation}: {message}"),
        };
    }

    FetchError::Api {
        message: format!("{operation} failed with status {status}: {message}"),
    }
}

pub(super) fn map_octocrab_error(operation: &str, error: &octocrab::Error) -> FetchError {
    if let octocrab::Error::GitHub { source, .. } = error {
        return map_status_error(
            operation,
            source.status_code,
            &HeaderMap::new(),
            &serde_json::json!({ "message": source.message }).to_string(),
        );
    }

    if is_network_error(error) {
        return FetchError::Network {
            message: format!("{operation} failed: {error}"),
        };
    }

    FetchError::Api {
        message: format!("{operation} failed: {error}"),
    }
}

pub(super) fn map_reqwest_error(operation: &str, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() || error.is_connect() || error.is_request() || error.is_body() {
        return FetchError::Network {
            message: format!("{operation} failed: {error}"),
        };
    }

    FetchError::Api {
        message: format!("{operation} failed: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use http::{HeaderMap, HeaderValue, StatusCode};
    use rstest::rstest;

    use super::map_status_error;
    use crate::github::error::FetchError;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[rstest]
    fn forbidden_with_spent_quota_is_rate_limited() {
        let error = map_status_error(
            "graphql",
            StatusCode::FORBIDDEN,
            &headers(&[
                ("x-ratelimit-remaining", "0"),
                ("x-ratelimit-reset", "1700000000"),
            ]),
            r#"{"message":"API rate limit exceeded"}"#,
        );

        let FetchError::RateLimitExceeded { rate_limit, .. } = error else {
            panic!("expected rate limit error, got {error:?}");
        };
        assert_eq!(
            rate_limit.map(|info| info.reset_at()),
            Some(1_700_000_000)
        );
    }

    #[rstest]
    fn forbidden_without_rate_limit_hints_is_authentication() {
        let error = map_status_error(
            "graphql",
            StatusCode::FORBIDDEN,
            &HeaderMap::new(),
            r#"{"message":"Resource not accessible by integration"}"#,
        );

        assert!(
            matches!(error, FetchError::Authentication { .. }),
            "unexpected error: {error:?}"
        );
    }

    #[rstest]
    #[case::too_many_requests(StatusCode::TOO_MANY_REQUESTS, true)]
    #[case::bad_gateway(StatusCode::BAD_GATEWAY, false)]
    fn status_classification(#[case] status: StatusCode, #[case] rate_limited: bool) {
        let error = map_status_error("check runs", status, &HeaderMap::new(), "");

        assert_eq!(error.is_rate_limited(), rate_limited, "{error:?}");
        assert_eq!(error.is_transient(), !rate_limited, "{error:?}");
    }

    #[rstest]
    fn unauthorised_is_authentication() {
        let error = map_status_error(
            "graphql",
            StatusCode::UNAUTHORIZED,
            &HeaderMap::new(),
            r#"{"message":"Bad credentials"}"#,
        );

        assert_eq!(
            error,
            FetchError::Authentication {
                message: "graphql failed: GitHub returned 401 Unauthorized Bad credentials"
                    .to_owned()
            }
        );
    }
}
