//! Error types exposed by the GitHub fetch layer.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::rate_limit::RateLimitInfo;

/// Errors surfaced while configuring the pipeline or talking to GitHub.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// No API credential was configured.
    #[error(
        "at least one GitHub token is required (use --github-tokens, --github-token, or GITHUB_TOKEN)"
    )]
    MissingToken,

    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },

    /// A repository identifier was not in `owner/name` form.
    #[error("repository must be given as owner/name: {input}")]
    InvalidRepository {
        /// The rejected identifier.
        input: String,
    },

    /// The provided URL could not be parsed.
    #[error("URL is invalid: {0}")]
    InvalidUrl(String),

    /// The authentication token was rejected by GitHub.
    #[error("GitHub rejected the token: {message}")]
    Authentication {
        /// GitHub error message returned with the 401/403 response.
        message: String,
    },

    /// GitHub returned a non-retryable API error.
    #[error("GitHub API error: {message}")]
    Api {
        /// Response body or GraphQL error describing the failure.
        message: String,
    },

    /// GitHub returned a server-side failure that may succeed on retry.
    #[error("GitHub server error {status}: {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Response detail.
        message: String,
    },

    /// Networking failed while calling GitHub (includes request timeouts).
    #[error("network error talking to GitHub: {message}")]
    Network {
        /// Transport-level error detail.
        message: String,
    },

    /// The credential used for a request has hit its rate limit.
    #[error("GitHub API rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Rate limit info if available from headers or the response body.
        rate_limit: Option<RateLimitInfo>,
        /// Error message from GitHub.
        message: String,
    },

    /// Every credential in the pool is exhausted and no wait was possible.
    #[error("all GitHub tokens are rate limited{}", format_reset(.reset_at.as_ref()))]
    AllTokensExhausted {
        /// Soonest known reset across the pool.
        reset_at: Option<DateTime<Utc>>,
    },

    /// Local I/O operation failed.
    #[error("I/O error: {message}")]
    Io {
        /// Error detail from the underlying I/O operation.
        message: String,
    },
}

impl FetchError {
    /// Returns true for failures worth retrying with backoff.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Server { .. })
    }

    /// Returns true when the failure is a per-credential rate limit.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimitExceeded { .. })
    }
}

fn format_reset(reset_at: Option<&DateTime<Utc>>) -> String {
    reset_at.map_or_else(String::new, |reset| {
        format!(" (next reset at {})", reset.to_rfc3339())
    })
}
