//! Gateway for talking to the GitHub GraphQL and REST APIs.
//!
//! [`GitHubApi`] is the seam between the fetch pipeline and the network. Each
//! implementation is bound to exactly one credential, which lets the token
//! pool hold one client per token and swap between them on rate limits. The
//! trait-based design enables mocking in tests while [`HttpGitHubApi`] handles
//! real HTTP requests.

mod client;
mod error_mapping;
mod http_utils;


pub use client::HttpGitHubApi;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::github::error::FetchError;
use crate::github::locator::RepositoryLocator;
use crate::github::models::CheckRunResult;
use crate::github::rate_limit::RateLimitInfo;

/// A GraphQL document and its variables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQlRequest {
    /// Short operation label used in logs and error messages.
    #[serde(skip)]
    pub operation: &'static str,
    /// GraphQL document.
    pub query: &'static str,
    /// Variables bound to the document.
    pub variables: Value,
}

/// Successful GraphQL response payload.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphQlResponse {
    /// The `data` member of the response.
    pub data: Value,
    /// Quota reported in the response headers.
    pub rate_limit: Option<RateLimitInfo>,
}

/// Quota windows reported by the `/rate_limit` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSnapshot {
    /// REST (`core`) quota.
    pub core: RateLimitInfo,
    /// GraphQL quota, when the host reports it separately.
    pub graphql: Option<RateLimitInfo>,
}

impl QuotaSnapshot {
    /// Quota governing GraphQL queries, falling back to the REST window.
    #[must_use]
    pub fn graphql_or_core(&self) -> RateLimitInfo {
        self.graphql.unwrap_or(self.core)
    }
}

/// Client bound to a single GitHub credential.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Execute a GraphQL request.
    async fn graphql(&self, request: &GraphQlRequest) -> Result<GraphQlResponse, FetchError>;

    /// Query the current quota windows for this credential.
    async fn rate_limits(&self) -> Result<QuotaSnapshot, FetchError>;

    /// List check runs reported for a commit.
    async fn check_runs(
        &self,
        repository: &RepositoryLocator,
        sha: &str,
    ) -> Result<Vec<CheckRunResult>, FetchError>;
}
