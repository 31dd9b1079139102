//! Paginated GraphQL fetching of pull requests with nested details.
//!
//! [`GraphQlFetcher`] pulls pull requests newest first, one page at a time,
//! together with bounded slices of their reviews, commits and changed files.
//! Every request goes through the token pool. A rate-limited credential is
//! parked and the request is replayed on the next best one. When all are
//! exhausted the fetcher waits for a reset if its policy allows it, bounded
//! by a total wait budget per operation. Transient network and server errors
//! are retried with exponential backoff.

mod queries;
mod response;


use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::github::error::FetchError;
use crate::github::gateway::{GraphQlRequest, GraphQlResponse};
use crate::github::locator::RepositoryLocator;
use crate::github::models::{FetchedPR, RepositoryMetadata};
use crate::github::token_pool::{PooledClient, TokenPool};

use queries::{PULL_REQUESTS_QUERY, REPOSITORY_METADATA_QUERY};
use response::{PullRequestsData, RepositoryMetadataData};

/// Largest page GitHub accepts for a connection.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pull requests requested per page; larger pages time out on big repositories.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Tuning for pagination, retries and rate-limit waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Pull requests per page (1..=100).
    pub page_size: u32,
    /// Reviews fetched per pull request.
    pub reviews_per_pr: u32,
    /// Most recent commits fetched per pull request.
    pub commits_per_pr: u32,
    /// Changed files fetched per pull request.
    pub files_per_pr: u32,
    /// Whether to wait for a quota reset when every token is exhausted.
    pub wait_for_reset: bool,
    /// Upper bound on time spent waiting for resets within one operation.
    pub max_wait: Duration,
    /// Retries for transient failures.
    pub max_retries: usize,
    /// First backoff delay.
    pub min_backoff: Duration,
    /// Longest backoff delay.
    pub max_backoff: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            reviews_per_pr: 25,
            commits_per_pr: 50,
            files_per_pr: 50,
            wait_for_reset: true,
            max_wait: Duration::from_secs(3600),
            max_retries: 3,
            min_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl FetchPolicy {
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_backoff)
            .with_max_delay(self.max_backoff)
            .with_max_times(self.max_retries)
            .with_jitter()
    }

    fn clamped_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

/// Source of pull request data for one repository.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Cheap lookup of the repository's last push, for change detection.
    async fn fetch_repo_metadata(
        &self,
        repository: &RepositoryLocator,
    ) -> Result<RepositoryMetadata, FetchError>;

    /// Pull requests created at or after `since`, newest first, with details.
    ///
    /// At most `max_count` pull requests are returned when a bound is given.
    async fn fetch_prs_with_details(
        &self,
        repository: &RepositoryLocator,
        since: DateTime<Utc>,
        max_count: Option<usize>,
    ) -> Result<Vec<FetchedPR>, FetchError>;

    /// Pull requests updated at or after `since`, most recently updated first.
    async fn fetch_updated_prs(
        &self,
        repository: &RepositoryLocator,
        since: DateTime<Utc>,
    ) -> Result<Vec<FetchedPR>, FetchError>;
}

/// Which timestamp drives ordering and the `since` cut-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageOrder {
    Created,
    Updated,
}

impl PageOrder {
    const fn order_field(self) -> &'static str {
        match self {
            Self::Created => "CREATED_AT",
            Self::Updated => "UPDATED_AT",
        }
    }
}

/// GraphQL client fetching pull requests through a [`TokenPool`].
pub struct GraphQlFetcher {
    pool: Arc<TokenPool>,
    policy: FetchPolicy,
}

impl GraphQlFetcher {
    /// Creates a fetcher over `pool`.
    #[must_use]
    pub const fn new(pool: Arc<TokenPool>, policy: FetchPolicy) -> Self {
        Self { pool, policy }
    }

    /// The active policy.
    #[must_use]
    pub const fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Executes `request`, rotating credentials on rate limits.
    async fn execute(
        &self,
        request: &GraphQlRequest,
    ) -> Result<(PooledClient, GraphQlResponse), FetchError> {
        let started = Instant::now();
        loop {
            let client = self.checkout(started).await?;
            match self.send_with_backoff(&client, request).await {
                Ok(response) => {
                    if let Some(info) = response.rate_limit.as_ref() {
                        self.pool.record_rate_limit(&client, info);
                    }
                    return Ok((client, response));
                }
                Err(FetchError::RateLimitExceeded {
                    rate_limit,
                    message,
                }) => {
                    debug!(
                        operation = request.operation,
                        token = client.masked_token(),
                        %message,
                        "retrying on another token"
                    );
                    let reset = rate_limit
                        .and_then(|info| info.reset_time())
                        .filter(|reset| *reset > Utc::now());
                    self.pool.mark_rate_limited(&client, reset);
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Picks the best client, waiting for a reset within the budget.
    async fn checkout(&self, started: Instant) -> Result<PooledClient, FetchError> {
        match self.pool.get_best_client() {
            Ok(client) => Ok(client),
            Err(FetchError::AllTokensExhausted { reset_at }) => {
                let budget = self.policy.max_wait.saturating_sub(started.elapsed());
                if !self.policy.wait_for_reset || budget.is_zero() {
                    return Err(FetchError::AllTokensExhausted { reset_at });
                }
                self.pool.wait_for_reset(budget).await
            }
            Err(other) => Err(other),
        }
    }

    async fn send_with_backoff(
        &self,
        client: &PooledClient,
        request: &GraphQlRequest,
    ) -> Result<GraphQlResponse, FetchError> {
        (|| async move { client.api().graphql(request).await })
            .retry(self.policy.backoff())
            .sleep(tokio::time::sleep)
            .when(FetchError::is_transient)
            .notify(|error, delay| {
                warn!(
                    operation = request.operation,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    %error,
                    "transient GitHub failure; backing off"
                );
            })
            .await
    }

    async fn fetch_pages(
        &self,
        repository: &RepositoryLocator,
        since: DateTime<Utc>,
        max_count: Option<usize>,
        order: PageOrder,
    ) -> Result<Vec<FetchedPR>, FetchError> {
        let mut collected: Vec<FetchedPR> = Vec::new();
        let mut cursor: Option<String> = None;
        let page_size = self.policy.clamped_page_size();

        loop {
            let wanted = max_count.map_or(page_size, |max| {
                let left = max.saturating_sub(collected.len());
                u32::try_from(left).unwrap_or(u32::MAX).min(page_size)
            });
            if wanted == 0 {
                break;
            }

            let request = GraphQlRequest {
                operation: "pull requests",
                query: PULL_REQUESTS_QUERY,
                variables: json!({
                    "owner": repository.owner().as_str(),
                    "name": repository.repository().as_str(),
                    "pageSize": wanted,
                    "cursor": cursor,
                    "orderField": order.order_field(),
                    "reviewsPerPr": self.policy.reviews_per_pr,
                    "commitsPerPr": self.policy.commits_per_pr,
                    "filesPerPr": self.policy.files_per_pr,
                }),
            };
            let (client, response) = self.execute(&request).await?;
            let header_quota = response.rate_limit;
            let data: PullRequestsData =
                serde_json::from_value(response.data).map_err(|error| FetchError::Api {
                    message: format!("pull requests response mapping failed: {error}"),
                })?;

            if let Some(rate_limit) = data.rate_limit.as_ref() {
                debug!(
                    repository = %repository,
                    cost = rate_limit.cost,
                    "pull request page fetched"
                );
                if header_quota.is_none() {
                    self.pool.record_rate_limit(&client, &rate_limit.to_info());
                }
            }

            let connection = data
                .repository
                .ok_or_else(|| FetchError::Api {
                    message: format!("repository {repository} was not found"),
                })?
                .pull_requests;

            let mut reached_since = false;
            for node in connection.nodes.into_iter().flatten() {
                let key = match order {
                    PageOrder::Created => node.created_at,
                    PageOrder::Updated => node.updated_at,
                };
                if key < since {
                    reached_since = true;
                    break;
                }
                node.log_truncation();
                collected.push(FetchedPR::from(node));
            }

            let limit_reached = max_count.is_some_and(|max| collected.len() >= max);
            if reached_since || limit_reached || !connection.page_info.has_next_page {
                break;
            }
            cursor = connection.page_info.end_cursor;
            if cursor.is_none() {
                break;
            }
        }

        if let Some(max) = max_count {
            collected.truncate(max);
        }
        Ok(collected)
    }
}

#[async_trait]
impl PullRequestSource for GraphQlFetcher {
    async fn fetch_repo_metadata(
        &self,
        repository: &RepositoryLocator,
    ) -> Result<RepositoryMetadata, FetchError> {
        let request = GraphQlRequest {
            operation: "repository metadata",
            query: REPOSITORY_METADATA_QUERY,
            variables: json!({
                "owner": repository.owner().as_str(),
                "name": repository.repository().as_str(),
            }),
        };
        let (_client, response) = self.execute(&request).await?;
        let data: RepositoryMetadataData =
            serde_json::from_value(response.data).map_err(|error| FetchError::Api {
                message: format!("repository metadata mapping failed: {error}"),
            })?;

        data.repository
            .map(RepositoryMetadata::from)
            .ok_or_else(|| FetchError::Api {
                message: format!("repository {repository} was not found"),
            })
    }

    async fn fetch_prs_with_details(
        &self,
        repository: &RepositoryLocator,
        since: DateTime<Utc>,
        max_count: Option<usize>,
    ) -> Result<Vec<FetchedPR>, FetchError> {
        self.fetch_pages(repository, since, max_count, PageOrder::Created)
            .await
    }

    async fn fetch_updated_prs(
        &self,
        repository: &RepositoryLocator,
        since: DateTime<Utc>,
    ) -> Result<Vec<FetchedPR>, FetchError> {
        self.fetch_pages(repository, since, None, PageOrder::Updated)
            .await
    }
}
