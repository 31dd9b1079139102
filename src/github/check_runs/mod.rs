//! REST supplement attaching CI check runs to fetched pull requests.
//!
//! GraphQL exposes check suites only awkwardly, so check runs are read from
//! the REST `check-runs` endpoint using the head SHA already present in each
//! pull request's commit list. Requests are issued strictly one after another:
//! concurrent bursts trip GitHub's secondary rate limits. Before a batch
//! starts the REST quota is checked, and the whole batch is skipped when it
//! is below the configured low-water mark.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::github::error::FetchError;
use crate::github::locator::RepositoryLocator;
use crate::github::models::{CheckRunResult, FetchedPR};
use crate::github::token_pool::TokenPool;


/// Default REST quota below which the check-run pass is skipped.
pub const DEFAULT_MIN_QUOTA: u32 = 100;

/// Why some pull requests were left without check runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Remaining REST quota was below the low-water mark.
    LowQuota {
        /// Remaining REST quota when the batch started.
        remaining: u32,
        /// Configured low-water mark.
        minimum: u32,
    },
    /// The quota check itself failed.
    QuotaUnavailable {
        /// Error detail.
        message: String,
    },
    /// Every credential was exhausted.
    TokensExhausted,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LowQuota { remaining, minimum } => {
                write!(formatter, "REST quota {remaining} is below {minimum}")
            }
            Self::QuotaUnavailable { message } => {
                write!(formatter, "REST quota check failed: {message}")
            }
            Self::TokensExhausted => formatter.write_str("all tokens exhausted"),
        }
    }
}

/// Outcome of one check-run pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckRunSummary {
    /// Check runs attached across the batch.
    pub fetched_runs: usize,
    /// Commits whose check runs were requested.
    pub commits_queried: usize,
    /// Pull requests left without check runs because of a skip.
    pub skipped_prs: usize,
    /// Set when the pass stopped early or never started.
    pub skip_reason: Option<SkipReason>,
}

/// Attaches check runs to a batch of pull requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CheckRunSupplier: Send + Sync {
    /// Fills `check_runs` on each pull request in `prs` where quota allows.
    async fn attach_check_runs(
        &self,
        repository: &RepositoryLocator,
        prs: &mut [FetchedPR],
    ) -> CheckRunSummary;
}

/// Sequential check-run fetcher drawing credentials from the token pool.
pub struct CheckRunFetcher {
    pool: Arc<TokenPool>,
    min_quota: u32,
}

impl CheckRunFetcher {
    /// Creates a fetcher that skips batches when REST quota is below `min_quota`.
    #[must_use]
    pub const fn new(pool: Arc<TokenPool>, min_quota: u32) -> Self {
        Self { pool, min_quota }
    }

    /// Lists check runs for one commit.
    ///
    /// A rate-limited credential is parked for REST only and the request
    /// moves to the next one; this never waits for a reset.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::AllTokensExhausted`] once every credential is
    /// parked for REST, or the gateway error for the request.
    pub async fn fetch_check_runs_for_commit(
        &self,
        repository: &RepositoryLocator,
        sha: &str,
    ) -> Result<Vec<CheckRunResult>, FetchError> {
        loop {
            let client = self.pool.get_best_rest_client()?;
            match client.api().check_runs(repository, sha).await {
                Err(FetchError::RateLimitExceeded { rate_limit, .. }) => {
                    let reset = rate_limit
                        .and_then(|info| info.reset_time())
                        .filter(|reset| *reset > Utc::now());
                    self.pool.mark_rest_rate_limited(&client, reset);
                }
                other => return other,
            }
        }
    }

    /// Checks REST quota before a batch; `None` means the batch may proceed.
    async fn quota_gate(&self) -> Option<SkipReason> {
        let Ok(client) = self.pool.get_best_rest_client() else {
            return Some(SkipReason::TokensExhausted);
        };

        match client.api().rate_limits().await {
            Ok(snapshot) if snapshot.core.remaining() < self.min_quota => {
                Some(SkipReason::LowQuota {
                    remaining: snapshot.core.remaining(),
                    minimum: self.min_quota,
                })
            }
            Ok(_) => None,
            Err(error) => Some(SkipReason::QuotaUnavailable {
                message: error.to_string(),
            }),
        }
    }
}

#[async_trait]
impl CheckRunSupplier for CheckRunFetcher {
    async fn attach_check_runs(
        &self,
        repository: &RepositoryLocator,
        prs: &mut [FetchedPR],
    ) -> CheckRunSummary {
        let mut summary = CheckRunSummary::default();
        if prs.is_empty() {
            return summary;
        }

        if let Some(reason) = self.quota_gate().await {
            warn!(repository = %repository, %reason, "skipping check runs");
            summary.skipped_prs = prs.len();
            summary.skip_reason = Some(reason);
            return summary;
        }

        let total = prs.len();
        for (position, pr) in prs.iter_mut().enumerate() {
            let Some(sha) = pr.head_sha().map(ToOwned::to_owned) else {
                debug!(pr = pr.number, "no commits; skipping check runs");
                continue;
            };

            summary.commits_queried += 1;
            match self.fetch_check_runs_for_commit(repository, &sha).await {
                Ok(runs) => {
                    summary.fetched_runs += runs.len();
                    pr.check_runs = runs;
                }
                Err(FetchError::AllTokensExhausted { .. }) => {
                    warn!(repository = %repository, "tokens exhausted; stopping check-run pass");
                    summary.skip_reason = Some(SkipReason::TokensExhausted);
                    summary.skipped_prs = total.saturating_sub(position);
                    break;
                }
                Err(error) => {
                    warn!(pr = pr.number, sha = %sha, %error, "failed to fetch check runs");
                }
            }
        }

        summary
    }
}
