//! GitHub access for the seeding pipeline.
//!
//! GraphQL is used for pull requests and their nested reviews, commits and
//! files; REST (through Octocrab) for check runs and quota lookups. Every
//! request is routed through a [`TokenPool`] so one exhausted credential
//! does not stall the run. Transport failures are mapped into [`FetchError`]
//! next to the call that produced them.

pub mod check_runs;
pub mod error;
pub mod gateway;
pub mod graphql;
pub mod locator;
pub mod models;
pub mod rate_limit;
pub mod token_pool;

pub use check_runs::{CheckRunFetcher, CheckRunSummary, CheckRunSupplier, SkipReason};
pub use error::FetchError;
pub use gateway::{GitHubApi, HttpGitHubApi, QuotaSnapshot};
pub use graphql::{FetchPolicy, GraphQlFetcher, PullRequestSource};
pub use locator::{PersonalAccessToken, RepositoryLocator, RepositoryName, RepositoryOwner};
pub use models::{
    CheckRunResult, FetchedCommit, FetchedFile, FetchedPR, FetchedReview, PullRequestState,
    RepositoryMetadata,
};
pub use rate_limit::RateLimitInfo;
pub use token_pool::{PooledClient, TokenPool};
