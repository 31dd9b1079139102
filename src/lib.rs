//! prseed library crate for seeding pull request data from GitHub.
//!
//! The library fetches pull requests with their reviews, commits, changed
//! files and check runs for a list of repositories. Requests are spread over
//! a pool of personal access tokens, results are cached per repository and
//! refreshed incrementally when the repository has been pushed to, and the
//! final data set is handed to a record sink for downstream loading.

pub mod config;
pub mod github;
pub mod persistence;
pub mod sync;
pub mod telemetry;

pub use config::SeedConfig;
pub use github::{
    CheckRunFetcher, FetchError, FetchPolicy, FetchedPR, GitHubApi, GraphQlFetcher,
    HttpGitHubApi, PersonalAccessToken, PullRequestSource, RepositoryLocator, TokenPool,
};
pub use persistence::{CacheStore, RepositoryCache};
pub use sync::{
    JsonlRecordSink, NoopRecordSink, RecordSink, RepositoryOutcome, RepositorySyncReport,
    RunReport, SeedingOrchestrator, SyncMode, SyncOptions,
};
pub use telemetry::{NoopTelemetrySink, StderrJsonlTelemetrySink, TelemetryEvent, TelemetrySink};
