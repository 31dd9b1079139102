//! When steps for repository sync behavioural tests.

use std::sync::Arc;
use std::time::Duration;

use prseed::github::check_runs::DEFAULT_MIN_QUOTA;
use prseed::github::models::test_support::timestamp;
use prseed::{
    CacheStore, CheckRunFetcher, FetchError, FetchPolicy, GitHubApi, GraphQlFetcher,
    HttpGitHubApi, NoopRecordSink, PersonalAccessToken, RepositoryLocator,
    RepositorySyncReport, SeedingOrchestrator, SyncOptions, TokenPool,
};
use rstest_bdd_macros::when;
use url::Url;

use crate::repository_sync_bdd_state::SyncState;

async fn sync_once(
    server_url: &str,
    cache_dir: String,
    locator: &RepositoryLocator,
    options: SyncOptions,
) -> Result<RepositorySyncReport, FetchError> {
    let token = PersonalAccessToken::new("ghp_bdd_token_value")?;
    let base = Url::parse(server_url).map_err(|error| FetchError::InvalidUrl(error.to_string()))?;
    let api: Arc<dyn GitHubApi> =
        Arc::new(HttpGitHubApi::new(&token, &base, Duration::from_secs(5))?);
    let pool = Arc::new(TokenPool::new(vec![(token, api)])?);

    let policy = FetchPolicy {
        wait_for_reset: false,
        max_retries: 0,
        ..FetchPolicy::default()
    };
    let mut orchestrator = SeedingOrchestrator::new(
        GraphQlFetcher::new(Arc::clone(&pool), policy),
        CheckRunFetcher::new(Arc::clone(&pool), DEFAULT_MIN_QUOTA),
        NoopRecordSink,
        CacheStore::new(cache_dir),
        options,
    )
    .with_token_pool(pool);

    orchestrator.sync_repository(locator).await
}

#[when("the repository {repository} is synced since {since}")]
fn sync_repository(sync_state: &SyncState, repository: String, since: String) {
    let github = sync_state.github();
    let locator = sync_state.locator(&repository);
    let cache_dir = sync_state.cache_path();
    let options = SyncOptions::new(timestamp(since.trim_matches('"')));

    let result = github.block_on(sync_once(&github.uri(), cache_dir, &locator, options));

    sync_state.repository.set(locator);
    match result {
        Ok(report) => {
            let _had_previous_error = sync_state.error.take().is_some();
            sync_state.report.set(report);
        }
        Err(error) => {
            let _had_previous_report = sync_state.report.take().is_some();
            sync_state.error.set(error);
        }
    }
}
