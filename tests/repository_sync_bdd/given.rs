//! Given steps for repository sync behavioural tests.

use chrono::Duration;
use prseed::github::models::test_support::{minimal_pr, timestamp};
use prseed::{CacheStore, RepositoryCache};
use rstest_bdd_macros::given;
use serde_json::Value;

use crate::repository_sync_bdd_state::SyncState;
use crate::support::github_mocks::{
    check_runs_mock, metadata_mock, pull_request_node, pull_requests_mock, rest_quota_mock,
};

const CACHE_FETCHED_AT: &str = "2024-06-10T00:00:00Z";
const CACHE_SINCE: &str = "2024-04-01T00:00:00Z";

#[given("a mock GitHub API for {repository} pushed at {pushed_at}")]
fn mock_github_api(sync_state: &SyncState, repository: String, pushed_at: String) {
    let locator = sync_state.locator(&repository);

    sync_state.github().mount(metadata_mock(
        &locator.full_name(),
        pushed_at.trim_matches('"'),
    ));
    sync_state.repository.set(locator);
}

#[given("the API lists {count:u64} pull requests created since {created}")]
fn api_lists_pull_requests(sync_state: &SyncState, count: u64, created: String) {
    let base = timestamp(created.trim_matches('"'));

    // Newest first, matching the CREATED_AT DESC ordering of the query.
    let nodes: Vec<Value> = (1..=count)
        .rev()
        .map(|number| {
            let created_at = base + Duration::days(i64::try_from(number).unwrap_or_default());
            let updated_at = created_at + Duration::hours(1);
            pull_request_node(number, &created_at.to_rfc3339(), &updated_at.to_rfc3339())
        })
        .collect();

    sync_state
        .github()
        .mount(pull_requests_mock("CREATED_AT", nodes));
}

#[given("the API lists {count:u64} updated pull request")]
fn api_lists_updated_pull_requests(sync_state: &SyncState, count: u64) {
    let nodes: Vec<Value> = (1..=count)
        .rev()
        .map(|offset| {
            pull_request_node(100 + offset, "2024-06-15T00:00:00Z", "2024-06-16T00:00:00Z")
        })
        .collect();

    sync_state
        .github()
        .mount(pull_requests_mock("UPDATED_AT", nodes));
}

#[given("the API reports a REST quota of {remaining:u32}")]
fn api_reports_rest_quota(sync_state: &SyncState, remaining: u32) {
    let github = sync_state.github();
    github.mount(rest_quota_mock(remaining));
    github.mount(check_runs_mock());
}

#[given("an empty cache directory")]
fn empty_cache_directory(sync_state: &SyncState) {
    let _path = sync_state.cache_path();
}

#[given("a cache for {repository} with {count:u64} pull requests pushed at {pushed_at}")]
fn existing_cache(sync_state: &SyncState, repository: String, count: u64, pushed_at: String) {
    let locator = sync_state.locator(&repository);
    let prs = (1..=count)
        .rev()
        .map(|number| {
            minimal_pr(
                number,
                &format!("2024-05-{number:02}T00:00:00Z"),
                &format!("2024-05-{number:02}T06:00:00Z"),
            )
        })
        .collect();
    let cache = RepositoryCache::new(
        locator.full_name(),
        timestamp(CACHE_FETCHED_AT),
        timestamp(CACHE_SINCE),
        Some(timestamp(pushed_at.trim_matches('"'))),
        prs,
    );

    CacheStore::new(sync_state.cache_path())
        .save(&locator, &cache)
        .unwrap_or_else(|error| panic!("cache should be written: {error}"));
}
