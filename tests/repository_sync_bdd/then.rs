//! Then steps for repository sync behavioural tests.

use prseed::github::models::test_support::timestamp;
use prseed::{CacheStore, RepositorySyncReport};
use rstest_bdd_macros::then;

use crate::repository_sync_bdd_state::SyncState;

fn report(sync_state: &SyncState) -> RepositorySyncReport {
    let Some(report) = sync_state.report.with_ref(Clone::clone) else {
        let error = sync_state.error.with_ref(Clone::clone);
        panic!("sync report missing; last error: {error:?}");
    };
    report
}

#[then("the sync mode is {mode}")]
fn assert_mode(sync_state: &SyncState, mode: String) {
    assert_eq!(report(sync_state).mode.as_str(), mode.trim_matches('"'));
}

#[then("{total:usize} pull requests are returned with {network:usize} from the network")]
fn assert_counts(sync_state: &SyncState, total: usize, network: usize) {
    let synced = report(sync_state);

    assert_eq!(synced.total_prs, total, "unexpected total");
    assert_eq!(synced.from_network, network, "unexpected network count");
    assert_eq!(
        synced.from_cache,
        total - network,
        "cache and network counts should partition the result"
    );
}

#[then("{count:usize} check runs are attached")]
fn assert_check_runs(sync_state: &SyncState, count: usize) {
    assert_eq!(report(sync_state).check_runs_fetched, count);
}

#[then("check runs were skipped because {reason}")]
fn assert_check_runs_skipped(sync_state: &SyncState, reason: String) {
    let synced = report(sync_state);

    assert_eq!(
        synced.check_run_skip_reason.as_deref(),
        Some(reason.trim_matches('"'))
    );
    assert_eq!(synced.check_runs_skipped, synced.total_prs);
}

#[then("the cache document holds {count:usize} pull requests pushed at {pushed_at}")]
fn assert_cache_document(sync_state: &SyncState, count: usize, pushed_at: String) {
    let Some(locator) = sync_state.repository.get() else {
        panic!("repository missing from scenario state");
    };

    let cache = CacheStore::new(sync_state.cache_path())
        .read(&locator)
        .unwrap_or_else(|error| panic!("cache should be readable: {error}"))
        .unwrap_or_else(|| panic!("cache document missing"));

    assert!(report(sync_state).cache_written, "report should record the write");
    assert_eq!(cache.prs.len(), count, "unexpected cached pull requests");
    assert_eq!(
        cache.repo_pushed_at,
        Some(timestamp(pushed_at.trim_matches('"')))
    );
}

#[then("no pull request pages were requested")]
fn assert_no_pull_request_queries(sync_state: &SyncState) {
    let queries = sync_state
        .github()
        .requests_containing("/graphql", "PullRequestsWithDetails");

    assert_eq!(queries, 0, "cached sync should not page pull requests");
}
