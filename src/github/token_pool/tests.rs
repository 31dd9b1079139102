//! Tests for credential selection, exhaustion and reset waiting.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use rstest::{fixture, rstest};
use tokio::time::Instant;

use super::{DEFAULT_QUOTA, TokenPool};
use crate::github::error::FetchError;
use crate::github::gateway::{
    GitHubApi, GraphQlRequest, GraphQlResponse, MockGitHubApi, QuotaSnapshot,
};
use crate::github::locator::{PersonalAccessToken, RepositoryLocator};
use crate::github::models::CheckRunResult;
use crate::github::rate_limit::RateLimitInfo;
use crate::telemetry::{RecordingTelemetrySink, TelemetryEvent};

fn token(suffix: &str) -> PersonalAccessToken {
    PersonalAccessToken::new(format!("ghp_token_{suffix}")).expect("token should be valid")
}

fn untouched_api() -> Arc<dyn GitHubApi> {
    Arc::new(MockGitHubApi::new())
}

/// Pool with quotas `[0, 50, 200]` where the first token is exhausted.
#[fixture]
fn uneven_pool() -> TokenPool {
    let pool = TokenPool::new(vec![
        (token("zero"), untouched_api()),
        (token("fifty"), untouched_api()),
        (token("two_hundred"), untouched_api()),
    ])
    .expect("pool should build");

    let reset = Utc::now() + ChronoDuration::minutes(30);
    pool.update_quota(0, &RateLimitInfo::with_reset_time(5000, 0, reset));
    pool.update_quota(1, &RateLimitInfo::with_reset_time(5000, 50, reset));
    pool.update_quota(2, &RateLimitInfo::with_reset_time(5000, 200, reset));
    pool
}

#[rstest]
fn empty_pool_is_a_configuration_error() {
    assert!(matches!(
        TokenPool::new(Vec::new()),
        Err(FetchError::MissingToken)
    ));
}

#[rstest]
fn selection_prefers_highest_quota_then_falls_back(uneven_pool: TokenPool) {
    let first = uneven_pool.get_best_client().expect("a token should be free");
    assert_eq!(first.index(), 2);

    uneven_pool.mark_rate_limited(&first, None);
    let second = uneven_pool.get_best_client().expect("a token should be free");
    assert_eq!(second.index(), 1);

    uneven_pool.mark_rate_limited(&second, None);
    let error = uneven_pool
        .get_best_client()
        .expect_err("every token is exhausted");
    assert!(matches!(
        error,
        FetchError::AllTokensExhausted { reset_at: Some(_) }
    ));
    assert!(uneven_pool.all_exhausted());
    assert_eq!(uneven_pool.total_remaining(), 0);
}

#[rstest]
fn ties_go_to_the_first_configured_token() {
    let pool = TokenPool::new(vec![
        (token("first"), untouched_api()),
        (token("second"), untouched_api()),
    ])
    .expect("pool should build");

    let client = pool.get_best_client().expect("a token should be free");

    assert_eq!(client.index(), 0);
    assert_eq!(pool.total_remaining(), 10_000);
}

#[rstest]
fn elapsed_reset_readmits_token() {
    let pool = TokenPool::new(vec![(token("only"), untouched_api())]).expect("pool should build");
    let client = pool.get_best_client().expect("a token should be free");

    pool.mark_rate_limited(&client, Some(Utc::now() - ChronoDuration::seconds(1)));

    assert!(!pool.all_exhausted());
    let readmitted = pool.get_best_client().expect("reset has passed");
    assert_eq!(readmitted.index(), 0);
}

#[rstest]
fn elapsed_reset_counts_towards_remaining_quota() {
    let pool = TokenPool::new(vec![(token("only"), untouched_api())]).expect("pool should build");
    let client = pool.get_best_client().expect("a token should be free");

    pool.mark_rate_limited(&client, Some(Utc::now() - ChronoDuration::seconds(1)));

    assert_eq!(pool.total_remaining(), u64::from(DEFAULT_QUOTA));
    assert!(!pool.all_exhausted());
}

#[rstest]
fn rest_parking_is_separate_from_graphql_exhaustion() {
    let pool = TokenPool::new(vec![
        (token("first"), untouched_api()),
        (token("second"), untouched_api()),
    ])
    .expect("pool should build");
    let rest = pool.get_best_rest_client().expect("a token should be free");

    pool.mark_rest_rate_limited(&rest, Some(Utc::now() + ChronoDuration::minutes(5)));

    assert_eq!(pool.get_best_client().expect("graphql is unaffected").index(), 0);
    assert_eq!(
        pool.get_best_rest_client().expect("second token is free").index(),
        1
    );
    assert_eq!(pool.total_remaining(), 10_000);
    assert_eq!(pool.exhaustion_events(), 1);
}

#[rstest]
fn graphql_exhaustion_does_not_park_rest() {
    let pool = TokenPool::new(vec![(token("only"), untouched_api())]).expect("pool should build");
    let client = pool.get_best_client().expect("a token should be free");

    pool.mark_rate_limited(&client, None);

    assert!(pool.get_best_client().is_err());
    assert_eq!(
        pool.get_best_rest_client().expect("rest bucket is separate").index(),
        0
    );
}

#[rstest]
fn elapsed_rest_reset_readmits_token() {
    let pool = TokenPool::new(vec![(token("only"), untouched_api())]).expect("pool should build");
    let client = pool.get_best_rest_client().expect("a token should be free");

    pool.mark_rest_rate_limited(&client, Some(Utc::now() - ChronoDuration::seconds(1)));

    assert!(pool.get_best_rest_client().is_ok());
}

#[rstest]
fn exhaustion_is_counted_and_reported() {
    let telemetry = Arc::new(RecordingTelemetrySink::default());
    let pool = TokenPool::new(vec![(token("abcdefgh1234"), untouched_api())])
        .expect("pool should build")
        .with_telemetry(telemetry.clone());
    let client = pool.get_best_client().expect("a token should be free");

    pool.mark_rate_limited(&client, None);

    assert_eq!(pool.exhaustion_events(), 1);
    let events = telemetry.take();
    assert!(
        matches!(
            events.as_slice(),
            [TelemetryEvent::TokenExhausted { token, .. }] if token == "****1234"
        ),
        "unexpected events: {events:?}"
    );
}

#[rstest]
#[tokio::test]
async fn refresh_clears_exhaustion_when_quota_returns() {
    let mut api = MockGitHubApi::new();
    api.expect_rate_limits().times(1).returning(|| {
        Ok(QuotaSnapshot {
            core: RateLimitInfo::new(5000, 10, 1_700_000_000),
            graphql: Some(RateLimitInfo::new(5000, 4000, 1_700_000_000)),
        })
    });
    let pool = TokenPool::new(vec![(token("only"), Arc::new(api) as Arc<dyn GitHubApi>)])
        .expect("pool should build");
    let client = pool.get_best_client().expect("a token should be free");
    pool.mark_rate_limited(&client, None);

    let info = pool
        .refresh_rate_limit(0)
        .await
        .expect("refresh should succeed");

    assert_eq!(info.remaining(), 4000);
    assert!(!pool.all_exhausted());
    assert_eq!(pool.total_remaining(), 4000);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn zero_wait_returns_immediately_when_exhausted(uneven_pool: TokenPool) {
    let first = uneven_pool.get_best_client().expect("a token should be free");
    uneven_pool.mark_rate_limited(&first, Some(Utc::now() + ChronoDuration::hours(2)));
    let second = uneven_pool.get_best_client().expect("a token should be free");
    uneven_pool.mark_rate_limited(&second, Some(Utc::now() + ChronoDuration::hours(2)));
    let started = Instant::now();

    let error = uneven_pool
        .wait_for_reset(Duration::ZERO)
        .await
        .expect_err("zero wait must not block");

    assert!(matches!(error, FetchError::AllTokensExhausted { .. }));
    assert_eq!(started.elapsed(), Duration::ZERO);
}

/// Reports no quota until a fixed instant on the (paused) tokio clock.
struct RecoveringApi {
    recovers_at: Instant,
    quota_checks: AtomicUsize,
}

#[async_trait]
impl GitHubApi for RecoveringApi {
    async fn graphql(&self, _request: &GraphQlRequest) -> Result<GraphQlResponse, FetchError> {
        Err(FetchError::Api {
            message: "graphql is not used by this fake".to_owned(),
        })
    }

    async fn rate_limits(&self) -> Result<QuotaSnapshot, FetchError> {
        self.quota_checks.fetch_add(1, Ordering::SeqCst);
        let reset = Utc::now() + ChronoDuration::minutes(10);
        let remaining = if Instant::now() >= self.recovers_at {
            5000
        } else {
            0
        };
        Ok(QuotaSnapshot {
            core: RateLimitInfo::with_reset_time(5000, remaining, reset),
            graphql: None,
        })
    }

    async fn check_runs(
        &self,
        _repository: &RepositoryLocator,
        _sha: &str,
    ) -> Result<Vec<CheckRunResult>, FetchError> {
        Ok(Vec::new())
    }
}

fn exhausted_pool_recovering_after(delay: Duration) -> (TokenPool, Arc<RecoveringApi>) {
    let api = Arc::new(RecoveringApi {
        recovers_at: Instant::now() + delay,
        quota_checks: AtomicUsize::new(0),
    });
    let pool = TokenPool::new(vec![
        (token("one"), api.clone() as Arc<dyn GitHubApi>),
        (token("two"), api.clone() as Arc<dyn GitHubApi>),
    ])
    .expect("pool should build");

    let reset = Utc::now() + ChronoDuration::minutes(10);
    pool.update_quota(0, &RateLimitInfo::with_reset_time(5000, 0, reset));
    pool.update_quota(1, &RateLimitInfo::with_reset_time(5000, 0, reset));
    (pool, api)
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn wait_blocks_until_reset_then_returns_client() {
    let (pool, api) = exhausted_pool_recovering_after(Duration::from_secs(600));
    let started = Instant::now();

    let client = pool
        .wait_for_reset(Duration::from_secs(3600))
        .await
        .expect("a token should recover after the reset");

    let waited = started.elapsed();
    assert!(
        (Duration::from_secs(600)..Duration::from_secs(610)).contains(&waited),
        "waited {waited:?}"
    );
    assert_eq!(client.index(), 0);
    assert_eq!(api.quota_checks.load(Ordering::SeqCst), 2);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn wait_gives_up_when_budget_runs_out() {
    let (pool, _api) = exhausted_pool_recovering_after(Duration::from_secs(600));
    let started = Instant::now();

    let error = pool
        .wait_for_reset(Duration::from_secs(30))
        .await
        .expect_err("budget ends before the reset");

    assert!(matches!(error, FetchError::AllTokensExhausted { .. }));
    assert_eq!(started.elapsed(), Duration::from_secs(30));
}
