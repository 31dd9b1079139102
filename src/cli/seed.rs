//! Seeding run wiring: credentials, clients, cache, sink and orchestrator.

use std::sync::Arc;
use std::time::Duration;

use camino::Utf8Path;
use chrono::{DateTime, Utc};
use prseed::{
    CacheStore, CheckRunFetcher, FetchError, GitHubApi, GraphQlFetcher, HttpGitHubApi,
    JsonlRecordSink, NoopRecordSink, NoopTelemetrySink, PersonalAccessToken, RecordSink,
    RepositoryLocator, RunReport, SeedConfig, SeedingOrchestrator, StderrJsonlTelemetrySink,
    SyncOptions, TelemetrySink, TokenPool,
};
use tracing::info;
use url::Url;

/// Everything the orchestrator needs apart from the record sink.
struct Pipeline {
    source: GraphQlFetcher,
    check_runs: CheckRunFetcher,
    cache: CacheStore,
    options: SyncOptions,
    pool: Arc<TokenPool>,
    telemetry: Arc<dyn TelemetrySink>,
}

/// Seeds every configured repository against the real GitHub API.
///
/// # Errors
///
/// Returns [`FetchError::Configuration`] or [`FetchError::MissingToken`]
/// when the run cannot start. Per-repository failures are reported in the
/// returned [`RunReport`].
pub async fn run(config: &SeedConfig) -> Result<RunReport, FetchError> {
    run_with_client_builder(config, Utc::now(), build_http_client).await
}

/// Seeds every configured repository using a custom client builder.
///
/// This function is exposed for testing with mock clients.
pub async fn run_with_client_builder<F>(
    config: &SeedConfig,
    now: DateTime<Utc>,
    build_client: F,
) -> Result<RunReport, FetchError>
where
    F: Fn(&PersonalAccessToken, &Url, Duration) -> Result<Arc<dyn GitHubApi>, FetchError>,
{
    config.validate()?;
    let repositories = config.repositories()?;
    let tokens = config.resolve_tokens()?;
    let api_base = config.api_base_url()?;
    let timeout = config.http_timeout();

    let telemetry: Arc<dyn TelemetrySink> = if config.telemetry {
        Arc::new(StderrJsonlTelemetrySink)
    } else {
        Arc::new(NoopTelemetrySink)
    };
    let pool = Arc::new(
        TokenPool::from_tokens(&tokens, |token| build_client(token, &api_base, timeout))?
            .with_telemetry(Arc::clone(&telemetry)),
    );
    pool.refresh_all_limits().await;
    info!(
        tokens = pool.len(),
        repositories = repositories.len(),
        remaining = pool.total_remaining(),
        "starting seeding run"
    );

    let pipeline = Pipeline {
        source: GraphQlFetcher::new(Arc::clone(&pool), config.fetch_policy()),
        check_runs: CheckRunFetcher::new(Arc::clone(&pool), config.check_runs_min_quota),
        cache: config.cache_store(),
        options: config.sync_options(now)?,
        pool,
        telemetry,
    };

    match config.records_path.as_deref() {
        Some(path) => {
            let sink = JsonlRecordSink::create(Utf8Path::new(path))?;
            Ok(run_pipeline(pipeline, sink, &repositories).await)
        }
        None => Ok(run_pipeline(pipeline, NoopRecordSink, &repositories).await),
    }
}

async fn run_pipeline<K: RecordSink>(
    pipeline: Pipeline,
    sink: K,
    repositories: &[RepositoryLocator],
) -> RunReport {
    let mut orchestrator = SeedingOrchestrator::new(
        pipeline.source,
        pipeline.check_runs,
        sink,
        pipeline.cache,
        pipeline.options,
    )
    .with_token_pool(pipeline.pool)
    .with_telemetry(pipeline.telemetry);

    orchestrator.run(repositories).await
}

fn build_http_client(
    token: &PersonalAccessToken,
    api_base: &Url,
    timeout: Duration,
) -> Result<Arc<dyn GitHubApi>, FetchError> {
    let client = HttpGitHubApi::new(token, api_base, timeout)?;
    Ok(Arc::new(client))
}
