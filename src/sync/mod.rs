//! Seeding orchestration across configured repositories.
//!
//! For each repository the [`SeedingOrchestrator`] compares the on-disk
//! snapshot with the repository's current `pushed_at` and takes one of
//! three paths:
//!
//! - **cached**: the snapshot covers the window and nothing was pushed since,
//!   so it is returned without fetching pull requests;
//! - **incremental**: the snapshot covers the window but the repository
//!   changed, so only pull requests updated since the snapshot are fetched
//!   and merged in;
//! - **full**: there is no usable snapshot, so the whole window is fetched.
//!
//! Fetched pull requests then get their check runs, are handed to the
//! record sink, and are written back to the cache.

pub mod merge;
pub mod records;
mod report;
mod sink;


use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::github::check_runs::{CheckRunSummary, CheckRunSupplier};
use crate::github::models::FetchedPR;
use crate::github::token_pool::TokenPool;
use crate::github::{FetchError, PullRequestSource, RepositoryLocator};
use crate::persistence::{CacheFreshness, CacheStore, RepositoryCache};
use crate::telemetry::{NoopTelemetrySink, TelemetryEvent, TelemetrySink};

pub use merge::merge_pull_requests;
pub use report::{RepositoryOutcome, RepositorySyncReport, RunReport, SyncMode};
pub use sink::{JsonlRecordSink, NoopRecordSink, RecordCounts, RecordSink};

/// Per-run controls for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Lower bound on pull request creation time.
    pub since: DateTime<Utc>,
    /// Upper bound on pull requests returned per repository.
    pub max_prs: Option<usize>,
    /// Ignore cache validity and always fetch in full; the cache is still written.
    pub force_refresh: bool,
    /// Read and write the cache at all.
    pub use_cache: bool,
    /// Run the REST check-run pass on fetched pull requests.
    pub fetch_check_runs: bool,
}

impl SyncOptions {
    /// Options with caching and check runs enabled and no count bound.
    #[must_use]
    pub const fn new(since: DateTime<Utc>) -> Self {
        Self {
            since,
            max_prs: None,
            force_refresh: false,
            use_cache: true,
            fetch_check_runs: true,
        }
    }
}

/// Whether a full fetch is written back to the cache.
#[derive(Debug, Clone, Copy)]
enum WriteBack {
    Skip,
    Store { repo_pushed_at: Option<DateTime<Utc>> },
}

/// Pull requests produced by one of the three sync paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedPullRequests {
    /// Branch taken.
    pub mode: SyncMode,
    /// Pull requests in the window, most recently updated first.
    pub prs: Vec<FetchedPR>,
    /// How many of `prs` were fetched in this run.
    pub from_network: usize,
    /// Outcome of the check-run pass over fetched pull requests.
    pub check_runs: CheckRunSummary,
    /// Whether the cache document was rewritten.
    pub cache_written: bool,
}

/// Drives fetching, caching and record export for a list of repositories.
pub struct SeedingOrchestrator<S, C, K> {
    source: S,
    check_runs: C,
    sink: K,
    cache: CacheStore,
    options: SyncOptions,
    pool: Option<Arc<TokenPool>>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl<S, C, K> SeedingOrchestrator<S, C, K>
where
    S: PullRequestSource,
    C: CheckRunSupplier,
    K: RecordSink,
{
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(
        source: S,
        check_runs: C,
        sink: K,
        cache: CacheStore,
        options: SyncOptions,
    ) -> Self {
        Self {
            source,
            check_runs,
            sink,
            cache,
            options,
            pool: None,
            telemetry: Arc::new(NoopTelemetrySink),
        }
    }

    /// Reports credential exhaustion counts from `pool`.
    #[must_use]
    pub fn with_token_pool(mut self, pool: Arc<TokenPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Routes telemetry events to `telemetry`.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// The active options.
    #[must_use]
    pub const fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// The record sink.
    #[must_use]
    pub const fn sink(&self) -> &K {
        &self.sink
    }

    /// Syncs `repositories` in order.
    ///
    /// A failing repository is reported and the run moves on, except when
    /// every credential is exhausted: the remaining repositories are then
    /// reported as skipped, since they would fail the same way.
    pub async fn run(&mut self, repositories: &[RepositoryLocator]) -> RunReport {
        let mut report = RunReport::default();
        let mut stop_reason: Option<String> = None;

        for repository in repositories {
            if let Some(reason) = stop_reason.as_ref() {
                report.outcomes.push(RepositoryOutcome::Skipped {
                    repository: repository.full_name(),
                    reason: reason.clone(),
                });
                continue;
            }

            match self.sync_repository(repository).await {
                Ok(synced) => report.outcomes.push(RepositoryOutcome::Synced(synced)),
                Err(error) => {
                    warn!(repository = %repository, %error, "repository sync failed");
                    if matches!(error, FetchError::AllTokensExhausted { .. }) {
                        stop_reason = Some(error.to_string());
                    }
                    report.outcomes.push(RepositoryOutcome::Failed {
                        repository: repository.full_name(),
                        error,
                    });
                }
            }
        }

        report
    }

    /// Syncs one repository and returns its report.
    ///
    /// # Errors
    ///
    /// Returns the [`FetchError`] from metadata or pull request fetching, or
    /// from the record sink. Cache and check-run problems never fail a sync.
    pub async fn sync_repository(
        &mut self,
        repository: &RepositoryLocator,
    ) -> Result<RepositorySyncReport, FetchError> {
        let exhaustion_before = self.exhaustion_events();
        let synced = self.fetch_pull_requests(repository).await?;

        if let Some(reason) = synced.check_runs.skip_reason.as_ref() {
            self.telemetry.record(TelemetryEvent::CheckRunsSkipped {
                repository: repository.full_name(),
                skipped_prs: synced.check_runs.skipped_prs,
                reason: reason.to_string(),
            });
        }

        let records = self.sink.persist(&repository.full_name(), &synced.prs)?;
        let total_prs = synced.prs.len();
        let report = RepositorySyncReport {
            repository: repository.full_name(),
            mode: synced.mode,
            total_prs,
            from_cache: total_prs.saturating_sub(synced.from_network),
            from_network: synced.from_network,
            check_runs_fetched: synced.check_runs.fetched_runs,
            check_runs_skipped: synced.check_runs.skipped_prs,
            check_run_skip_reason: synced
                .check_runs
                .skip_reason
                .as_ref()
                .map(ToString::to_string),
            exhaustion_events: self.exhaustion_events().saturating_sub(exhaustion_before),
            records,
            cache_written: synced.cache_written,
        };

        info!(
            repository = %repository,
            mode = %report.mode,
            total = report.total_prs,
            from_cache = report.from_cache,
            from_network = report.from_network,
            "repository synced"
        );
        self.telemetry.record(TelemetryEvent::RepositorySynced {
            repository: report.repository.clone(),
            mode: report.mode.as_str().to_owned(),
            total_prs: report.total_prs,
            from_cache: report.from_cache,
            from_network: report.from_network,
            check_runs_fetched: report.check_runs_fetched,
        });
        Ok(report)
    }

    /// Produces the pull requests for `repository` without exporting them.
    ///
    /// # Errors
    ///
    /// Returns the [`FetchError`] from metadata or pull request fetching.
    pub async fn fetch_pull_requests(
        &self,
        repository: &RepositoryLocator,
    ) -> Result<SyncedPullRequests, FetchError> {
        if !self.options.use_cache {
            debug!(repository = %repository, "cache disabled");
            return self.full_sync(repository, WriteBack::Skip).await;
        }

        let metadata = self.source.fetch_repo_metadata(repository).await?;
        let cached = if self.options.force_refresh {
            debug!(repository = %repository, "forced refresh; ignoring cache");
            None
        } else {
            self.read_cache(repository)
        };

        let store = WriteBack::Store {
            repo_pushed_at: metadata.pushed_at,
        };
        let Some(cache) = cached else {
            return self.full_sync(repository, store).await;
        };

        match cache.assess(self.options.since, metadata.pushed_at) {
            CacheFreshness::Fresh => {
                info!(repository = %repository, "repository unchanged; using cache");
                Ok(SyncedPullRequests {
                    mode: SyncMode::Cached,
                    prs: self.bounded(cache.prs_since(self.options.since)),
                    from_network: 0,
                    check_runs: CheckRunSummary::default(),
                    cache_written: false,
                })
            }
            CacheFreshness::Stale => {
                self.incremental_sync(repository, cache, metadata.pushed_at)
                    .await
            }
            CacheFreshness::Uncovered => {
                info!(
                    repository = %repository,
                    cached_since = %cache.since_date,
                    "cache starts after the requested window; fetching in full"
                );
                self.full_sync(repository, store).await
            }
        }
    }

    async fn full_sync(
        &self,
        repository: &RepositoryLocator,
        write_back: WriteBack,
    ) -> Result<SyncedPullRequests, FetchError> {
        let started = Utc::now();
        let mut prs = self
            .source
            .fetch_prs_with_details(repository, self.options.since, self.options.max_prs)
            .await?;
        let check_runs = self.attach_check_runs(repository, &mut prs).await;

        let cache_written = match write_back {
            WriteBack::Skip => false,
            WriteBack::Store { repo_pushed_at } => self.write_cache(
                repository,
                &RepositoryCache::new(
                    repository.full_name(),
                    started,
                    self.covered_since(&prs),
                    repo_pushed_at,
                    prs.clone(),
                ),
            ),
        };

        let prs = self.bounded(prs);
        Ok(SyncedPullRequests {
            mode: SyncMode::Full,
            from_network: prs.len(),
            prs,
            check_runs,
            cache_written,
        })
    }

    async fn incremental_sync(
        &self,
        repository: &RepositoryLocator,
        cache: RepositoryCache,
        pushed_at: Option<DateTime<Utc>>,
    ) -> Result<SyncedPullRequests, FetchError> {
        let started = Utc::now();
        let mut updated: Vec<FetchedPR> = self
            .source
            .fetch_updated_prs(repository, cache.fetched_at)
            .await?
            .into_iter()
            .filter(|pr| pr.created_at >= cache.since_date)
            .collect();
        debug!(
            repository = %repository,
            updated = updated.len(),
            since = %cache.fetched_at,
            "fetched pull requests updated since cache"
        );
        let check_runs = self.attach_check_runs(repository, &mut updated).await;

        let fresh_numbers: HashSet<u64> = updated.iter().map(|pr| pr.number).collect();
        let merged = merge_pull_requests(cache.prs, updated);
        let cache_written = self.write_cache(
            repository,
            &RepositoryCache::new(
                repository.full_name(),
                started,
                cache.since_date,
                pushed_at,
                merged.clone(),
            ),
        );

        let prs: Vec<FetchedPR> = self.bounded(
            merged
                .into_iter()
                .filter(|pr| pr.created_at >= self.options.since)
                .collect(),
        );
        let from_network = prs
            .iter()
            .filter(|pr| fresh_numbers.contains(&pr.number))
            .count();
        Ok(SyncedPullRequests {
            mode: SyncMode::Incremental,
            prs,
            from_network,
            check_runs,
            cache_written,
        })
    }

    async fn attach_check_runs(
        &self,
        repository: &RepositoryLocator,
        prs: &mut [FetchedPR],
    ) -> CheckRunSummary {
        if !self.options.fetch_check_runs || prs.is_empty() {
            return CheckRunSummary::default();
        }
        self.check_runs.attach_check_runs(repository, prs).await
    }

    fn read_cache(&self, repository: &RepositoryLocator) -> Option<RepositoryCache> {
        match self.cache.read(repository) {
            Ok(cache) => cache,
            Err(error) => {
                warn!(repository = %repository, %error, "discarding unreadable cache");
                self.telemetry.record(TelemetryEvent::CacheDiscarded {
                    repository: repository.full_name(),
                    reason: error.to_string(),
                });
                None
            }
        }
    }

    fn write_cache(&self, repository: &RepositoryLocator, cache: &RepositoryCache) -> bool {
        match self.cache.save(repository, cache) {
            Ok(path) => {
                debug!(repository = %repository, path = %path, "cache written");
                true
            }
            Err(error) => {
                warn!(repository = %repository, %error, "failed to write cache");
                false
            }
        }
    }

    /// Lower bound of the window a full fetch actually covers.
    ///
    /// Pages arrive newest first, so a fetch stopped by `max_prs` only
    /// covers back to the oldest pull request it returned.
    fn covered_since(&self, prs: &[FetchedPR]) -> DateTime<Utc> {
        let truncated = self.options.max_prs.is_some_and(|max| prs.len() >= max);
        if !truncated {
            return self.options.since;
        }
        prs.iter()
            .map(|pr| pr.created_at)
            .min()
            .map_or(self.options.since, |oldest| oldest.max(self.options.since))
    }

    fn bounded(&self, mut prs: Vec<FetchedPR>) -> Vec<FetchedPR> {
        if let Some(max) = self.options.max_prs {
            prs.truncate(max);
        }
        prs
    }

    fn exhaustion_events(&self) -> usize {
        self.pool
            .as_ref()
            .map_or(0, |pool| pool.exhaustion_events())
    }
}
