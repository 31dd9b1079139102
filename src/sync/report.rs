//! Per-repository and per-run sync reports.

use std::fmt;

use crate::github::FetchError;

use super::sink::RecordCounts;

/// Which branch of the cache decision a repository took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// No usable cache; every pull request was fetched.
    Full,
    /// Stale cache topped up with pull requests updated since it was written.
    Incremental,
    /// Valid cache returned without fetching pull requests.
    Cached,
}

impl SyncMode {
    /// Lowercase label used in logs, telemetry and CLI output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
            Self::Cached => "cached",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Outcome of syncing one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySyncReport {
    /// `owner/name`.
    pub repository: String,
    /// Branch taken.
    pub mode: SyncMode,
    /// Pull requests in the returned set.
    pub total_prs: usize,
    /// Of those, how many came from the cache.
    pub from_cache: usize,
    /// Of those, how many were fetched in this run.
    pub from_network: usize,
    /// Check runs attached in this run.
    pub check_runs_fetched: usize,
    /// Pull requests whose check runs were skipped.
    pub check_runs_skipped: usize,
    /// Why check runs were skipped, when they were.
    pub check_run_skip_reason: Option<String>,
    /// Credentials that hit their rate limit while syncing this repository.
    pub exhaustion_events: usize,
    /// Records handed to the sink.
    pub records: RecordCounts,
    /// Whether the cache document was rewritten.
    pub cache_written: bool,
}

/// What happened to one repository in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryOutcome {
    /// Synced successfully.
    Synced(RepositorySyncReport),
    /// Sync failed; later repositories were still attempted.
    Failed {
        /// `owner/name`.
        repository: String,
        /// Failure cause.
        error: FetchError,
    },
    /// Not attempted because the run stopped early.
    Skipped {
        /// `owner/name`.
        repository: String,
        /// Why the run stopped.
        reason: String,
    },
}

impl RepositoryOutcome {
    /// `owner/name` of the repository this outcome is about.
    #[must_use]
    pub fn repository(&self) -> &str {
        match self {
            Self::Synced(report) => &report.repository,
            Self::Failed { repository, .. } | Self::Skipped { repository, .. } => repository,
        }
    }
}

/// Outcomes for every configured repository, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// One entry per repository.
    pub outcomes: Vec<RepositoryOutcome>,
}

impl RunReport {
    /// Successful repository reports.
    pub fn synced(&self) -> impl Iterator<Item = &RepositorySyncReport> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            RepositoryOutcome::Synced(report) => Some(report),
            _ => None,
        })
    }

    /// Whether any repository failed or was skipped.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.outcomes
            .iter()
            .any(|outcome| !matches!(outcome, RepositoryOutcome::Synced(_)))
    }

    /// Pull requests across all synced repositories.
    #[must_use]
    pub fn total_prs(&self) -> usize {
        self.synced().map(|report| report.total_prs).sum()
    }
}
