//! Seeding configuration loaded from CLI, environment, and files.
//!
//! Values are merged with ortho-config's layered approach.
//!
//! # Precedence
//!
//! Lowest to highest:
//!
//! 1. **Defaults** – built-in values (see [`SeedConfig::default`])
//! 2. **Configuration file** – `.prseed.toml` in the current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `PRSEED_*`, plus the legacy `GITHUB_TOKEN`
//! 4. **Command-line arguments**
//!
//! # Configuration File
//!
//! ```toml
//! repos = "octo/api,octo/web"
//! github_tokens = "ghp_first,ghp_second"
//! days_back = 30
//! max_prs = 500
//! cache_dir = ".seed_cache/github"
//! records_path = "seed/records.jsonl"
//! ```

use std::env;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, Utc};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::github::check_runs::DEFAULT_MIN_QUOTA;
use crate::github::error::FetchError;
use crate::github::graphql::{DEFAULT_PAGE_SIZE, FetchPolicy, MAX_PAGE_SIZE};
use crate::github::locator::{PersonalAccessToken, RepositoryLocator};
use crate::persistence::{CacheStore, DEFAULT_CACHE_DIR};
use crate::sync::SyncOptions;

/// Default REST API base.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const DEFAULT_DAYS_BACK: u32 = 90;
const DEFAULT_MAX_WAIT_SECONDS: u64 = 3600;
const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 60;

/// Seeding configuration supporting CLI, environment, and file sources.
///
/// # Example
///
/// ```no_run
/// use ortho_config::OrthoConfig;
/// use prseed::SeedConfig;
///
/// let config = SeedConfig::load().expect("failed to load configuration");
/// let repositories = config.repositories().expect("repositories required");
/// let tokens = config.resolve_tokens().expect("token required");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "PRSEED",
    discovery(
        dotfile_name = ".prseed.toml",
        config_file_name = "prseed.toml",
        app_name = "prseed"
    )
)]
pub struct SeedConfig {
    /// Comma-separated `owner/name` repositories to sync, in order.
    ///
    /// Can be provided via:
    /// - CLI: `--repos <LIST>` or `-r <LIST>`
    /// - Environment: `PRSEED_REPOS`
    /// - Config file: `repos = "..."`
    #[ortho_config(cli_short = 'r')]
    pub repos: Option<String>,

    /// Comma-separated personal access tokens forming the credential pool.
    ///
    /// Can be provided via:
    /// - CLI: `--github-tokens <LIST>`
    /// - Environment: `PRSEED_GITHUB_TOKENS`
    /// - Config file: `github_tokens = "..."`
    #[ortho_config()]
    pub github_tokens: Option<String>,

    /// Single personal access token, used when no pool is configured.
    ///
    /// Can be provided via:
    /// - CLI: `--github-token <TOKEN>` or `-t <TOKEN>`
    /// - Environment: `PRSEED_GITHUB_TOKEN` or `GITHUB_TOKEN` (legacy)
    /// - Config file: `github_token = "..."`
    #[ortho_config(cli_short = 't')]
    pub github_token: Option<String>,

    /// REST API base; the GraphQL endpoint is derived from it.
    ///
    /// Defaults to `https://api.github.com`. GitHub Enterprise bases end in
    /// `/api/v3`.
    #[ortho_config()]
    pub api_base: Option<String>,

    /// Lower bound on pull request creation, as `YYYY-MM-DD` (UTC).
    ///
    /// Takes precedence over `days_back`.
    #[ortho_config(cli_short = 's')]
    pub since: Option<String>,

    /// Lower bound on pull request creation, in days before now.
    #[ortho_config()]
    pub days_back: u32,

    /// Upper bound on pull requests per repository.
    #[ortho_config(cli_short = 'm')]
    pub max_prs: Option<usize>,

    /// Ignores cache validity and always fetches in full.
    ///
    /// The cache is still rewritten afterwards.
    #[ortho_config(cli_short = 'f')]
    pub force_refresh: bool,

    /// Skips reading and writing the cache for this run.
    #[ortho_config()]
    pub no_cache: bool,

    /// Skips the REST check-run pass.
    #[ortho_config()]
    pub skip_check_runs: bool,

    /// Directory holding one cache document per repository.
    ///
    /// Defaults to `.seed_cache/github`.
    #[ortho_config()]
    pub cache_dir: Option<String>,

    /// JSON Lines file receiving the derived domain records.
    ///
    /// Records are discarded when unset.
    #[ortho_config()]
    pub records_path: Option<String>,

    /// Fails instead of waiting when every token is rate limited.
    #[ortho_config()]
    pub fail_fast_on_rate_limit: bool,

    /// Longest time one request may spend waiting for a quota reset.
    #[ortho_config()]
    pub max_wait_seconds: u64,

    /// REST quota below which the check-run pass is skipped.
    #[ortho_config()]
    pub check_runs_min_quota: u32,

    /// Per-request HTTP timeout.
    #[ortho_config()]
    pub http_timeout_seconds: u64,

    /// Pull requests requested per GraphQL page (1 to 100).
    #[ortho_config()]
    pub page_size: u32,

    /// Emits telemetry events to stderr as JSON lines.
    ///
    /// Note: boolean flags are not read from the environment by
    /// `ortho_config`; use the CLI or a configuration file.
    #[ortho_config()]
    pub telemetry: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            repos: None,
            github_tokens: None,
            github_token: None,
            api_base: None,
            since: None,
            days_back: DEFAULT_DAYS_BACK,
            max_prs: None,
            force_refresh: false,
            no_cache: false,
            skip_check_runs: false,
            cache_dir: None,
            records_path: None,
            fail_fast_on_rate_limit: false,
            max_wait_seconds: DEFAULT_MAX_WAIT_SECONDS,
            check_runs_min_quota: DEFAULT_MIN_QUOTA,
            http_timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECONDS,
            page_size: DEFAULT_PAGE_SIZE,
            telemetry: false,
        }
    }
}

impl SeedConfig {
    /// Resolves the credential pool.
    ///
    /// `github_tokens` is split on commas with blanks dropped; when that is
    /// empty, `github_token` is used, then the `GITHUB_TOKEN` environment
    /// variable.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::MissingToken`] when no source yields a token.
    pub fn resolve_tokens(&self) -> Result<Vec<PersonalAccessToken>, FetchError> {
        let pooled = split_list(self.github_tokens.as_deref());
        let values = if pooled.is_empty() {
            self.github_token
                .clone()
                .or_else(|| env::var("GITHUB_TOKEN").ok())
                .filter(|token| !token.trim().is_empty())
                .into_iter()
                .collect()
        } else {
            pooled
        };

        if values.is_empty() {
            return Err(FetchError::MissingToken);
        }
        values.iter().map(PersonalAccessToken::new).collect()
    }

    /// Parses the configured repositories.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Configuration`] when none are configured, or
    /// [`FetchError::InvalidRepository`] for a malformed entry.
    pub fn repositories(&self) -> Result<Vec<RepositoryLocator>, FetchError> {
        let entries = split_list(self.repos.as_deref());
        if entries.is_empty() {
            return Err(FetchError::Configuration {
                message: "at least one repository is required (use --repos or -r)".to_owned(),
            });
        }
        let api_base = self.api_base_url()?;
        entries
            .iter()
            .map(|entry| RepositoryLocator::parse_with_base(entry, api_base.as_str()))
            .collect()
    }

    /// The REST API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] when `api_base` does not parse.
    pub fn api_base_url(&self) -> Result<Url, FetchError> {
        let raw = self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE);
        Url::parse(raw).map_err(|error| FetchError::InvalidUrl(format!("{raw}: {error}")))
    }

    /// Lower bound on pull request creation relative to `now`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Configuration`] when `since` is not a
    /// `YYYY-MM-DD` date.
    pub fn since_date(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, FetchError> {
        if let Some(raw) = self.since.as_deref() {
            let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|error| {
                FetchError::Configuration {
                    message: format!("since must be YYYY-MM-DD, got '{raw}': {error}"),
                }
            })?;
            return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
        }

        now.checked_sub_days(Days::new(u64::from(self.days_back)))
            .ok_or_else(|| FetchError::Configuration {
                message: format!("days_back {} reaches before the supported range", self.days_back),
            })
    }

    /// Checks value ranges that the type system does not.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Configuration`] describing the first problem.
    pub fn validate(&self) -> Result<(), FetchError> {
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(FetchError::Configuration {
                message: format!(
                    "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                    self.page_size
                ),
            });
        }
        if self.max_prs == Some(0) {
            return Err(FetchError::Configuration {
                message: "max_prs must be at least 1".to_owned(),
            });
        }
        if self.http_timeout_seconds == 0 {
            return Err(FetchError::Configuration {
                message: "http_timeout_seconds must be at least 1".to_owned(),
            });
        }
        Ok(())
    }

    /// Per-request HTTP timeout.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    /// GraphQL pagination, retry and waiting policy.
    #[must_use]
    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            page_size: self.page_size,
            wait_for_reset: !self.fail_fast_on_rate_limit,
            max_wait: Duration::from_secs(self.max_wait_seconds),
            ..FetchPolicy::default()
        }
    }

    /// Orchestrator options for a run starting at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Configuration`] when the window cannot be
    /// resolved.
    pub fn sync_options(&self, now: DateTime<Utc>) -> Result<SyncOptions, FetchError> {
        Ok(SyncOptions {
            since: self.since_date(now)?,
            max_prs: self.max_prs,
            force_refresh: self.force_refresh,
            use_cache: !self.no_cache,
            fetch_check_runs: !self.skip_check_runs,
        })
    }

    /// Store rooted at the configured cache directory.
    #[must_use]
    pub fn cache_store(&self) -> CacheStore {
        CacheStore::new(self.cache_dir.as_deref().unwrap_or(DEFAULT_CACHE_DIR))
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests;
