//! Pool of GitHub credentials with per-token quota tracking.
//!
//! The pool owns one [`GitHubApi`] client per personal access token and
//! routes each request to the credential with the most remaining quota.
//! Selection and exhaustion marking share one mutex so two callers can never
//! both pick a token that one of them is about to mark exhausted. The mutex
//! is never held across an `.await`; quota refreshes release it while the
//! network call is in flight.
//!
//! GitHub meters GraphQL and REST in separate buckets, so a REST rate limit
//! only parks a credential for REST callers. GraphQL selection keeps using
//! it.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::github::error::FetchError;
use crate::github::gateway::GitHubApi;
use crate::github::locator::PersonalAccessToken;
use crate::github::rate_limit::RateLimitInfo;
use crate::telemetry::{NoopTelemetrySink, TelemetryEvent, TelemetrySink};

#[cfg(test)]
mod tests;

/// Quota assumed for a credential before GitHub has reported one.
pub const DEFAULT_QUOTA: u32 = 5000;

/// Exhaustion window applied when GitHub gives no reset time.
const FALLBACK_RESET_SECONDS: i64 = 3600;

/// Slack added after the reported reset before re-checking quota.
const RESET_GRACE: Duration = Duration::from_secs(1);

/// Shortest sleep between quota checks while waiting for a reset.
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Live state of one credential.
struct TokenInfo {
    token: PersonalAccessToken,
    client: Arc<dyn GitHubApi>,
    remaining: u32,
    reset_time: Option<DateTime<Utc>>,
    is_exhausted: bool,
    rest_parked_until: Option<DateTime<Utc>>,
}

impl TokenInfo {
    /// Re-admits an exhausted token whose window has rolled over.
    fn release_if_reset(&mut self, now: DateTime<Utc>) {
        if self.is_exhausted && self.reset_time.is_some_and(|reset| reset <= now) {
            debug!(token = %self.token.masked(), "rate limit window rolled over");
            self.is_exhausted = false;
            self.remaining = DEFAULT_QUOTA;
        }
        if self.rest_parked_until.is_some_and(|reset| reset <= now) {
            self.rest_parked_until = None;
        }
    }
}

/// Which GitHub quota bucket a rate limit was reported against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    GraphQl,
    Rest,
}

impl Bucket {
    const fn as_str(self) -> &'static str {
        match self {
            Self::GraphQl => "graphql",
            Self::Rest => "rest",
        }
    }
}

/// A client checked out of the pool together with the slot it came from.
#[derive(Clone)]
pub struct PooledClient {
    index: usize,
    masked_token: String,
    api: Arc<dyn GitHubApi>,
}

impl PooledClient {
    /// Position of the credential in the pool.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Log-safe rendering of the credential.
    #[must_use]
    pub fn masked_token(&self) -> &str {
        &self.masked_token
    }

    /// The API client bound to the credential.
    #[must_use]
    pub fn api(&self) -> &dyn GitHubApi {
        self.api.as_ref()
    }
}

impl fmt::Debug for PooledClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PooledClient")
            .field("index", &self.index)
            .field("token", &self.masked_token)
            .finish_non_exhaustive()
    }
}

/// Multi-credential pool routing requests to the token with most quota.
pub struct TokenPool {
    tokens: Mutex<Vec<TokenInfo>>,
    exhaustion_events: AtomicUsize,
    telemetry: Arc<dyn TelemetrySink>,
}

impl TokenPool {
    /// Creates a pool from credentials and the clients bound to them.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::MissingToken`] when `entries` is empty.
    pub fn new(
        entries: Vec<(PersonalAccessToken, Arc<dyn GitHubApi>)>,
    ) -> Result<Self, FetchError> {
        if entries.is_empty() {
            return Err(FetchError::MissingToken);
        }

        let tokens = entries
            .into_iter()
            .map(|(token, client)| TokenInfo {
                token,
                client,
                remaining: DEFAULT_QUOTA,
                reset_time: None,
                is_exhausted: false,
                rest_parked_until: None,
            })
            .collect();

        Ok(Self {
            tokens: Mutex::new(tokens),
            exhaustion_events: AtomicUsize::new(0),
            telemetry: Arc::new(NoopTelemetrySink),
        })
    }

    /// Creates a pool by building one client per token.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::MissingToken`] for an empty token list, or the
    /// first error produced by `build_client`.
    pub fn from_tokens<F>(tokens: &[PersonalAccessToken], build_client: F) -> Result<Self, FetchError>
    where
        F: Fn(&PersonalAccessToken) -> Result<Arc<dyn GitHubApi>, FetchError>,
    {
        let entries = tokens
            .iter()
            .map(|token| build_client(token).map(|client| (token.clone(), client)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(entries)
    }

    /// Routes exhaustion events to `telemetry`.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TokenInfo>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of credentials in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true when the pool holds no credentials.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns the client whose credential has the most remaining quota.
    ///
    /// Exhausted credentials whose reset time has passed are re-admitted
    /// first. Ties go to the credential configured first.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::AllTokensExhausted`] carrying the soonest known
    /// reset when every credential is exhausted.
    pub fn get_best_client(&self) -> Result<PooledClient, FetchError> {
        self.select(Bucket::GraphQl)
    }

    /// Returns the best client for REST calls.
    ///
    /// Skips credentials parked by [`Self::mark_rest_rate_limited`] but not
    /// those exhausted for GraphQL.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::AllTokensExhausted`] carrying the soonest REST
    /// reset when every credential is parked for REST.
    pub fn get_best_rest_client(&self) -> Result<PooledClient, FetchError> {
        self.select(Bucket::Rest)
    }

    fn select(&self, bucket: Bucket) -> Result<PooledClient, FetchError> {
        let tokens = self.released();

        let best = tokens
            .iter()
            .enumerate()
            .filter(|(_, token)| match bucket {
                Bucket::GraphQl => !token.is_exhausted,
                Bucket::Rest => token.rest_parked_until.is_none(),
            })
            .min_by_key(|(index, token)| (std::cmp::Reverse(token.remaining), *index));

        best.map_or_else(
            || {
                let reset_at = match bucket {
                    Bucket::GraphQl => soonest(tokens.iter().map(|token| token.reset_time)),
                    Bucket::Rest => soonest(tokens.iter().map(|token| token.rest_parked_until)),
                };
                Err(FetchError::AllTokensExhausted { reset_at })
            },
            |(index, token)| {
                Ok(PooledClient {
                    index,
                    masked_token: token.token.masked(),
                    api: Arc::clone(&token.client),
                })
            },
        )
    }

    /// Marks the credential behind `client` exhausted until `reset_time`.
    ///
    /// Without a reset time the credential is parked for an hour.
    pub fn mark_rate_limited(&self, client: &PooledClient, reset_time: Option<DateTime<Utc>>) {
        self.park(client, reset_time, Bucket::GraphQl);
    }

    /// Parks the credential behind `client` for REST calls only.
    ///
    /// GraphQL selection and quota are left untouched.
    pub fn mark_rest_rate_limited(&self, client: &PooledClient, reset_time: Option<DateTime<Utc>>) {
        self.park(client, reset_time, Bucket::Rest);
    }

    fn park(&self, client: &PooledClient, reset_time: Option<DateTime<Utc>>, bucket: Bucket) {
        let reset =
            reset_time.unwrap_or_else(|| Utc::now() + ChronoDuration::seconds(FALLBACK_RESET_SECONDS));
        {
            let mut tokens = self.lock();
            let Some(token) = tokens.get_mut(client.index) else {
                return;
            };
            match bucket {
                Bucket::GraphQl => {
                    token.remaining = 0;
                    token.reset_time = Some(reset);
                    token.is_exhausted = true;
                }
                Bucket::Rest => token.rest_parked_until = Some(reset),
            }
        }

        self.exhaustion_events.fetch_add(1, Ordering::Relaxed);
        warn!(
            token = %client.masked_token,
            bucket = bucket.as_str(),
            reset_at = %reset.to_rfc3339(),
            "GitHub token rate limited"
        );
        self.telemetry.record(TelemetryEvent::TokenExhausted {
            token: client.masked_token.clone(),
            reset_at: Some(reset.to_rfc3339()),
        });
    }

    /// Records quota reported by GitHub for the credential at `index`.
    ///
    /// A zero remaining count marks the credential exhausted; any positive
    /// count clears the flag.
    pub fn update_quota(&self, index: usize, info: &RateLimitInfo) {
        let mut tokens = self.lock();
        let Some(token) = tokens.get_mut(index) else {
            return;
        };
        token.remaining = info.remaining();
        token.reset_time = info.reset_time().or(token.reset_time);
        token.is_exhausted = info.is_exhausted();
    }

    /// Records quota reported alongside a response made with `client`.
    pub fn record_rate_limit(&self, client: &PooledClient, info: &RateLimitInfo) {
        self.update_quota(client.index, info);
    }

    /// Queries GitHub for the current quota of the credential at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Configuration`] for an unknown index, or the
    /// gateway error from the quota request.
    pub async fn refresh_rate_limit(&self, index: usize) -> Result<RateLimitInfo, FetchError> {
        let client = self
            .lock()
            .get(index)
            .map(|token| Arc::clone(&token.client))
            .ok_or_else(|| FetchError::Configuration {
                message: format!("token index {index} is out of range"),
            })?;

        let info = client.rate_limits().await?.graphql_or_core();
        self.update_quota(index, &info);
        Ok(info)
    }

    /// Refreshes every credential, logging failures rather than returning them.
    pub async fn refresh_all_limits(&self) {
        for index in 0..self.len() {
            if let Err(error) = self.refresh_rate_limit(index).await {
                warn!(index, %error, "failed to refresh token rate limit");
            }
        }
    }

    /// Waits until some credential becomes usable or `max_wait` elapses.
    ///
    /// Sleeps until shortly after the soonest known reset, then refreshes all
    /// quotas from GitHub. A zero `max_wait` returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::AllTokensExhausted`] when the wait budget runs
    /// out before any credential recovers.
    pub async fn wait_for_reset(&self, max_wait: Duration) -> Result<PooledClient, FetchError> {
        let deadline = Instant::now().checked_add(max_wait);
        loop {
            let reset_at = match self.get_best_client() {
                Ok(client) => return Ok(client),
                Err(FetchError::AllTokensExhausted { reset_at }) => reset_at,
                Err(other) => return Err(other),
            };

            let budget = deadline.map(|limit| limit.saturating_duration_since(Instant::now()));
            if budget.is_some_and(|left| left.is_zero()) {
                return Err(FetchError::AllTokensExhausted { reset_at });
            }

            let until_reset = reset_at
                .and_then(|reset| (reset - Utc::now()).to_std().ok())
                .unwrap_or(Duration::ZERO);
            let pause = (until_reset + RESET_GRACE).max(MIN_POLL_INTERVAL);
            let sleep_for = budget.map_or(pause, |left| pause.min(left));

            info!(
                seconds = sleep_for.as_secs(),
                reset_at = ?reset_at.map(|reset| reset.to_rfc3339()),
                "all GitHub tokens exhausted; waiting for reset"
            );
            tokio::time::sleep(sleep_for).await;
            self.refresh_all_limits().await;
        }
    }

    /// Sum of remaining quota across usable credentials.
    ///
    /// Credentials whose reset has passed count as re-admitted, exactly as
    /// [`Self::get_best_client`] would treat them.
    #[must_use]
    pub fn total_remaining(&self) -> u64 {
        self.released()
            .iter()
            .filter(|token| !token.is_exhausted)
            .map(|token| u64::from(token.remaining))
            .sum()
    }

    /// Returns true when no credential is currently usable.
    #[must_use]
    pub fn all_exhausted(&self) -> bool {
        self.released().iter().all(|token| token.is_exhausted)
    }

    /// Locks the pool after re-admitting credentials whose reset has passed.
    fn released(&self) -> MutexGuard<'_, Vec<TokenInfo>> {
        let now = Utc::now();
        let mut tokens = self.lock();
        for token in tokens.iter_mut() {
            token.release_if_reset(now);
        }
        tokens
    }

    /// Number of times any credential has been marked rate limited.
    #[must_use]
    pub fn exhaustion_events(&self) -> usize {
        self.exhaustion_events.load(Ordering::Relaxed)
    }
}

fn soonest(resets: impl Iterator<Item = Option<DateTime<Utc>>>) -> Option<DateTime<Utc>> {
    resets.flatten().min()
}
