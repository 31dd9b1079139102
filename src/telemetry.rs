//! Pipeline telemetry events and sinks.
//!
//! Seeding runs against shared, externally rate-limited infrastructure, so
//! the pipeline records operational signals such as credential exhaustion and
//! skipped check-run passes as structured events alongside its logs.

use std::io;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// A structured telemetry event emitted by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// A repository finished syncing.
    RepositorySynced {
        /// `owner/name`.
        repository: String,
        /// Sync path taken (`full`, `incremental`, `cached`).
        mode: String,
        /// Pull requests in the final result set.
        total_prs: usize,
        /// Pull requests served from the cache.
        from_cache: usize,
        /// Pull requests fetched from the network.
        from_network: usize,
        /// Check runs attached during this sync.
        check_runs_fetched: usize,
    },
    /// The check-run pass was skipped for some pull requests.
    CheckRunsSkipped {
        /// `owner/name`.
        repository: String,
        /// Pull requests left without check runs.
        skipped_prs: usize,
        /// Why the pass stopped.
        reason: String,
    },
    /// A credential hit its rate limit.
    TokenExhausted {
        /// Masked credential.
        token: String,
        /// RFC 3339 reset time when known.
        reset_at: Option<String>,
    },
    /// A cache document was ignored.
    CacheDiscarded {
        /// `owner/name`.
        repository: String,
        /// Why the cache could not be used.
        reason: String,
    },
}

/// A sink that can record telemetry events.
pub trait TelemetrySink: Send + Sync {
    /// Records a telemetry event.
    fn record(&self, event: TelemetryEvent);
}

/// Telemetry sink that drops all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    fn record(&self, _event: TelemetryEvent) {}
}

/// Records telemetry events to stderr as JSON lines (JSONL).
///
/// This is intended for local debugging and is not transmitted anywhere.
#[derive(Debug, Default)]
pub struct StderrJsonlTelemetrySink;

impl TelemetrySink for StderrJsonlTelemetrySink {
    fn record(&self, event: TelemetryEvent) {
        let Ok(serialised) = serde_json::to_string(&event) else {
            return;
        };

        let _ignored = writeln_stderr(&serialised);
    }
}

fn writeln_stderr(message: &str) -> io::Result<()> {
    use io::Write;

    let mut stderr = io::stderr().lock();
    writeln!(stderr, "{message}")
}

/// Sink that keeps events in memory, for tests and run summaries.
#[derive(Debug, Default)]
pub struct RecordingTelemetrySink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl RecordingTelemetrySink {
    /// Drains the recorded events.
    #[must_use]
    pub fn take(&self) -> Vec<TelemetryEvent> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .drain(..)
            .collect()
    }
}

impl TelemetrySink for RecordingTelemetrySink {
    fn record(&self, event: TelemetryEvent) {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event);
    }
}
