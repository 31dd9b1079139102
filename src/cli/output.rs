//! Output formatting utilities for CLI operations.

use std::io::Write;

use prseed::{FetchError, RepositoryOutcome, RepositorySyncReport, RunReport};

/// Writes one line per repository followed by run totals.
///
/// # Errors
///
/// Returns [`FetchError::Io`] when the writer fails.
pub fn write_run_summary<W: Write>(writer: &mut W, report: &RunReport) -> Result<(), FetchError> {
    for outcome in &report.outcomes {
        match outcome {
            RepositoryOutcome::Synced(synced) => write_synced(writer, synced)?,
            RepositoryOutcome::Failed {
                repository,
                error: failure,
            } => {
                writeln!(writer, "{repository}: failed: {failure}").map_err(|error| io_error(&error))?;
            }
            RepositoryOutcome::Skipped { repository, reason } => {
                writeln!(writer, "{repository}: skipped: {reason}").map_err(|error| io_error(&error))?;
            }
        }
    }

    let synced = report.synced().count();
    writeln!(
        writer,
        "Synced {synced}/{} repositories, {} pull requests",
        report.outcomes.len(),
        report.total_prs()
    )
    .map_err(|error| io_error(&error))
}

fn write_synced<W: Write>(writer: &mut W, report: &RepositorySyncReport) -> Result<(), FetchError> {
    writeln!(
        writer,
        "{}: {} pull requests ({}; {} cached, {} fetched), {} check runs",
        report.repository,
        report.total_prs,
        report.mode,
        report.from_cache,
        report.from_network,
        report.check_runs_fetched
    )
    .map_err(|error| io_error(&error))?;

    if let Some(reason) = &report.check_run_skip_reason {
        writeln!(
            writer,
            "  check runs skipped for {} pull requests: {reason}",
            report.check_runs_skipped
        )
        .map_err(|error| io_error(&error))?;
    }
    if report.exhaustion_events > 0 {
        writeln!(
            writer,
            "  {} token exhaustion events",
            report.exhaustion_events
        )
        .map_err(|error| io_error(&error))?;
    }
    Ok(())
}

fn io_error(error: &std::io::Error) -> FetchError {
    FetchError::Io {
        message: error.to_string(),
    }
}
