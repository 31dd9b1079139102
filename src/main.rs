//! prseed CLI entrypoint for seeding pull request data.

mod cli;

use std::io::{self, Write};
use std::process::ExitCode;

use ortho_config::OrthoConfig;
use prseed::{FetchError, SeedConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

/// Runs the seeding pipeline and reports whether every repository synced.
async fn run() -> Result<bool, FetchError> {
    let config = load_config()?;
    let report = cli::seed::run(&config).await?;

    let mut stdout = io::stdout().lock();
    cli::output::write_run_summary(&mut stdout, &report)?;
    Ok(!report.has_failures())
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`FetchError::Configuration`] when ortho-config fails to parse
/// arguments or load configuration files.
fn load_config() -> Result<SeedConfig, FetchError> {
    SeedConfig::load().map_err(|error| FetchError::Configuration {
        message: error.to_string(),
    })
}

/// Logs go to stderr so stdout carries only the run summary.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
