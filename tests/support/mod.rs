//! Shared test utilities.

use tempfile::TempDir;

pub mod github_mocks;
pub mod harness;

/// Creates a temporary directory for cache and record files.
///
/// # Panics
///
/// Panics if the temporary directory cannot be created.
pub fn create_temp_dir() -> TempDir {
    TempDir::new().unwrap_or_else(|error| panic!("failed to create temporary directory: {error}"))
}
