//! Scenario state for repository sync behavioural tests.

use prseed::{FetchError, RepositoryLocator, RepositorySyncReport};
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;
use tempfile::TempDir;

use crate::support::create_temp_dir;
use crate::support::harness::MockGitHub;

#[derive(ScenarioState, Default)]
pub(crate) struct SyncState {
    pub(crate) github: Slot<MockGitHub>,
    pub(crate) cache_dir: Slot<TempDir>,
    pub(crate) repository: Slot<RepositoryLocator>,
    pub(crate) report: Slot<RepositorySyncReport>,
    pub(crate) error: Slot<FetchError>,
}

impl SyncState {
    /// Mock GitHub server, started on first use.
    pub(crate) fn github(&self) -> MockGitHub {
        if let Some(github) = self.github.get() {
            return github;
        }
        let github = MockGitHub::start()
            .unwrap_or_else(|error| panic!("failed to start mock GitHub: {error}"));
        self.github.set(github.clone());
        github
    }

    /// Parses `owner/name` against the mock server.
    pub(crate) fn locator(&self, repository: &str) -> RepositoryLocator {
        let base = self.github().uri();
        RepositoryLocator::parse_with_base(repository.trim_matches('"'), &base)
            .unwrap_or_else(|error| panic!("repository should parse: {error}"))
    }

    /// Cache directory path, creating the directory on first use.
    pub(crate) fn cache_path(&self) -> String {
        if self.cache_dir.with_ref(|_| ()).is_none() {
            self.cache_dir.set(create_temp_dir());
        }
        self.cache_dir
            .with_ref(|dir| dir.path().join("github").to_string_lossy().into_owned())
            .unwrap_or_else(|| panic!("cache directory not initialised"))
    }
}
