//! File-per-repository storage for [`RepositoryCache`] documents.

use std::io::ErrorKind;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{CURRENT_CACHE_VERSION, RepositoryCache, legacy_version};
use crate::github::locator::RepositoryLocator;
use crate::persistence::CacheError;

/// Cache directory used when none is configured.
pub const DEFAULT_CACHE_DIR: &str = ".seed_cache/github";

/// Reads only the version so newer documents are rejected before their
/// body is interpreted.
#[derive(Deserialize)]
struct VersionProbe {
    #[serde(default = "legacy_version")]
    version: u32,
}

/// Directory of cache documents named `{owner}_{repo}.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStore {
    dir: Utf8PathBuf,
}

impl CacheStore {
    /// Creates a store rooted at `dir`; the directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the cache documents.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// File name of the document for `repository`.
    #[must_use]
    pub fn file_name(repository: &RepositoryLocator) -> String {
        format!(
            "{}_{}.json",
            repository.owner().as_str(),
            repository.repository().as_str()
        )
    }

    /// Full path of the document for `repository`.
    #[must_use]
    pub fn path_for(&self, repository: &RepositoryLocator) -> Utf8PathBuf {
        self.dir.join(Self::file_name(repository))
    }

    /// Reads the document for `repository`.
    ///
    /// Returns `Ok(None)` when neither the directory nor the file exists.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the file cannot be read, is corrupt, was
    /// written by a newer format, or describes another repository.
    pub fn read(
        &self,
        repository: &RepositoryLocator,
    ) -> Result<Option<RepositoryCache>, CacheError> {
        let path = self.path_for(repository);
        let dir = match Dir::open_ambient_dir(&self.dir, ambient_authority()) {
            Ok(dir) => dir,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(io_error(&self.dir, &error)),
        };

        let content = match dir.read_to_string(Self::file_name(repository)) {
            Ok(content) => content,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(io_error(&path, &error)),
        };

        let probe: VersionProbe =
            serde_json::from_str(&content).map_err(|error| corrupt(&path, &error))?;
        if probe.version > CURRENT_CACHE_VERSION {
            return Err(CacheError::UnsupportedVersion {
                path,
                found: probe.version,
                supported: CURRENT_CACHE_VERSION,
            });
        }

        let cache: RepositoryCache =
            serde_json::from_str(&content).map_err(|error| corrupt(&path, &error))?;
        let expected = repository.full_name();
        if !cache.repo.eq_ignore_ascii_case(&expected) {
            return Err(CacheError::RepositoryMismatch {
                path,
                found: cache.repo,
                expected,
            });
        }

        debug!(path = %path, prs = cache.prs.len(), version = cache.version, "cache loaded");
        Ok(Some(cache))
    }

    /// Loads the document for `repository`, treating any failure as a miss.
    #[must_use]
    pub fn load(&self, repository: &RepositoryLocator) -> Option<RepositoryCache> {
        self.read(repository).unwrap_or_else(|error| {
            warn!(%error, "discarding unreadable cache");
            None
        })
    }

    /// Writes `cache` as the document for `repository`.
    ///
    /// The document is written to a temporary sibling and renamed into
    /// place, so readers never observe a partial file.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when serialisation or any filesystem step fails.
    pub fn save(
        &self,
        repository: &RepositoryLocator,
        cache: &RepositoryCache,
    ) -> Result<Utf8PathBuf, CacheError> {
        let path = self.path_for(repository);
        let json = serde_json::to_string_pretty(cache).map_err(|error| {
            CacheError::Serialisation {
                repository: repository.full_name(),
                message: error.to_string(),
            }
        })?;

        Dir::create_ambient_dir_all(&self.dir, ambient_authority())
            .map_err(|error| io_error(&self.dir, &error))?;
        let dir = Dir::open_ambient_dir(&self.dir, ambient_authority())
            .map_err(|error| io_error(&self.dir, &error))?;

        let file_name = Self::file_name(repository);
        let temp_name = format!(".{file_name}.tmp");
        dir.write(&temp_name, json)
            .map_err(|error| io_error(&self.dir.join(&temp_name), &error))?;
        dir.rename(&temp_name, &dir, &file_name)
            .map_err(|error| io_error(&path, &error))?;

        debug!(path = %path, prs = cache.prs.len(), "cache saved");
        Ok(path)
    }
}

fn io_error(path: &Utf8Path, error: &std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}

fn corrupt(path: &Utf8Path, error: &serde_json::Error) -> CacheError {
    CacheError::Corrupt {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}
