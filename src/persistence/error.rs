//! Error types for the on-disk repository cache.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors returned while reading or writing cache documents.
///
/// Callers in the sync pipeline never propagate these: an unreadable cache
/// is a miss and a failed write only costs the next run a full fetch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// Opening, creating, reading or renaming a cache file failed.
    #[error("cache I/O failed for '{path}': {message}")]
    Io {
        /// File or directory involved.
        path: Utf8PathBuf,
        /// Error detail from the filesystem.
        message: String,
    },

    /// The cache document is not valid JSON or lacks required fields.
    #[error("cache document '{path}' is corrupt: {message}")]
    Corrupt {
        /// Offending file.
        path: Utf8PathBuf,
        /// Error detail from the deserialiser.
        message: String,
    },

    /// The cache document was written by a newer format version.
    #[error("cache document '{path}' has version {found}; newest supported is {supported}")]
    UnsupportedVersion {
        /// Offending file.
        path: Utf8PathBuf,
        /// Version recorded in the document.
        found: u32,
        /// Newest version this build reads.
        supported: u32,
    },

    /// The document describes a different repository than its file name.
    #[error("cache document '{path}' belongs to {found}, expected {expected}")]
    RepositoryMismatch {
        /// Offending file.
        path: Utf8PathBuf,
        /// Repository recorded in the document.
        found: String,
        /// Repository the caller asked for.
        expected: String,
    },

    /// Serialising a cache document failed.
    #[error("failed to serialise cache for {repository}: {message}")]
    Serialisation {
        /// Repository being written.
        repository: String,
        /// Error detail from the serialiser.
        message: String,
    },
}
