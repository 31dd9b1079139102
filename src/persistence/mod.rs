//! Local persistence for fetched pull request data.
//!
//! Each repository's last fetch is kept in its own JSON document under a
//! cache directory. The document records the repository's `pushed_at` at
//! fetch time so later runs can tell, for about one quota point, whether a
//! refetch is needed at all.

mod error;
mod repository_cache;

pub use error::CacheError;
pub use repository_cache::{
    CURRENT_CACHE_VERSION, CacheFreshness, CacheStore, DEFAULT_CACHE_DIR, LEGACY_CACHE_VERSION,
    RepositoryCache,
};
