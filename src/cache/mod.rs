//! Query caching for the data layer
//!
//! An in-memory TTL cache with in-flight deduplication ([`QueryCache`]),
//! optionally backed by SQLite storage that survives between CLI runs.

pub mod key;
pub mod query;
pub mod storage;

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Cache TTLs per kind of data
pub struct CacheTtl;

impl CacheTtl {
    /// Anything without a more specific TTL
    pub const DEFAULT: Duration = Duration::from_secs(5 * 60); // 5 min

    // Listings change when landlords edit them
    pub const PROPERTY_DETAIL: Duration = Duration::from_secs(5 * 60); // 5 min
    pub const SEARCH_FEED: Duration = Duration::from_secs(2 * 60); // 2 min

    // Administrative boundaries barely ever change
    pub const LOCATIONS: Duration = Duration::from_secs(60 * 60); // 1 hr
}

/// Lock a cache mutex, recovering the data if a holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// Re-export main types
pub use key::{CacheKey, derive_key};
pub use query::{Access, CacheEntry, CacheStats, OperationStats, QueryCache, QueryCacheSettings, QueryOptions};
pub use storage::{CacheStorage, PersistedStats};
