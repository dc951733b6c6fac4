//! In-memory query cache with in-flight request deduplication
//!
//! Wraps any [`GraphQlApi`]. Fresh results are served from memory (or from
//! the optional persisted tier), concurrent identical requests share one
//! network call, and failures are never cached.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use super::key::{CacheKey, derive_key};
use super::storage::{CacheStorage, PersistedStats};
use super::{CacheTtl, lock};
use crate::client::{GraphQlApi, Operation};
use crate::error::{CacheError, Result};

type SharedFetch = Shared<BoxFuture<'static, Result<Value>>>;

/// Which [`GraphQlApi`] call shape a query goes through
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Access {
    /// Session if signed in, public otherwise
    #[default]
    Auto,
    /// Always the public API key
    Public,
    /// Session required
    Authenticated,
}

/// Per-call options for [`QueryCache::query`]
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Skip the cache read (the result is still stored)
    pub force_refresh: bool,
    /// Entry lifetime; the cache default when `None`
    pub ttl: Option<Duration>,
    pub access: Access,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }
}

/// Cache sizing and defaults
#[derive(Debug, Clone)]
pub struct QueryCacheSettings {
    /// When off, nothing is read or stored; concurrent requests still share
    pub enabled: bool,
    /// Entry limit before least-recently-used eviction
    pub max_entries: usize,
    pub default_ttl: Duration,
}

impl Default for QueryCacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 500,
            default_ttl: CacheTtl::DEFAULT,
        }
    }
}

/// A cached query result
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: Value,
    pub created_at: Instant,
    pub ttl: Duration,
    pub last_accessed: Instant,
    pub size_bytes: usize,
}

impl CacheEntry {
    fn new(key: CacheKey, payload: Value, ttl: Duration, now: Instant) -> Self {
        let size_bytes = payload.to_string().len();
        Self {
            key,
            payload,
            created_at: now,
            ttl,
            last_accessed: now,
            size_bytes,
        }
    }

    /// Stale once strictly older than its TTL
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) > self.ttl
    }

    pub fn age(&self) -> Duration {
        Instant::now().duration_since(self.created_at)
    }
}

/// Per-operation slice of [`CacheStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationStats {
    pub count: usize,
    pub bytes: usize,
    pub oldest_age: Duration,
    pub newest_age: Duration,
}

/// Snapshot of the in-memory tier, for observability only
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_size_bytes: usize,
    pub in_flight: usize,
    pub by_operation: BTreeMap<String, OperationStats>,
}

struct InFlight {
    id: u64,
    future: SharedFetch,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    in_flight: HashMap<CacheKey, InFlight>,
    /// Bumped by `clear_all`; results of older requests are not stored
    generation: u64,
}

impl CacheState {
    fn fresh_payload(&mut self, key: &CacheKey, now: Instant) -> Option<Value> {
        let expired = self.entries.get(key)?.is_expired_at(now);
        if expired {
            self.entries.remove(key);
            return None;
        }
        let entry = self.entries.get_mut(key)?;
        entry.last_accessed = now;
        Some(entry.payload.clone())
    }

    fn insert(&mut self, entry: CacheEntry, max_entries: usize) {
        if !self.entries.contains_key(&entry.key) && self.entries.len() >= max_entries.max(1) {
            let lru = self
                .entries
                .values()
                .min_by_key(|e| e.last_accessed)
                .map(|e| e.key.clone());
            if let Some(lru) = lru {
                log::debug!("Cache full, evicting {}", lru);
                self.entries.remove(&lru);
            }
        }
        self.entries.insert(entry.key.clone(), entry);
    }
}

/// TTL query cache over a [`GraphQlApi`]
pub struct QueryCache {
    api: Arc<dyn GraphQlApi>,
    state: Arc<Mutex<CacheState>>,
    storage: Option<Arc<Mutex<CacheStorage>>>,
    settings: QueryCacheSettings,
    next_request_id: Arc<AtomicU64>,
}

impl QueryCache {
    /// Memory-only cache
    pub fn new(api: Arc<dyn GraphQlApi>, settings: QueryCacheSettings) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(CacheState::default())),
            storage: None,
            settings,
            next_request_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Add a persisted second tier
    pub fn with_storage(mut self, storage: CacheStorage) -> Self {
        self.storage = Some(Arc::new(Mutex::new(storage)));
        self
    }

    pub fn api(&self) -> &Arc<dyn GraphQlApi> {
        &self.api
    }

    pub fn settings(&self) -> &QueryCacheSettings {
        &self.settings
    }

    /// Fresh entry for `key`, or `None`
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = Instant::now();
        {
            let mut state = lock(&self.state);
            if state.fresh_payload(key, now).is_some() {
                return state.entries.get(key).cloned();
            }
        }
        self.load_persisted(key)?;
        lock(&self.state).entries.get(key).cloned()
    }

    /// Insert or overwrite an entry
    pub fn set(&self, key: CacheKey, payload: Value, ttl: Duration) {
        self.persist(&key, &payload, ttl);
        let entry = CacheEntry::new(key, payload, ttl, Instant::now());
        lock(&self.state).insert(entry, self.settings.max_entries);
    }

    /// Run `operation` through the cache.
    ///
    /// The key is derived from the operation name and the canonical form of
    /// `variables`. Concurrent calls for the same key share a single request.
    pub async fn query(
        &self,
        operation: &Operation,
        variables: Value,
        options: QueryOptions,
    ) -> Result<Value> {
        let key = derive_key(operation.name, &variables);
        let api = Arc::clone(&self.api);
        let operation = *operation;
        let access = options.access;

        self.fetch_with(key, options.ttl, options.force_refresh, move || async move {
            match access {
                Access::Auto => api.execute(&operation, &variables).await,
                Access::Public => api.execute_public(&operation, &variables).await,
                Access::Authenticated => api.execute_authenticated(&operation, &variables).await,
            }
        })
        .await
    }

    /// Cache and deduplicate a value produced by `fetch`.
    ///
    /// `fetch` is only called when no fresh entry and no in-flight request
    /// exist for `key`.
    pub async fn fetch_with<F, Fut>(
        &self,
        key: CacheKey,
        ttl: Option<Duration>,
        force_refresh: bool,
        fetch: F,
    ) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let ttl = ttl.unwrap_or(self.settings.default_ttl);
        let force_refresh = force_refresh || !self.settings.enabled;

        if !force_refresh {
            if let Some(payload) = lock(&self.state).fresh_payload(&key, Instant::now()) {
                log::debug!("Cache hit: {}", key.operation());
                return Ok(payload);
            }
            if let Some(payload) = self.load_persisted(&key) {
                log::debug!("Persisted cache hit: {}", key.operation());
                return Ok(payload);
            }
        }

        // Check-and-register happens under one lock so only one caller leads
        let shared = {
            let mut state = lock(&self.state);
            if !force_refresh && let Some(payload) = state.fresh_payload(&key, Instant::now()) {
                return Ok(payload);
            }
            match state.in_flight.get(&key) {
                Some(in_flight) => {
                    log::debug!("Joining in-flight request: {}", key.operation());
                    in_flight.future.clone()
                }
                None => {
                    log::debug!("Cache miss: {}", key.operation());
                    let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
                    let future = self.shared_request(id, key.clone(), ttl, state.generation, fetch());
                    state.in_flight.insert(
                        key.clone(),
                        InFlight {
                            id,
                            future: future.clone(),
                        },
                    );
                    future
                }
            }
        };

        shared.await
    }

    fn shared_request<Fut>(
        &self,
        id: u64,
        key: CacheKey,
        ttl: Duration,
        generation: u64,
        request: Fut,
    ) -> SharedFetch
    where
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let storage = self.storage.clone();
        let max_entries = self.settings.max_entries;
        let enabled = self.settings.enabled;

        async move {
            let result = request.await;

            let store = {
                let mut state = lock(&state);
                if state.in_flight.get(&key).is_some_and(|f| f.id == id) {
                    state.in_flight.remove(&key);
                }
                match &result {
                    Ok(_) if !enabled => false,
                    Ok(payload) if state.generation == generation => {
                        let entry = CacheEntry::new(key.clone(), payload.clone(), ttl, Instant::now());
                        state.insert(entry, max_entries);
                        true
                    }
                    Ok(_) => {
                        log::debug!("Cache cleared during request, not storing {}", key.operation());
                        false
                    }
                    Err(e) => {
                        log::debug!("Request failed, not caching {}: {}", key.operation(), e);
                        false
                    }
                }
            };

            if store
                && let (Some(storage), Ok(payload)) = (storage, &result)
            {
                persist_to(&storage, &key, payload, ttl);
            }

            result
        }
        .boxed()
        .shared()
    }

    /// Drop every entry, in-flight marker and persisted entry
    pub fn clear_all(&self) -> usize {
        let removed = {
            let mut state = lock(&self.state);
            state.generation += 1;
            state.in_flight.clear();
            let removed = state.entries.len();
            state.entries.clear();
            removed
        };

        if let Some(storage) = &self.storage
            && let Err(e) = lock(storage).clear_all()
        {
            log::warn!("Failed to clear persisted cache: {}", e);
        }
        removed
    }

    /// Remove expired entries only; returns how many were removed
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut removed = {
            let mut state = lock(&self.state);
            let before = state.entries.len();
            state.entries.retain(|_, e| !e.is_expired_at(now));
            before - state.entries.len()
        };

        if let Some(storage) = &self.storage {
            match lock(storage).delete_expired() {
                Ok(n) => removed += n,
                Err(e) => log::warn!("Failed to clean persisted cache: {}", e),
            }
        }
        removed
    }

    /// Drop all entries of one operation, e.g. after a mutation changed them
    pub fn invalidate_operation(&self, operation: &str) -> usize {
        let removed = {
            let mut state = lock(&self.state);
            let before = state.entries.len();
            state.entries.retain(|k, _| k.operation() != operation);
            before - state.entries.len()
        };

        if let Some(storage) = &self.storage
            && let Err(e) = lock(storage).delete_by_operation(operation)
        {
            log::warn!("Failed to invalidate persisted {}: {}", operation, e);
        }
        removed
    }

    /// Entry counts and sizes of the in-memory tier
    pub fn get_stats(&self) -> CacheStats {
        let now = Instant::now();
        let state = lock(&self.state);

        let mut stats = CacheStats {
            total_entries: state.entries.len(),
            in_flight: state.in_flight.len(),
            ..CacheStats::default()
        };

        for entry in state.entries.values() {
            let age = now.duration_since(entry.created_at);
            stats.total_size_bytes += entry.size_bytes;

            let op = stats
                .by_operation
                .entry(entry.key.operation().to_string())
                .or_default();
            if op.count == 0 {
                op.oldest_age = age;
                op.newest_age = age;
            } else {
                op.oldest_age = op.oldest_age.max(age);
                op.newest_age = op.newest_age.min(age);
            }
            op.count += 1;
            op.bytes += entry.size_bytes;
        }

        stats
    }

    /// Stats of the persisted tier, if there is one
    pub fn persisted_stats(&self) -> Option<std::result::Result<PersistedStats, CacheError>> {
        let storage = self.storage.as_ref()?;
        Some(lock(storage).stats())
    }

    /// Promote a fresh persisted entry into memory
    fn load_persisted(&self, key: &CacheKey) -> Option<Value> {
        let storage = self.storage.as_ref()?;
        let stored = match lock(storage).get(&key.to_string()) {
            Ok(stored) => stored?,
            Err(e) => {
                log::warn!("Persisted cache read failed, continuing without it: {}", e);
                return None;
            }
        };

        let payload: Value = match serde_json::from_slice(&stored.data) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Dropping unreadable persisted entry {}: {}", key, e);
                let _ = lock(storage).delete_by_key(&key.to_string());
                return None;
            }
        };

        let now_ms = Utc::now().timestamp_millis();
        let now = Instant::now();
        let age = Duration::from_millis(now_ms.saturating_sub(stored.created_at).max(0) as u64);
        let (created_at, ttl) = promoted_timing(now, age, stored.remaining(now_ms));
        let mut entry = CacheEntry::new(key.clone(), payload.clone(), ttl, now);
        entry.created_at = created_at;

        lock(&self.state).insert(entry, self.settings.max_entries);
        Some(payload)
    }

    fn persist(&self, key: &CacheKey, payload: &Value, ttl: Duration) {
        if let Some(storage) = &self.storage {
            persist_to(storage, key, payload, ttl);
        }
    }
}

/// Backdate a promoted entry by its persisted age. When the monotonic clock
/// can't go back that far, the entry starts now with only its remaining TTL.
fn promoted_timing(now: Instant, age: Duration, remaining: Duration) -> (Instant, Duration) {
    match now.checked_sub(age) {
        Some(created_at) => (created_at, remaining + age),
        None => (now, remaining),
    }
}

fn persist_to(storage: &Mutex<CacheStorage>, key: &CacheKey, payload: &Value, ttl: Duration) {
    let data = payload.to_string();
    if let Err(e) = lock(storage).put(&key.to_string(), data.as_bytes(), key.operation(), ttl) {
        log::warn!("Failed to persist {}: {}", key, e);
    }
}
