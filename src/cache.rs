//! Revalidating cache context.
//!
//! Keyed storage for fact values with stale marking and subscriber-driven
//! background refetch. The context is explicitly constructed and passed by
//! `Arc`; there is no process-wide singleton. Storage policy (staleness
//! timers, garbage collection) stays outside this engine - the context only
//! provides the surface the coordination logic needs: record, snapshot,
//! subscribe, invalidate.
//!
//! Invalidations are appended to an ordered log. The log is the observable
//! record tests and debugging assert against; correctness only depends on
//! each entry being marked stale.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, trace};

use crate::keys::CacheKey;
use crate::state::{QueryStatus, SharedError};

/// Re-runs a fact's fetch and records the outcome back into the context.
pub type Refetcher = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Default)]
struct Entry {
    status: Option<QueryStatus>,
    data: Option<Value>,
    error: Option<SharedError>,
    data_updated_at: i64,
    error_updated_at: i64,
    failure_count: u32,
    error_update_count: u32,
    stale: bool,
    subscribers: usize,
    refetcher: Option<Refetcher>,
}

/// Point-in-time view of a cache entry.
#[derive(Debug, Clone)]
pub struct EntrySnapshot {
    pub status: QueryStatus,
    pub data: Option<Value>,
    pub error: Option<SharedError>,
    pub data_updated_at: i64,
    pub error_updated_at: i64,
    pub failure_count: u32,
    pub error_update_count: u32,
    pub is_stale: bool,
}

/// Shared cache for fact values, keyed by [`CacheKey`].
#[derive(Default)]
pub struct CacheContext {
    entries: RwLock<HashMap<CacheKey, Entry>>,
    invalidation_log: Mutex<Vec<CacheKey>>,
}

impl CacheContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record a successful fetch, clearing staleness.
    pub fn record_success(&self, key: &CacheKey, value: Value, at: i64) {
        let mut entries = self.entries.write();
        let entry = entries.entry(key.clone()).or_default();
        entry.status = Some(QueryStatus::Success);
        entry.data = Some(value);
        entry.error = None;
        entry.data_updated_at = at;
        entry.stale = false;
        trace!(key = %key, "cache entry updated");
    }

    /// Record a failed fetch. Previously resolved data is kept.
    pub fn record_failure(&self, key: &CacheKey, error: SharedError, at: i64) {
        let mut entries = self.entries.write();
        let entry = entries.entry(key.clone()).or_default();
        entry.status = Some(QueryStatus::Error);
        entry.error = Some(error);
        entry.error_updated_at = at;
        entry.failure_count += 1;
        entry.error_update_count += 1;
        trace!(key = %key, failures = entry.failure_count, "cache entry failed");
    }

    /// Snapshot an entry, or `None` if the key has never been touched.
    pub fn snapshot(&self, key: &CacheKey) -> Option<EntrySnapshot> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        let status = entry.status?;
        Some(EntrySnapshot {
            status,
            data: entry.data.clone(),
            error: entry.error.clone(),
            data_updated_at: entry.data_updated_at,
            error_updated_at: entry.error_updated_at,
            failure_count: entry.failure_count,
            error_update_count: entry.error_update_count,
            is_stale: entry.stale,
        })
    }

    /// Register an active subscriber with its refetcher. Refetchers are
    /// invoked in the background when the entry is invalidated.
    pub fn subscribe(&self, key: &CacheKey, refetcher: Refetcher) {
        let mut entries = self.entries.write();
        let entry = entries.entry(key.clone()).or_default();
        entry.subscribers += 1;
        entry.refetcher = Some(refetcher);
    }

    pub fn unsubscribe(&self, key: &CacheKey) {
        let mut entries = self.entries.write();
        if let Some(entry) = entries.get_mut(key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            if entry.subscribers == 0 {
                entry.refetcher = None;
            }
        }
    }

    /// Mark stale every entry the key covers and trigger background
    /// refetches for active subscribers. Keys match by prefix: a key without
    /// extra params covers all parametrized entries of the same fact and
    /// config. Safe to call for keys that were never fetched.
    pub fn invalidate(&self, key: &CacheKey) {
        let refetchers: Vec<Refetcher> = {
            let mut entries = self.entries.write();
            // Keep the exact key present so the stale mark is observable
            // even before the first fetch.
            entries.entry(key.clone()).or_default();
            let mut refetchers = Vec::new();
            for (entry_key, entry) in entries.iter_mut() {
                if entry_key.fact == key.fact
                    && entry_key.config == key.config
                    && entry_key.extra.starts_with(&key.extra)
                {
                    entry.stale = true;
                    if entry.subscribers > 0 {
                        if let Some(refetcher) = entry.refetcher.clone() {
                            refetchers.push(refetcher);
                        }
                    }
                }
            }
            refetchers
        };
        self.invalidation_log.lock().push(key.clone());
        debug!(fact = %key.fact, key = %key, "cache invalidated");

        // Outside a runtime (plain sync tests) the stale mark alone is the
        // observable effect.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            for refetcher in refetchers {
                handle.spawn(refetcher());
            }
        }
    }

    pub fn is_stale(&self, key: &CacheKey) -> bool {
        self.entries
            .read()
            .get(key)
            .map(|entry| entry.stale)
            .unwrap_or(false)
    }

    /// Ordered record of every invalidation since construction.
    pub fn invalidation_log(&self) -> Vec<CacheKey> {
        self.invalidation_log.lock().clone()
    }
}
