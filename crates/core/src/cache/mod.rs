//! In-process, TTL-bounded result cache.
//!
//! One [`ResultCache`] instance exists per marketplace source. Entries are
//! never evicted in the background: freshness is checked lazily on read, and
//! a stale or absent entry means "must refetch". Concurrent writers for the
//! same key are last-writer-wins; the only risk is staleness, never a torn
//! entry, because an entry is replaced whole under the write lock.
//!
//! The cache is not shared across processes. Horizontally scaled
//! deployments get one independent cache per instance.

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// A stored value and the instant it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub data: T,
    pub stored_at: DateTime<Utc>,
}

/// Per-source key/value store bounded by a single TTL.
pub struct ResultCache<T> {
    name: String,
    ttl: Duration,
    max_age: TimeDelta,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> ResultCache<T> {
    /// Create a cache backed by the system clock.
    pub fn new(name: impl Into<String>, ttl: Duration) -> Self {
        Self::with_clock(name, ttl, Arc::new(SystemClock))
    }

    /// Create a cache reading time from the given clock.
    pub fn with_clock(name: impl Into<String>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            ttl,
            max_age: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the raw stored entry regardless of freshness.
    pub fn get(&self, key: &str) -> Option<CacheEntry<T>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Store `data` under `key`, overwriting any prior entry.
    pub fn set(&self, key: &str, data: T) {
        let entry = CacheEntry { data, stored_at: self.clock.now() };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), entry);
    }

    /// Drop every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let removed = entries.len();
        entries.clear();
        tracing::info!(cache = %self.name, removed, "cache cleared");
        removed
    }

    /// An entry is fresh iff `now - stored_at < ttl`.
    pub fn is_fresh(&self, entry: &CacheEntry<T>) -> bool {
        self.clock.now().signed_duration_since(entry.stored_at) < self.max_age
    }

    /// Convenience for the system-wide policy: fresh means "serve as is".
    pub fn get_fresh(&self, key: &str) -> Option<T> {
        let entry = self.get(key)?;
        if self.is_fresh(&entry) {
            tracing::debug!(cache = %self.name, key, "cache hit");
            Some(entry.data)
        } else {
            tracing::debug!(cache = %self.name, key, "cache entry stale");
            None
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
