//! Result cache for edit steps
//!
//! Memoizes step outcomes by `(command fragment, document content)` using
//! moka. Entries are written at most once per key: a second insert for the
//! same key keeps the first value, so concurrent writers are harmless as
//! long as they compute the same thing.
//!
//! The cache is an explicit value. Callers construct one and hand it to the
//! pipeline; clones share storage.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

use bpe_document::ContentHash;
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Key of one cached step result
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Command fragment plus whatever context makes it unambiguous
    pub fragment: String,
    /// Content of the document the fragment ran against
    pub content: ContentHash,
}

impl CacheKey {
    /// Create a key
    #[inline]
    #[must_use]
    pub fn new(fragment: impl Into<String>, content: ContentHash) -> Self {
        Self {
            fragment: fragment.into(),
            content,
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.fragment, self.content.short())
    }
}

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
    /// Lookups that found an entry
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit, 0 when nothing was looked up
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Concurrent, write-once cache of step results
#[derive(Clone)]
pub struct ResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<CacheKey, V>,
    counters: Arc<Counters>,
}

impl<V> ResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create new cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Look up a key, returning an owned copy of the cached value
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let found = self.inner.get(key);
        let counter = if found.is_some() {
            &self.counters.hits
        } else {
            &self.counters.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(key = %key, hit = found.is_some(), "cache lookup");
        found
    }

    /// Insert unless the key already has a value
    ///
    /// Returns `true` if this call stored the value.
    pub fn insert_once(&self, key: CacheKey, value: V) -> bool {
        let entry = self.inner.entry(key).or_insert(value);
        if entry.is_fresh() {
            tracing::trace!(key = %entry.key(), "cache entry stored");
        }
        entry.is_fresh()
    }

    /// Check if a key has a value, without counting a lookup
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.contains_key(key)
    }

    /// Invalidate all entries
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.run_pending_tasks();
        CacheStats {
            entry_count: self.inner.entry_count(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
        }
    }
}

impl<V> Default for ResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create cache with default capacity (10,000 entries)
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl<V> Debug for ResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("entry_count", &self.inner.entry_count())
            .field("hits", &self.counters.hits.load(Ordering::Relaxed))
            .field("misses", &self.counters.misses.load(Ordering::Relaxed))
            .finish()
    }
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
