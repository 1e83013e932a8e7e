//! Compiled Query Cache
//!
//! Process-wide memo of compiled artifacts, keyed by query text, language
//! and fetch overrides. Entries are never evicted: the set of distinct query
//! texts an application issues is bounded by its source code.

use crate::compiled::{CompiledQuery, QueryLanguage};
use crate::hints::QueryHints;
use crate::metadata::FetchPolicy;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a compilation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub text: String,
    pub language: QueryLanguage,
    pub relationship_fetch: Option<FetchPolicy>,
    pub column_fetch: Option<FetchPolicy>,
}

impl CacheKey {
    pub fn new(text: impl Into<String>, language: QueryLanguage, hints: &QueryHints) -> Self {
        Self {
            text: text.into(),
            language,
            relationship_fetch: hints.relationship_fetch,
            column_fetch: hints.column_fetch,
        }
    }
}

/// Storage for compiled queries. Implementations must tolerate concurrent
/// inserts of the same key; the last write wins.
pub trait QueryCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<Arc<CompiledQuery>>;

    fn insert(&self, key: CacheKey, query: Arc<CompiledQuery>);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stats(&self) -> CacheStats;
}

/// Thread-safe in-memory cache
#[derive(Default)]
pub struct MemoryQueryCache {
    entries: DashMap<CacheKey, Arc<CompiledQuery>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryQueryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QueryCache for MemoryQueryCache {
    fn get(&self, key: &CacheKey) -> Option<Arc<CompiledQuery>> {
        if let Some(entry) = self.entries.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(Arc::clone(entry.value()));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn insert(&self, key: CacheKey, query: Arc<CompiledQuery>) {
        self.entries.insert(key, query);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache that stores nothing; every lookup is a miss.
#[derive(Default)]
pub struct NoopQueryCache {
    misses: AtomicU64,
}

impl QueryCache for NoopQueryCache {
    fn get(&self, _key: &CacheKey) -> Option<Arc<CompiledQuery>> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn insert(&self, _key: CacheKey, _query: Arc<CompiledQuery>) {}

    fn len(&self) -> usize {
        0
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            entries: 0,
            hits: 0,
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}
