//! In-memory result cache for aggregated blocking queries.
//!
//! Caches the final filtered, grouped results keyed by the (normalised
//! query, resolved source set, filter state) triple. Uses [`moka`] for
//! async-friendly caching with bounded capacity and TTL eviction. The cache
//! is owned by whoever builds the pipeline; there is no process-wide
//! instance.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use moka::future::Cache;

use crate::config::ResultCacheConfig;
use crate::types::{SearchResult, SourceDescriptor};

/// Composite cache key: normalised query + source set hash + filter state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Lowercased, trimmed query string.
    query: String,
    /// Hash of the sorted source keys, so callers with different source
    /// sets never share an entry.
    source_hash: u64,
    filtered: bool,
}

impl CacheKey {
    /// Build a deterministic cache key.
    ///
    /// The query is lowercased and trimmed. Source keys are sorted before
    /// hashing so registry order does not matter.
    pub fn new(query: &str, sources: &[SourceDescriptor], filtered: bool) -> Self {
        Self {
            query: query.trim().to_lowercase(),
            source_hash: hash_sources(sources),
            filtered,
        }
    }
}

/// Bounded, TTL-evicting memo of recent query results.
///
/// Cloning is cheap and clones share entries.
#[derive(Clone, Default)]
pub struct ResultCache {
    inner: Option<Cache<CacheKey, Vec<SearchResult>>>,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl ResultCache {
    /// Build a cache from configuration. A zero TTL yields a disabled cache.
    pub fn new(config: &ResultCacheConfig) -> Self {
        if config.ttl_seconds == 0 {
            return Self::disabled();
        }
        let cache = Cache::builder()
            .max_capacity(config.capacity)
            .time_to_live(Duration::from_secs(config.ttl_seconds))
            .build();
        Self { inner: Some(cache) }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Look up cached results. Always `None` when disabled.
    pub async fn get(&self, key: &CacheKey) -> Option<Vec<SearchResult>> {
        match self.inner {
            Some(ref cache) => cache.get(key).await,
            None => None,
        }
    }

    /// Store results. Empty result sets are never stored since they usually
    /// reflect transient source failures.
    pub async fn insert(&self, key: CacheKey, results: Vec<SearchResult>) {
        if results.is_empty() {
            return;
        }
        if let Some(ref cache) = self.inner {
            cache.insert(key, results).await;
        }
    }
}

/// Compute an order-independent hash of a source set.
fn hash_sources(sources: &[SourceDescriptor]) -> u64 {
    let mut keys: Vec<&str> = sources.iter().map(|s| s.key.as_str()).collect();
    keys.sort_unstable();
    let mut hasher = DefaultHasher::new();
    for key in keys {
        key.hash(&mut hasher);
    }
    hasher.finish()
}
