//! TTL request cache
//!
//! Keyed by backend identity plus the exact compiled query text, so any
//! change in compiler output misses naturally. Entries are only inserted by
//! callers after a successful, non-cancelled response.

use graphlens_config::{QueryEngine, RequestCacheConfig};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

type CacheKey = (QueryEngine, String);

#[derive(Debug)]
struct CacheEntry {
    response: Arc<Value>,
    stored_at: Instant,
}

/// In-memory response cache scoped to one connector instance
#[derive(Debug)]
pub struct RequestCache {
    enabled: bool,
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl RequestCache {
    pub fn new(config: &RequestCacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            ttl: config.ttl(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// A pass-through cache that never stores anything
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ttl: Duration::ZERO,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Look up a live entry, dropping it if it expired
    pub fn get(&self, engine: QueryEngine, query: &str) -> Option<Arc<Value>> {
        if !self.enabled {
            return None;
        }
        let key = (engine, query.to_string());
        let mut entries = self.entries.lock();
        match entries.get(&key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.response.clone()),
            Some(_) => {
                trace!(engine = %engine, "request cache entry expired");
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, engine: QueryEngine, query: &str, response: Arc<Value>) {
        if !self.enabled {
            return;
        }
        self.entries.lock().insert(
            (engine, query.to_string()),
            CacheEntry {
                response,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Drop expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RequestCache {
    fn default() -> Self {
        Self::new(&RequestCacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache_with_ttl(ttl_seconds: u64) -> RequestCache {
        RequestCache::new(&RequestCacheConfig {
            enabled: true,
            ttl_seconds,
        })
    }

    #[test]
    fn test_hit_is_keyed_by_engine_and_query() {
        let cache = cache_with_ttl(60);
        cache.insert(QueryEngine::Gremlin, "g.V()", Arc::new(json!([1])));

        assert_eq!(
            cache.get(QueryEngine::Gremlin, "g.V()").as_deref(),
            Some(&json!([1]))
        );
        assert!(cache.get(QueryEngine::OpenCypher, "g.V()").is_none());
        assert!(cache.get(QueryEngine::Gremlin, "g.V() ").is_none());
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let cache = cache_with_ttl(0);
        cache.insert(QueryEngine::Sparql, "ASK {}", Arc::new(json!({"boolean": true})));

        assert!(cache.get(QueryEngine::Sparql, "ASK {}").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_live_until_ttl() {
        let cache = cache_with_ttl(10);
        cache.insert(QueryEngine::Gremlin, "g.V()", Arc::new(json!([1])));

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(cache.get(QueryEngine::Gremlin, "g.V()").is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get(QueryEngine::Gremlin, "g.V()").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_and_clear() {
        let expired = cache_with_ttl(0);
        expired.insert(QueryEngine::Gremlin, "a", Arc::new(json!(1)));
        expired.insert(QueryEngine::Gremlin, "b", Arc::new(json!(2)));
        assert_eq!(expired.purge_expired(), 2);

        let live = cache_with_ttl(60);
        live.insert(QueryEngine::Gremlin, "a", Arc::new(json!(1)));
        assert_eq!(live.purge_expired(), 0);
        live.clear();
        assert!(live.is_empty());
    }

    #[test]
    fn test_disabled_cache_is_pass_through() {
        let cache = RequestCache::disabled();
        cache.insert(QueryEngine::Gremlin, "g.V()", Arc::new(json!([])));
        assert!(cache.get(QueryEngine::Gremlin, "g.V()").is_none());
        assert_eq!(cache.len(), 0);
    }
}
