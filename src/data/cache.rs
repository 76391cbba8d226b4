//! TTL cache for upstream query responses.
//!
//! The cache is an explicit collaborator: the embedder constructs it and
//! hands it to the client, instead of the client reaching for process-wide
//! state. Intended for local development against a rate-limited upstream;
//! production deployments simply do not construct one.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};
use std::time::{Duration, Instant};

use crate::model::LmpResponse;

struct CacheEntry {
    response: LmpResponse,
    expires_at: Instant,
}

/// Keyed TTL store for parsed Grid Status responses.
pub struct ResponseCache {
    store: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl ResponseCache {
    /// Creates a cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            store: RwLock::new(HashMap::new()),
            ttl,
        })
    }

    /// Returns a clone of the cached response, if present and unexpired.
    pub fn get(&self, key: &str) -> Option<LmpResponse> {
        let store = self.store.read().ok()?;
        let entry = store.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.response.clone())
    }

    /// Stores a response under `key`, resetting its TTL.
    pub fn set(&self, key: &str, response: LmpResponse) {
        if let Ok(mut store) = self.store.write() {
            store.insert(
                key.to_string(),
                CacheEntry {
                    response,
                    expires_at: Instant::now() + self.ttl,
                },
            );
        }
    }

    /// Drops every expired entry.
    pub fn purge_expired(&self) {
        if let Ok(mut store) = self.store.write() {
            let now = Instant::now();
            store.retain(|_, entry| entry.expires_at > now);
        }
    }

    /// Number of live entries (expired but unpurged entries included).
    pub fn len(&self) -> usize {
        self.store.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Starts a background janitor that purges expired entries periodically.
    ///
    /// The janitor holds only a weak handle; it exits once the cache is
    /// dropped.
    pub fn spawn_janitor(self: &Arc<Self>, interval: Duration) {
        let weak: Weak<Self> = Arc::downgrade(self);
        std::thread::spawn(move || loop {
            std::thread::sleep(interval);
            match weak.upgrade() {
                Some(cache) => cache.purge_expired(),
                None => break,
            }
        });
    }
}

/// Cache key for a location query.
pub fn query_cache_key(
    dataset_id: &str,
    location_id: &str,
    start_date: &str,
    end_date: &str,
    timezone: &str,
) -> String {
    format!("{dataset_id}|{location_id}|{start_date}|{end_date}|{timezone}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response() -> LmpResponse {
        LmpResponse {
            status_code: Some(200),
            data: Vec::new(),
        }
    }

    #[test]
    fn get_returns_what_was_set() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.set("k", response());
        assert!(cache.get("k").is_some());
        assert!(cache.get("other").is_none());
    }

    #[test]
    fn expired_entries_are_invisible_and_purgeable() {
        let cache = ResponseCache::new(Duration::from_millis(0));
        cache.set("k", response());
        assert!(cache.get("k").is_none());
        assert_eq!(cache.len(), 1);
        cache.purge_expired();
        assert!(cache.is_empty());
    }

    #[test]
    fn keys_distinguish_every_query_dimension() {
        let a = query_cache_key("ds", "loc", "2024-01-01", "2024-01-02", "market");
        let b = query_cache_key("ds", "loc", "2024-01-01", "2024-01-03", "market");
        assert_ne!(a, b);
    }
}
