//! Process-local read-through cache with lazy per-entry TTL expiry.
//!
//! Deliberately simple: unbounded, no eviction policy beyond expiry, no
//! cross-instance coherency. Do not grow this into a production cache; a
//! bounded or shared implementation belongs behind the same trait.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

/// Injected cache seam. Synchronous on purpose: lookups never suspend.
pub trait Cache: Send + Sync {
    /// Stored value if present and unexpired; expired entries are evicted
    /// during the lookup.
    fn get(&self, key: &str) -> Option<Value>;
    /// Unconditionally overwrites. `None` ttl means the entry never expires
    /// until invalidation or process exit.
    fn put(&self, key: &str, value: Value, ttl: Option<Duration>);
    /// Idempotent; reports whether a live entry was removed.
    fn invalidate(&self, key: &str) -> bool;
    fn clear(&self);
}

struct CacheEntry {
    value: Value,
    inserted_at: Instant,
    ttl: Option<Duration>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        match self.ttl {
            Some(ttl) => self.inserted_at.elapsed() > ttl,
            None => false,
        }
    }
}

#[derive(Default)]
pub struct TtlCache {
    entries: DashMap<String, CacheEntry>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Cache for TtlCache {
    fn get(&self, key: &str) -> Option<Value> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.is_expired() => true,
            Some(entry) => return Some(entry.value.clone()),
            None => return None,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    fn put(&self, key: &str, value: Value, ttl: Option<Duration>) {
        self.entries
            .insert(key.to_string(), CacheEntry { value, inserted_at: Instant::now(), ttl });
    }

    fn invalidate(&self, key: &str) -> bool {
        match self.entries.remove_if(key, |_, entry| !entry.is_expired()) {
            Some(_) => true,
            None => {
                // An expired leftover still gets cleaned up, but reports false.
                self.entries.remove_if(key, |_, entry| entry.is_expired());
                false
            }
        }
    }

    fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_returns_inserted_value_before_ttl() {
        let cache = TtlCache::new();
        cache.put("stations:list:{}", json!([{"id": 1}]), Some(Duration::from_secs(5)));
        assert_eq!(cache.get("stations:list:{}"), Some(json!([{"id": 1}])));
    }

    #[test]
    fn entries_without_ttl_never_expire() {
        let cache = TtlCache::new();
        cache.put("settings:all", json!({"k": "v"}), None);
        assert!(cache.get("settings:all").is_some());
    }

    #[test]
    fn expired_entry_is_evicted_on_lookup() {
        let cache = TtlCache::new();
        cache.put("k", json!(1), Some(Duration::from_millis(10)));
        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(cache.get("k"), None);
        // already evicted, so invalidate has nothing to remove
        assert!(!cache.invalidate("k"));
        assert!(cache.is_empty());
    }

    #[test]
    fn put_overwrites_existing_entry() {
        let cache = TtlCache::new();
        cache.put("k", json!("old"), None);
        cache.put("k", json!("new"), None);
        assert_eq!(cache.get("k"), Some(json!("new")));
    }

    #[test]
    fn invalidate_is_idempotent() {
        let cache = TtlCache::new();
        cache.put("k", json!(1), None);
        assert!(cache.invalidate("k"));
        assert!(!cache.invalidate("k"));
    }

    #[test]
    fn clear_removes_everything() {
        let cache = TtlCache::new();
        cache.put("a", json!(1), None);
        cache.put("b", json!(2), Some(Duration::from_secs(60)));
        cache.clear();
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), None);
    }
}
