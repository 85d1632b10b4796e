//! In-process microcache (spec §4.4).
//!
//! A small bounded-TTL cache sitting in front of the distributed cache,
//! grounded on the teacher's `enterprise::cache::tier` L1 DashMap tier:
//! same lazy-expiry-on-read strategy, generalized from an LRU-promotion
//! tier to a flat TTL-only tier since the spec calls for no eviction
//! policy beyond expiry.

use std::time::{Duration, Instant};

use dashmap::DashMap;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// A process-local cache keyed by `String`, values expiring `ttl` after
/// insertion. Expiry is checked lazily on read; there is no background
/// sweeper, matching the teacher's tier (eviction happens on access, not
/// on a timer).
pub struct Microcache<V> {
    entries: DashMap<String, Entry<V>>,
    ttl: Duration,
}

impl<V: Clone> Microcache<V> {
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::from_millis(ttl_ms),
        }
    }

    /// `None` if the TTL is zero — callers treat a zero-millisecond
    /// configuration as "microcache disabled".
    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub fn get(&self, key: &str) -> Option<V> {
        if !self.is_enabled() {
            return None;
        }

        let hit = self
            .entries
            .get(key)
            .map(|entry| (Instant::now() >= entry.expires_at, entry.value.clone()));

        match hit {
            Some((true, _)) => {
                self.entries.remove(key);
                None
            }
            Some((false, value)) => Some(value),
            None => None,
        }
    }

    pub fn set(&self, key: String, value: V) {
        if !self.is_enabled() {
            return;
        }
        self.entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn disabled_when_ttl_is_zero() {
        let cache: Microcache<u32> = Microcache::new(0);
        cache.set("k".to_string(), 1);
        assert!(cache.get("k").is_none());
        assert!(!cache.is_enabled());
    }

    #[test]
    fn stores_and_returns_value_within_ttl() {
        let cache = Microcache::new(5_000);
        cache.set("k".to_string(), 42);
        assert_eq!(cache.get("k"), Some(42));
    }

    #[test]
    fn expires_after_ttl_elapses() {
        let cache = Microcache::new(10);
        cache.set("k".to_string(), 42);
        sleep(Duration::from_millis(30));
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn remove_evicts_immediately() {
        let cache = Microcache::new(5_000);
        cache.set("k".to_string(), 1);
        cache.remove("k");
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn missing_key_returns_none() {
        let cache: Microcache<u32> = Microcache::new(5_000);
        assert_eq!(cache.get("missing"), None);
    }
}
