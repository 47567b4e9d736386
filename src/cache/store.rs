//! Family-partitioned response cache storage.
//!
//! Each family owns an LRU of serialized response payloads with per-entry
//! TTLs. Admin writes invalidate the owning family only; entries for the
//! other family stay warm.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use time::OffsetDateTime;

use super::config::CacheConfig;
use super::keys::{Family, ResponseKey};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Serialized response payload plus the validators served alongside it.
#[derive(Debug, Clone)]
pub struct CachedPayload {
    pub body: Bytes,
    pub etag: String,
    pub last_modified: OffsetDateTime,
    stored_at: Instant,
    ttl: Duration,
}

impl CachedPayload {
    pub fn new(body: Bytes, etag: String, last_modified: OffsetDateTime, ttl: Duration) -> Self {
        Self {
            body,
            etag,
            last_modified,
            stored_at: Instant::now(),
            ttl,
        }
    }

    fn is_fresh(&self) -> bool {
        self.stored_at.elapsed() < self.ttl
    }
}

pub struct ResponseCache {
    config: CacheConfig,
    events: RwLock<LruCache<ResponseKey, CachedPayload>>,
    journals: RwLock<LruCache<ResponseKey, CachedPayload>>,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = config.capacity_non_zero();
        Self {
            config,
            events: RwLock::new(LruCache::new(capacity)),
            journals: RwLock::new(LruCache::new(capacity)),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn list_ttl(&self) -> Duration {
        self.config.list_ttl
    }

    pub fn detail_ttl(&self) -> Duration {
        self.config.detail_ttl
    }

    fn shard(&self, family: Family) -> &RwLock<LruCache<ResponseKey, CachedPayload>> {
        match family {
            Family::Events => &self.events,
            Family::Journals => &self.journals,
        }
    }

    pub fn get(&self, family: Family, key: &ResponseKey) -> Option<CachedPayload> {
        if !self.config.enabled {
            return None;
        }

        let mut shard = rw_write(self.shard(family), SOURCE, "get");
        match shard.get(key) {
            Some(entry) if entry.is_fresh() => {
                counter!("lanterna_cache_hit_total", "family" => family.as_str()).increment(1);
                Some(entry.clone())
            }
            Some(_) => {
                shard.pop(key);
                counter!("lanterna_cache_miss_total", "family" => family.as_str()).increment(1);
                None
            }
            None => {
                counter!("lanterna_cache_miss_total", "family" => family.as_str()).increment(1);
                None
            }
        }
    }

    pub fn insert(&self, family: Family, key: ResponseKey, payload: CachedPayload) {
        if !self.config.enabled {
            return;
        }

        let evicted = rw_write(self.shard(family), SOURCE, "insert").push(key, payload);
        if evicted.is_some_and(|(evicted_key, _)| evicted_key != key) {
            counter!("lanterna_cache_evict_total", "family" => family.as_str()).increment(1);
        }
    }

    /// Drop every entry belonging to the family. Called after each admin
    /// write so readers never observe stale content.
    pub fn invalidate_family(&self, family: Family) {
        rw_write(self.shard(family), SOURCE, "invalidate_family").clear();
        counter!("lanterna_cache_invalidate_total", "family" => family.as_str()).increment(1);
    }

    pub fn len(&self, family: Family) -> usize {
        rw_read(self.shard(family), SOURCE, "len").len()
    }

    pub fn is_empty(&self, family: Family) -> bool {
        self.len(family) == 0
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    fn payload(body: &str, ttl: Duration) -> CachedPayload {
        CachedPayload::new(
            Bytes::from(body.to_string()),
            format!("\"{body}\""),
            OffsetDateTime::now_utc(),
            ttl,
        )
    }

    fn hour() -> Duration {
        Duration::from_secs(3600)
    }

    #[test]
    fn roundtrip_within_ttl() {
        let cache = ResponseCache::new(CacheConfig::default());
        let key = ResponseKey::List { params_hash: 1 };

        assert!(cache.get(Family::Events, &key).is_none());

        cache.insert(Family::Events, key, payload("hello", hour()));
        let cached = cache.get(Family::Events, &key).expect("cached entry");
        assert_eq!(cached.body, Bytes::from("hello"));
    }

    #[test]
    fn expired_entries_read_as_misses() {
        let cache = ResponseCache::new(CacheConfig::default());
        let key = ResponseKey::List { params_hash: 2 };

        cache.insert(Family::Events, key, payload("stale", Duration::ZERO));
        assert!(cache.get(Family::Events, &key).is_none());
        assert!(cache.is_empty(Family::Events));
    }

    #[test]
    fn families_invalidate_independently() {
        let cache = ResponseCache::new(CacheConfig::default());
        let key = ResponseKey::List { params_hash: 3 };

        cache.insert(Family::Events, key, payload("events", hour()));
        cache.insert(Family::Journals, key, payload("journals", hour()));

        cache.invalidate_family(Family::Events);

        assert!(cache.get(Family::Events, &key).is_none());
        assert!(cache.get(Family::Journals, &key).is_some());
    }

    #[test]
    fn lru_eviction_respects_capacity() {
        let config = CacheConfig {
            capacity: 2,
            ..Default::default()
        };
        let cache = ResponseCache::new(config);

        for hash in 0..3u64 {
            cache.insert(
                Family::Journals,
                ResponseKey::List { params_hash: hash },
                payload("x", hour()),
            );
        }

        assert!(
            cache
                .get(Family::Journals, &ResponseKey::List { params_hash: 0 })
                .is_none()
        );
        assert!(
            cache
                .get(Family::Journals, &ResponseKey::List { params_hash: 2 })
                .is_some()
        );
    }

    #[test]
    fn disabled_cache_stores_nothing() {
        let config = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        let cache = ResponseCache::new(config);
        let key = ResponseKey::List { params_hash: 9 };

        cache.insert(Family::Events, key, payload("skip", hour()));
        assert!(cache.get(Family::Events, &key).is_none());
    }

    #[test]
    fn recovers_from_poisoned_lock() {
        let cache = ResponseCache::new(CacheConfig::default());
        let key = ResponseKey::List { params_hash: 4 };

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = cache.events.write().expect("events lock");
            panic!("poison events lock");
        }));

        cache.insert(Family::Events, key, payload("ok", hour()));
        assert!(cache.get(Family::Events, &key).is_some());
    }
}
