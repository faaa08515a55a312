use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Short-lived cache for aggregate counts.
///
/// Entries are keyed by the caller's key plus the current time bucket
/// (`now / ttl`), and expire `ttl` after insertion, so a cached value is never
/// older than one TTL. A zero TTL disables the cache.
#[derive(Clone)]
pub struct CountCache<K, V> {
    entries: Arc<RwLock<HashMap<(K, i64), CachedValue<V>>>>,
    max_entries: usize,
    ttl: Duration,
}

#[derive(Clone)]
struct CachedValue<V> {
    value: V,
    expires_at: Instant,
}

impl<K, V> CountCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries,
            ttl,
        }
    }

    fn enabled(&self) -> bool {
        self.max_entries > 0 && !self.ttl.is_zero()
    }

    /// Time bucket `now` falls in.
    fn bucket(&self, now: DateTime<Utc>) -> i64 {
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX).max(1);
        now.timestamp_millis().div_euclid(ttl_ms)
    }

    pub async fn get(&self, key: &K, now: DateTime<Utc>) -> Option<V> {
        if !self.enabled() {
            return None;
        }

        let bucket_key = (key.clone(), self.bucket(now));
        let entries = self.entries.read().await;
        let instant = Instant::now();
        entries
            .get(&bucket_key)
            .and_then(|entry| (entry.expires_at > instant).then(|| entry.value.clone()))
    }

    /// Insert `value`, dropping expired entries first and then the entries
    /// closest to expiry while over capacity.
    pub async fn put(&self, key: K, now: DateTime<Utc>, value: V) {
        if !self.enabled() {
            return;
        }

        let inserted_at = Instant::now();
        let bucket_key = (key, self.bucket(now));
        let mut entries = self.entries.write().await;

        entries.retain(|_, entry| entry.expires_at > inserted_at);
        while entries.len() >= self.max_entries {
            let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            entries.remove(&oldest);
        }

        entries.insert(
            bucket_key,
            CachedValue {
                value,
                expires_at: inserted_at + self.ttl,
            },
        );
    }
}
