//! Generic size- and time-bounded key→value store.
//!
//! One `BoundedCache` instance serves one purpose (recent assistant-message
//! pages, web-search responses, synthesized audio); every entry in an
//! instance shares the same capacity and TTL. Expiry is lazy on `get`, with
//! an optional periodic sweep for entries that are never read again.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

struct CacheEntry<V> {
    value: V,
    timestamp: Instant,
}

/// Bounded key→value mapping with oldest-first eviction.
///
/// When the cache is at capacity and a new key arrives, the entry with the
/// smallest insertion timestamp is evicted first. A capacity of zero
/// disables the cache: inserts are rejected silently rather than erroring.
pub struct BoundedCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    capacity: usize,
    ttl: Option<Duration>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
            ttl,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the stored value only if the entry is younger than the TTL.
    ///
    /// The age check uses a single `now` computed at entry so the whole
    /// call observes one instant. A stale hit is removed on the spot and
    /// reported as a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if !self.expired(entry, now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert or refresh an entry, evicting the oldest one first when the
    /// cache is full and the key is new.
    pub fn insert(&self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.lock();
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.timestamp)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                timestamp: Instant::now(),
            },
        );
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.lock().remove(key).map(|entry| entry.value)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every entry whose age exceeds the TTL, independent of access.
    pub fn purge_expired(&self) {
        let Some(ttl) = self.ttl else { return };
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.timestamp) < ttl);
        let dropped = before - entries.len();
        if dropped > 0 {
            tracing::debug!(dropped, "cache sweep removed expired entries");
        }
    }

    fn expired(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.duration_since(entry.timestamp) >= ttl,
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, CacheEntry<V>>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Run `purge_expired` on a fixed interval until the returned handle is
    /// aborted. The handle must be kept by the owner; dropping it leaks the
    /// tick loop for the life of the runtime.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                cache.purge_expired();
            }
        })
    }
}
