use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Result of a cache lookup.
///
/// A miss is `data: None, is_stale: true`. A hit past its staleness window
/// still returns the data, flagged stale so the caller can re-query in the
/// background.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup<V> {
    pub data: Option<V>,
    pub is_stale: bool,
}

struct Entry<V> {
    value: V,
    fetched_at: Instant,
    stale_after: Duration,
    expires_at: Instant,
    last_used: u64,
}

/// Time-boxed, capacity-bounded cache for derived read results.
///
/// Each entry has an independent staleness window and absolute expiry; beyond
/// `capacity` entries the least-recently-used one is evicted regardless of
/// TTL. The cache is an owned value injected into its consumers — it is never
/// the source of truth. Keys are opaque strings chosen by callers.
pub struct QueryCache<V> {
    entries: HashMap<String, Entry<V>>,
    capacity: usize,
    tick: u64,
}

impl<V: Clone> QueryCache<V> {
    /// Create a cache holding at most `capacity` entries. Zero capacity is
    /// not a valid configuration.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "cache capacity must be positive");
        Self {
            entries: HashMap::new(),
            capacity,
            tick: 0,
        }
    }

    /// Store a value. `stale_after == 0` marks every subsequent read stale;
    /// after `expires_after` the entry is dropped entirely.
    pub fn set(&mut self, key: impl Into<String>, value: V, stale_after: Duration, expires_after: Duration) {
        self.set_at(Instant::now(), key.into(), value, stale_after, expires_after);
    }

    /// Look up a key, returning the value and its staleness.
    pub fn get(&mut self, key: &str) -> Lookup<V> {
        self.get_at(Instant::now(), key)
    }

    pub fn del(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn set_at(
        &mut self,
        now: Instant,
        key: String,
        value: V,
        stale_after: Duration,
        expires_after: Duration,
    ) {
        self.tick += 1;
        self.entries.insert(
            key,
            Entry {
                value,
                fetched_at: now,
                stale_after,
                expires_at: now + expires_after,
                last_used: self.tick,
            },
        );
        self.evict(now);
    }

    fn get_at(&mut self, now: Instant, key: &str) -> Lookup<V> {
        let expired = matches!(self.entries.get(key), Some(e) if now >= e.expires_at);
        if expired {
            self.entries.remove(key);
        }
        match self.entries.get_mut(key) {
            Some(entry) => {
                self.tick += 1;
                entry.last_used = self.tick;
                let is_stale = entry.stale_after == Duration::ZERO
                    || now.duration_since(entry.fetched_at) > entry.stale_after;
                Lookup {
                    data: Some(entry.value.clone()),
                    is_stale,
                }
            }
            None => Lookup {
                data: None,
                is_stale: true,
            },
        }
    }

    /// Drop expired entries, then least-recently-used ones beyond capacity.
    fn evict(&mut self, now: Instant) {
        self.entries.retain(|_, e| now < e.expires_at);
        while self.entries.len() > self.capacity {
            let lru = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            match lru {
                Some(key) => self.entries.remove(&key),
                None => break,
            };
        }
    }
}
