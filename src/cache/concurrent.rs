use super::byteview::ByteView;
use super::lru::LruStore;

use parking_lot::Mutex;
use serde::Serialize;

/// Point-in-time counters for a [`ConcurrentCache`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Default)]
struct Inner {
    // Allocated on the first `add`; a group that never caches anything pays nothing.
    lru: Option<LruStore>,
    hits: u64,
    misses: u64,
}

/// Thread-safe wrapper around [`LruStore`].
///
/// Every operation takes the same mutex for the duration of one store call,
/// so `get` and `add` are linearizable and an entry is never handed out while
/// it is being evicted. Callers must not hold anything across a load.
pub struct ConcurrentCache {
    capacity_bytes: u64,
    inner: Mutex<Inner>,
}

impl ConcurrentCache {
    pub fn new(capacity_bytes: u64) -> Self {
        Self {
            capacity_bytes,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn get(&self, key: &str) -> Option<ByteView> {
        let mut inner = self.inner.lock();
        let value = inner.lru.as_mut().and_then(|lru| lru.get(key));
        match value {
            Some(_) => inner.hits += 1,
            None => inner.misses += 1,
        }
        value
    }

    pub fn add(&self, key: &str, value: ByteView) {
        let mut inner = self.inner.lock();
        let capacity = self.capacity_bytes;
        inner
            .lru
            .get_or_insert_with(|| LruStore::new(capacity))
            .add(key, value);
    }

    pub fn remove(&self, key: &str) -> Option<ByteView> {
        self.inner.lock().lru.as_mut().and_then(|lru| lru.remove(key))
    }

    pub fn clear(&self) {
        if let Some(lru) = self.inner.lock().lru.as_mut() {
            lru.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lru.as_ref().map_or(0, LruStore::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn used_bytes(&self) -> u64 {
        self.inner.lock().lru.as_ref().map_or(0, LruStore::used_bytes)
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let (entries, bytes, evictions) = inner
            .lru
            .as_ref()
            .map_or((0, 0, 0), |lru| (lru.len(), lru.used_bytes(), lru.evictions()));
        CacheStats {
            entries,
            bytes,
            hits: inner.hits,
            misses: inner.misses,
            evictions,
        }
    }
}
