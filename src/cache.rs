//! Bounded in-memory LRU cache (component E).
//!
//! Recast from the original's intrusive circular doubly-linked list of raw
//! pointers into an arena of slots plus an index map, keyed by `(host, path)`.
//! Recency is tracked the same way the original does — a global monotonic
//! counter stamped onto whichever entry was last touched — but eviction scans
//! for the minimum stamp instead of walking a list, which sidesteps the need
//! for any unsafe pointer surgery.
//!
//! Readers (`find`) only ever take the shared lock; `insert` is the sole
//! writer. `touch` deliberately does *not* take the writer lock — it stamps
//! an `AtomicU64` with `Relaxed` ordering, so two concurrent readers touching
//! the same entry can race and one stamp can be lost. That's acceptable: the
//! eviction policy only needs an approximate recency ordering, not an exact
//! one (O4 in DESIGN.md).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::config::{MAX_CACHE_SIZE, MAX_OBJECT_SIZE};

/// A cached response body, keyed by the host/path that produced it.
pub struct CacheEntry {
    pub host: String,
    pub path: String,
    pub data: Arc<[u8]>,
    use_index: AtomicU64,
}

impl CacheEntry {
    fn touch(&self, stamp: u64) {
        self.use_index.store(stamp, Ordering::Relaxed);
    }

    fn last_used(&self) -> u64 {
        self.use_index.load(Ordering::Relaxed)
    }
}

struct Inner {
    slots: Vec<Option<Arc<CacheEntry>>>,
    index: FxHashMap<(String, String), usize>,
    free: Vec<usize>,
    total_size: usize,
}

/// Thread-safe bounded LRU cache. Share one instance behind an `Arc` across
/// connection tasks.
pub struct Cache {
    inner: RwLock<Inner>,
    clock: AtomicU64,
}

impl Cache {
    pub fn new() -> Self {
        Cache {
            inner: RwLock::new(Inner {
                slots: Vec::new(),
                index: FxHashMap::default(),
                free: Vec::new(),
                total_size: 0,
            }),
            clock: AtomicU64::new(0),
        }
    }

    fn next_stamp(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Looks up a cached entry by key. Takes the read lock only long enough
    /// to clone the `Arc`; the recency touch happens after the lock is
    /// released.
    pub fn find(&self, host: &str, path: &str) -> Option<Arc<CacheEntry>> {
        let entry = {
            let guard = self.inner.read();
            let idx = *guard.index.get(&(host.to_string(), path.to_string()))?;
            guard.slots[idx].clone()
        };
        if let Some(entry) = &entry {
            entry.touch(self.next_stamp());
        }
        entry
    }

    /// Inserts `data` for `(host, path)`, evicting least-recently-touched
    /// entries until the new entry fits within `MAX_CACHE_SIZE`. Objects
    /// at or above `MAX_OBJECT_SIZE` are silently not cached (I4 requires
    /// strict `<`) — the streamer is expected to have already latched
    /// overflow before calling this.
    pub fn insert(&self, host: String, path: String, data: Vec<u8>) {
        if data.len() >= MAX_OBJECT_SIZE {
            return;
        }
        let mut guard = self.inner.write();

        let key = (host, path);
        if let Some(&idx) = guard.index.get(&key) {
            if let Some(old) = guard.slots[idx].take() {
                guard.total_size -= old.data.len();
            }
            guard.free.push(idx);
            guard.index.remove(&key);
        }

        while guard.total_size + data.len() >= MAX_CACHE_SIZE && !guard.index.is_empty() {
            let victim = guard
                .index
                .values()
                .copied()
                .min_by_key(|&idx| guard.slots[idx].as_ref().map(|e| e.last_used()).unwrap_or(0))
                .expect("index is non-empty");
            let victim_key = guard.slots[victim]
                .as_ref()
                .map(|e| (e.host.clone(), e.path.clone()))
                .expect("victim slot occupied");
            if let Some(old) = guard.slots[victim].take() {
                guard.total_size -= old.data.len();
            }
            guard.free.push(victim);
            guard.index.remove(&victim_key);
        }

        let entry = Arc::new(CacheEntry {
            host: key.0.clone(),
            path: key.1.clone(),
            data: Arc::from(data.into_boxed_slice()),
            use_index: AtomicU64::new(self.next_stamp()),
        });
        let size = entry.data.len();

        let idx = if let Some(idx) = guard.free.pop() {
            guard.slots[idx] = Some(entry);
            idx
        } else {
            guard.slots.push(Some(entry));
            guard.slots.len() - 1
        };

        guard.index.insert(key, idx);
        guard.total_size += size;
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.read().index.len()
    }

    #[cfg(test)]
    fn total_size(&self) -> usize {
        self.inner.read().total_size
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}
