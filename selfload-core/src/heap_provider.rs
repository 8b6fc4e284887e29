use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use linked_hash_map::LinkedHashMap;
use parking_lot::Mutex;

use crate::cache_entry::{duration_millis, now_millis};
use crate::{CacheEntry, CacheError, CacheKey, CacheProvider};

/// Smallest capacity a [`HeapCacheProvider`] accepts. Smaller values are raised to this floor.
pub const MIN_CAPACITY: usize = 16;

/// Capacity used by [`HeapCacheProvider::default`].
pub const DEFAULT_CAPACITY: usize = 1024;

/// A bounded in-heap cache backend with least-recently-used eviction.
///
/// Entries are kept in access order: every `get` marks the entry as most recently used and
/// a `put` which would exceed the capacity first evicts the least recently used entry. Expired
/// entries are not purged by time; they stay until they are evicted, removed or replaced, so
/// that a stale value can still be served and refreshed via `touch`.
///
/// # Thread Safety
///
/// The whole store lives behind a single `parking_lot::Mutex`. Every operation, including the
/// check-then-replace sequence of `touch` and the insert-then-evict sequence of `put`, runs as
/// one critical section. Since even `get` has to update the access order, a reader/writer lock
/// would hand out write locks for almost every call anyway; a plain mutex is cheaper.
///
/// # Performance Characteristics
///
/// - **Get**: O(1) lookup plus O(1) move to the back of the access order
/// - **Put**: O(1), evicting at most one entry per call
/// - **Touch**: O(1)
///
/// # Examples
///
/// ```
/// use selfload_core::{attrs, CacheKey, CacheProvider, HeapCacheProvider};
/// use std::time::Duration;
///
/// struct Page;
///
/// let provider = HeapCacheProvider::new(16);
/// for i in 0..17 {
///     provider
///         .put(&CacheKey::of::<Page>(attrs![i]), i, Duration::from_secs(60))
///         .unwrap();
/// }
///
/// // The first key was the least recently used one and got evicted.
/// assert_eq!(provider.len(), 16);
/// assert!(provider.get(&CacheKey::of::<Page>(attrs![0])).unwrap().is_none());
/// ```
pub struct HeapCacheProvider<V> {
    map: Mutex<LinkedHashMap<CacheKey, CacheEntry<V>>>,
    capacity: usize,
    evictions: AtomicU64,
}

impl<V> HeapCacheProvider<V> {
    /// Creates a provider holding at most `capacity` entries (at least [`MIN_CAPACITY`]).
    pub fn new(capacity: usize) -> Self {
        Self {
            map: Mutex::new(LinkedHashMap::new()),
            capacity: capacity.max(MIN_CAPACITY),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.lock().is_empty()
    }

    /// Returns how many entries were evicted to make room for new ones.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Evicts least recently used entries until the capacity is respected.
    fn enforce_capacity(&self, map: &mut LinkedHashMap<CacheKey, CacheEntry<V>>) {
        while map.len() > self.capacity {
            match map.pop_front() {
                Some((evicted, _)) => {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                    log::trace!("Evicted least recently used entry {}", evicted);
                }
                None => break,
            }
        }
    }
}

impl<V> Default for HeapCacheProvider<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<V: Clone + Send> CacheProvider<V> for HeapCacheProvider<V> {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry<V>>, CacheError> {
        Ok(self.map.lock().get_refresh(key).map(|entry| entry.clone()))
    }

    fn put_entry(
        &self,
        key: &CacheKey,
        entry: CacheEntry<V>,
        _retain_for: Duration,
    ) -> Result<(), CacheError> {
        let mut map = self.map.lock();
        map.insert(key.clone(), entry);
        self.enforce_capacity(&mut map);

        Ok(())
    }

    fn touch(&self, key: &CacheKey, duration: Duration) -> Result<bool, CacheError> {
        if duration_millis(duration) == 0 {
            return Ok(false);
        }

        let mut map = self.map.lock();
        let expired = match map.get(key) {
            Some(entry) => entry.is_expired_at(now_millis()),
            None => {
                return Err(CacheError::requirement(format!(
                    "touch requires a present entry, but {} is not cached",
                    key
                )))
            }
        };

        if !expired {
            return Ok(false);
        }

        if let Some(stale) = map.remove(key) {
            map.insert(key.clone(), stale.renewed(duration));
        }

        Ok(true)
    }

    fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.map.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.map.lock().clear();
        Ok(())
    }
}
