use std::time::Duration;

use dashmap::DashMap;

use crate::cache_entry::{duration_millis, now_millis};
use crate::{CacheEntry, CacheError, CacheKey, CacheProvider};

/// An unbounded in-heap cache backend built on a sharded concurrent map.
///
/// Unlike [`HeapCacheProvider`](crate::HeapCacheProvider) this provider never evicts on its own
/// and has no global lock: lookups on different shards proceed in parallel. Use it when the
/// key space is known to be small or when entries are removed explicitly.
///
/// `touch` runs while holding the write guard of the key's shard, so the single-flight
/// guarantee of [`CacheProvider::touch`] holds here as well.
///
/// # Examples
///
/// ```
/// use selfload_core::{attrs, CacheKey, CacheProvider, ShardedCacheProvider};
/// use std::time::Duration;
///
/// struct Rate;
///
/// let provider = ShardedCacheProvider::new();
/// let key = CacheKey::of::<Rate>(attrs!["EUR", "USD"]);
///
/// provider.put(&key, 1.08, Duration::from_secs(60)).unwrap();
/// assert_eq!(provider.get(&key).unwrap().unwrap().value, 1.08);
/// ```
pub struct ShardedCacheProvider<V> {
    map: DashMap<CacheKey, CacheEntry<V>>,
}

impl<V> ShardedCacheProvider<V> {
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<V> Default for ShardedCacheProvider<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> CacheProvider<V> for ShardedCacheProvider<V> {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry<V>>, CacheError> {
        Ok(self.map.get(key).map(|entry| entry.value().clone()))
    }

    fn put_entry(
        &self,
        key: &CacheKey,
        entry: CacheEntry<V>,
        _retain_for: Duration,
    ) -> Result<(), CacheError> {
        self.map.insert(key.clone(), entry);
        Ok(())
    }

    fn touch(&self, key: &CacheKey, duration: Duration) -> Result<bool, CacheError> {
        if duration_millis(duration) == 0 {
            return Ok(false);
        }

        // The shard stays write-locked until `entry` is dropped.
        let mut entry = self.map.get_mut(key).ok_or_else(|| {
            CacheError::requirement(format!(
                "touch requires a present entry, but {} is not cached",
                key
            ))
        })?;

        if !entry.is_expired_at(now_millis()) {
            return Ok(false);
        }

        let renewed = CacheEntry::expiring_in(entry.value.clone(), duration);
        *entry = renewed;

        Ok(true)
    }

    fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.map.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.map.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;
    use std::sync::{Arc, Barrier};
    use std::thread;

    struct Rate;

    fn key(id: u32) -> CacheKey {
        CacheKey::of::<Rate>(attrs![id])
    }

    #[test]
    fn test_put_get_remove() {
        let provider = ShardedCacheProvider::new();
        provider.put(&key(1), "a", Duration::from_secs(60)).unwrap();
        assert_eq!(provider.get(&key(1)).unwrap().unwrap().value, "a");
        assert_eq!(provider.len(), 1);

        provider.remove(&key(1)).unwrap();
        assert!(provider.get(&key(1)).unwrap().is_none());
        assert!(provider.is_empty());
    }

    #[test]
    fn test_zero_duration_put_is_noop() {
        let provider = ShardedCacheProvider::new();
        provider.put(&key(1), "a", Duration::ZERO).unwrap();
        assert!(provider.is_empty());
    }

    #[test]
    fn test_touch_semantics() {
        let provider = ShardedCacheProvider::new();
        assert!(provider
            .touch(&key(1), Duration::from_secs(1))
            .unwrap_err()
            .is_requirement());

        provider.put(&key(1), "a", Duration::from_secs(60)).unwrap();
        assert!(!provider.touch(&key(1), Duration::from_secs(1)).unwrap());

        provider.put(&key(2), "b", Duration::from_millis(1)).unwrap();
        thread::sleep(Duration::from_millis(10));
        assert!(provider.touch(&key(2), Duration::from_secs(60)).unwrap());
        let entry = provider.get(&key(2)).unwrap().unwrap();
        assert_eq!(entry.value, "b");
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_touch_is_single_flight() {
        let provider = Arc::new(ShardedCacheProvider::new());
        provider.put(&key(1), 1, Duration::from_millis(1)).unwrap();
        thread::sleep(Duration::from_millis(10));

        let threads = 12;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let provider = Arc::clone(&provider);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    provider.touch(&key(1), Duration::from_secs(60)).unwrap()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .filter_map(|handle| handle.join().ok())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_clear() {
        let provider = ShardedCacheProvider::new();
        for i in 0..100 {
            provider.put(&key(i), i, Duration::from_secs(60)).unwrap();
        }
        assert_eq!(provider.len(), 100);
        provider.clear().unwrap();
        assert!(provider.is_empty());
    }
}
