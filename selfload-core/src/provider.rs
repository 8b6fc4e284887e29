//! # Providers
//!
//! A [`CacheProvider`] is the storage backend of a [`SelfLoadingCache`](crate::SelfLoadingCache).
//! A [`DataProvider`] computes values on a cache miss. Both are traits so that backends and
//! data sources can be swapped freely.

use std::sync::Arc;
use std::time::Duration;

use crate::cache_entry::duration_millis;
use crate::error::{BoxError, CacheError};
use crate::{CacheEntry, CacheKey};

/// The contract every cache backend has to satisfy.
///
/// # Semantics
///
/// * `get` returns the stored entry **even if it is expired**. Deciding what to do with a stale
///   entry is the caller's job.
/// * `put` with a duration below one millisecond does nothing. Otherwise it stores the value
///   with an expiration of `now + duration`, replacing any previous entry. It is provided on
///   top of `put_entry`.
/// * `put_entry` stores a ready-made entry, replacing any previous one. `retain_for` tells the
///   backend how long the entry is worth keeping at all; it is a hint for backends with their
///   own retention (e.g. a TTL in an external store) and always covers the entry's expiration.
///   The entry's expiration is what decides freshness, never `retain_for`.
/// * `touch` is the single-flight primitive used to claim the refresh of a stale entry:
///   - a duration below one millisecond returns `false` without any change;
///   - an absent key is a contract violation and yields [`CacheError::Requirement`];
///   - a present, non-expired entry returns `false` without any change (someone else
///     already refreshed or claimed it);
///   - a present, expired entry is atomically replaced by an entry with the same value and an
///     expiration of `now + duration`, and `true` is returned.
///
///   Among any number of callers racing on the same expired key, exactly one observes `true`.
///   Implementations must therefore perform the check and the replacement in a single
///   critical section.
/// * `remove` on an absent key is a no-op.
/// * `clear` empties the store.
///
/// Backends report their own failures as [`CacheError::Backend`]. Wrap a backend into a
/// [`ProviderGuard`](crate::ProviderGuard) to get uniform error translation.
pub trait CacheProvider<V>: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry<V>>, CacheError>;

    fn put(&self, key: &CacheKey, value: V, duration: Duration) -> Result<(), CacheError> {
        if duration_millis(duration) == 0 {
            return Ok(());
        }

        self.put_entry(key, CacheEntry::expiring_in(value, duration), duration)
    }

    fn put_entry(
        &self,
        key: &CacheKey,
        entry: CacheEntry<V>,
        retain_for: Duration,
    ) -> Result<(), CacheError>;

    fn touch(&self, key: &CacheKey, duration: Duration) -> Result<bool, CacheError>;

    fn remove(&self, key: &CacheKey) -> Result<(), CacheError>;

    fn clear(&self) -> Result<(), CacheError>;
}

impl<V, P: CacheProvider<V> + ?Sized> CacheProvider<V> for Arc<P> {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry<V>>, CacheError> {
        (**self).get(key)
    }

    fn put(&self, key: &CacheKey, value: V, duration: Duration) -> Result<(), CacheError> {
        (**self).put(key, value, duration)
    }

    fn put_entry(
        &self,
        key: &CacheKey,
        entry: CacheEntry<V>,
        retain_for: Duration,
    ) -> Result<(), CacheError> {
        (**self).put_entry(key, entry, retain_for)
    }

    fn touch(&self, key: &CacheKey, duration: Duration) -> Result<bool, CacheError> {
        (**self).touch(key, duration)
    }

    fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        (**self).remove(key)
    }

    fn clear(&self) -> Result<(), CacheError> {
        (**self).clear()
    }
}

impl<V, P: CacheProvider<V> + ?Sized> CacheProvider<V> for Box<P> {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry<V>>, CacheError> {
        (**self).get(key)
    }

    fn put(&self, key: &CacheKey, value: V, duration: Duration) -> Result<(), CacheError> {
        (**self).put(key, value, duration)
    }

    fn put_entry(
        &self,
        key: &CacheKey,
        entry: CacheEntry<V>,
        retain_for: Duration,
    ) -> Result<(), CacheError> {
        (**self).put_entry(key, entry, retain_for)
    }

    fn touch(&self, key: &CacheKey, duration: Duration) -> Result<bool, CacheError> {
        (**self).touch(key, duration)
    }

    fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        (**self).remove(key)
    }

    fn clear(&self) -> Result<(), CacheError> {
        (**self).clear()
    }
}

/// Computes the value for a key on a cache miss or refresh.
///
/// A data provider is handed to each [`get`](crate::SelfLoadingCache::get) call and is not
/// retained by the cache beyond the load it triggers. Any closure of the form
/// `Fn(&CacheKey) -> Result<V, E>` is a data provider as long as `E` converts into a boxed
/// error.
///
/// # Examples
///
/// ```
/// use selfload_core::{attrs, CacheKey, DataProvider};
///
/// struct Price;
///
/// let provider = |key: &CacheKey| -> Result<String, std::io::Error> { Ok(key.to_string()) };
/// let key = CacheKey::of::<Price>(attrs![7]);
///
/// assert_eq!(provider.retrieve(&key).unwrap(), "Price@LATEST[7]");
/// ```
pub trait DataProvider<V>: Send {
    fn retrieve(&self, key: &CacheKey) -> Result<V, BoxError>;
}

impl<V, E, F> DataProvider<V> for F
where
    F: Fn(&CacheKey) -> Result<V, E> + Send,
    E: Into<BoxError>,
{
    fn retrieve(&self, key: &CacheKey) -> Result<V, BoxError> {
        self(key).map_err(Into::into)
    }
}
