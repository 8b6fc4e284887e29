use std::marker::PhantomData;
use std::time::Duration;

use crate::cache_entry::duration_millis;
use crate::config::{CacheConfig, DEFAULT_STORAGE_FACTOR};
use crate::error::{require, CacheError, Operation};
use crate::{CacheEntry, CacheKey, CacheProvider};

/// Decorates a [`CacheProvider`] with uniform validation and error translation.
///
/// The guard is what a [`SelfLoadingCache`](crate::SelfLoadingCache) actually talks to. For
/// every operation it:
///
/// - short-circuits `put` and `touch` with a duration below one millisecond without calling
///   the backend,
/// - translates any error raised by the backend into [`CacheError::Provider`], naming the
///   failed [`Operation`]. Requirement violations pass through unchanged, as they signal a bug
///   rather than a failing backend,
/// - stores `put` values with an expiration of exactly `now + duration`, but asks the backend
///   to retain them for `duration` times the storage factor. An entry which just turned stale
///   is then still around to be claimed by `touch` instead of vanishing from the backend first.
///
/// # Examples
///
/// ```
/// use selfload_core::{attrs, CacheKey, CacheProvider, HeapCacheProvider, ProviderGuard};
/// use std::time::Duration;
///
/// struct User;
///
/// let guard = ProviderGuard::new(HeapCacheProvider::new(128));
/// let key = CacheKey::of::<User>(attrs![1]);
///
/// guard.put(&key, "Jane", Duration::from_secs(60)).unwrap();
/// assert_eq!(guard.get(&key).unwrap().unwrap().value, "Jane");
///
/// // Zero durations never reach the backend.
/// assert!(!guard.touch(&key, Duration::ZERO).unwrap());
/// ```
pub struct ProviderGuard<V, P> {
    inner: P,
    storage_factor: u32,
    _value: PhantomData<fn(V) -> V>,
}

impl<V, P: CacheProvider<V>> ProviderGuard<V, P> {
    /// Wraps `inner` using the default storage factor of 2.
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            storage_factor: DEFAULT_STORAGE_FACTOR,
            _value: PhantomData,
        }
    }

    /// Wraps `inner` using a custom storage factor, which must be at least 1.
    pub fn with_storage_factor(inner: P, storage_factor: u32) -> Result<Self, CacheError> {
        require(storage_factor >= 1, || {
            format!("storage_factor must be at least 1, got {}", storage_factor)
        })?;

        Ok(Self {
            inner,
            storage_factor,
            _value: PhantomData,
        })
    }

    /// Wraps `inner` using the storage factor of an already validated config.
    pub(crate) fn for_config(inner: P, config: &CacheConfig) -> Self {
        Self {
            inner,
            storage_factor: config.storage_factor(),
            _value: PhantomData,
        }
    }

    pub fn storage_factor(&self) -> u32 {
        self.storage_factor
    }

    /// Returns the wrapped backend.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn translate<T>(operation: Operation, result: Result<T, CacheError>) -> Result<T, CacheError> {
        result.map_err(|err| {
            if err.is_requirement() {
                err
            } else {
                CacheError::provider(operation, err)
            }
        })
    }
}

impl<V, P: CacheProvider<V>> CacheProvider<V> for ProviderGuard<V, P> {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry<V>>, CacheError> {
        Self::translate(Operation::Get, self.inner.get(key))
    }

    fn put(&self, key: &CacheKey, value: V, duration: Duration) -> Result<(), CacheError> {
        if duration_millis(duration) == 0 {
            return Ok(());
        }

        let entry = CacheEntry::expiring_in(value, duration);
        let retain_for = duration.saturating_mul(self.storage_factor);
        Self::translate(Operation::Put, self.inner.put_entry(key, entry, retain_for))
    }

    fn put_entry(
        &self,
        key: &CacheKey,
        entry: CacheEntry<V>,
        retain_for: Duration,
    ) -> Result<(), CacheError> {
        Self::translate(Operation::Put, self.inner.put_entry(key, entry, retain_for))
    }

    fn touch(&self, key: &CacheKey, duration: Duration) -> Result<bool, CacheError> {
        if duration_millis(duration) == 0 {
            return Ok(false);
        }

        Self::translate(Operation::Touch, self.inner.touch(key, duration))
    }

    fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        Self::translate(Operation::Remove, self.inner.remove(key))
    }

    fn clear(&self) -> Result<(), CacheError> {
        Self::translate(Operation::Clear, self.inner.clear())
    }
}
