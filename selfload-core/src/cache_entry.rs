use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Returns the current time in milliseconds since the Unix epoch.
///
/// A clock set before the epoch yields `0`.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Converts a duration into whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// A value stored by a cache provider together with the instant it expires at.
///
/// Entries are immutable: a refresh replaces the entry instead of updating its expiration.
/// Expired entries are still handed out by providers, it's up to the caller to decide
/// whether a stale value is good enough.
///
/// # Type Parameters
///
/// * `V` - The type of the cached value. Use an `Option` to cache absent values.
///
/// # Fields
///
/// * `value` - The cached value
/// * `expiration` - Absolute expiration timestamp in milliseconds since the Unix epoch
///
/// # Examples
///
/// ```
/// use selfload_core::CacheEntry;
/// use std::time::Duration;
///
/// let entry = CacheEntry::expiring_in("data", Duration::from_secs(60));
/// assert_eq!(entry.value, "data");
/// assert!(!entry.is_expired());
///
/// let stale = CacheEntry::new("old", 0);
/// assert!(stale.is_expired());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expiration: u64,
}

impl<V> CacheEntry<V> {
    /// Creates an entry expiring at the given timestamp (ms since the Unix epoch).
    pub fn new(value: V, expiration: u64) -> Self {
        Self { value, expiration }
    }

    /// Creates an entry expiring `duration` from now.
    pub fn expiring_in(value: V, duration: Duration) -> Self {
        Self {
            value,
            expiration: now_millis().saturating_add(duration_millis(duration)),
        }
    }

    /// Returns true if the expiration timestamp lies in the past.
    ///
    /// This is computed on every call, so an entry turns stale without being touched.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    /// Returns true if the entry is expired at the given point in time.
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expiration < now
    }

    /// Returns the remaining time to live, or `None` once the entry is expired.
    pub fn time_to_live(&self) -> Option<Duration> {
        let now = now_millis();
        if self.is_expired_at(now) {
            None
        } else {
            Some(Duration::from_millis(self.expiration - now))
        }
    }

    /// Consumes the entry and returns a fresh one carrying the same value.
    pub(crate) fn renewed(self, duration: Duration) -> Self {
        Self::expiring_in(self.value, duration)
    }
}
