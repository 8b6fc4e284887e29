use std::sync::atomic::{AtomicU64, Ordering};

/// Cache statistics for monitoring hit/miss rates and load behaviour.
///
/// This structure tracks how a [`SelfLoadingCache`](crate::SelfLoadingCache) answers lookups
/// using atomic counters, so recording is thread-safe and cheap.
///
/// # Counters
///
/// - **hits**: a fresh value was served from the backend
/// - **stale hits**: an expired value was served while a refresh was claimed elsewhere or runs
///   in the background
/// - **misses**: the caller had to wait for a load, or got nothing because the load runs in the
///   background
/// - **loads**: the data provider was invoked on behalf of the cache
/// - **provider errors**: a backend failure was swallowed and degraded into a reload
///
/// Lookups bypassing a disabled cache are not counted.
///
/// # Thread Safety
///
/// All operations use atomic operations with `Relaxed` ordering, which provides the best
/// performance while still maintaining consistency of each individual counter.
///
/// # Examples
///
/// ```
/// use selfload_core::CacheStats;
///
/// let stats = CacheStats::new();
///
/// stats.record_hit();
/// stats.record_stale_hit();
/// stats.record_miss();
///
/// assert_eq!(stats.hits(), 1);
/// assert_eq!(stats.stale_hits(), 1);
/// assert_eq!(stats.misses(), 1);
/// assert_eq!(stats.total_accesses(), 3);
/// assert!((stats.hit_rate() - 0.6666).abs() < 0.001);
/// ```
#[derive(Debug)]
pub struct CacheStats {
    hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    provider_errors: AtomicU64,
}

impl CacheStats {
    /// Creates a new `CacheStats` instance with zero counters.
    pub fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            stale_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            loads: AtomicU64::new(0),
            provider_errors: AtomicU64::new(0),
        }
    }

    /// Records a lookup served by a fresh cached value.
    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a lookup served by an expired cached value.
    #[inline]
    pub fn record_stale_hit(&self) {
        self.stale_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a lookup which found nothing usable in the cache.
    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an invocation of the data provider.
    #[inline]
    pub fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a provider error which was swallowed.
    #[inline]
    pub fn record_provider_error(&self) {
        self.provider_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn stale_hits(&self) -> u64 {
        self.stale_hits.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn loads(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn provider_errors(&self) -> u64 {
        self.provider_errors.load(Ordering::Relaxed)
    }

    /// Returns the total number of lookups (hits + stale hits + misses).
    #[inline]
    pub fn total_accesses(&self) -> u64 {
        self.hits() + self.stale_hits() + self.misses()
    }

    /// Calculates the fraction (0.0 to 1.0) of lookups answered from the cache, stale values
    /// included. Returns 0.0 if there have been no accesses.
    ///
    /// # Examples
    ///
    /// ```
    /// use selfload_core::CacheStats;
    ///
    /// let stats = CacheStats::new();
    /// assert_eq!(stats.hit_rate(), 0.0);
    ///
    /// stats.record_hit();
    /// stats.record_miss();
    /// assert_eq!(stats.hit_rate(), 0.5);
    /// ```
    #[inline]
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_accesses();
        if total == 0 {
            0.0
        } else {
            (self.hits() + self.stale_hits()) as f64 / total as f64
        }
    }

    /// Calculates the fraction (0.0 to 1.0) of lookups which found nothing usable.
    #[inline]
    pub fn miss_rate(&self) -> f64 {
        1.0 - self.hit_rate()
    }

    /// Resets all counters to zero.
    ///
    /// This can be useful for measuring statistics over specific time periods
    /// or after configuration changes.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.stale_hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.loads.store(0, Ordering::Relaxed);
        self.provider_errors.store(0, Ordering::Relaxed);
    }
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for CacheStats {
    fn clone(&self) -> Self {
        Self {
            hits: AtomicU64::new(self.hits()),
            stale_hits: AtomicU64::new(self.stale_hits()),
            misses: AtomicU64::new(self.misses()),
            loads: AtomicU64::new(self.loads()),
            provider_errors: AtomicU64::new(self.provider_errors()),
        }
    }
}
