use std::time::Duration;

use crate::error::{require, CacheError};

/// How long a loaded value is considered fresh unless configured otherwise.
pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(60 * 60);

/// How long a refresh claim lasts unless configured otherwise.
pub const DEFAULT_TOUCH_DURATION: Duration = Duration::from_secs(10 * 60);

/// Ratio between the duration a value is stored for and the duration requested by the cache.
pub const DEFAULT_STORAGE_FACTOR: u32 = 2;

/// Settings of a [`SelfLoadingCache`](crate::SelfLoadingCache).
///
/// A config is immutable once built. Use [`CacheConfig::builder`] to create one with custom
/// values, or [`CacheConfig::default`] for the defaults:
///
/// | Setting                     | Default |
/// |-----------------------------|---------|
/// | `cache_duration`            | 1h      |
/// | `touch_duration`            | 10min   |
/// | `async_insert`              | false   |
/// | `async_update`              | true    |
/// | `propagate_provider_errors` | false   |
/// | `storage_factor`            | 2       |
///
/// # Examples
///
/// ```
/// use selfload_core::CacheConfig;
/// use std::time::Duration;
///
/// let config = CacheConfig::builder()
///     .cache_duration(Duration::from_secs(30))
///     .touch_duration(Duration::from_secs(5))
///     .async_update(false)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.cache_duration(), Duration::from_secs(30));
/// assert!(!config.async_update());
///
/// assert!(CacheConfig::builder().cache_duration(Duration::ZERO).build().is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    cache_duration: Duration,
    touch_duration: Duration,
    async_insert: bool,
    async_update: bool,
    propagate_provider_errors: bool,
    storage_factor: u32,
}

impl CacheConfig {
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder {
            config: CacheConfig::default(),
        }
    }

    /// Duration a freshly loaded value stays valid.
    pub fn cache_duration(&self) -> Duration {
        self.cache_duration
    }

    /// Duration a stale entry is extended by once a caller claimed its refresh.
    pub fn touch_duration(&self) -> Duration {
        self.touch_duration
    }

    /// Whether a cache miss loads the value in the background instead of blocking the caller.
    pub fn async_insert(&self) -> bool {
        self.async_insert
    }

    /// Whether a stale entry is refreshed in the background while the stale value is served.
    pub fn async_update(&self) -> bool {
        self.async_update
    }

    /// Whether provider errors are reported to the caller or degrade to a reload.
    pub fn propagate_provider_errors(&self) -> bool {
        self.propagate_provider_errors
    }

    /// Factor applied to the cache duration when storing values in the backend.
    pub fn storage_factor(&self) -> u32 {
        self.storage_factor
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_duration: DEFAULT_CACHE_DURATION,
            touch_duration: DEFAULT_TOUCH_DURATION,
            async_insert: false,
            async_update: true,
            propagate_provider_errors: false,
            storage_factor: DEFAULT_STORAGE_FACTOR,
        }
    }
}

/// Builder for [`CacheConfig`], see [`CacheConfig::builder`].
#[derive(Clone, Debug)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    pub fn cache_duration(mut self, duration: Duration) -> Self {
        self.config.cache_duration = duration;
        self
    }

    pub fn touch_duration(mut self, duration: Duration) -> Self {
        self.config.touch_duration = duration;
        self
    }

    pub fn async_insert(mut self, enabled: bool) -> Self {
        self.config.async_insert = enabled;
        self
    }

    pub fn async_update(mut self, enabled: bool) -> Self {
        self.config.async_update = enabled;
        self
    }

    pub fn propagate_provider_errors(mut self, enabled: bool) -> Self {
        self.config.propagate_provider_errors = enabled;
        self
    }

    /// Sets how many times `cache_duration` a backend is asked to retain a value. Values still
    /// turn stale after `cache_duration`.
    pub fn storage_factor(mut self, factor: u32) -> Self {
        self.config.storage_factor = factor;
        self
    }

    /// Validates the settings and returns the config.
    ///
    /// Both durations must be positive (and representable in whole milliseconds), the
    /// storage factor must be at least 1.
    pub fn build(self) -> Result<CacheConfig, CacheError> {
        let config = self.config;
        require(config.cache_duration.as_millis() > 0, || {
            format!(
                "cache_duration must be positive, got {:?}",
                config.cache_duration
            )
        })?;
        require(config.touch_duration.as_millis() > 0, || {
            format!(
                "touch_duration must be positive, got {:?}",
                config.touch_duration
            )
        })?;
        require(config.storage_factor >= 1, || {
            format!(
                "storage_factor must be at least 1, got {}",
                config.storage_factor
            )
        })?;

        Ok(config)
    }
}
