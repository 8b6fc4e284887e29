use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::CacheError;
use crate::{CacheConfig, CacheContext, CacheKey, CacheProvider, DataProvider, ProviderGuard};

#[cfg(feature = "stats")]
use crate::{stats_registry, CacheStats};

/// A cache which loads missing and stale values on its own.
///
/// Callers hand a [`DataProvider`] to every [`get`](SelfLoadingCache::get). The cache decides
/// whether the provider has to run at all:
///
/// | Cached state        | Behaviour                                                          |
/// |---------------------|--------------------------------------------------------------------|
/// | absent              | load and store the value (in the background if `async_insert`)     |
/// | present, fresh      | return the cached value, the data provider is not invoked          |
/// | present, expired    | exactly one caller claims the refresh via `touch` and reloads,     |
/// |                     | everyone else is served the stale value in the meantime            |
///
/// With `async_update` (the default) even the caller owning the refresh gets the stale value
/// while the reload runs on the [`AsyncRunner`](crate::AsyncRunner) of the cache's context.
///
/// The backend is always wrapped into a [`ProviderGuard`], so backend failures surface as
/// [`CacheError::Provider`]. Those are logged and degrade to a reload unless
/// `propagate_provider_errors` is set. Failures of the data provider are always returned as
/// [`CacheError::Source`].
///
/// # Examples
///
/// ```
/// use selfload_core::{
///     attrs, AsyncRunner, CacheConfig, CacheContext, CacheKey, HeapCacheProvider,
///     SelfLoadingCache,
/// };
/// use std::convert::Infallible;
/// use std::time::Duration;
///
/// struct Greeting;
///
/// let config = CacheConfig::builder()
///     .cache_duration(Duration::from_secs(60))
///     .build()
///     .unwrap();
/// let context = CacheContext::new(AsyncRunner::inline());
/// let cache = SelfLoadingCache::with_context("greetings", HeapCacheProvider::new(64), config, context);
///
/// let key = CacheKey::of::<Greeting>(attrs!["en"]);
/// let first = cache.get(&key, |_: &CacheKey| Ok::<_, Infallible>("hello".to_string())).unwrap();
/// let second = cache.get(&key, |_: &CacheKey| Ok::<_, Infallible>("hi".to_string())).unwrap();
///
/// assert_eq!(first.as_deref(), Some("hello"));
/// assert_eq!(second.as_deref(), Some("hello"));
/// ```
pub struct SelfLoadingCache<V> {
    name: Arc<str>,
    provider: Arc<dyn CacheProvider<V>>,
    config: CacheConfig,
    context: CacheContext,
    disabled: AtomicBool,
    #[cfg(feature = "stats")]
    stats: Arc<CacheStats>,
}

impl<V: Clone + Send + Sync + 'static> SelfLoadingCache<V> {
    /// Creates a cache on top of `backend`, bound to the global [`CacheContext`].
    pub fn new<P>(name: impl Into<String>, backend: P, config: CacheConfig) -> Self
    where
        P: CacheProvider<V> + 'static,
    {
        Self::with_context(name, backend, config, CacheContext::global().clone())
    }

    /// Creates a cache on top of `backend`, bound to the given context.
    pub fn with_context<P>(
        name: impl Into<String>,
        backend: P,
        config: CacheConfig,
        context: CacheContext,
    ) -> Self
    where
        P: CacheProvider<V> + 'static,
    {
        let name: Arc<str> = Arc::from(name.into());
        let provider: Arc<dyn CacheProvider<V>> =
            Arc::new(ProviderGuard::<V, P>::for_config(backend, &config));

        #[cfg(feature = "stats")]
        let stats = {
            let stats = Arc::new(CacheStats::new());
            stats_registry::register(&name, Arc::clone(&stats));
            stats
        };

        Self {
            name,
            provider,
            config,
            context,
            disabled: AtomicBool::new(false),
            #[cfg(feature = "stats")]
            stats,
        }
    }

    /// Returns the value for `key`, loading it through `data_provider` if required.
    ///
    /// Returns `Ok(None)` only if the value is absent and `async_insert` is enabled: the load
    /// was handed to the runner and the caller should fall back to whatever it does without a
    /// value.
    ///
    /// # Errors
    ///
    /// * [`CacheError::Source`] if the data provider failed on the calling thread.
    /// * [`CacheError::Provider`] if the backend failed and `propagate_provider_errors` is set.
    pub fn get<D>(&self, key: &CacheKey, data_provider: D) -> Result<Option<V>, CacheError>
    where
        D: DataProvider<V> + 'static,
    {
        if self.is_bypassed() {
            log::debug!("Cache {} is disabled, loading {} directly", self.name, key);
            return data_provider
                .retrieve(key)
                .map(Some)
                .map_err(|err| CacheError::source(key, err));
        }

        let cached = match self.provider.get(key) {
            Ok(cached) => cached,
            Err(err) => {
                self.handle_provider_error(err)?;
                None
            }
        };

        match cached {
            None => self.insert(key, data_provider),
            Some(entry) if !entry.is_expired() => {
                log::trace!("Cache {} hit for {}", self.name, key);
                #[cfg(feature = "stats")]
                self.stats.record_hit();
                Ok(Some(entry.value))
            }
            Some(entry) => self.update(key, entry.value, data_provider),
        }
    }

    /// Removes the value for `key`. Does nothing while the cache is disabled.
    pub fn evict(&self, key: &CacheKey) -> Result<(), CacheError> {
        if self.is_bypassed() {
            return Ok(());
        }

        match self.provider.remove(key) {
            Ok(()) => Ok(()),
            Err(err) => self.handle_provider_error(err),
        }
    }

    /// Removes all values of the backend. Does nothing while the cache is disabled.
    pub fn clear(&self) -> Result<(), CacheError> {
        if self.is_bypassed() {
            return Ok(());
        }

        match self.provider.clear() {
            Ok(()) => Ok(()),
            Err(err) => self.handle_provider_error(err),
        }
    }

    fn insert<D>(&self, key: &CacheKey, data_provider: D) -> Result<Option<V>, CacheError>
    where
        D: DataProvider<V> + 'static,
    {
        #[cfg(feature = "stats")]
        self.stats.record_miss();

        if self.config.async_insert() {
            log::debug!("Cache {} loading {} in the background", self.name, key);
            self.dispatch(key, data_provider);
            return Ok(None);
        }

        self.load_and_store(key, &data_provider).map(Some)
    }

    fn update<D>(&self, key: &CacheKey, stale: V, data_provider: D) -> Result<Option<V>, CacheError>
    where
        D: DataProvider<V> + 'static,
    {
        let owns_refresh = match self.provider.touch(key, self.config.touch_duration()) {
            Ok(owns_refresh) => owns_refresh,
            // The entry was evicted or removed after it was read.
            Err(err) if err.is_requirement() => {
                log::debug!("Cache {} lost {} before its refresh", self.name, key);
                return self.insert(key, data_provider);
            }
            Err(err) => {
                self.handle_provider_error(err)?;
                false
            }
        };

        if !owns_refresh {
            #[cfg(feature = "stats")]
            self.stats.record_stale_hit();
            return Ok(Some(stale));
        }

        log::debug!("Cache {} refreshing stale entry {}", self.name, key);
        if self.config.async_update() {
            #[cfg(feature = "stats")]
            self.stats.record_stale_hit();
            self.dispatch(key, data_provider);
            return Ok(Some(stale));
        }

        #[cfg(feature = "stats")]
        self.stats.record_miss();
        self.load_and_store(key, &data_provider).map(Some)
    }

    fn load_and_store<D>(&self, key: &CacheKey, data_provider: &D) -> Result<V, CacheError>
    where
        D: DataProvider<V>,
    {
        #[cfg(feature = "stats")]
        self.stats.record_load();

        let value = data_provider
            .retrieve(key)
            .map_err(|err| CacheError::source(key, err))?;

        if let Err(err) = self
            .provider
            .put(key, value.clone(), self.config.cache_duration())
        {
            self.handle_provider_error(err)?;
        }

        Ok(value)
    }

    /// Hands a load to the runner. Its outcome is only visible in the backend and the log.
    fn dispatch<D>(&self, key: &CacheKey, data_provider: D)
    where
        D: DataProvider<V> + 'static,
    {
        let key = key.clone();
        let name = Arc::clone(&self.name);
        let provider = Arc::clone(&self.provider);
        let duration = self.config.cache_duration();
        #[cfg(feature = "stats")]
        let stats = Arc::clone(&self.stats);

        self.context.runner().execute(move || {
            #[cfg(feature = "stats")]
            stats.record_load();

            let value = match data_provider.retrieve(&key) {
                Ok(value) => value,
                Err(err) => {
                    log::error!(
                        "Cache {} failed to load {} in the background: {}",
                        name,
                        key,
                        CacheError::source(&key, err)
                    );
                    return;
                }
            };

            if let Err(err) = provider.put(&key, value, duration) {
                #[cfg(feature = "stats")]
                stats.record_provider_error();
                log::error!(
                    "Cache {} failed to store {} in the background: {}",
                    name,
                    key,
                    err
                );
            }
        });
    }

    /// Applies the error policy: provider errors are swallowed unless configured otherwise,
    /// everything else is returned.
    fn handle_provider_error(&self, err: CacheError) -> Result<(), CacheError> {
        if !err.is_provider() || self.config.propagate_provider_errors() {
            return Err(err);
        }

        #[cfg(feature = "stats")]
        self.stats.record_provider_error();
        log::warn!("Cache {} ignored a provider failure: {}", self.name, err);
        Ok(())
    }
}

impl<V> SelfLoadingCache<V> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn context(&self) -> &CacheContext {
        &self.context
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Disables or re-enables this cache only. While disabled, every `get` invokes the data
    /// provider directly and neither `evict` nor `clear` reach the backend.
    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::Release);
    }

    /// Returns the local switch. The context may disable the cache as well, see
    /// [`CacheContext::is_disabled`].
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    fn is_bypassed(&self) -> bool {
        self.context.is_disabled() || self.is_disabled()
    }
}

impl<V> Drop for SelfLoadingCache<V> {
    fn drop(&mut self) {
        #[cfg(feature = "stats")]
        stats_registry::unregister_if_same(&self.name, &self.stats);
    }
}

impl<V> fmt::Debug for SelfLoadingCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelfLoadingCache")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("disabled", &self.is_disabled())
            .finish()
    }
}
