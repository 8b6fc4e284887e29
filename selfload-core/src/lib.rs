//! # Selfload Core
//!
//! Building blocks of the selfload cache facade.
//!
//! A [`SelfLoadingCache`] sits between application code and a pluggable [`CacheProvider`]. On a
//! lookup it either serves the cached value or invokes the caller's [`DataProvider`], making
//! sure that a stale value is reloaded by only one caller at a time while everybody else keeps
//! being served the stale value.
//!
//! ## Module Organization
//!
//! - [`cache_key`] - Composite cache keys ([`CacheKey`], [`KeyPrototype`], [`KeyAttribute`])
//! - [`cache_entry`] - Value/expiration pairs stored by backends
//! - [`provider`] - The backend contract and the data provider capability
//! - [`guard`] - [`ProviderGuard`], validating and translating errors around any backend
//! - [`heap_provider`] - Bounded LRU backend
//! - [`sharded_provider`] - Unbounded backend on a sharded concurrent map
//! - [`runner`] - [`AsyncRunner`] executing background loads
//! - [`context`] - [`CacheContext`] with the disable switch shared by a group of caches
//! - [`self_loading_cache`] - The orchestration facade
//! - [`stats`] / [`stats_registry`] - Hit/miss statistics (feature `stats`)
//!
//! ## Example
//!
//! ```
//! use selfload_core::{
//!     attrs, AsyncRunner, CacheConfig, CacheContext, CacheKey, HeapCacheProvider,
//!     SelfLoadingCache,
//! };
//! use std::time::Duration;
//!
//! struct Customer;
//!
//! let config = CacheConfig::builder()
//!     .cache_duration(Duration::from_secs(300))
//!     .touch_duration(Duration::from_secs(30))
//!     .build()
//!     .unwrap();
//! let cache = SelfLoadingCache::with_context(
//!     "customers",
//!     HeapCacheProvider::new(1024),
//!     config,
//!     CacheContext::new(AsyncRunner::inline()),
//! );
//!
//! let key = CacheKey::of::<Customer>(attrs![42]);
//! let name = cache
//!     .get(&key, |_: &CacheKey| Ok::<_, std::io::Error>("Ada".to_string()))
//!     .unwrap();
//! assert_eq!(name.as_deref(), Some("Ada"));
//! ```

pub mod cache_entry;
pub mod cache_key;
pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod heap_provider;
pub mod provider;
pub mod runner;
pub mod self_loading_cache;
pub mod sharded_provider;

#[cfg(feature = "stats")]
pub mod stats;

#[cfg(feature = "stats")]
pub mod stats_registry;

pub use cache_entry::{now_millis, CacheEntry};
pub use cache_key::{CacheKey, KeyAttribute, KeyPrototype, ModelType, LATEST_VERSION};
pub use config::{
    CacheConfig, CacheConfigBuilder, DEFAULT_CACHE_DURATION, DEFAULT_STORAGE_FACTOR,
    DEFAULT_TOUCH_DURATION,
};
pub use context::CacheContext;
pub use error::{BoxError, CacheError, Operation};
pub use guard::ProviderGuard;
pub use heap_provider::HeapCacheProvider;
pub use provider::{CacheProvider, DataProvider};
pub use runner::AsyncRunner;
pub use self_loading_cache::SelfLoadingCache;
pub use sharded_provider::ShardedCacheProvider;

#[cfg(feature = "stats")]
pub use stats::CacheStats;
