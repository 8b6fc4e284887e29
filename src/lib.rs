//! # Selfload
//!
//! A self-loading cache facade for Rust. A [`SelfLoadingCache`] sits in front of a pluggable
//! backend and loads missing or stale values through a data provider supplied with every
//! lookup.
//!
//! ## Features
//!
//! - **Stampede protection**: a stale entry is refreshed by exactly one caller, everyone else
//!   is served the stale value meanwhile
//! - **Background loading**: inserts and refreshes can run on a shared task pool
//! - **Pluggable backends**: anything implementing [`CacheProvider`], with a bounded LRU
//!   ([`HeapCacheProvider`]) and a sharded ([`ShardedCacheProvider`]) in-heap backend included
//! - **Kill switches**: disable a single cache or every cache at once, lookups then go straight
//!   to the data provider
//! - **Statistics**: hit/miss counters per cache, queryable by name (feature `stats`)
//!
//! ## Quick Start
//!
//! ```rust
//! use selfload::{attrs, CacheConfig, CacheKey, HeapCacheProvider, SelfLoadingCache};
//! use std::time::Duration;
//!
//! struct ExchangeRate;
//!
//! let config = CacheConfig::builder()
//!     .cache_duration(Duration::from_secs(60))
//!     .touch_duration(Duration::from_secs(5))
//!     .build()
//!     .unwrap();
//! let rates = SelfLoadingCache::new("exchange_rates", HeapCacheProvider::new(256), config);
//!
//! let key = CacheKey::of::<ExchangeRate>(attrs!["EUR", "USD"]);
//! let rate = rates
//!     .get(&key, |_: &CacheKey| Ok::<_, std::io::Error>(1.08))
//!     .unwrap();
//! assert_eq!(rate, Some(1.08));
//! ```
//!
//! ## Keys
//!
//! Keys combine a model type, a version and an ordered list of attributes. Use a
//! [`KeyPrototype`] when many keys share type and version:
//!
//! ```rust
//! use selfload::{attrs, KeyPrototype};
//!
//! struct Invoice;
//!
//! let invoices = KeyPrototype::versioned::<Invoice>("v2").unwrap();
//! assert_eq!(invoices.key(attrs![2024, "INV-7"]).to_string(), "Invoice@v2[2024, INV-7]");
//! ```
//!
//! ## Disabling Caches
//!
//! ```rust
//! use selfload::{disable_all, enable_all, is_disabled};
//!
//! disable_all();
//! assert!(is_disabled());
//! enable_all();
//! ```

pub use selfload_core::*;

/// Disables every cache bound to the global context.
///
/// While disabled, lookups invoke the data provider directly and never reach a backend. Caches
/// created with their own [`CacheContext`] are not affected.
///
/// # Examples
///
/// ```rust
/// use selfload::{disable_all, enable_all, is_disabled};
///
/// disable_all();
/// assert!(is_disabled());
/// enable_all();
/// assert!(!is_disabled());
/// ```
pub fn disable_all() {
    CacheContext::global().disable_all()
}

/// Re-enables every cache bound to the global context.
pub fn enable_all() {
    CacheContext::global().enable_all()
}

/// Returns whether caches bound to the global context are disabled.
pub fn is_disabled() -> bool {
    CacheContext::global().is_disabled()
}
