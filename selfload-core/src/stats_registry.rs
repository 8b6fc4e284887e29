use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::CacheStats;

/// Global registry for cache statistics.
///
/// Every [`SelfLoadingCache`](crate::SelfLoadingCache) registers its statistics here under its
/// name, so that they can be queried without holding on to the cache itself. Registering a
/// second cache under an existing name replaces the previous entry.
///
/// # Examples
///
/// ```
/// use selfload_core::stats_registry;
///
/// if let Some(stats) = stats_registry::get("products") {
///     println!("Hits: {}", stats.hits());
///     println!("Misses: {}", stats.misses());
/// }
///
/// for name in stats_registry::list() {
///     println!("Cache: {}", name);
/// }
/// ```
static STATS_REGISTRY: Lazy<RwLock<HashMap<String, Arc<CacheStats>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Registers a cache's statistics under the given name.
pub fn register(name: &str, stats: Arc<CacheStats>) {
    let mut registry = STATS_REGISTRY.write();
    registry.insert(name.to_string(), stats);
}

/// Returns a snapshot of the statistics registered under `name`.
pub fn get(name: &str) -> Option<CacheStats> {
    let registry = STATS_REGISTRY.read();
    registry.get(name).map(|stats| (**stats).clone())
}

/// Returns the live statistics registered under `name`.
pub fn get_ref(name: &str) -> Option<Arc<CacheStats>> {
    let registry = STATS_REGISTRY.read();
    registry.get(name).cloned()
}

/// Lists the names of all registered caches.
pub fn list() -> Vec<String> {
    let registry = STATS_REGISTRY.read();
    registry.keys().cloned().collect()
}

/// Removes all registrations. The statistics themselves are left untouched.
pub fn clear() {
    let mut registry = STATS_REGISTRY.write();
    registry.clear();
}

/// Removes the registration for `name`, returning whether one existed.
pub fn unregister(name: &str) -> bool {
    let mut registry = STATS_REGISTRY.write();
    registry.remove(name).is_some()
}

/// Removes the registration for `name` only if it still points at `stats`.
///
/// A cache replaced under its name by a newer one must not take the newer registration
/// down with it.
pub fn unregister_if_same(name: &str, stats: &Arc<CacheStats>) -> bool {
    let mut registry = STATS_REGISTRY.write();
    match registry.get(name) {
        Some(registered) if Arc::ptr_eq(registered, stats) => {
            registry.remove(name);
            true
        }
        _ => false,
    }
}

/// Resets the counters registered under `name`.
///
/// # Returns
///
/// * `true` - If the cache was found and reset
/// * `false` - If no cache with that name is registered
pub fn reset(name: &str) -> bool {
    let registry = STATS_REGISTRY.read();
    if let Some(stats) = registry.get(name) {
        stats.reset();
        true
    } else {
        false
    }
}
